mod app_flow;
mod helpers;
mod render;
mod send_flow;
mod store_flow;
mod transport_flow;
mod typing_flow;
