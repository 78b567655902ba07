// clinic-inbox - Conversation synchronization core and terminal inbox view
// Copyright (C) 2025  Simon Peter Rothgang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

pub mod config;
pub mod events;
pub mod outbox;
pub mod receipts;
pub mod scheduler;
pub mod scroll;
pub mod store;
pub mod transport;
pub mod typing;
mod view;

pub use config::SyncConfig;
pub use events::{PushSignal, PushSink, SyncEvent};
pub use scroll::{ScrollDecision, Viewport};
pub use transport::ConnectionState;
pub use view::{ConversationView, HistoryState};
