// =====
// TESTS: 3
// =====
//
// Render smoke tests against ratatui's in-memory backend.

use clinic_inbox::api::model::TypingState;
use clinic_inbox::app::App;
use ratatui::Terminal;
use ratatui::backend::TestBackend;

use crate::helpers::{FakeApi, Harness, inbound};

fn screen(terminal: &Terminal<TestBackend>) -> String {
    let buffer = terminal.backend().buffer();
    let width = usize::from(buffer.area.width);
    buffer
        .content()
        .chunks(width)
        .map(|row| row.iter().map(ratatui::buffer::Cell::symbol).collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}

fn draw(app: &mut App) -> String {
    let mut terminal = Terminal::new(TestBackend::new(60, 16)).unwrap();
    terminal.draw(|frame| clinic_inbox::ui::render(frame, app)).unwrap();
    screen(&terminal)
}

#[tokio::test(start_paused = true)]
async fn renders_header_messages_and_typing() {
    let history = vec![inbound("m-1", 0, "Olá, gostaria de marcar uma consulta")];
    let mut h = Harness::open(FakeApi::new().with_messages(history));
    h.pump().await;
    h.push.typing("Ana", TypingState::Start);
    h.pump().await;

    let mut app = App::new(h.view, h.rx);
    let text = draw(&mut app);

    assert!(text.contains("Ana"), "{text}");
    assert!(text.contains("AI on"), "{text}");
    assert!(text.contains("polling"), "{text}");
    assert!(text.contains("gostaria"), "{text}");
    assert!(text.contains("Ana is typing"), "{text}");
    assert!(app.content_height > 0);
    assert_eq!(app.scroll_offset, app.max_scroll());
}

#[tokio::test(start_paused = true)]
async fn renders_loading_placeholder_before_history() {
    let h = Harness::open(FakeApi::new());
    let mut app = App::new(h.view, h.rx);
    let text = draw(&mut app);
    assert!(text.contains("Loading conversation"), "{text}");
}

#[tokio::test(start_paused = true)]
async fn long_history_follows_bottom() {
    let history = (0..20).map(|i| inbound(&format!("m-{i}"), i, &format!("mensagem {i}"))).collect();
    let mut h = Harness::open(FakeApi::new().with_messages(history));
    h.pump().await;

    let mut app = App::new(h.view, h.rx);
    let text = draw(&mut app);
    assert!(text.contains("mensagem 19"), "{text}");
    assert!(!text.contains("mensagem 0"), "{text}");
    assert!(app.max_scroll() > 0);
}
