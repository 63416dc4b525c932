use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Span;
use ratatui::Frame;

use crate::error::Result;

pub const HEADER_STYLE: Style = Style::new()
    .fg(Color::Yellow)
    .add_modifier(Modifier::BOLD);

pub const FOOTER_STYLE: Style = Style::new().fg(Color::DarkGray);

pub const TITLE_STYLE: Style = Style::new().add_modifier(Modifier::BOLD);

pub const SELECTED_STYLE: Style = Style::new()
    .bg(Color::Rgb(40, 40, 60))
    .add_modifier(Modifier::BOLD);

pub const ACTIVE_TAB_STYLE: Style = Style::new()
    .fg(Color::Black)
    .bg(Color::Yellow)
    .add_modifier(Modifier::BOLD);

pub const GOOD_STYLE: Style = Style::new().fg(Color::Rgb(80, 220, 100));
pub const BAD_STYLE: Style = Style::new().fg(Color::Red);

/// Series colors for charts, cycled by series index.
pub const PALETTE: &[Color] = &[
    Color::Cyan,
    Color::Yellow,
    Color::Rgb(80, 220, 100),
    Color::Magenta,
    Color::Rgb(255, 150, 50),
    Color::LightBlue,
    Color::LightRed,
    Color::White,
];

pub fn series_color(i: usize) -> Color {
    PALETTE[i % PALETTE.len()]
}

/// A metric value as a Span, red when it is not a finite number.
pub fn metric_span(value: &str) -> Span<'static> {
    let style = if value.contains("NaN") || value.contains("inf") {
        BAD_STYLE
    } else {
        GOOD_STYLE.add_modifier(Modifier::BOLD)
    };
    Span::styled(value.to_string(), style)
}

/// Truncate to `width` columns with an ellipsis.
pub fn truncate(text: &str, width: usize) -> String {
    if width == 0 {
        return String::new();
    }
    if text.chars().count() <= width {
        return text.to_string();
    }
    let wrapped = textwrap::wrap(text, width.saturating_sub(1).max(1));
    let first = wrapped.first().map(|l| l.to_string()).unwrap_or_default();
    let cut: String = first.chars().take(width.saturating_sub(1)).collect();
    format!("{cut}\u{2026}")
}

// ---------------------------------------------------------------------------
// Screen infrastructure
// ---------------------------------------------------------------------------

pub enum ScreenAction {
    Continue,
    Close,
}

pub trait Screen {
    fn draw(&mut self, frame: &mut Frame);
    fn handle_key(&mut self, code: KeyCode) -> ScreenAction;
}

/// Run an interactive ratatui screen. Sets up the terminal, event loop,
/// and panic hook, then restores the terminal on exit.
pub fn run_screen(screen: &mut dyn Screen) -> Result<()> {
    let hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        ratatui::restore();
        hook(info);
    }));

    let mut terminal = ratatui::init();

    let result: Result<()> = loop {
        if let Err(e) = terminal.draw(|frame| screen.draw(frame)) {
            break Err(e.into());
        }

        match event::read() {
            Err(e) => break Err(e.into()),
            Ok(Event::Key(key)) => {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if key.modifiers.contains(KeyModifiers::CONTROL)
                    && key.code == KeyCode::Char('c')
                {
                    break Ok(());
                }
                match screen.handle_key(key.code) {
                    ScreenAction::Close => break Ok(()),
                    ScreenAction::Continue => {}
                }
            }
            _ => {}
        }
    };

    drop(terminal);
    ratatui::restore();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Facebook", 20), "Facebook");
        assert_eq!(truncate("Innovate Industries", 9), "Innovate\u{2026}");
        assert_eq!(truncate("abc", 0), "");
    }

    #[test]
    fn test_series_color_cycles() {
        assert_eq!(series_color(0), series_color(PALETTE.len()));
    }
}
