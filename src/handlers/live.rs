//! Terminal view for streamed answers: every new snapshot replaces the
//! previously printed one.

use std::io::{self, IsTerminal, Write};

use unicode_width::UnicodeWidthStr;

use crate::narrative::{clean_ai_output, render_markdown, StreamOutcome};

/// Rows `text` occupies on a terminal `columns` wide, soft wraps included.
pub fn screen_rows(text: &str, columns: usize) -> usize {
    let columns = columns.max(1);
    text.lines()
        .map(|line| line.width().div_ceil(columns).max(1))
        .sum()
}

pub struct LiveView {
    live: bool,
    printed_rows: usize,
}

impl LiveView {
    /// Redraw in place only when stdout is a terminal.
    pub fn new(enabled: bool) -> Self {
        Self {
            live: enabled && io::stdout().is_terminal(),
            printed_rows: 0,
        }
    }

    pub fn render(&mut self, snapshot: &str) {
        if !self.live {
            return;
        }
        let cleaned = clean_ai_output(snapshot);
        let text = render_markdown(&cleaned, true);
        let columns = match crossterm::terminal::size() {
            Ok((columns, _)) => usize::from(columns),
            Err(e) => {
                tracing::debug!("无法获取终端宽度: {}", e);
                usize::MAX
            }
        };

        let mut out = io::stdout().lock();
        // Move to the first row of the previous frame and clear below it.
        if self.printed_rows > 0 {
            let _ = write!(out, "\x1b[{}F\x1b[J", self.printed_rows);
        }
        let _ = writeln!(out, "{text}");
        let _ = out.flush();
        // Styling adds no visible characters, so measure the plain rendering.
        self.printed_rows = screen_rows(&render_markdown(&cleaned, false), columns).max(1);
    }

    /// Print the final text when nothing was drawn live.
    pub fn finish(self, outcome: &StreamOutcome) {
        if !self.live {
            println!("{}", render_markdown(&clean_ai_output(outcome.text()), false));
        }
        if outcome.is_cancelled() {
            eprintln!("(cancelled)");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_screen_rows_counts_soft_wraps() {
        assert_eq!(screen_rows("short\nlines", 80), 2);
        assert_eq!(screen_rows(&"x".repeat(80), 80), 1);
        assert_eq!(screen_rows(&"x".repeat(81), 80), 2);
        assert_eq!(screen_rows(&format!("{}\n\nend", "y".repeat(200)), 80), 5);
    }

    #[test]
    fn test_screen_rows_uses_display_width() {
        assert_eq!(screen_rows("事件事件事件", 6), 2);
        assert_eq!(screen_rows("any", usize::MAX), 1);
        assert_eq!(screen_rows("", 80), 0);
    }
}
