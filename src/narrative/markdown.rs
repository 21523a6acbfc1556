//! Terminal rendering for the markdown subset the model is asked to produce:
//! headers, `-`/`*`/numbered bullets and `**bold**` spans.

use colored::Colorize;
use lazy_static::lazy_static;
use pulldown_cmark::{Event, HeadingLevel, Parser, Tag, TagEnd};
use regex::Regex;

lazy_static! {
    static ref RE_THINK_TAGS: Regex = Regex::new(r"(?s)<think>.*?</think>").unwrap();
    static ref RE_OPEN_THINK: Regex = Regex::new(r"(?s)<think>.*$").unwrap();
}

/// Removes `<think>…</think>` reasoning blocks. A block still open at the
/// end of a partial snapshot is hidden as well.
pub fn clean_ai_output(text: &str) -> String {
    let closed = RE_THINK_TAGS.replace_all(text, "");
    RE_OPEN_THINK.replace(&closed, "").into_owned()
}

#[derive(Debug, Clone, Copy)]
enum Inline {
    Heading(HeadingLevel),
    Strong,
    Emphasis,
}

#[derive(Debug, Clone, Copy)]
struct ListState {
    next_number: Option<u64>,
}

struct RenderState {
    styled: bool,
    lines: Vec<String>,
    current: String,
    inline: Vec<Inline>,
    lists: Vec<ListState>,
    in_code_block: bool,
    needs_blank: bool,
}

impl RenderState {
    fn new(styled: bool) -> Self {
        Self {
            styled,
            lines: Vec::new(),
            current: String::new(),
            inline: Vec::new(),
            lists: Vec::new(),
            in_code_block: false,
            needs_blank: false,
        }
    }

    fn process<'a>(&mut self, parser: impl Iterator<Item = Event<'a>>) {
        for event in parser {
            match event {
                Event::Start(tag) => self.start_tag(tag),
                Event::End(tag) => self.end_tag(tag),
                Event::Text(text) => self.text(&text),
                Event::Code(code) => self.current.push_str(&code),
                Event::SoftBreak | Event::HardBreak => self.flush_line(),
                Event::Rule => {
                    self.flush_blank();
                    self.lines.push("---".to_string());
                    self.needs_blank = true;
                }
                _ => {}
            }
        }
    }

    fn start_tag(&mut self, tag: Tag) {
        match tag {
            Tag::Heading { level, .. } => {
                self.flush_blank();
                self.inline.push(Inline::Heading(level));
            }
            Tag::Paragraph | Tag::BlockQuote(_) if self.lists.is_empty() => self.flush_blank(),
            Tag::CodeBlock(_) => {
                self.flush_blank();
                self.in_code_block = true;
            }
            Tag::Strong => self.inline.push(Inline::Strong),
            Tag::Emphasis => self.inline.push(Inline::Emphasis),
            Tag::List(start) => {
                if self.lists.is_empty() {
                    self.flush_blank();
                } else {
                    self.flush_line();
                }
                self.lists.push(ListState { next_number: start });
            }
            Tag::Item => {
                self.flush_line();
                let depth = self.lists.len().saturating_sub(1);
                let marker = match self.lists.last_mut() {
                    Some(ListState {
                        next_number: Some(n),
                    }) => {
                        let marker = format!("{n}.");
                        *n += 1;
                        marker
                    }
                    _ => "•".to_string(),
                };
                self.current = format!("{}{} ", "  ".repeat(depth), marker);
            }
            _ => {}
        }
    }

    fn end_tag(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Heading(_) => {
                self.inline.pop();
                self.flush_line();
                self.needs_blank = true;
            }
            TagEnd::Paragraph | TagEnd::BlockQuote(_) => {
                self.flush_line();
                self.needs_blank = self.lists.is_empty();
            }
            TagEnd::CodeBlock => {
                self.flush_line();
                self.in_code_block = false;
                self.needs_blank = true;
            }
            TagEnd::Strong | TagEnd::Emphasis => {
                self.inline.pop();
            }
            TagEnd::List(_) => {
                self.flush_line();
                self.lists.pop();
                self.needs_blank = self.lists.is_empty();
            }
            TagEnd::Item => self.flush_line(),
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        if self.in_code_block {
            for line in text.lines() {
                self.lines.push(format!("    {line}"));
            }
            return;
        }
        if !self.styled || self.inline.is_empty() {
            self.current.push_str(text);
            return;
        }
        let mut span = text.normal();
        for style in &self.inline {
            span = match style {
                Inline::Heading(HeadingLevel::H1) => span.bold().underline(),
                Inline::Heading(HeadingLevel::H2) => span.bold().cyan(),
                Inline::Heading(_) | Inline::Strong => span.bold(),
                Inline::Emphasis => span.italic(),
            };
        }
        self.current.push_str(&span.to_string());
    }

    fn flush_line(&mut self) {
        if !self.current.is_empty() {
            self.lines.push(std::mem::take(&mut self.current));
        }
    }

    fn flush_blank(&mut self) {
        self.flush_line();
        if self.needs_blank && !self.lines.is_empty() {
            self.lines.push(String::new());
        }
        self.needs_blank = false;
    }

    fn finish(mut self) -> String {
        self.flush_line();
        self.lines.join("\n")
    }
}

/// Render one snapshot for the terminal. With `styled == false` only the
/// markup is removed, which keeps output stable for pipes and tests. Both
/// modes produce the same visible characters.
pub fn render_markdown(text: &str, styled: bool) -> String {
    let cleaned = clean_ai_output(text);
    let mut state = RenderState::new(styled);
    state.process(Parser::new(cleaned.trim()));
    state.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_ai_output_strips_think_blocks() {
        assert_eq!(clean_ai_output("<think>plan</think>Answer"), "Answer");
        assert_eq!(clean_ai_output("Answer<think>still going"), "Answer");
        assert_eq!(clean_ai_output("plain"), "plain");
    }

    #[test]
    fn test_render_plain_structure() {
        let text = "# Overall Summary\n- **CTR** is slow\n  - Team A\n\n1. Fix feeds\n2. Page owners\n\nBody **bold** text";
        let rendered = render_markdown(text, false);
        assert_eq!(
            rendered,
            "Overall Summary\n\n• CTR is slow\n  • Team A\n\n1. Fix feeds\n2. Page owners\n\nBody bold text"
        );
    }

    #[test]
    fn test_bold_across_lines_and_escapes() {
        let rendered = render_markdown("**slow\nfeeds** and \\*literal\\*", false);
        assert_eq!(rendered, "slow\nfeeds and *literal*");
    }

    #[test]
    fn test_render_styled_keeps_text() {
        let rendered = render_markdown("## Analysis of **CTR**\n- **X**", true);
        assert!(rendered.contains("Analysis"));
        assert!(rendered.contains("CTR"));
        assert!(rendered.contains('X'));
        assert!(!rendered.contains("**"));
        assert!(!rendered.contains("##"));
    }

    #[test]
    fn test_partial_snapshot_renders() {
        assert_eq!(render_markdown("- first\n- sec", false), "• first\n• sec");
        assert_eq!(render_markdown("Answer<think>pending", false), "Answer");
    }
}
