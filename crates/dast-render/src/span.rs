//! Styled text produced by the printer, and its output sinks.

use colored::Colorize;
use serde::{Deserialize, Serialize};

/// How a run of text is displayed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Style {
    Plain,
    /// Present only in the before tree.
    Removed,
    /// Present only in the after tree.
    Added,
    /// Arrow between the old and new side of a change.
    Separator,
    /// Unchanged content that moved within its sequence.
    Moved,
}

/// A run of text in one style.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub text: String,
    pub style: Style,
}

/// Printer output: a list of styled spans.
///
/// Adjacent spans never share a style and no span is empty.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rendered {
    spans: Vec<Span>,
}

impl Rendered {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append text, coalescing with the previous span when styles match.
    pub fn push(&mut self, text: &str, style: Style) {
        if text.is_empty() {
            return;
        }
        match self.spans.last_mut() {
            Some(last) if last.style == style => last.text.push_str(text),
            _ => self.spans.push(Span {
                text: text.to_string(),
                style,
            }),
        }
    }

    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// All text without any styling.
    pub fn plain_text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }

    /// The text with deletions and change arrows dropped. For a rendered
    /// diff this is the canonical text of the after tree.
    pub fn after_text(&self) -> String {
        self.spans
            .iter()
            .filter(|s| !matches!(s.style, Style::Removed | Style::Separator))
            .map(|s| s.text.as_str())
            .collect()
    }

    /// Textual markers for terminals without colour: `[-old-]`, `{+new+}`
    /// and `{~moved~}`.
    pub fn to_markers(&self) -> String {
        let mut out = String::new();
        for span in &self.spans {
            let (open, close) = match span.style {
                Style::Plain | Style::Separator => ("", ""),
                Style::Removed => ("[-", "-]"),
                Style::Added => ("{+", "+}"),
                Style::Moved => ("{~", "~}"),
            };
            out.push_str(open);
            out.push_str(&span.text);
            out.push_str(close);
        }
        out
    }

    /// ANSI colours: red deletions, green insertions, yellow arrows and cyan
    /// moves. Honours the `colored` crate's global override.
    pub fn to_ansi(&self) -> String {
        self.spans
            .iter()
            .map(|span| match span.style {
                Style::Plain => span.text.clone(),
                Style::Removed => span.text.red().to_string(),
                Style::Added => span.text.green().to_string(),
                Style::Separator => span.text.yellow().to_string(),
                Style::Moved => span.text.cyan().to_string(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Rendered {
        let mut r = Rendered::new();
        r.push("x = ", Style::Plain);
        r.push("1", Style::Removed);
        r.push("->", Style::Separator);
        r.push("2", Style::Added);
        r
    }

    #[test]
    fn push_coalesces_and_skips_empty() {
        let mut r = Rendered::new();
        r.push("a", Style::Plain);
        r.push("", Style::Added);
        r.push("b", Style::Plain);
        assert_eq!(r.spans().len(), 1);
        assert_eq!(r.plain_text(), "ab");
    }

    #[test]
    fn after_text_drops_deletions_and_arrows() {
        assert_eq!(sample().after_text(), "x = 2");
        assert_eq!(sample().plain_text(), "x = 1->2");
    }

    #[test]
    fn markers_wrap_styled_spans() {
        assert_eq!(sample().to_markers(), "x = [-1-]->{+2+}");
    }

    #[test]
    fn ansi_without_colour_is_plain() {
        colored::control::set_override(false);
        assert_eq!(sample().to_ansi(), "x = 1->2");
        colored::control::unset_override();
    }
}
