//! Merges hard-error and duplication spans into one classified partition of
//! the text.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::{Result, Span};

/// Classification of one atomic segment.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Highlight {
    Plain,
    Hard,
    Duplicate,
}

impl Highlight {
    /// CSS class used by the HTML renderer.
    pub fn css_class(self) -> Option<&'static str> {
        match self {
            Highlight::Plain => None,
            Highlight::Hard => Some("error-highlight"),
            Highlight::Duplicate => Some("sentence-error-highlight"),
        }
    }
}

/// A piece of the original text that lies wholly inside or outside every span.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Segment<'a> {
    pub text: &'a str,
    pub span: Span,
    pub class: Highlight,
}

/// Partitions `text` at every span edge and classifies each piece. Hard
/// containment wins over duplicate containment. Concatenating the segment
/// texts yields `text` unchanged.
///
/// Fails if any span is empty, out of range, or not on a char boundary of
/// `text`.
pub fn merge<'a>(text: &'a str, hard: &[Span], dup: &[Span]) -> Result<Vec<Segment<'a>>> {
    let mut boundaries = BTreeSet::from([0, text.len()]);
    for span in hard.iter().chain(dup) {
        span.validate(text)?;
        boundaries.insert(span.start);
        boundaries.insert(span.end);
    }

    let points: Vec<usize> = boundaries.into_iter().collect();
    let mut segments = Vec::with_capacity(points.len());
    for pair in points.windows(2) {
        let piece = Span::new(pair[0], pair[1]);
        if piece.start >= piece.end {
            continue;
        }
        let class = if hard.iter().any(|s| s.contains(piece)) {
            Highlight::Hard
        } else if dup.iter().any(|s| s.contains(piece)) {
            Highlight::Duplicate
        } else {
            Highlight::Plain
        };
        segments.push(Segment {
            text: &text[piece.start..piece.end],
            span: piece,
            class,
        });
    }
    Ok(segments)
}

/// Renders segments as HTML, escaping text and wrapping highlighted pieces
/// in `<span class="...">`.
pub fn render_html(segments: &[Segment<'_>]) -> String {
    let mut out = String::new();
    for segment in segments {
        match segment.class.css_class() {
            Some(class) => {
                out.push_str("<span class=\"");
                out.push_str(class);
                out.push_str("\">");
                escape_html_into(segment.text, &mut out);
                out.push_str("</span>");
            }
            None => escape_html_into(segment.text, &mut out),
        }
    }
    out
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    escape_html_into(text, &mut out);
    out
}

fn escape_html_into(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
}
