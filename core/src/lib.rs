//! Record Comment Guard core engine.
//! Flags stylistic problems in free-text record comments (spacing, symbols,
//! Latin letters, first-person pronouns, past-tense endings), repeated
//! sentences inside a cell, and cells repeated across rows of a column, then
//! merges the offending spans into a single highlight sequence.

use serde::{Deserialize, Serialize};

pub mod analyzer;
pub mod cells;
pub mod highlight;
pub mod rules;
pub mod sentences;
pub mod sheet;

pub use analyzer::{inspect, Analyzer, Report, ResultRecord, Table};
pub use cells::{ColumnCell, DuplicateCellIndex, DuplicateLookup};
pub use highlight::{merge, render_html, Highlight, Segment};
pub use rules::{Pattern, Rule, RuleSet, Scan};
pub use sentences::{find_duplicate_sentences, segment, DuplicateSentences, SentenceUnit};
pub use sheet::Sheet;

/// Errors raised by the engine and the sheet layer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("span {start}..{end} is not a valid range of a {len}-byte text")]
    InvalidSpan { start: usize, end: usize, len: usize },
    #[error("invalid regex in rule `{label}`: {source}")]
    InvalidRegex {
        label: String,
        #[source]
        source: regex::Error,
    },
    #[error("no header row containing `{marker}` in the first {scanned} rows")]
    HeaderNotFound { marker: String, scanned: usize },
    #[error("header row found, but no column name contains `{marker}`")]
    NoTargetColumn { marker: String },
    #[error("unknown column `{0}`")]
    UnknownColumn(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Half-open byte range into one specific text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Span covering all of `text`.
    pub fn whole(text: &str) -> Self {
        Self::new(0, text.len())
    }

    /// Same range counted in chars of `text` instead of bytes.
    pub fn to_chars(&self, text: &str) -> Span {
        let count = |at: usize| text.get(..at).map_or(0, |head| head.chars().count());
        Span::new(count(self.start), count(self.end))
    }

    pub fn contains(&self, other: Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Checks the span is non-empty, in range and on char boundaries of `text`.
    pub fn validate(&self, text: &str) -> Result<()> {
        let ok = self.start < self.end
            && self.end <= text.len()
            && text.is_char_boundary(self.start)
            && text.is_char_boundary(self.end);
        if ok {
            Ok(())
        } else {
            Err(Error::InvalidSpan {
                start: self.start,
                end: self.end,
                len: text.len(),
            })
        }
    }
}

/// Human-readable messages emitted for the duplicate checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Messages {
    pub duplicate_sentence: String,
    /// Template with `{column}` and `{partners}` placeholders.
    pub duplicate_cell: String,
    pub unknown_partner: String,
    /// Positional identifier used when no identifier column exists; `{row}` placeholder.
    pub row_label: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            duplicate_sentence: "중복 문장 존재".into(),
            duplicate_cell: "'{column}' 전체 내용 중복 (중복 대상: {partners})".into(),
            unknown_partner: "알 수 없음".into(),
            row_label: "{row}번 행".into(),
        }
    }
}

impl Messages {
    pub fn duplicate_cell_message(&self, column: &str, partners: &[String]) -> String {
        let partners = if partners.is_empty() {
            self.unknown_partner.clone()
        } else {
            partners.join(", ")
        };
        fill_template(
            &self.duplicate_cell,
            &[("column", column), ("partners", partners.as_str())],
        )
    }

    pub fn row_label(&self, row: usize) -> String {
        fill_template(&self.row_label, &[("row", row.to_string().as_str())])
    }
}

/// Substitutes `{key}` placeholders in one pass. Substituted values are not
/// rescanned.
fn fill_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        rest = &rest[open..];
        let hit = vars.iter().find_map(|&(key, value)| {
            rest.strip_prefix('{')?
                .strip_prefix(key)?
                .strip_prefix('}')
                .map(|after| (value, after))
        });
        match hit {
            Some((value, after)) => {
                out.push_str(value);
                rest = after;
            }
            None => {
                out.push('{');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Sheet layout hints used when locating the header and identifier column.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetConfig {
    pub header_marker: String,
    pub header_scan_rows: usize,
    pub id_column: Option<String>,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            header_marker: "특기사항".into(),
            header_scan_rows: 20,
            id_column: Some("성명".into()),
        }
    }
}

/// Top-level configuration for the checker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub rules: Vec<Rule>,
    pub messages: Messages,
    pub sheet: SheetConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rules: rules::default_rules(),
            messages: Messages::default(),
            sheet: SheetConfig::default(),
        }
    }
}

impl Config {
    pub fn from_yaml(text: &str) -> std::result::Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_cell_message_joins_partners() {
        let messages = Messages::default();
        let msg = messages.duplicate_cell_message("특기사항", &["김철수".into(), "5번 행".into()]);
        assert_eq!(msg, "'특기사항' 전체 내용 중복 (중복 대상: 김철수, 5번 행)");
    }

    #[test]
    fn duplicate_cell_message_falls_back_without_partners() {
        let messages = Messages::default();
        let msg = messages.duplicate_cell_message("특기사항", &[]);
        assert_eq!(msg, "'특기사항' 전체 내용 중복 (중복 대상: 알 수 없음)");
    }

    #[test]
    fn placeholders_inside_values_are_left_alone() {
        let messages = Messages::default();
        let msg = messages.duplicate_cell_message("비고 {partners}", &["{column}".into()]);
        assert_eq!(msg, "'비고 {partners}' 전체 내용 중복 (중복 대상: {column})");
        assert_eq!(fill_template("{x} {y} {", &[("x", "1")]), "1 {y} {");
    }

    #[test]
    fn char_offsets_count_hangul_as_one() {
        let text = "나의 꿈";
        assert_eq!(Span::new(0, 6).to_chars(text), Span::new(0, 2));
        assert_eq!(Span::whole(text).to_chars(text), Span::new(0, 4));
    }

    #[test]
    fn span_validation_rejects_bad_ranges() {
        let text = "가나";
        assert!(Span::new(0, 3).validate(text).is_ok());
        assert!(Span::new(0, 0).validate(text).is_err());
        assert!(Span::new(1, 3).validate(text).is_err());
        assert!(Span::new(3, 9).validate(text).is_err());
    }

    #[test]
    fn partial_yaml_keeps_default_rules() {
        let cfg = Config::from_yaml("sheet:\n  header_scan_rows: 5\n").unwrap();
        assert_eq!(cfg.sheet.header_scan_rows, 5);
        assert_eq!(cfg.sheet.header_marker, "특기사항");
        assert_eq!(cfg.rules.len(), 5);
    }
}
