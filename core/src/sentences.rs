//! Sentence segmentation and in-cell duplicate sentence detection.
//!
//! Segmentation is deliberately naive: a sentence is a run of
//! non-terminator characters followed by one of `.`, `!`, `?`. Abbreviations
//! and decimals are not special-cased.

use std::collections::HashMap;

use serde::Serialize;

use crate::Span;

const TERMINATORS: [char; 3] = ['.', '!', '?'];

/// One sentence: trimmed content plus its span in the untrimmed text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SentenceUnit {
    pub text: String,
    pub span: Span,
}

/// Splits `text` into sentence units, including a trailing fragment that
/// lacks a terminator.
pub fn segment(text: &str) -> Vec<SentenceUnit> {
    let mut units = Vec::new();
    let mut pos = 0;
    let mut last_end = 0;

    while let Some(ch) = text[pos..].chars().next() {
        if TERMINATORS.contains(&ch) {
            pos += ch.len_utf8();
            continue;
        }
        let Some(offset) = text[pos..].find(TERMINATORS) else {
            break;
        };
        let end = pos + offset + 1;
        units.push(SentenceUnit {
            text: text[pos..end].trim().to_string(),
            span: Span::new(pos, end),
        });
        pos = end;
        last_end = end;
    }

    let rest = text[last_end..].trim();
    if !rest.is_empty() {
        units.push(SentenceUnit {
            text: rest.to_string(),
            span: Span::new(last_end, text.len()),
        });
    }
    units
}

/// Result of the in-cell duplicate sentence check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DuplicateSentences {
    pub found: bool,
    pub message: String,
    /// Every occurrence of every repeated sentence, in text order.
    pub spans: Vec<Span>,
}

/// Finds sentences whose trimmed content occurs more than once in `text`.
pub fn find_duplicate_sentences(text: &str, message: &str) -> DuplicateSentences {
    let units: Vec<SentenceUnit> = segment(text)
        .into_iter()
        .filter(|u| !u.text.is_empty())
        .collect();
    if units.len() < 2 {
        return DuplicateSentences::default();
    }

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for unit in &units {
        *counts.entry(unit.text.as_str()).or_default() += 1;
    }

    let spans: Vec<Span> = units
        .iter()
        .filter(|u| counts.get(u.text.as_str()).copied().unwrap_or(0) > 1)
        .map(|u| u.span)
        .collect();
    if spans.is_empty() {
        return DuplicateSentences::default();
    }

    DuplicateSentences {
        found: true,
        message: message.to_string(),
        spans,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(units: &[SentenceUnit]) -> Vec<&str> {
        units.iter().map(|u| u.text.as_str()).collect()
    }

    #[test]
    fn empty_and_blank_inputs_have_no_units() {
        assert!(segment("").is_empty());
        assert!(segment("   \n ").is_empty());
    }

    #[test]
    fn text_without_terminator_is_one_fragment() {
        let units = segment("  끝나지 않은 문장 ");
        assert_eq!(texts(&units), vec!["끝나지 않은 문장"]);
        assert_eq!(units[0].span, Span::new(0, "  끝나지 않은 문장 ".len()));
    }

    #[test]
    fn spans_cover_untrimmed_matches() {
        let text = "A b. C d!  tail";
        let units = segment(text);
        assert_eq!(texts(&units), vec!["A b.", "C d!", "tail"]);
        assert_eq!(units[0].span, Span::new(0, 4));
        assert_eq!(units[1].span, Span::new(4, 9));
        assert_eq!(units[2].span, Span::new(9, text.len()));
    }

    #[test]
    fn stray_terminators_are_skipped() {
        let units = segment("Hi!! Ok?");
        assert_eq!(texts(&units), vec!["Hi!", "Ok?"]);
        assert_eq!(units[1].span, Span::new(4, 8));
    }

    #[test]
    fn trailing_terminator_run_becomes_fragment() {
        let units = segment("Wow!!");
        assert_eq!(texts(&units), vec!["Wow!", "!"]);
        assert_eq!(units[1].span, Span::new(4, 5));
    }

    #[test]
    fn decimals_split_naively() {
        let units = segment("3.5점.");
        assert_eq!(texts(&units), vec!["3.", "5점."]);
    }

    #[test]
    fn detects_both_occurrences_of_a_repeated_sentence() {
        let text = "I like apples.  I like apples.";
        let dup = find_duplicate_sentences(text, "중복 문장 존재");
        assert!(dup.found);
        assert_eq!(dup.message, "중복 문장 존재");
        assert_eq!(dup.spans, vec![Span::new(0, 14), Span::new(14, 30)]);
    }

    #[test]
    fn unique_sentences_are_not_duplicates() {
        let dup = find_duplicate_sentences("하나. 둘. 셋.", "dup");
        assert_eq!(dup, DuplicateSentences::default());
    }

    #[test]
    fn single_sentence_is_never_duplicate() {
        assert!(!find_duplicate_sentences("하나.", "dup").found);
    }

    #[test]
    fn fragment_can_duplicate_a_sentence() {
        let text = "좋아요. 좋아요";
        let dup = find_duplicate_sentences(text, "dup");
        assert!(!dup.found);
        let text = "좋아요. 좋아요. 좋아요";
        let dup = find_duplicate_sentences(text, "dup");
        assert_eq!(dup.spans.len(), 2);
    }

    #[test]
    fn comparison_is_case_sensitive() {
        assert!(!find_duplicate_sentences("Yes. yes.", "dup").found);
    }

    #[test]
    fn all_repeated_groups_are_reported_in_order() {
        let text = "가. 나. 가. 나. 다.";
        let dup = find_duplicate_sentences(text, "dup");
        let got: Vec<&str> = dup.spans.iter().map(|s| text[s.start..s.end].trim()).collect();
        assert_eq!(got, vec!["가.", "나.", "가.", "나."]);
    }
}
