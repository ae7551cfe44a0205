//! Fixed-pattern rules (PatternMatcher).
//!
//! Built-in rules are plain data: character runs, character sets and token
//! alternatives with optional word boundaries. A generic scanner walks the
//! text left to right and reports non-overlapping matches per rule, the same
//! way a leftmost-first regex search would. All comparisons are
//! case-insensitive.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{Error, Result, Span};

/// How a rule recognises its spans.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Pattern {
    /// Maximal run of `ch` at least `min` characters long.
    Run { ch: char, min: usize },
    /// Every occurrence of any listed character, one span each.
    CharSet { chars: String },
    /// One alternative from each group, concatenated. Alternatives are tried
    /// in listed order.
    Tokens {
        groups: Vec<Vec<String>>,
        #[serde(default)]
        left_boundary: bool,
        #[serde(default)]
        right_boundary: bool,
    },
    /// User-supplied expression, compiled case-insensitively.
    Regex { pattern: String },
}

/// A labelled pattern together with the message it triggers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Rule {
    pub label: String,
    pub message: String,
    pub pattern: Pattern,
}

impl Rule {
    pub fn new(label: &str, message: &str, pattern: Pattern) -> Self {
        Self {
            label: label.into(),
            message: message.into(),
            pattern,
        }
    }
}

const SPECIAL_SYMBOLS: &str = "!@#$%^&*_=+[]{};'\":\\|<>/?~`()·";
const LATIN_LETTERS: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const FIRST_PERSON: &[&str] = &[
    "나의", "나만의", "내 ", "내가", "내는", "저의", "저만의", "제 ", "제가", "제는",
];
const PAST_STEMS: &[&str] = &["었", "았", "였"];
const SENTENCE_ENDINGS: &[&str] = &["다", "습니다", "어요", "음"];

static DEFAULT_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    let words = |list: &[&str]| list.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    vec![
        Rule::new("띄어쓰기 두번", "띄어쓰기 두번", Pattern::Run { ch: ' ', min: 2 }),
        Rule::new(
            "특수 기호",
            "특수 기호",
            Pattern::CharSet {
                chars: SPECIAL_SYMBOLS.into(),
            },
        ),
        Rule::new(
            "영어",
            "영어 포함",
            Pattern::CharSet {
                chars: LATIN_LETTERS.into(),
            },
        ),
        Rule::new(
            "1인칭",
            "1인칭 표현",
            Pattern::Tokens {
                groups: vec![words(FIRST_PERSON)],
                left_boundary: true,
                right_boundary: true,
            },
        ),
        Rule::new(
            "과거형",
            "과거형 종결 어미",
            Pattern::Tokens {
                groups: vec![words(PAST_STEMS), words(SENTENCE_ENDINGS)],
                left_boundary: false,
                right_boundary: true,
            },
        ),
    ]
});

/// The built-in rule set, in evaluation order.
pub fn default_rules() -> Vec<Rule> {
    DEFAULT_RULES.clone()
}

enum Matcher {
    Run { ch: char, min: usize },
    CharSet(Vec<char>),
    Tokens {
        groups: Vec<Vec<String>>,
        left_boundary: bool,
        right_boundary: bool,
    },
    Regex(Regex),
}

struct CompiledRule {
    label: String,
    message: String,
    matcher: Matcher,
}

/// Raw output of a rule scan over one text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scan {
    /// Every match of every rule, sorted by position. Overlaps are kept.
    pub spans: Vec<Span>,
    /// Triggered messages, each at most once, in rule order.
    pub messages: Vec<String>,
}

/// Compiled rules, reusable across cells.
pub struct RuleSet {
    rules: Vec<CompiledRule>,
}

impl RuleSet {
    pub fn new(rules: &[Rule]) -> Result<Self> {
        let mut compiled = Vec::with_capacity(rules.len());
        for rule in rules {
            let matcher = match &rule.pattern {
                Pattern::Run { ch, min } => Matcher::Run {
                    ch: *ch,
                    min: (*min).max(1),
                },
                Pattern::CharSet { chars } => Matcher::CharSet(chars.chars().collect()),
                Pattern::Tokens {
                    groups,
                    left_boundary,
                    right_boundary,
                } => Matcher::Tokens {
                    groups: groups.clone(),
                    left_boundary: *left_boundary,
                    right_boundary: *right_boundary,
                },
                Pattern::Regex { pattern } => {
                    let regex = Regex::new(&format!("(?i){pattern}")).map_err(|source| {
                        Error::InvalidRegex {
                            label: rule.label.clone(),
                            source,
                        }
                    })?;
                    Matcher::Regex(regex)
                }
            };
            compiled.push(CompiledRule {
                label: rule.label.clone(),
                message: rule.message.clone(),
                matcher,
            });
        }
        Ok(Self { rules: compiled })
    }

    /// Applies every rule to `text`.
    pub fn scan(&self, text: &str) -> Scan {
        let mut scan = Scan::default();
        for rule in &self.rules {
            let before = scan.spans.len();
            rule.matcher.find_all(text, &mut scan.spans);
            let hits = scan.spans.len() - before;
            if hits == 0 {
                continue;
            }
            trace!(rule = %rule.label, hits, "rule matched");
            if !scan.messages.contains(&rule.message) {
                scan.messages.push(rule.message.clone());
            }
        }
        scan.spans.sort();
        scan
    }
}

impl Matcher {
    fn find_all(&self, text: &str, out: &mut Vec<Span>) {
        if let Matcher::Regex(regex) = self {
            out.extend(
                regex
                    .find_iter(text)
                    .filter(|m| m.end() > m.start())
                    .map(|m| Span::new(m.start(), m.end())),
            );
            return;
        }
        let mut pos = 0;
        while let Some(ch) = text[pos..].chars().next() {
            match self.match_at(text, pos) {
                Some(end) if end > pos => {
                    out.push(Span::new(pos, end));
                    pos = end;
                }
                _ => pos += ch.len_utf8(),
            }
        }
    }

    /// End offset of a match starting exactly at `pos`, if any.
    fn match_at(&self, text: &str, pos: usize) -> Option<usize> {
        match self {
            Matcher::Run { ch, min } => {
                let mut count = 0;
                let mut end = pos;
                for c in text[pos..].chars() {
                    if !chars_eq(c, *ch) {
                        break;
                    }
                    count += 1;
                    end += c.len_utf8();
                }
                (count >= *min).then_some(end)
            }
            Matcher::CharSet(set) => {
                let c = text[pos..].chars().next()?;
                set.iter()
                    .any(|s| chars_eq(*s, c))
                    .then(|| pos + c.len_utf8())
            }
            Matcher::Tokens {
                groups,
                left_boundary,
                right_boundary,
            } => {
                if *left_boundary && !is_word_boundary(text, pos) {
                    return None;
                }
                match_groups(text, pos, groups, *right_boundary)
            }
            Matcher::Regex(_) => None,
        }
    }
}

/// Tries alternatives group by group, backtracking on failure.
fn match_groups(
    text: &str,
    pos: usize,
    groups: &[Vec<String>],
    right_boundary: bool,
) -> Option<usize> {
    let Some((first, rest)) = groups.split_first() else {
        return (!right_boundary || is_word_boundary(text, pos)).then_some(pos);
    };
    first.iter().find_map(|alt| {
        let end = match_literal(text, pos, alt)?;
        match_groups(text, end, rest, right_boundary)
    })
}

fn match_literal(text: &str, pos: usize, literal: &str) -> Option<usize> {
    let mut hay = text[pos..].chars();
    let mut end = pos;
    for want in literal.chars() {
        let got = hay.next()?;
        if !chars_eq(got, want) {
            return None;
        }
        end += got.len_utf8();
    }
    Some(end)
}

fn single_lower(c: char) -> char {
    // The only char whose lowercase expands; its simple mapping is `i`.
    if c == '\u{130}' {
        return 'i';
    }
    let mut it = c.to_lowercase();
    match (it.next(), it.next()) {
        (Some(l), None) => l,
        _ => c,
    }
}

fn single_upper(c: char) -> char {
    let mut it = c.to_uppercase();
    match (it.next(), it.next()) {
        (Some(u), None) => u,
        _ => c,
    }
}

/// Case-insensitive character equality.
fn chars_eq(a: char, b: char) -> bool {
    a == b || single_lower(a) == single_lower(b) || single_upper(a) == single_upper(b)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// True when exactly one side of `pos` is a word character.
fn is_word_boundary(text: &str, pos: usize) -> bool {
    let before = text[..pos].chars().next_back().is_some_and(is_word_char);
    let after = text[pos..].chars().next().is_some_and(is_word_char);
    before != after
}
