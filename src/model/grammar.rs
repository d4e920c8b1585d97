// File: src/model/grammar.rs
//! Inline decoration grammar for checkbox task lines.
//!
//! Every matcher in this module is total: it yields a match or `None`, never an error.
//! Each decoration is matched independently of the others.
use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;
use strum::{EnumIter, IntoStaticStr};

pub const DEFAULT_PRIORITY_TAGS: [&str; 7] = ["p1", "p2", "p3", "p4", "p5", "p6", "p7"];

// `- [ ] text`, `* [x] text`. Only space, x and X are valid states.
static CHECKBOX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[-*]\s+\[([ xX])\](?:\s(.*))?$").unwrap());

static START_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)@start\(([^()]+)\)").unwrap());
static DUE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)@due\(([^()]+)\)").unwrap());
static RECUR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)@recur\(([^()]+)\)").unwrap());

/// A checkbox line split into its parts. Offsets are byte offsets into the line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkbox<'a> {
    pub done: bool,
    /// Offset of the state character between the brackets.
    pub marker: usize,
    /// Everything after the marker's separating whitespace, untrimmed.
    pub text: &'a str,
    pub text_start: usize,
}

pub fn match_checkbox(line: &str) -> Option<Checkbox<'_>> {
    let caps = CHECKBOX_RE.captures(line)?;
    let state = caps.get(1)?;
    let (text, text_start) = match caps.get(2) {
        Some(m) => (m.as_str(), m.start()),
        None => ("", line.len()),
    };
    Some(Checkbox {
        done: state.as_str().eq_ignore_ascii_case("x"),
        marker: state.start(),
        text,
        text_start,
    })
}

/// Rewrites only the state character of a matched checkbox.
pub fn set_marker(line: &str, checkbox: &Checkbox<'_>, done: bool) -> String {
    let mut out = String::with_capacity(line.len());
    out.push_str(&line[..checkbox.marker]);
    out.push(if done { 'x' } else { ' ' });
    out.push_str(&line[checkbox.marker + 1..]);
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum Decoration {
    Start,
    Due,
    Recur,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecorationMatch<'a> {
    /// Span of the whole `@tag(value)` text.
    pub span: Range<usize>,
    pub value: &'a str,
}

impl Decoration {
    pub fn tag(self) -> &'static str {
        self.into()
    }

    fn pattern(self) -> &'static Regex {
        match self {
            Decoration::Start => &START_RE,
            Decoration::Due => &DUE_RE,
            Decoration::Recur => &RECUR_RE,
        }
    }

    /// First occurrence of this decoration in `text`. Later duplicates are ignored.
    pub fn find(self, text: &str) -> Option<DecorationMatch<'_>> {
        let caps = self.pattern().captures(text)?;
        let whole = caps.get(0)?;
        let value = caps.get(1)?;
        Some(DecorationMatch {
            span: whole.range(),
            value: value.as_str(),
        })
    }

    pub fn value(self, text: &str) -> Option<String> {
        self.find(text).map(|m| m.value.to_string())
    }

    pub fn render(self, value: &str) -> String {
        format!("@{}({})", self.tag(), value)
    }
}

/// Ordered list of priority tags. A tag's rank is its 1-based position.
///
/// The list is never empty: blank entries are dropped and an empty
/// configuration falls back to [`DEFAULT_PRIORITY_TAGS`].
#[derive(Debug, Clone)]
pub struct PriorityTags {
    tags: Vec<String>,
    matcher: Option<Regex>,
}

impl PriorityTags {
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tags: Vec<String> = tags
            .into_iter()
            .map(|t| t.as_ref().trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        if tags.is_empty() {
            tags = DEFAULT_PRIORITY_TAGS.iter().map(|t| t.to_string()).collect();
        }

        let alternation = tags
            .iter()
            .map(|t| regex::escape(t))
            .collect::<Vec<_>>()
            .join("|");
        // No look-around in `regex`, so the word boundaries are consumed explicitly.
        let matcher = Regex::new(&format!(r"(?i)(?:^|\W)({})(?:$|\W)", alternation)).ok();

        Self { tags, matcher }
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn label(&self, rank: usize) -> Option<&str> {
        rank.checked_sub(1)
            .and_then(|i| self.tags.get(i))
            .map(String::as_str)
    }

    /// Rank used when neither a task nor its document carries a tag.
    pub fn middle_rank(&self) -> usize {
        self.tags.len().div_ceil(2)
    }

    /// Rank of the first priority tag appearing in `text`, matched as a whole word.
    pub fn rank_in(&self, text: &str) -> Option<usize> {
        let caps = self.matcher.as_ref()?.captures(text)?;
        let found = caps.get(1)?.as_str().to_lowercase();
        self.tags
            .iter()
            .position(|t| t.to_lowercase() == found)
            .map(|i| i + 1)
    }
}

impl Default for PriorityTags {
    fn default() -> Self {
        Self::new(DEFAULT_PRIORITY_TAGS)
    }
}

/// True when `text` contains `#tag` as a complete tag (`#projects` does not match
/// `#projectsarchive` or `#projects/old`). The tag may be given with or without `#`.
pub fn contains_hashtag(text: &str, tag: &str) -> bool {
    let tag = tag.trim().trim_start_matches('#').to_lowercase();
    if tag.is_empty() {
        return false;
    }
    let needle = format!("#{}", tag);
    let haystack = text.to_lowercase();

    haystack.match_indices(&needle).any(|(idx, _)| {
        haystack[idx + needle.len()..]
            .chars()
            .next()
            .is_none_or(|c| !(c.is_alphanumeric() || matches!(c, '_' | '-' | '/')))
    })
}
