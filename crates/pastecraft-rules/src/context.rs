//! Per-match execution context handed to transforms

use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::ops::Range;

/// One regex match, detached from the haystack it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchContext {
    /// Index 0 is the whole match, 1.. are capture groups
    groups: Vec<Option<String>>,

    /// Named groups that participated in the match
    named: BTreeMap<String, String>,

    /// Byte span of the whole match in the text it was found in
    span: Range<usize>,
}

impl MatchContext {
    /// Build a context from a regex match
    pub fn from_captures(regex: &Regex, caps: &Captures<'_>) -> Self {
        let groups = caps
            .iter()
            .map(|m| m.map(|m| m.as_str().to_string()))
            .collect();

        let named = regex
            .capture_names()
            .flatten()
            .filter_map(|name| caps.name(name).map(|m| (name.to_string(), m.as_str().to_string())))
            .collect();

        let span = caps.get(0).map_or(0..0, |m| m.range());

        Self {
            groups,
            named,
            span,
        }
    }

    /// A context with no capture groups, for driving transforms directly
    pub fn new(matched: impl Into<String>, offset: usize) -> Self {
        let matched = matched.into();
        let span = offset..offset + matched.len();
        Self {
            groups: vec![Some(matched)],
            named: BTreeMap::new(),
            span,
        }
    }

    /// Append a numbered capture group
    pub fn with_group(mut self, value: Option<&str>) -> Self {
        self.groups.push(value.map(str::to_string));
        self
    }

    /// The originally matched substring
    pub fn matched(&self) -> &str {
        self.group(0).unwrap_or_default()
    }

    /// Group `index` (0 is the whole match); `None` when it did not participate
    pub fn group(&self, index: usize) -> Option<&str> {
        self.groups.get(index).and_then(|g| g.as_deref())
    }

    /// All groups including the whole match at index 0
    pub fn groups(&self) -> &[Option<String>] {
        &self.groups
    }

    /// Named group value
    pub fn named(&self, name: &str) -> Option<&str> {
        self.named.get(name).map(String::as_str)
    }

    /// All named groups that matched
    pub fn named_groups(&self) -> &BTreeMap<String, String> {
        &self.named
    }

    /// Byte offset of the match
    pub fn offset(&self) -> usize {
        self.span.start
    }

    /// Byte span of the match
    pub fn span(&self) -> Range<usize> {
        self.span.clone()
    }
}
