//! Replacement templates for static rules
//!
//! Templates are parsed once against the compiled pattern so that group
//! references can be resolved up front:
//!
//! | Token              | Expands to                               |
//! |--------------------|------------------------------------------|
//! | `$$`               | a literal `$`                            |
//! | `$&`, `$0`         | the whole match                          |
//! | `$n`, `$nn`        | numbered group                           |
//! | `${name}`, `$<name>` | named (or numbered) group              |
//! | `` $` ``           | text before the match                    |
//! | `$'`               | text after the match                     |
//!
//! Anything else after a `$` is kept literally.

use regex::{Captures, Regex};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Literal(String),
    Group(usize),
    Named(String),
    Before,
    After,
}

/// A parsed replacement template
#[derive(Debug, Clone)]
pub struct ReplacementTemplate {
    source: String,
    pieces: Vec<Piece>,
}

impl ReplacementTemplate {
    /// Parse `template` for use with `regex`
    pub fn parse(template: &str, regex: &Regex) -> Self {
        let groups = GroupInfo {
            count: regex.captures_len().saturating_sub(1),
            names: regex.capture_names().flatten().collect(),
        };

        let mut pieces = Vec::new();
        let mut literal = String::new();
        let mut i = 0;

        while i < template.len() {
            if !template[i..].starts_with('$') {
                let next = template[i..].find('$').map_or(template.len(), |p| i + p);
                literal.push_str(&template[i..next]);
                i = next;
                continue;
            }

            match parse_reference(&template[i + 1..], &groups) {
                Some((Piece::Literal(text), consumed)) => {
                    literal.push_str(&text);
                    i += 1 + consumed;
                }
                Some((piece, consumed)) => {
                    if !literal.is_empty() {
                        pieces.push(Piece::Literal(std::mem::take(&mut literal)));
                    }
                    pieces.push(piece);
                    i += 1 + consumed;
                }
                None => {
                    literal.push('$');
                    i += 1;
                }
            }
        }

        if !literal.is_empty() {
            pieces.push(Piece::Literal(literal));
        }

        Self {
            source: template.to_string(),
            pieces,
        }
    }

    /// The template as written
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Expand the template for one match of `haystack`
    pub fn expand(&self, caps: &Captures<'_>, haystack: &str) -> String {
        let mut out = String::new();

        for piece in &self.pieces {
            match piece {
                Piece::Literal(text) => out.push_str(text),
                Piece::Group(index) => {
                    if let Some(m) = caps.get(*index) {
                        out.push_str(m.as_str());
                    }
                }
                Piece::Named(name) => {
                    if let Some(m) = caps.name(name) {
                        out.push_str(m.as_str());
                    }
                }
                Piece::Before => {
                    if let Some(m) = caps.get(0) {
                        out.push_str(&haystack[..m.start()]);
                    }
                }
                Piece::After => {
                    if let Some(m) = caps.get(0) {
                        out.push_str(&haystack[m.end()..]);
                    }
                }
            }
        }

        out
    }
}

struct GroupInfo<'a> {
    count: usize,
    names: Vec<&'a str>,
}

/// Parse the token following a `$`. Returns the piece and how many bytes it used.
fn parse_reference(rest: &str, groups: &GroupInfo<'_>) -> Option<(Piece, usize)> {
    let bytes = rest.as_bytes();
    let first = *bytes.first()?;

    match first {
        b'$' => Some((Piece::Literal("$".to_string()), 1)),
        b'&' => Some((Piece::Group(0), 1)),
        b'`' => Some((Piece::Before, 1)),
        b'\'' => Some((Piece::After, 1)),
        b'0'..=b'9' => {
            let tens = (first - b'0') as usize;
            if let Some(second) = bytes.get(1).filter(|b| b.is_ascii_digit()) {
                let index = tens * 10 + (second - b'0') as usize;
                if index >= 1 && index <= groups.count {
                    return Some((Piece::Group(index), 2));
                }
            }
            (tens <= groups.count).then_some((Piece::Group(tens), 1))
        }
        b'{' => parse_delimited(rest, '}', groups),
        b'<' => parse_delimited(rest, '>', groups),
        _ => None,
    }
}

fn parse_delimited(rest: &str, close: char, groups: &GroupInfo<'_>) -> Option<(Piece, usize)> {
    let end = rest.find(close)?;
    let name = &rest[1..end];

    let piece = match name.parse::<usize>() {
        Ok(index) if index <= groups.count => Piece::Group(index),
        Ok(_) => return None,
        Err(_) if groups.names.contains(&name) => Piece::Named(name.to_string()),
        Err(_) => return None,
    };

    Some((piece, end + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn replace_all(pattern: &str, template: &str, text: &str) -> String {
        let regex = Regex::new(pattern).unwrap();
        let template = ReplacementTemplate::parse(template, &regex);
        regex
            .replace_all(text, |caps: &Captures<'_>| template.expand(caps, text))
            .into_owned()
    }

    #[test]
    fn test_numbered_groups() {
        assert_eq!(replace_all(r"(\w+)@(\w+)", "$2 at $1", "me@host"), "host at me");
    }

    #[test]
    fn test_group_followed_by_letters() {
        assert_eq!(replace_all(r"(\d+)", "$1abc", "x 42 y"), "x 42abc y");
    }

    #[test]
    fn test_whole_match_tokens() {
        assert_eq!(replace_all("cat", "[$&]", "a cat"), "a [cat]");
        assert_eq!(replace_all("cat", "<$0>", "a cat"), "a <cat>");
    }

    #[test]
    fn test_dollar_escape_and_unknown_tokens() {
        assert_eq!(replace_all("price", "$$5", "price"), "$5");
        assert_eq!(replace_all("a", "$x$", "a"), "$x$");
        assert_eq!(replace_all("(a)", "$9", "a"), "$9");
    }

    #[test]
    fn test_named_groups() {
        assert_eq!(
            replace_all(r"(?P<first>\w+) (?P<last>\w+)", "${last}, $<first>", "Ada Lovelace"),
            "Lovelace, Ada"
        );
        assert_eq!(replace_all(r"(a)", "${missing}", "a"), "${missing}");
    }

    #[test]
    fn test_two_digit_group_only_when_present() {
        let pattern = "(a)(b)(c)(d)(e)(f)(g)(h)(i)(j)(k)";
        assert_eq!(replace_all(pattern, "$11", "abcdefghijk"), "k");
        assert_eq!(replace_all("(a)", "$11", "a"), "a1");
    }

    #[test]
    fn test_surrounding_text_tokens() {
        assert_eq!(replace_all("b", "[$`|$']", "abc"), "a[a|c]c");
    }

    #[test]
    fn test_optional_group_expands_empty() {
        assert_eq!(replace_all(r"x(y)?", "<$1>", "x"), "<>");
    }

    #[test]
    fn test_non_ascii_literals() {
        assert_eq!(replace_all("é", "→$&←", "café"), "caf→é←");
    }
}
