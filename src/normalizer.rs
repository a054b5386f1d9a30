//! Normalization of raw blocklist lines into canonical domains.
//!
//! Blocklists come in many shapes: hosts files (`0.0.0.0 example.com`),
//! Adblock filters (`||example.com^`), dnsmasq rules (`local=/example.com/`),
//! wildcard entries (`*.example.com`), RPZ-style CNAME rewrites
//! (`example.com CNAME .`) and plain domain lists. Every line runs through
//! [`RULES`] in order; each [`Rule`] narrows the line or rejects it.
//!
//! The prefix rule strips each known prefix at most once and never re-scans,
//! so a stacked entry like `||0.0.0.0 example.com` yields `0.0.0.0`.

use std::borrow::Cow;

/// Prefixes removed from the start of a line, each at most once, in this order.
pub const STRIPPED_PREFIXES: &[&str] = &[
    "0.0.0.0 ",
    "127.0.0.1 ",
    "||",
    "|",
    "*. ",
    "*.",
    "local=/",
    ".",
];

/// Record-type suffix used by CNAME rewrite entries.
pub const CNAME_MARKER: &str = " CNAME .";

/// Filter-syntax characters deleted wherever they remain.
pub const DELETED_CHARS: &[char] = &['^', '$', '*', '/', '?'];

/// Left at the start of a body by some list publishers.
const BYTE_ORDER_MARK: char = '\u{feff}';

/// Comment markers that must never survive into a canonical domain.
const COMMENT_MARKERS: &[char] = &['#', '!'];

/// One step of the normalization pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Trim surrounding whitespace and byte-order marks.
    Trim,
    /// Reject rooted entries such as `.example.com`.
    RejectLeadingDot,
    /// Strip each prefix once, checked in list order.
    StripPrefixes(&'static [&'static str]),
    /// Remove every occurrence of a substring.
    RemoveAll(&'static str),
    /// Keep only what precedes the first occurrence of a character.
    TruncateAt(char),
    /// Delete every occurrence of the given characters.
    DeleteChars(&'static [char]),
    /// Lowercase every character.
    Lowercase,
    /// Final acceptance check, see [`is_canonical`].
    RejectInvalid,
}

/// The normalization pipeline. Order is significant.
pub const RULES: &[Rule] = &[
    Rule::Trim,
    Rule::RejectLeadingDot,
    Rule::StripPrefixes(STRIPPED_PREFIXES),
    Rule::RemoveAll(CNAME_MARKER),
    Rule::TruncateAt('#'),
    Rule::TruncateAt('^'),
    Rule::TruncateAt(' '),
    Rule::TruncateAt('\t'),
    Rule::TruncateAt('/'),
    Rule::DeleteChars(DELETED_CHARS),
    Rule::Trim,
    Rule::Lowercase,
    Rule::RejectInvalid,
];

impl Rule {
    /// Apply this rule to a line. `None` means the line is rejected.
    pub fn apply(self, line: Cow<'_, str>) -> Option<Cow<'_, str>> {
        match self {
            Rule::Trim => Some(narrow(line, |s| {
                s.trim_matches(|c: char| c.is_whitespace() || c == BYTE_ORDER_MARK)
            })),
            Rule::RejectLeadingDot => (!line.starts_with('.')).then_some(line),
            Rule::StripPrefixes(prefixes) => Some(prefixes.iter().fold(line, |acc, prefix| {
                narrow(acc, |s| s.strip_prefix(prefix).unwrap_or(s))
            })),
            Rule::RemoveAll(pattern) => Some(if line.contains(pattern) {
                Cow::Owned(line.replace(pattern, ""))
            } else {
                line
            }),
            Rule::TruncateAt(c) => Some(narrow(line, |s| s.find(c).map_or(s, |i| &s[..i]))),
            Rule::DeleteChars(chars) => Some(if line.contains(chars) {
                Cow::Owned(line.chars().filter(|c| !chars.contains(c)).collect())
            } else {
                line
            }),
            Rule::Lowercase => Some(if line.chars().any(char::is_uppercase) {
                Cow::Owned(line.to_lowercase())
            } else {
                line
            }),
            Rule::RejectInvalid => is_canonical(&line).then_some(line),
        }
    }
}

/// Narrow a line to a sub-slice of itself without reallocating borrowed input.
fn narrow<'a>(line: Cow<'a, str>, f: impl FnOnce(&str) -> &str) -> Cow<'a, str> {
    match line {
        Cow::Borrowed(s) => Cow::Borrowed(f(s)),
        Cow::Owned(s) => {
            let narrowed = f(&s);
            if narrowed.len() == s.len() {
                Cow::Owned(s)
            } else {
                Cow::Owned(narrowed.to_owned())
            }
        }
    }
}

/// Normalize one raw list line into a canonical domain.
///
/// Returns `None` for blank lines, comments and anything else that cannot
/// yield a domain. Pure: the same input always gives the same output.
///
/// # Examples
/// ```
/// use blocklist_merger::normalizer::normalize;
/// assert_eq!(normalize("0.0.0.0 example.com").as_deref(), Some("example.com"));
/// assert_eq!(normalize("||example.com^").as_deref(), Some("example.com"));
/// assert_eq!(normalize("# comment"), None);
/// ```
pub fn normalize(line: &str) -> Option<String> {
    RULES
        .iter()
        .try_fold(Cow::Borrowed(line), |acc, rule| rule.apply(acc))
        .map(Cow::into_owned)
}

/// Whether a string is acceptable as a canonical domain.
///
/// Non-empty, no leading dot, no comment markers, no whitespace.
pub fn is_canonical(domain: &str) -> bool {
    !domain.is_empty()
        && !domain.starts_with('.')
        && !domain.contains(COMMENT_MARKERS)
        && !domain.contains(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(rule: Rule, line: &str) -> Option<String> {
        rule.apply(Cow::Borrowed(line)).map(Cow::into_owned)
    }

    #[test]
    fn test_hosts_format() {
        assert_eq!(normalize("0.0.0.0 example.com").as_deref(), Some("example.com"));
        assert_eq!(normalize("127.0.0.1 example.com").as_deref(), Some("example.com"));
        assert_eq!(
            normalize("0.0.0.0 example.com # tracker").as_deref(),
            Some("example.com")
        );
    }

    #[test]
    fn test_adblock_format() {
        assert_eq!(normalize("||example.com^").as_deref(), Some("example.com"));
        assert_eq!(
            normalize("||example.com^$third-party").as_deref(),
            Some("example.com")
        );
        assert_eq!(normalize("|example.com^").as_deref(), Some("example.com"));
    }

    #[test]
    fn test_dnsmasq_format() {
        assert_eq!(normalize("local=/example.com/").as_deref(), Some("example.com"));
    }

    #[test]
    fn test_wildcard_format() {
        assert_eq!(normalize("*.example.com").as_deref(), Some("example.com"));
        assert_eq!(normalize("||*.example.com^").as_deref(), Some("example.com"));
        assert_eq!(normalize("*. example.com").as_deref(), Some("example.com"));
    }

    #[test]
    fn test_cname_rewrite_format() {
        assert_eq!(
            normalize("ads.example.com CNAME .").as_deref(),
            Some("ads.example.com")
        );
    }

    #[test]
    fn test_plain_domain() {
        assert_eq!(normalize("example.com").as_deref(), Some("example.com"));
        assert_eq!(normalize("  example.com \t").as_deref(), Some("example.com"));
    }

    #[test]
    fn test_lowercases() {
        assert_eq!(normalize("Ads.Example.COM").as_deref(), Some("ads.example.com"));
    }

    #[test]
    fn test_rejects_comments_and_blanks() {
        assert_eq!(normalize(""), None);
        assert_eq!(normalize("   "), None);
        assert_eq!(normalize("# comment"), None);
        assert_eq!(normalize("! Title: EasyList"), None);
        assert_eq!(normalize("!"), None);
    }

    #[test]
    fn test_rejects_leading_dot() {
        assert_eq!(normalize(".example.com"), None);
        assert_eq!(normalize("  .example.com"), None);
    }

    #[test]
    fn test_dot_after_other_prefix_is_stripped() {
        // The leading-dot check only sees the trimmed raw line.
        assert_eq!(normalize("||.example.com^").as_deref(), Some("example.com"));
    }

    #[test]
    fn test_stacked_prefixes_not_rescanned() {
        assert_eq!(normalize("||0.0.0.0 example.com").as_deref(), Some("0.0.0.0"));
    }

    #[test]
    fn test_deletes_filter_characters() {
        assert_eq!(normalize("ex$am?ple.com").as_deref(), Some("example.com"));
    }

    #[test]
    fn test_rule_trim() {
        assert_eq!(apply(Rule::Trim, "  a.b \n").as_deref(), Some("a.b"));
        assert_eq!(apply(Rule::Trim, "\u{feff}a.b").as_deref(), Some("a.b"));
    }

    #[test]
    fn test_leading_byte_order_mark_stripped() {
        assert_eq!(normalize("\u{feff}bom.test").as_deref(), Some("bom.test"));
        assert_eq!(
            normalize("\u{feff}0.0.0.0 bom.test").as_deref(),
            Some("bom.test")
        );
    }

    #[test]
    fn test_rule_reject_leading_dot() {
        assert_eq!(apply(Rule::RejectLeadingDot, ".a.b"), None);
        assert_eq!(apply(Rule::RejectLeadingDot, "a.b").as_deref(), Some("a.b"));
    }

    #[test]
    fn test_rule_strip_prefixes_each_once() {
        let rule = Rule::StripPrefixes(STRIPPED_PREFIXES);
        assert_eq!(apply(rule, "||a.b^").as_deref(), Some("a.b^"));
        // "|" is checked after "||", so a third pipe goes too.
        assert_eq!(apply(rule, "|||a.b").as_deref(), Some("a.b"));
        // "." comes last and is only stripped once.
        assert_eq!(apply(rule, "..a.b").as_deref(), Some(".a.b"));
        assert_eq!(apply(rule, "a.b").as_deref(), Some("a.b"));
    }

    #[test]
    fn test_rule_remove_all() {
        let rule = Rule::RemoveAll(CNAME_MARKER);
        assert_eq!(apply(rule, "a.b CNAME .").as_deref(), Some("a.b"));
        assert_eq!(apply(rule, "a.b").as_deref(), Some("a.b"));
    }

    #[test]
    fn test_rule_truncate_at_first_occurrence() {
        assert_eq!(apply(Rule::TruncateAt('/'), "a.b/c/d").as_deref(), Some("a.b"));
        assert_eq!(apply(Rule::TruncateAt('#'), "#a").as_deref(), Some(""));
        assert_eq!(apply(Rule::TruncateAt('^'), "a.b").as_deref(), Some("a.b"));
    }

    #[test]
    fn test_rule_delete_chars() {
        let rule = Rule::DeleteChars(DELETED_CHARS);
        assert_eq!(apply(rule, "*a.b$?^/").as_deref(), Some("a.b"));
    }

    #[test]
    fn test_rule_reject_invalid() {
        assert_eq!(apply(Rule::RejectInvalid, ""), None);
        assert_eq!(apply(Rule::RejectInvalid, "a!b"), None);
        assert_eq!(apply(Rule::RejectInvalid, "a.b").as_deref(), Some("a.b"));
    }

    #[test]
    fn test_is_canonical() {
        assert!(is_canonical("example.com"));
        assert!(!is_canonical(""));
        assert!(!is_canonical(".example.com"));
        assert!(!is_canonical("exa#mple.com"));
        assert!(!is_canonical("exa!mple.com"));
        assert!(!is_canonical("exa mple.com"));
    }
}
