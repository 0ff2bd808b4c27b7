//! Constraint expressions: operator clauses, `||` alternatives, bracket ranges.
//!
//! Parsing keeps byte spans into the original text so a rewrite can replace
//! version literals without disturbing the author's spacing.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use crate::version::{Version, VersionRange};

static CLAUSE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(~>|>=|<=|!=|==|=|>|<|\^|~)?\s*([0-9][0-9A-Za-z.+\-*]*|\*|[xX])")
        .expect("clause pattern is valid")
});

/// Comparison operator of a single clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// No operator: an exact version.
    Bare,
    Eq,
    EqEq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    /// `~>`: compatible within the last given segment.
    Pessimistic,
    /// `^`: compatible within the first non-zero segment.
    Caret,
    /// `~`: compatible within the minor version.
    Tilde,
}

impl Op {
    fn from_token(token: Option<&str>) -> Self {
        match token {
            None => Op::Bare,
            Some("=") => Op::Eq,
            Some("==") => Op::EqEq,
            Some("!=") => Op::Ne,
            Some(">") => Op::Gt,
            Some(">=") => Op::Ge,
            Some("<") => Op::Lt,
            Some("<=") => Op::Le,
            Some("~>") => Op::Pessimistic,
            Some("^") => Op::Caret,
            Some(_) => Op::Tilde,
        }
    }

    pub fn is_exact(self) -> bool {
        matches!(self, Op::Bare | Op::Eq | Op::EqEq)
    }

    pub fn is_upper_bound(self) -> bool {
        matches!(self, Op::Lt | Op::Le)
    }

    /// Operators whose literal is a lower bound with an implied ceiling.
    pub fn is_compatible(self) -> bool {
        matches!(self, Op::Pessimistic | Op::Caret | Op::Tilde)
    }
}

/// One `op version` clause.
#[derive(Debug, Clone)]
pub struct Clause {
    pub op: Op,
    /// The version literal as written, possibly with `*`/`x` wildcards.
    pub literal: String,
    /// Whole clause, operator included.
    pub span: Range<usize>,
    /// Operator only; empty for [`Op::Bare`].
    pub op_span: Range<usize>,
    /// Version literal only.
    pub literal_span: Range<usize>,
}

impl Clause {
    /// Numeric prefix of the literal, stopping at the first wildcard.
    pub fn wildcard_prefix(&self) -> Option<Vec<u64>> {
        let parts: Vec<&str> = self.literal.split('.').collect();
        let pos = parts.iter().position(|p| is_wildcard(p))?;
        parts[..pos].iter().map(|p| p.parse().ok()).collect()
    }

    pub fn is_wildcard(&self) -> bool {
        self.literal.split('.').any(is_wildcard)
    }

    /// The literal as a version, wildcard segments dropped.
    pub fn version(&self) -> Version {
        match self.wildcard_prefix() {
            Some(prefix) => Version::from_segments(&prefix),
            None => Version::parse(&self.literal),
        }
    }

    /// Exclusive ceiling implied by compatible and wildcard clauses.
    pub fn implied_ceiling(&self) -> Option<Version> {
        if let Some(prefix) = self.wildcard_prefix() {
            return (!prefix.is_empty()).then(|| bump_at(&prefix, prefix.len() - 1));
        }
        let segments = self.version().release_segments();
        if segments.is_empty() {
            return None;
        }
        let index = match self.op {
            Op::Pessimistic => segments.len().saturating_sub(2),
            Op::Caret => segments
                .iter()
                .position(|s| *s != 0)
                .unwrap_or(segments.len() - 1),
            Op::Tilde => usize::from(segments.len() > 1),
            _ => return None,
        };
        Some(bump_at(&segments, index))
    }

    pub fn matches(&self, version: &Version) -> bool {
        if is_wildcard(&self.literal) {
            return true;
        }
        let bound = self.version();
        let ceiling = self.implied_ceiling();
        let below_ceiling = ceiling.as_ref().map_or(true, |c| version < c);
        if self.is_wildcard() {
            let inside = *version >= bound && below_ceiling;
            return match self.op {
                Op::Ne => !inside,
                Op::Gt => ceiling.is_some_and(|c| *version >= c),
                Op::Ge => *version >= bound,
                Op::Lt => *version < bound,
                Op::Le => below_ceiling,
                _ => inside,
            };
        }
        match self.op {
            Op::Bare | Op::Eq | Op::EqEq => *version == bound,
            Op::Ne => *version != bound,
            Op::Gt => *version > bound,
            Op::Ge => *version >= bound,
            Op::Lt => *version < bound,
            Op::Le => *version <= bound,
            Op::Pessimistic | Op::Caret | Op::Tilde => *version >= bound && below_ceiling,
        }
    }
}

/// A bracket range with the spans of its parts.
#[derive(Debug, Clone)]
pub struct BracketRange {
    pub range: VersionRange,
    pub span: Range<usize>,
    pub lower_span: Option<Range<usize>>,
    pub upper_span: Option<Range<usize>>,
    /// `[1.5]` style single-version range.
    pub exact: bool,
}

/// One side of `||`.
#[derive(Debug, Clone)]
pub enum Alternative {
    Clauses(Vec<Clause>),
    Range(BracketRange),
}

impl Alternative {
    pub fn matches(&self, version: &Version) -> bool {
        match self {
            Alternative::Clauses(clauses) => clauses.iter().all(|c| c.matches(version)),
            Alternative::Range(r) => r.range.contains(version),
        }
    }

    pub fn span(&self) -> Range<usize> {
        match self {
            Alternative::Clauses(clauses) => {
                let start = clauses.first().map_or(0, |c| c.span.start);
                let end = clauses.last().map_or(0, |c| c.span.end);
                start..end
            }
            Alternative::Range(r) => r.span.clone(),
        }
    }
}

/// A parsed constraint expression.
#[derive(Debug, Clone)]
pub struct Constraint {
    pub text: String,
    pub alternatives: Vec<Alternative>,
}

/// Why a constraint could not be read as a literal expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub reason: String,
}

impl Constraint {
    /// Parse a literal constraint expression.
    ///
    /// An empty or blank text parses to a constraint with no alternatives,
    /// which admits everything.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let mut alternatives = Vec::new();
        let mut offset = 0;
        for part in text.split("||") {
            let start = offset;
            offset += part.len() + 2;
            if part.trim().is_empty() {
                if text.trim().is_empty() {
                    continue;
                }
                return Err(ParseError {
                    reason: "empty alternative".to_string(),
                });
            }
            let leading = part.len() - part.trim_start().len();
            let trimmed = part.trim();
            let alt_start = start + leading;
            let alternative = if trimmed.starts_with('[') || trimmed.starts_with('(') {
                Alternative::Range(parse_bracket(trimmed, alt_start)?)
            } else {
                Alternative::Clauses(parse_clauses(part, start)?)
            };
            alternatives.push(alternative);
        }
        Ok(Self {
            text: text.to_string(),
            alternatives,
        })
    }

    /// Admits every version: blank, `*`, or `>= 0`.
    pub fn is_universal(&self) -> bool {
        self.alternatives.iter().any(|alt| match alt {
            Alternative::Clauses(clauses) => clauses.iter().all(|c| {
                c.literal == "*"
                    || c.literal.eq_ignore_ascii_case("x")
                    || (c.op == Op::Ge && c.version() == Version::parse("0"))
            }),
            Alternative::Range(r) => r.range.lower.is_none() && r.range.upper.is_none(),
        }) || self.alternatives.is_empty()
    }

    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives.is_empty() || self.alternatives.iter().any(|a| a.matches(version))
    }
}

/// Whether `constraint` is the universally satisfied constraint.
pub fn is_universal(constraint: &str) -> bool {
    Constraint::parse(constraint).is_ok_and(|c| c.is_universal())
}

/// Whether `version` satisfies `constraint`; unparseable constraints never match.
pub fn satisfies(constraint: &str, version: &str) -> bool {
    Constraint::parse(constraint).is_ok_and(|c| c.matches(&Version::parse(version)))
}

fn is_wildcard(segment: &str) -> bool {
    segment == "*" || segment.eq_ignore_ascii_case("x")
}

/// Increment `segments[index]`, truncating everything after it.
pub fn bump_at(segments: &[u64], index: usize) -> Version {
    let mut bumped: Vec<u64> = segments.iter().take(index + 1).copied().collect();
    while bumped.len() <= index {
        bumped.push(0);
    }
    bumped[index] = bumped[index].saturating_add(1);
    Version::from_segments(&bumped)
}

fn parse_clauses(part: &str, base: usize) -> Result<Vec<Clause>, ParseError> {
    let mut clauses = Vec::new();
    let mut cursor = 0;
    for caps in CLAUSE_RE.captures_iter(part) {
        let Some(whole) = caps.get(0) else { continue };
        let gap = &part[cursor..whole.start()];
        if !gap.chars().all(|c| c.is_whitespace() || c == ',') {
            return Err(ParseError {
                reason: format!("unexpected `{}`", gap.trim()),
            });
        }
        let op_match = caps.get(1);
        let Some(literal) = caps.get(2) else { continue };
        let op_span = match op_match {
            Some(m) => base + m.start()..base + m.end(),
            None => base + literal.start()..base + literal.start(),
        };
        clauses.push(Clause {
            op: Op::from_token(op_match.map(|m| m.as_str())),
            literal: literal.as_str().to_string(),
            span: base + whole.start()..base + whole.end(),
            op_span,
            literal_span: base + literal.start()..base + literal.end(),
        });
        cursor = whole.end();
    }
    let tail = &part[cursor..];
    if !tail.chars().all(|c| c.is_whitespace() || c == ',') {
        return Err(ParseError {
            reason: format!("unexpected `{}`", tail.trim()),
        });
    }
    if clauses.is_empty() {
        return Err(ParseError {
            reason: "no version clause".to_string(),
        });
    }
    Ok(clauses)
}

fn parse_bracket(text: &str, base: usize) -> Result<BracketRange, ParseError> {
    let range = VersionRange::parse(text).ok_or_else(|| ParseError {
        reason: format!("malformed range `{text}`"),
    })?;
    let inner = &text[1..text.len() - 1];
    let span_of = |from: usize, piece: &str| {
        let lead = piece.len() - piece.trim_start().len();
        let start = base + 1 + from + lead;
        (!piece.trim().is_empty()).then(|| start..start + piece.trim().len())
    };
    let (lower_span, upper_span, exact) = match inner.split_once(',') {
        Some((lower, upper)) => (
            span_of(0, lower),
            span_of(lower.len() + 1, upper),
            false,
        ),
        None => (span_of(0, inner), None, true),
    };
    Ok(BracketRange {
        range,
        span: base..base + text.len(),
        lower_span,
        upper_span,
        exact,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s)
    }

    #[test]
    fn pessimistic_two_segments() {
        let c = Constraint::parse("~> 1.0").unwrap();
        assert!(c.matches(&v("1.0.0")));
        assert!(c.matches(&v("1.9.3")));
        assert!(!c.matches(&v("2.0.0")));
    }

    #[test]
    fn pessimistic_three_segments() {
        let c = Constraint::parse("~>1.4.0").unwrap();
        assert!(c.matches(&v("1.4.9")));
        assert!(!c.matches(&v("1.5.0")));
    }

    #[test]
    fn caret_respects_leading_zeros() {
        assert!(satisfies("^1.2.3", "1.9.0"));
        assert!(!satisfies("^1.2.3", "2.0.0"));
        assert!(satisfies("^0.2.3", "0.2.9"));
        assert!(!satisfies("^0.2.3", "0.3.0"));
        assert!(!satisfies("^0.0.3", "0.0.4"));
    }

    #[test]
    fn tilde_allows_patch_changes() {
        assert!(satisfies("~1.2.3", "1.2.9"));
        assert!(!satisfies("~1.2.3", "1.3.0"));
        assert!(satisfies("~1", "1.9.0"));
    }

    #[test]
    fn comma_separated_clauses_all_apply() {
        let c = Constraint::parse(">= 1.0, < 2.0").unwrap();
        assert_eq!(c.alternatives.len(), 1);
        assert!(c.matches(&v("1.5")));
        assert!(!c.matches(&v("2.0")));
    }

    #[test]
    fn space_separated_clauses_all_apply() {
        assert!(satisfies(">=1.0 <2.0", "1.2"));
        assert!(!satisfies(">=1.0 <2.0", "0.9"));
    }

    #[test]
    fn alternatives_any_apply() {
        let c = Constraint::parse("^1.0 || ^2.0").unwrap();
        assert_eq!(c.alternatives.len(), 2);
        assert!(c.matches(&v("2.3.0")));
        assert!(!c.matches(&v("3.0.0")));
    }

    #[test]
    fn wildcards() {
        assert!(satisfies("1.2.*", "1.2.7"));
        assert!(!satisfies("1.2.*", "1.3.0"));
        assert!(satisfies("1.x", "1.9"));
        assert!(is_universal("*"));
    }

    #[test]
    fn not_equal() {
        assert!(satisfies("!= 1.5.0", "1.5.1"));
        assert!(!satisfies("!= 1.5.0", "1.5.0"));
    }

    #[test]
    fn bare_version_is_exact() {
        assert!(satisfies("1.2.0", "1.2"));
        assert!(!satisfies("1.2.0", "1.2.1"));
    }

    #[test]
    fn bracket_ranges() {
        let c = Constraint::parse("[1.0,2.0)").unwrap();
        let Alternative::Range(r) = &c.alternatives[0] else {
            panic!("expected range");
        };
        assert_eq!(&c.text[r.lower_span.clone().unwrap()], "1.0");
        assert_eq!(&c.text[r.upper_span.clone().unwrap()], "2.0");
        assert!(c.matches(&v("1.5")));
        assert!(!c.matches(&v("2.0")));
    }

    #[test]
    fn universal_constraints() {
        assert!(is_universal(">= 0"));
        assert!(is_universal(""));
        assert!(is_universal("  "));
        assert!(!is_universal(">= 0.1"));
        assert!(!is_universal("~> 1.0"));
    }

    #[test]
    fn spans_point_at_literals() {
        let text = "~> 1.0,  < 1.5";
        let c = Constraint::parse(text).unwrap();
        let Alternative::Clauses(clauses) = &c.alternatives[0] else {
            panic!("expected clauses");
        };
        assert_eq!(&text[clauses[0].literal_span.clone()], "1.0");
        assert_eq!(&text[clauses[1].op_span.clone()], "<");
        assert_eq!(&text[clauses[1].literal_span.clone()], "1.5");
    }

    #[test]
    fn non_literal_constraints_fail_to_parse() {
        assert!(Constraint::parse("RAILS_VERSION").is_err());
        assert!(Constraint::parse("~> #{version}").is_err());
        assert!(Constraint::parse("1.0 ||").is_err());
    }

    #[test]
    fn bump_at_saturates() {
        assert_eq!(bump_at(&[1, 4, 2], 1), Version::parse("1.5"));
        assert_eq!(bump_at(&[u64::MAX], 0), Version::from_segments(&[u64::MAX]));
    }
}
