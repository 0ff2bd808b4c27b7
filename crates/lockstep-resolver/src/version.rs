//! Version parsing, comparison, and bracket range matching.
//!
//! Ordering is segment-wise rather than strict semver, so it copes with the
//! shapes registries actually publish:
//! - Segments are split on `.` and `-`; `+build` metadata is ignored
//! - Numeric segments compare as numbers; trailing zeros are insignificant
//! - Known qualifiers order as
//!   `alpha` < `beta` < `milestone` < `rc` < `snapshot` < `""` (release) < `sp`
//! - Any other text segment sorts before a release

use std::cmp::Ordering;
use std::fmt;

/// A parsed version with comparable segments.
#[derive(Debug, Clone)]
pub struct Version {
    pub original: String,
    segments: Vec<Segment>,
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

#[derive(Debug, Clone, Eq, PartialEq)]
enum Segment {
    Numeric(u64),
    Qualifier(QualifierKind),
    Text(String),
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd)]
enum QualifierKind {
    Alpha,
    Beta,
    Milestone,
    Rc,
    Snapshot,
    Release,
    Sp,
}

impl Version {
    /// Parse leniently; any string yields a comparable value.
    pub fn parse(version: &str) -> Self {
        let version = version.trim();
        let without_build = version.split_once('+').map_or(version, |(v, _)| v);
        Self {
            original: version.to_string(),
            segments: parse_segments(without_build),
        }
    }

    /// Parse a concrete release-style version.
    ///
    /// Returns `None` for git revisions and anything not starting with a digit.
    pub fn try_parse(version: &str) -> Option<Self> {
        let version = version.trim();
        if !version.starts_with(|c: char| c.is_ascii_digit()) || looks_like_revision(version) {
            return None;
        }
        Some(Self::parse(version))
    }

    /// Leading numeric segments: `[1, 2, 3]` for `1.2.3-rc1`.
    pub fn release_segments(&self) -> Vec<u64> {
        self.segments
            .iter()
            .map_while(|s| match s {
                Segment::Numeric(n) => Some(*n),
                _ => None,
            })
            .collect()
    }

    pub fn is_prerelease(&self) -> bool {
        self.segments.iter().any(|s| match s {
            Segment::Qualifier(q) => *q < QualifierKind::Release,
            Segment::Text(_) => true,
            Segment::Numeric(_) => false,
        })
    }

    /// Build a plain release version from numeric segments.
    pub fn from_segments(segments: &[u64]) -> Self {
        let text = segments
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(".");
        Self::parse(&text)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let max_len = self.segments.len().max(other.segments.len());
        for i in 0..max_len {
            let ord = compare_segments(self.segments.get(i), other.segments.get(i));
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A 7 to 40 character hex string with at least one letter, or a full
/// 40 character object id.
pub fn looks_like_revision(s: &str) -> bool {
    let hex = s.chars().all(|c| c.is_ascii_hexdigit());
    let has_letter = s.chars().any(|c| c.is_ascii_alphabetic());
    hex && (s.len() == 40 || ((7..=40).contains(&s.len()) && has_letter))
}

fn compare_segments(a: Option<&Segment>, b: Option<&Segment>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (Some(s), None) => compare_segment_to_empty(s),
        (None, Some(s)) => compare_segment_to_empty(s).reverse(),
        (Some(a), Some(b)) => compare_two_segments(a, b),
    }
}

fn compare_segment_to_empty(seg: &Segment) -> Ordering {
    match seg {
        Segment::Numeric(0) => Ordering::Equal,
        Segment::Numeric(_) => Ordering::Greater,
        Segment::Qualifier(q) => q.cmp(&QualifierKind::Release),
        Segment::Text(_) => Ordering::Less,
    }
}

fn compare_two_segments(a: &Segment, b: &Segment) -> Ordering {
    match (a, b) {
        (Segment::Numeric(a), Segment::Numeric(b)) => a.cmp(b),
        (Segment::Qualifier(a), Segment::Qualifier(b)) => a.cmp(b),
        (Segment::Numeric(_), _) => Ordering::Greater,
        (_, Segment::Numeric(_)) => Ordering::Less,
        (Segment::Text(a), Segment::Text(b)) => a.to_lowercase().cmp(&b.to_lowercase()),
        (Segment::Qualifier(q), Segment::Text(_)) => {
            if *q >= QualifierKind::Release {
                Ordering::Greater
            } else {
                Ordering::Less
            }
        }
        (Segment::Text(_), Segment::Qualifier(q)) => {
            if *q >= QualifierKind::Release {
                Ordering::Less
            } else {
                Ordering::Greater
            }
        }
    }
}

fn parse_segments(version: &str) -> Vec<Segment> {
    version
        .split(['.', '-'])
        .filter(|t| !t.is_empty())
        .flat_map(split_alnum)
        .map(classify)
        .collect()
}

/// `rc1` -> `rc`, `1`; `4beta` -> `4`, `beta`.
fn split_alnum(token: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let bytes = token.as_bytes();
    for i in 1..bytes.len() {
        if bytes[i].is_ascii_digit() != bytes[i - 1].is_ascii_digit() {
            parts.push(&token[start..i]);
            start = i;
        }
    }
    parts.push(&token[start..]);
    parts
}

fn classify(token: &str) -> Segment {
    if let Ok(n) = token.parse::<u64>() {
        return Segment::Numeric(n);
    }
    match token.to_lowercase().as_str() {
        "alpha" | "a" => Segment::Qualifier(QualifierKind::Alpha),
        "beta" | "b" => Segment::Qualifier(QualifierKind::Beta),
        "milestone" | "m" => Segment::Qualifier(QualifierKind::Milestone),
        "rc" | "cr" => Segment::Qualifier(QualifierKind::Rc),
        "snapshot" => Segment::Qualifier(QualifierKind::Snapshot),
        "ga" | "final" | "release" => Segment::Qualifier(QualifierKind::Release),
        "sp" => Segment::Qualifier(QualifierKind::Sp),
        _ => Segment::Text(token.to_string()),
    }
}

/// A bracket range expression.
///
/// Supports: `[1.0,2.0)`, `[1.0,]`, `(,2.0)`, `[1.0]` (exact).
#[derive(Debug, Clone)]
pub struct VersionRange {
    pub lower: Option<Bound>,
    pub upper: Option<Bound>,
}

#[derive(Debug, Clone)]
pub struct Bound {
    pub version: Version,
    pub inclusive: bool,
}

impl VersionRange {
    /// Parse a bracket range; `None` for anything else.
    pub fn parse(spec: &str) -> Option<Self> {
        let s = spec.trim();
        if s.len() < 2 || !(s.starts_with('[') || s.starts_with('(')) {
            return None;
        }
        if !(s.ends_with(']') || s.ends_with(')')) {
            return None;
        }

        let open_inclusive = s.starts_with('[');
        let close_inclusive = s.ends_with(']');
        let inner = &s[1..s.len() - 1];
        let bound = |text: &str, inclusive: bool| {
            let text = text.trim();
            (!text.is_empty()).then(|| Bound {
                version: Version::parse(text),
                inclusive,
            })
        };

        match inner.split_once(',') {
            Some((lower, upper)) => Some(VersionRange {
                lower: bound(lower, open_inclusive),
                upper: bound(upper, close_inclusive),
            }),
            None => {
                let exact = bound(inner, true)?;
                Some(VersionRange {
                    lower: Some(exact.clone()),
                    upper: Some(exact),
                })
            }
        }
    }

    pub fn contains(&self, version: &Version) -> bool {
        if let Some(ref lower) = self.lower {
            let cmp = version.cmp(&lower.version);
            if cmp == Ordering::Less || (!lower.inclusive && cmp == Ordering::Equal) {
                return false;
            }
        }
        if let Some(ref upper) = self.upper {
            let cmp = version.cmp(&upper.version);
            if cmp == Ordering::Greater || (!upper.inclusive && cmp == Ordering::Equal) {
                return false;
            }
        }
        true
    }
}
