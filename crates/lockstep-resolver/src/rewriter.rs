//! Requirement rewriting: carry a newly resolved version back into the
//! constraint text the user wrote.
//!
//! Rewrites are span edits on the original text, so operators, separators
//! and spacing survive untouched. Constraints that are not literal
//! expressions are reported as [`LockstepError::NotRewritable`].

use std::ops::Range;

use lockstep_core::config::UpdateStrategy;
use lockstep_core::dependency::Requirement;
use lockstep_util::errors::LockstepError;

use crate::constraint::{Alternative, BracketRange, Clause, Constraint, Op};
use crate::version::Version;

/// Rewrites requirements according to one [`UpdateStrategy`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RequirementRewriter {
    strategy: UpdateStrategy,
}

impl RequirementRewriter {
    pub fn new(strategy: UpdateStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> UpdateStrategy {
        self.strategy
    }

    /// The requirement with its constraint rewritten for `new_version`.
    pub fn rewrite(
        &self,
        requirement: &Requirement,
        new_version: &str,
    ) -> Result<Requirement, LockstepError> {
        let constraint = rewrite_constraint(&requirement.constraint, new_version, self.strategy)?;
        Ok(Requirement {
            constraint,
            ..requirement.clone()
        })
    }
}

/// Rewrite a constraint expression so that it admits `new_version`.
///
/// Universal constraints (blank, `*`, `>= 0`) are returned unchanged under
/// every strategy.
pub fn rewrite_constraint(
    constraint: &str,
    new_version: &str,
    strategy: UpdateStrategy,
) -> Result<String, LockstepError> {
    let parsed =
        Constraint::parse(constraint).map_err(|e| not_rewritable(constraint, e.reason))?;
    if parsed.is_universal() {
        return Ok(constraint.to_string());
    }
    let version = Version::try_parse(new_version).ok_or_else(|| {
        not_rewritable(
            constraint,
            format!("`{new_version}` is not a release version"),
        )
    })?;

    let rewritten = match strategy {
        UpdateStrategy::LeaveAsIs => {
            if !parsed.matches(&version) {
                return Err(not_rewritable(
                    constraint,
                    format!("constraint excludes {version} and strategy is {strategy}"),
                ));
            }
            constraint.to_string()
        }
        UpdateStrategy::PinExact => pin_exact(&parsed, &version),
        UpdateStrategy::BumpMinimum => bump_minimum(&parsed, &version),
        UpdateStrategy::WidenRange => widen_range(&parsed, &version)?,
    };

    let admits = Constraint::parse(&rewritten).is_ok_and(|c| c.matches(&version));
    if !admits {
        return Err(not_rewritable(
            constraint,
            format!("rewritten constraint `{rewritten}` would not admit {version}"),
        ));
    }
    tracing::trace!("rewrote `{constraint}` to `{rewritten}` for {version} ({strategy})");
    Ok(rewritten)
}

fn not_rewritable(constraint: &str, reason: impl Into<String>) -> LockstepError {
    LockstepError::NotRewritable {
        constraint: constraint.to_string(),
        reason: reason.into(),
    }
}

struct Edit {
    span: Range<usize>,
    text: String,
}

fn apply(text: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by(|a, b| b.span.start.cmp(&a.span.start));
    let mut out = text.to_string();
    let mut floor = text.len();
    for edit in edits {
        // Overlapping edits only arise from adjacent removals; the later one wins.
        if edit.span.end > floor {
            continue;
        }
        floor = edit.span.start;
        out.replace_range(edit.span, &edit.text);
    }
    out
}

fn pin_exact(parsed: &Constraint, version: &Version) -> String {
    match parsed.alternatives.as_slice() {
        [Alternative::Clauses(clauses)] => match clauses.as_slice() {
            [clause] if clause.op.is_exact() && !clause.is_wildcard() => apply(
                &parsed.text,
                vec![Edit {
                    span: clause.literal_span.clone(),
                    text: version.to_string(),
                }],
            ),
            _ => format!("= {version}"),
        },
        [Alternative::Range(_)] => format!("[{version}]"),
        _ => format!("= {version}"),
    }
}

fn bump_minimum(parsed: &Constraint, version: &Version) -> String {
    let Some(last) = parsed.alternatives.last() else {
        return parsed.text.clone();
    };
    apply(&parsed.text, bump_alternative(&parsed.text, last, version))
}

fn bump_alternative(text: &str, alternative: &Alternative, version: &Version) -> Vec<Edit> {
    match alternative {
        Alternative::Range(range) => bump_range(text, range, version),
        Alternative::Clauses(clauses) => {
            let mut edits = Vec::new();
            for (i, clause) in clauses.iter().enumerate() {
                if clause.is_wildcard() {
                    if let Some(literal) = wildcard_literal(clause, version) {
                        edits.push(literal_edit(clause, literal));
                    }
                    continue;
                }
                match clause.op {
                    Op::Bare | Op::Eq | Op::EqEq => {
                        edits.push(literal_edit(clause, version.to_string()));
                    }
                    Op::Ge | Op::Pessimistic | Op::Caret | Op::Tilde => {
                        let literal = at_same_precision(&clause.literal, version);
                        edits.push(literal_edit(clause, literal));
                    }
                    Op::Gt => edits.extend(at_least(clause, version)),
                    op if op.is_upper_bound() && !clause.matches(version) => {
                        edits.push(literal_edit(clause, raise_ceiling(&clause.literal, version)));
                    }
                    Op::Ne if !clause.matches(version) => {
                        edits.push(remove_clause(clauses, i, version));
                    }
                    _ => {}
                }
            }
            edits
        }
    }
}

fn bump_range(text: &str, range: &BracketRange, version: &Version) -> Vec<Edit> {
    let mut edits = Vec::new();
    if let Some(lower) = &range.lower_span {
        edits.push(Edit {
            span: lower.clone(),
            text: version.to_string(),
        });
        if text[range.span.clone()].starts_with('(') {
            edits.push(Edit {
                span: range.span.start..range.span.start + 1,
                text: "[".to_string(),
            });
        }
    }
    if let (Some(upper_span), Some(upper)) = (&range.upper_span, &range.range.upper) {
        if !range.exact && excludes_from_above(&upper.version, upper.inclusive, version) {
            edits.push(Edit {
                span: upper_span.clone(),
                text: raise_ceiling(&text[upper_span.clone()], version),
            });
        }
    }
    edits
}

fn widen_range(parsed: &Constraint, version: &Version) -> Result<String, LockstepError> {
    if parsed.matches(version) {
        return Ok(parsed.text.clone());
    }
    match parsed.alternatives.as_slice() {
        [] => Ok(parsed.text.clone()),
        [only] => Ok(apply(&parsed.text, widen_alternative(&parsed.text, only, version))),
        [.., last] => {
            let last_text = &parsed.text[last.span()];
            let last_parsed = Constraint::parse(last_text)
                .map_err(|e| not_rewritable(&parsed.text, e.reason))?;
            Ok(format!(
                "{} || {}",
                parsed.text.trim_end(),
                bump_minimum(&last_parsed, version)
            ))
        }
    }
}

fn widen_alternative(text: &str, alternative: &Alternative, version: &Version) -> Vec<Edit> {
    let clauses = match alternative {
        Alternative::Clauses(clauses) => clauses,
        Alternative::Range(range) => return widen_bracket(text, range, version),
    };
    let mut edits = Vec::new();
    for (i, clause) in clauses.iter().enumerate() {
        if clause.matches(version) {
            continue;
        }
        if clause.is_wildcard() || clause.op.is_compatible() {
            edits.push(Edit {
                span: clause.span.clone(),
                text: as_explicit_range(clause, version),
            });
            continue;
        }
        match clause.op {
            Op::Bare | Op::Eq | Op::EqEq => edits.push(literal_edit(clause, version.to_string())),
            Op::Ne => edits.push(remove_clause(clauses, i, version)),
            Op::Gt | Op::Ge => edits.extend(at_least(clause, version)),
            _ => edits.push(literal_edit(clause, raise_ceiling(&clause.literal, version))),
        }
    }
    edits
}

fn widen_bracket(text: &str, range: &BracketRange, version: &Version) -> Vec<Edit> {
    if range.exact {
        return range
            .lower_span
            .iter()
            .map(|span| Edit {
                span: span.clone(),
                text: version.to_string(),
            })
            .collect();
    }
    let mut edits = Vec::new();
    if let (Some(span), Some(lower)) = (&range.lower_span, &range.range.lower) {
        if *version < lower.version || (!lower.inclusive && *version == lower.version) {
            edits.push(Edit {
                span: span.clone(),
                text: version.to_string(),
            });
            edits.push(Edit {
                span: range.span.start..range.span.start + 1,
                text: "[".to_string(),
            });
        }
    }
    if let (Some(span), Some(upper)) = (&range.upper_span, &range.range.upper) {
        if excludes_from_above(&upper.version, upper.inclusive, version) {
            edits.push(Edit {
                span: span.clone(),
                text: raise_ceiling(&text[span.clone()], version),
            });
        }
    }
    edits
}

/// `~> 1.2` excluding 2.1 becomes `>= 1.2, < 3.0`.
fn as_explicit_range(clause: &Clause, version: &Version) -> String {
    let bound = clause.version();
    let lower = if *version < bound {
        version.to_string()
    } else {
        bound.to_string()
    };
    match clause.implied_ceiling() {
        Some(ceiling) => {
            let upper = if *version >= ceiling {
                raise_ceiling(&ceiling.to_string(), version)
            } else {
                ceiling.to_string()
            };
            format!(">= {lower}, < {upper}")
        }
        None => format!(">= {lower}"),
    }
}

fn excludes_from_above(upper: &Version, inclusive: bool, version: &Version) -> bool {
    version > upper || (!inclusive && version == upper)
}

fn literal_edit(clause: &Clause, text: String) -> Edit {
    Edit {
        span: clause.literal_span.clone(),
        text,
    }
}

/// Turn a `>`/`>=` clause into `>= version`.
fn at_least(clause: &Clause, version: &Version) -> Vec<Edit> {
    let mut edits = vec![literal_edit(clause, version.to_string())];
    if clause.op == Op::Gt {
        edits.push(Edit {
            span: clause.op_span.clone(),
            text: ">=".to_string(),
        });
    }
    edits
}

/// Drop clause `i` with its separator; a lone clause becomes `>= version`.
fn remove_clause(clauses: &[Clause], i: usize, version: &Version) -> Edit {
    let span = if let Some(next) = clauses.get(i + 1) {
        clauses[i].span.start..next.span.start
    } else if i > 0 {
        clauses[i - 1].span.end..clauses[i].span.end
    } else {
        return Edit {
            span: clauses[i].span.clone(),
            text: format!(">= {version}"),
        };
    };
    Edit {
        span,
        text: String::new(),
    }
}

/// `1.2.*` for 1.3.4 becomes `1.3.*`; a bare `*` stays.
fn wildcard_literal(clause: &Clause, version: &Version) -> Option<String> {
    let prefix = clause.wildcard_prefix()?;
    if prefix.is_empty() {
        return None;
    }
    let mut segments = version.release_segments();
    segments.resize(prefix.len(), 0);
    let mut parts: Vec<String> = segments.iter().map(u64::to_string).collect();
    parts.extend(
        clause
            .literal
            .split('.')
            .skip(prefix.len())
            .map(str::to_string),
    );
    Some(parts.join("."))
}

/// `version` truncated or zero-padded to the number of numeric segments in `old`.
pub fn at_same_precision(old: &str, version: &Version) -> String {
    if version.is_prerelease() {
        return version.to_string();
    }
    let precision = old
        .split('.')
        .take_while(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
        .count()
        .max(1);
    let mut segments = version.release_segments();
    segments.resize(precision, 0);
    Version::from_segments(&segments).to_string()
}

/// Raise an upper bound just enough to admit `version`, keeping the bound's
/// precision: the last non-zero segment becomes one past `version`'s value
/// there, earlier segments follow `version`, later ones are zeroed.
pub fn raise_ceiling(old: &str, version: &Version) -> String {
    let old_segments = Version::parse(old).release_segments();
    let new_segments = version.release_segments();
    let precision = old_segments.len().max(1);
    let index = old_segments
        .iter()
        .rposition(|s| *s != 0)
        .unwrap_or(0);
    let segments: Vec<u64> = (0..precision)
        .map(|i| {
            let current = new_segments.get(i).copied().unwrap_or(0);
            match i.cmp(&index) {
                std::cmp::Ordering::Less => current,
                std::cmp::Ordering::Equal => current.saturating_add(1),
                std::cmp::Ordering::Greater => 0,
            }
        })
        .collect();
    Version::from_segments(&segments).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s)
    }

    #[test]
    fn same_precision_truncates_and_pads() {
        assert_eq!(at_same_precision("1.0", &v("1.2.0")), "1.2");
        assert_eq!(at_same_precision("1.4.0", &v("1.5")), "1.5.0");
        assert_eq!(at_same_precision("1", &v("3.2.1")), "3");
        assert_eq!(at_same_precision("1.0", &v("2.0.0.rc1")), "2.0.0.rc1");
    }

    #[test]
    fn ceiling_follows_last_nonzero_segment() {
        assert_eq!(raise_ceiling("2.0", &v("2.3.1")), "3.0");
        assert_eq!(raise_ceiling("1.5", &v("1.7.2")), "1.8");
        assert_eq!(raise_ceiling("1.5", &v("2.0.0")), "2.1");
        assert_eq!(raise_ceiling("0.0.4", &v("0.0.9")), "0.0.10");
    }

    #[test]
    fn ceiling_saturates_at_segment_max() {
        let huge = format!("1.{}", u64::MAX);
        assert_eq!(raise_ceiling("1.5", &v(&huge)), huge);
    }

    #[test]
    fn wildcard_keeps_its_shape() {
        let c = Constraint::parse("1.2.*").unwrap();
        let Alternative::Clauses(clauses) = &c.alternatives[0] else {
            panic!("expected clauses");
        };
        assert_eq!(wildcard_literal(&clauses[0], &v("1.3.4")).as_deref(), Some("1.3.*"));
    }
}
