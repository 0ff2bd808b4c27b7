use lockstep_core::config::UpdateStrategy;
use lockstep_core::dependency::Requirement;
use lockstep_resolver::constraint::satisfies;
use lockstep_resolver::rewriter::{rewrite_constraint, RequirementRewriter};
use lockstep_util::errors::LockstepError;

fn bump(constraint: &str, version: &str) -> String {
    rewrite_constraint(constraint, version, UpdateStrategy::BumpMinimum).unwrap()
}

fn widen(constraint: &str, version: &str) -> String {
    rewrite_constraint(constraint, version, UpdateStrategy::WidenRange).unwrap()
}

fn pin(constraint: &str, version: &str) -> String {
    rewrite_constraint(constraint, version, UpdateStrategy::PinExact).unwrap()
}

#[test]
fn bump_keeps_operator_and_precision() {
    assert_eq!(bump("~>1.0", "1.2.0"), "~>1.2");
    assert_eq!(bump("~> 1.4.0", "1.5.2"), "~> 1.5.2");
    assert_eq!(bump(">= 1.0", "1.3.7"), ">= 1.3");
    assert_eq!(bump("^1.2.3", "1.4.0"), "^1.4.0");
    assert_eq!(bump("~1.2", "1.3.5"), "~1.3");
    assert_eq!(bump("1.2.*", "1.3.4"), "1.3.*");
}

#[test]
fn bump_replaces_exact_pins() {
    assert_eq!(bump("= 1.0.0", "1.2.0"), "= 1.2.0");
    assert_eq!(bump("==1.0.0", "1.2.0"), "==1.2.0");
    assert_eq!(bump("1.0.0", "1.2.0"), "1.2.0");
}

#[test]
fn bump_raises_upper_bounds_minimally() {
    assert_eq!(bump(">= 1.0, < 1.5", "1.7.2"), ">= 1.7, < 1.8");
    assert_eq!(bump(">= 1.0, < 2.0", "2.3.1"), ">= 2.3, < 3.0");
    assert_eq!(bump(">= 1.0, <= 1.5", "1.4.0"), ">= 1.4, <= 1.5");
}

#[test]
fn bump_handles_strict_lower_bounds() {
    assert_eq!(bump("> 1.0", "1.2.0"), ">= 1.2.0");
    assert_eq!(bump("> 1.2.0", "1.2.0"), ">= 1.2.0");
    assert_eq!(bump("> 1.0, < 2.0", "1.5.0"), ">= 1.5.0, < 2.0");
    assert_eq!(bump("(1.0,2.0)", "1.5.0"), "[1.5.0,2.0)");
}

#[test]
fn bump_drops_exclusions_of_the_new_version() {
    assert_eq!(bump(">= 1.0, != 1.2.0", "1.2.0"), ">= 1.2");
    assert_eq!(bump("!= 1.2.0, >= 1.0", "1.2.0"), ">= 1.2");
    assert_eq!(bump(">= 1.0, != 1.1.0", "1.2.0"), ">= 1.2, != 1.1.0");
}

#[test]
fn bump_bracket_ranges() {
    assert_eq!(bump("[1.0,2.0)", "1.5"), "[1.5,2.0)");
    assert_eq!(bump("(1.0,2.0)", "2.1"), "[2.1,3.0)");
    assert_eq!(bump("[1.0]", "1.2"), "[1.2]");
}

#[test]
fn bump_only_touches_last_alternative() {
    assert_eq!(bump("^1.0 || ^2.0", "2.3.0"), "^1.0 || ^2.3");
}

#[test]
fn widen_leaves_satisfied_constraints_alone() {
    assert_eq!(widen("~> 1.0", "1.9.0"), "~> 1.0");
    assert_eq!(widen(">= 1.0, < 2.0", "1.2"), ">= 1.0, < 2.0");
}

#[test]
fn widen_extends_the_ceiling() {
    assert_eq!(widen("~> 1.0", "2.1.0"), ">= 1.0, < 3");
    assert_eq!(widen("^1.2.3", "2.0.1"), ">= 1.2.3, < 3");
    assert_eq!(widen(">= 1.0, < 2.0", "2.3.1"), ">= 1.0, < 3.0");
    assert_eq!(widen("[1.0,2.0)", "2.0"), "[1.0,3.0)");
    assert_eq!(widen("= 1.0.0", "1.2.0"), "= 1.2.0");
}

#[test]
fn widen_appends_an_alternative() {
    assert_eq!(widen("^1.0 || ^2.0", "3.1.0"), "^1.0 || ^2.0 || ^3.1");
}

#[test]
fn pin_exact_shapes() {
    assert_eq!(pin("~> 1.0", "1.2.0"), "= 1.2.0");
    assert_eq!(pin("== 1.0.0", "1.2.0"), "== 1.2.0");
    assert_eq!(pin("1.0.0", "1.2.0"), "1.2.0");
    assert_eq!(pin("[1.0,2.0)", "1.2.0"), "[1.2.0]");
    assert_eq!(pin(">= 0", "1.2.0"), ">= 0");
}

#[test]
fn leave_as_is_refuses_excluding_constraints() {
    let ok = rewrite_constraint("~> 1.0", "1.2.0", UpdateStrategy::LeaveAsIs).unwrap();
    assert_eq!(ok, "~> 1.0");
    let err = rewrite_constraint("~> 1.0", "2.0.0", UpdateStrategy::LeaveAsIs).unwrap_err();
    assert!(matches!(err, LockstepError::NotRewritable { .. }));
}

#[test]
fn non_literal_constraints_are_not_rewritable() {
    for constraint in ["RAILS_VERSION", "~> #{version}", "1.0 - 2.0"] {
        let err = rewrite_constraint(constraint, "1.2.0", UpdateStrategy::BumpMinimum).unwrap_err();
        match err {
            LockstepError::NotRewritable { constraint: c, .. } => assert_eq!(c, constraint),
            other => panic!("unexpected error for {constraint}: {other}"),
        }
        assert!(!err_is_fatal(constraint));
    }
}

fn err_is_fatal(constraint: &str) -> bool {
    rewrite_constraint(constraint, "1.2.0", UpdateStrategy::BumpMinimum)
        .unwrap_err()
        .is_fatal()
}

#[test]
fn revisions_cannot_be_written_into_version_constraints() {
    assert!(rewrite_constraint("~> 1.0", "a1b2c3d", UpdateStrategy::BumpMinimum).is_err());
    assert_eq!(bump(">= 0", "a1b2c3d"), ">= 0");
    assert_eq!(bump("", "a1b2c3d"), "");
}

#[test]
fn rewritten_constraints_admit_the_new_version() {
    let constraints = [
        "~> 1.0",
        "~>1.4.0",
        "^0.2.3",
        "~1.2",
        ">= 1.0, < 1.5",
        "> 1.0, <= 1.1",
        "= 1.0.0",
        "1.0.0",
        "1.2.*",
        "[1.0,1.5)",
        "(,1.1]",
        "^1.0 || ^2.0",
        ">= 1.0, != 1.7.0",
    ];
    let versions = ["0.9.0", "1.0.1", "1.7.0", "2.5.3", "3.0.0.rc1"];
    let strategies = [
        UpdateStrategy::PinExact,
        UpdateStrategy::BumpMinimum,
        UpdateStrategy::WidenRange,
        UpdateStrategy::LeaveAsIs,
    ];
    for constraint in constraints {
        for version in versions {
            for strategy in strategies {
                if let Ok(rewritten) = rewrite_constraint(constraint, version, strategy) {
                    assert!(
                        satisfies(&rewritten, version),
                        "{strategy}: `{constraint}` -> `{rewritten}` must admit {version}"
                    );
                }
            }
        }
    }
}

#[test]
fn rewriter_keeps_requirement_metadata() {
    let req = Requirement::new("engines/a/Lockstep.toml", "~> 2.0").with_groups(["test"]);
    let updated = RequirementRewriter::new(UpdateStrategy::BumpMinimum)
        .rewrite(&req, "2.4.1")
        .unwrap();
    assert_eq!(updated.constraint, "~> 2.4");
    assert_eq!(updated.source_file, req.source_file);
    assert_eq!(updated.groups, req.groups);
}
