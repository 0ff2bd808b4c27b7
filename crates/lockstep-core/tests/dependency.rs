use lockstep_core::dependency::{
    Dependency, DependencyChange, Requirement, SourceDescriptor, DEFAULT_GIT_BRANCH,
};

#[test]
fn git_source_defaults_branch() {
    let src = SourceDescriptor::git("https://github.com/acme/widgets", None, None);
    match src {
        SourceDescriptor::Git { branch, reference, .. } => {
            assert_eq!(branch, DEFAULT_GIT_BRANCH);
            assert!(reference.is_none());
        }
        other => panic!("expected git source, got {other:?}"),
    }
}

#[test]
fn ungrouped_requirement_is_production() {
    assert!(Requirement::new("Lockstep.toml", "~> 1.0").is_production());
}

#[test]
fn development_requirement_is_not_production() {
    let req = Requirement::new("Lockstep.toml", "~> 3.0").with_groups(["development", "test"]);
    assert!(!req.is_production());
}

#[test]
fn prod_like_group_names_are_production() {
    for group in ["runtime", "default", "production", "prod-only"] {
        let req = Requirement::new("Lockstep.toml", "1.0").with_groups([group]);
        assert!(req.is_production(), "{group} should be production");
    }
}

#[test]
fn top_level_requires_a_constraint() {
    let lock_only = Dependency::new("rack").with_version("2.0.1");
    assert!(!lock_only.top_level());

    let declared = Dependency::new("rack")
        .with_version("2.0.1")
        .with_requirement(Requirement::new("Lockstep.toml", ">= 0"));
    assert!(declared.top_level());

    let blank = Dependency::new("rack").with_requirement(Requirement::new("Lockstep.toml", " "));
    assert!(!blank.top_level());
}

#[test]
fn lockfile_only_dependency_has_no_declared_production() {
    let dep = Dependency::new("rack").with_version("2.0.1");
    assert!(!dep.declared_production());
}

#[test]
fn source_returns_first_declared() {
    let dep = Dependency::new("widgets")
        .with_requirement(Requirement::new("Lockstep.toml", "~> 1.0"))
        .with_requirement(
            Requirement::new("sub/Lockstep.toml", "~> 1.0")
                .with_source(SourceDescriptor::Path { path: "../w".into() }),
        );
    assert!(dep.source().is_some_and(|s| s.is_path()));
}

#[test]
fn change_display_and_requirement_diff() {
    let req = Requirement::new("Lockstep.toml", "~> 1.0");
    let change = DependencyChange {
        name: "foo".into(),
        previous_version: Some("1.0.0".into()),
        new_version: "1.2.0".into(),
        previous_requirements: vec![req.clone()],
        updated_requirements: vec![Requirement {
            constraint: "~> 1.2".into(),
            ..req
        }],
        skipped_requirements: vec![],
    };
    assert_eq!(change.to_string(), "foo 1.0.0 -> 1.2.0");
    assert!(change.requirements_changed());
}

#[test]
fn change_serializes_without_empty_skips() {
    let change = DependencyChange {
        name: "bar".into(),
        previous_version: None,
        new_version: "0.3.0".into(),
        previous_requirements: vec![],
        updated_requirements: vec![],
        skipped_requirements: vec![],
    };
    let json = serde_json::to_string(&change).unwrap();
    assert!(!json.contains("skipped_requirements"));
}
