use super::*;
use crate::{typecheck_program_with_options, ResolverOptions, Severity};
use fz_ast::builder::*;
use pretty_assertions::assert_eq;

fn take_u8() -> FeatureDecl {
    feature("take_u8")
        .arg("x", ty("u8"))
        .returns(ty("unit"))
        .intrinsic()
        .build()
}

#[test]
fn test_clean_program_has_no_diagnostics() {
    let session = check(vec![feature("main")
        .inferred()
        .body(vec![let_("x", infix(int("1"), "+", int("2"))), name("x")])
        .build()]);

    assert_eq!(session.error_count(), 0);
    assert!(errors(&session).is_empty());
    assert_eq!(session.diagnostics().summary().to_string(), "No errors");
}

#[test]
fn test_literal_out_of_range_for_argument() {
    let session = check(vec![
        take_u8(),
        feature("ok").is(call("take_u8", vec![int("200")])).build(),
        feature("bad").is(call("take_u8", vec![int("300")])).build(),
    ]);

    let out_of_range: Vec<_> = errors(&session)
        .iter()
        .filter(|e| matches!(e, TypecheckError::LiteralOutOfRange { .. }))
        .collect();
    assert_eq!(out_of_range.len(), 1);
    assert!(out_of_range[0].to_string().contains("300"));
}

#[test]
fn test_argument_of_wrong_type() {
    let session = check(vec![
        feature("f")
            .arg("x", ty("i32"))
            .returns(ty("unit"))
            .intrinsic()
            .build(),
        feature("main").is(call("f", vec![string("s")])).build(),
    ]);

    let mismatches: Vec<_> = errors(&session)
        .iter()
        .filter(|e| matches!(e, TypecheckError::IncompatibleAssignment { .. }))
        .collect();
    assert_eq!(mismatches.len(), 1);
    assert_eq!(mismatches[0].severity(), Severity::Error);
}

#[test]
fn test_error_does_not_cascade() {
    let session = check(vec![
        feature("broken").is(name("missing")).build(),
        feature("user").is(infix(name("broken"), "+", int("1"))).build(),
    ]);

    assert_eq!(session.error_count(), 1);
    assert_eq!(result_type_name(&session, "user"), "<error>");
}

#[test]
fn test_errors_beyond_the_limit_are_counted() {
    let program = Program::new(vec![
        feature("a").is(name("missing_a")).build(),
        feature("b").is(name("missing_b")).build(),
        feature("c").is(name("missing_c")).build(),
    ]);
    let session = typecheck_program_with_options(&program, ResolverOptions::default().with_max_errors(2))
        .expect("resolution should not abort");

    let summary = session.diagnostics().summary();
    assert_eq!(summary.reported, 2);
    assert_eq!(summary.errors, 3);
    assert_eq!(summary.suppressed, 1);
}

#[test]
fn test_type_space_exhaustion_is_fatal() {
    let program = Program::new(vec![feature("main").is(int("1")).build()]);
    let result = typecheck_program_with_options(&program, ResolverOptions::default().with_max_types(5));

    assert!(matches!(result, Err(TypecheckError::Fatal { .. })));
}

#[test]
fn test_feature_space_exhaustion_is_fatal() {
    let program = Program::new(vec![feature("main").is(int("1")).build()]);
    let result = typecheck_program_with_options(&program, ResolverOptions::default().with_max_features(8));

    assert!(matches!(result, Err(TypecheckError::Fatal { .. })));
}

#[test]
fn test_reports_carry_the_source() {
    let session = check(vec![feature("main").is(name("missing")).build()]);

    let reports = session.diagnostics().create_reports("main", "main => missing");
    assert_eq!(reports.len(), 1);
}
