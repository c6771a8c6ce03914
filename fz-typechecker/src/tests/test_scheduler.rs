use super::*;
use crate::State;
use fz_ast::builder::*;
use pretty_assertions::assert_eq;

fn twice() -> FeatureDecl {
    feature("twice").untyped_arg("x").is(name("x")).build()
}

#[test]
fn test_every_feature_reaches_resolved() {
    let session = check(vec![
        feature("helper").is(int("1")).build(),
        feature("main")
            .is(infix(name("helper"), "+", int("2")))
            .build(),
    ]);

    assert_no_errors(&session);
    for path in ["helper", "main", "i32", "option", "Function.call"] {
        assert_eq!(session.state(feature_id(&session, path)), State::Resolved, "{path}");
    }
}

#[test]
fn test_result_used_before_its_feature_is_declared() {
    let session = check(vec![
        feature("main").is(name("later")).build(),
        feature("later").is(string("done")).build(),
    ]);

    assert_no_errors(&session);
    assert_eq!(result_type_name(&session, "main"), "String");
}

#[test]
fn test_untyped_argument_from_calls() {
    let session = check(vec![
        twice(),
        feature("main").is(call("twice", vec![int("3")])).build(),
    ]);

    assert_no_errors(&session);
    let twice = feature_id(&session, "twice");
    let x = session.feature(twice).args[0];
    assert_eq!(
        session.result_type_of(x).map(|t| session.type_name(t)),
        Some("i32".to_string())
    );
    assert_eq!(result_type_name(&session, "twice"), "i32");
    assert_eq!(result_type_name(&session, "main"), "i32");
}

#[test]
fn test_untyped_argument_without_calls_is_void() {
    let session = check(vec![twice()]);

    let twice = feature_id(&session, "twice");
    let x = session.feature(twice).args[0];
    assert_eq!(
        session.result_type_of(x).map(|t| session.type_name(t)),
        Some("void".to_string())
    );
}

#[test]
fn test_conflicting_calls_for_untyped_argument() {
    let session = check(vec![
        twice(),
        feature("a").is(call("twice", vec![int("3")])).build(),
        feature("b").is(call("twice", vec![string("s")])).build(),
    ]);

    assert!(errors(&session)
        .iter()
        .any(|e| matches!(e, TypecheckError::IncompatibleArgumentInference { .. })));
}

#[test]
fn test_cyclic_result_inference() {
    let session = check(vec![
        feature("f").is(name("g")).build(),
        feature("g").is(name("f")).build(),
    ]);

    let cycles = errors(&session)
        .iter()
        .filter(|e| matches!(e, TypecheckError::CyclicTypeInference { .. }))
        .count();
    assert_eq!(cycles, 1);
}

#[test]
fn test_cyclic_inheritance() {
    let session = check(vec![
        feature("a").inherits(parent("b", vec![])).build(),
        feature("b").inherits(parent("a", vec![])).build(),
    ]);

    let cycles = errors(&session)
        .iter()
        .filter(|e| matches!(e, TypecheckError::CyclicInheritance { .. }))
        .count();
    assert_eq!(cycles, 1);
}

#[test]
fn test_mutual_argument_inference_terminates() {
    let session = check(vec![
        feature("a").untyped_arg("x").is(call("b", vec![name("x")])).build(),
        feature("b").untyped_arg("y").is(call("a", vec![name("y")])).build(),
    ]);

    assert_eq!(result_type_name(&session, "a.x"), "void");
    assert_eq!(result_type_name(&session, "b.y"), "void");
    assert_eq!(result_type_name(&session, "a"), "<error>");
    assert_eq!(result_type_name(&session, "b"), "<error>");
    assert_eq!(session.error_count(), 1);
}
