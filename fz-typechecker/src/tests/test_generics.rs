use super::*;
use fz_ast::builder::*;
use pretty_assertions::assert_eq;

fn identity() -> FeatureDecl {
    feature("id")
        .type_param("T")
        .arg("x", ty("T"))
        .returns(ty("T"))
        .body(vec![name("x")])
        .build()
}

fn tuple() -> FeatureDecl {
    feature("tuple")
        .open_type_param("A")
        .arg("values", ty("A").dots())
        .build()
}

#[test]
fn test_generic_inferred_from_argument() {
    let session = check(vec![
        identity(),
        feature("main").is(call("id", vec![int("3")])).build(),
    ]);

    assert_no_errors(&session);
    assert_eq!(result_type_name(&session, "main"), "i32");
    let calls = calls_named(&session, "main", "id");
    assert_eq!(calls.len(), 1);
    assert_eq!(session.type_names(&calls[0].generics), "`i32`");
}

#[test]
fn test_explicit_generic_is_used() {
    let session = check(vec![
        identity(),
        feature("main")
            .is(call("id", vec![int("3")]).with_generics(vec![ty("i64")]))
            .build(),
    ]);

    assert_no_errors(&session);
    assert_eq!(result_type_name(&session, "main"), "i64");
}

#[test]
fn test_generic_arity_mismatch() {
    let session = check(vec![
        identity(),
        feature("main")
            .is(call("id", vec![int("3")]).with_generics(vec![ty("i32"), ty("bool")]))
            .build(),
    ]);

    assert!(errors(&session)
        .iter()
        .any(|e| matches!(e, TypecheckError::GenericArityMismatch { .. })));
}

#[test]
fn test_conflicting_inference_is_reported_once() {
    let session = check(vec![
        feature("pair")
            .type_param("T")
            .arg("a", ty("T"))
            .arg("b", ty("T"))
            .returns(ty("unit"))
            .intrinsic()
            .build(),
        feature("main")
            .is(call("pair", vec![int("1"), string("s")]))
            .build(),
    ]);

    let conflicts = errors(&session)
        .iter()
        .filter(|e| matches!(e, TypecheckError::InferenceConflict { .. }))
        .count();
    assert_eq!(conflicts, 1);
}

#[test]
fn test_uninferable_generic() {
    let session = check(vec![
        feature("nothing")
            .type_param("T")
            .returns(ty("unit"))
            .intrinsic()
            .build(),
        feature("main").is(name("nothing")).build(),
    ]);

    assert!(errors(&session)
        .iter()
        .any(|e| matches!(e, TypecheckError::InferenceFailed { .. })));
}

#[test]
fn test_generic_inferred_from_expected_result() {
    let session = check(vec![
        feature("empty")
            .type_param("T")
            .returns(ty_of("option", vec![ty("T")]))
            .body(vec![name("nil")])
            .build(),
        feature("main")
            .returns(ty_of("option", vec![ty("i32")]))
            .body(vec![name("empty")])
            .build(),
    ]);

    assert_no_errors(&session);
    let calls = calls_named(&session, "main", "empty");
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0].ty.map(|t| session.type_name(t)),
        Some("option i32".to_string())
    );
}

#[test]
fn test_constrained_generic_uses_constraint_features() {
    let session = check(vec![feature("shout")
        .constrained_type_param("T", ty("String"))
        .arg("x", ty("T"))
        .returns(ty("String"))
        .body(vec![infix(name("x"), "+", string("!"))])
        .build()]);

    assert_no_errors(&session);
}

#[test]
fn test_generics_of_the_outer_feature() {
    let session = check(vec![
        feature("cell")
            .type_param("T")
            .arg("v", ty("T"))
            .inner(feature("get").returns(ty("T")).body(vec![name("v")]).build())
            .build(),
        feature("main")
            .is(call_on(call("cell", vec![int("3")]), "get", vec![]))
            .build(),
    ]);

    assert_no_errors(&session);
    assert_eq!(result_type_name(&session, "main"), "i32");
}

#[test]
fn test_open_generic_expands_into_actual_types() {
    let session = check(vec![
        tuple(),
        feature("main")
            .is(call(
                "tuple",
                vec![int("1"), boolean(true), string("s"), float("2.0")],
            ))
            .build(),
    ]);

    assert_no_errors(&session);
    let calls = calls_named(&session, "main", "tuple");
    let formals = calls[0].formal_types.clone().unwrap_or_default();
    let names: Vec<String> = formals.iter().map(|t| session.type_name(*t)).collect();
    assert_eq!(names, vec!["i32", "bool", "String", "f64"]);
    assert_eq!(result_type_name(&session, "main"), "tuple i32 bool String f64");
}

#[test]
fn test_selecting_from_an_open_field() {
    let session = check(vec![
        tuple(),
        feature("main")
            .is(call_on(
                call("tuple", vec![int("1"), boolean(true), string("s"), float("2.0")]),
                "values",
                vec![],
            )
            .select(1))
            .build(),
    ]);

    assert_no_errors(&session);
    assert_eq!(result_type_name(&session, "main"), "bool");
}

#[test]
fn test_open_field_needs_a_selector() {
    let session = check(vec![
        tuple(),
        feature("main")
            .is(call_on(
                call("tuple", vec![int("1"), boolean(true)]),
                "values",
                vec![],
            ))
            .build(),
    ]);

    assert!(errors(&session)
        .iter()
        .any(|e| matches!(e, TypecheckError::OpenGenericMisuse { .. })));
}

#[test]
fn test_selector_out_of_range() {
    let session = check(vec![
        tuple(),
        feature("main")
            .is(call_on(
                call("tuple", vec![int("1"), boolean(true), string("s"), float("2.0")]),
                "values",
                vec![],
            )
            .select(7))
            .build(),
    ]);

    assert!(errors(&session)
        .iter()
        .any(|e| matches!(e, TypecheckError::SelectorOutOfRange { .. })));
}
