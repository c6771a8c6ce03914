use super::*;
use fz_ast::builder::*;
use pretty_assertions::assert_eq;

fn assigned_fields(session: &CompilationSession, path: &str) -> Vec<FeatureId> {
    body_nodes(session, path)
        .iter()
        .filter_map(|e| match &e.kind {
            ExprKind::Assign(a) => Some(a.field),
            _ => None,
        })
        .collect()
}

#[test]
fn test_routine_value_goes_to_result_field() {
    let session = check(vec![feature("five").is(int("5")).build()]);

    assert_no_errors(&session);
    let five = feature_id(&session, "five");
    let result = session.feature(five).result_field.expect("result field");
    assert_eq!(assigned_fields(&session, "five"), vec![result]);
    assert_eq!(session.result_type_of(result), session.result_type_of(five));
}

#[test]
fn test_every_branch_assigns_the_result() {
    let session = check(vec![feature("pick")
        .arg("c", ty("bool"))
        .is(if_else(name("c"), vec![int("1")], vec![int("2")]))
        .build()]);

    assert_no_errors(&session);
    let pick = feature_id(&session, "pick");
    let result = session.feature(pick).result_field.expect("result field");
    assert_eq!(assigned_fields(&session, "pick"), vec![result, result]);
}

#[test]
fn test_unit_routine_and_constructor_have_no_result_field() {
    let session = check(vec![
        feature("greet").is(call("say", vec![string("hi")])).build(),
        feature("point").arg("x", ty("i32")).build(),
    ]);

    assert_no_errors(&session);
    assert_eq!(session.feature(feature_id(&session, "greet")).result_field, None);
    assert_eq!(session.feature(feature_id(&session, "point")).result_field, None);
}
