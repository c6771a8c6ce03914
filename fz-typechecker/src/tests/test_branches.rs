use super::*;
use fz_ast::builder::*;
use pretty_assertions::assert_eq;

fn incompatible_branches(session: &CompilationSession) -> usize {
    errors(session)
        .iter()
        .filter(|e| matches!(e, TypecheckError::IncompatibleBranches { .. }))
        .count()
}

#[test]
fn test_integer_literal_joins_float_branch() {
    let session = check(vec![feature("main")
        .is(if_else(boolean(true), vec![int("1")], vec![float("2.0")]))
        .build()]);

    assert_no_errors(&session);
    assert_eq!(result_type_name(&session, "main"), "f64");
}

#[test]
fn test_branches_of_different_types() {
    let session = check(vec![feature("main")
        .is(if_else(boolean(true), vec![int("1")], vec![string("s")]))
        .build()]);

    assert_eq!(incompatible_branches(&session), 1);
    assert_eq!(result_type_name(&session, "main"), "<error>");
}

#[test]
fn test_incompatible_branches_name_types_and_positions() {
    let one = int("1");
    let text = string("s");
    let (one_at, text_at) = (one.span, text.span);
    let session = check(vec![feature("main")
        .is(if_else(boolean(true), vec![one], vec![text]))
        .build()]);

    let found: Vec<String> = errors(&session)
        .iter()
        .filter_map(|e| match e {
            TypecheckError::IncompatibleBranches { found, .. } => Some(found.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(found, vec![format!("`i32` at {one_at}, `String` at {text_at}")]);
}

#[test]
fn test_nested_conflict_is_reported_once() {
    let session = check(vec![feature("main")
        .is(if_else_if(
            boolean(true),
            vec![int("1")],
            if_else(boolean(false), vec![string("s")], vec![int("2")]),
        ))
        .build()]);

    assert_eq!(incompatible_branches(&session), 1);
}

#[test]
fn test_missing_else_is_unit() {
    let session = check(vec![feature("main")
        .is(if_then(infix(int("1"), "<", int("2")), vec![int("1")]))
        .build()]);

    assert_no_errors(&session);
    assert_eq!(result_type_name(&session, "main"), "unit");
}

#[test]
fn test_branch_values_are_tagged_into_declared_choice() {
    let session = check(vec![feature("main")
        .arg("c", ty("bool"))
        .returns(ty_of("option", vec![ty("i32")]))
        .body(vec![if_else(name("c"), vec![int("5")], vec![name("nil")])])
        .build()]);

    assert_no_errors(&session);
    let tags: Vec<usize> = body_nodes(&session, "main")
        .iter()
        .filter_map(|e| match &e.kind {
            ExprKind::Tag(t) => Some(t.tag),
            _ => None,
        })
        .collect();
    assert_eq!(tags, vec![0, 1]);
}

#[test]
fn test_void_branch_does_not_widen() {
    let session = check(vec![feature("main")
        .arg("c", ty("bool"))
        .is(if_else(
            name("c"),
            vec![int("1")],
            vec![call("panic", vec![string("no")])],
        ))
        .build()]);

    assert_no_errors(&session);
    assert_eq!(result_type_name(&session, "main"), "i32");
}

#[test]
fn test_incomplete_match_is_unit() {
    let session = check(vec![
        feature("maybe")
            .returns(ty_of("option", vec![ty("i32")]))
            .body(vec![name("nil")])
            .build(),
        feature("main")
            .is(match_(
                name("maybe"),
                vec![case(Some("v"), vec![ty("i32")], vec![name("v")])],
            ))
            .build(),
    ]);

    assert_no_errors(&session);
    assert_eq!(result_type_name(&session, "main"), "unit");
}
