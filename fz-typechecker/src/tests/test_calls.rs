use super::*;
use fz_ast::builder::*;
use pretty_assertions::assert_eq;

fn add() -> FeatureDecl {
    feature("add")
        .arg("a", ty("i32"))
        .arg("b", ty("i32"))
        .returns(ty("i32"))
        .intrinsic()
        .build()
}

fn take_i32() -> FeatureDecl {
    feature("take_i32")
        .arg("x", ty("i32"))
        .returns(ty("unit"))
        .intrinsic()
        .build()
}

fn lambda_types(session: &CompilationSession, path: &str) -> Vec<String> {
    body_nodes(session, path)
        .iter()
        .filter(|e| matches!(e.kind, ExprKind::Lambda(_)))
        .filter_map(|e| e.ty().map(|t| session.type_name(t)))
        .collect()
}

#[test]
fn test_call_on_a_literal_target() {
    let session = check(vec![
        feature("text").is(call_on(int("3"), "as_string", vec![])).build(),
        feature("sum").is(infix(int("1"), "+", int("2"))).build(),
    ]);

    assert_no_errors(&session);
    assert_eq!(result_type_name(&session, "text"), "String");
    assert_eq!(result_type_name(&session, "sum"), "i32");
}

#[test]
fn test_operator_operand_takes_target_type() {
    let session = check(vec![feature("sum")
        .is(infix(float("1.5"), "*", int("2")))
        .build()]);

    assert_no_errors(&session);
    assert_eq!(result_type_name(&session, "sum"), "f64");
}

#[test]
fn test_constructor_call_has_feature_type() {
    let session = check(vec![
        feature("point").arg("x", ty("i32")).arg("y", ty("i32")).build(),
        feature("main").is(call("point", vec![int("1"), int("2")])).build(),
    ]);

    assert_no_errors(&session);
    assert_eq!(result_type_name(&session, "main"), "point");
}

#[test]
fn test_arguments_to_function_result_are_passed_to_call() {
    let session = check(vec![
        add(),
        feature("inc")
            .returns(ty_of("Function", vec![ty("i32"), ty("i32")]))
            .body(vec![call("add", vec![int("1")])])
            .build(),
        feature("main").is(call("inc", vec![int("5")])).build(),
    ]);

    assert_no_errors(&session);
    assert_eq!(result_type_name(&session, "main"), "i32");
    let calls = calls_named(&session, "main", "call");
    assert_eq!(calls.len(), 1);
    assert!(calls[0].target.is_some());
}

#[test]
fn test_value_passed_as_lazy_is_wrapped() {
    let session = check(vec![
        feature("when")
            .arg("c", ty("bool"))
            .arg("v", ty_of("Lazy", vec![ty("i32")]))
            .returns(ty("i32"))
            .intrinsic()
            .build(),
        feature("main")
            .is(call("when", vec![boolean(true), int("5")]))
            .build(),
    ]);

    assert_no_errors(&session);
    assert_eq!(lambda_types(&session, "main"), vec!["Lazy i32"]);
}

#[test]
fn test_lazy_value_is_called_where_a_value_is_expected() {
    let session = check(vec![
        take_i32(),
        feature("lazy_five")
            .returns(ty_of("Lazy", vec![ty("i32")]))
            .body(vec![int("5")])
            .build(),
        feature("main")
            .is(call("take_i32", vec![name("lazy_five")]))
            .build(),
    ]);

    assert_no_errors(&session);
    assert_eq!(lambda_types(&session, "lazy_five"), vec!["Lazy i32"]);
    let unwrapped = calls_named(&session, "main", "call");
    assert_eq!(unwrapped.len(), 1);
    assert_eq!(
        unwrapped[0].ty.map(|t| session.type_name(t)),
        Some("i32".to_string())
    );
    assert!(unwrapped[0].flags.unwrapped);
}

#[test]
fn test_match_on_choice() {
    let session = check(vec![
        feature("maybe")
            .returns(ty_of("option", vec![ty("i32")]))
            .body(vec![int("3")])
            .build(),
        feature("main")
            .is(match_(
                name("maybe"),
                vec![
                    case(Some("v"), vec![ty("i32")], vec![name("v")]),
                    case(None, vec![ty("nil")], vec![int("0")]),
                ],
            ))
            .build(),
    ]);

    assert_no_errors(&session);
    assert_eq!(result_type_name(&session, "main"), "i32");
}

#[test]
fn test_match_on_non_choice() {
    let session = check(vec![feature("main")
        .is(match_(int("3"), vec![case_any(vec![int("0")])]))
        .build()]);

    assert!(errors(&session)
        .iter()
        .any(|e| matches!(e, TypecheckError::IllegalMatch { .. })));
}

#[test]
fn test_this_type_argument_takes_the_target_type() {
    let session = check(vec![
        feature("a")
            .inner(
                feature("same")
                    .arg("other", ty("a").this())
                    .returns(ty("bool"))
                    .intrinsic()
                    .build(),
            )
            .build(),
        feature("b").inherits(parent("a", vec![])).build(),
        feature("good")
            .is(call_on(name("b"), "same", vec![name("b")]))
            .build(),
        feature("bad")
            .is(call_on(name("b"), "same", vec![name("a")]))
            .build(),
    ]);

    for path in ["good", "bad"] {
        let calls = calls_named(&session, path, "same");
        assert_eq!(calls.len(), 1, "{path}");
        let formals: Vec<String> = calls[0]
            .formal_types
            .iter()
            .flatten()
            .map(|t| session.type_name(*t))
            .collect();
        assert_eq!(formals, vec!["b".to_string()], "{path}");
    }
    let mismatches: Vec<(String, String)> = errors(&session)
        .iter()
        .filter_map(|e| match e {
            TypecheckError::IncompatibleAssignment { expected, found, .. } => {
                Some((expected.clone(), found.clone()))
            }
            _ => None,
        })
        .collect();
    assert_eq!(mismatches, vec![("b".to_string(), "a".to_string())]);
}
