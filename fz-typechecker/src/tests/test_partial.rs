use super::*;
use fz_ast::builder::*;
use pretty_assertions::assert_eq;

fn unary_function() -> fz_ast::UnresolvedType {
    ty_of("Function", vec![ty("i32"), ty("i32")])
}

fn prelude_for_apply() -> Vec<FeatureDecl> {
    vec![
        feature("add")
            .arg("a", ty("i32"))
            .arg("b", ty("i32"))
            .returns(ty("i32"))
            .intrinsic()
            .build(),
        feature("apply")
            .arg("f", unary_function())
            .arg("x", ty("i32"))
            .returns(ty("i32"))
            .intrinsic()
            .build(),
    ]
}

/// Lambda features created in the body of `path` with their types
fn lambdas(session: &CompilationSession, path: &str) -> Vec<(FeatureId, String)> {
    body_nodes(session, path)
        .iter()
        .filter_map(|e| match &e.kind {
            ExprKind::Lambda(l) => Some((
                l.feature,
                l.ty.map(|t| session.type_name(t)).unwrap_or_default(),
            )),
            _ => None,
        })
        .collect()
}

#[test]
fn test_missing_argument_becomes_lambda_parameter() {
    let mut features = prelude_for_apply();
    features.push(
        feature("main")
            .is(call(
                "apply",
                vec![call("add", vec![int("1")]), int("2")],
            ))
            .build(),
    );
    let session = check(features);

    assert_no_errors(&session);
    assert_eq!(result_type_name(&session, "main"), "i32");
    let found = lambdas(&session, "main");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].1, "Function i32 i32");
    assert_eq!(session.feature(found[0].0).args.len(), 1);
}

#[test]
fn test_operator_section_takes_both_operands() {
    let session = check(vec![
        feature("combine")
            .arg("f", ty_of("Function", vec![ty("i32"), ty("i32"), ty("i32")]))
            .returns(ty("i32"))
            .intrinsic()
            .build(),
        feature("main").is(call("combine", vec![section("+")])).build(),
    ]);

    assert_no_errors(&session);
    let found = lambdas(&session, "main");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].1, "Function i32 i32 i32");
    assert_eq!(session.feature(found[0].0).args.len(), 2);
}

#[test]
fn test_prefix_operator_as_unary_function() {
    let mut features = prelude_for_apply();
    features.push(
        feature("main")
            .is(call("apply", vec![prefix("-", int("5")), int("2")]))
            .build(),
    );
    let session = check(features);

    assert_no_errors(&session);
    let found = lambdas(&session, "main");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].1, "Function i32 i32");
    assert_eq!(result_type_name(&session, "main"), "i32");
}

#[test]
fn test_partial_application_that_could_also_be_a_full_call() {
    let mut features = prelude_for_apply();
    features.extend([
        feature("g")
            .arg("a", ty("i32"))
            .returns(unary_function())
            .intrinsic()
            .build(),
        feature("g")
            .arg("a", ty("i32"))
            .arg("b", ty("i32"))
            .returns(ty("i32"))
            .intrinsic()
            .build(),
        feature("main")
            .is(call("apply", vec![call("g", vec![int("1")]), int("2")]))
            .build(),
    ]);
    let session = check(features);

    assert!(errors(&session)
        .iter()
        .any(|e| matches!(e, TypecheckError::AmbiguousPartialApplication { .. })));
}
