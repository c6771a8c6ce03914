use super::*;
use crate::context::Context;
use crate::generics::Generic;
use crate::session::Builtin;
use fz_ast::builder::*;
use pretty_assertions::assert_eq;

fn nested() -> CompilationSession {
    check(vec![feature("outer_f")
        .type_param("T")
        .inner(feature("inner_f").returns(ty("unit")).intrinsic().build())
        .build()])
}

#[test]
fn test_empty_context() {
    let context = Context::none();
    assert_eq!(context.outer_feature(), None);
    assert_eq!(context.depth(), 1);
}

#[test]
fn test_feature_context_follows_lexical_nesting() {
    let session = nested();
    let outer = feature_id(&session, "outer_f");
    let inner = feature_id(&session, "outer_f.inner_f");

    let context = Context::for_feature(&session, inner);
    assert_eq!(context.outer_feature(), Some(inner));
    assert_eq!(context.depth(), 3);
    assert_eq!(Context::for_feature(&session, outer).depth(), 2);
}

#[test]
fn test_constraint_scope() {
    let mut session = nested();
    let outer = feature_id(&session, "outer_f");
    let inner = feature_id(&session, "outer_f.inner_f");
    let string = session.builtin_type(Builtin::String);
    let generic = Generic::new(outer, 0);

    let base = Context::for_feature(&session, inner);
    assert_eq!(base.constraint_for(&mut session, generic), None);

    let narrowed = base.add_type_constraint(generic, string);
    assert_eq!(narrowed.outer_feature(), Some(inner));
    assert_eq!(narrowed.depth(), base.depth() + 1);
    assert_eq!(narrowed.constraint_for(&mut session, generic), Some(string));
    assert_eq!(base.constraint_for(&mut session, generic), None);
}

#[test]
fn test_type_test_narrows_inside_the_branch() {
    let session = check(vec![feature("show")
        .type_param("T")
        .arg("x", ty("T"))
        .returns(ty("unit"))
        .body(vec![if_then(
            type_test("T", ty("String")),
            vec![infix(name("x"), "+", string("!"))],
        )])
        .build()]);

    assert_no_errors(&session);
    assert_eq!(result_type_name(&session, "show"), "unit");
}

#[test]
fn test_without_type_test_the_operator_is_unknown() {
    let session = check(vec![feature("show")
        .type_param("T")
        .arg("x", ty("T"))
        .returns(ty("unit"))
        .body(vec![infix(name("x"), "+", string("!"))])
        .build()]);

    assert!(errors(&session)
        .iter()
        .any(|e| matches!(e, TypecheckError::UnresolvedName { .. })));
}

#[test]
fn test_precondition_type_test_constrains_the_body() {
    let session = check(vec![feature("show")
        .type_param("T")
        .arg("x", ty("T"))
        .pre(type_test("T", ty("String")))
        .returns(ty("String"))
        .body(vec![infix(name("x"), "+", string("!"))])
        .build()]);

    assert_no_errors(&session);
}
