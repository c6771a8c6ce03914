use super::*;
use crate::session::Builtin;
use crate::{FeatureKind, LibraryFeature, LibraryType, ResolverOptions, State};
use fz_ast::builder::*;
use pretty_assertions::assert_eq;

#[test]
fn test_library_declarations_are_used_as_resolved() {
    let mut session = CompilationSession::new(ResolverOptions::default());
    let i32_type = session.builtin_type(Builtin::I32);
    let string = session.builtin_type(Builtin::String);
    let describe = session.add_library_feature(
        FeatureId::UNIVERSE,
        "describe",
        vec![("n".to_string(), i32_type)],
        string,
        FeatureKind::Intrinsic,
    );
    let handle = session.add_library_type(FeatureId::UNIVERSE, "handle", true);

    session.add_program(&Program::new(vec![
        feature("main").is(call("describe", vec![int("4")])).build(),
        feature("open_handle").is(name("handle")).build(),
    ]));
    session.resolve().expect("resolution should not abort");

    assert_no_errors(&session);
    assert_eq!(result_type_name(&session, "main"), "String");
    assert_eq!(result_type_name(&session, "open_handle"), "handle");
    assert_eq!(calls_of(&session, "main", describe), 1);
    assert_eq!(session.state(describe), State::Resolved);
    assert_eq!(session.state(handle), State::Resolved);
}

#[test]
fn test_without_prelude_nothing_is_builtin() {
    let session = typecheck_program(&Program::new(vec![])).expect("resolution should not abort");
    assert!(session.builtin(Builtin::Bool).is_some());

    let bare = CompilationSession::new(ResolverOptions::default().without_prelude());
    for builtin in Builtin::ALL {
        assert_eq!(bare.builtin(builtin), None);
    }
}

#[test]
fn test_reset_starts_a_fresh_unit() {
    let mut session = check(vec![feature("main").is(name("missing")).build()]);
    assert!(session.has_errors());

    session.reset();
    assert!(!session.has_errors());
    assert_eq!(session.find_feature("main"), None);
    assert!(session.builtin(Builtin::I32).is_some());
}

#[test]
fn test_generic_library_feature_is_called_with_inferred_generics() {
    let mut session = CompilationSession::new(ResolverOptions::default());
    let i32_type = session.builtin_type(Builtin::I32);
    let list = session.add_library(
        FeatureId::UNIVERSE,
        LibraryFeature::new("list", FeatureKind::Routine).type_param("T", None),
    );
    let head = session.add_library(
        FeatureId::UNIVERSE,
        LibraryFeature::new("head", FeatureKind::Intrinsic)
            .type_param("T", None)
            .arg("l", LibraryType::Of(list, vec![LibraryType::Generic(0)]))
            .returns(LibraryType::Generic(0)),
    );
    session.add_library(
        FeatureId::UNIVERSE,
        LibraryFeature::new("numbers", FeatureKind::Intrinsic)
            .returns(LibraryType::Of(list, vec![LibraryType::Known(i32_type)])),
    );

    session.add_program(&Program::new(vec![feature("main")
        .is(call("head", vec![name("numbers")]))
        .build()]));
    session.resolve().expect("resolution should not abort");

    assert_no_errors(&session);
    assert_eq!(session.feature(head).generics.len(), 1);
    assert_eq!(result_type_name(&session, "main"), "i32");
    assert_eq!(result_type_name(&session, "numbers"), "list i32");
    let calls = calls_named(&session, "main", "head");
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].generics, vec![i32_type]);
}

#[test]
fn test_library_type_inherits_another_library_type() {
    let mut session = CompilationSession::new(ResolverOptions::default());
    let f64_type = session.builtin_type(Builtin::F64);
    let string = session.builtin_type(Builtin::String);
    let shape = session.add_library(
        FeatureId::UNIVERSE,
        LibraryFeature::new("shape", FeatureKind::Routine).reference(),
    );
    session.add_library_feature(shape, "area", vec![], f64_type, FeatureKind::Intrinsic);
    let square = session.add_library(
        FeatureId::UNIVERSE,
        LibraryFeature::new("square", FeatureKind::Routine).inherits(LibraryType::Of(shape, vec![])),
    );
    session.add_library(
        FeatureId::UNIVERSE,
        LibraryFeature::new("describe", FeatureKind::Intrinsic)
            .arg("s", LibraryType::Of(shape, vec![]))
            .returns(LibraryType::Known(string)),
    );

    session.add_program(&Program::new(vec![
        feature("size").is(call_on(name("square"), "area", vec![])).build(),
        feature("text").is(call("describe", vec![name("square")])).build(),
    ]));
    session.resolve().expect("resolution should not abort");

    assert_no_errors(&session);
    assert_eq!(session.feature(square).parents, vec![shape]);
    assert_eq!(result_type_name(&session, "size"), "f64");
    assert_eq!(result_type_name(&session, "text"), "String");
}
