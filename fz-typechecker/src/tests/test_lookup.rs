use super::*;
use fz_ast::builder::*;
use pretty_assertions::assert_eq;

#[test]
fn test_overload_chosen_by_argument_count() {
    let session = check(vec![
        feature("f").returns(ty("i32")).body(vec![int("1")]).build(),
        feature("f")
            .arg("x", ty("String"))
            .returns(ty("String"))
            .body(vec![name("x")])
            .build(),
        feature("none").is(name("f")).build(),
        feature("one").is(call("f", vec![string("s")])).build(),
    ]);

    assert_no_errors(&session);
    assert_eq!(result_type_name(&session, "none"), "i32");
    assert_eq!(result_type_name(&session, "one"), "String");
    assert!(session.find_overload("f", 1).is_some());
}

#[test]
fn test_inner_declaration_hides_outer_one() {
    let session = check(vec![
        feature("x").is(string("outer")).build(),
        feature("main")
            .inferred()
            .inner(feature("x").is(int("1")).build())
            .body(vec![name("x")])
            .build(),
    ]);

    assert_no_errors(&session);
    assert_eq!(result_type_name(&session, "main"), "i32");
    let inner_x = feature_id(&session, "main.x");
    assert_eq!(calls_of(&session, "main", inner_x), 1);
}

#[test]
fn test_argument_is_found_from_the_body() {
    let session = check(vec![feature("f")
        .arg("a", ty("bool"))
        .is(name("a"))
        .build()]);

    assert_no_errors(&session);
    assert_eq!(result_type_name(&session, "f"), "bool");
}

#[test]
fn test_unknown_name() {
    let session = check(vec![feature("main").is(name("missing")).build()]);

    let unresolved: Vec<_> = errors(&session)
        .iter()
        .filter(|e| matches!(e, TypecheckError::UnresolvedName { .. }))
        .collect();
    assert_eq!(unresolved.len(), 1);
    assert!(unresolved[0].to_string().contains("missing"));
}

#[test]
fn test_inherited_feature_is_visible_in_heir() {
    let session = check(vec![
        feature("p")
            .inner(feature("hello").is(string("hi")).build())
            .build(),
        feature("h").inherits(parent("p", vec![])).build(),
        feature("main")
            .is(call_on(name("h"), "hello", vec![]))
            .build(),
    ]);

    assert_no_errors(&session);
    assert_eq!(result_type_name(&session, "main"), "String");
}

#[test]
fn test_same_name_from_two_parents_is_ambiguous() {
    let session = check(vec![
        feature("p1").inner(feature("g").is(int("1")).build()).build(),
        feature("p2").inner(feature("g").is(int("2")).build()).build(),
        feature("h")
            .inherits(parent("p1", vec![]))
            .inherits(parent("p2", vec![]))
            .build(),
        feature("main").is(call_on(name("h"), "g", vec![])).build(),
    ]);

    assert!(errors(&session)
        .iter()
        .any(|e| matches!(e, TypecheckError::AmbiguousName { .. })));
}

#[test]
fn test_duplicate_declaration() {
    let session = check(vec![
        feature("twin").is(int("1")).build(),
        feature("twin").is(int("2")).build(),
    ]);

    let duplicates = errors(&session)
        .iter()
        .filter(|e| matches!(e, TypecheckError::DuplicateDeclaration { .. }))
        .count();
    assert_eq!(duplicates, 1);
}

#[test]
fn test_choice_is_a_parent_only_of_choices() {
    let session = check(vec![
        feature("flag").choice(vec![ty("bool"), ty("unit")]).build(),
        feature("more_flags")
            .choice(vec![ty("i32"), ty("String")])
            .inherits(parent("flag", vec![]))
            .build(),
        feature("not_a_choice").inherits(parent("flag", vec![])).build(),
    ]);

    let unresolved: Vec<&str> = errors(&session)
        .iter()
        .filter_map(|e| match e {
            TypecheckError::UnresolvedName { name, .. } => Some(name.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(unresolved, vec!["flag"]);

    let more_flags = feature_id(&session, "more_flags");
    let flag = feature_id(&session, "flag");
    assert_eq!(session.feature(more_flags).parents, vec![flag]);
    assert!(session.feature(feature_id(&session, "not_a_choice")).parents.is_empty());
}
