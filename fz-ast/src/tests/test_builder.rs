use crate::ast::*;
use crate::builder::*;
use pretty_assertions::assert_eq;

#[test]
fn test_unresolved_type_display() {
    let t = ty_of("option", vec![ty_of("list", vec![ty("i32")])]);
    assert_eq!(t.to_string(), "option (list i32)");

    let inner = ty("list").inner("node");
    assert_eq!(inner.to_string(), "list.node");

    assert_eq!(ty("X").dots().to_string(), "X...");
    assert_eq!(ty("Shape").reference().to_string(), "ref Shape");
    assert_eq!(ty("point").this().to_string(), "point.this");
}

#[test]
fn test_feature_builder_collects_signature() {
    let decl = feature("map")
        .type_param("T")
        .open_type_param("X")
        .arg("a", ty("T"))
        .arg("b", ty("X").dots())
        .untyped_arg("c")
        .returns(ty("unit"))
        .build();

    assert_eq!(decl.name, "map");
    assert_eq!(decl.type_params.len(), 2);
    assert!(decl.type_params[1].open);
    assert_eq!(decl.args.len(), 3);
    assert_eq!(decl.args[2].ty, None);
    match &decl.result {
        ResultDecl::Declared(t) => assert_eq!(t.name, "unit"),
        other => panic!("expected declared result, got {other:?}"),
    }
}

#[test]
fn test_operator_names() {
    let e = infix(name("a"), "<", name("b"));
    match e.kind {
        ExprKind::Call(call) => {
            assert_eq!(call.name, "infix <");
            assert!(operators::is_relational_infix(&call.name));
            assert_eq!(operators::operator_of(&call.name), Some("<"));
            assert_eq!(call.actuals.len(), 1);
        }
        other => panic!("expected a call, got {other:?}"),
    }

    assert!(!operators::is_relational_infix("infix +"));
    assert!(!operators::is_relational_infix("prefix <"));
}

#[test]
fn test_call_modifiers() {
    let e = call("f", vec![]).parenthesized().with_generics(vec![ty("i32")]).select(1);
    let ExprKind::Call(call) = e.kind else {
        panic!("expected a call");
    };
    assert!(call.parenthesized);
    assert_eq!(call.generics.map(|g| g.len()), Some(1));
    assert_eq!(call.select, Some(1));
}

#[test]
fn test_program_span_covers_features() {
    let a = feature("a").build();
    let b = feature("b").build();
    let expected = a.span.merge(&b.span);

    let program = Program::new(vec![a, b]);
    assert_eq!(program.span, expected);
}

#[test]
fn test_inherits_clause_keeps_parent_calls() {
    let decl = feature("circle")
        .inherits(parent("shape", vec![]))
        .inherits(parent("named", vec![string("circle")]))
        .build();

    let parents: Vec<_> = decl
        .inherits
        .iter()
        .map(|p| (p.name.as_str(), p.actuals.len(), p.parenthesized))
        .collect();
    assert_eq!(parents, vec![("shape", 0, false), ("named", 1, true)]);
}
