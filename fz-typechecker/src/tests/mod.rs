//! Resolution tests over whole programs built with the AST builder.

mod test_branches;
mod test_calls;
mod test_context;
mod test_errors;
mod test_generics;
mod test_library;
mod test_lookup;
mod test_partial;
mod test_scheduler;
mod test_sugar;

use crate::typed_ast::{Call, Expr, ExprKind};
use crate::{typecheck_program, CompilationSession, FeatureId, TypecheckError};
use fz_ast::{FeatureDecl, Program};

/// Resolves `features` on top of the prelude
pub(crate) fn check(features: Vec<FeatureDecl>) -> CompilationSession {
    typecheck_program(&Program::new(features)).expect("resolution should not abort")
}

pub(crate) fn feature_id(session: &CompilationSession, path: &str) -> FeatureId {
    session
        .find_feature(path)
        .unwrap_or_else(|| panic!("`{path}` is not declared"))
}

/// Rendered result type of the feature at `path`
pub(crate) fn result_type_name(session: &CompilationSession, path: &str) -> String {
    let f = feature_id(session, path);
    match session.result_type_of(f) {
        Some(t) => session.type_name(t),
        None => "<unresolved>".to_string(),
    }
}

pub(crate) fn errors(session: &CompilationSession) -> &[TypecheckError] {
    session.diagnostics().diagnostics()
}

pub(crate) fn assert_no_errors(session: &CompilationSession) {
    assert!(
        !session.has_errors(),
        "unexpected diagnostics: {:#?}",
        errors(session)
    );
}

/// Every node of the body of the feature at `path`, in pre-order
pub(crate) fn body_nodes(session: &CompilationSession, path: &str) -> Vec<Expr> {
    let f = feature_id(session, path);
    let mut nodes = Vec::new();
    if let Some(body) = session.body(f) {
        body.walk(&mut |e| nodes.push(e.clone()));
    }
    nodes
}

/// Calls named `name` in the body of the feature at `path`
pub(crate) fn calls_named(session: &CompilationSession, path: &str, name: &str) -> Vec<Call> {
    body_nodes(session, path)
        .into_iter()
        .filter_map(|e| match e.kind {
            ExprKind::Call(call) if call.name == name => Some(*call),
            _ => None,
        })
        .collect()
}

/// Calls whose callee is `callee`, wherever they end up in the body
pub(crate) fn calls_of(session: &CompilationSession, path: &str, callee: FeatureId) -> usize {
    body_nodes(session, path)
        .iter()
        .filter(|e| matches!(&e.kind, ExprKind::Call(call) if call.callee == Some(callee)))
        .count()
}
