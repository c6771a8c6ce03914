//! Lexical scopes carrying flow-sensitive type parameter constraints.
//!
//! A [`Context`] is an immutable chain. Entering a branch guarded by a type
//! test `T : X` creates a child scope with the narrowed constraint; leaving
//! the branch simply drops the child, so pushes and pops stay balanced by
//! construction.

use crate::features::FeatureId;
use crate::generics::Generic;
use crate::session::CompilationSession;
use crate::types::TypeId;
use std::rc::Rc;

#[derive(Debug, Clone)]
pub struct Context(Rc<Scope>);

#[derive(Debug)]
enum Scope {
    None,
    /// Body of one feature, chained to the scope it is lexically nested in
    Feature { feature: FeatureId, exterior: Context },
    /// `generic` is known to be constrained to `constraint` here
    Constraint {
        generic: Generic,
        constraint: TypeId,
        exterior: Context,
    },
}

impl Context {
    pub fn none() -> Self {
        Context(Rc::new(Scope::None))
    }

    /// Scope of the body of `feature`.
    ///
    /// Synthesized features (lambdas, chained temporaries) continue the
    /// context of the expression that created them, everything else the
    /// context of its outer feature.
    pub fn for_feature(session: &CompilationSession, feature: FeatureId) -> Self {
        let f = session.feature(feature);
        let exterior = match (&f.source_context, f.outer) {
            (Some(context), _) => context.clone(),
            (None, Some(outer)) if outer != FeatureId::UNIVERSE => {
                Context::for_feature(session, outer)
            }
            _ => Context::none(),
        };
        Context(Rc::new(Scope::Feature { feature, exterior }))
    }

    pub fn add_type_constraint(&self, generic: Generic, constraint: TypeId) -> Self {
        Context(Rc::new(Scope::Constraint {
            generic,
            constraint,
            exterior: self.clone(),
        }))
    }

    /// Nearest enclosing feature, `None` for the empty context
    pub fn outer_feature(&self) -> Option<FeatureId> {
        let mut scope = self;
        loop {
            match &*scope.0 {
                Scope::None => return None,
                Scope::Feature { feature, .. } => return Some(*feature),
                Scope::Constraint { exterior, .. } => scope = exterior,
            }
        }
    }

    /// Narrowed constraint of `generic`, if any scope in the chain has one.
    ///
    /// Constraint scopes match by identity or clone equivalence. Feature
    /// scopes answer from the `T : X` tests in that feature's preconditions.
    pub fn constraint_for(&self, session: &mut CompilationSession, generic: Generic) -> Option<TypeId> {
        let mut scope = self.clone();
        loop {
            let next = match &*scope.0 {
                Scope::None => return None,
                Scope::Constraint {
                    generic: constrained,
                    constraint,
                    exterior,
                } => {
                    if session.same_or_clone(*constrained, generic) {
                        return Some(*constraint);
                    }
                    exterior.clone()
                }
                Scope::Feature { feature, exterior } => {
                    if let Some(t) = session.precondition_constraint(*feature, generic) {
                        return Some(t);
                    }
                    exterior.clone()
                }
            };
            scope = next;
        }
    }

    /// Number of scopes in the chain, the root included
    pub fn depth(&self) -> usize {
        let mut depth = 1;
        let mut scope = self;
        loop {
            match &*scope.0 {
                Scope::None => return depth,
                Scope::Feature { exterior, .. } | Scope::Constraint { exterior, .. } => {
                    depth += 1;
                    scope = exterior;
                }
            }
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::none()
    }
}
