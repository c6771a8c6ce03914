//! Inference of actual generics from the types of actual arguments.
//!
//! Each formal argument type is matched structurally against the type of
//! its actual. Type parameters of the callee found on the way are bound to
//! the corresponding part of the actual type; two different bindings for
//! one parameter are merged when one accepts the other.

use crate::context::Context;
use crate::error::TypecheckError;
use crate::features::FeatureId;
use crate::generics::Generic;
use crate::session::CompilationSession;
use crate::types::{TypeId, TypeKind, TypeOutcome};
use fz_ast::Span;

/// Nesting limit when matching formal against actual types
const MAX_UNIFY_DEPTH: usize = 32;

/// Bindings found so far for the type parameters of one callee
#[derive(Debug)]
pub(crate) struct Inference {
    callee: FeatureId,
    open: Option<usize>,
    solved: Vec<Option<Vec<TypeId>>>,
    conflicts: Vec<(usize, Vec<TypeId>)>,
}

impl Inference {
    pub fn new(session: &CompilationSession, callee: FeatureId) -> Self {
        let generics = &session.feature(callee).generics;
        let open = generics.is_open().then(|| generics.len() - 1);
        Self {
            callee,
            open,
            solved: vec![None; generics.len()],
            conflicts: Vec::new(),
        }
    }

    /// Every closed type parameter is bound
    pub fn is_complete(&self) -> bool {
        self.solved
            .iter()
            .enumerate()
            .all(|(i, s)| s.is_some() || Some(i) == self.open)
    }

    /// Binds the open type parameter to the types of trailing actuals
    pub fn solve_open(&mut self, types: Vec<TypeId>) {
        if let Some(open) = self.open {
            if self.solved[open].is_none() {
                self.solved[open] = Some(types);
            }
        }
    }
}

impl CompilationSession {
    pub(crate) fn unify(&mut self, inference: &mut Inference, formal: TypeId, actual: TypeId, context: &Context) {
        self.unify_at(inference, formal, actual, context, 0);
    }

    fn unify_at(
        &mut self,
        inference: &mut Inference,
        formal: TypeId,
        actual: TypeId,
        context: &Context,
        depth: usize,
    ) {
        if actual.is_error() || depth > MAX_UNIFY_DEPTH || self.is_void(actual) {
            return;
        }
        match self.type_kind(formal).clone() {
            TypeKind::Parametric { generic, .. } if generic.feature == inference.callee => {
                self.bind(inference, generic.index, actual, context);
            }
            TypeKind::Normal { feature, generics, .. } => {
                if !self.mentions_generic_of(formal, inference.callee) {
                    return;
                }
                if self.feature(feature).is_choice() && self.feature_of_type(actual) != Some(feature) {
                    self.unify_variants(inference, formal, actual, context, depth);
                    return;
                }
                let Some(view) = self.ancestor_view(actual, feature) else {
                    return;
                };
                let actual_generics = self.generics_of_type(view);
                for (j, g) in generics.iter().enumerate() {
                    if let TypeKind::Parametric { generic, .. } = self.type_kind(*g) {
                        if generic.feature == inference.callee && Some(generic.index) == inference.open {
                            inference.solve_open(actual_generics.get(j..).map(<[_]>::to_vec).unwrap_or_default());
                            break;
                        }
                    }
                    if let Some(a) = actual_generics.get(j) {
                        self.unify_at(inference, *g, *a, context, depth + 1);
                    }
                }
            }
            _ => {}
        }
    }

    /// An actual flowing into a choice binds through the variants that
    /// mention type parameters, unless it already is one of the others
    fn unify_variants(
        &mut self,
        inference: &mut Inference,
        formal: TypeId,
        actual: TypeId,
        context: &Context,
        depth: usize,
    ) {
        let variants = self.choice_variants(formal);
        let callee = inference.callee;
        let concrete = variants.iter().any(|v| {
            !self.mentions_generic_of(*v, callee) && self.is_assignable_from(*v, actual, context)
        });
        if concrete {
            return;
        }
        for v in variants {
            if self.mentions_generic_of(v, callee) {
                self.unify_at(inference, v, actual, context, depth + 1);
            }
        }
    }

    fn bind(&mut self, inference: &mut Inference, index: usize, actual: TypeId, context: &Context) {
        let Some(previous) = inference.solved[index].as_ref().and_then(|s| s.first().copied()) else {
            inference.solved[index] = Some(vec![actual]);
            return;
        };
        if previous == actual || self.is_assignable_from(previous, actual, context) {
            return;
        }
        if self.is_assignable_from(actual, previous, context) {
            inference.solved[index] = Some(vec![actual]);
            return;
        }
        match self.union(previous, actual) {
            TypeOutcome::Known(u) => inference.solved[index] = Some(vec![u]),
            TypeOutcome::Pending | TypeOutcome::Incompatible => match inference
                .conflicts
                .iter_mut()
                .find(|(i, _)| *i == index)
            {
                Some((_, types)) => {
                    if !types.contains(&actual) {
                        types.push(actual);
                    }
                }
                None => inference.conflicts.push((index, vec![previous, actual])),
            },
        }
    }

    /// Actual generics with every parameter not bound yet standing for
    /// itself
    pub(crate) fn partial_generics(&mut self, inference: &Inference) -> Vec<TypeId> {
        let mut generics = Vec::new();
        for (i, s) in inference.solved.iter().enumerate() {
            match s {
                Some(types) => generics.extend(types.iter().copied()),
                None => generics.push(self.parametric_type(Generic::new(inference.callee, i))),
            }
        }
        generics
    }

    /// Reports conflicts and parameters left unbound, and returns the
    /// actual generics. An unbound open parameter is empty.
    pub(crate) fn finish_inference(&mut self, mut inference: Inference, span: Span) -> Vec<TypeId> {
        let callee = inference.callee;
        let generic_name = |session: &Self, index: usize| {
            session
                .feature(callee)
                .generics
                .get(index)
                .map(|g| g.name.clone())
                .unwrap_or_default()
        };
        for (index, types) in std::mem::take(&mut inference.conflicts) {
            self.report(TypecheckError::InferenceConflict {
                generic: generic_name(self, index),
                callee: self.qualified_name(callee),
                types: self.type_names(&types),
                span: span.into(),
            });
            inference.solved[index] = Some(vec![TypeId::ERROR]);
        }

        let mut generics = Vec::new();
        for (index, solved) in inference.solved.into_iter().enumerate() {
            match solved {
                Some(types) => generics.extend(types),
                None if Some(index) == inference.open => {}
                None => {
                    self.report(TypecheckError::InferenceFailed {
                        generic: generic_name(self, index),
                        callee: self.qualified_name(callee),
                        span: span.into(),
                    });
                    generics.push(TypeId::ERROR);
                }
            }
        }
        generics
    }
}
