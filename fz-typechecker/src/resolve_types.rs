//! Resolution of types as written in source.
//!
//! A written type is resolved relative to the feature it appears in: the
//! name is tried as a formal type parameter and then as a type-defining
//! feature, level by level outward. Actual generics and the outer type are
//! resolved recursively, the generic arity is checked and the result is
//! interned. Failures are diagnosed once and yield [`TypeId::ERROR`].

use crate::context::Context;
use crate::error::TypecheckError;
use crate::features::FeatureId;
use crate::generics::Generic;
use crate::session::{Builtin, CompilationSession};
use crate::typed_ast::TypeRef;
use crate::types::{TypeId, TypeKind};
use fz_ast::{TypeMode, UnresolvedType};

/// Outcome of looking up a type name in one feature
enum TypeFeature {
    None,
    Found(FeatureId),
    Ambiguous(Vec<FeatureId>),
}

impl CompilationSession {
    /// Resolved type of `r`, memoized in the reference
    pub(crate) fn resolve_type_ref(&mut self, r: &mut TypeRef, at: FeatureId) -> TypeId {
        if let Some(t) = r.resolved {
            return t;
        }
        let t = self.resolve_unresolved(&r.source, at);
        r.resolved = Some(t);
        t
    }

    pub(crate) fn resolve_unresolved(&mut self, u: &UnresolvedType, at: FeatureId) -> TypeId {
        if u.mode == Some(TypeMode::This) {
            return self.resolve_this_type(u, at);
        }

        // explicit outer type `a.b`
        if let Some(outer) = &u.outer {
            let outer_type = self.resolve_unresolved(outer, at);
            if outer_type.is_error() {
                return TypeId::ERROR;
            }
            let Some(outer_feature) = self.feature_of_type(outer_type) else {
                self.report(TypecheckError::UnresolvedName {
                    name: u.to_string(),
                    what: "type".to_string(),
                    span: u.span.into(),
                });
                return TypeId::ERROR;
            };
            return match self.find_type_feature(outer_feature, &u.name) {
                TypeFeature::Found(f) => self.instantiate(u, f, Some(outer_type), at),
                TypeFeature::Ambiguous(ids) => self.ambiguous_type(u, &ids),
                TypeFeature::None => self.unresolved_type(u),
            };
        }

        let mut level = Some(at);
        while let Some(l) = level {
            if let Some(index) = self.feature(l).generics.index_of(&u.name) {
                return self.resolve_generic_use(u, Generic::new(l, index));
            }
            match self.find_type_feature(l, &u.name) {
                TypeFeature::Found(f) => {
                    let outer = self.feature(f).outer.and_then(|o| self.outer_type_for(o));
                    return self.instantiate(u, f, outer, at);
                }
                TypeFeature::Ambiguous(ids) => return self.ambiguous_type(u, &ids),
                TypeFeature::None => level = self.feature(l).outer,
            }
        }
        self.unresolved_type(u)
    }

    /// `a.this`: the current instance of enclosing feature `a`
    fn resolve_this_type(&mut self, u: &UnresolvedType, at: FeatureId) -> TypeId {
        let mut level = Some(at);
        while let Some(l) = level {
            if self.feature(l).base_name() == u.name {
                let current = self.current_type(l);
                return self.as_this(current);
            }
            level = self.feature(l).outer;
        }
        self.unresolved_type(u)
    }

    fn resolve_generic_use(&mut self, u: &UnresolvedType, generic: Generic) -> TypeId {
        if !u.generics.is_empty() {
            self.report(TypecheckError::GenericArityMismatch {
                name: u.name.clone(),
                expected: "no generic arguments".to_string(),
                found: u.generics.len(),
                span: u.span.into(),
            });
            return TypeId::ERROR;
        }
        let open = self
            .feature(generic.feature)
            .generics
            .is_open_index(generic.index);
        if u.open && !open {
            self.report(TypecheckError::OpenGenericMisuse {
                name: u.to_string(),
                span: u.span.into(),
            });
            return TypeId::ERROR;
        }
        let t = self.parametric_type(generic);
        match u.mode {
            Some(TypeMode::Ref) => self.as_ref(t),
            _ => t,
        }
    }

    fn instantiate(
        &mut self,
        u: &UnresolvedType,
        feature: FeatureId,
        outer: Option<TypeId>,
        at: FeatureId,
    ) -> TypeId {
        let mut generics = Vec::with_capacity(u.generics.len());
        let mut failed = false;
        for g in &u.generics {
            let t = self.resolve_unresolved(g, at);
            failed |= t.is_error();
            generics.push(t);
        }
        if failed {
            return TypeId::ERROR;
        }

        let expands_open = generics.iter().any(|g| self.is_open_parametric(*g));
        let formals = &self.feature(feature).generics;
        if !expands_open && !formals.size_matches(generics.len()) {
            let expected = formals.size_text();
            self.report(TypecheckError::GenericArityMismatch {
                name: u.name.clone(),
                expected,
                found: generics.len(),
                span: u.span.into(),
            });
            return TypeId::ERROR;
        }

        let t = self.constructor_type(feature, generics, outer);
        match u.mode {
            Some(TypeMode::Ref) => self.as_ref(t),
            Some(TypeMode::Value) => self.as_value(t),
            _ => t,
        }
    }

    /// Type-defining inner feature of `outer` named `name`, any arity
    fn find_type_feature(&self, outer: FeatureId, name: &str) -> TypeFeature {
        let mut found: Vec<FeatureId> = self
            .members(outer, name)
            .into_iter()
            .filter(|id| self.feature(*id).defines_type())
            .collect();
        found.dedup();
        match found.len() {
            0 => TypeFeature::None,
            1 => TypeFeature::Found(found[0]),
            _ => TypeFeature::Ambiguous(found),
        }
    }

    fn unresolved_type(&mut self, u: &UnresolvedType) -> TypeId {
        self.report(TypecheckError::UnresolvedName {
            name: u.to_string(),
            what: "type".to_string(),
            span: u.span.into(),
        });
        TypeId::ERROR
    }

    fn ambiguous_type(&mut self, u: &UnresolvedType, ids: &[FeatureId]) -> TypeId {
        let candidates = ids
            .iter()
            .map(|id| format!("`{}`", self.qualified_name(*id)))
            .collect::<Vec<_>>()
            .join(", ");
        self.report(TypecheckError::AmbiguousName {
            name: u.to_string(),
            candidates,
            span: u.span.into(),
        });
        TypeId::ERROR
    }

    // Constraints of type parameters

    /// Declared constraint of `generic`, `Any` when none is given
    pub(crate) fn declared_constraint(&mut self, generic: Generic) -> TypeId {
        let decl = self
            .feature(generic.feature)
            .generics
            .get(generic.index)
            .and_then(|g| g.constraint.clone());
        match decl {
            Some(TypeRef {
                resolved: Some(t), ..
            }) => t,
            Some(TypeRef { source, .. }) => {
                let t = self.resolve_unresolved(&source, generic.feature);
                if let Some(g) = self
                    .feature_mut(generic.feature)
                    .generics
                    .get_mut(generic.index)
                {
                    if let Some(c) = &mut g.constraint {
                        c.resolved = Some(t);
                    }
                }
                t
            }
            None => self.builtin_type(Builtin::Any),
        }
    }

    /// Constraint of `generic` at a point with `context`, narrowed by type tests
    pub(crate) fn effective_constraint(&mut self, generic: Generic, context: &Context) -> TypeId {
        match context.constraint_for(self, generic) {
            Some(t) => t,
            None => self.declared_constraint(generic),
        }
    }

    /// `T : X` among the preconditions of `feature`, for `generic` or a clone of it
    pub(crate) fn precondition_constraint(
        &mut self,
        feature: FeatureId,
        generic: Generic,
    ) -> Option<TypeId> {
        let holders = [Some(feature), self.feature(feature).precondition];
        for holder in holders.into_iter().flatten() {
            let count = self.feature(holder).pre_constraints.len();
            for i in 0..count {
                let (g, r) = &self.feature(holder).pre_constraints[i];
                if !self.same_or_clone(*g, generic) {
                    continue;
                }
                if let Some(t) = r.resolved {
                    return Some(t);
                }
                let source = r.source.clone();
                let t = self.resolve_unresolved(&source, holder);
                self.feature_mut(holder).pre_constraints[i].1.resolved = Some(t);
                return Some(t);
            }
        }
        None
    }

    /// Resolves the written type parameter of a type test to its generic
    pub(crate) fn type_test_generic(&mut self, param: &mut TypeRef, at: FeatureId) -> Option<Generic> {
        let t = self.resolve_type_ref(param, at);
        match self.type_kind(t) {
            TypeKind::Parametric { generic, .. } => Some(*generic),
            TypeKind::Error => None,
            _ => {
                self.report(TypecheckError::NotATypeParameter {
                    name: param.source.to_string(),
                    span: param.span().into(),
                });
                None
            }
        }
    }
}
