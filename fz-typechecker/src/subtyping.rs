//! Substitution, inheritance views, assignability and least upper bounds.

use crate::context::Context;
use crate::features::FeatureId;
use crate::session::{Builtin, CompilationSession};
use crate::types::{RefOrVal, TypeId, TypeKind, TypeOutcome};
use std::collections::{HashSet, VecDeque};

/// Nesting limit when looking through choice variants
const MAX_CHOICE_DEPTH: usize = 16;

/// Actual generics for the formal generics of some features, and the static
/// type that replaces `this`-types
#[derive(Debug, Clone, Default)]
pub(crate) struct Substitution {
    pub bindings: Vec<(FeatureId, Vec<TypeId>)>,
    pub target: Option<TypeId>,
}

impl Substitution {
    pub fn new(bindings: Vec<(FeatureId, Vec<TypeId>)>) -> Self {
        Self {
            bindings,
            target: None,
        }
    }

    pub fn with_target(mut self, target: TypeId) -> Self {
        self.target = Some(target);
        self
    }

    fn actuals_for(&self, feature: FeatureId) -> Option<&[TypeId]> {
        self.bindings
            .iter()
            .find(|(f, _)| *f == feature)
            .map(|(_, actuals)| actuals.as_slice())
    }
}

impl CompilationSession {
    /// Applies `s` to `t`. An open type parameter expands to its whole
    /// actual list, which may be empty.
    pub(crate) fn apply(&mut self, t: TypeId, s: &Substitution) -> Vec<TypeId> {
        match self.type_kind(t).clone() {
            TypeKind::Parametric { generic, boxed } => {
                let Some(actuals) = s.actuals_for(generic.feature) else {
                    return vec![t];
                };
                let replaced = self
                    .feature(generic.feature)
                    .generics
                    .replace_all(generic.index, actuals);
                if boxed {
                    replaced.into_iter().map(|r| self.as_ref(r)).collect()
                } else {
                    replaced
                }
            }
            TypeKind::Normal {
                feature,
                generics,
                outer,
                mode,
            } => {
                let mut applied = Vec::with_capacity(generics.len());
                for g in generics {
                    applied.extend(self.apply(g, s));
                }
                let outer = outer.map(|o| self.apply_one(o, s));
                vec![self.normal_type(feature, applied, outer, mode)]
            }
            TypeKind::This(p) => match s.target {
                Some(target) if self.is_this_target(target, p) => vec![target],
                _ => vec![t],
            },
            _ => vec![t],
        }
    }

    /// [`apply`](Self::apply) for a position that holds exactly one type
    pub(crate) fn apply_one(&mut self, t: TypeId, s: &Substitution) -> TypeId {
        let mut applied = self.apply(t, s);
        if applied.len() == 1 {
            applied.remove(0)
        } else {
            TypeId::ERROR
        }
    }

    fn is_this_target(&mut self, target: TypeId, p: FeatureId) -> bool {
        match self.feature_of_type(target) {
            Some(f) if f == p => true,
            Some(_) => self.ancestor_view(target, p).is_some(),
            None => false,
        }
    }

    // Inheritance

    /// Types of the direct parents of `f`, computed once
    pub(crate) fn parent_types(&mut self, f: FeatureId) -> Vec<TypeId> {
        if let Some(types) = &self.feature(f).parent_types {
            return types.clone();
        }
        self.ensure_inheritance(f);
        let types = self.compute_parent_types(f);
        self.feature_mut(f).parent_types = Some(types.clone());
        types
    }

    /// `t` seen as an instance of ancestor `p`, generics substituted
    pub(crate) fn ancestor_view(&mut self, t: TypeId, p: FeatureId) -> Option<TypeId> {
        let start = match self.type_kind(t) {
            TypeKind::This(f) => {
                let f = *f;
                self.current_type(f)
            }
            TypeKind::Normal { .. } => t,
            _ => return None,
        };
        let mut queue = VecDeque::from([start]);
        let mut visited = HashSet::new();
        while let Some(current) = queue.pop_front() {
            let TypeKind::Normal {
                feature, generics, ..
            } = self.type_kind(current).clone()
            else {
                continue;
            };
            if feature == p {
                return Some(current);
            }
            if !visited.insert(feature) {
                continue;
            }
            let s = Substitution::new(vec![(feature, generics)]);
            for parent in self.parent_types(feature) {
                let viewed = self.apply_one(parent, &s);
                queue.push_back(viewed);
            }
        }
        None
    }

    /// Actual generics of `p` as seen from `t`: through the ancestors of
    /// `t` first, then through its outer types
    pub(crate) fn view_generics(&mut self, t: TypeId, p: FeatureId) -> Option<Vec<TypeId>> {
        if let Some(view) = self.ancestor_view(t, p) {
            return Some(self.generics_of_type(view));
        }
        let outer = match self.type_kind(t) {
            TypeKind::Normal { outer, .. } => *outer,
            TypeKind::This(f) => {
                let f = *f;
                let current = self.current_type(f);
                match self.type_kind(current) {
                    TypeKind::Normal { outer, .. } => *outer,
                    _ => None,
                }
            }
            _ => None,
        };
        outer.and_then(|o| self.view_generics(o, p))
    }

    // Assignability

    /// Can a value of type `actual` be assigned to a slot of type `formal`?
    /// Tagging into choice types counts.
    pub(crate) fn is_assignable_from(&mut self, formal: TypeId, actual: TypeId, context: &Context) -> bool {
        self.assignable(formal, actual, context, true, 0)
    }

    /// Like [`is_assignable_from`](Self::is_assignable_from) without tagging
    pub(crate) fn is_directly_assignable_from(
        &mut self,
        formal: TypeId,
        actual: TypeId,
        context: &Context,
    ) -> bool {
        self.assignable(formal, actual, context, false, 0)
    }

    fn assignable(
        &mut self,
        formal: TypeId,
        actual: TypeId,
        context: &Context,
        tagging: bool,
        depth: usize,
    ) -> bool {
        if formal == actual || formal.is_error() || actual.is_error() || self.is_void(actual) {
            return true;
        }
        if depth > MAX_CHOICE_DEPTH {
            return false;
        }
        let fk = self.type_kind(formal).clone();
        let ak = self.type_kind(actual).clone();
        match (fk, ak) {
            (TypeKind::Undefined, _) | (_, TypeKind::Undefined) => false,
            (TypeKind::Address, _) | (_, TypeKind::Address) => false,
            (_, TypeKind::This(p)) => {
                let current = self.current_type(p);
                self.assignable(formal, current, context, tagging, depth + 1)
            }
            (TypeKind::This(p), _) => {
                let current = self.current_type(p);
                self.assignable(current, actual, context, tagging, depth + 1)
            }
            (TypeKind::Parametric { generic: f, .. }, TypeKind::Parametric { generic: a, .. })
                if self.same_or_clone(f, a) =>
            {
                true
            }
            (_, TypeKind::Parametric { generic, .. }) => {
                let constraint = self.effective_constraint(generic, context);
                if constraint == actual {
                    return false;
                }
                self.assignable(formal, constraint, context, tagging, depth + 1)
            }
            (TypeKind::Parametric { .. }, _) => false,
            (
                TypeKind::Normal {
                    feature: ff,
                    generics: fg,
                    mode: fm,
                    ..
                },
                TypeKind::Normal {
                    feature: af,
                    generics: ag,
                    mode: am,
                    ..
                },
            ) => {
                if ff == af {
                    return self.same_generics(&fg, &ag) && (fm == RefOrVal::Ref || am == RefOrVal::Value);
                }
                if fm == RefOrVal::Ref {
                    if let Some(view) = self.ancestor_view(actual, ff) {
                        let vg = self.generics_of_type(view);
                        if self.same_generics(&fg, &vg) {
                            return true;
                        }
                    }
                }
                if tagging && self.feature(ff).is_choice() {
                    let variants = self.choice_variants(formal);
                    return variants
                        .into_iter()
                        .any(|v| self.assignable(v, actual, context, true, depth + 1));
                }
                false
            }
            _ => false,
        }
    }

    /// Pairwise equal actual generics; ERROR matches anything
    fn same_generics(&self, a: &[TypeId], b: &[TypeId]) -> bool {
        a.len() == b.len()
            && a.iter().zip(b).all(|(x, y)| {
                x == y
                    || x.is_error()
                    || y.is_error()
                    || match (self.type_kind(*x), self.type_kind(*y)) {
                        (
                            TypeKind::Parametric { generic: gx, .. },
                            TypeKind::Parametric { generic: gy, .. },
                        ) => self.same_or_clone(*gx, *gy),
                        _ => false,
                    }
            })
    }

    // Choices

    /// Variant types of choice type `t`, with the choice's actual generics
    /// substituted
    pub(crate) fn choice_variants(&mut self, t: TypeId) -> Vec<TypeId> {
        let TypeKind::Normal {
            feature, generics, ..
        } = self.type_kind(t).clone()
        else {
            return Vec::new();
        };
        if !self.feature(feature).is_choice() {
            return Vec::new();
        }
        let count = self.feature(feature).variants.len();
        let mut declared = Vec::with_capacity(count);
        for i in 0..count {
            let r = &self.feature(feature).variants[i];
            let resolved = match r.resolved {
                Some(v) => v,
                None => {
                    let source = r.source.clone();
                    let v = self.resolve_unresolved(&source, feature);
                    self.feature_mut(feature).variants[i].resolved = Some(v);
                    v
                }
            };
            declared.push(resolved);
        }
        let s = Substitution::new(vec![(feature, generics)]);
        let mut variants = Vec::with_capacity(declared.len());
        for v in declared {
            variants.extend(self.apply(v, &s));
        }
        variants
    }

    // Union

    /// Least upper bound of two branch types
    pub(crate) fn union(&mut self, a: TypeId, b: TypeId) -> TypeOutcome {
        if a == TypeId::UNDEFINED || b == TypeId::UNDEFINED {
            return TypeOutcome::Pending;
        }
        if a == b {
            return TypeOutcome::Known(a);
        }
        if self.is_void(a) {
            return TypeOutcome::Known(b);
        }
        if self.is_void(b) {
            return TypeOutcome::Known(a);
        }
        if a.is_error() || b.is_error() {
            return TypeOutcome::Known(TypeId::ERROR);
        }
        let none = Context::none();
        if self.is_directly_assignable_from(a, b, &none) {
            return TypeOutcome::Known(a);
        }
        if self.is_directly_assignable_from(b, a, &none) {
            return TypeOutcome::Known(b);
        }
        if self.is_choice_type(a) && self.is_assignable_from(a, b, &none) {
            return TypeOutcome::Known(a);
        }
        if self.is_choice_type(b) && self.is_assignable_from(b, a, &none) {
            return TypeOutcome::Known(b);
        }
        match self.common_ancestor(a, b) {
            Some(t) => TypeOutcome::Known(t),
            None => TypeOutcome::Incompatible,
        }
    }

    /// Nearest ancestor of `a`, other than `Any`, that `b` also inherits with
    /// the same actual generics, as a reference type
    fn common_ancestor(&mut self, a: TypeId, b: TypeId) -> Option<TypeId> {
        let TypeKind::Normal {
            feature, generics, ..
        } = self.type_kind(a).clone()
        else {
            return None;
        };
        let any = self.builtin(Builtin::Any);
        let mut queue = VecDeque::new();
        let s = Substitution::new(vec![(feature, generics)]);
        for p in self.parent_types(feature) {
            queue.push_back(self.apply_one(p, &s));
        }
        let mut visited = HashSet::new();
        while let Some(candidate) = queue.pop_front() {
            let TypeKind::Normal {
                feature, generics, ..
            } = self.type_kind(candidate).clone()
            else {
                continue;
            };
            if Some(feature) == any || !visited.insert(feature) {
                continue;
            }
            if let Some(view) = self.ancestor_view(b, feature) {
                let vg = self.generics_of_type(view);
                if self.same_generics(&generics, &vg) {
                    return Some(self.as_ref(candidate));
                }
            }
            let s = Substitution::new(vec![(feature, generics)]);
            for p in self.parent_types(feature) {
                queue.push_back(self.apply_one(p, &s));
            }
        }
        None
    }
}
