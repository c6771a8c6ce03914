//! Constructors, conversions and queries on interned types.

use crate::features::FeatureId;
use crate::generics::Generic;
use crate::session::{Builtin, CompilationSession};
use crate::types::{RefOrVal, TypeId, TypeKind};

impl CompilationSession {
    pub(crate) fn intern(&mut self, kind: TypeKind) -> TypeId {
        self.types.intern(kind)
    }

    pub fn type_kind(&self, t: TypeId) -> &TypeKind {
        self.types.kind(t)
    }

    pub(crate) fn normal_type(
        &mut self,
        feature: FeatureId,
        generics: Vec<TypeId>,
        outer: Option<TypeId>,
        mode: RefOrVal,
    ) -> TypeId {
        self.intern(TypeKind::Normal {
            feature,
            generics,
            outer,
            mode,
        })
    }

    fn default_mode(&self, feature: FeatureId) -> RefOrVal {
        if self.feature(feature).is_ref {
            RefOrVal::Ref
        } else {
            RefOrVal::Value
        }
    }

    /// Type of a built-in without generics, ERROR when the prelude is not loaded
    pub(crate) fn builtin_type(&mut self, builtin: Builtin) -> TypeId {
        match self.builtin(builtin) {
            Some(f) => {
                let mode = self.default_mode(f);
                self.normal_type(f, Vec::new(), None, mode)
            }
            None => TypeId::ERROR,
        }
    }

    /// `Function R A...` or `Lazy T` for a lambda
    pub(crate) fn function_type(&mut self, result: TypeId, params: &[TypeId]) -> TypeId {
        let (builtin, generics) = if params.is_empty() && self.builtin(Builtin::Lazy).is_some() {
            (Builtin::Lazy, vec![result])
        } else {
            let mut generics = vec![result];
            generics.extend_from_slice(params);
            (Builtin::Function, generics)
        };
        match self.builtin(builtin) {
            Some(f) => self.normal_type(f, generics, None, RefOrVal::Ref),
            None => TypeId::ERROR,
        }
    }

    /// Result and parameter types of a `Function` or `Lazy` type
    pub(crate) fn function_signature(&self, t: TypeId) -> Option<(TypeId, Vec<TypeId>)> {
        match self.type_kind(t) {
            TypeKind::Normal {
                feature, generics, ..
            } if !generics.is_empty() => {
                if self.is_builtin(*feature, Builtin::Function) {
                    Some((generics[0], generics[1..].to_vec()))
                } else if self.is_builtin(*feature, Builtin::Lazy) {
                    Some((generics[0], Vec::new()))
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    pub(crate) fn parametric_type(&mut self, generic: Generic) -> TypeId {
        self.intern(TypeKind::Parametric {
            generic,
            boxed: false,
        })
    }

    pub(crate) fn this_type(&mut self, feature: FeatureId) -> TypeId {
        self.intern(TypeKind::This(feature))
    }

    /// Outer component of types declared inside `feature`
    pub(crate) fn outer_type_for(&mut self, feature: FeatureId) -> Option<TypeId> {
        if feature == FeatureId::UNIVERSE {
            None
        } else {
            Some(self.this_type(feature))
        }
    }

    /// Type of `Current` inside `feature`: the feature itself with its own
    /// formal generics as actuals
    pub(crate) fn current_type(&mut self, feature: FeatureId) -> TypeId {
        let count = self.feature(feature).generics.len();
        let generics = (0..count)
            .map(|i| self.parametric_type(Generic::new(feature, i)))
            .collect();
        let outer = self.feature(feature).outer.and_then(|o| self.outer_type_for(o));
        let mode = self.default_mode(feature);
        self.normal_type(feature, generics, outer, mode)
    }

    /// Result of calling constructor `feature` with the given actual generics
    pub(crate) fn constructor_type(
        &mut self,
        feature: FeatureId,
        generics: Vec<TypeId>,
        outer: Option<TypeId>,
    ) -> TypeId {
        let mode = self.default_mode(feature);
        self.normal_type(feature, generics, outer, mode)
    }

    /// Feature a type is bound to, if it is bound to one
    pub fn feature_of_type(&self, t: TypeId) -> Option<FeatureId> {
        match self.type_kind(t) {
            TypeKind::Normal { feature, .. } => Some(*feature),
            TypeKind::This(feature) => Some(*feature),
            _ => None,
        }
    }

    pub(crate) fn generics_of_type(&self, t: TypeId) -> Vec<TypeId> {
        match self.type_kind(t) {
            TypeKind::Normal { generics, .. } => generics.clone(),
            _ => Vec::new(),
        }
    }

    pub(crate) fn is_ref_type(&self, t: TypeId) -> bool {
        match self.type_kind(t) {
            TypeKind::Normal { mode, .. } => *mode == RefOrVal::Ref,
            TypeKind::Parametric { boxed, .. } => *boxed,
            TypeKind::This(feature) => self.feature(*feature).is_ref,
            _ => false,
        }
    }

    pub(crate) fn as_ref(&mut self, t: TypeId) -> TypeId {
        match self.type_kind(t).clone() {
            TypeKind::Normal {
                feature,
                generics,
                outer,
                ..
            } => self.normal_type(feature, generics, outer, RefOrVal::Ref),
            TypeKind::Parametric { generic, .. } => self.intern(TypeKind::Parametric {
                generic,
                boxed: true,
            }),
            _ => t,
        }
    }

    pub(crate) fn as_value(&mut self, t: TypeId) -> TypeId {
        match self.type_kind(t).clone() {
            TypeKind::Normal {
                feature,
                generics,
                outer,
                ..
            } => self.normal_type(feature, generics, outer, RefOrVal::Value),
            TypeKind::Parametric { generic, .. } => self.intern(TypeKind::Parametric {
                generic,
                boxed: false,
            }),
            _ => t,
        }
    }

    pub(crate) fn as_this(&mut self, t: TypeId) -> TypeId {
        match self.type_kind(t) {
            TypeKind::Normal { feature, .. } => {
                let feature = *feature;
                self.this_type(feature)
            }
            _ => t,
        }
    }

    pub(crate) fn is_builtin_type(&self, t: TypeId, builtin: Builtin) -> bool {
        matches!(self.type_kind(t), TypeKind::Normal { feature, .. } if self.is_builtin(*feature, builtin))
    }

    pub(crate) fn is_void(&self, t: TypeId) -> bool {
        self.is_builtin_type(t, Builtin::Void)
    }

    pub(crate) fn is_choice_type(&self, t: TypeId) -> bool {
        matches!(self.type_kind(t), TypeKind::Normal { feature, .. } if self.feature(*feature).is_choice())
    }

    /// A type parameter that stands for a list of types
    pub(crate) fn is_open_parametric(&self, t: TypeId) -> bool {
        match self.type_kind(t) {
            TypeKind::Parametric { generic, .. } => self
                .feature(generic.feature)
                .generics
                .is_open_index(generic.index),
            _ => false,
        }
    }

    /// Does `t` mention a formal generic of `feature`?
    pub(crate) fn mentions_generic_of(&self, t: TypeId, feature: FeatureId) -> bool {
        match self.type_kind(t) {
            TypeKind::Parametric { generic, .. } => generic.feature == feature,
            TypeKind::Normal {
                generics, outer, ..
            } => {
                generics.iter().any(|g| self.mentions_generic_of(*g, feature))
                    || outer.is_some_and(|o| self.mentions_generic_of(o, feature))
            }
            _ => false,
        }
    }

    /// Source-like rendering of a type for diagnostics
    pub fn type_name(&self, t: TypeId) -> String {
        match self.type_kind(t) {
            TypeKind::Normal {
                feature,
                generics,
                outer,
                mode,
            } => {
                let f = self.feature(*feature);
                let mut name = String::new();
                match (mode, f.is_ref) {
                    (RefOrVal::Ref, false) => name.push_str("ref "),
                    (RefOrVal::Value, true) => name.push_str("value "),
                    _ => {}
                }
                if let Some(o) = outer {
                    if !matches!(self.type_kind(*o), TypeKind::This(_)) {
                        name.push_str(&self.type_name(*o));
                        name.push('.');
                    }
                }
                name.push_str(f.base_name());
                for g in generics {
                    let inner = self.type_name(*g);
                    if inner.contains(' ') {
                        name.push_str(&format!(" ({inner})"));
                    } else {
                        name.push(' ');
                        name.push_str(&inner);
                    }
                }
                name
            }
            TypeKind::Parametric { generic, .. } => self
                .feature(generic.feature)
                .generics
                .get(generic.index)
                .map_or_else(|| "<generic>".to_string(), |g| g.name.clone()),
            TypeKind::This(feature) => format!("{}.this", self.qualified_name(*feature)),
            TypeKind::Error => "<error>".to_string(),
            TypeKind::Undefined => "<undefined>".to_string(),
            TypeKind::Address => "<address>".to_string(),
        }
    }

    pub(crate) fn type_names(&self, types: &[TypeId]) -> String {
        types
            .iter()
            .map(|t| format!("`{}`", self.type_name(*t)))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
