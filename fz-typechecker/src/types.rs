//! Resolved types and the interning table.
//!
//! Every resolved type is interned: two types built from the same
//! `(feature, generics, outer, mode)` tuple share one [`TypeId`], so type
//! equality is a comparison of ids. Unresolved types are kept as
//! [`fz_ast::UnresolvedType`] at their use sites until they are resolved.

use crate::features::FeatureId;
use crate::generics::Generic;
use indexmap::IndexSet;

/// Handle of an interned type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(u32);

impl TypeId {
    /// Result of anything that failed to resolve; assignable both ways so
    /// that one root cause produces one diagnostic
    pub const ERROR: TypeId = TypeId(0);
    /// No common type exists
    pub const UNDEFINED: TypeId = TypeId(1);
    /// Raw address of a value, used for outer references
    pub const ADDRESS: TypeId = TypeId(2);

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn is_error(self) -> bool {
        self == Self::ERROR
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefOrVal {
    Value,
    Ref,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// Bound to a declaration
    Normal {
        feature: FeatureId,
        generics: Vec<TypeId>,
        outer: Option<TypeId>,
        mode: RefOrVal,
    },
    /// Bound to a formal type parameter
    Parametric { generic: Generic, boxed: bool },
    /// The current instance of an enclosing feature
    This(FeatureId),
    Error,
    Undefined,
    Address,
}

/// Session-wide interning table. The index in the set is the [`TypeId`].
#[derive(Debug)]
pub struct TypeInterner {
    types: IndexSet<TypeKind>,
    limit: usize,
    exhausted: bool,
}

impl TypeInterner {
    pub fn new(limit: usize) -> Self {
        let mut types = IndexSet::new();
        types.insert(TypeKind::Error);
        types.insert(TypeKind::Undefined);
        types.insert(TypeKind::Address);
        Self {
            types,
            limit: limit.max(3),
            exhausted: false,
        }
    }

    /// Canonical id for `kind`.
    ///
    /// When the identifier space is used up this returns
    /// [`TypeId::ERROR`] and marks the interner exhausted; the driver turns
    /// that into a fatal error.
    pub fn intern(&mut self, kind: TypeKind) -> TypeId {
        if let Some(index) = self.types.get_index_of(&kind) {
            return TypeId(index as u32);
        }
        if self.types.len() >= self.limit || self.types.len() >= u32::MAX as usize {
            self.exhausted = true;
            return TypeId::ERROR;
        }
        let (index, _) = self.types.insert_full(kind);
        TypeId(index as u32)
    }

    pub fn kind(&self, id: TypeId) -> &TypeKind {
        self.types.get_index(id.index()).unwrap_or(&TypeKind::Error)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}

/// Outcome of a least-upper-bound computation.
///
/// Keeps "cannot tell yet" apart from "there is no common type".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeOutcome {
    /// Some input is not yet resolved, marked as [`TypeId::UNDEFINED`]
    Pending,
    /// Everything is known and the types have no common type
    Incompatible,
    Known(TypeId),
}

impl TypeOutcome {
    /// Collapses into a type, [`TypeId::UNDEFINED`] for incompatible inputs
    pub fn into_type(self) -> Option<TypeId> {
        match self {
            TypeOutcome::Pending => None,
            TypeOutcome::Incompatible => Some(TypeId::UNDEFINED),
            TypeOutcome::Known(t) => Some(t),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn normal(feature: u32, generics: Vec<TypeId>) -> TypeKind {
        TypeKind::Normal {
            feature: FeatureId(feature),
            generics,
            outer: None,
            mode: RefOrVal::Value,
        }
    }

    #[test]
    fn test_reserved_ids() {
        let interner = TypeInterner::new(100);
        assert_eq!(interner.kind(TypeId::ERROR), &TypeKind::Error);
        assert_eq!(interner.kind(TypeId::UNDEFINED), &TypeKind::Undefined);
        assert_eq!(interner.kind(TypeId::ADDRESS), &TypeKind::Address);
        assert_eq!(interner.len(), 3);
    }

    #[test]
    fn test_structural_equality_is_identity() {
        let mut interner = TypeInterner::new(100);
        let a = interner.intern(normal(5, vec![]));
        let b = interner.intern(normal(5, vec![]));
        let c = interner.intern(normal(5, vec![a]));
        let d = interner.intern(normal(5, vec![b]));

        assert_eq!(a, b);
        assert_eq!(c, d);
        assert_ne!(a, c);
        assert_eq!(interner.len(), 5);
    }

    #[test]
    fn test_exhaustion_is_reported() {
        let mut interner = TypeInterner::new(4);
        let a = interner.intern(normal(5, vec![]));
        assert!(!interner.is_exhausted());
        let b = interner.intern(normal(6, vec![]));

        assert_ne!(a, TypeId::ERROR);
        assert_eq!(b, TypeId::ERROR);
        assert!(interner.is_exhausted());
    }

    #[test]
    fn test_outcome_into_type() {
        assert_eq!(TypeOutcome::Pending.into_type(), None);
        assert_eq!(TypeOutcome::Incompatible.into_type(), Some(TypeId::UNDEFINED));
        assert_eq!(TypeOutcome::Known(TypeId::ADDRESS).into_type(), Some(TypeId::ADDRESS));
    }
}
