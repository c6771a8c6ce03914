//! Formal generic parameter lists and open generics.
//!
//! The last formal type parameter of a feature may be *open*: it matches zero
//! or more actual type arguments. Wherever such a parameter is substituted,
//! the actual list is split so that the open parameter consumes the tail.

use crate::features::FeatureId;
use crate::typed_ast::TypeRef;
use crate::types::TypeId;
use fz_ast::Span;

/// Reference to one formal type parameter of a feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Generic {
    pub feature: FeatureId,
    pub index: usize,
}

impl Generic {
    pub fn new(feature: FeatureId, index: usize) -> Self {
        Self { feature, index }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenericDecl {
    pub name: String,
    /// Declared constraint, `Any` when absent
    pub constraint: Option<TypeRef>,
    pub open: bool,
    pub span: Span,
}

/// The formal type parameters of one feature
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormalGenerics {
    list: Vec<GenericDecl>,
}

impl FormalGenerics {
    pub fn new(list: Vec<GenericDecl>) -> Self {
        Self { list }
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn is_open(&self) -> bool {
        self.list.last().is_some_and(|g| g.open)
    }

    pub fn get(&self, index: usize) -> Option<&GenericDecl> {
        self.list.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut GenericDecl> {
        self.list.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &GenericDecl> {
        self.list.iter()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.list.iter().position(|g| g.name == name)
    }

    pub fn is_open_index(&self, index: usize) -> bool {
        self.is_open() && index + 1 == self.list.len()
    }

    /// Does a list of `count` actual generics fit these formals?
    pub fn size_matches(&self, count: usize) -> bool {
        if self.is_open() {
            count + 1 >= self.list.len()
        } else {
            count == self.list.len()
        }
    }

    /// Human readable arity for diagnostics
    pub fn size_text(&self) -> String {
        let n = self.list.len();
        if self.is_open() {
            match n {
                1 => "any number of generic arguments".to_string(),
                2 => "at least one generic argument".to_string(),
                _ => format!("at least {} generic arguments", n - 1),
            }
        } else {
            match n {
                0 => "no generic arguments".to_string(),
                1 => "one generic argument".to_string(),
                _ => format!("{n} generic arguments"),
            }
        }
    }

    /// The actual generic substituted for the formal at `index`.
    ///
    /// Returns `None` for an open parameter, whose actuals are a list; use
    /// [`FormalGenerics::replace_open`] for that case.
    pub fn replace(&self, index: usize, actuals: &[TypeId]) -> Option<TypeId> {
        if self.is_open_index(index) {
            return None;
        }
        Some(actuals.get(index).copied().unwrap_or(TypeId::ERROR))
    }

    /// The tail of `actuals` consumed by the open parameter, `[ERROR]` when
    /// the actual list does not fit.
    pub fn replace_open(&self, actuals: &[TypeId]) -> Vec<TypeId> {
        if !self.is_open() || !self.size_matches(actuals.len()) {
            return vec![TypeId::ERROR];
        }
        actuals[self.list.len() - 1..].to_vec()
    }

    /// Actuals for every formal, expanding the open one in place
    pub fn replace_all(&self, index: usize, actuals: &[TypeId]) -> Vec<TypeId> {
        if self.is_open_index(index) {
            self.replace_open(actuals)
        } else {
            vec![actuals.get(index).copied().unwrap_or(TypeId::ERROR)]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn formals(names: &[&str], open: bool) -> FormalGenerics {
        let n = names.len();
        FormalGenerics::new(
            names
                .iter()
                .enumerate()
                .map(|(i, name)| GenericDecl {
                    name: name.to_string(),
                    constraint: None,
                    open: open && i + 1 == n,
                    span: Span::default(),
                })
                .collect(),
        )
    }

    #[test]
    fn test_size_matches_closed() {
        let g = formals(&["A", "B"], false);
        assert!(g.size_matches(2));
        assert!(!g.size_matches(1));
        assert!(!g.size_matches(3));
    }

    #[test]
    fn test_size_matches_open() {
        let g = formals(&["R", "A"], true);
        assert!(g.size_matches(1));
        assert!(g.size_matches(2));
        assert!(g.size_matches(5));
        assert!(!g.size_matches(0));
    }

    #[test]
    fn test_size_text() {
        assert_eq!(formals(&[], false).size_text(), "no generic arguments");
        assert_eq!(formals(&["T"], false).size_text(), "one generic argument");
        assert_eq!(formals(&["A", "B", "C"], false).size_text(), "3 generic arguments");
        assert_eq!(formals(&["X"], true).size_text(), "any number of generic arguments");
        assert_eq!(formals(&["R", "A"], true).size_text(), "at least one generic argument");
        assert_eq!(formals(&["R", "S", "A"], true).size_text(), "at least 2 generic arguments");
    }

    #[test]
    fn test_replace_open_consumes_tail() {
        let g = formals(&["R", "A"], true);
        let a = TypeId::ADDRESS;
        let u = TypeId::UNDEFINED;

        assert_eq!(g.replace_open(&[u]), Vec::<TypeId>::new());
        assert_eq!(g.replace_open(&[u, a, a]), vec![a, a]);
        assert_eq!(g.replace_open(&[]), vec![TypeId::ERROR]);
        assert_eq!(g.replace(0, &[u, a]), Some(u));
        assert_eq!(g.replace(1, &[u, a]), None);
        assert_eq!(g.replace_all(1, &[u, a, a]), vec![a, a]);
    }

    #[test]
    fn test_replace_out_of_range_is_error() {
        let g = formals(&["A", "B"], false);
        assert_eq!(g.replace(1, &[TypeId::ADDRESS]), Some(TypeId::ERROR));
    }
}
