//! Declarations ("features") and their resolution state.
//!
//! Features live in one arena owned by the [`CompilationSession`] and are
//! addressed by [`FeatureId`]. A feature is created once during declaration
//! collection and then filled in field by field as the scheduler advances
//! its [`State`].
//!
//! [`CompilationSession`]: crate::session::CompilationSession

use crate::context::Context;
use crate::generics::{FormalGenerics, Generic};
use crate::typed_ast::{Expr, TypeRef};
use crate::types::TypeId;
use fz_ast::Span;
use std::collections::BTreeMap;
use std::fmt;

/// Handle of a feature in the session arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeatureId(pub(crate) u32);

impl FeatureId {
    /// The root of the declaration tree
    pub const UNIVERSE: FeatureId = FeatureId(0);
    /// Distinguished callee of calls that failed to resolve
    pub const ERROR: FeatureId = FeatureId(1);

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn is_error(self) -> bool {
        self == Self::ERROR
    }
}

/// Name Key of a feature: base name, argument count and disambiguation id
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeatureName {
    base: String,
    arg_count: usize,
    id: u32,
}

impl FeatureName {
    pub fn new(base: impl Into<String>, arg_count: usize) -> Self {
        Self {
            base: base.into(),
            arg_count,
            id: 0,
        }
    }

    pub fn with_id(mut self, id: u32) -> Self {
        self.id = id;
        self
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn arg_count(&self) -> usize {
        self.arg_count
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn equals_except_id(&self, other: &FeatureName) -> bool {
        self.base == other.base && self.arg_count == other.arg_count
    }

    /// Smallest and largest key with this base name, for range queries
    pub(crate) fn base_range(base: &str) -> (FeatureName, FeatureName) {
        (
            FeatureName::new(base, 0),
            FeatureName::new(base, usize::MAX).with_id(u32::MAX),
        )
    }
}

impl fmt::Display for FeatureName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.arg_count {
            0 => write!(f, "{}", self.base),
            1 => write!(f, "{} (one argument)", self.base),
            n => write!(f, "{} ({n} arguments)", self.base),
        }
    }
}

/// Resolution state. Strictly ordered, a feature only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum State {
    Loaded,
    ResolvingInheritance,
    ResolvedInheritance,
    ResolvingDeclarations,
    ResolvedDeclarations,
    ResolvingTypes,
    ResolvedTypes,
    ResolvingSugar1,
    ResolvedSugar1,
    TypesInferencing,
    TypesInferenced,
    ResolvingSugar2,
    ResolvedSugar2,
    Boxing,
    Boxed,
    CheckingTypes,
    Resolved,
    Error,
}

impl State {
    pub fn at_least(self, other: State) -> bool {
        self >= other
    }

    /// Transient states are only observed while a phase runs
    pub fn is_in_progress(self) -> bool {
        matches!(
            self,
            State::ResolvingInheritance
                | State::ResolvingDeclarations
                | State::ResolvingTypes
                | State::ResolvingSugar1
                | State::TypesInferencing
                | State::ResolvingSugar2
                | State::Boxing
                | State::CheckingTypes
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureKind {
    Routine,
    Field,
    Abstract,
    Intrinsic,
    Choice,
}

/// Where the result type of a feature comes from
#[derive(Debug, Clone, PartialEq)]
pub enum ResultSource {
    /// `f is`: an instance of `f`
    Constructor,
    Declared(TypeRef),
    /// From the body, the initial value or the assignment of a local
    Inferred,
    /// Argument typed by the actual arguments of all calls
    FromCalls,
    /// Argument of a precondition feature mirroring an argument of the guarded feature
    CloneOf(FeatureId),
    /// Known up front (library and synthesized features)
    Fixed,
}

#[derive(Debug)]
pub struct Feature {
    pub name: FeatureName,
    pub outer: Option<FeatureId>,
    pub kind: FeatureKind,
    pub is_ref: bool,
    pub is_argument: bool,
    pub is_local: bool,
    pub generics: FormalGenerics,
    pub args: Vec<FeatureId>,
    /// The last argument is typed by the open type parameter
    pub has_open_arg_list: bool,
    /// Calls of the `inherits` clause, each an [`crate::typed_ast::ExprKind::Call`]
    pub inherits: Vec<Expr>,
    pub parents: Vec<FeatureId>,
    pub parent_types: Option<Vec<TypeId>>,
    pub result: ResultSource,
    pub result_type: Option<TypeId>,
    /// Routine body or field initial value
    pub body: Option<Expr>,
    pub variants: Vec<TypeRef>,
    pub declared: BTreeMap<FeatureName, FeatureId>,
    /// Declared and inherited inner features, available once declarations are resolved
    pub visible: Option<BTreeMap<FeatureName, Vec<FeatureId>>>,
    pub precondition: Option<FeatureId>,
    /// `T : X` tests among the preconditions, in terms of the precondition feature's generics
    pub pre_constraints: Vec<(Generic, TypeRef)>,
    pub clone_of: Option<FeatureId>,
    pub result_field: Option<FeatureId>,
    /// Context of the expression that synthesized this feature
    pub source_context: Option<Context>,
    pub state: State,
    pub span: Span,
}

impl Feature {
    pub(crate) fn new(name: FeatureName, outer: Option<FeatureId>, kind: FeatureKind, span: Span) -> Self {
        Self {
            name,
            outer,
            kind,
            is_ref: false,
            is_argument: false,
            is_local: false,
            generics: FormalGenerics::default(),
            args: Vec::new(),
            has_open_arg_list: false,
            inherits: Vec::new(),
            parents: Vec::new(),
            parent_types: None,
            result: ResultSource::Constructor,
            result_type: None,
            body: None,
            variants: Vec::new(),
            declared: BTreeMap::new(),
            visible: None,
            precondition: None,
            pre_constraints: Vec::new(),
            clone_of: None,
            result_field: None,
            source_context: None,
            state: State::Loaded,
            span,
        }
    }

    pub fn base_name(&self) -> &str {
        self.name.base()
    }

    pub fn arg_count(&self) -> usize {
        self.args.len()
    }

    pub fn is_choice(&self) -> bool {
        self.kind == FeatureKind::Choice
    }

    pub fn is_field(&self) -> bool {
        self.kind == FeatureKind::Field
    }

    pub fn is_constructor(&self) -> bool {
        self.kind == FeatureKind::Routine && self.result == ResultSource::Constructor
    }

    /// Features that can be named as types
    pub fn defines_type(&self) -> bool {
        self.is_constructor() || self.is_choice()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_state_order() {
        assert!(State::ResolvedTypes.at_least(State::ResolvedDeclarations));
        assert!(!State::ResolvedInheritance.at_least(State::ResolvedDeclarations));
        assert!(State::Error.at_least(State::Resolved));
        assert!(State::Boxing.is_in_progress());
        assert!(!State::Boxed.is_in_progress());
    }

    #[test]
    fn test_feature_name_key() {
        let a = FeatureName::new("f", 2);
        let b = FeatureName::new("f", 2).with_id(3);
        assert!(a.equals_except_id(&b));
        assert_ne!(a, b);
        assert_eq!(a.to_string(), "f (2 arguments)");
        assert_eq!(FeatureName::new("x", 0).to_string(), "x");

        let (lo, hi) = FeatureName::base_range("f");
        assert!(lo <= a && a <= hi);
        assert!(!(lo <= FeatureName::new("g", 0) && FeatureName::new("g", 0) <= hi));
    }
}
