//! The tree that resolution works on.
//!
//! Parsed expressions are converted into this closed set of node kinds during
//! declaration collection. Resolution phases then mutate nodes in place:
//! types get filled in, calls advance through [`CallState`], and sugar and
//! boxing replace nodes by rewritten ones.

use crate::features::FeatureId;
use crate::generics::Generic;
use crate::types::TypeId;
use fz_ast::{Span, UnresolvedType};

/// A type as written at one use site, with its resolution once known
#[derive(Debug, Clone, PartialEq)]
pub struct TypeRef {
    pub source: UnresolvedType,
    pub resolved: Option<TypeId>,
}

impl TypeRef {
    pub fn new(source: UnresolvedType) -> Self {
        Self {
            source,
            resolved: None,
        }
    }

    pub fn span(&self) -> Span {
        self.source.span
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Call(Box<Call>),
    Const(Constant),
    If(Box<If>),
    Match(Box<Match>),
    Block(Block),
    Assign(Box<Assign>),
    Current(Current),
    TypeTest(Box<TypeTest>),
    Lambda(Lambda),
    Section(Section),
    Box(Box<Boxed>),
    Tag(Box<Tag>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Unresolved,
    TargetTyped,
    CalleeKnown,
    ArgumentsResolved,
    TypeKnown,
    Error,
}

impl CallState {
    pub fn is_final(self) -> bool {
        matches!(self, CallState::TypeKnown | CallState::Error)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallFlags {
    /// Part of an `inherits` clause
    pub inheritance: bool,
    /// Right-hand side produced by a chained comparison rewrite
    pub chained_rhs: bool,
    /// Inserted to call a `Lazy`/`Function` value; never unwrapped again
    pub unwrapped: bool,
    /// Actual argument types were recorded for the callee's untyped arguments
    pub contributed: bool,
    /// The target is `void`, so the call is never executed
    pub unreachable: bool,
    /// `generics` holds the explicit or inferred actual generics
    pub generics_known: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub name: String,
    pub target: Option<Expr>,
    /// `None` when no generics syntax was used
    pub explicit_generics: Option<Vec<TypeRef>>,
    pub actuals: Vec<Expr>,
    pub parenthesized: bool,
    pub select: Option<usize>,
    /// Local field bound lexically during collection
    pub local: Option<FeatureId>,
    pub state: CallState,
    pub callee: Option<FeatureId>,
    /// Actual generics, explicit or inferred
    pub generics: Vec<TypeId>,
    /// Formal argument types; longer than the declared argument list when an
    /// open generic argument expanded
    pub formal_types: Option<Vec<TypeId>>,
    pub ty: Option<TypeId>,
    pub flags: CallFlags,
    pub span: Span,
}

impl Call {
    pub fn new(name: impl Into<String>, target: Option<Expr>, actuals: Vec<Expr>, span: Span) -> Self {
        Self {
            name: name.into(),
            target,
            explicit_generics: None,
            actuals,
            parenthesized: false,
            select: None,
            local: None,
            state: CallState::Unresolved,
            callee: None,
            generics: Vec::new(),
            formal_types: None,
            ty: None,
            flags: CallFlags::default(),
            span,
        }
    }

    pub fn into_expr(self) -> Expr {
        let span = self.span;
        Expr {
            kind: ExprKind::Call(Box::new(self)),
            span,
        }
    }

    pub(crate) fn fail(&mut self) -> Option<TypeId> {
        self.state = CallState::Error;
        self.callee = Some(FeatureId::ERROR);
        self.ty = Some(TypeId::ERROR);
        self.ty
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    Int(String),
    Float(String),
    Bool(bool),
    Str(String),
    Unit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Constant {
    pub value: ConstValue,
    pub ty: Option<TypeId>,
}

impl Constant {
    pub fn is_numeric_literal(&self) -> bool {
        matches!(self.value, ConstValue::Int(_) | ConstValue::Float(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct If {
    pub cond: Expr,
    pub then_branch: Expr,
    /// Block or chained conditional; `None` means an implicit unit branch
    pub else_branch: Option<Expr>,
    pub ty: Option<TypeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub subject: Expr,
    pub cases: Vec<Case>,
    pub ty: Option<TypeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Case {
    pub pattern: Pattern,
    pub body: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    Types {
        binding: Option<FeatureId>,
        types: Vec<TypeRef>,
    },
    Wildcard,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub exprs: Vec<Expr>,
    pub ty: Option<TypeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assign {
    pub field: FeatureId,
    pub value: Expr,
    /// Always `unit` once resolved
    pub ty: Option<TypeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Current {
    pub feature: FeatureId,
    pub ty: Option<TypeId>,
}

/// `T : X`, true when the actual type of `T` is assignable to `X`
#[derive(Debug, Clone, PartialEq)]
pub struct TypeTest {
    pub param: TypeRef,
    pub constraint: TypeRef,
    pub generic: Option<Generic>,
    pub ty: Option<TypeId>,
}

/// A function value implemented by a synthesized feature
#[derive(Debug, Clone, PartialEq)]
pub struct Lambda {
    pub feature: FeatureId,
    pub ty: Option<TypeId>,
}

/// An operator used as a function value, `(+)`
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub op: String,
}

/// A value converted to its reference representation
#[derive(Debug, Clone, PartialEq)]
pub struct Boxed {
    pub value: Expr,
    pub ty: TypeId,
}

/// A value wrapped into a choice type as variant `tag`
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub value: Expr,
    pub ty: TypeId,
    pub tag: usize,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn constant(value: ConstValue, ty: Option<TypeId>, span: Span) -> Self {
        Self::new(ExprKind::Const(Constant { value, ty }), span)
    }

    pub fn block(exprs: Vec<Expr>, span: Span) -> Self {
        Self::new(ExprKind::Block(Block { exprs, ty: None }), span)
    }

    /// Static type, `None` while not yet known
    pub fn ty(&self) -> Option<TypeId> {
        match &self.kind {
            ExprKind::Call(c) => c.ty,
            ExprKind::Const(c) => c.ty,
            ExprKind::If(i) => i.ty,
            ExprKind::Match(m) => m.ty,
            ExprKind::Block(b) => b.ty,
            ExprKind::Assign(a) => a.ty,
            ExprKind::Current(c) => c.ty,
            ExprKind::TypeTest(t) => t.ty,
            ExprKind::Lambda(l) => l.ty,
            ExprKind::Section(_) => None,
            ExprKind::Box(b) => Some(b.ty),
            ExprKind::Tag(t) => Some(t.ty),
        }
    }

    pub fn as_call(&self) -> Option<&Call> {
        match &self.kind {
            ExprKind::Call(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_call_mut(&mut self) -> Option<&mut Call> {
        match &mut self.kind {
            ExprKind::Call(c) => Some(c),
            _ => None,
        }
    }

    /// Moves the node out, leaving a unit constant behind
    pub fn take(&mut self) -> Expr {
        let span = self.span;
        std::mem::replace(self, Expr::constant(ConstValue::Unit, None, span))
    }

    pub fn for_each_child(&self, f: &mut dyn FnMut(&Expr)) {
        match &self.kind {
            ExprKind::Call(c) => {
                if let Some(t) = &c.target {
                    f(t);
                }
                c.actuals.iter().for_each(|a| f(a));
            }
            ExprKind::If(i) => {
                f(&i.cond);
                f(&i.then_branch);
                if let Some(e) = &i.else_branch {
                    f(e);
                }
            }
            ExprKind::Match(m) => {
                f(&m.subject);
                m.cases.iter().for_each(|c| f(&c.body));
            }
            ExprKind::Block(b) => b.exprs.iter().for_each(|e| f(e)),
            ExprKind::Assign(a) => f(&a.value),
            ExprKind::Box(b) => f(&b.value),
            ExprKind::Tag(t) => f(&t.value),
            ExprKind::Const(_)
            | ExprKind::Current(_)
            | ExprKind::TypeTest(_)
            | ExprKind::Lambda(_)
            | ExprKind::Section(_) => {}
        }
    }

    pub fn for_each_child_mut(&mut self, f: &mut dyn FnMut(&mut Expr)) {
        match &mut self.kind {
            ExprKind::Call(c) => {
                if let Some(t) = &mut c.target {
                    f(t);
                }
                c.actuals.iter_mut().for_each(|a| f(a));
            }
            ExprKind::If(i) => {
                f(&mut i.cond);
                f(&mut i.then_branch);
                if let Some(e) = &mut i.else_branch {
                    f(e);
                }
            }
            ExprKind::Match(m) => {
                f(&mut m.subject);
                m.cases.iter_mut().for_each(|c| f(&mut c.body));
            }
            ExprKind::Block(b) => b.exprs.iter_mut().for_each(|e| f(e)),
            ExprKind::Assign(a) => f(&mut a.value),
            ExprKind::Box(b) => f(&mut b.value),
            ExprKind::Tag(t) => f(&mut t.value),
            ExprKind::Const(_)
            | ExprKind::Current(_)
            | ExprKind::TypeTest(_)
            | ExprKind::Lambda(_)
            | ExprKind::Section(_) => {}
        }
    }

    /// Pre-order traversal over this node and all of its descendants
    pub fn walk(&self, f: &mut dyn FnMut(&Expr)) {
        f(self);
        self.for_each_child(&mut |child| child.walk(f));
    }

    /// Post-order traversal; `f` may replace the node it is given
    pub fn walk_post_mut(&mut self, f: &mut dyn FnMut(&mut Expr)) {
        self.for_each_child_mut(&mut |child| child.walk_post_mut(f));
        f(self);
    }

    /// Applies `f` to every expression whose value is the value of this one:
    /// the last expression of blocks and every branch of conditionals.
    /// Returns `false` if some conditional lacks an else branch.
    pub fn for_each_leaf_mut(&mut self, f: &mut dyn FnMut(&mut Expr)) -> bool {
        match &mut self.kind {
            ExprKind::Block(b) if !b.exprs.is_empty() => {
                let last = b.exprs.len() - 1;
                b.exprs[last].for_each_leaf_mut(f)
            }
            ExprKind::If(i) => {
                let complete = i.then_branch.for_each_leaf_mut(f);
                match &mut i.else_branch {
                    Some(e) => e.for_each_leaf_mut(f) && complete,
                    None => false,
                }
            }
            ExprKind::Match(m) => {
                let mut complete = true;
                for case in &mut m.cases {
                    complete &= case.body.for_each_leaf_mut(f);
                }
                complete
            }
            _ => {
                f(self);
                true
            }
        }
    }

    pub fn is_conditional(&self) -> bool {
        matches!(self.kind, ExprKind::If(_) | ExprKind::Match(_))
    }
}
