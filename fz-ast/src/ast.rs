// Fz AST Definitions
// Parsed declarations and expressions carrying provisional, unresolved names and types

use miette::SourceSpan;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Source position information for AST nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub start_line_col: Option<(usize, usize)>,
    pub end_line_col: Option<(usize, usize)>,
}

static NEXT_SYNTHETIC_OFFSET: AtomicUsize = AtomicUsize::new(1);

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            start_line_col: None,
            end_line_col: None,
        }
    }

    pub fn with_line_col(
        start: usize,
        end: usize,
        start_line_col: (usize, usize),
        end_line_col: (usize, usize),
    ) -> Self {
        Self {
            start,
            end,
            start_line_col: Some(start_line_col),
            end_line_col: Some(end_line_col),
        }
    }

    /// A fresh span for trees built without source text.
    ///
    /// Offsets grow monotonically, so nodes built later sort after nodes
    /// built earlier, which keeps diagnostics in construction order.
    pub fn synthetic() -> Self {
        let start = NEXT_SYNTHETIC_OFFSET.fetch_add(8, Ordering::Relaxed);
        Self::new(start, start + 4)
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Smallest span covering both `self` and `other`
    pub fn merge(&self, other: &Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }
}

impl From<Span> for SourceSpan {
    fn from(span: Span) -> Self {
        SourceSpan::new(span.start.into(), span.len())
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.start_line_col {
            Some((line, col)) => write!(f, "{line}:{col}"),
            None => write!(f, "@{}", self.start),
        }
    }
}

/// A compilation unit: the declarations found at universe level
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub features: Vec<FeatureDecl>,
    pub source_file: Option<String>,
    pub span: Span,
}

impl Program {
    pub fn new(features: Vec<FeatureDecl>) -> Self {
        let span = features
            .iter()
            .map(|f| f.span)
            .reduce(|a, b| a.merge(&b))
            .unwrap_or_default();
        Self {
            features,
            source_file: None,
            span,
        }
    }
}

/// Explicit reference/value/this qualifier written on a type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeMode {
    Value,
    Ref,
    This,
}

/// A type exactly as written in source: `option (list i32)`, `a.b`, `X...`
#[derive(Debug, Clone, PartialEq)]
pub struct UnresolvedType {
    pub name: String,
    pub generics: Vec<UnresolvedType>,
    pub outer: Option<Box<UnresolvedType>>,
    pub mode: Option<TypeMode>,
    /// Written with trailing dots, i.e. an open generic used as a list
    pub open: bool,
    pub span: Span,
}

impl fmt::Display for UnresolvedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mode {
            Some(TypeMode::Ref) => write!(f, "ref ")?,
            Some(TypeMode::Value) => write!(f, "value ")?,
            _ => {}
        }
        if let Some(outer) = &self.outer {
            write!(f, "{outer}.")?;
        }
        write!(f, "{}", self.name)?;
        for generic in &self.generics {
            if generic.generics.is_empty() {
                write!(f, " {generic}")?;
            } else {
                write!(f, " ({generic})")?;
            }
        }
        if self.mode == Some(TypeMode::This) {
            write!(f, ".this")?;
        }
        if self.open {
            write!(f, "...")?;
        }
        Ok(())
    }
}

/// Formal type parameter `T type`, `T type : constraint` or `X type...`
#[derive(Debug, Clone, PartialEq)]
pub struct TypeParamDecl {
    pub name: String,
    pub constraint: Option<UnresolvedType>,
    pub open: bool,
    pub span: Span,
}

/// Formal value argument. `ty: None` means the type is inferred from the calls.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgDecl {
    pub name: String,
    pub ty: Option<UnresolvedType>,
    pub span: Span,
}

/// How a declaration states its result
#[derive(Debug, Clone, PartialEq)]
pub enum ResultDecl {
    /// `f is ...`: the result is an instance of the feature itself
    Constructor,
    /// `f T => ...` or `x T := ...`
    Declared(UnresolvedType),
    /// `f => ...` or `x := ...`
    Inferred,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeatureKind {
    Routine(Block),
    Field(Option<Box<Expr>>),
    Abstract,
    Intrinsic,
    Choice(Vec<UnresolvedType>),
}

/// A declaration ("feature") with its nested inner declarations
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureDecl {
    pub name: String,
    pub kind: FeatureKind,
    pub is_ref: bool,
    pub type_params: Vec<TypeParamDecl>,
    pub args: Vec<ArgDecl>,
    pub result: ResultDecl,
    pub inherits: Vec<CallExpr>,
    pub preconditions: Vec<Expr>,
    pub inner: Vec<FeatureDecl>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Call(CallExpr),
    Int(String),
    Float(String),
    Bool(bool),
    Str(String),
    If(IfExpr),
    Match(MatchExpr),
    Block(Block),
    Let(LetExpr),
    /// The current instance, `this`
    Current,
    /// Runtime type test `T : X` on a type parameter
    TypeTest(TypeTestExpr),
    /// Operator without operands, `(+)`
    OperatorSection(String),
}

/// `target.name generics (actuals).select`
#[derive(Debug, Clone, PartialEq)]
pub struct CallExpr {
    pub target: Option<Box<Expr>>,
    pub name: String,
    /// `None` when no generics syntax was used at all
    pub generics: Option<Vec<UnresolvedType>>,
    pub actuals: Vec<Expr>,
    pub parenthesized: bool,
    pub select: Option<usize>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfExpr {
    pub cond: Box<Expr>,
    pub then_branch: Block,
    /// Either a block or a chained `if`
    pub else_branch: Option<Box<Expr>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchExpr {
    pub subject: Box<Expr>,
    pub cases: Vec<MatchCase>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchCase {
    pub pattern: CasePattern,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CasePattern {
    Types {
        binding: Option<String>,
        types: Vec<UnresolvedType>,
    },
    Wildcard,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub exprs: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LetExpr {
    pub name: String,
    pub ty: Option<UnresolvedType>,
    pub value: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeTestExpr {
    pub param: UnresolvedType,
    pub constraint: UnresolvedType,
}

/// Operator names as they appear in declarations and calls
pub mod operators {
    pub const INFIX: &str = "infix ";
    pub const PREFIX: &str = "prefix ";
    pub const POSTFIX: &str = "postfix ";

    /// Operators taking part in chained comparisons `a < b <= c`
    pub const RELATIONAL: [&str; 6] = ["<", ">", "<=", ">=", "=", "!="];

    pub fn infix(op: &str) -> String {
        format!("{INFIX}{op}")
    }

    pub fn prefix(op: &str) -> String {
        format!("{PREFIX}{op}")
    }

    pub fn postfix(op: &str) -> String {
        format!("{POSTFIX}{op}")
    }

    /// The bare operator of an `infix`/`prefix`/`postfix` name
    pub fn operator_of(name: &str) -> Option<&str> {
        name.strip_prefix(INFIX)
            .or_else(|| name.strip_prefix(PREFIX))
            .or_else(|| name.strip_prefix(POSTFIX))
    }

    pub fn is_relational_infix(name: &str) -> bool {
        name.strip_prefix(INFIX)
            .is_some_and(|op| RELATIONAL.contains(&op))
    }
}
