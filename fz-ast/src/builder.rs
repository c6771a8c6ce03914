//! Programmatic construction of parsed trees.
//!
//! Front ends without a textual parser (tests, embedders generating code)
//! build declarations with these helpers. Every node receives a synthetic
//! span so diagnostics still have positions to point at.

use crate::ast::*;

// Types

pub fn ty(name: &str) -> UnresolvedType {
    UnresolvedType {
        name: name.to_string(),
        generics: Vec::new(),
        outer: None,
        mode: None,
        open: false,
        span: Span::synthetic(),
    }
}

pub fn ty_of(name: &str, generics: Vec<UnresolvedType>) -> UnresolvedType {
    UnresolvedType {
        generics,
        ..ty(name)
    }
}

impl UnresolvedType {
    pub fn inner(self, name: &str) -> UnresolvedType {
        UnresolvedType {
            outer: Some(Box::new(self)),
            ..ty(name)
        }
    }

    pub fn reference(mut self) -> Self {
        self.mode = Some(TypeMode::Ref);
        self
    }

    pub fn value(mut self) -> Self {
        self.mode = Some(TypeMode::Value);
        self
    }

    pub fn this(mut self) -> Self {
        self.mode = Some(TypeMode::This);
        self
    }

    pub fn dots(mut self) -> Self {
        self.open = true;
        self
    }
}

// Declarations

pub struct FeatureBuilder {
    decl: FeatureDecl,
}

pub fn feature(name: &str) -> FeatureBuilder {
    FeatureBuilder {
        decl: FeatureDecl {
            name: name.to_string(),
            kind: FeatureKind::Routine(block(Vec::new())),
            is_ref: false,
            type_params: Vec::new(),
            args: Vec::new(),
            result: ResultDecl::Constructor,
            inherits: Vec::new(),
            preconditions: Vec::new(),
            inner: Vec::new(),
            span: Span::synthetic(),
        },
    }
}

/// `name T := value` / `name := value` at declaration level
pub fn field(name: &str, ty: Option<UnresolvedType>, value: Option<Expr>) -> FeatureDecl {
    let result = match ty {
        Some(t) => ResultDecl::Declared(t),
        None => ResultDecl::Inferred,
    };
    FeatureDecl {
        kind: FeatureKind::Field(value.map(Box::new)),
        result,
        ..feature(name).build()
    }
}

impl FeatureBuilder {
    pub fn type_param(mut self, name: &str) -> Self {
        self.decl.type_params.push(TypeParamDecl {
            name: name.to_string(),
            constraint: None,
            open: false,
            span: Span::synthetic(),
        });
        self
    }

    pub fn constrained_type_param(mut self, name: &str, constraint: UnresolvedType) -> Self {
        self.decl.type_params.push(TypeParamDecl {
            name: name.to_string(),
            constraint: Some(constraint),
            open: false,
            span: Span::synthetic(),
        });
        self
    }

    pub fn open_type_param(mut self, name: &str) -> Self {
        self.decl.type_params.push(TypeParamDecl {
            name: name.to_string(),
            constraint: None,
            open: true,
            span: Span::synthetic(),
        });
        self
    }

    pub fn arg(mut self, name: &str, ty: UnresolvedType) -> Self {
        self.decl.args.push(ArgDecl {
            name: name.to_string(),
            ty: Some(ty),
            span: Span::synthetic(),
        });
        self
    }

    /// Argument whose type is inferred from the actual arguments of calls
    pub fn untyped_arg(mut self, name: &str) -> Self {
        self.decl.args.push(ArgDecl {
            name: name.to_string(),
            ty: None,
            span: Span::synthetic(),
        });
        self
    }

    pub fn returns(mut self, ty: UnresolvedType) -> Self {
        self.decl.result = ResultDecl::Declared(ty);
        self
    }

    pub fn inferred(mut self) -> Self {
        self.decl.result = ResultDecl::Inferred;
        self
    }

    pub fn body(mut self, exprs: Vec<Expr>) -> Self {
        self.decl.kind = FeatureKind::Routine(block(exprs));
        self
    }

    /// Shorthand for `f => expr`
    pub fn is(self, expr: Expr) -> Self {
        self.inferred().body(vec![expr])
    }

    pub fn abstract_(mut self) -> Self {
        self.decl.kind = FeatureKind::Abstract;
        self
    }

    pub fn intrinsic(mut self) -> Self {
        self.decl.kind = FeatureKind::Intrinsic;
        self
    }

    pub fn choice(mut self, variants: Vec<UnresolvedType>) -> Self {
        self.decl.kind = FeatureKind::Choice(variants);
        self
    }

    pub fn is_ref(mut self) -> Self {
        self.decl.is_ref = true;
        self
    }

    pub fn inherits(mut self, parent: CallExpr) -> Self {
        self.decl.inherits.push(parent);
        self
    }

    pub fn pre(mut self, condition: Expr) -> Self {
        self.decl.preconditions.push(condition);
        self
    }

    pub fn inner(mut self, decl: FeatureDecl) -> Self {
        self.decl.inner.push(decl);
        self
    }

    pub fn build(self) -> FeatureDecl {
        self.decl
    }
}

// Expressions

fn expr(kind: ExprKind) -> Expr {
    Expr {
        kind,
        span: Span::synthetic(),
    }
}

pub fn int(text: &str) -> Expr {
    expr(ExprKind::Int(text.to_string()))
}

pub fn float(text: &str) -> Expr {
    expr(ExprKind::Float(text.to_string()))
}

pub fn boolean(value: bool) -> Expr {
    expr(ExprKind::Bool(value))
}

pub fn string(value: &str) -> Expr {
    expr(ExprKind::Str(value.to_string()))
}

pub fn current() -> Expr {
    expr(ExprKind::Current)
}

fn call_form(target: Option<Expr>, name: &str, actuals: Vec<Expr>) -> CallExpr {
    CallExpr {
        target: target.map(Box::new),
        name: name.to_string(),
        generics: None,
        parenthesized: !actuals.is_empty(),
        actuals,
        select: None,
        span: Span::synthetic(),
    }
}

fn call_expr(target: Option<Expr>, name: &str, actuals: Vec<Expr>) -> Expr {
    let call = call_form(target, name, actuals);
    Expr {
        span: call.span,
        kind: ExprKind::Call(call),
    }
}

/// Parent call of an `inherits` clause
pub fn parent(name: &str, actuals: Vec<Expr>) -> CallExpr {
    call_form(None, name, actuals)
}

/// `name`, a call without target or arguments
pub fn name(name: &str) -> Expr {
    call_expr(None, name, Vec::new())
}

pub fn call(name: &str, actuals: Vec<Expr>) -> Expr {
    call_expr(None, name, actuals)
}

pub fn call_on(target: Expr, name: &str, actuals: Vec<Expr>) -> Expr {
    call_expr(Some(target), name, actuals)
}

pub fn infix(left: Expr, op: &str, right: Expr) -> Expr {
    call_on(left, &operators::infix(op), vec![right])
}

pub fn prefix(op: &str, operand: Expr) -> Expr {
    call_on(operand, &operators::prefix(op), Vec::new())
}

pub fn postfix(operand: Expr, op: &str) -> Expr {
    call_on(operand, &operators::postfix(op), Vec::new())
}

pub fn section(op: &str) -> Expr {
    expr(ExprKind::OperatorSection(op.to_string()))
}

impl Expr {
    /// Adds explicit actual generics to a call
    pub fn with_generics(mut self, generics: Vec<UnresolvedType>) -> Self {
        if let ExprKind::Call(call) = &mut self.kind {
            call.generics = Some(generics);
        }
        self
    }

    /// Marks a call as written with parentheses, `f()`
    pub fn parenthesized(mut self) -> Self {
        if let ExprKind::Call(call) = &mut self.kind {
            call.parenthesized = true;
        }
        self
    }

    /// Selects one element of an open generic result, `t.v.1`
    pub fn select(mut self, index: usize) -> Self {
        if let ExprKind::Call(call) = &mut self.kind {
            call.select = Some(index);
        }
        self
    }
}

pub fn block(exprs: Vec<Expr>) -> Block {
    Block {
        exprs,
        span: Span::synthetic(),
    }
}

pub fn block_expr(exprs: Vec<Expr>) -> Expr {
    expr(ExprKind::Block(block(exprs)))
}

pub fn if_then(cond: Expr, then_branch: Vec<Expr>) -> Expr {
    expr(ExprKind::If(IfExpr {
        cond: Box::new(cond),
        then_branch: block(then_branch),
        else_branch: None,
    }))
}

pub fn if_else(cond: Expr, then_branch: Vec<Expr>, else_branch: Vec<Expr>) -> Expr {
    expr(ExprKind::If(IfExpr {
        cond: Box::new(cond),
        then_branch: block(then_branch),
        else_branch: Some(Box::new(block_expr(else_branch))),
    }))
}

/// `if c then ... else if ...`, the else arm being another conditional
pub fn if_else_if(cond: Expr, then_branch: Vec<Expr>, else_if: Expr) -> Expr {
    expr(ExprKind::If(IfExpr {
        cond: Box::new(cond),
        then_branch: block(then_branch),
        else_branch: Some(Box::new(else_if)),
    }))
}

pub fn match_(subject: Expr, cases: Vec<MatchCase>) -> Expr {
    expr(ExprKind::Match(MatchExpr {
        subject: Box::new(subject),
        cases,
    }))
}

pub fn case(binding: Option<&str>, types: Vec<UnresolvedType>, body: Vec<Expr>) -> MatchCase {
    MatchCase {
        pattern: CasePattern::Types {
            binding: binding.map(str::to_string),
            types,
        },
        body: block(body),
        span: Span::synthetic(),
    }
}

pub fn case_any(body: Vec<Expr>) -> MatchCase {
    MatchCase {
        pattern: CasePattern::Wildcard,
        body: block(body),
        span: Span::synthetic(),
    }
}

pub fn let_(name: &str, value: Expr) -> Expr {
    expr(ExprKind::Let(LetExpr {
        name: name.to_string(),
        ty: None,
        value: Box::new(value),
    }))
}

pub fn let_typed(name: &str, ty: UnresolvedType, value: Expr) -> Expr {
    expr(ExprKind::Let(LetExpr {
        name: name.to_string(),
        ty: Some(ty),
        value: Box::new(value),
    }))
}

pub fn type_test(param: &str, constraint: UnresolvedType) -> Expr {
    expr(ExprKind::TypeTest(TypeTestExpr {
        param: ty(param),
        constraint,
    }))
}
