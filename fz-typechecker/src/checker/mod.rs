//! Expression typing and the later per-body phases.
//!
//! [`CompilationSession::resolve_expr`] types one expression tree during the
//! types phase. It returns `None` while some type the expression depends on
//! is still to be inferred; the caller then defers the whole feature. The
//! later phases walk the typed tree through [`CompilationSession::for_each_slot`],
//! which visits every expression whose value flows into a typed slot.

mod boxing;
mod branches;
mod checking;
pub(crate) mod literals;
mod propagate;
mod sugar;

use crate::context::Context;
use crate::error::TypecheckError;
use crate::features::FeatureId;
use crate::session::{Builtin, CompilationSession};
use crate::typed_ast::{ConstValue, Expr, ExprKind};
use crate::types::TypeId;
use std::cell::Cell;
use std::rc::Rc;
use tracing::trace;

/// Where resolution currently is: the feature whose inner features are
/// looked up first, the active context, and whether pending dependencies
/// must be given up on
#[derive(Debug, Clone)]
pub(crate) struct Cx {
    pub feature: FeatureId,
    pub context: Context,
    pub force: bool,
    blocked: Rc<Cell<bool>>,
}

impl Cx {
    pub fn new(feature: FeatureId, context: Context, force: bool) -> Self {
        Self {
            feature,
            context,
            force,
            blocked: Rc::new(Cell::new(false)),
        }
    }

    /// Same position, narrowed context. Blocking is shared with `self`.
    pub fn with_context(&self, context: Context) -> Self {
        Self {
            context,
            ..self.clone()
        }
    }

    pub fn block(&self) {
        self.blocked.set(true);
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked.get()
    }
}

/// The kind of typed slot a value flows into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Slot {
    Argument { callee: FeatureId, index: usize },
    Field(FeatureId),
    Condition,
    Branch,
    /// Initial value of a field or value of a routine with declared result
    Value(FeatureId),
}

pub(crate) type SlotFn<'a> = dyn FnMut(&mut CompilationSession, &mut Expr, Slot, TypeId, &Context) + 'a;

/// The expression producing the value of `e`, looking through blocks.
/// `None` for conditionals, whose branches are slots of their own.
pub(crate) fn value_expr(e: &mut Expr) -> Option<&mut Expr> {
    if e.is_conditional() {
        return None;
    }
    if matches!(e.kind, ExprKind::Block(_)) {
        let ExprKind::Block(b) = &mut e.kind else {
            return None;
        };
        return b.exprs.last_mut().and_then(value_expr);
    }
    Some(e)
}

impl CompilationSession {
    /// Types `e`, with `expected` the type of the slot it flows into if known
    pub(crate) fn resolve_expr(&mut self, e: &mut Expr, cx: &Cx, expected: Option<TypeId>) -> Option<TypeId> {
        if matches!(e.kind, ExprKind::Call(_)) {
            let t = self.resolve_call(e, cx, expected);
            if t.is_none() {
                cx.block();
            }
            return t;
        }
        if let ExprKind::Section(section) = &e.kind {
            let op = section.op.clone();
            return self.resolve_section(e, &op, cx, expected);
        }
        if e.is_conditional() {
            return self.resolve_conditional(e, cx, expected);
        }

        let span = e.span;
        match &mut e.kind {
            ExprKind::Const(c) => {
                if let Some(t) = c.ty {
                    return Some(t);
                }
                let t = match &c.value {
                    ConstValue::Int(_) | ConstValue::Float(_) => {
                        let value = c.value.clone();
                        self.literal_type(&value, expected, span)
                    }
                    ConstValue::Bool(_) => self.builtin_type(Builtin::Bool),
                    ConstValue::Str(_) => self.builtin_type(Builtin::String),
                    ConstValue::Unit => self.builtin_type(Builtin::Unit),
                };
                c.ty = Some(t);
                Some(t)
            }
            ExprKind::Block(b) => {
                let mut pending = false;
                let last = b.exprs.len().saturating_sub(1);
                for (i, expr) in b.exprs.iter_mut().enumerate() {
                    let expected = if i == last { expected } else { None };
                    pending |= self.resolve_expr(expr, cx, expected).is_none();
                }
                if pending {
                    return None;
                }
                let t = match b.exprs.last() {
                    Some(expr) => expr.ty()?,
                    None => self.builtin_type(Builtin::Unit),
                };
                b.ty = Some(t);
                Some(t)
            }
            ExprKind::Assign(a) => {
                let field_type = self.result_type(a.field);
                let value_type = self.resolve_expr(&mut a.value, cx, field_type)?;
                if field_type.is_none() {
                    if !self.feature(a.field).is_local {
                        return None;
                    }
                    trace!(local = %self.qualified_name(a.field), ty = %self.type_name(value_type), "local type inferred");
                    self.feature_mut(a.field).result_type = Some(value_type);
                }
                let unit = self.builtin_type(Builtin::Unit);
                a.ty = Some(unit);
                Some(unit)
            }
            ExprKind::Current(c) => {
                let t = self.current_type(c.feature);
                c.ty = Some(t);
                Some(t)
            }
            ExprKind::TypeTest(test) => {
                if test.generic.is_none() {
                    test.generic = self.type_test_generic(&mut test.param, cx.feature);
                }
                self.resolve_type_ref(&mut test.constraint, cx.feature);
                let t = self.builtin_type(Builtin::Bool);
                test.ty = Some(t);
                Some(t)
            }
            ExprKind::Lambda(lambda) => {
                if let Some(t) = lambda.ty {
                    return Some(t);
                }
                let feature = lambda.feature;
                let Some(result) = self.result_type(feature) else {
                    cx.block();
                    return None;
                };
                let mut params = Vec::new();
                for arg in self.feature(feature).args.clone() {
                    params.push(self.result_type(arg).unwrap_or(TypeId::ERROR));
                }
                let t = self.function_type(result, &params);
                lambda.ty = Some(t);
                Some(t)
            }
            ExprKind::Box(b) => Some(b.ty),
            ExprKind::Tag(t) => Some(t.ty),
            ExprKind::Call(_) | ExprKind::If(_) | ExprKind::Match(_) | ExprKind::Section(_) => None,
        }
    }

    /// `(op)` used as a function value: a lambda applying the operator to
    /// its parameters, when a `Function` with one or two parameters is expected
    fn resolve_section(&mut self, e: &mut Expr, op: &str, cx: &Cx, expected: Option<TypeId>) -> Option<TypeId> {
        let signature = expected.and_then(|t| self.function_signature(t));
        match signature {
            Some((_, params)) if params.len() == 1 || params.len() == 2 => {
                *e = self.operator_lambda(op, &params, e.span, cx);
                self.resolve_expr(e, cx, expected)
            }
            _ => {
                self.report(TypecheckError::UnresolvedName {
                    name: format!("({op})"),
                    what: "function value for operator section".to_string(),
                    span: e.span.into(),
                });
                *e = Expr::constant(ConstValue::Unit, Some(TypeId::ERROR), e.span);
                Some(TypeId::ERROR)
            }
        }
    }

    /// Visits every value flowing into a typed slot below `e`, innermost
    /// first. `f` may replace the value it is given.
    pub(crate) fn for_each_slot(&mut self, e: &mut Expr, context: &Context, f: &mut SlotFn<'_>) {
        if let ExprKind::If(i) = &mut e.kind {
            self.for_each_slot(&mut i.cond, context, f);
            let inner = self.branch_context(&i.cond, context);
            self.for_each_slot(&mut i.then_branch, &inner, f);
            if let Some(else_branch) = &mut i.else_branch {
                self.for_each_slot(else_branch, context, f);
            }
        } else {
            e.for_each_child_mut(&mut |child| self.for_each_slot(child, context, f));
        }

        let bool_type = self.builtin_type(Builtin::Bool);
        match &mut e.kind {
            ExprKind::Call(call) => {
                let (Some(formals), Some(callee)) = (call.formal_types.clone(), call.callee) else {
                    return;
                };
                if callee.is_error() {
                    return;
                }
                for (index, actual) in call.actuals.iter_mut().enumerate() {
                    if let Some(formal) = formals.get(index) {
                        f(self, actual, Slot::Argument { callee, index }, *formal, context);
                    }
                }
            }
            ExprKind::Assign(a) => {
                if let Some(t) = self.feature(a.field).result_type {
                    f(self, &mut a.value, Slot::Field(a.field), t, context);
                }
            }
            ExprKind::If(i) => {
                f(self, &mut i.cond, Slot::Condition, bool_type, context);
                if let Some(t) = i.ty.filter(|t| self.is_value_type(*t)) {
                    let inner = self.branch_context(&i.cond, context);
                    if let Some(v) = value_expr(&mut i.then_branch) {
                        f(self, v, Slot::Branch, t, &inner);
                    }
                    if let Some(v) = i.else_branch.as_mut().and_then(value_expr) {
                        f(self, v, Slot::Branch, t, context);
                    }
                }
            }
            ExprKind::Match(m) => {
                if let Some(t) = m.ty.filter(|t| self.is_value_type(*t)) {
                    for case in &mut m.cases {
                        if let Some(v) = value_expr(&mut case.body) {
                            f(self, v, Slot::Branch, t, context);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    /// Slots of the whole body of `f`, its own value included
    pub(crate) fn for_each_body_slot(&mut self, f: FeatureId, body: &mut Expr, visit: &mut SlotFn<'_>) {
        let context = self.body_context(f);
        self.for_each_slot(body, &context, visit);
        if self.feature(f).clone_of.is_some() {
            // precondition: every expression is a condition
            let bool_type = self.builtin_type(Builtin::Bool);
            if let ExprKind::Block(b) = &mut body.kind {
                for condition in &mut b.exprs {
                    visit(self, condition, Slot::Condition, bool_type, &context);
                }
            }
            return;
        }
        if let Some(t) = self.value_type(f) {
            if let Some(v) = value_expr(body) {
                visit(self, v, Slot::Value(f), t, &context);
            }
        }
    }

    /// Slots of the `inherits` calls and the body of `f`
    pub(crate) fn visit_feature_slots(&mut self, f: FeatureId, visit: &mut SlotFn<'_>) {
        let context = self.body_context(f);
        let mut inherits = std::mem::take(&mut self.feature_mut(f).inherits);
        for e in &mut inherits {
            self.for_each_slot(e, &context, visit);
        }
        self.feature_mut(f).inherits = inherits;

        if let Some(mut body) = self.feature_mut(f).body.take() {
            self.for_each_body_slot(f, &mut body, visit);
            self.feature_mut(f).body = Some(body);
        }
    }

    /// Context inside the branch guarded by `cond`, narrowed by a type test
    pub(crate) fn branch_context(&mut self, cond: &Expr, context: &Context) -> Context {
        if let ExprKind::TypeTest(test) = &cond.kind {
            if let (Some(generic), Some(constraint)) = (test.generic, test.constraint.resolved) {
                return context.add_type_constraint(generic, constraint);
            }
        }
        context.clone()
    }

    /// A type whose values are used: anything but `unit`, `void` and ERROR
    pub(crate) fn is_value_type(&self, t: TypeId) -> bool {
        !t.is_error() && !self.is_void(t) && !self.is_builtin_type(t, Builtin::Unit)
    }

    pub(crate) fn describe_slot(&self, slot: Slot) -> String {
        match slot {
            Slot::Argument { callee, index } => {
                let callee_feature = self.feature(callee);
                let arg = callee_feature
                    .args
                    .get(index.min(callee_feature.args.len().saturating_sub(1)))
                    .map(|a| self.feature(*a).base_name().to_string())
                    .unwrap_or_default();
                format!("argument `{arg}` of call to `{}`", self.qualified_name(callee))
            }
            Slot::Field(field) => match self.feature(field).outer {
                Some(outer) if self.feature(outer).result_field == Some(field) => {
                    format!("result of `{}`", self.qualified_name(outer))
                }
                _ => format!("assignment to `{}`", self.feature(field).base_name()),
            },
            Slot::Condition => "condition".to_string(),
            Slot::Branch => "branch of conditional".to_string(),
            Slot::Value(f) => format!("result of `{}`", self.qualified_name(f)),
        }
    }
}
