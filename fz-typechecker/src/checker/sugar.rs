//! Syntactic rewrites of typed bodies.
//!
//! The first pass turns the lazy boolean operators into conditionals. The
//! second assigns the value of a routine body to a synthesized result field,
//! pushing the assignment into every branch so that later phases convert
//! each branch value on its own.

use super::branches::set_value_path_types;
use crate::features::{FeatureId, FeatureKind, ResultSource};
use crate::session::{Builtin, CompilationSession};
use crate::typed_ast::{Assign, Block, ConstValue, Expr, ExprKind, If};
use fz_ast::operators;
use tracing::trace;

impl CompilationSession {
    /// `a && b` becomes `if a then b else false`, `a || b` becomes
    /// `if a then true else b`
    pub(crate) fn resolve_sugar1(&mut self, f: FeatureId) {
        let and = self.find_overload(&format!("bool.{}", operators::infix("&&")), 1);
        let or = self.find_overload(&format!("bool.{}", operators::infix("||")), 1);
        if and.is_none() && or.is_none() {
            return;
        }
        let bool_type = self.builtin_type(Builtin::Bool);
        let Some(mut body) = self.feature_mut(f).body.take() else {
            return;
        };
        let mut rewritten = 0;
        body.walk_post_mut(&mut |e| {
            let span = e.span;
            let ExprKind::Call(call) = &mut e.kind else {
                return;
            };
            let is_or = match call.callee {
                Some(c) if Some(c) == and => false,
                Some(c) if Some(c) == or => true,
                _ => return,
            };
            let (Some(cond), Some(rhs)) = (call.target.take(), call.actuals.pop()) else {
                return;
            };
            let constant = Expr::constant(ConstValue::Bool(is_or), Some(bool_type), span);
            let (then_value, else_value) = if is_or { (constant, rhs) } else { (rhs, constant) };
            let branch = |value: Expr| {
                let span = value.span;
                Expr::new(
                    ExprKind::Block(Block {
                        exprs: vec![value],
                        ty: Some(bool_type),
                    }),
                    span,
                )
            };
            *e = Expr::new(
                ExprKind::If(Box::new(If {
                    cond,
                    then_branch: branch(then_value),
                    else_branch: Some(branch(else_value)),
                    ty: Some(bool_type),
                })),
                span,
            );
            rewritten += 1;
        });
        if rewritten > 0 {
            trace!(feature = %self.qualified_name(f), rewritten, "lazy boolean operators");
        }
        self.feature_mut(f).body = Some(body);
    }

    /// Introduces the result field of routines whose value is used
    pub(crate) fn resolve_sugar2(&mut self, f: FeatureId) {
        let feature = self.feature(f);
        if feature.kind != FeatureKind::Routine
            || feature.is_constructor()
            || feature.body.is_none()
            || feature.clone_of.is_some()
            || feature.result_field.is_some()
        {
            return;
        }
        let Some(t) = feature.result_type.filter(|t| self.is_value_type(*t)) else {
            return;
        };
        let span = feature.span;
        let name = self.fresh_name("#result");
        let result = self.add_local(f, name, ResultSource::Fixed, span);
        self.feature_mut(result).result_type = Some(t);

        let unit = self.builtin_type(Builtin::Unit);
        let Some(mut body) = self.feature_mut(f).body.take() else {
            return;
        };
        let void_type = self.builtin_type(Builtin::Void);
        body.for_each_leaf_mut(&mut |leaf| {
            // a branch that never returns assigns nothing
            if !matches!(leaf.ty(), Some(lt) if lt != void_type) {
                return;
            }
            let value = leaf.take();
            let span = value.span;
            *leaf = Expr::new(
                ExprKind::Assign(Box::new(Assign {
                    field: result,
                    value,
                    ty: Some(unit),
                })),
                span,
            );
        });
        set_value_path_types(&mut body, unit);
        trace!(
            feature = %self.qualified_name(f),
            result = %self.qualified_name(result),
            "result field introduced"
        );

        let feature = self.feature_mut(f);
        feature.body = Some(body);
        feature.result_field = Some(result);
    }
}
