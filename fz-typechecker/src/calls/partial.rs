//! Function values synthesized from calls and operators.
//!
//! Where a `Function` with `k` parameters is expected, a call lacking its
//! last `k` actual arguments becomes a lambda supplying them from its own
//! parameters. An operator applied to one operand with a unary function
//! expected takes the parameter as its missing other operand, and an
//! operator section `(op)` applies the operator to the lambda's parameters.

use crate::checker::Cx;
use crate::context::Context;
use crate::features::{Feature, FeatureId, FeatureKind, FeatureName, ResultSource, State};
use crate::lookup::Candidate;
use crate::session::CompilationSession;
use crate::typed_ast::{Call, Expr, ExprKind, Lambda};
use crate::types::TypeId;
use fz_ast::{operators, Span};
use std::collections::BTreeMap;
use tracing::trace;

impl CompilationSession {
    /// A fresh routine under `outer` implementing a function value with
    /// `arg_count` parameters. It is never looked up by name, so its
    /// declarations count as resolved from the start.
    pub(crate) fn add_lambda(&mut self, outer: FeatureId, context: &Context, arg_count: usize, span: Span) -> FeatureId {
        let name = self.fresh_name("#fun");
        let mut feature = Feature::new(FeatureName::new(name, arg_count), Some(outer), FeatureKind::Routine, span);
        feature.result = ResultSource::Inferred;
        feature.source_context = Some(context.clone());
        feature.visible = Some(BTreeMap::new());
        feature.parent_types = Some(Vec::new());
        feature.state = State::ResolvedDeclarations;
        self.add_feature(feature)
    }

    /// Lambda with one parameter per type in `params` and `body` built from
    /// reads of those parameters
    fn lambda_with(
        &mut self,
        params: &[TypeId],
        cx: &Cx,
        span: Span,
        body: impl FnOnce(Vec<Expr>) -> Expr,
    ) -> Expr {
        let lambda = self.add_lambda(cx.feature, &cx.context, params.len(), span);
        let mut reads = Vec::with_capacity(params.len());
        for t in params {
            let name = self.fresh_name("#partial");
            let param = self.add_local(lambda, name.clone(), ResultSource::Fixed, span);
            let feature = self.feature_mut(param);
            feature.is_argument = true;
            feature.is_local = false;
            feature.result_type = Some(*t);
            self.feature_mut(lambda).args.push(param);

            let mut read = Call::new(name, None, Vec::new(), span);
            read.local = Some(param);
            reads.push(read.into_expr());
        }
        self.feature_mut(lambda).body = Some(Expr::block(vec![body(reads)], span));
        Expr::new(ExprKind::Lambda(Lambda { feature: lambda, ty: None }), span)
    }

    /// `f a` with `Function R B` expected and `f a b` declared becomes
    /// `x -> f a x`
    pub(super) fn partial_application(&mut self, call: &mut Call, callee: Candidate, params: &[TypeId], cx: &Cx) -> Expr {
        trace!(
            call = %call.name,
            callee = %self.qualified_name(callee.feature),
            missing = params.len(),
            "partial application"
        );
        let span = call.span;
        let mut full = Call::new(call.name.clone(), call.target.take(), std::mem::take(&mut call.actuals), span);
        full.explicit_generics = call.explicit_generics.take();
        full.select = call.select;
        full.parenthesized = true;
        self.lambda_with(params, cx, span, move |reads| {
            full.actuals.extend(reads);
            full.into_expr()
        })
    }

    /// `-v` with a unary function expected becomes `x -> x - v`, `v!` becomes
    /// `x -> v ! x`
    pub(super) fn operator_swap(&mut self, call: &mut Call, params: &[TypeId], cx: &Cx) -> Expr {
        let span = call.span;
        let prefix = call.name.starts_with(operators::PREFIX);
        let op = operators::operator_of(&call.name).unwrap_or_default().to_string();
        let operand = call.target.take();
        trace!(operator = %call.name, "operator applied to function parameter");
        self.lambda_with(params, cx, span, move |mut reads| {
            let param = reads.remove(0);
            let mut swapped = match (prefix, operand) {
                (true, operand) => Call::new(operators::infix(&op), Some(param), operand.into_iter().collect(), span),
                (false, operand) => Call::new(operators::infix(&op), operand, vec![param], span),
            };
            swapped.parenthesized = true;
            swapped.into_expr()
        })
    }

    /// `(op)` as a function value of one or two parameters
    pub(crate) fn operator_lambda(&mut self, op: &str, params: &[TypeId], span: Span, cx: &Cx) -> Expr {
        self.lambda_with(params, cx, span, |mut reads| {
            let first = reads.remove(0);
            if reads.is_empty() {
                Call::new(operators::prefix(op), Some(first), Vec::new(), span).into_expr()
            } else {
                let mut call = Call::new(operators::infix(op), Some(first), reads, span);
                call.parenthesized = true;
                call.into_expr()
            }
        })
    }
}
