//! Propagation of expected types into already typed values.
//!
//! Runs once per feature after types are resolved: numeric literals adopt
//! the numeric type of their slot, zero-argument function values are called
//! where their result is expected, and values are wrapped into `Lazy`
//! function values where a `Lazy` is expected.

use super::Cx;
use crate::context::Context;
use crate::features::{FeatureId, State};
use crate::phases::Phase;
use crate::session::{Builtin, CompilationSession};
use crate::typed_ast::{Block, Call, Expr, ExprKind, Lambda};
use crate::types::TypeId;
use tracing::trace;

impl CompilationSession {
    pub(crate) fn infer_types(&mut self, f: FeatureId) {
        let level = self.body_level(f);
        self.visit_feature_slots(f, &mut |session, e, _slot, formal, context| {
            if formal.is_error() {
                return;
            }
            session.retype_literal(e, formal);
            session.unwrap_callable(e, formal, level, context);
            session.wrap_lazy(e, formal, level, context);
        });
    }

    fn retype_literal(&mut self, e: &mut Expr, formal: TypeId) {
        let ExprKind::Const(c) = &mut e.kind else {
            return;
        };
        if !c.is_numeric_literal() || c.ty == Some(formal) {
            return;
        }
        let Some(kind) = self.numeric_kind(formal) else {
            return;
        };
        if super::literals::literal_fits(&c.value, kind) {
            c.ty = Some(self.builtin_type(kind.builtin()));
        }
    }

    /// `v` of type `Lazy T` used where a `T` is expected becomes `v.call`
    fn unwrap_callable(&mut self, e: &mut Expr, formal: TypeId, level: FeatureId, context: &Context) {
        let Some(call) = e.as_call() else {
            return;
        };
        if call.flags.unwrapped {
            return;
        }
        let Some(t) = call.ty.filter(|t| !t.is_error()) else {
            return;
        };
        let Some((result, params)) = self.function_signature(t) else {
            return;
        };
        if !params.is_empty()
            || self.is_assignable_from(formal, t, context)
            || !self.is_assignable_from(formal, result, context)
        {
            return;
        }

        let span = e.span;
        let mut inner = e.take();
        if let Some(c) = inner.as_call_mut() {
            c.flags.unwrapped = true;
        }
        let mut call = Call::new("call", Some(inner), Vec::new(), span);
        call.flags.unwrapped = true;
        let mut wrapped = call.into_expr();
        let cx = Cx::new(level, context.clone(), true);
        self.resolve_call(&mut wrapped, &cx, Some(formal));
        trace!(ty = %self.type_name(t), "function value called for its result");
        *e = wrapped;
    }

    /// A value used where `Lazy T` is expected becomes a function value
    /// producing it
    fn wrap_lazy(&mut self, e: &mut Expr, formal: TypeId, level: FeatureId, context: &Context) {
        if !self.is_builtin_type(formal, Builtin::Lazy) || matches!(e.kind, ExprKind::Lambda(_)) {
            return;
        }
        let Some(t) = e.ty().filter(|t| !t.is_error()) else {
            return;
        };
        let Some((result, _)) = self.function_signature(formal) else {
            return;
        };
        if self.is_assignable_from(formal, t, context) || !self.is_assignable_from(result, t, context) {
            return;
        }

        let span = e.span;
        let lambda = self.add_lambda(level, context, 0, span);
        let value = e.take();
        let body = Expr::new(
            ExprKind::Block(Block {
                exprs: vec![value],
                ty: Some(t),
            }),
            span,
        );
        let feature = self.feature_mut(lambda);
        feature.result_type = Some(result);
        feature.body = Some(body);
        feature.state = State::ResolvedTypes;
        self.scheduler.schedule(Phase::Sugar1, lambda);

        let ty = self.function_type(result, &[]);
        trace!(lambda = %self.qualified_name(lambda), "value wrapped into lazy function");
        *e = Expr::new(
            ExprKind::Lambda(Lambda {
                feature: lambda,
                ty: Some(ty),
            }),
            span,
        );
    }
}
