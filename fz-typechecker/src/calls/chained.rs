//! Chained comparisons.
//!
//! `a < b <= c` parses as `(a < b) <= c`. When the left operand is itself a
//! comparison of non-`bool` operands, the call is rewritten into
//! `a < {t := b; t} && t <= c` so that `b` is evaluated once. A longer chain
//! continues the conjunction built for the shorter one, sharing the right
//! operand of its last comparison the same way.

use crate::checker::Cx;
use crate::features::{FeatureId, ResultSource};
use crate::session::{Builtin, CompilationSession};
use crate::typed_ast::{Assign, Block, Call, CallState, Expr, ExprKind};
use crate::types::TypeId;
use fz_ast::{operators, Span};
use tracing::trace;

/// The operand shared between the comparison `link` and the one following
/// it, if `link` ends a comparison chain
fn shared_operand(link: &mut Expr, bool_type: TypeId) -> Option<&mut Expr> {
    let call = link.as_call_mut()?;
    if operators::is_relational_infix(&call.name) && call.actuals.len() == 1 {
        let operand = call.target.as_ref().and_then(Expr::ty);
        if operand.is_some_and(|t| t != bool_type) {
            return call.actuals.first_mut();
        }
        return None;
    }
    if call.name == operators::infix("&&") {
        let rhs = call.actuals.first_mut()?.as_call_mut()?;
        if rhs.flags.chained_rhs {
            return rhs.actuals.first_mut();
        }
    }
    None
}

impl CompilationSession {
    /// The conjunction replacing `call` if it continues a comparison chain
    pub(super) fn rewrite_chained(&mut self, call: &mut Call, cx: &Cx) -> Option<Expr> {
        if !operators::is_relational_infix(&call.name) || call.actuals.len() != 1 {
            return None;
        }
        let bool_type = self.builtin_type(Builtin::Bool);
        let target = call.target.as_mut()?;
        if target.ty() != Some(bool_type) {
            return None;
        }
        let shared = shared_operand(target, bool_type)?;
        let shared_type = shared.ty()?;
        let span = shared.span;

        let name = self.fresh_name("#chainedBoolTemp");
        let temp = self.add_local(cx.feature, name, ResultSource::Fixed, span);
        self.feature_mut(temp).result_type = Some(shared_type);
        let unit = self.builtin_type(Builtin::Unit);
        let value = shared.take();
        let assign = Expr::new(
            ExprKind::Assign(Box::new(Assign {
                field: temp,
                value,
                ty: Some(unit),
            })),
            span,
        );
        let read = self.read_temp(temp, shared_type, cx, span);
        *shared = Expr::new(
            ExprKind::Block(Block {
                exprs: vec![assign, read],
                ty: Some(shared_type),
            }),
            span,
        );

        let read = self.read_temp(temp, shared_type, cx, call.span);
        let mut rhs = Call::new(
            call.name.clone(),
            Some(read),
            std::mem::take(&mut call.actuals),
            call.span,
        );
        rhs.parenthesized = true;
        rhs.flags.chained_rhs = true;

        let mut and = Call::new(operators::infix("&&"), call.target.take(), vec![rhs.into_expr()], call.span);
        and.parenthesized = true;
        trace!(operator = %call.name, temp = %self.qualified_name(temp), "chained comparison");
        Some(and.into_expr())
    }

    /// A read of the temporary `temp`, typed from the start
    fn read_temp(&mut self, temp: FeatureId, ty: TypeId, cx: &Cx, span: Span) -> Expr {
        let name = self.feature(temp).base_name().to_string();
        let mut read = Call::new(name, Some(self.current_expr(cx.feature, span)), Vec::new(), span);
        read.local = Some(temp);
        read.callee = Some(temp);
        read.formal_types = Some(Vec::new());
        read.flags.generics_known = true;
        read.state = CallState::TypeKnown;
        read.ty = Some(ty);
        read.into_expr()
    }
}
