//! Implicit conversions of values flowing into typed slots.
//!
//! A value type flowing into a reference slot is boxed, and so is every value
//! flowing into a slot declared as a type parameter. A value flowing into
//! a choice type it is not already an instance of is tagged with the index
//! of the one variant it belongs to, first tagging it into a nested choice
//! variant where that is the only way in.

use super::Slot;
use crate::context::Context;
use crate::error::TypecheckError;
use crate::features::FeatureId;
use crate::session::CompilationSession;
use crate::typed_ast::{Boxed, Expr, ExprKind, Tag};
use crate::types::{TypeId, TypeKind};
use tracing::trace;

/// Nesting limit for tagging into choices of choices
const MAX_TAG_DEPTH: usize = 16;

/// Outcome of looking for the variant a value belongs to
enum VariantMatch {
    None,
    Unique(usize),
    Ambiguous(Vec<usize>),
}

impl CompilationSession {
    pub(crate) fn box_and_tag(&mut self, f: FeatureId) {
        self.visit_feature_slots(f, &mut |session, e, slot, formal, context| {
            if session.is_generic_slot(slot, formal) {
                session.box_into_generic(e);
            } else {
                session.convert(e, f, formal, context, 0);
            }
        });
    }

    /// A slot declared as a bare type parameter or `this`-type. Its actual
    /// type may still turn out to be a reference at some call site.
    fn is_generic_slot(&self, slot: Slot, formal: TypeId) -> bool {
        let declared = match slot {
            Slot::Argument { callee, index } => {
                let args = &self.feature(callee).args;
                args.get(index.min(args.len().saturating_sub(1)))
                    .and_then(|arg| self.feature(*arg).result_type)
                    .unwrap_or(formal)
            }
            Slot::Field(_) | Slot::Value(_) => formal,
            Slot::Condition | Slot::Branch => return false,
        };
        self.is_bare_generic(declared) || self.is_bare_generic(formal)
    }

    fn is_bare_generic(&self, t: TypeId) -> bool {
        matches!(self.type_kind(t), TypeKind::Parametric { .. } | TypeKind::This(_))
    }

    /// Boxes `e` for a generic slot, keeping its static type
    fn box_into_generic(&mut self, e: &mut Expr) {
        let Some(t) = e.ty() else {
            return;
        };
        if t.is_error() || self.is_void(t) || matches!(e.kind, ExprKind::Box(_)) {
            return;
        }
        self.wrap_in_box(e, t);
    }

    /// Boxes and tags `e` for a slot of type `formal` inside the body of `f`
    fn convert(&mut self, e: &mut Expr, f: FeatureId, formal: TypeId, context: &Context, depth: usize) {
        let Some(t) = e.ty() else {
            return;
        };
        if t.is_error() || formal.is_error() || self.is_void(t) {
            return;
        }
        if t == formal && !self.is_outer_alias(e, f) {
            return;
        }
        if t != formal && self.is_choice_type(formal) && self.feature_of_type(t) != self.feature_of_type(formal) {
            self.tag(e, f, t, formal, context, depth);
        } else if self.needs_box(e, f, t, formal) {
            let ty = self.as_ref(t);
            self.wrap_in_box(e, ty);
        }
    }

    fn needs_box(&self, e: &Expr, f: FeatureId, t: TypeId, formal: TypeId) -> bool {
        match self.type_kind(formal) {
            TypeKind::Parametric { .. } | TypeKind::This(_) => true,
            TypeKind::Normal { .. } => {
                self.is_ref_type(formal) && (!self.is_ref_type(t) || self.is_outer_alias(e, f))
            }
            _ => false,
        }
    }

    /// The instance of a feature enclosing `f`, used as a value inside `f`
    fn is_outer_alias(&self, e: &Expr, f: FeatureId) -> bool {
        matches!(&e.kind, ExprKind::Current(c) if c.feature != f)
    }

    fn wrap_in_box(&mut self, e: &mut Expr, ty: TypeId) {
        let value = e.take();
        let span = value.span;
        *e = Expr::new(ExprKind::Box(Box::new(Boxed { value, ty })), span);
    }

    fn tag(
        &mut self,
        e: &mut Expr,
        f: FeatureId,
        t: TypeId,
        choice: TypeId,
        context: &Context,
        depth: usize,
    ) {
        if depth > MAX_TAG_DEPTH {
            return;
        }
        let variants = self.choice_variants(choice);

        let direct =
            self.matching_variants(&variants, |s, v| s.is_directly_assignable_from(v, t, context));
        let index = match direct {
            VariantMatch::Unique(i) => i,
            VariantMatch::Ambiguous(indices) => {
                return self.ambiguous_tagging(e, t, choice, &variants, &indices)
            }
            VariantMatch::None => {
                let nested = self.matching_variants(&variants, |s, v| {
                    s.is_choice_type(v) && s.is_assignable_from(v, t, context)
                });
                match nested {
                    VariantMatch::Unique(i) => i,
                    VariantMatch::Ambiguous(indices) => {
                        return self.ambiguous_tagging(e, t, choice, &variants, &indices)
                    }
                    // left to type checking
                    VariantMatch::None => return,
                }
            }
        };

        let variant = variants[index];
        self.convert(e, f, variant, context, depth + 1);
        trace!(
            value = %self.type_name(t),
            choice = %self.type_name(choice),
            tag = index,
            "tagging"
        );
        let value = e.take();
        let span = value.span;
        *e = Expr::new(
            ExprKind::Tag(Box::new(Tag {
                value,
                ty: choice,
                tag: index,
            })),
            span,
        );
    }

    fn matching_variants(
        &mut self,
        variants: &[TypeId],
        mut matches: impl FnMut(&mut Self, TypeId) -> bool,
    ) -> VariantMatch {
        let mut found = Vec::new();
        for (i, v) in variants.iter().enumerate() {
            if matches(self, *v) {
                found.push(i);
            }
        }
        match found.len() {
            0 => VariantMatch::None,
            1 => VariantMatch::Unique(found[0]),
            _ => VariantMatch::Ambiguous(found),
        }
    }

    fn ambiguous_tagging(
        &mut self,
        e: &Expr,
        t: TypeId,
        choice: TypeId,
        variants: &[TypeId],
        indices: &[usize],
    ) {
        let matching: Vec<TypeId> = indices.iter().map(|i| variants[*i]).collect();
        self.report(TypecheckError::AmbiguousTagging {
            actual: self.type_name(t),
            choice: self.type_name(choice),
            variants: self.type_names(&matching),
            span: e.span.into(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{check, feature_id};
    use fz_ast::builder::*;
    use fz_ast::Span;
    use pretty_assertions::assert_eq;

    fn boxed_type(session: &CompilationSession, e: &Expr) -> Option<String> {
        match &e.kind {
            ExprKind::Box(b) => Some(session.type_name(b.ty)),
            _ => None,
        }
    }

    #[test]
    fn test_outer_instance_is_boxed_into_its_own_reference_type() {
        let mut session = check(vec![feature("node")
            .is_ref()
            .inner(feature("child").is(int("1")).build())
            .build()]);
        let node = feature_id(&session, "node");
        let child = feature_id(&session, "node.child");
        let node_type = session.current_type(node);
        assert!(session.is_ref_type(node_type));

        let mut outer = session.current_expr(node, Span::new(0, 4));
        session.convert(&mut outer, child, node_type, &Context::none(), 0);
        assert_eq!(boxed_type(&session, &outer), Some("node".to_string()));

        let mut own = session.current_expr(node, Span::new(0, 4));
        session.convert(&mut own, node, node_type, &Context::none(), 0);
        assert_eq!(boxed_type(&session, &own), None);
    }
}
