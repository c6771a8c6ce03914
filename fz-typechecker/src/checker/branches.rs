//! Result types of conditionals and matches.
//!
//! The value-producing expressions of all branches ("leaves") are collected
//! in source order, looking through blocks and nested conditionals in tail
//! position, and their types are joined with [`CompilationSession::union`].
//! Nested conditionals are typed silently so incompatible branches are
//! reported once, by the outermost conditional.

use super::literals::{literal_fits, NumericKind};
use super::Cx;
use crate::error::TypecheckError;
use crate::session::{Builtin, CompilationSession};
use crate::typed_ast::{ConstValue, Expr, ExprKind, Pattern};
use crate::types::{TypeId, TypeOutcome};
use fz_ast::Span;

/// One value-producing branch expression
struct Leaf {
    ty: Option<TypeId>,
    span: Span,
    literal: Option<ConstValue>,
}

impl CompilationSession {
    pub(crate) fn resolve_conditional(&mut self, e: &mut Expr, cx: &Cx, expected: Option<TypeId>) -> Option<TypeId> {
        self.resolve_conditional_with(e, cx, expected, false)
    }

    fn resolve_conditional_with(
        &mut self,
        e: &mut Expr,
        cx: &Cx,
        expected: Option<TypeId>,
        silent: bool,
    ) -> Option<TypeId> {
        let mut pending = false;
        let mut complete = match &mut e.kind {
            ExprKind::If(i) => {
                let bool_type = self.builtin_type(Builtin::Bool);
                pending |= self.resolve_expr(&mut i.cond, cx, Some(bool_type)).is_none();
                let inner = self.branch_context(&i.cond, &cx.context);
                let then_cx = cx.with_context(inner);
                pending |= self.resolve_branch(&mut i.then_branch, &then_cx, expected).is_none();
                match &mut i.else_branch {
                    Some(else_branch) => {
                        pending |= self.resolve_branch(else_branch, cx, expected).is_none();
                        true
                    }
                    None => is_constant_true(&i.cond),
                }
            }
            ExprKind::Match(_) => match self.resolve_match(e, cx, expected) {
                Some(covered) => covered,
                None => {
                    pending = true;
                    true
                }
            },
            _ => return self.resolve_expr(e, cx, expected),
        };
        if pending {
            return None;
        }

        let mut leaves = Vec::new();
        complete &= e.for_each_leaf_mut(&mut |leaf| {
            let literal = match &leaf.kind {
                ExprKind::Const(c) if c.is_numeric_literal() => Some(c.value.clone()),
                _ => None,
            };
            leaves.push(Leaf {
                ty: leaf.ty(),
                span: leaf.span,
                literal,
            });
        });
        let mut joined = self.union_all(&leaf_types(&leaves));
        if joined == TypeOutcome::Pending {
            return None;
        }

        // without a default branch the values are not used
        if !complete {
            let unit = self.builtin_type(Builtin::Unit);
            set_value_path_types(e, unit);
            return Some(unit);
        }

        if let Some(kind) = self.literal_adoption(&leaves, expected) {
            let t = self.builtin_type(kind.builtin());
            e.for_each_leaf_mut(&mut |leaf| {
                if let ExprKind::Const(c) = &mut leaf.kind {
                    if c.is_numeric_literal() {
                        c.ty = Some(t);
                    }
                }
            });
            for leaf in &mut leaves {
                if leaf.literal.is_some() {
                    leaf.ty = Some(t);
                }
            }
            joined = self.union_all(&leaf_types(&leaves));
        }

        let types = leaf_types(&leaves);
        let t = match joined {
            TypeOutcome::Known(u) => match expected {
                Some(x) if x != u && self.is_assignable_from(x, u, &cx.context) => x,
                _ => u,
            },
            TypeOutcome::Pending => return None,
            TypeOutcome::Incompatible => match expected {
                Some(x) if types.iter().all(|t| self.is_assignable_from(x, *t, &cx.context)) => x,
                _ => {
                    if !silent {
                        let construct = match e.kind {
                            ExprKind::Match(_) => "match",
                            _ => "if",
                        };
                        self.report(TypecheckError::IncompatibleBranches {
                            construct: construct.to_string(),
                            found: self.group_by_type(&leaves),
                            span: e.span.into(),
                        });
                    }
                    TypeId::ERROR
                }
            },
        };
        set_value_path_types(e, t);
        Some(t)
    }

    /// Types a branch body; conditionals in tail position are typed silently
    fn resolve_branch(&mut self, e: &mut Expr, cx: &Cx, expected: Option<TypeId>) -> Option<()> {
        if e.is_conditional() {
            return self.resolve_conditional_with(e, cx, expected, true).map(|_| ());
        }
        if let ExprKind::Block(b) = &mut e.kind {
            let mut pending = false;
            let last = b.exprs.len().saturating_sub(1);
            for (i, expr) in b.exprs.iter_mut().enumerate() {
                let resolved = if i == last {
                    self.resolve_branch(expr, cx, expected)
                } else {
                    self.resolve_expr(expr, cx, None).map(|_| ())
                };
                pending |= resolved.is_none();
            }
            if b.exprs.is_empty() {
                b.ty = Some(self.builtin_type(Builtin::Unit));
            }
            return if pending { None } else { Some(()) };
        }
        self.resolve_expr(e, cx, expected).map(|_| ())
    }

    /// Numeric type all literal leaves take, if they should be retyped
    fn literal_adoption(&mut self, leaves: &[Leaf], expected: Option<TypeId>) -> Option<NumericKind> {
        let literals: Vec<&ConstValue> = leaves.iter().filter_map(|l| l.literal.as_ref()).collect();
        if literals.is_empty() {
            return None;
        }
        let fits_all = |kind: NumericKind| literals.iter().all(|v| literal_fits(v, kind));

        let others: Vec<TypeId> = leaves
            .iter()
            .filter(|l| l.literal.is_none())
            .filter_map(|l| l.ty)
            .filter(|t| !self.is_void(*t))
            .collect();
        if others.is_empty() {
            if let Some(kind) = expected.and_then(|x| self.numeric_kind(x)) {
                if fits_all(kind) {
                    return Some(kind);
                }
            }
            if literals.iter().any(|v| matches!(v, ConstValue::Float(_))) {
                return Some(NumericKind::F64);
            }
            return [NumericKind::I32, NumericKind::I64]
                .into_iter()
                .find(|k| fits_all(*k));
        }
        let kind = match self.union_all(&others) {
            TypeOutcome::Known(u) => self.numeric_kind(u)?,
            TypeOutcome::Pending | TypeOutcome::Incompatible => return None,
        };
        fits_all(kind).then_some(kind)
    }

    /// Union of `types` in order. Pending as soon as any of them is not
    /// resolved yet, however the others relate.
    fn union_all(&mut self, types: &[TypeId]) -> TypeOutcome {
        if types.contains(&TypeId::UNDEFINED) {
            return TypeOutcome::Pending;
        }
        let Some((first, rest)) = types.split_first() else {
            return TypeOutcome::Incompatible;
        };
        let mut result = *first;
        for t in rest {
            match self.union(result, *t) {
                TypeOutcome::Known(u) => result = u,
                other => return other,
            }
        }
        TypeOutcome::Known(result)
    }

    /// "`A` at 1:2 and 3:4, `B` at 5:6"
    fn group_by_type(&self, leaves: &[Leaf]) -> String {
        let mut groups: Vec<(TypeId, Vec<String>)> = Vec::new();
        for leaf in leaves {
            let Some(t) = leaf.ty else { continue };
            match groups.iter_mut().find(|(g, _)| *g == t) {
                Some((_, positions)) => positions.push(leaf.span.to_string()),
                None => groups.push((t, vec![leaf.span.to_string()])),
            }
        }
        groups
            .iter()
            .map(|(t, positions)| format!("`{}` at {}", self.type_name(*t), positions.join(" and ")))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Subject, patterns and case bodies of a match. Returns whether the
    /// cases cover every variant, `None` while something is pending.
    fn resolve_match(&mut self, e: &mut Expr, cx: &Cx, expected: Option<TypeId>) -> Option<bool> {
        let ExprKind::Match(m) = &mut e.kind else {
            return Some(true);
        };
        let subject = self.resolve_expr(&mut m.subject, cx, None)?;
        let variants = if subject.is_error() {
            None
        } else if self.is_choice_type(subject) {
            Some(self.choice_variants(subject))
        } else {
            self.report(TypecheckError::IllegalMatch {
                reason: format!("subject of type `{}` is not a choice type", self.type_name(subject)),
                span: m.subject.span.into(),
            });
            None
        };

        let mut covered = vec![false; variants.as_ref().map_or(0, Vec::len)];
        let mut has_default = variants.is_none();
        let mut pending = false;
        for case in &mut m.cases {
            match &mut case.pattern {
                Pattern::Wildcard => has_default = true,
                Pattern::Types { binding, types } => {
                    let mut matched = Vec::new();
                    for r in types.iter_mut() {
                        let t = self.resolve_type_ref(r, cx.feature);
                        if t.is_error() {
                            matched.push(TypeId::ERROR);
                            continue;
                        }
                        let Some(variants) = &variants else {
                            matched.push(t);
                            continue;
                        };
                        let pattern_feature = self.feature_of_type(t);
                        let index = variants.iter().position(|v| *v == t).or_else(|| {
                            variants
                                .iter()
                                .position(|v| self.feature_of_type(*v) == pattern_feature)
                        });
                        match index {
                            Some(i) => {
                                covered[i] = true;
                                matched.push(variants[i]);
                            }
                            None => {
                                self.report(TypecheckError::IllegalMatch {
                                    reason: format!(
                                        "`{}` is not a variant of `{}`",
                                        self.type_name(t),
                                        self.type_name(subject)
                                    ),
                                    span: r.span().into(),
                                });
                                matched.push(TypeId::ERROR);
                            }
                        }
                    }
                    if let Some(b) = binding {
                        if self.feature(*b).result_type.is_none() {
                            let t = match matched.as_slice() {
                                [single] => *single,
                                _ => subject,
                            };
                            self.feature_mut(*b).result_type = Some(t);
                        }
                    }
                }
            }
            pending |= self.resolve_branch(&mut case.body, cx, expected).is_none();
        }
        if pending {
            return None;
        }
        Some(has_default || covered.iter().all(|c| *c))
    }
}

fn is_constant_true(e: &Expr) -> bool {
    matches!(
        &e.kind,
        ExprKind::Const(c) if c.value == ConstValue::Bool(true)
    )
}

/// Types of the leaves, UNDEFINED for those not typed yet
fn leaf_types(leaves: &[Leaf]) -> Vec<TypeId> {
    leaves.iter().map(|l| l.ty.unwrap_or(TypeId::UNDEFINED)).collect()
}

/// Sets `t` on `e` and on every block and conditional its value flows through
pub(super) fn set_value_path_types(e: &mut Expr, t: TypeId) {
    match &mut e.kind {
        ExprKind::Block(b) => {
            if let Some(last) = b.exprs.last_mut() {
                if matches!(last.kind, ExprKind::Block(_) | ExprKind::If(_) | ExprKind::Match(_)) {
                    set_value_path_types(last, t);
                    b.ty = Some(t);
                } else {
                    b.ty = last.ty();
                }
            }
        }
        ExprKind::If(i) => {
            i.ty = Some(t);
            set_value_path_types(&mut i.then_branch, t);
            if let Some(else_branch) = &mut i.else_branch {
                set_value_path_types(else_branch, t);
            }
        }
        ExprKind::Match(m) => {
            m.ty = Some(t);
            for case in &mut m.cases {
                set_value_path_types(&mut case.body, t);
            }
        }
        _ => {}
    }
}
