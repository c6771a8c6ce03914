//! Resolution of calls.
//!
//! A call advances through [`CallState`] one step at a time: the target is
//! typed, the callee is looked up in the feature of the target's type, the
//! actual generics are taken from the call or inferred from the actual
//! arguments, the formal argument types are substituted (expanding open
//! generics in place) and finally the result type is computed. Every step is
//! kept on the node, so a call that has to wait for some other feature picks
//! up where it stopped when its feature is retried.
//!
//! Some calls are replaced on the way: chained comparisons become
//! conjunctions, calls lacking arguments where a function is expected become
//! lambdas, and arguments given to an argument-less feature are passed to
//! `call` on its result.

mod chained;
mod inference;
mod partial;

use crate::checker::Cx;
use crate::context::Context;
use crate::error::TypecheckError;
use crate::features::{FeatureId, FeatureName, ResultSource};
use crate::lookup::{CallShape, Candidate, Lookup};
use crate::session::{Builtin, CompilationSession};
use crate::subtyping::Substitution;
use crate::typed_ast::{Call, CallState, Current, Expr, ExprKind};
use crate::types::{TypeId, TypeKind};
use fz_ast::{operators, Span};
use inference::Inference;
use tracing::{debug, trace};

/// What became of a call after one resolution attempt
enum Step {
    /// Its type, `None` while pending
    Done(Option<TypeId>),
    /// It was replaced by this expression, to be resolved in its place
    Rewrite(Expr),
}

/// Argument `call` on the result of `f` for `f(a, b)` with `f` taking no
/// arguments
fn immediate_call(call: &mut Call) -> Expr {
    let span = call.span;
    let actuals = std::mem::take(&mut call.actuals);
    call.parenthesized = false;
    let function = std::mem::replace(call, Call::new(String::new(), None, Vec::new(), span));
    let mut outer = Call::new("call", Some(function.into_expr()), actuals, span);
    outer.parenthesized = true;
    outer.into_expr()
}

fn is_operator_without_operand(call: &Call) -> bool {
    call.actuals.is_empty()
        && call.target.is_some()
        && (call.name.starts_with(operators::PREFIX) || call.name.starts_with(operators::POSTFIX))
}

impl CompilationSession {
    /// Types the call `e`, replacing it where it is rewritten
    pub(crate) fn resolve_call(&mut self, e: &mut Expr, cx: &Cx, expected: Option<TypeId>) -> Option<TypeId> {
        match &e.kind {
            ExprKind::Call(call) if call.state.is_final() => return call.ty,
            ExprKind::Call(_) => {}
            _ => return self.resolve_expr(e, cx, expected),
        }
        let mut node = e.take();
        let ExprKind::Call(call) = &mut node.kind else {
            *e = node;
            return None;
        };
        match self.advance_call(call, cx, expected) {
            Step::Done(t) => {
                *e = node;
                t
            }
            Step::Rewrite(rewritten) => {
                *e = rewritten;
                self.resolve_expr(e, cx, expected)
            }
        }
    }

    fn advance_call(&mut self, call: &mut Call, cx: &Cx, expected: Option<TypeId>) -> Step {
        if call.state == CallState::Unresolved {
            if let Some(target) = &mut call.target {
                if self.resolve_expr(target, cx, None).is_none() {
                    return self.pending(call, cx);
                }
            }
            call.state = CallState::TargetTyped;
            if let Some(rewritten) = self.rewrite_chained(call, cx) {
                return Step::Rewrite(rewritten);
            }
        }
        if call.state == CallState::TargetTyped {
            if let Some(step) = self.find_callee(call, cx, expected) {
                return step;
            }
        }
        if call.state == CallState::CalleeKnown {
            if let Some(step) = self.resolve_arguments(call, cx, expected) {
                return step;
            }
        }
        if call.state == CallState::ArgumentsResolved {
            return self.resolve_result(call, cx);
        }
        Step::Done(call.ty)
    }

    /// Gives up on `call` when forced, otherwise waits
    fn pending(&mut self, call: &mut Call, cx: &Cx) -> Step {
        if cx.force {
            debug!(call = %call.name, "giving up on pending call");
            Step::Done(call.fail())
        } else {
            cx.block();
            Step::Done(None)
        }
    }

    /// The current instance of `feature` as an expression
    pub(crate) fn current_expr(&mut self, feature: FeatureId, span: Span) -> Expr {
        let ty = self.current_type(feature);
        Expr::new(ExprKind::Current(Current { feature, ty: Some(ty) }), span)
    }

    // Callee

    fn find_callee(&mut self, call: &mut Call, cx: &Cx, expected: Option<TypeId>) -> Option<Step> {
        if call.callee.is_some() {
            call.state = CallState::CalleeKnown;
            return None;
        }
        if let Some(local) = call.local {
            let outer = self.feature(local).outer.unwrap_or(FeatureId::UNIVERSE);
            call.target = Some(self.current_expr(outer, call.span));
            call.callee = Some(local);
            call.state = CallState::CalleeKnown;
            return None;
        }

        let scope = match call.target.as_ref().map(Expr::ty) {
            None => None,
            Some(target_type) => {
                let target_type = target_type.unwrap_or(TypeId::ERROR);
                if target_type.is_error() {
                    return Some(Step::Done(call.fail()));
                }
                if self.is_void(target_type) {
                    return Some(self.unreachable_call(call, cx));
                }
                let Some(outer) = self.target_feature(target_type, &cx.context) else {
                    self.report(TypecheckError::UnresolvedName {
                        name: call.name.clone(),
                        what: format!("feature in `{}`", self.type_name(target_type)),
                        span: call.span.into(),
                    });
                    return Some(Step::Done(call.fail()));
                };
                Some(outer)
            }
        };

        let arg_count = call.actuals.len();
        let params = self.expected_params(expected);
        let candidate = match self.lookup_call(call, cx, scope, arg_count) {
            Lookup::Found(c) => c,
            Lookup::Ambiguous(candidates) => {
                self.report(TypecheckError::AmbiguousName {
                    name: FeatureName::new(call.name.clone(), arg_count).to_string(),
                    candidates: self.candidate_names(&candidates),
                    span: call.span.into(),
                });
                return Some(Step::Done(call.fail()));
            }
            Lookup::NotFound => {
                if let Some(params) = &params {
                    if let Some(p) = self.partial_candidate(call, cx, scope, params.len()) {
                        return Some(Step::Rewrite(self.partial_application(call, p, params, cx)));
                    }
                }
                self.report(TypecheckError::UnresolvedName {
                    name: FeatureName::new(call.name.clone(), arg_count).to_string(),
                    what: "feature".to_string(),
                    span: call.span.into(),
                });
                return Some(Step::Done(call.fail()));
            }
        };

        if let Some(params) = &params {
            if let Some(step) = self.function_expected(call, cx, scope, candidate, params) {
                return Some(step);
            }
        }

        trace!(
            call = %call.name,
            callee = %self.qualified_name(candidate.feature),
            "callee found"
        );
        if call.target.is_none() {
            call.target = Some(self.current_expr(candidate.outer, call.span));
        }
        call.callee = Some(candidate.feature);
        call.state = CallState::CalleeKnown;

        let callee = self.feature(candidate.feature);
        if callee.arg_count() == 0 && !callee.has_open_arg_list && !call.actuals.is_empty() {
            return Some(Step::Rewrite(immediate_call(call)));
        }
        None
    }

    /// Choice between the call as written and a partial application of it
    /// when a function with `params` is expected
    fn function_expected(
        &mut self,
        call: &mut Call,
        cx: &Cx,
        scope: Option<FeatureId>,
        candidate: Candidate,
        params: &[TypeId],
    ) -> Option<Step> {
        if is_operator_without_operand(call) && params.len() == 1 {
            match self.result_is_function(candidate.feature) {
                Some(false) => return Some(Step::Rewrite(self.operator_swap(call, params, cx))),
                Some(true) => return None,
                None => return Some(self.pending(call, cx)),
            }
        }
        let partial = self.partial_candidate(call, cx, scope, params.len())?;
        if partial.feature == candidate.feature {
            return None;
        }
        match self.result_is_function(candidate.feature) {
            Some(true) => {
                self.report(TypecheckError::AmbiguousPartialApplication {
                    name: call.name.clone(),
                    full: self.qualified_name(candidate.feature),
                    partial: self.qualified_name(partial.feature),
                    span: call.span.into(),
                });
                Some(Step::Done(call.fail()))
            }
            Some(false) => Some(Step::Rewrite(self.partial_application(call, partial, params, cx))),
            None => Some(self.pending(call, cx)),
        }
    }

    fn lookup_call(&mut self, call: &Call, cx: &Cx, scope: Option<FeatureId>, arg_count: usize) -> Lookup {
        let shape = CallShape {
            name: &call.name,
            arg_count,
            parenthesized: call.parenthesized,
            choice_heir: call.flags.inheritance && self.feature(cx.feature).is_choice(),
        };
        match scope {
            Some(outer) => self.lookup_in(outer, &shape),
            None => self.lookup_no_target(cx.feature, &shape),
        }
    }

    /// Feature taking exactly `missing` arguments more than `call` provides
    fn partial_candidate(
        &mut self,
        call: &Call,
        cx: &Cx,
        scope: Option<FeatureId>,
        missing: usize,
    ) -> Option<Candidate> {
        let arg_count = call.actuals.len() + missing;
        match self.lookup_call(call, cx, scope, arg_count) {
            Lookup::Found(c) if self.feature(c.feature).arg_count() == arg_count => Some(c),
            _ => None,
        }
    }

    /// Parameter types of an expected function type with parameters
    fn expected_params(&self, expected: Option<TypeId>) -> Option<Vec<TypeId>> {
        let t = expected.filter(|t| self.is_builtin_type(*t, Builtin::Function))?;
        let (_, params) = self.function_signature(t)?;
        (!params.is_empty()).then_some(params)
    }

    /// `None` while the result type of `f` is still to be inferred
    fn result_is_function(&mut self, f: FeatureId) -> Option<bool> {
        if self.feature(f).is_constructor() {
            return Some(false);
        }
        let t = self.result_type(f)?;
        Some(self.is_builtin_type(t, Builtin::Function))
    }

    /// Feature whose inner features are callable on a value of type `t`
    fn target_feature(&mut self, t: TypeId, context: &Context) -> Option<FeatureId> {
        match self.type_kind(t).clone() {
            TypeKind::Normal { feature, .. } | TypeKind::This(feature) => Some(feature),
            TypeKind::Parametric { generic, .. } => {
                let constraint = self.effective_constraint(generic, context);
                self.feature_of_type(constraint)
            }
            _ => None,
        }
    }

    /// A call on a `void` target is never executed
    fn unreachable_call(&mut self, call: &mut Call, cx: &Cx) -> Step {
        let mut pending = false;
        for actual in &mut call.actuals {
            pending |= self.resolve_expr(actual, cx, None).is_none();
        }
        if pending {
            return self.pending(call, cx);
        }
        let void = self.builtin_type(Builtin::Void);
        call.flags.unreachable = true;
        call.ty = Some(void);
        call.state = CallState::TypeKnown;
        Step::Done(Some(void))
    }

    // Generics and arguments

    fn resolve_arguments(&mut self, call: &mut Call, cx: &Cx, expected: Option<TypeId>) -> Option<Step> {
        let callee = match call.callee {
            Some(c) if !c.is_error() => c,
            _ => return Some(Step::Done(call.fail())),
        };
        if !call.flags.generics_known {
            if let Some(step) = self.explicit_generics(call, callee, cx) {
                return Some(step);
            }
        }

        let outer = self.outer_substitution(call, callee);
        let (raw, from_calls) = self.raw_formals(callee, &outer);
        let open_last = self.feature(callee).has_open_arg_list
            && raw
                .last()
                .is_some_and(|t| self.is_open_parametric(*t) && self.mentions_generic_of(*t, callee));
        let formal_index = |i: usize| -> Option<usize> {
            if open_last && i + 1 >= raw.len() {
                Some(raw.len() - 1)
            } else {
                (i < raw.len()).then_some(i)
            }
        };
        let mut pending = raw.contains(&TypeId::UNDEFINED) && from_calls.is_empty();

        // first pass: everything but function values whose type depends on
        // generics still to be inferred
        let known = if call.flags.generics_known {
            let s = self.with_callee_generics(&outer, callee, call.generics.clone());
            Some(self.expand_formals(&raw, &s))
        } else {
            None
        };
        let mut deferred = Vec::new();
        for i in 0..call.actuals.len() {
            let raw_formal = formal_index(i)
                .map(|j| raw[j])
                .filter(|t| *t != TypeId::UNDEFINED);
            let expected_i = match (&known, raw_formal) {
                (Some(expanded), _) => expanded.get(i).copied().filter(|t| *t != TypeId::UNDEFINED),
                (None, Some(f)) if !self.mentions_generic_of(f, callee) => Some(f),
                (None, Some(f)) if self.function_signature(f).is_some() => {
                    deferred.push(i);
                    continue;
                }
                _ => None,
            };
            pending |= self.resolve_expr(&mut call.actuals[i], cx, expected_i).is_none();
        }

        if !from_calls.is_empty() {
            self.contribute(call, &from_calls);
            pending |= from_calls
                .iter()
                .any(|(_, arg)| self.feature(*arg).result_type.is_none());
        }
        if pending && !cx.force {
            return Some(self.pending(call, cx));
        }

        if !call.flags.generics_known {
            let mut inference = Inference::new(self, callee);
            for i in 0..call.actuals.len() {
                if deferred.contains(&i) || (open_last && i + 1 >= raw.len()) {
                    continue;
                }
                if let (Some(j), Some(t)) = (formal_index(i), call.actuals[i].ty()) {
                    self.unify(&mut inference, raw[j], t, &cx.context);
                }
            }
            if open_last {
                let tail = call
                    .actuals
                    .iter()
                    .skip(raw.len() - 1)
                    .map(|a| a.ty().unwrap_or(TypeId::ERROR))
                    .collect();
                inference.solve_open(tail);
            }

            // second pass: function values, with the generics inferred so far
            for i in deferred.iter().copied() {
                let Some(j) = formal_index(i) else {
                    continue;
                };
                let partial = self.partial_generics(&inference);
                let s = self.with_callee_generics(&outer, callee, partial);
                let expected_i = self.apply_one(raw[j], &s);
                pending |= self
                    .resolve_expr(&mut call.actuals[i], cx, Some(expected_i))
                    .is_none();
                if let Some(t) = call.actuals[i].ty() {
                    self.unify(&mut inference, raw[j], t, &cx.context);
                }
            }
            if pending && !cx.force {
                return Some(self.pending(call, cx));
            }

            if !inference.is_complete() {
                if let (Some(expected), Some(result)) = (expected, self.declared_result(callee)) {
                    let result = self.apply_one(result, &outer);
                    self.unify(&mut inference, result, expected, &cx.context);
                }
            }
            call.generics = self.finish_inference(inference, call.span);
            call.flags.generics_known = true;
            trace!(
                call = %call.name,
                generics = %self.type_names(&call.generics),
                "actual generics inferred"
            );
        }

        let s = self.with_callee_generics(&outer, callee, call.generics.clone());
        let formals: Vec<TypeId> = self
            .expand_formals(&raw, &s)
            .into_iter()
            .map(|t| if t == TypeId::UNDEFINED { TypeId::ERROR } else { t })
            .collect();
        if formals.len() != call.actuals.len() {
            self.report(TypecheckError::UnresolvedName {
                name: call.name.clone(),
                what: format!("feature accepting {} actual arguments", call.actuals.len()),
                span: call.span.into(),
            });
            return Some(Step::Done(call.fail()));
        }
        call.formal_types = Some(formals);
        call.state = CallState::ArgumentsResolved;
        None
    }

    fn explicit_generics(&mut self, call: &mut Call, callee: FeatureId, cx: &Cx) -> Option<Step> {
        if let Some(explicit) = &mut call.explicit_generics {
            let mut generics = Vec::with_capacity(explicit.len());
            for g in explicit.iter_mut() {
                generics.push(self.resolve_type_ref(g, cx.feature));
            }
            let expands_open = generics.iter().any(|g| self.is_open_parametric(*g));
            let formals = &self.feature(callee).generics;
            if !expands_open && !formals.size_matches(generics.len()) {
                let expected = formals.size_text();
                self.report(TypecheckError::GenericArityMismatch {
                    name: call.name.clone(),
                    expected,
                    found: generics.len(),
                    span: call.span.into(),
                });
                return Some(Step::Done(call.fail()));
            }
            call.generics = generics;
            call.flags.generics_known = true;
        } else if self.feature(callee).generics.is_empty() {
            call.generics = Vec::new();
            call.flags.generics_known = true;
        } else if call.flags.inheritance {
            // already reported with the parent types
            call.generics = vec![TypeId::ERROR; self.feature(callee).generics.len()];
            call.flags.generics_known = true;
        }
        None
    }

    /// Actual generics of the features enclosing the callee, as seen from
    /// the target. An explicit target also replaces `this` types.
    fn outer_substitution(&mut self, call: &Call, callee: FeatureId) -> Substitution {
        let target = call
            .target
            .as_ref()
            .and_then(|t| Some((t.ty()?, !matches!(t.kind, ExprKind::Current(_)))));
        let mut bindings = Vec::new();
        if let Some((t, _)) = target {
            let mut level = self.feature(callee).outer;
            while let Some(o) = level {
                if !self.feature(o).generics.is_empty() {
                    if let Some(generics) = self.view_generics(t, o) {
                        bindings.push((o, generics));
                    }
                }
                level = self.feature(o).outer;
            }
        }
        let s = Substitution::new(bindings);
        match target {
            Some((t, true)) => s.with_target(t),
            _ => s,
        }
    }

    fn with_callee_generics(&self, outer: &Substitution, callee: FeatureId, generics: Vec<TypeId>) -> Substitution {
        let mut s = outer.clone();
        s.bindings.push((callee, generics));
        s
    }

    /// Declared argument types with the outer substitution applied. An
    /// argument whose type comes from calls and is not known yet is
    /// UNDEFINED, and listed with its position.
    fn raw_formals(&mut self, callee: FeatureId, outer: &Substitution) -> (Vec<TypeId>, Vec<(usize, FeatureId)>) {
        let mut raw = Vec::new();
        let mut from_calls = Vec::new();
        for arg in self.feature(callee).args.clone() {
            match self.result_type(arg) {
                Some(t) => raw.extend(self.apply(t, outer)),
                None => {
                    if self.feature(arg).result == ResultSource::FromCalls {
                        from_calls.push((raw.len(), arg));
                    }
                    raw.push(TypeId::UNDEFINED);
                }
            }
        }
        (raw, from_calls)
    }

    fn expand_formals(&mut self, raw: &[TypeId], s: &Substitution) -> Vec<TypeId> {
        let mut formals = Vec::with_capacity(raw.len());
        for t in raw {
            if *t == TypeId::UNDEFINED {
                formals.push(*t);
            } else {
                formals.extend(self.apply(*t, s));
            }
        }
        formals
    }

    /// Records the actual argument types of `call` for arguments whose
    /// types are inferred from calls, once all of them are typed
    fn contribute(&mut self, call: &mut Call, from_calls: &[(usize, FeatureId)]) {
        if call.flags.contributed {
            return;
        }
        let mut contributions = Vec::with_capacity(from_calls.len());
        for (position, arg) in from_calls {
            let Some(actual) = call.actuals.get(*position) else {
                return;
            };
            let Some(t) = actual.ty() else {
                return;
            };
            contributions.push((*arg, t, actual.span));
        }
        for (arg, t, span) in contributions {
            trace!(argument = %self.qualified_name(arg), ty = %self.type_name(t), "argument type from call");
            self.arg_contributions.entry(arg).or_default().push((t, span));
        }
        call.flags.contributed = true;
    }

    /// Result type as declared, for inference from the expected type
    fn declared_result(&mut self, callee: FeatureId) -> Option<TypeId> {
        match self.feature(callee).result {
            ResultSource::Declared(_) | ResultSource::Constructor => self.result_type(callee),
            _ => None,
        }
    }

    // Result

    fn resolve_result(&mut self, call: &mut Call, cx: &Cx) -> Step {
        let Some(callee) = call.callee.filter(|c| !c.is_error()) else {
            return Step::Done(call.fail());
        };
        let feature = self.feature(callee);
        let ty = if call.flags.inheritance || feature.is_constructor() || feature.is_choice() {
            let outer = self.constructed_outer(call, callee);
            self.constructor_type(callee, call.generics.clone(), outer)
        } else {
            let Some(result) = self.result_type(callee) else {
                return self.pending(call, cx);
            };
            let outer = self.outer_substitution(call, callee);
            let s = self.with_callee_generics(&outer, callee, call.generics.clone());
            let results = self.apply(result, &s);
            self.select_result(call, results)
        };
        trace!(call = %call.name, ty = %self.type_name(ty), "call typed");
        call.ty = Some(ty);
        call.state = CallState::TypeKnown;
        Step::Done(Some(ty))
    }

    /// Outer type of an instance created by a constructor call
    fn constructed_outer(&mut self, call: &Call, callee: FeatureId) -> Option<TypeId> {
        let outer = self.feature(callee).outer.filter(|o| *o != FeatureId::UNIVERSE)?;
        let explicit = call
            .target
            .as_ref()
            .filter(|t| !matches!(t.kind, ExprKind::Current(_)))
            .and_then(Expr::ty);
        match explicit.and_then(|t| self.ancestor_view(t, outer)) {
            Some(view) => Some(view),
            None => self.outer_type_for(outer),
        }
    }

    /// The one type a call produces: the only element of a non-open result,
    /// or the element picked by a selector
    fn select_result(&mut self, call: &Call, mut results: Vec<TypeId>) -> TypeId {
        match call.select {
            Some(select) if select < results.len() => results.swap_remove(select),
            Some(select) => {
                self.report(TypecheckError::SelectorOutOfRange {
                    name: call.name.clone(),
                    select,
                    count: results.len(),
                    span: call.span.into(),
                });
                TypeId::ERROR
            }
            None if results.len() == 1 => results.remove(0),
            None => {
                self.report(TypecheckError::OpenGenericMisuse {
                    name: call.name.clone(),
                    span: call.span.into(),
                });
                TypeId::ERROR
            }
        }
    }
}
