//! The staged resolution scheduler.
//!
//! One FIFO work list per phase. The driver always pops from the earliest
//! non-empty list, so no feature starts a phase while another one is still
//! below it. Features whose argument types come from calls wait on a separate
//! list and are only forced forward once nothing else can progress; features
//! whose types are blocked on them are retried after each such step and
//! finally forced, which guarantees termination.

use crate::error::{TypecheckError, TypecheckResult};
use crate::features::{FeatureId, ResultSource, State};
use crate::phases::Phase;
use crate::session::{Builtin, CompilationSession};
use crate::types::{TypeId, TypeOutcome};
use indexmap::IndexSet;
use std::collections::{HashSet, VecDeque};
use tracing::{debug, trace};

/// Is the result type of a feature available?
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Readiness {
    Ready,
    /// The feature is in the middle of its own type resolution
    Cyclic,
    /// Blocked on argument types still to be inferred from calls
    Pending,
}

#[derive(Debug, Default)]
pub(crate) struct Scheduler {
    queues: [VecDeque<FeatureId>; Phase::COUNT],
    waiting: VecDeque<FeatureId>,
    blocked: IndexSet<FeatureId>,
    forced: HashSet<FeatureId>,
}

impl Scheduler {
    pub fn schedule(&mut self, phase: Phase, f: FeatureId) {
        self.queues[phase.index()].push_back(f);
    }

    pub fn schedule_inheritance(&mut self, f: FeatureId) {
        self.schedule(Phase::Inheritance, f);
    }

    pub fn schedule_declarations(&mut self, f: FeatureId) {
        self.schedule(Phase::Declarations, f);
    }

    pub fn wait_for_calls(&mut self, f: FeatureId) {
        self.waiting.push_back(f);
    }

    pub fn block(&mut self, f: FeatureId) {
        self.blocked.insert(f);
    }

    pub fn is_forced(&self, f: FeatureId) -> bool {
        self.forced.contains(&f)
    }

    fn pop(&mut self) -> Option<(Phase, FeatureId)> {
        Phase::ALL
            .iter()
            .find_map(|phase| self.queues[phase.index()].pop_front().map(|f| (*phase, f)))
    }

    /// Puts every blocked feature back on the types list
    fn requeue_blocked(&mut self, force: bool) {
        for f in std::mem::take(&mut self.blocked) {
            if force {
                self.forced.insert(f);
            }
            self.queues[Phase::Types.index()].push_back(f);
        }
    }
}

impl CompilationSession {
    pub(crate) fn run_scheduler(&mut self) -> TypecheckResult<()> {
        loop {
            self.check_fatal()?;

            if let Some((phase, f)) = self.scheduler.pop() {
                if self.feature(f).state != phase.ready_state() {
                    trace!(feature = f.index(), ?phase, "skipping stale entry");
                    continue;
                }
                let force = self.scheduler.is_forced(f);
                self.run_phase(phase, f, force);
                continue;
            }

            if let Some(f) = self.scheduler.waiting.pop_front() {
                debug!(feature = %self.qualified_name(f), "forcing feature waiting for calls");
                self.settle_args(f);
                if self.feature(f).state == State::ResolvedDeclarations {
                    self.scheduler.schedule(Phase::Types, f);
                }
                self.scheduler.requeue_blocked(false);
                continue;
            }

            if !self.scheduler.blocked.is_empty() {
                debug!(count = self.scheduler.blocked.len(), "forcing blocked features");
                self.scheduler.requeue_blocked(true);
                continue;
            }

            break;
        }
        debug!(
            features = self.feature_count(),
            types = self.type_count(),
            errors = self.error_count(),
            "resolution finished"
        );
        Ok(())
    }

    /// Brings `f` to at least RESOLVED_DECLARATIONS. `false` while `f` is
    /// still in the middle of an earlier phase.
    pub(crate) fn ensure_declarations(&mut self, f: FeatureId) -> bool {
        self.ensure_inheritance(f);
        match self.feature(f).state {
            State::ResolvedInheritance => {
                self.phase_declarations(f);
                true
            }
            State::ResolvingInheritance | State::ResolvingDeclarations => false,
            _ => true,
        }
    }

    /// Brings `f` to at least RESOLVED_TYPES if possible
    pub(crate) fn ensure_types(&mut self, f: FeatureId) -> Readiness {
        let state = self.feature(f).state;
        if state.at_least(State::ResolvedTypes) {
            return Readiness::Ready;
        }
        if state == State::ResolvingTypes {
            return Readiness::Cyclic;
        }
        if !self.ensure_declarations(f) {
            return Readiness::Cyclic;
        }
        if self.has_unsettled_args(f) {
            return Readiness::Pending;
        }
        let force = self.scheduler.is_forced(f);
        self.phase_types(f, force);
        if self.feature(f).state.at_least(State::ResolvedTypes) {
            Readiness::Ready
        } else {
            Readiness::Pending
        }
    }

    /// Result type of `f`; `None` while it depends on inference still to come
    pub(crate) fn result_type(&mut self, f: FeatureId) -> Option<TypeId> {
        let feature = self.feature(f);
        if let Some(t) = feature.result_type {
            return Some(t);
        }
        match feature.result.clone() {
            ResultSource::Constructor => {
                let t = self.current_type(f);
                self.feature_mut(f).result_type = Some(t);
                Some(t)
            }
            ResultSource::Declared(mut r) => {
                let t = self.resolve_type_ref(&mut r, f);
                let feature = self.feature_mut(f);
                feature.result = ResultSource::Declared(r);
                feature.result_type = Some(t);
                Some(t)
            }
            ResultSource::Inferred if self.feature(f).is_local => None,
            ResultSource::Inferred => match self.ensure_types(f) {
                Readiness::Ready => self.feature(f).result_type,
                Readiness::Pending => None,
                Readiness::Cyclic => {
                    self.report(TypecheckError::CyclicTypeInference {
                        feature: self.qualified_name(f),
                        span: self.feature(f).span.into(),
                    });
                    self.feature_mut(f).result_type = Some(TypeId::ERROR);
                    Some(TypeId::ERROR)
                }
            },
            ResultSource::CloneOf(original) => self.result_type(original),
            ResultSource::FromCalls | ResultSource::Fixed => None,
        }
    }

    /// Does `f` still wait for argument types to be inferred from its calls?
    pub(crate) fn has_unsettled_args(&self, f: FeatureId) -> bool {
        self.feature(f).args.iter().any(|a| {
            let arg = self.feature(*a);
            arg.result == ResultSource::FromCalls && arg.result_type.is_none()
        })
    }

    /// Fixes the types of arguments inferred from calls: the union of all
    /// actual argument types seen, `void` when there were none
    pub(crate) fn settle_args(&mut self, f: FeatureId) {
        let args = self.feature(f).args.clone();
        for arg in args {
            if self.feature(arg).result != ResultSource::FromCalls
                || self.feature(arg).result_type.is_some()
            {
                continue;
            }
            let contributions = self.arg_contributions.remove(&arg).unwrap_or_default();
            let t = self.union_of_contributions(f, arg, &contributions);
            trace!(argument = %self.qualified_name(arg), ty = %self.type_name(t), "argument type inferred from calls");
            self.feature_mut(arg).result_type = Some(t);
        }
    }

    fn union_of_contributions(
        &mut self,
        f: FeatureId,
        arg: FeatureId,
        contributions: &[(TypeId, fz_ast::Span)],
    ) -> TypeId {
        let Some(((first, _), rest)) = contributions.split_first() else {
            return self.builtin_type(Builtin::Void);
        };
        let mut result = *first;
        for (t, _) in rest {
            match self.union(result, *t) {
                TypeOutcome::Known(u) => result = u,
                TypeOutcome::Pending | TypeOutcome::Incompatible => {
                    let found = contributions
                        .iter()
                        .map(|(t, span)| format!("`{}` at {span}", self.type_name(*t)))
                        .collect::<Vec<_>>()
                        .join(", ");
                    self.report(TypecheckError::IncompatibleArgumentInference {
                        argument: self.feature(arg).base_name().to_string(),
                        feature: self.qualified_name(f),
                        found,
                        span: self.feature(arg).span.into(),
                    });
                    return TypeId::ERROR;
                }
            }
        }
        result
    }
}
