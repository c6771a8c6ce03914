//! The resolution phases a feature passes through, in order.

use crate::checker::Cx;
use crate::context::Context;
use crate::error::TypecheckError;
use crate::features::{FeatureId, FeatureName, ResultSource, State};
use crate::session::{Builtin, CompilationSession};
use crate::types::TypeId;
use std::collections::BTreeMap;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Inheritance,
    Declarations,
    Types,
    Sugar1,
    Inference,
    Sugar2,
    Boxing,
    Checking,
}

impl Phase {
    pub const COUNT: usize = 8;

    pub const ALL: [Phase; Phase::COUNT] = [
        Phase::Inheritance,
        Phase::Declarations,
        Phase::Types,
        Phase::Sugar1,
        Phase::Inference,
        Phase::Sugar2,
        Phase::Boxing,
        Phase::Checking,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// State a feature must be in for this phase to run on it
    pub fn ready_state(self) -> State {
        match self {
            Phase::Inheritance => State::Loaded,
            Phase::Declarations => State::ResolvedInheritance,
            Phase::Types => State::ResolvedDeclarations,
            Phase::Sugar1 => State::ResolvedTypes,
            Phase::Inference => State::ResolvedSugar1,
            Phase::Sugar2 => State::TypesInferenced,
            Phase::Boxing => State::ResolvedSugar2,
            Phase::Checking => State::Boxed,
        }
    }

    /// Transient state while the phase runs and the state it leaves behind
    pub fn states(self) -> (State, State) {
        match self {
            Phase::Inheritance => (State::ResolvingInheritance, State::ResolvedInheritance),
            Phase::Declarations => (State::ResolvingDeclarations, State::ResolvedDeclarations),
            Phase::Types => (State::ResolvingTypes, State::ResolvedTypes),
            Phase::Sugar1 => (State::ResolvingSugar1, State::ResolvedSugar1),
            Phase::Inference => (State::TypesInferencing, State::TypesInferenced),
            Phase::Sugar2 => (State::ResolvingSugar2, State::ResolvedSugar2),
            Phase::Boxing => (State::Boxing, State::Boxed),
            Phase::Checking => (State::CheckingTypes, State::Resolved),
        }
    }

    pub fn next(self) -> Option<Phase> {
        Phase::ALL.get(self.index() + 1).copied()
    }
}

impl CompilationSession {
    pub(crate) fn run_phase(&mut self, phase: Phase, f: FeatureId, force: bool) {
        match phase {
            Phase::Inheritance => self.phase_inheritance(f),
            Phase::Declarations => self.phase_declarations(f),
            Phase::Types => self.phase_types(f, force),
            Phase::Sugar1 | Phase::Inference | Phase::Sugar2 | Phase::Boxing | Phase::Checking => {
                self.run_body_phase(phase, f)
            }
        }
    }

    /// Phases after type resolution: one pass over the body each
    fn run_body_phase(&mut self, phase: Phase, f: FeatureId) {
        let (during, done) = phase.states();
        trace!(feature = %self.qualified_name(f), ?phase, "running phase");
        self.feature_mut(f).state = during;
        match phase {
            Phase::Sugar1 => self.resolve_sugar1(f),
            Phase::Inference => self.infer_types(f),
            Phase::Sugar2 => self.resolve_sugar2(f),
            Phase::Boxing => self.box_and_tag(f),
            Phase::Checking => self.check_types(f),
            _ => {}
        }
        self.feature_mut(f).state = done;
        if let Some(next) = phase.next() {
            self.scheduler.schedule(next, f);
        }
    }

    /// Computes the visible inner features of `f`, its own declarations
    /// shadowing inherited ones, and schedules the inner features
    pub(crate) fn phase_declarations(&mut self, f: FeatureId) {
        debug!(feature = %self.qualified_name(f), "resolving declarations");
        self.feature_mut(f).state = State::ResolvingDeclarations;

        let visible = self.visible_features(f);
        self.feature_mut(f).visible = Some(visible);

        if self.feature(f).parent_types.is_none() {
            let types = self.compute_parent_types(f);
            self.feature_mut(f).parent_types = Some(types);
        }

        let inner: Vec<FeatureId> = self.feature(f).declared.values().copied().collect();
        for id in inner {
            if self.feature(id).state == State::Loaded {
                self.scheduler.schedule_inheritance(id);
            }
        }

        self.feature_mut(f).state = State::ResolvedDeclarations;
        if self.has_unsettled_args(f) {
            trace!(feature = %self.qualified_name(f), "waiting for calls");
            self.scheduler.wait_for_calls(f);
        } else {
            self.scheduler.schedule(Phase::Types, f);
        }
    }

    /// Own declarations of `f` and those inherited from its parents that
    /// it does not redefine
    pub(crate) fn visible_features(&mut self, f: FeatureId) -> BTreeMap<FeatureName, Vec<FeatureId>> {
        let parents = self.feature(f).parents.clone();
        for p in &parents {
            self.ensure_declarations(*p);
        }

        let mut visible: BTreeMap<FeatureName, Vec<FeatureId>> = self
            .feature(f)
            .declared
            .iter()
            .map(|(name, id)| (name.clone(), vec![*id]))
            .collect();
        for p in &parents {
            let inherited: Vec<(FeatureName, Vec<FeatureId>)> = match &self.feature(*p).visible {
                Some(v) => v.iter().map(|(k, ids)| (k.clone(), ids.clone())).collect(),
                None => self
                    .feature(*p)
                    .declared
                    .iter()
                    .map(|(k, id)| (k.clone(), vec![*id]))
                    .collect(),
            };
            for (name, ids) in inherited {
                let redefined = self
                    .feature(f)
                    .declared
                    .keys()
                    .any(|own| own.equals_except_id(&name));
                if redefined {
                    continue;
                }
                let entry = visible.entry(name).or_default();
                for id in ids {
                    if !entry.contains(&id) {
                        entry.push(id);
                    }
                }
            }
        }
        visible
    }

    /// Resolves every type used by `f`: generic constraints, argument and
    /// result types, parents, choice variants and the body.
    ///
    /// When the body depends on types still to be inferred from calls the
    /// feature is reset and blocked, unless `force` is set, in which case
    /// whatever is still missing becomes ERROR.
    pub(crate) fn phase_types(&mut self, f: FeatureId, force: bool) {
        debug!(feature = %self.qualified_name(f), force, "resolving types");
        self.feature_mut(f).state = State::ResolvingTypes;

        for i in 0..self.feature(f).generics.len() {
            self.declared_constraint(crate::generics::Generic::new(f, i));
        }
        let args = self.feature(f).args.clone();
        for arg in args {
            self.result_type(arg);
        }
        if matches!(self.feature(f).result, ResultSource::Declared(_)) {
            self.result_type(f);
        }
        if self.feature(f).is_choice() {
            let own = self.current_type(f);
            self.choice_variants(own);
        }

        let cx = Cx::new(self.body_level(f), self.body_context(f), force);

        let mut inherits = std::mem::take(&mut self.feature_mut(f).inherits);
        let mut ready = true;
        for e in &mut inherits {
            ready &= self.resolve_expr(e, &cx, None).is_some();
        }
        self.feature_mut(f).inherits = inherits;

        let expected = self.value_type(f);
        let mut body_type = None;
        if let Some(mut body) = self.feature_mut(f).body.take() {
            body_type = self.resolve_expr(&mut body, &cx, expected);
            ready &= body_type.is_some();
            self.feature_mut(f).body = Some(body);
        }

        if (!ready || cx.is_blocked()) && !force {
            trace!(feature = %self.qualified_name(f), "types blocked");
            self.feature_mut(f).state = State::ResolvedDeclarations;
            self.scheduler.block(f);
            return;
        }

        match self.feature(f).result {
            ResultSource::Inferred if !self.feature(f).is_local => {
                let t = match body_type {
                    Some(t) => t,
                    None if self.feature(f).body.is_none() => self.builtin_type(Builtin::Unit),
                    None => {
                        self.report(TypecheckError::CyclicTypeInference {
                            feature: self.qualified_name(f),
                            span: self.feature(f).span.into(),
                        });
                        TypeId::ERROR
                    }
                };
                self.feature_mut(f).result_type = Some(t);
            }
            ResultSource::Constructor => {
                self.result_type(f);
            }
            _ => {}
        }

        self.feature_mut(f).state = State::ResolvedTypes;
        self.scheduler.schedule(Phase::Sugar1, f);
    }

    /// The feature whose inner features the body of `f` sees first: the
    /// outer feature for field initial values
    pub(crate) fn body_level(&self, f: FeatureId) -> FeatureId {
        let feature = self.feature(f);
        if feature.is_field() {
            feature.outer.unwrap_or(FeatureId::UNIVERSE)
        } else {
            f
        }
    }

    pub(crate) fn body_context(&self, f: FeatureId) -> Context {
        Context::for_feature(self, self.body_level(f))
    }

    /// Type the body value of `f` must have, if it is constrained: the field
    /// type of fields and the declared result of routines
    pub(crate) fn value_type(&mut self, f: FeatureId) -> Option<TypeId> {
        let feature = self.feature(f);
        let constrained = feature.is_field() || matches!(feature.result, ResultSource::Declared(_));
        if !constrained || feature.result_field.is_some() {
            return None;
        }
        let t = self.result_type(f)?;
        let unit = self.builtin_type(Builtin::Unit);
        if t == unit && !self.feature(f).is_field() {
            None
        } else {
            Some(t)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_phase_states_follow_each_other() {
        let mut previous = State::Loaded;
        for phase in Phase::ALL {
            assert_eq!(phase.ready_state(), previous);
            let (during, done) = phase.states();
            assert!(during > previous && done > during);
            previous = done;
        }
        assert_eq!(previous, State::Resolved);
        assert_eq!(Phase::Checking.next(), None);
    }
}
