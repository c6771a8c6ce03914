//! Inheritance resolution using petgraph
//!
//! Parents named in `inherits` clauses are looked up from the outer feature
//! of the heir. Every resolved edge is recorded in an [`InheritanceGraph`];
//! reaching a feature whose own inheritance is still being resolved means a
//! cycle, which is reported with all of its members and then broken by
//! dropping the closing edge.

use crate::error::TypecheckError;
use crate::features::{FeatureId, State};
use crate::lookup::{CallShape, Candidate, Lookup};
use crate::session::{Builtin, CompilationSession};
use crate::typed_ast::{Call, CallState, Expr, ExprKind};
use crate::types::TypeId;
use petgraph::graph::NodeIndex;
use petgraph::{algo, Graph as PetGraph};
use std::collections::HashMap;
use tracing::debug;

/// Heir to parent edges between features
#[derive(Debug, Clone, Default)]
pub struct InheritanceGraph {
    graph: PetGraph<FeatureId, ()>,
    nodes: HashMap<FeatureId, NodeIndex>,
}

impl InheritanceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn node(&mut self, feature: FeatureId) -> NodeIndex {
        if let Some(&node) = self.nodes.get(&feature) {
            node
        } else {
            let node = self.graph.add_node(feature);
            self.nodes.insert(feature, node);
            node
        }
    }

    pub fn add_edge(&mut self, heir: FeatureId, parent: FeatureId) {
        let from = self.node(heir);
        let to = self.node(parent);
        self.graph.add_edge(from, to, ());
    }

    pub fn remove_edge(&mut self, heir: FeatureId, parent: FeatureId) {
        if let (Some(&from), Some(&to)) = (self.nodes.get(&heir), self.nodes.get(&parent)) {
            if let Some(edge) = self.graph.find_edge(from, to) {
                self.graph.remove_edge(edge);
            }
        }
    }

    /// Members of the cycle through `feature`, if there is one
    pub fn cycle_through(&self, feature: FeatureId) -> Option<Vec<FeatureId>> {
        let node = *self.nodes.get(&feature)?;
        let self_loop = self.graph.find_edge(node, node).is_some();
        algo::tarjan_scc(&self.graph)
            .into_iter()
            .find(|scc| scc.contains(&node) && (scc.len() > 1 || self_loop))
            .map(|scc| {
                let mut members: Vec<FeatureId> = scc.iter().map(|n| self.graph[*n]).collect();
                members.sort();
                members
            })
    }
}

impl CompilationSession {
    /// Runs the inheritance phase of `f` unless it already ran
    pub(crate) fn ensure_inheritance(&mut self, f: FeatureId) {
        if self.feature(f).state == State::Loaded {
            self.phase_inheritance(f);
        }
    }

    pub(crate) fn phase_inheritance(&mut self, f: FeatureId) {
        debug!(feature = %self.qualified_name(f), "resolving inheritance");
        self.feature_mut(f).state = State::ResolvingInheritance;

        self.add_implicit_parent(f);
        let mut inherits = std::mem::take(&mut self.feature_mut(f).inherits);
        let mut parents = Vec::new();
        for e in &mut inherits {
            let ExprKind::Call(call) = &mut e.kind else {
                continue;
            };
            if let Some(p) = call.callee {
                // implicit parent
                self.ensure_inheritance(p);
                self.inheritance.add_edge(f, p);
                parents.push(p);
                continue;
            }
            let Some(p) = self.find_parent(f, call) else {
                call.fail();
                continue;
            };
            self.inheritance.add_edge(f, p);
            self.ensure_inheritance(p);
            if self.feature(p).state == State::ResolvingInheritance {
                self.report_inheritance_cycle(f, p, call);
                self.inheritance.remove_edge(f, p);
                call.fail();
                continue;
            }
            call.callee = Some(p);
            call.state = CallState::CalleeKnown;
            parents.push(p);
        }

        let feature = self.feature_mut(f);
        feature.inherits = inherits;
        feature.parents = parents;
        feature.state = State::ResolvedInheritance;
        self.scheduler.schedule_declarations(f);
    }

    /// Every constructor and choice inherits `Any` unless told otherwise
    fn add_implicit_parent(&mut self, f: FeatureId) {
        let Some(any) = self.builtin(Builtin::Any) else {
            return;
        };
        let feature = self.feature(f);
        let exempt = f == FeatureId::UNIVERSE
            || f == any
            || self.is_builtin(f, Builtin::Void)
            || feature.is_argument
            || feature.is_local
            || !feature.defines_type()
            || !feature.inherits.is_empty();
        if exempt {
            return;
        }
        let span = feature.span;
        let mut call = Call::new("Any", None, Vec::new(), span);
        call.flags.inheritance = true;
        call.callee = Some(any);
        call.state = CallState::CalleeKnown;
        self.feature_mut(f).inherits.push(call.into_expr());
    }

    /// The feature an `inherits` call names, looked up from the heir's outer feature
    fn find_parent(&mut self, heir: FeatureId, call: &Call) -> Option<FeatureId> {
        let shape = CallShape {
            name: &call.name,
            arg_count: call.actuals.len(),
            parenthesized: call.parenthesized,
            choice_heir: self.feature(heir).is_choice(),
        };
        let lookup = match &call.target {
            None => {
                let start = self.feature(heir).outer.unwrap_or(FeatureId::UNIVERSE);
                self.lookup_for_inheritance(start, &shape, true)
            }
            Some(target) => match self.inheritance_target(heir, target) {
                Some(outer) => self.lookup_for_inheritance(outer, &shape, false),
                None => return None,
            },
        };
        match lookup {
            Lookup::Found(c) => Some(c.feature),
            Lookup::NotFound => {
                self.report(TypecheckError::UnresolvedName {
                    name: call.name.clone(),
                    what: "parent feature".to_string(),
                    span: call.span.into(),
                });
                None
            }
            Lookup::Ambiguous(candidates) => {
                let candidates = self.candidate_names(&candidates);
                self.report(TypecheckError::AmbiguousName {
                    name: call.name.clone(),
                    candidates,
                    span: call.span.into(),
                });
                None
            }
        }
    }

    /// Outer feature named by the target of a qualified `inherits a.b` call
    fn inheritance_target(&mut self, heir: FeatureId, target: &Expr) -> Option<FeatureId> {
        let ExprKind::Call(call) = &target.kind else {
            return None;
        };
        let call = call.as_ref().clone();
        self.find_parent(heir, &call)
    }

    /// Lookup during inheritance resolution, before declarations are
    /// resolved: declared inner features are used where visible ones are
    /// not available yet
    fn lookup_for_inheritance(&mut self, from: FeatureId, shape: &CallShape, walk: bool) -> Lookup {
        let mut level = Some(from);
        while let Some(outer) = level {
            let candidates: Vec<Candidate> = self
                .members(outer, shape.name)
                .into_iter()
                .filter(|id| self.feature(*id).defines_type())
                .map(|feature| Candidate { feature, outer })
                .collect();
            let found = crate::lookup::select_candidate(
                candidates,
                |c| self.feature(c.feature).arg_count() == shape.arg_count,
                |_| false,
            );
            match found {
                Lookup::NotFound if walk => level = self.feature(outer).outer,
                other => return other,
            }
        }
        Lookup::NotFound
    }

    fn report_inheritance_cycle(&mut self, heir: FeatureId, parent: FeatureId, call: &Call) {
        let members = self
            .inheritance
            .cycle_through(heir)
            .unwrap_or_else(|| vec![heir, parent]);
        let cycle = members
            .iter()
            .map(|m| format!("`{}`", self.qualified_name(*m)))
            .collect::<Vec<_>>()
            .join(" -> ");
        self.report(TypecheckError::CyclicInheritance {
            feature: self.qualified_name(heir),
            cycle,
            span: call.span.into(),
        });
    }

    /// Types of the parents named in the resolved `inherits` calls of `f`
    pub(crate) fn compute_parent_types(&mut self, f: FeatureId) -> Vec<TypeId> {
        let mut inherits = std::mem::take(&mut self.feature_mut(f).inherits);
        let mut types = Vec::new();
        for e in &mut inherits {
            let ExprKind::Call(call) = &mut e.kind else {
                continue;
            };
            let Some(parent) = call.callee.filter(|p| !p.is_error()) else {
                continue;
            };
            let mut generics = Vec::new();
            if let Some(explicit) = &mut call.explicit_generics {
                for g in explicit.iter_mut() {
                    generics.push(self.resolve_type_ref(g, f));
                }
            }
            let formals = &self.feature(parent).generics;
            if !formals.size_matches(generics.len()) {
                let expected = formals.size_text();
                self.report(TypecheckError::GenericArityMismatch {
                    name: call.name.clone(),
                    expected,
                    found: generics.len(),
                    span: call.span.into(),
                });
                generics = vec![TypeId::ERROR; self.feature(parent).generics.len()];
            }
            let outer = self.feature(parent).outer.and_then(|o| self.outer_type_for(o));
            types.push(self.constructor_type(parent, generics, outer));
        }
        self.feature_mut(f).inherits = inherits;
        types
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cycle_through_reports_all_members() {
        let mut graph = InheritanceGraph::new();
        let (a, b, c, d) = (FeatureId(10), FeatureId(11), FeatureId(12), FeatureId(13));
        graph.add_edge(a, b);
        graph.add_edge(b, c);
        graph.add_edge(c, a);
        graph.add_edge(d, a);

        assert_eq!(graph.cycle_through(b), Some(vec![a, b, c]));
        assert_eq!(graph.cycle_through(d), None);
    }

    #[test]
    fn test_self_loop_is_a_cycle() {
        let mut graph = InheritanceGraph::new();
        let a = FeatureId(10);
        graph.add_edge(a, a);
        assert_eq!(graph.cycle_through(a), Some(vec![a]));

        graph.remove_edge(a, a);
        assert_eq!(graph.cycle_through(a), None);
    }
}
