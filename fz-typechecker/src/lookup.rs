//! Name and overload resolution.
//!
//! Candidates are gathered per outer feature from the visible (declared and
//! inherited) inner features. Exact Name Key matches beat near matches
//! admitted by a filter; one survivor is the result, none is "not found"
//! and several are ambiguous.

use crate::features::{FeatureId, FeatureName};
use crate::session::CompilationSession;

/// A feature found under some name, and the outer feature it was found in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub feature: FeatureId,
    pub outer: FeatureId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    NotFound,
    Found(Candidate),
    Ambiguous(Vec<Candidate>),
}

/// What a call site asks for
#[derive(Debug, Clone, Copy)]
pub(crate) struct CallShape<'a> {
    pub name: &'a str,
    pub arg_count: usize,
    pub parenthesized: bool,
    /// Part of the inheritance clause of a choice declaration, the only
    /// place a choice may be called
    pub choice_heir: bool,
}

/// Picks the unique candidate: exact matches win over admitted ones.
pub fn select_candidate(
    candidates: Vec<Candidate>,
    exact: impl Fn(&Candidate) -> bool,
    admit: impl Fn(&Candidate) -> bool,
) -> Lookup {
    let mut unique: Vec<Candidate> = Vec::new();
    for c in candidates {
        if !unique.iter().any(|u| u.feature == c.feature) {
            unique.push(c);
        }
    }
    let exact_matches: Vec<Candidate> = unique.iter().copied().filter(|c| exact(c)).collect();
    let mut survivors = if exact_matches.is_empty() {
        unique.into_iter().filter(|c| admit(c)).collect()
    } else {
        exact_matches
    };
    match survivors.len() {
        0 => Lookup::NotFound,
        1 => Lookup::Found(survivors.remove(0)),
        _ => Lookup::Ambiguous(survivors),
    }
}

impl CompilationSession {
    /// Inner features of `outer` with base name `base`, inherited ones
    /// included once declarations of `outer` are resolved
    pub(crate) fn members(&self, outer: FeatureId, base: &str) -> Vec<FeatureId> {
        let (lo, hi) = FeatureName::base_range(base);
        let f = self.feature(outer);
        match &f.visible {
            Some(visible) => visible
                .range(lo..=hi)
                .flat_map(|(_, ids)| ids.iter().copied())
                .collect(),
            None => f.declared.range(lo..=hi).map(|(_, id)| *id).collect(),
        }
    }

    fn is_exact(&self, c: &Candidate, shape: &CallShape) -> bool {
        self.feature(c.feature).arg_count() == shape.arg_count
    }

    /// Near matches: an open argument list absorbing the actuals, or an
    /// argument-less feature whose result is called immediately
    fn is_admitted(&self, c: &Candidate, shape: &CallShape) -> bool {
        let f = self.feature(c.feature);
        (f.has_open_arg_list && shape.arg_count + 1 >= f.arg_count())
            || (f.arg_count() == 0 && shape.parenthesized && shape.arg_count > 0)
    }

    fn candidates_in(&mut self, outer: FeatureId, shape: &CallShape) -> Vec<Candidate> {
        self.ensure_declarations(outer);
        self.members(outer, shape.name)
            .into_iter()
            .filter(|id| shape.choice_heir || !self.feature(*id).is_choice())
            .map(|feature| Candidate { feature, outer })
            .collect()
    }

    fn select(&self, candidates: Vec<Candidate>, shape: &CallShape) -> Lookup {
        select_candidate(
            candidates,
            |c| self.is_exact(c, shape),
            |c| self.is_admitted(c, shape),
        )
    }

    /// Lookup of a call with an explicit target whose type is bound to `outer`
    pub(crate) fn lookup_in(&mut self, outer: FeatureId, shape: &CallShape) -> Lookup {
        let candidates = self.candidates_in(outer, shape);
        self.select(candidates, shape)
    }

    /// Lookup of a call without target, walking outward from `from`. The
    /// nearest level with any matching candidate decides.
    pub(crate) fn lookup_no_target(&mut self, from: FeatureId, shape: &CallShape) -> Lookup {
        let mut level = Some(from);
        while let Some(outer) = level {
            let candidates = self.candidates_in(outer, shape);
            match self.select(candidates, shape) {
                Lookup::NotFound => level = self.feature(outer).outer,
                found => return found,
            }
        }
        Lookup::NotFound
    }

    /// Comma separated qualified names for diagnostics
    pub(crate) fn candidate_names(&self, candidates: &[Candidate]) -> String {
        candidates
            .iter()
            .map(|c| format!("`{}`", self.qualified_name(c.feature)))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn candidate(feature: u32) -> Candidate {
        Candidate {
            feature: FeatureId(feature),
            outer: FeatureId::UNIVERSE,
        }
    }

    #[test]
    fn test_exact_beats_admitted_in_any_order() {
        let exact = |c: &Candidate| c.feature == FeatureId(7);
        let admit = |_: &Candidate| true;

        let forward = select_candidate(vec![candidate(5), candidate(7)], exact, admit);
        let backward = select_candidate(vec![candidate(7), candidate(5)], exact, admit);

        assert_eq!(forward, Lookup::Found(candidate(7)));
        assert_eq!(backward, Lookup::Found(candidate(7)));
    }

    #[test]
    fn test_two_exact_candidates_are_ambiguous() {
        let result = select_candidate(vec![candidate(5), candidate(6)], |_| true, |_| false);
        assert_eq!(result, Lookup::Ambiguous(vec![candidate(5), candidate(6)]));
    }

    #[test]
    fn test_duplicates_collapse() {
        let result = select_candidate(vec![candidate(5), candidate(5)], |_| true, |_| false);
        assert_eq!(result, Lookup::Found(candidate(5)));
    }

    #[test]
    fn test_nothing_admitted_is_not_found() {
        let result = select_candidate(vec![candidate(5)], |_| false, |_| false);
        assert_eq!(result, Lookup::NotFound);
    }
}
