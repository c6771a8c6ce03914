//! The compilation session: every piece of state one resolution run needs.
//!
//! Feature arena, type interning table, diagnostics, unique-name counters,
//! built-in registry and work lists all live here and are threaded through
//! every resolution step as `&mut CompilationSession`. A session is created
//! per compilation unit and can be [`reset`](CompilationSession::reset).

use crate::diagnostics::Diagnostics;
use crate::error::{TypecheckError, TypecheckResult};
use crate::features::{Feature, FeatureId, FeatureKind, FeatureName, ResultSource, State};
use crate::generics::Generic;
use crate::inheritance::InheritanceGraph;
use crate::options::ResolverOptions;
use crate::scheduler::Scheduler;
use crate::typed_ast::Expr;
use crate::types::{TypeId, TypeInterner};
use fz_ast::{Program, Span};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Declarations the resolver itself refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Any,
    Void,
    Unit,
    Bool,
    I32,
    I64,
    U8,
    F32,
    F64,
    String,
    Nil,
    Option,
    Function,
    Lazy,
}

impl Builtin {
    pub const ALL: [Builtin; 14] = [
        Builtin::Any,
        Builtin::Void,
        Builtin::Unit,
        Builtin::Bool,
        Builtin::I32,
        Builtin::I64,
        Builtin::U8,
        Builtin::F32,
        Builtin::F64,
        Builtin::String,
        Builtin::Nil,
        Builtin::Option,
        Builtin::Function,
        Builtin::Lazy,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Any => "Any",
            Builtin::Void => "void",
            Builtin::Unit => "unit",
            Builtin::Bool => "bool",
            Builtin::I32 => "i32",
            Builtin::I64 => "i64",
            Builtin::U8 => "u8",
            Builtin::F32 => "f32",
            Builtin::F64 => "f64",
            Builtin::String => "String",
            Builtin::Nil => "nil",
            Builtin::Option => "option",
            Builtin::Function => "Function",
            Builtin::Lazy => "Lazy",
        }
    }
}

pub struct CompilationSession {
    pub(crate) options: ResolverOptions,
    pub(crate) features: Vec<Feature>,
    pub(crate) types: TypeInterner,
    pub(crate) diagnostics: Diagnostics,
    pub(crate) builtins: HashMap<Builtin, FeatureId>,
    pub(crate) scheduler: Scheduler,
    pub(crate) inheritance: InheritanceGraph,
    /// Actual argument types of calls, per argument whose type is inferred from calls
    pub(crate) arg_contributions: HashMap<FeatureId, Vec<(TypeId, Span)>>,
    counters: HashMap<String, usize>,
    fatal: Option<TypecheckError>,
}

impl CompilationSession {
    pub fn new(options: ResolverOptions) -> Self {
        let mut session = Self {
            types: TypeInterner::new(options.max_types),
            diagnostics: Diagnostics::new(options.max_errors),
            options,
            features: Vec::new(),
            builtins: HashMap::new(),
            scheduler: Scheduler::default(),
            inheritance: InheritanceGraph::new(),
            arg_contributions: HashMap::new(),
            counters: HashMap::new(),
            fatal: None,
        };

        let mut universe = Feature::new(
            FeatureName::new("#universe", 0),
            None,
            FeatureKind::Routine,
            Span::default(),
        );
        universe.body = Some(Expr::block(Vec::new(), Span::default()));
        session.features.push(universe);

        let mut error = Feature::new(
            FeatureName::new("#error", 0),
            Some(FeatureId::UNIVERSE),
            FeatureKind::Abstract,
            Span::default(),
        );
        error.result = ResultSource::Fixed;
        error.result_type = Some(TypeId::ERROR);
        error.state = State::Error;
        session.features.push(error);

        session.scheduler.schedule_inheritance(FeatureId::UNIVERSE);
        if session.options.load_prelude {
            session.load_prelude();
        }
        session
    }

    /// Start over with a fresh unit, keeping the options
    pub fn reset(&mut self) {
        *self = CompilationSession::new(self.options.clone());
    }

    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    /// Collect the declarations of `program` into the universe
    pub fn add_program(&mut self, program: &Program) {
        for decl in &program.features {
            self.collect_feature(decl, FeatureId::UNIVERSE);
        }
    }

    /// Run the scheduler until every feature is resolved.
    ///
    /// Only fatal conditions are returned as `Err`; all other problems are in
    /// [`CompilationSession::diagnostics`].
    pub fn resolve(&mut self) -> TypecheckResult<()> {
        let result = self.run_scheduler();
        self.diagnostics.sort_by_location();
        result
    }

    // Feature arena

    pub fn feature(&self, id: FeatureId) -> &Feature {
        &self.features[id.index()]
    }

    pub(crate) fn feature_mut(&mut self, id: FeatureId) -> &mut Feature {
        &mut self.features[id.index()]
    }

    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    pub(crate) fn add_feature(&mut self, feature: Feature) -> FeatureId {
        if self.features.len() >= self.options.max_features && self.fatal.is_none() {
            self.set_fatal(format!(
                "more than {} features, identifier space exhausted",
                self.options.max_features
            ));
        }
        let id = FeatureId(self.features.len() as u32);
        self.features.push(feature);
        id
    }

    /// Unique name for a synthesized feature, `#fun0`, `#fun1`, ...
    pub(crate) fn fresh_name(&mut self, prefix: &str) -> String {
        let counter = self.counters.entry(prefix.to_string()).or_insert(0);
        let name = format!("{prefix}{counter}");
        *counter += 1;
        name
    }

    pub fn builtin(&self, builtin: Builtin) -> Option<FeatureId> {
        self.builtins.get(&builtin).copied()
    }

    pub(crate) fn is_builtin(&self, feature: FeatureId, builtin: Builtin) -> bool {
        self.builtin(builtin) == Some(feature)
    }

    /// Do `a` and `b` denote the same type parameter, directly or through a
    /// precondition clone?
    pub(crate) fn same_or_clone(&self, a: Generic, b: Generic) -> bool {
        if a == b {
            return true;
        }
        if a.index != b.index {
            return false;
        }
        let related = self.feature(a.feature).clone_of == Some(b.feature)
            || self.feature(b.feature).clone_of == Some(a.feature);
        let same_name = match (
            self.feature(a.feature).generics.get(a.index),
            self.feature(b.feature).generics.get(b.index),
        ) {
            (Some(x), Some(y)) => x.name == y.name,
            _ => false,
        };
        related && same_name
    }

    // Diagnostics

    pub(crate) fn report(&mut self, error: TypecheckError) {
        debug!(%error, "diagnostic");
        self.diagnostics.add_diagnostic(error);
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.error_count()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }

    pub(crate) fn set_fatal(&mut self, message: String) {
        warn!(message = message.as_str(), "fatal resolution error");
        let error = TypecheckError::fatal(message);
        self.diagnostics.add_diagnostic(error.clone());
        self.fatal = Some(error);
    }

    /// The fatal error that aborts the run, if one occurred
    pub(crate) fn check_fatal(&mut self) -> TypecheckResult<()> {
        if self.fatal.is_none() && self.types.is_exhausted() {
            self.set_fatal(format!(
                "more than {} types, identifier space exhausted",
                self.options.max_types
            ));
        }
        match &self.fatal {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    /// Internal consistency check. Violations are programming errors unless
    /// some earlier error already explains them.
    pub(crate) fn check_consistency(&self, ok: bool, what: &str) {
        if !ok {
            if self.has_errors() {
                debug!(what, "inconsistency after earlier errors");
            } else {
                warn!(what, "internal consistency check failed");
            }
        }
    }

    // Queries for consumers of the resolved tree

    /// Fully qualified name, `outer.inner`
    pub fn qualified_name(&self, id: FeatureId) -> String {
        let f = self.feature(id);
        match f.outer {
            Some(outer) if outer != FeatureId::UNIVERSE => {
                format!("{}.{}", self.qualified_name(outer), f.base_name())
            }
            _ => f.base_name().to_string(),
        }
    }

    /// Feature by dotted path of base names, picking the overload with the
    /// fewest arguments at each step
    pub fn find_feature(&self, path: &str) -> Option<FeatureId> {
        let mut current = FeatureId::UNIVERSE;
        for segment in path.split('.') {
            let (lo, hi) = FeatureName::base_range(segment);
            current = *self.feature(current).declared.range(lo..=hi).next()?.1;
        }
        Some(current)
    }

    /// Feature by dotted path whose last segment has exactly `arg_count` arguments
    pub fn find_overload(&self, path: &str, arg_count: usize) -> Option<FeatureId> {
        let (outer, name) = match path.rsplit_once('.') {
            Some((outer, name)) => (self.find_feature(outer)?, name),
            None => (FeatureId::UNIVERSE, path),
        };
        self.feature(outer)
            .declared
            .iter()
            .find(|(key, _)| key.base() == name && key.arg_count() == arg_count)
            .map(|(_, id)| *id)
    }

    /// Resolved body (routines) or initial value (fields)
    pub fn body(&self, id: FeatureId) -> Option<&Expr> {
        self.feature(id).body.as_ref()
    }

    /// Result type once resolved
    pub fn result_type_of(&self, id: FeatureId) -> Option<TypeId> {
        self.feature(id).result_type
    }

    pub fn state(&self, id: FeatureId) -> State {
        self.feature(id).state
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }
}

impl Default for CompilationSession {
    fn default() -> Self {
        Self::new(ResolverOptions::default())
    }
}
