//! Declaration collection.
//!
//! Parsed declarations become entries of the feature arena, registered in
//! the `declared` map of their outer feature under their Name Key. Bodies are
//! converted into the typed tree on the way: `let` expressions become local
//! fields with assignments, bare names referring to a local in scope get a
//! hint so that they bypass name lookup, and preconditions move into a
//! precondition feature cloning the formal generics and arguments.
//!
//! Library features are added fully resolved, with their generics and
//! parents; the scheduler never runs a phase for them.

use crate::error::TypecheckError;
use crate::features::{Feature, FeatureId, FeatureKind, FeatureName, ResultSource, State};
use crate::generics::{FormalGenerics, Generic, GenericDecl};
use crate::session::{Builtin, CompilationSession};
use crate::typed_ast::{
    Assign, Call, Case, ConstValue, Constant, Current, Expr, ExprKind, If, Match, Pattern, Section,
    TypeRef, TypeTest,
};
use crate::types::TypeId;
use fz_ast::{self as ast, Span, UnresolvedType};
use std::collections::BTreeMap;
use tracing::trace;

/// Locals visible at some point of a body, innermost last
#[derive(Debug, Default)]
struct Scope {
    locals: Vec<(String, FeatureId)>,
}

impl Scope {
    fn find(&self, name: &str) -> Option<FeatureId> {
        self.locals
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, id)| *id)
    }

    fn enter(&self) -> usize {
        self.locals.len()
    }

    fn leave(&mut self, mark: usize) {
        self.locals.truncate(mark);
    }
}

/// Type in a library declaration, which may mention the formal generics of
/// the declaration before it has an id
#[derive(Debug, Clone, PartialEq)]
pub enum LibraryType {
    Known(TypeId),
    /// Formal generic of the declaration itself, by index
    Generic(usize),
    /// A constructor or choice applied to actual generics
    Of(FeatureId, Vec<LibraryType>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LibraryGeneric {
    pub name: String,
    /// `Any` when absent
    pub constraint: Option<LibraryType>,
    pub open: bool,
}

/// A declaration as read from a compiled library: the same signature a
/// source declaration has, with every type already resolved
#[derive(Debug, Clone, PartialEq)]
pub struct LibraryFeature {
    pub name: String,
    pub kind: FeatureKind,
    pub is_ref: bool,
    pub generics: Vec<LibraryGeneric>,
    pub args: Vec<(String, LibraryType)>,
    /// `None` for constructors, whose result is their own type
    pub result: Option<LibraryType>,
    /// Parent types; constructors without any inherit `Any`
    pub parents: Vec<LibraryType>,
}

impl LibraryFeature {
    pub fn new(name: &str, kind: FeatureKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            is_ref: false,
            generics: Vec::new(),
            args: Vec::new(),
            result: None,
            parents: Vec::new(),
        }
    }

    pub fn type_param(mut self, name: &str, constraint: Option<LibraryType>) -> Self {
        self.generics.push(LibraryGeneric {
            name: name.to_string(),
            constraint,
            open: false,
        });
        self
    }

    pub fn open_type_param(mut self, name: &str) -> Self {
        self.generics.push(LibraryGeneric {
            name: name.to_string(),
            constraint: None,
            open: true,
        });
        self
    }

    pub fn arg(mut self, name: &str, ty: LibraryType) -> Self {
        self.args.push((name.to_string(), ty));
        self
    }

    pub fn returns(mut self, ty: LibraryType) -> Self {
        self.result = Some(ty);
        self
    }

    pub fn inherits(mut self, parent: LibraryType) -> Self {
        self.parents.push(parent);
        self
    }

    pub fn reference(mut self) -> Self {
        self.is_ref = true;
        self
    }
}

fn source_kind(kind: &ast::FeatureKind) -> FeatureKind {
    match kind {
        ast::FeatureKind::Routine(_) => FeatureKind::Routine,
        ast::FeatureKind::Field(_) => FeatureKind::Field,
        ast::FeatureKind::Abstract => FeatureKind::Abstract,
        ast::FeatureKind::Intrinsic => FeatureKind::Intrinsic,
        ast::FeatureKind::Choice(_) => FeatureKind::Choice,
    }
}

fn result_source(decl: &ast::FeatureDecl, kind: FeatureKind) -> ResultSource {
    match (&decl.result, kind) {
        (ast::ResultDecl::Declared(t), _) => ResultSource::Declared(TypeRef::new(t.clone())),
        (ast::ResultDecl::Constructor, FeatureKind::Routine | FeatureKind::Choice) => ResultSource::Constructor,
        // abstract and intrinsic features without result type return unit
        (ast::ResultDecl::Constructor, FeatureKind::Abstract | FeatureKind::Intrinsic) => {
            ResultSource::Declared(TypeRef::new(UnresolvedType {
                name: Builtin::Unit.name().to_string(),
                generics: Vec::new(),
                outer: None,
                mode: None,
                open: false,
                span: decl.span,
            }))
        }
        _ => ResultSource::Inferred,
    }
}

impl CompilationSession {
    /// Adds `decl` and everything declared inside it below `outer`
    pub(crate) fn collect_feature(&mut self, decl: &ast::FeatureDecl, outer: FeatureId) -> FeatureId {
        let kind = source_kind(&decl.kind);
        let mut feature = Feature::new(FeatureName::new(decl.name.clone(), decl.args.len()), Some(outer), kind, decl.span);
        feature.is_ref = decl.is_ref;
        feature.generics = FormalGenerics::new(
            decl.type_params
                .iter()
                .map(|p| GenericDecl {
                    name: p.name.clone(),
                    constraint: p.constraint.clone().map(TypeRef::new),
                    open: p.open,
                    span: p.span,
                })
                .collect(),
        );
        feature.result = result_source(decl, kind);
        if let ast::FeatureKind::Choice(variants) = &decl.kind {
            feature.variants = variants.iter().cloned().map(TypeRef::new).collect();
        }
        let f = self.add_feature(feature);
        self.register(outer, f);

        for arg in &decl.args {
            self.collect_argument(f, arg);
        }
        for inner in &decl.inner {
            self.collect_feature(inner, f);
        }

        let mut scope = Scope::default();
        let inherits: Vec<Expr> = decl
            .inherits
            .iter()
            .map(|c| {
                let mut call = self.convert_call(c, f, &mut scope);
                call.flags.inheritance = true;
                call.into_expr()
            })
            .collect();
        self.feature_mut(f).inherits = inherits;

        // field initial values are evaluated in the outer feature
        let level = if kind == FeatureKind::Field { outer } else { f };
        let body = match &decl.kind {
            ast::FeatureKind::Routine(block) => Some(self.convert_block(block, level, &mut scope)),
            ast::FeatureKind::Field(Some(value)) => Some(self.convert_expr(value, level, &mut scope)),
            _ => None,
        };
        self.feature_mut(f).body = body;

        if !decl.preconditions.is_empty() {
            self.collect_precondition(f, decl);
        }
        trace!(feature = %self.qualified_name(f), "collected");
        f
    }

    fn collect_argument(&mut self, f: FeatureId, arg: &ast::ArgDecl) {
        let mut feature = Feature::new(FeatureName::new(arg.name.clone(), 0), Some(f), FeatureKind::Field, arg.span);
        feature.is_argument = true;
        feature.result = match &arg.ty {
            Some(t) => ResultSource::Declared(TypeRef::new(t.clone())),
            None => ResultSource::FromCalls,
        };
        feature.visible = Some(BTreeMap::new());
        feature.parent_types = Some(Vec::new());
        feature.state = State::ResolvedDeclarations;
        let open = arg.ty.as_ref().is_some_and(|t| t.open);
        let id = self.add_feature(feature);
        self.register(f, id);
        let owner = self.feature_mut(f);
        owner.args.push(id);
        owner.has_open_arg_list |= open;
    }

    /// `pre` conditions of `f` become the body of a sibling feature with
    /// cloned generics and arguments. `T : X` tests among them constrain
    /// `T` in the body of `f`.
    fn collect_precondition(&mut self, f: FeatureId, decl: &ast::FeatureDecl) {
        let outer = self.feature(f).outer.unwrap_or(FeatureId::UNIVERSE);
        let name = FeatureName::new(format!("#pre_{}", decl.name), decl.args.len());
        let mut clone = Feature::new(name, Some(outer), FeatureKind::Routine, decl.span);
        clone.generics = self.feature(f).generics.clone();
        clone.clone_of = Some(f);
        clone.result = ResultSource::Fixed;
        clone.result_type = self.builtin(Builtin::Unit).map(|_| self.builtin_type(Builtin::Unit));
        let c = self.add_feature(clone);
        self.register(outer, c);

        for arg in self.feature(f).args.clone() {
            let original = self.feature(arg);
            let mut cloned = Feature::new(original.name.clone(), Some(c), FeatureKind::Field, original.span);
            cloned.is_argument = true;
            cloned.result = ResultSource::CloneOf(arg);
            cloned.visible = Some(BTreeMap::new());
            cloned.parent_types = Some(Vec::new());
            cloned.state = State::ResolvedDeclarations;
            let id = self.add_feature(cloned);
            self.register(c, id);
            self.feature_mut(c).args.push(id);
        }

        let mut scope = Scope::default();
        let mut conditions = Vec::with_capacity(decl.preconditions.len());
        for condition in &decl.preconditions {
            if let ast::ExprKind::TypeTest(test) = &condition.kind {
                if let Some(index) = self.feature(f).generics.index_of(&test.param.name) {
                    let constraint = TypeRef::new(test.constraint.clone());
                    self.feature_mut(f).pre_constraints.push((Generic::new(f, index), constraint));
                }
            }
            conditions.push(self.convert_expr(condition, c, &mut scope));
        }
        self.feature_mut(c).body = Some(Expr::block(conditions, decl.span));
        self.feature_mut(f).precondition = Some(c);
    }

    /// Enters `id` into the declarations of `outer`. A feature added after
    /// `outer` resolved its declarations becomes visible and is scheduled
    /// right away.
    fn register(&mut self, outer: FeatureId, id: FeatureId) {
        let name = self.feature(id).name.clone();
        if let Some(first) = self.feature(outer).declared.get(&name).copied() {
            if !name.base().starts_with('#') {
                self.report(TypecheckError::DuplicateDeclaration {
                    name: self.qualified_name(id),
                    span: self.feature(id).span.into(),
                    first: self.feature(first).span.into(),
                });
            }
            return;
        }
        let resolved = self.feature(outer).state.at_least(State::ResolvedDeclarations);
        let owner = self.feature_mut(outer);
        owner.declared.insert(name.clone(), id);
        if resolved {
            if let Some(visible) = &mut owner.visible {
                visible.entry(name).or_default().push(id);
            }
            if self.feature(id).state == State::Loaded {
                self.scheduler.schedule_inheritance(id);
            }
        }
    }

    // Synthesized features

    /// A local field of `outer` that is not looked up by name: `let`
    /// variables, match bindings and compiler temporaries
    pub(crate) fn add_local(&mut self, outer: FeatureId, name: String, result: ResultSource, span: Span) -> FeatureId {
        let mut feature = Feature::new(FeatureName::new(name, 0), Some(outer), FeatureKind::Field, span);
        feature.is_local = true;
        feature.result = result;
        feature.visible = Some(BTreeMap::new());
        feature.parent_types = Some(Vec::new());
        feature.state = State::ResolvedDeclarations;
        self.add_feature(feature)
    }

    /// Adds a declaration read from a library. It is resolved already, so
    /// the scheduler never runs a phase for it.
    pub fn add_library(&mut self, outer: FeatureId, decl: LibraryFeature) -> FeatureId {
        let span = Span::synthetic();
        let name = FeatureName::new(decl.name.clone(), decl.args.len());
        let mut feature = Feature::new(name, Some(outer), decl.kind, span);
        feature.is_ref = decl.is_ref;
        feature.state = State::Resolved;
        let f = self.add_feature(feature);

        let mut generics = Vec::with_capacity(decl.generics.len());
        for g in &decl.generics {
            let constraint = g.constraint.as_ref().map(|c| {
                let t = self.library_type(f, c);
                TypeRef {
                    source: self.written_as(t),
                    resolved: Some(t),
                }
            });
            generics.push(GenericDecl {
                name: g.name.clone(),
                constraint,
                open: g.open,
                span,
            });
        }
        self.feature_mut(f).generics = FormalGenerics::new(generics);

        for (arg_name, t) in &decl.args {
            let open = matches!(t, LibraryType::Generic(i) if self.feature(f).generics.is_open_index(*i));
            let ty = self.library_type(f, t);
            let mut arg = Feature::new(FeatureName::new(arg_name.clone(), 0), Some(f), FeatureKind::Field, span);
            arg.is_argument = true;
            arg.result = ResultSource::Fixed;
            arg.result_type = Some(ty);
            arg.visible = Some(BTreeMap::new());
            arg.parent_types = Some(Vec::new());
            arg.state = State::Resolved;
            let a = self.add_feature(arg);
            self.register(f, a);
            let owner = self.feature_mut(f);
            owner.args.push(a);
            owner.has_open_arg_list |= open;
        }

        let result = match &decl.result {
            Some(t) => {
                self.feature_mut(f).result = ResultSource::Fixed;
                self.library_type(f, t)
            }
            None => self.current_type(f),
        };
        self.feature_mut(f).result_type = Some(result);

        let mut parent_types = Vec::with_capacity(decl.parents.len());
        for p in &decl.parents {
            parent_types.push(self.library_type(f, p));
        }
        if parent_types.is_empty()
            && decl.result.is_none()
            && matches!(decl.kind, FeatureKind::Routine | FeatureKind::Choice)
        {
            if let Some(any) = self.builtin(Builtin::Any) {
                parent_types.push(self.current_type(any));
            }
        }
        let parents: Vec<FeatureId> = parent_types.iter().filter_map(|t| self.feature_of_type(*t)).collect();
        for p in &parents {
            self.inheritance.add_edge(f, *p);
        }
        let feature = self.feature_mut(f);
        feature.parents = parents;
        feature.parent_types = Some(parent_types);
        let visible = self.visible_features(f);
        self.feature_mut(f).visible = Some(visible);

        self.register(outer, f);
        trace!(feature = %self.qualified_name(f), "library feature added");
        f
    }

    /// Adds a library routine with fixed argument and result types
    pub fn add_library_feature(
        &mut self,
        outer: FeatureId,
        name: &str,
        args: Vec<(String, TypeId)>,
        result: TypeId,
        kind: FeatureKind,
    ) -> FeatureId {
        let mut decl = LibraryFeature::new(name, kind).returns(LibraryType::Known(result));
        for (arg_name, t) in args {
            decl = decl.arg(&arg_name, LibraryType::Known(t));
        }
        self.add_library(outer, decl)
    }

    /// Adds a library constructor without arguments, heir of `Any`
    pub fn add_library_type(&mut self, outer: FeatureId, name: &str, is_ref: bool) -> FeatureId {
        let decl = LibraryFeature::new(name, FeatureKind::Routine);
        let decl = if is_ref { decl.reference() } else { decl };
        self.add_library(outer, decl)
    }

    fn library_type(&mut self, f: FeatureId, t: &LibraryType) -> TypeId {
        match t {
            LibraryType::Known(t) => *t,
            LibraryType::Generic(index) => self.parametric_type(Generic::new(f, *index)),
            LibraryType::Of(feature, generics) => {
                let mut actuals = Vec::with_capacity(generics.len());
                for g in generics {
                    actuals.push(self.library_type(f, g));
                }
                let outer = self.feature(*feature).outer.and_then(|o| self.outer_type_for(o));
                self.constructor_type(*feature, actuals, outer)
            }
        }
    }

    /// Source form of a type that never came from source
    fn written_as(&self, t: TypeId) -> UnresolvedType {
        UnresolvedType {
            name: self.type_name(t),
            generics: Vec::new(),
            outer: None,
            mode: None,
            open: false,
            span: Span::synthetic(),
        }
    }

    // Body conversion

    fn convert_block(&mut self, block: &ast::Block, level: FeatureId, scope: &mut Scope) -> Expr {
        let mark = scope.enter();
        let exprs: Vec<Expr> = block
            .exprs
            .iter()
            .map(|e| self.convert_expr(e, level, scope))
            .collect();
        scope.leave(mark);
        Expr::block(exprs, block.span)
    }

    fn convert_expr(&mut self, e: &ast::Expr, level: FeatureId, scope: &mut Scope) -> Expr {
        let span = e.span;
        let kind = match &e.kind {
            ast::ExprKind::Call(c) => return self.convert_call(c, level, scope).into_expr(),
            ast::ExprKind::Int(text) => constant(ConstValue::Int(text.clone())),
            ast::ExprKind::Float(text) => constant(ConstValue::Float(text.clone())),
            ast::ExprKind::Bool(b) => constant(ConstValue::Bool(*b)),
            ast::ExprKind::Str(s) => constant(ConstValue::Str(s.clone())),
            ast::ExprKind::If(i) => {
                let cond = self.convert_expr(&i.cond, level, scope);
                let then_branch = self.convert_block(&i.then_branch, level, scope);
                let else_branch = i.else_branch.as_ref().map(|b| {
                    let mark = scope.enter();
                    let converted = self.convert_expr(b, level, scope);
                    scope.leave(mark);
                    converted
                });
                ExprKind::If(Box::new(If {
                    cond,
                    then_branch,
                    else_branch,
                    ty: None,
                }))
            }
            ast::ExprKind::Match(m) => {
                let subject = self.convert_expr(&m.subject, level, scope);
                let cases: Vec<Case> = m
                    .cases
                    .iter()
                    .map(|case| self.convert_case(case, level, scope))
                    .collect();
                ExprKind::Match(Box::new(Match {
                    subject,
                    cases,
                    ty: None,
                }))
            }
            ast::ExprKind::Block(b) => return self.convert_block(b, level, scope),
            ast::ExprKind::Let(l) => {
                let value = self.convert_expr(&l.value, level, scope);
                let result = match &l.ty {
                    Some(t) => ResultSource::Declared(TypeRef::new(t.clone())),
                    None => ResultSource::Inferred,
                };
                let local = self.add_local(level, l.name.clone(), result, span);
                scope.locals.push((l.name.clone(), local));
                ExprKind::Assign(Box::new(Assign {
                    field: local,
                    value,
                    ty: None,
                }))
            }
            ast::ExprKind::Current => ExprKind::Current(Current {
                feature: level,
                ty: None,
            }),
            ast::ExprKind::TypeTest(test) => ExprKind::TypeTest(Box::new(TypeTest {
                param: TypeRef::new(test.param.clone()),
                constraint: TypeRef::new(test.constraint.clone()),
                generic: None,
                ty: None,
            })),
            ast::ExprKind::OperatorSection(op) => ExprKind::Section(Section { op: op.clone() }),
        };
        Expr::new(kind, span)
    }

    fn convert_case(&mut self, case: &ast::MatchCase, level: FeatureId, scope: &mut Scope) -> Case {
        let mark = scope.enter();
        let pattern = match &case.pattern {
            ast::CasePattern::Types { binding, types } => {
                let binding = binding.as_ref().map(|name| {
                    let local = self.add_local(level, name.clone(), ResultSource::Fixed, case.span);
                    scope.locals.push((name.clone(), local));
                    local
                });
                Pattern::Types {
                    binding,
                    types: types.iter().cloned().map(TypeRef::new).collect(),
                }
            }
            ast::CasePattern::Wildcard => Pattern::Wildcard,
        };
        let body = self.convert_block(&case.body, level, scope);
        scope.leave(mark);
        Case {
            pattern,
            body,
            span: case.span,
        }
    }

    fn convert_call(&mut self, c: &ast::CallExpr, level: FeatureId, scope: &mut Scope) -> Call {
        let target = c.target.as_ref().map(|t| self.convert_expr(t, level, scope));
        let actuals = c
            .actuals
            .iter()
            .map(|a| self.convert_expr(a, level, scope))
            .collect();
        let mut call = Call::new(c.name.clone(), target, actuals, c.span);
        call.explicit_generics = c
            .generics
            .as_ref()
            .map(|gs| gs.iter().cloned().map(TypeRef::new).collect::<Vec<_>>());
        call.parenthesized = c.parenthesized;
        call.select = c.select;
        if call.target.is_none() && call.actuals.is_empty() && call.explicit_generics.is_none() && !call.parenthesized {
            call.local = scope.find(&c.name);
        }
        call
    }
}

fn constant(value: ConstValue) -> ExprKind {
    ExprKind::Const(Constant { value, ty: None })
}
