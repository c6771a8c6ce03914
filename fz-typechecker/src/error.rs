//! Error types for the Fz typechecker
//!
//! Every diagnostic the resolution pipeline can produce, following the miette
//! patterns of the parser crate. Recoverable errors are collected in
//! [`crate::diagnostics::Diagnostics`]; only [`TypecheckError::Fatal`] is ever
//! returned from the driver.

use crate::diagnostics::Severity;
use fz_ast::Span;
use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

#[derive(Error, Diagnostic, Debug, Clone, PartialEq)]
pub enum TypecheckError {
    #[error("Could not find {what} `{name}`")]
    #[diagnostic(
        code(fz::typecheck::unresolved_name),
        help("Check the spelling and the number of actual arguments")
    )]
    UnresolvedName {
        name: String,
        what: String,
        #[label("not found")]
        span: SourceSpan,
    },

    #[error("Ambiguous reference to `{name}`, candidates are {candidates}")]
    #[diagnostic(
        code(fz::typecheck::ambiguous_name),
        help("Qualify the call with an explicit target to pick one of the candidates")
    )]
    AmbiguousName {
        name: String,
        candidates: String,
        #[label("ambiguous")]
        span: SourceSpan,
    },

    #[error("Ambiguous partial application of `{name}`: both `{full}` and `{partial}` would apply")]
    #[diagnostic(
        code(fz::typecheck::ambiguous_partial_application),
        help("Write an explicit lambda to make the intent clear")
    )]
    AmbiguousPartialApplication {
        name: String,
        full: String,
        partial: String,
        #[label("ambiguous")]
        span: SourceSpan,
    },

    #[error("Wrong number of actual generic arguments for `{name}`: expected {expected}, found {found}")]
    #[diagnostic(code(fz::typecheck::generic_arity_mismatch))]
    GenericArityMismatch {
        name: String,
        expected: String,
        found: usize,
        #[label("{found} generic arguments given")]
        span: SourceSpan,
    },

    #[error("Incompatible types in branches of {construct}")]
    #[diagnostic(
        code(fz::typecheck::incompatible_branches),
        help("Incompatible types found: {found}")
    )]
    IncompatibleBranches {
        construct: String,
        found: String,
        #[label("branches produce incompatible types")]
        span: SourceSpan,
    },

    #[error("Incompatible types in {what}: expected `{expected}`, found `{found}`")]
    #[diagnostic(code(fz::typecheck::incompatible_assignment))]
    IncompatibleAssignment {
        expected: String,
        found: String,
        what: String,
        #[label("value of type `{found}`")]
        span: SourceSpan,
    },

    #[error("Ambiguous tagging of `{actual}` into choice `{choice}`, matching variants are {variants}")]
    #[diagnostic(
        code(fz::typecheck::ambiguous_tagging),
        help("Convert the value to exactly one of the variant types first")
    )]
    AmbiguousTagging {
        actual: String,
        choice: String,
        variants: String,
        #[label("ambiguous")]
        span: SourceSpan,
    },

    #[error("Value of type `{actual}` cannot be tagged into choice `{choice}`")]
    #[diagnostic(code(fz::typecheck::impossible_tagging))]
    ImpossibleTagging {
        actual: String,
        choice: String,
        #[label("no matching variant")]
        span: SourceSpan,
    },

    #[error("Cyclic inheritance involving `{feature}`: {cycle}")]
    #[diagnostic(
        code(fz::typecheck::cyclic_inheritance),
        help("A feature cannot inherit from itself, directly or through its parents")
    )]
    CyclicInheritance {
        feature: String,
        cycle: String,
        #[label("inheritance cycle")]
        span: SourceSpan,
    },

    #[error("Illegal forward or cyclic type inference for `{feature}`")]
    #[diagnostic(
        code(fz::typecheck::cyclic_type_inference),
        help("Declare the result type of `{feature}` explicitly")
    )]
    CyclicTypeInference {
        feature: String,
        #[label("result type depends on itself")]
        span: SourceSpan,
    },

    #[error("Numeric literal `{literal}` is out of range for `{ty}`")]
    #[diagnostic(code(fz::typecheck::literal_out_of_range))]
    LiteralOutOfRange {
        literal: String,
        ty: String,
        #[label("does not fit")]
        span: SourceSpan,
    },

    #[error("Failed to infer actual generic `{generic}` of call to `{callee}`")]
    #[diagnostic(
        code(fz::typecheck::inference_failed),
        help("Provide the actual generic arguments explicitly")
    )]
    InferenceFailed {
        generic: String,
        callee: String,
        #[label("cannot infer `{generic}`")]
        span: SourceSpan,
    },

    #[error("Incompatible types during type inference of `{generic}` in call to `{callee}`: {types}")]
    #[diagnostic(code(fz::typecheck::inference_conflict))]
    InferenceConflict {
        generic: String,
        callee: String,
        types: String,
        #[label("conflicting actual arguments")]
        span: SourceSpan,
    },

    #[error("Illegal use of open generic type `{name}`")]
    #[diagnostic(
        code(fz::typecheck::open_generic_misuse),
        help("Use a selector such as `.0` to pick one element")
    )]
    OpenGenericMisuse {
        name: String,
        #[label("open generic")]
        span: SourceSpan,
    },

    #[error("Selector `{select}` out of range for `{name}`, which has {count} elements")]
    #[diagnostic(code(fz::typecheck::selector_out_of_range))]
    SelectorOutOfRange {
        name: String,
        select: usize,
        count: usize,
        #[label("out of range")]
        span: SourceSpan,
    },

    #[error("Illegal match: {reason}")]
    #[diagnostic(code(fz::typecheck::illegal_match))]
    IllegalMatch {
        reason: String,
        #[label("here")]
        span: SourceSpan,
    },

    #[error("Duplicate declaration of `{name}`")]
    #[diagnostic(code(fz::typecheck::duplicate_declaration))]
    DuplicateDeclaration {
        name: String,
        #[label("declared again here")]
        span: SourceSpan,
        #[label("first declared here")]
        first: SourceSpan,
    },

    #[error("Incompatible actual argument types for `{argument}` of `{feature}`: {found}")]
    #[diagnostic(
        code(fz::typecheck::incompatible_argument_inference),
        help("Declare the type of `{argument}` explicitly")
    )]
    IncompatibleArgumentInference {
        argument: String,
        feature: String,
        found: String,
        #[label("argument type inferred from calls")]
        span: SourceSpan,
    },

    #[error("`{name}` is not a type parameter")]
    #[diagnostic(code(fz::typecheck::not_a_type_parameter))]
    NotATypeParameter {
        name: String,
        #[label("type test requires a type parameter")]
        span: SourceSpan,
    },

    #[error("Fatal: {message}")]
    #[diagnostic(code(fz::typecheck::fatal))]
    Fatal { message: String },
}

impl TypecheckError {
    pub fn severity(&self) -> Severity {
        match self {
            TypecheckError::Fatal { .. } => Severity::Fatal,
            _ => Severity::Error,
        }
    }

    pub fn span(&self) -> Option<SourceSpan> {
        match self {
            TypecheckError::UnresolvedName { span, .. }
            | TypecheckError::AmbiguousName { span, .. }
            | TypecheckError::AmbiguousPartialApplication { span, .. }
            | TypecheckError::GenericArityMismatch { span, .. }
            | TypecheckError::IncompatibleBranches { span, .. }
            | TypecheckError::IncompatibleAssignment { span, .. }
            | TypecheckError::AmbiguousTagging { span, .. }
            | TypecheckError::ImpossibleTagging { span, .. }
            | TypecheckError::CyclicInheritance { span, .. }
            | TypecheckError::CyclicTypeInference { span, .. }
            | TypecheckError::LiteralOutOfRange { span, .. }
            | TypecheckError::InferenceFailed { span, .. }
            | TypecheckError::InferenceConflict { span, .. }
            | TypecheckError::OpenGenericMisuse { span, .. }
            | TypecheckError::SelectorOutOfRange { span, .. }
            | TypecheckError::IllegalMatch { span, .. }
            | TypecheckError::DuplicateDeclaration { span, .. }
            | TypecheckError::IncompatibleArgumentInference { span, .. }
            | TypecheckError::NotATypeParameter { span, .. } => Some(*span),
            TypecheckError::Fatal { .. } => None,
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        TypecheckError::Fatal {
            message: message.into(),
        }
    }
}

/// Convert an AST span to a miette label span
pub fn to_source_span(span: Span) -> SourceSpan {
    span.into()
}

pub type TypecheckResult<T> = Result<T, TypecheckError>;
