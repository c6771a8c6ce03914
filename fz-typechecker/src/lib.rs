//! Fz Typechecker
//!
//! Semantic analysis for the fz language: resolves the names, types and
//! calls of parsed declarations and turns them into a fully typed tree.
//!
//! ## Architecture
//!
//! - **Type model**: interned types ([`types`]) with generics, outer types
//!   and reference/value mode, plus subtyping and substitution
//! - **Declarations**: features in one arena ([`features`]), each moving
//!   through strictly ordered resolution states
//! - **Scheduler**: one work list per phase, so no feature starts a phase
//!   before all others have finished the earlier ones
//! - **Calls**: overload lookup, type inference, partial application and
//!   the implicit conversions between values and function values
//!
//! Resolution never stops at the first problem. Diagnostics are collected
//! in the session and only running out of identifier space is fatal.

#![allow(clippy::uninlined_format_args)]

mod calls;
pub(crate) mod checker;
mod collect;
pub mod context;
pub mod diagnostics;
pub mod error;
pub mod features;
pub mod generics;
mod inheritance;
mod lookup;
pub mod options;
mod phases;
mod prelude;
mod resolve_types;
mod scheduler;
pub mod session;
mod subtyping;
mod type_model;
pub mod typed_ast;
pub mod types;

pub use collect::{LibraryFeature, LibraryGeneric, LibraryType};
pub use context::Context;
pub use diagnostics::{DiagnosticSummary, Diagnostics, Severity};
pub use error::{TypecheckError, TypecheckResult};
pub use features::{Feature, FeatureId, FeatureKind, FeatureName, State};
pub use options::ResolverOptions;
pub use session::{Builtin, CompilationSession};
pub use typed_ast::{Call, Expr, ExprKind};
pub use types::{TypeId, TypeKind};

pub use fz_ast;

/// Resolve `program` with default options
pub fn typecheck_program(program: &fz_ast::Program) -> TypecheckResult<CompilationSession> {
    typecheck_program_with_options(program, ResolverOptions::default())
}

/// Resolve `program`. The returned session holds the typed tree and every
/// diagnostic; `Err` means resolution was aborted.
pub fn typecheck_program_with_options(
    program: &fz_ast::Program,
    options: ResolverOptions,
) -> TypecheckResult<CompilationSession> {
    let mut session = CompilationSession::new(options);
    session.add_program(program);
    session.resolve()?;
    Ok(session)
}

#[cfg(test)]
mod tests;

// Version and metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
