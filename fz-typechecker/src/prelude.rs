//! The built-in declarations every compilation unit starts from.
//!
//! They are ordinary declarations built with [`fz_ast::builder`] and go
//! through the same phases as user code. Only their bodies are intrinsic.

use crate::features::FeatureId;
use crate::session::{Builtin, CompilationSession};
use fz_ast::builder::{feature, ty};
use fz_ast::{operators, FeatureDecl};
use lazy_static::lazy_static;
use tracing::{debug, warn};

const ARITHMETIC: [&str; 5] = ["+", "-", "*", "/", "%"];

const NUMERIC: [&str; 5] = ["i32", "i64", "u8", "f32", "f64"];

lazy_static! {
    static ref PRELUDE: Vec<FeatureDecl> = build_prelude();
}

fn intrinsic(name: &str, args: &[(&str, &str)], result: &str) -> FeatureDecl {
    let mut builder = feature(name);
    for (arg, t) in args {
        builder = builder.arg(arg, ty(t));
    }
    builder.returns(ty(result)).intrinsic().build()
}

fn numeric(name: &str) -> FeatureDecl {
    let mut builder = feature(name);
    for op in ARITHMETIC {
        builder = builder.inner(intrinsic(&operators::infix(op), &[("other", name)], name));
    }
    for op in operators::RELATIONAL {
        builder = builder.inner(intrinsic(&operators::infix(op), &[("other", name)], "bool"));
    }
    builder
        .inner(intrinsic(&operators::prefix("-"), &[], name))
        .inner(intrinsic("as_string", &[], "String"))
        .build()
}

fn build_prelude() -> Vec<FeatureDecl> {
    let mut prelude = vec![
        feature("Any")
            .is_ref()
            .inner(intrinsic("as_string", &[], "String"))
            .build(),
        feature("void").choice(Vec::new()).build(),
        feature("unit").build(),
        feature("bool")
            .inner(intrinsic(&operators::infix("&&"), &[("other", "bool")], "bool"))
            .inner(intrinsic(&operators::infix("||"), &[("other", "bool")], "bool"))
            .inner(intrinsic(&operators::infix("="), &[("other", "bool")], "bool"))
            .inner(intrinsic(&operators::infix("!="), &[("other", "bool")], "bool"))
            .inner(intrinsic(&operators::prefix("!"), &[], "bool"))
            .inner(intrinsic("as_string", &[], "String"))
            .build(),
    ];
    prelude.extend(NUMERIC.iter().map(|n| numeric(n)));
    prelude.extend([
        feature("String")
            .is_ref()
            .inner(intrinsic(&operators::infix("+"), &[("other", "String")], "String"))
            .inner(intrinsic(&operators::infix("="), &[("other", "String")], "bool"))
            .inner(intrinsic(&operators::infix("!="), &[("other", "String")], "bool"))
            .inner(intrinsic("as_string", &[], "String"))
            .build(),
        feature("nil").build(),
        feature("option")
            .type_param("T")
            .choice(vec![ty("T"), ty("nil")])
            .build(),
        feature("Function")
            .is_ref()
            .type_param("R")
            .open_type_param("A")
            .inner(feature("call").arg("a", ty("A").dots()).returns(ty("R")).abstract_().build())
            .build(),
        feature("Lazy")
            .is_ref()
            .type_param("T")
            .inner(feature("call").returns(ty("T")).abstract_().build())
            .build(),
        intrinsic("panic", &[("message", "String")], "void"),
        intrinsic("say", &[("s", "Any")], "unit"),
    ]);
    prelude
}

impl CompilationSession {
    /// Collects the built-in declarations into the universe and registers
    /// the ones the resolver refers to
    pub(crate) fn load_prelude(&mut self) {
        for decl in PRELUDE.iter() {
            self.collect_feature(decl, FeatureId::UNIVERSE);
        }
        for builtin in Builtin::ALL {
            match self.find_feature(builtin.name()) {
                Some(f) => {
                    self.builtins.insert(builtin, f);
                }
                None => warn!(name = builtin.name(), "built-in missing from prelude"),
            }
        }
        debug!(builtins = self.builtins.len(), "prelude loaded");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_prelude_declares_every_builtin() {
        let names: Vec<&str> = PRELUDE.iter().map(|d| d.name.as_str()).collect();
        for builtin in Builtin::ALL {
            assert!(names.contains(&builtin.name()), "{} missing", builtin.name());
        }
    }

    #[test]
    fn test_numeric_operators() {
        let i32_decl = numeric("i32");
        let plus = i32_decl
            .inner
            .iter()
            .find(|d| d.name == operators::infix("+"))
            .expect("infix + declared");
        assert_eq!(plus.args.len(), 1);
        assert_eq!(plus.args[0].ty.as_ref().map(|t| t.name.as_str()), Some("i32"));
        assert!(i32_decl.inner.iter().any(|d| d.name == operators::infix("<=")));
    }
}
