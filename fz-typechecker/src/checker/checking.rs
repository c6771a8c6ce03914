//! Final assignability check of every value against the slot it flows into.

use crate::error::TypecheckError;
use crate::features::FeatureId;
use crate::session::CompilationSession;
use crate::typed_ast::ExprKind;

impl CompilationSession {
    pub(crate) fn check_types(&mut self, f: FeatureId) {
        self.visit_feature_slots(f, &mut |session, e, slot, formal, context| {
            let Some(t) = e.ty() else {
                session.check_consistency(false, "untyped value in typed slot");
                return;
            };
            if t.is_error() || formal.is_error() || session.is_assignable_from(formal, t, context) {
                return;
            }
            let error = if session.is_choice_type(formal) {
                TypecheckError::ImpossibleTagging {
                    actual: session.type_name(t),
                    choice: session.type_name(formal),
                    span: e.span.into(),
                }
            } else {
                TypecheckError::IncompatibleAssignment {
                    expected: session.type_name(formal),
                    found: session.type_name(t),
                    what: session.describe_slot(slot),
                    span: e.span.into(),
                }
            };
            session.report(error);
        });

        if let Some(body) = &self.feature(f).body {
            let mut unresolved = 0;
            body.walk(&mut |e| {
                if let ExprKind::Call(call) = &e.kind {
                    if !call.state.is_final() || call.ty.is_none() {
                        unresolved += 1;
                    }
                }
            });
            self.check_consistency(unresolved == 0, "unresolved call after type checking");
        }
    }
}
