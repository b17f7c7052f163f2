//! Rejection of the `+=` and `-=` assignment operators.
//!
//! The check walks every parsed file before any statement is evaluated, so
//! no binding is made when a legacy operator appears anywhere.

use strata_ast::node::*;
use strata_ast::visitor::AstVisitor;
use strata_scope::ScopeError;

struct LegacyOperatorCheck<'m, 'a> {
    manifest: &'m Manifest<'a>,
    /// First offending assignment, in textual order.
    found: Option<ScopeError>,
}

impl<'m, 'a> AstVisitor<'a> for LegacyOperatorCheck<'m, 'a> {
    fn visit_assignment(&mut self, node: &Assignment<'a>) {
        if self.found.is_some() || node.operator == AssignmentOperator::Assign {
            return;
        }
        self.found = Some(ScopeError::LegacyOperator {
            operator: node.operator.text().to_string(),
            position: Some(self.manifest.position(node.operator_span)),
        });
    }
}

/// Fail with [`ScopeError::LegacyOperator`] for the first `+=` or `-=`
/// assignment in `manifests`, including those inside class, define and
/// node bodies that are never evaluated.
pub fn check_legacy_operators(manifests: &[Manifest<'_>]) -> Result<(), ScopeError> {
    for manifest in manifests {
        let mut check = LegacyOperatorCheck { manifest, found: None };
        check.visit_manifest(manifest);
        if let Some(err) = check.found {
            return Err(err);
        }
    }
    Ok(())
}
