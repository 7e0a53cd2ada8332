//! Expression-tail substitution for Model nodes stored as text.

use tea_core::errors::{ErrorInfo, TeaError};

/// Replaces everything after the last `=` of `existing` with `value`.
///
/// Model calculator blocks store assignments like `RHOH = 0.45`; sweeping
/// such a variable must keep the left-hand side intact and only swap the
/// trailing value. The stored text must already contain `=`; substituting
/// into anything else would corrupt the node, so that case raises a
/// collaborator error instead.
pub fn splice_expression_tail(existing: &str, value: f64) -> Result<String, TeaError> {
    match existing.rfind('=') {
        Some(pos) => {
            let head = &existing[..=pos];
            Ok(format!("{head}{value}"))
        }
        None => Err(TeaError::Collaborator(
            ErrorInfo::new(
                "expression-shape",
                "stored node text has no `=` to splice after",
            )
            .with_context("stored", existing.to_string()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_after_last_equals() {
        let out = splice_expression_tail("FCONV = 0.85", 0.9).unwrap();
        assert_eq!(out, "FCONV = 0.9");
    }

    #[test]
    fn keeps_head_of_chained_assignments() {
        let out = splice_expression_tail("A = B = 1.5", 2.0).unwrap();
        assert_eq!(out, "A = B = 2");
    }

    #[test]
    fn rejects_text_without_equals() {
        let err = splice_expression_tail("0.85", 0.9).unwrap_err();
        assert!(matches!(err, TeaError::Collaborator(_)));
    }
}
