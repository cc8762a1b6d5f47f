//! Math expression evaluation using fend-core

use crate::error::{CatalogError, Result};
use tracing::debug;

const APPROX_PREFIX: &str = "approx. ";

/// Evaluate a math expression, returning fend's main result
///
/// Inexact results lose fend's `approx.` marker, so `sqrt(2)` reads
/// `1.4142135623`.
///
/// # Errors
/// Returns an error for an empty expression or one fend cannot evaluate
pub fn evaluate(expression: &str) -> Result<String> {
    let expression = expression.trim();
    if expression.is_empty() {
        return Err(CatalogError::EmptyExpression);
    }

    let mut context = fend_core::Context::new();
    let result = fend_core::evaluate(expression, &mut context).map_err(|reason| {
        CatalogError::Evaluation {
            expression: expression.to_string(),
            reason,
        }
    })?;

    let main = result.get_main_result();
    debug!("Evaluated '{}' = {}", expression, main);
    Ok(main.strip_prefix(APPROX_PREFIX).unwrap_or(main).to_string())
}

/// Evaluate for display: the result, or `error: ...`
#[must_use]
pub fn evaluate_text(expression: &str) -> String {
    evaluate(expression).unwrap_or_else(|e| format!("error: {e}"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_arithmetic() {
        assert_eq!(evaluate("2 + 3 * 4").unwrap(), "14");
        assert_eq!(evaluate("(2 + 3) * 4").unwrap(), "20");
        assert_eq!(evaluate("2^10").unwrap(), "1024");
        assert_eq!(evaluate("10 / 4").unwrap(), "2.5");
        assert_eq!(evaluate("-3 + 1").unwrap(), "-2");
    }

    #[test]
    fn test_functions_and_constants() {
        assert_eq!(evaluate("sqrt(16)").unwrap(), "4");
        assert!(evaluate("sqrt(2)").unwrap().starts_with("1.41421"));
        assert!(evaluate("pi").unwrap().starts_with("3.14159"));
    }

    #[test]
    fn test_approx_marker_stripped() {
        let third = evaluate("1/3").unwrap();
        assert!(!third.starts_with("approx"));
        assert!(third.starts_with("0.333"));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(evaluate("   "), Err(CatalogError::EmptyExpression)));
        assert!(matches!(evaluate("qqq"), Err(CatalogError::Evaluation { .. })));
        assert!(evaluate_text("qqq").starts_with("error: "));
    }
}
