//! Scoped acquisition and guaranteed release of collaborator sessions.

use tea_core::errors::TeaError;

use crate::{Calculator, Model};

/// Runs `body` against open Model and Calculator sessions, closing both on
/// every exit path.
///
/// The external applications keep a process alive per session; leaking one
/// leaves it running after this process exits. Close failures never mask a
/// body failure: if `body` errored that error is returned, otherwise the
/// first close error surfaces.
pub fn run_with_sessions<T>(
    model: &mut dyn Model,
    calculator: &mut dyn Calculator,
    body: impl FnOnce(&mut dyn Model, &mut dyn Calculator) -> Result<T, TeaError>,
) -> Result<T, TeaError> {
    let outcome = body(model, calculator);
    let model_closed = model.close();
    let calculator_closed = calculator.close();
    if let Err(close_err) = &model_closed {
        tracing::warn!(error = %close_err, "model session close failed");
    }
    if let Err(close_err) = &calculator_closed {
        tracing::warn!(error = %close_err, "calculator session close failed");
    }
    let value = outcome?;
    model_closed?;
    calculator_closed?;
    Ok(value)
}
