use tea_core::{ErrorInfo, TeaError};
use tea_model::{run_with_sessions, ScriptedCalculator, ScriptedModel};

#[test]
fn sessions_close_on_success() {
    let mut model = ScriptedModel::open("plant.bkp", &[]);
    let mut calculator = ScriptedCalculator::open(&[]);

    let value = run_with_sessions(&mut model, &mut calculator, |_, _| Ok(42u32)).unwrap();

    assert_eq!(value, 42);
    assert!(model.is_closed());
    assert!(calculator.is_closed());
}

#[test]
fn sessions_close_when_body_fails() {
    let mut model = ScriptedModel::open("plant.bkp", &[]);
    let mut calculator = ScriptedCalculator::open(&[]);

    let err = run_with_sessions(&mut model, &mut calculator, |_, _| {
        Err::<(), _>(TeaError::Collaborator(ErrorInfo::new(
            "run-failed",
            "simulation diverged",
        )))
    })
    .unwrap_err();

    assert_eq!(err.info().code, "run-failed");
    assert!(model.is_closed());
    assert!(calculator.is_closed());
}

#[test]
fn sessions_close_when_collaborator_raises_mid_body() {
    let mut model = ScriptedModel::open("plant.bkp", &[]);
    model.fail_next_run();
    let mut calculator = ScriptedCalculator::open(&[]);

    let err = run_with_sessions(&mut model, &mut calculator, |model, _| {
        model.run()?;
        Ok(())
    })
    .unwrap_err();

    assert!(matches!(err, TeaError::Collaborator(_)));
    assert!(model.is_closed());
    assert!(calculator.is_closed());
}
