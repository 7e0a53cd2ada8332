use tea_core::{ErrorInfo, TeaError};

fn sample_info(code: &str, message: &str) -> ErrorInfo {
    ErrorInfo::new(code, message)
        .with_context("location", "OPEX!B11")
        .with_context("model", "ethanol")
}

#[test]
fn config_error_surface() {
    let err = TeaError::Config(sample_info("sweep-axes", "only 2-3 input variables are acceptable"));
    assert_eq!(err.info().code, "sweep-axes");
    assert!(err.info().context.contains_key("location"));
}

#[test]
fn collaborator_error_surface() {
    let err = TeaError::Collaborator(sample_info("macro-run", "macro failed"));
    assert_eq!(err.info().code, "macro-run");
    assert!(err.to_string().starts_with("collaborator error"));
}

#[test]
fn alignment_error_surface() {
    let err = TeaError::Alignment(sample_info("index-mismatch", "price index differs"));
    assert_eq!(err.info().code, "index-mismatch");
}

#[test]
fn serde_error_surface() {
    let err = TeaError::Serde(sample_info("table-read", "bad header").with_hint("check delimiter"));
    assert_eq!(err.info().hint.as_deref(), Some("check delimiter"));
}

#[test]
fn display_includes_context_pairs() {
    let err = TeaError::Config(sample_info("sweep-axes", "bad axis count"));
    let rendered = err.to_string();
    assert!(rendered.contains("location=OPEX!B11"));
    assert!(rendered.contains("model=ethanol"));
}
