//! Collaborator implementations backed by an external adapter process.
//!
//! The real simulation and spreadsheet engines are driven by a small
//! adapter executable that owns the vendor session and speaks line-delimited
//! JSON on stdio: one request object per line, answered by exactly one
//! `{"ok": ...}` or `{"error": "..."}` line. The adapter is spawned once per
//! session and terminated by `close`.

use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use serde_json::{json, Value};
use tea_core::errors::{ErrorInfo, TeaError};

use crate::{Calculator, CellValue, Model};

struct BridgeClient {
    name: &'static str,
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    closed: bool,
}

impl BridgeClient {
    fn spawn(name: &'static str, program: &str, args: &[String]) -> Result<Self, TeaError> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|err| {
                TeaError::Collaborator(
                    ErrorInfo::new("bridge-spawn", err.to_string())
                        .with_context("bridge", name)
                        .with_context("program", program.to_string()),
                )
            })?;
        let stdin = child.stdin.take().ok_or_else(|| {
            TeaError::Collaborator(
                ErrorInfo::new("bridge-stdin", "bridge stdin unavailable").with_context("bridge", name),
            )
        })?;
        let stdout = child.stdout.take().map(BufReader::new).ok_or_else(|| {
            TeaError::Collaborator(
                ErrorInfo::new("bridge-stdout", "bridge stdout unavailable")
                    .with_context("bridge", name),
            )
        })?;
        Ok(Self {
            name,
            child,
            stdin,
            stdout,
            closed: false,
        })
    }

    fn call(&mut self, request: Value) -> Result<Value, TeaError> {
        if self.closed {
            return Err(TeaError::Collaborator(
                ErrorInfo::new("session-closed", "bridge session is closed")
                    .with_context("bridge", self.name),
            ));
        }
        let line = serde_json::to_string(&request).map_err(|err| {
            TeaError::Serde(ErrorInfo::new("bridge-encode", err.to_string()))
        })?;
        writeln!(self.stdin, "{line}").map_err(|err| {
            TeaError::Collaborator(
                ErrorInfo::new("bridge-write", err.to_string()).with_context("bridge", self.name),
            )
        })?;
        let mut response = String::new();
        let read = self.stdout.read_line(&mut response).map_err(|err| {
            TeaError::Collaborator(
                ErrorInfo::new("bridge-read", err.to_string()).with_context("bridge", self.name),
            )
        })?;
        if read == 0 {
            return Err(TeaError::Collaborator(
                ErrorInfo::new("bridge-eof", "bridge closed its stream mid-session")
                    .with_context("bridge", self.name),
            ));
        }
        let parsed: Value = serde_json::from_str(response.trim()).map_err(|err| {
            TeaError::Collaborator(
                ErrorInfo::new("bridge-parse", err.to_string())
                    .with_context("bridge", self.name)
                    .with_context("line", response.trim().to_string()),
            )
        })?;
        if let Some(error) = parsed.get("error") {
            let message = error.as_str().unwrap_or("bridge operation failed");
            return Err(TeaError::Collaborator(
                ErrorInfo::new("bridge-op", message.to_string())
                    .with_context("bridge", self.name)
                    .with_context("request", request.to_string()),
            ));
        }
        Ok(parsed.get("ok").cloned().unwrap_or(Value::Null))
    }

    fn shutdown(&mut self) -> Result<(), TeaError> {
        if self.closed {
            return Ok(());
        }
        let outcome = self.call(json!({"op": "close"}));
        self.closed = true;
        self.child.wait().map_err(|err| {
            TeaError::Collaborator(
                ErrorInfo::new("bridge-wait", err.to_string()).with_context("bridge", self.name),
            )
        })?;
        outcome.map(|_| ())
    }
}

impl Drop for BridgeClient {
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

fn number_from(value: &Value, op: &str) -> Result<f64, TeaError> {
    value.as_f64().ok_or_else(|| {
        TeaError::Collaborator(
            ErrorInfo::new("bridge-value", "bridge returned a non-numeric payload")
                .with_context("op", op.to_string())
                .with_context("payload", value.to_string()),
        )
    })
}

/// Model session driven through an external adapter executable.
pub struct BridgeModel {
    client: BridgeClient,
    archive: PathBuf,
}

impl BridgeModel {
    /// Spawns the adapter and opens the model archive in it.
    pub fn open(program: &str, args: &[String], archive: &Path) -> Result<Self, TeaError> {
        let mut client = BridgeClient::spawn("model", program, args)?;
        client.call(json!({"op": "open", "path": archive.display().to_string()}))?;
        tracing::info!(archive = %archive.display(), "model session opened");
        Ok(Self {
            client,
            archive: archive.to_path_buf(),
        })
    }
}

impl Model for BridgeModel {
    fn archive_path(&self) -> &Path {
        &self.archive
    }

    fn set_value(&mut self, path: &str, value: f64) -> Result<(), TeaError> {
        self.client
            .call(json!({"op": "set-value", "path": path, "value": value}))
            .map(|_| ())
    }

    fn set_expression_tail(&mut self, path: &str, value: f64) -> Result<(), TeaError> {
        self.client
            .call(json!({"op": "set-expression-tail", "path": path, "value": value}))
            .map(|_| ())
    }

    fn run(&mut self) -> Result<(), TeaError> {
        self.client.call(json!({"op": "run"})).map(|_| ())
    }

    fn save_snapshot(&mut self, path: &Path) -> Result<(), TeaError> {
        self.client
            .call(json!({"op": "save-snapshot", "path": path.display().to_string()}))
            .map(|_| ())
    }

    fn close(&mut self) -> Result<(), TeaError> {
        self.client.shutdown()
    }
}

/// Calculator session driven through an external adapter executable.
pub struct BridgeCalculator {
    client: BridgeClient,
}

impl BridgeCalculator {
    /// Spawns the adapter and opens the workbook in it.
    pub fn open(program: &str, args: &[String], workbook: &Path) -> Result<Self, TeaError> {
        let mut client = BridgeClient::spawn("calculator", program, args)?;
        client.call(json!({"op": "open", "path": workbook.display().to_string()}))?;
        tracing::info!(workbook = %workbook.display(), "calculator session opened");
        Ok(Self { client })
    }
}

impl Calculator for BridgeCalculator {
    fn get_cell(&mut self, sheet: &str, cell: &str) -> Result<CellValue, TeaError> {
        let payload = self
            .client
            .call(json!({"op": "get-cell", "sheet": sheet, "cell": cell}))?;
        match payload {
            Value::String(text) => Ok(CellValue::Text(text)),
            other => number_from(&other, "get-cell").map(CellValue::Number),
        }
    }

    fn set_cell(&mut self, sheet: &str, cell: &str, value: f64) -> Result<(), TeaError> {
        self.client
            .call(json!({"op": "set-cell", "sheet": sheet, "cell": cell, "value": value}))
            .map(|_| ())
    }

    fn load_model_snapshot(&mut self, path: &Path) -> Result<(), TeaError> {
        self.client
            .call(json!({"op": "load-snapshot", "path": path.display().to_string()}))
            .map(|_| ())
    }

    fn run_macro(&mut self, name: &str) -> Result<(), TeaError> {
        self.client
            .call(json!({"op": "run-macro", "name": name}))
            .map(|_| ())
    }

    fn close(&mut self) -> Result<(), TeaError> {
        self.client.shutdown()
    }
}
