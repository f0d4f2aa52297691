//! HTML to PDF through an external converter.

use crate::pipeline::DocumentConverter;
use crate::{ReportError, ReportResult};
use std::io::Write;
use std::process::{Command, Stdio};

/// Pipes HTML through a command that reads stdin and writes the PDF to stdout.
///
/// The default invocation is `<command> --quiet - -`, which suits `wkhtmltopdf`.
#[derive(Clone, Debug)]
pub struct CommandPdfConverter {
    command: String,
    args: Vec<String>,
}

impl CommandPdfConverter {
    pub fn new(command: impl Into<String>) -> Self {
        Self::with_args(command, ["--quiet", "-", "-"].map(String::from).to_vec())
    }

    pub fn with_args(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }
}

impl DocumentConverter for CommandPdfConverter {
    fn convert(&self, document: &str) -> ReportResult<Vec<u8>> {
        let mut child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ReportError::Convert(format!("failed to start {}: {e}", self.command)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| ReportError::Convert("converter stdin unavailable".into()))?;
        let input = document.as_bytes().to_vec();
        // The child may fill stdout before it has read all of stdin.
        let writer = std::thread::spawn(move || stdin.write_all(&input));

        let output = child
            .wait_with_output()
            .map_err(|e| ReportError::Convert(format!("{} did not finish: {e}", self.command)))?;

        match writer.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) if output.status.success() => {
                return Err(ReportError::Convert(format!("failed to write document: {e}")))
            }
            Ok(Err(_)) => {}
            Err(_) => return Err(ReportError::Convert("stdin writer panicked".into())),
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ReportError::Convert(format!(
                "{} exited with {}: {}",
                self.command,
                output.status,
                stderr.trim()
            )));
        }
        if output.stdout.is_empty() {
            return Err(ReportError::Convert(format!("{} produced no output", self.command)));
        }

        tracing::debug!(bytes = output.stdout.len(), "document converted");
        Ok(output.stdout)
    }
}
