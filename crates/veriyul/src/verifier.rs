//! Formal verification through the Dafny command-line tool.

use crate::error::{CollaboratorError, CollaboratorResult};
use crate::preprocess::preprocess;
use crate::process;
use serde::Serialize;
use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

const DAFNY: &str = "dafny";
const RESOURCE_LIMIT: &str = "10000000";
/// Seconds per verification condition; the whole run is bounded separately.
const TIME_LIMIT: &str = "20";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
    pub verified: bool,
    /// Everything the verifier printed, unmodified.
    pub output: String,
    /// Diagnostic lines picked out of `output` when verification failed.
    pub errors: Vec<String>,
}

impl VerificationReport {
    pub fn from_output(success: bool, output: String) -> Self {
        let verified = success && output.to_lowercase().contains("verified");
        let errors = if verified {
            Vec::new()
        } else {
            output
                .lines()
                .filter(|line| {
                    let lower = line.to_lowercase();
                    ["error", "postcondition", "precondition"]
                        .iter()
                        .any(|word| lower.contains(word))
                })
                .map(|line| line.trim().to_string())
                .collect()
        };
        Self {
            verified,
            output,
            errors,
        }
    }
}

pub trait Verifier {
    fn verify(&self, source: &str) -> CollaboratorResult<VerificationReport>;
}

#[derive(Debug, Clone)]
pub struct DafnyVerifier {
    path: PathBuf,
    timeout: Duration,
}

impl DafnyVerifier {
    pub fn new(path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            path: path.into(),
            timeout,
        }
    }

    /// Uses `configured` when given, then the dotnet global tool, then `PATH`.
    pub fn locate(configured: Option<&Path>, timeout: Duration) -> CollaboratorResult<Self> {
        if let Some(path) = configured {
            return Ok(Self::new(path, timeout));
        }
        let dotnet_tool = env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".dotnet").join("tools").join(DAFNY))
            .filter(|path| path.is_file());
        let on_path = || {
            env::var_os("PATH").and_then(|paths| {
                env::split_paths(&paths)
                    .map(|dir| dir.join(DAFNY))
                    .find(|path| path.is_file())
            })
        };
        match dotnet_tool.or_else(on_path) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "found dafny");
                Ok(Self::new(path, timeout))
            }
            None => Err(CollaboratorError::NotFound {
                tool: DAFNY,
                hint: "install with `dotnet tool install --global dafny`".to_string(),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Verifier for DafnyVerifier {
    fn verify(&self, source: &str) -> CollaboratorResult<VerificationReport> {
        let _span = tracing::debug_span!("verify", dafny = %self.path.display()).entered();
        let io_err = |source| CollaboratorError::Io { tool: DAFNY, source };

        let program = preprocess(source).map_err(|err| CollaboratorError::Failed {
            tool: DAFNY,
            message: err.to_string(),
        })?;
        let mut file = tempfile::Builder::new()
            .prefix("veriyul-")
            .suffix(".dfy")
            .tempfile()
            .map_err(io_err)?;
        file.write_all(program.as_bytes()).map_err(io_err)?;
        file.flush().map_err(io_err)?;

        let mut command = Command::new(&self.path);
        command
            .arg("verify")
            .args(["--resource-limit", RESOURCE_LIMIT])
            .args(["--verification-time-limit", TIME_LIMIT])
            .arg(file.path());

        let output = process::run(&mut command, DAFNY, self.timeout)?;
        let report = VerificationReport::from_output(output.success(), output.combined());
        tracing::debug!(verified = report.verified, errors = report.errors.len(), "dafny finished");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_report_success() {
        let report = VerificationReport::from_output(
            true,
            "\nDafny program verifier finished with 4 verified, 0 errors\n".into(),
        );
        assert!(report.verified);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_report_collects_diagnostics() {
        let output = "\
bank.dfy(12,4): Error: a postcondition could not be proved on this return path
bank.dfy(9,14): Related location: this is the postcondition that could not be proved

Dafny program verifier finished with 3 verified, 1 error
";
        let report = VerificationReport::from_output(false, output.into());
        assert!(!report.verified);
        assert_eq!(report.output, output);
        assert_eq!(
            report.errors,
            vec![
                "bank.dfy(12,4): Error: a postcondition could not be proved on this return path",
                "bank.dfy(9,14): Related location: this is the postcondition that could not be proved",
                "Dafny program verifier finished with 3 verified, 1 error",
            ]
        );
    }

    #[test]
    fn test_configured_path_wins() {
        let verifier =
            DafnyVerifier::locate(Some(Path::new("/opt/dafny/dafny")), Duration::from_secs(5))
                .unwrap();
        assert_eq!(verifier.path(), Path::new("/opt/dafny/dafny"));
    }
}
