//! Yul to EVM bytecode through `solc --strict-assembly`.

use crate::error::{CollaboratorError, CollaboratorResult};
use crate::process;
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;
use veriyul_codegen::YulOutput;

const SOLC: &str = "solc";
const BINARY_MARKER: &str = "Binary representation:";

/// Hex-encoded bytecode, without a `0x` prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembly {
    pub bytecode: String,
    pub runtime_bytecode: String,
}

impl Assembly {
    /// Rough deployment cost: one unit per byte of creation code.
    pub fn gas_estimate(&self) -> u64 {
        (self.bytecode.len() / 2) as u64
    }
}

pub trait Assembler {
    fn assemble(&self, yul: &YulOutput) -> CollaboratorResult<Assembly>;
}

#[derive(Debug, Clone)]
pub struct SolcAssembler {
    path: PathBuf,
    optimize: bool,
    timeout: Duration,
}

impl SolcAssembler {
    pub fn new(path: impl Into<PathBuf>, optimize: bool, timeout: Duration) -> Self {
        Self {
            path: path.into(),
            optimize,
            timeout,
        }
    }

    fn assemble_object(&self, yul: &str) -> CollaboratorResult<String> {
        let io_err = |source| CollaboratorError::Io { tool: SOLC, source };
        let mut file = tempfile::Builder::new()
            .prefix("veriyul-")
            .suffix(".yul")
            .tempfile()
            .map_err(io_err)?;
        file.write_all(yul.as_bytes()).map_err(io_err)?;
        file.flush().map_err(io_err)?;

        let mut command = Command::new(&self.path);
        command.arg("--strict-assembly");
        if self.optimize {
            command.arg("--optimize");
        }
        command.arg("--bin").arg(file.path());

        let output = process::run(&mut command, SOLC, self.timeout)?;
        if !output.success() {
            let message = match output.stderr.trim() {
                "" => output.stdout.trim().to_string(),
                stderr => stderr.to_string(),
            };
            return Err(CollaboratorError::Failed { tool: SOLC, message });
        }
        extract_bytecode(&output.stdout).ok_or_else(|| CollaboratorError::Failed {
            tool: SOLC,
            message: format!("no `{}` section in solc output", BINARY_MARKER),
        })
    }
}

impl Assembler for SolcAssembler {
    fn assemble(&self, yul: &YulOutput) -> CollaboratorResult<Assembly> {
        let _span = tracing::debug_span!("assemble", solc = %self.path.display()).entered();
        let bytecode = self.assemble_object(&yul.object)?;
        let runtime_bytecode = self.assemble_object(&yul.runtime)?;
        tracing::debug!(bytes = bytecode.len() / 2, "assembled");
        Ok(Assembly {
            bytecode,
            runtime_bytecode,
        })
    }
}

/// The first non-empty line after the binary marker.
fn extract_bytecode(stdout: &str) -> Option<String> {
    let mut lines = stdout.lines();
    lines.find(|line| line.contains(BINARY_MARKER))?;
    lines
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}
