use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use veriyul_emit::EmitterConfig;

/// What a compilation produces once the source has been verified (or verification skipped).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompileMode {
    /// Yul, ABI and bytecode.
    #[default]
    Full,
    /// Stop after verification.
    VerifyOnly,
    /// Yul and ABI without invoking the assembler.
    YulOnly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Run the verifier before generating code.
    pub verify: bool,
    /// Keep generating code when verification fails.
    pub allow_unverified: bool,
    pub mode: CompileMode,
    pub solc_path: PathBuf,
    /// Located automatically when unset.
    pub dafny_path: Option<PathBuf>,
    pub optimize: bool,
    pub assembler_timeout_secs: u64,
    pub verifier_timeout_secs: u64,
    pub emitter: EmitterConfig,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            verify: true,
            allow_unverified: false,
            mode: CompileMode::Full,
            solc_path: PathBuf::from("solc"),
            dafny_path: None,
            optimize: true,
            assembler_timeout_secs: 60,
            verifier_timeout_secs: 30,
            emitter: EmitterConfig::default(),
        }
    }
}

impl CompilerConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn assembler_timeout(&self) -> Duration {
        Duration::from_secs(self.assembler_timeout_secs)
    }

    pub fn verifier_timeout(&self) -> Duration {
        Duration::from_secs(self.verifier_timeout_secs)
    }
}
