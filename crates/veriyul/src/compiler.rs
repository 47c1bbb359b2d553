//! The compilation pipeline: verify, parse, generate Yul and ABI, assemble.
//!
//! [`Compiler::compile`] never fails outright. Every problem, including a failing or
//! missing external tool, ends up in [`CompilationOutput::error`], and whatever was
//! produced before the failure stays attached.

use crate::assembler::{Assembler, SolcAssembler};
use crate::config::{CompileMode, CompilerConfig};
use crate::error::CollaboratorResult;
use crate::verifier::{DafnyVerifier, VerificationReport, Verifier};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use veriyul_codegen::{AbiGenerator, YulGenerator};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompilationOutput {
    pub success: bool,
    pub verified: bool,
    pub contract_name: Option<String>,
    pub yul: Option<String>,
    pub abi: Option<String>,
    pub bytecode: Option<String>,
    pub runtime_bytecode: Option<String>,
    pub gas_estimate: Option<u64>,
    pub verification_output: Option<String>,
    pub verification_errors: Vec<String>,
    pub error: Option<String>,
}

impl CompilationOutput {
    fn failed(mut self, error: impl Into<String>) -> Self {
        let error = error.into();
        tracing::info!(%error, "compilation failed");
        self.success = false;
        self.error = Some(error);
        self
    }

    fn succeeded(mut self) -> Self {
        self.success = true;
        self
    }

    fn record(&mut self, report: VerificationReport) {
        self.verified = report.verified;
        self.verification_output = Some(report.output);
        self.verification_errors = report.errors;
    }
}

pub struct Compiler {
    config: CompilerConfig,
    /// `None` locates Dafny when verification first runs.
    verifier: Option<Box<dyn Verifier>>,
    assembler: Box<dyn Assembler>,
}

impl Compiler {
    pub fn new(config: CompilerConfig) -> Self {
        let assembler = SolcAssembler::new(
            config.solc_path.clone(),
            config.optimize,
            config.assembler_timeout(),
        );
        Self {
            config,
            verifier: None,
            assembler: Box::new(assembler),
        }
    }

    pub fn with_verifier(mut self, verifier: Box<dyn Verifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    pub fn with_assembler(mut self, assembler: Box<dyn Assembler>) -> Self {
        self.assembler = assembler;
        self
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn compile_file(&self, path: &Path) -> Result<CompilationOutput> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Ok(self.compile(&source))
    }

    pub fn compile(&self, source: &str) -> CompilationOutput {
        let _span = tracing::info_span!("compile").entered();
        let mut output = CompilationOutput::default();
        let mode = self.config.mode;

        if self.config.verify {
            match self.verify(source) {
                Ok(report) => output.record(report),
                Err(err) => output.verification_errors.push(err.to_string()),
            }
            if !output.verified {
                if !self.config.allow_unverified || mode == CompileMode::VerifyOnly {
                    let error = match output.verification_output {
                        Some(_) => "Formal verification failed".to_string(),
                        None => output.verification_errors.join("\n"),
                    };
                    return output.failed(error);
                }
                tracing::warn!("verification failed, generating code anyway");
            }
            if mode == CompileMode::VerifyOnly {
                return output.succeeded();
            }
        } else if mode == CompileMode::VerifyOnly {
            return output.failed("verify-only mode needs verification enabled");
        }

        let contract = match veriyul_parser::parse(source) {
            Ok(contract) => contract,
            Err(err) => return output.failed(err.to_string()),
        };
        tracing::info!(
            contract = %contract.name,
            methods = contract.methods.len(),
            fields = contract.fields.len(),
            "parsed"
        );
        output.contract_name = Some(contract.name.clone());

        let yul = YulGenerator::with_config(self.config.emitter.clone()).generate_output(&contract);
        output.yul = Some(yul.object.clone());

        match AbiGenerator::with_style(self.config.emitter.json_style).generate(&contract) {
            Ok(abi) => output.abi = Some(abi),
            Err(err) => return output.failed(err.to_string()),
        }

        if mode == CompileMode::YulOnly {
            return output.succeeded();
        }

        match self.assembler.assemble(&yul) {
            Ok(assembly) => {
                tracing::info!(bytes = assembly.bytecode.len() / 2, "assembled");
                output.gas_estimate = Some(assembly.gas_estimate());
                output.bytecode = Some(assembly.bytecode);
                output.runtime_bytecode = Some(assembly.runtime_bytecode);
                output.succeeded()
            }
            Err(err) => output.failed(err.to_string()),
        }
    }

    fn verify(&self, source: &str) -> CollaboratorResult<VerificationReport> {
        let _span = tracing::info_span!("verify").entered();
        match &self.verifier {
            Some(verifier) => verifier.verify(source),
            None => DafnyVerifier::locate(
                self.config.dafny_path.as_deref(),
                self.config.verifier_timeout(),
            )?
            .verify(source),
        }
    }
}
