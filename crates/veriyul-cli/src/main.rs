use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use veriyul::core::Contract;
use veriyul::{CompilationOutput, CompileMode, CompilerConfig};

#[derive(Parser)]
#[command(name = "veriyul")]
#[command(about = "veriyul - Compile formally verified contracts to Yul and EVM bytecode")]
#[command(version = "0.1.0")]
#[command(author = "Gianluca Brigandi <gbrigand@gmail.com>")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify, compile and write the build artifacts
    Compile(CompileArgs),

    /// Print the ABI JSON
    Abi {
        input: PathBuf,

        #[arg(long)]
        compact: bool,

        #[arg(short, long)]
        verbose: bool,
    },

    /// Print the selector of every dispatched method
    Selectors {
        input: PathBuf,

        #[arg(short, long)]
        verbose: bool,
    },

    /// Print the parsed contract and its storage layout
    Inspect {
        input: PathBuf,

        #[arg(short, long)]
        verbose: bool,
    },
}

#[derive(Args)]
struct CompileArgs {
    input: PathBuf,

    #[arg(short, long, default_value = "build")]
    output: PathBuf,

    #[arg(long)]
    skip_verification: bool,

    #[arg(long, conflicts_with_all = ["skip_verification", "yul_only"])]
    verify_only: bool,

    /// Stop after Yul and ABI generation
    #[arg(long)]
    yul_only: bool,

    /// Generate code even when verification fails
    #[arg(long)]
    allow_unverified: bool,

    #[arg(long)]
    solc: Option<PathBuf>,

    #[arg(long)]
    dafny: Option<PathBuf>,

    /// JSON compiler configuration; flags override its fields
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the full compilation result as JSON
    #[arg(long)]
    json: bool,

    #[arg(short, long)]
    verbose: bool,
}

impl CompileArgs {
    fn compiler_config(&self) -> Result<CompilerConfig> {
        let mut config = match &self.config {
            Some(path) => CompilerConfig::from_file(path)?,
            None => CompilerConfig::default(),
        };
        if self.skip_verification {
            config.verify = false;
        }
        if self.allow_unverified {
            config.allow_unverified = true;
        }
        if self.verify_only {
            config.mode = CompileMode::VerifyOnly;
        } else if self.yul_only {
            config.mode = CompileMode::YulOnly;
        }
        if let Some(solc) = &self.solc {
            config.solc_path = solc.clone();
        }
        if let Some(dafny) = &self.dafny {
            config.dafny_path = Some(dafny.clone());
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Compile(args) => {
            init_logging(args.verbose);
            cmd_compile(args)
        }
        Commands::Abi {
            input,
            compact,
            verbose,
        } => {
            init_logging(verbose);
            cmd_abi(input, compact)
        }
        Commands::Selectors { input, verbose } => {
            init_logging(verbose);
            cmd_selectors(input)
        }
        Commands::Inspect { input, verbose } => {
            init_logging(verbose);
            cmd_inspect(input)
        }
    }
}

/// `RUST_LOG` wins; otherwise warnings only, or debug output with `-v`.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_contract(input: &Path) -> Result<Contract> {
    let source = std::fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    Ok(veriyul::parser::parse(&source)?)
}

fn cmd_compile(args: CompileArgs) -> Result<()> {
    use colored::*;
    use std::time::Instant;
    use veriyul::emit::{JsonFormatter, OutputStyle};
    use veriyul::Compiler;

    let config = args.compiler_config()?;
    if args.verbose && !args.json {
        println!("{}", " veriyul Compiler".bright_blue().bold());
        println!("{}", "=".repeat(50).bright_blue());
        println!(" Input: {}", args.input.display());
        println!(" Output: {}", args.output.display());
        println!(
            " Verification: {}",
            if config.verify { "enabled" } else { "skipped" }
        );
        println!();
    }

    let start = Instant::now();
    let output = Compiler::new(config).compile_file(&args.input)?;
    let written = write_artifacts(&output, &args.output)?;

    if args.json {
        JsonFormatter::write(&mut std::io::stdout(), &output, OutputStyle::Pretty)?;
    } else if output.success {
        print_success(&output, &written, start.elapsed().as_secs_f64());
    } else {
        print_failure(&output);
    }

    if output.success {
        Ok(())
    } else {
        Err(anyhow!("Compilation failed"))
    }
}

/// Writes whatever the compilation produced, including partial output of a failed run.
fn write_artifacts(output: &CompilationOutput, dir: &Path) -> Result<Vec<PathBuf>> {
    let Some(name) = &output.contract_name else {
        return Ok(Vec::new());
    };
    let artifacts = [
        ("yul", &output.yul),
        ("abi.json", &output.abi),
        ("bin", &output.bytecode),
        ("bin-runtime", &output.runtime_bytecode),
    ];

    let mut written = Vec::new();
    for (extension, content) in artifacts {
        let Some(content) = content else {
            continue;
        };
        if written.is_empty() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        let path = dir.join(format!("{}.{}", name, extension));
        std::fs::write(&path, content)
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::debug!(path = %path.display(), "wrote artifact");
        written.push(path);
    }
    Ok(written)
}

fn print_success(output: &CompilationOutput, written: &[PathBuf], seconds: f64) {
    use colored::*;

    let name = output.contract_name.as_deref().unwrap_or("contract");
    let attempted = output.verification_output.is_some() || !output.verification_errors.is_empty();
    if attempted && !output.verified {
        println!(
            " {} {} was not verified; code generated anyway",
            "WARNING:".bright_yellow().bold(),
            name
        );
    }
    if written.is_empty() {
        println!(" {} Verification passed", "VERIFIED:".bright_green().bold());
        return;
    }

    println!(" {} Compiled {}", "SUCCESS:".bright_green().bold(), name);
    println!("   Verified: {}", if output.verified { "yes" } else { "no" });
    if let Some(gas) = output.gas_estimate {
        println!("   Gas estimate: {}", gas);
    }
    println!("   Time: {:.3}s", seconds);
    for path in written {
        println!("   Wrote: {}", path.display());
    }
}

fn print_failure(output: &CompilationOutput) {
    use colored::*;

    println!(
        " {} {}",
        "FAILED:".bright_red().bold(),
        output.error.as_deref().unwrap_or("unknown error")
    );
    if !output.verification_errors.is_empty() {
        println!("\n{}", "Verification errors:".bright_red());
        for error in &output.verification_errors {
            println!("   {}", error);
        }
    }
}

fn cmd_abi(input: PathBuf, compact: bool) -> Result<()> {
    use veriyul::codegen::AbiGenerator;
    use veriyul::emit::OutputStyle;

    let contract = load_contract(&input)?;
    let style = if compact {
        OutputStyle::Compact
    } else {
        OutputStyle::Pretty
    };
    println!("{}", AbiGenerator::with_style(style).generate(&contract)?);
    Ok(())
}

fn cmd_selectors(input: PathBuf) -> Result<()> {
    use veriyul::codegen::selectors;

    let contract = load_contract(&input)?;
    for (signature, selector) in selectors(&contract) {
        println!("{} -> {}", signature, selector);
    }
    Ok(())
}

fn cmd_inspect(input: PathBuf) -> Result<()> {
    use veriyul::codegen::{state_mutability, StorageLayout};
    use veriyul::core::signature::method_signature;
    use veriyul::core::Selector;
    use veriyul::emit::{EmitContext, ReportWriter};

    let contract = load_contract(&input)?;
    let layout = StorageLayout::allocate(&contract.fields, &contract.structs);
    let mut report = ReportWriter::new(std::io::stdout().lock(), EmitContext::new());

    report.title(&format!("Contract {}", contract.name))?;
    if let Some(base) = &contract.base {
        report.field("base", base)?;
    }
    if let Some(license) = &contract.license {
        report.field("license", license)?;
    }
    for library in &contract.libraries {
        report.field("library", format!("{} ({})", library.name, library.path))?;
    }

    report.section("Storage")?;
    for (name, entry) in layout.entries() {
        let slots = match entry.size {
            1 => format!("slot {}", entry.slot),
            size => format!("slots {}..{}", entry.slot, entry.slot + size - 1),
        };
        report.field(name, format!("{} : {}", slots, entry.ty))?;
    }
    for name in contract.constants.keys() {
        report.field(name, "ghost")?;
    }

    report.section("Methods")?;
    for method in &contract.methods {
        let signature = method_signature(method);
        let selector = if method.is_exposed() {
            Selector::from_signature(&signature).to_string()
        } else {
            "-".to_string()
        };
        let summary = format!(
            "{} {} {}",
            method.visibility,
            state_mutability(method),
            selector
        );
        report.field(&signature, summary)?;
    }

    if !contract.events.is_empty() || !contract.errors.is_empty() {
        report.section("Events and errors")?;
        for event in &contract.events {
            let note = if event.anonymous { "event (anonymous)" } else { "event" };
            report.field(&event.name, note)?;
        }
        for error in &contract.errors {
            report.field(&error.name, "error")?;
        }
    }

    report.section("Summary")?;
    let counts = [
        ("structs", contract.structs.len()),
        ("modifiers", contract.modifiers.len()),
        ("invariants", contract.invariants.len()),
        ("static slots", layout.total_slots() as usize),
    ];
    for (label, count) in counts {
        report.field(label, count.to_string())?;
    }
    report.finish()?;
    Ok(())
}
