use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use facemill::{
    init_logging, load_job, save_job, Config, FaceMillingGenerator, GenerateError,
    ParameterValidator, ValidationResult, Violation, BUILD_DATE, VERSION,
};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "facemill")]
#[command(version)]
#[command(about = "Generate face milling programs for CNC mills", long_about = None)]
struct Cli {
    /// Configuration file (.toml or .json); defaults to the platform config directory
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a program from a job file
    Generate {
        /// Job file (.toml or .json)
        #[arg(short, long)]
        job: PathBuf,

        /// Output directory, overriding the configured one
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the program to stdout instead of a file
        #[arg(long)]
        stdout: bool,
    },

    /// Check a job file and list every problem
    Validate {
        /// Job file (.toml or .json)
        #[arg(short, long)]
        job: PathBuf,
    },

    /// Write the default configuration
    InitConfig {
        /// Destination (.toml or .json)
        path: PathBuf,
    },

    /// Write a job file prefilled with the configured defaults
    InitJob {
        /// Destination (.toml or .json)
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_json)?;
    info!("FaceMill {} (built {})", VERSION, BUILD_DATE);

    match cli.command {
        Commands::Generate {
            job,
            output,
            stdout,
        } => generate(cli.config.as_deref(), &job, output, stdout),
        Commands::Validate { job } => validate(cli.config.as_deref(), &job),
        Commands::InitConfig { path } => {
            Config::default()
                .save_to_file(&path)
                .with_context(|| format!("Failed to write configuration {}", path.display()))?;
            info!("Wrote default configuration to {}", path.display());
            Ok(())
        }
        Commands::InitJob { path } => {
            let config = load_config(cli.config.as_deref())?;
            save_job(&config.defaults, &path)
                .with_context(|| format!("Failed to write job {}", path.display()))?;
            info!("Wrote job template to {}", path.display());
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    Config::load_or_default(path).context("Failed to load configuration")
}

fn report_violations(violations: &[Violation]) -> Result<()> {
    let mut stderr = io::stderr().lock();
    for violation in violations {
        writeln!(stderr, "{}", violation)?;
    }
    Ok(())
}

fn generate(
    config_path: Option<&Path>,
    job_path: &Path,
    output: Option<PathBuf>,
    stdout: bool,
) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(directory) = output {
        config.output.directory = directory;
    }

    let mut job = load_job(job_path)
        .with_context(|| format!("Failed to load job {}", job_path.display()))?;
    config.resolve_coolant(&mut job);

    let program = match FaceMillingGenerator::new().generate(&job, &config.machine_settings()) {
        Ok(program) => program,
        Err(GenerateError::Rejected(report)) => {
            report_violations(report.violations())?;
            bail!("Job rejected with {} violation(s)", report.len());
        }
        Err(err) => return Err(err).context("Program generation failed"),
    };

    if stdout {
        io::stdout().lock().write_all(program.text.as_bytes())?;
    } else {
        let now = chrono::Local::now().naive_local();
        let path = config
            .output
            .save_program(&program.text, now)
            .context("Failed to save program")?;
        println!("{}", path.display());
    }
    Ok(())
}

fn validate(config_path: Option<&Path>, job_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let mut job = load_job(job_path)
        .with_context(|| format!("Failed to load job {}", job_path.display()))?;
    config.resolve_coolant(&mut job);

    let machine = config.machine_settings();
    let mut violations = match ParameterValidator::validate_with(&job, &machine) {
        ValidationResult::Valid(_) => Vec::new(),
        ValidationResult::Invalid(report) => report.into_iter().collect(),
    };
    violations.extend(ParameterValidator::validate_machine(&machine));
    if !violations.is_empty() {
        report_violations(&violations)?;
        bail!("Job rejected with {} violation(s)", violations.len());
    }

    println!("{}: ok", job_path.display());
    Ok(())
}
