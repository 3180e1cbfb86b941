use std::fs::read_to_string;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use pulse_rs::config::CompilerConfig;
use pulse_rs::executor::Executor;
use pulse_rs::job::JobDescriptor;
use pulse_rs::program::CompiledSchedule;
use pulse_rs::Program;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
struct Cli {
    /// YAML compiler configuration; `PULSE_*` environment variables override it
    #[arg(short, long, global = true, env = "PULSE_CONFIG")]
    config: Option<PathBuf>,

    /// Log filter used when `RUST_LOG` is unset
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Command {
    /// Compile a JSON job descriptor and print the result as JSON
    Compile {
        #[arg(short = 'o', long = "output")]
        output: Option<OutputType>,
        job: PathBuf,
    },
    /// Compile a job and run it on the simulator, printing the dataset as JSON
    Run {
        /// Overrides the shot count from the job's configuration
        #[arg(short, long)]
        shots: Option<u32>,
        job: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Debug, Default)]
pub enum OutputType {
    /// The timing table: every instruction with its absolute start and preceding gap
    #[default]
    Manifest,
    /// Rendered operations, per channel
    Operations,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level)?;

    let config = CompilerConfig::load(cli.config.as_deref())
        .context("Failed to load compiler configuration.")?;

    match cli.command {
        Command::Compile { output, job } => {
            handle_compile(&config, output.unwrap_or_default(), &job)?
        }
        Command::Run { shots, job } => handle_run(config, shots, &job)?,
    };

    Ok(())
}

fn init_tracing(default_level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .context("Invalid log level.")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn load_job(path: &Path) -> anyhow::Result<JobDescriptor> {
    let json = read_to_string(path)
        .with_context(|| format!("Failed to read job descriptor {}.", path.display()))?;
    JobDescriptor::from_json(&json)
        .with_context(|| format!("Failed to parse job descriptor {}.", path.display()))
}

fn handle_compile(config: &CompilerConfig, output: OutputType, path: &Path) -> anyhow::Result<()> {
    let job = load_job(path)?;
    let compiled: CompiledSchedule = Program::from_job(&job, config)
        .and_then(|program| program.compile(config))
        .context("Failed to compile job.")?;

    let rendered = match output {
        OutputType::Manifest => serde_json::to_string_pretty(compiled.schedule.manifest()),
        OutputType::Operations => serde_json::to_string_pretty(&compiled.operations),
    }
    .context("Failed to serialize compiled schedule.")?;

    println!("{rendered}");
    Ok(())
}

fn handle_run(config: CompilerConfig, shots: Option<u32>, path: &Path) -> anyhow::Result<()> {
    let job = load_job(path)?;
    let shots = shots.unwrap_or(job.config.shots);

    let mut executor = Executor::simulated(config);
    let compiled = executor
        .construct_schedule(&job)
        .context("Failed to compile job.")?;
    let dataset = executor
        .run(&compiled, shots)
        .context("Failed to run job on the simulator.")?;
    executor.close().context("Failed to close the executor.")?;

    println!(
        "{}",
        serde_json::to_string_pretty(&dataset).context("Failed to serialize dataset.")?
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use clap::Parser;

    use super::*;

    fn ramsey_job() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("../pulse-rs/tests/jobs/ramsey.json")
    }

    #[test]
    fn compile_defaults_to_manifest() {
        let cli = Cli::try_parse_from(["pulse-cli", "compile", "job.json"]).unwrap();
        assert_eq!(cli.log_level, "warn");
        assert!(matches!(
            cli.command,
            Command::Compile { output: None, ref job } if job == Path::new("job.json")
        ));
    }

    #[test]
    fn compile_operations_with_config() {
        let cli = Cli::try_parse_from([
            "pulse-cli",
            "compile",
            "--output",
            "operations",
            "job.json",
            "--config",
            "pulse.yaml",
        ])
        .unwrap();
        assert_eq!(cli.config.as_deref(), Some(Path::new("pulse.yaml")));
        assert!(matches!(
            cli.command,
            Command::Compile {
                output: Some(OutputType::Operations),
                ..
            }
        ));
    }

    #[test]
    fn run_takes_a_shot_override() {
        let cli = Cli::try_parse_from(["pulse-cli", "run", "-s", "64", "job.json"]).unwrap();
        assert!(matches!(cli.command, Command::Run { shots: Some(64), .. }));
    }

    #[test]
    fn invalid_arguments_are_rejected() {
        assert!(Cli::try_parse_from(["pulse-cli"]).is_err());
        assert!(Cli::try_parse_from(["pulse-cli", "compile"]).is_err());
        assert!(Cli::try_parse_from(["pulse-cli", "compile", "-o", "graph", "job.json"]).is_err());
        assert!(Cli::try_parse_from(["pulse-cli", "run", "--shots", "many", "job.json"]).is_err());
    }

    #[test]
    fn handlers_process_a_job_file() {
        let config = CompilerConfig::default();
        handle_compile(&config, OutputType::Manifest, &ramsey_job()).unwrap();
        handle_compile(&config, OutputType::Operations, &ramsey_job()).unwrap();
        handle_run(config, Some(8), &ramsey_job()).unwrap();
    }

    #[test]
    fn missing_job_file_is_an_error() {
        let error = handle_compile(
            &CompilerConfig::default(),
            OutputType::Manifest,
            Path::new("no-such-job.json"),
        )
        .unwrap_err();
        assert!(error.to_string().contains("no-such-job.json"));
    }
}
