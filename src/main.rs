// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{LevelFilter, Level, Log, Metadata, Record, SetLoggerError, error, info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};

use subalign::app_config::{self, Config, ServiceProvider};
use subalign::app_controller::{CorrectionJob, Controller};
use subalign::correction::{RenderOptions, render_with};

/// CLI Wrapper for ServiceProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliServiceProvider {
    Ollama,
    #[value(name = "openai")]
    OpenAI,
    Anthropic,
    #[value(name = "lmstudio")]
    LMStudio,
}

impl From<CliServiceProvider> for ServiceProvider {
    fn from(cli_provider: CliServiceProvider) -> Self {
        match cli_provider {
            CliServiceProvider::Ollama => ServiceProvider::Ollama,
            CliServiceProvider::OpenAI => ServiceProvider::OpenAI,
            CliServiceProvider::Anthropic => ServiceProvider::Anthropic,
            CliServiceProvider::LMStudio => ServiceProvider::LMStudio,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Correct ASR subtitles against a reference transcript
    Correct(CorrectArgs),

    /// Parse a subtitle file and report problems
    Validate {
        /// Subtitle file to check
        #[arg(short, long, value_name = "SRT")]
        subtitles: PathBuf,
    },

    /// Generate shell completions for subalign
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct CorrectArgs {
    /// Reference transcript (plain text)
    #[arg(short, long, value_name = "TXT")]
    transcript: PathBuf,

    /// ASR subtitle file to correct
    #[arg(short, long, value_name = "SRT")]
    subtitles: PathBuf,

    /// Corrected subtitle file [default: <stem>.corrected.srt]
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Report file [default: <stem>.report.txt]
    #[arg(short, long)]
    report: Option<PathBuf>,

    /// Also write the report as JSON
    #[arg(long)]
    json_report: Option<PathBuf>,

    /// Correction provider to use
    #[arg(short, long, value_enum)]
    provider: Option<CliServiceProvider>,

    /// Model name to use for correction
    #[arg(short, long)]
    model: Option<String>,

    /// Maximum cues per batch
    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Configuration file path
    #[arg(short, long = "config", visible_alias = "config-path", default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force: bool,
}

/// subalign - subtitle correction against a reference transcript
///
/// Corrects the wording of ASR subtitles with an AI provider while keeping
/// every cue and timestamp exactly as they are.
#[derive(Parser, Debug)]
#[command(name = "subalign")]
#[command(version)]
#[command(about = "AI-assisted subtitle correction against a reference transcript")]
#[command(long_about = "subalign corrects the wording of automatically transcribed subtitles using a trusted reference transcript. Cue count and timing are never changed.

EXAMPLES:
    subalign correct -t talk.txt -s talk.srt              # Writes talk.corrected.srt and talk.report.txt
    subalign correct -t talk.txt -s talk.srt -f           # Overwrite existing outputs
    subalign correct -t talk.txt -s talk.srt -p openai -m gpt-4o
    subalign validate -s talk.srt                         # Check a subtitle file
    subalign completions bash > subalign.bash             # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config. If the config file doesn't exist, a default one
    will be created automatically.

SUPPORTED PROVIDERS:
    ollama    - Local Ollama server (default: llama3.2:3b)
    openai    - OpenAI API (requires API key)
    anthropic - Anthropic Claude API (requires API key)
    lmstudio  - LM Studio local server (OpenAI-compatible on http://localhost:1234/v1)")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        // Records are filtered by the global max level, which may be raised later
        let logger = Box::new(CustomLogger::new(LevelFilter::Trace));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Label and ANSI colour for a level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("ERROR", "1;31"),
            Level::Warn => ("WARN ", "1;33"),
            Level::Info => ("INFO ", "1;32"),
            Level::Debug => ("DEBUG", "1;36"),
            Level::Trace => ("TRACE", "1;35"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level && metadata.target().starts_with("subalign")
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (label, colour) = Self::style_for_level(record.level());
            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "\x1B[{}m{} {} {}\x1B[0m", colour, now, label, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = CustomLogger::init(LevelFilter::Info) {
        eprintln!("Failed to initialize logger: {}", e);
    }

    let cli = CommandLineOptions::parse();
    let result = match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "subalign", &mut std::io::stdout());
            Ok(())
        }
        Commands::Validate { subtitles } => run_validate(&subtitles),
        Commands::Correct(args) => run_correct(args).await,
    };

    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run_validate(subtitles: &Path) -> Result<()> {
    let track = Controller::validate_subtitles(subtitles)?;
    println!("{}: {}", subtitles.display(), track);
    Ok(())
}

async fn run_correct(options: CorrectArgs) -> Result<()> {
    // If log level is set via command line, apply it immediately
    if let Some(level) = &options.log_level {
        let level: app_config::LogLevel = level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let config = load_config(&options)?;

    // If log level was not set via command line, update it from config now
    if options.log_level.is_none() {
        log::set_max_level(config.log_level.to_level_filter());
    }

    let controller = Controller::with_config(config)?;
    let job = CorrectionJob {
        transcript: options.transcript,
        subtitles: options.subtitles,
        output: options.output,
        report: options.report,
        json_report: options.json_report,
        force: options.force,
    };

    let outcome = controller.run(&job).await?;
    let rendered = render_with(&outcome.report, RenderOptions {
        include_unchanged: controller.config().correction.report_unchanged,
    });

    println!("{}", rendered);

    if let Some(cancelled) = outcome.cancellation() {
        return Err(cancelled.into());
    }
    info!("Success: {:?}", job.output_path());
    Ok(())
}

// @loads: Config from file (created with defaults when missing), CLI overrides applied
fn load_config(options: &CorrectArgs) -> Result<Config> {
    let config_path = Path::new(&options.config_path);
    let mut config = if config_path.exists() {
        Config::from_file(config_path)?
    } else {
        warn!("Config file not found at '{}', creating default config.", options.config_path);
        let config = Config::default();
        config.save(config_path)
            .with_context(|| format!("Failed to write default config to file: {}", options.config_path))?;
        config
    };

    if let Some(provider) = &options.provider {
        config.service.provider = provider.clone().into();
    }
    if let Some(model) = &options.model {
        config.service.active_provider_config_mut().model = model.clone();
    }
    if let Some(batch_size) = options.batch_size {
        config.correction.max_batch_size = batch_size;
    }
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }

    config.validate()
        .context("Configuration validation failed")?;
    Ok(config)
}
