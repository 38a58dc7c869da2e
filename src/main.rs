// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, error, info, warn};

use cuegate::app_config::{self, Config, TranslationProvider};
use cuegate::app_controller::Controller;
use cuegate::validation::{GateResult, GateThresholds};

/// CLI Wrapper for TranslationProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslationProvider {
    Ollama,
    #[value(name = "openai")]
    OpenAI,
    Anthropic,
    #[value(name = "lmstudio")]
    LMStudio,
    Mock,
}

impl From<CliTranslationProvider> for TranslationProvider {
    fn from(cli_provider: CliTranslationProvider) -> Self {
        match cli_provider {
            CliTranslationProvider::Ollama => TranslationProvider::Ollama,
            CliTranslationProvider::OpenAI => TranslationProvider::OpenAI,
            CliTranslationProvider::Anthropic => TranslationProvider::Anthropic,
            CliTranslationProvider::LMStudio => TranslationProvider::LMStudio,
            CliTranslationProvider::Mock => TranslationProvider::Mock,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
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
    /// Translate a subtitle file and run the quality gate on the result
    Translate(TranslateArgs),

    /// Run only the quality gate on an existing subtitle file
    Check(CheckArgs),

    /// Generate shell completions for cuegate
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct TranslateArgs {
    /// Input SRT file or JSON segment list
    #[arg(value_name = "INPUT_PATH")]
    input_path: PathBuf,

    /// Target language code (e.g., 'he', 'es', 'fr')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Translation provider to use
    #[arg(short, long, value_enum)]
    provider: Option<CliTranslationProvider>,

    /// Model name to use for translation
    #[arg(short, long)]
    model: Option<String>,

    /// Output SRT path (default: <stem>.<lang>.srt next to the input)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write a JSON report of the job to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: PathBuf,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,
}

#[derive(Parser, Debug)]
struct CheckArgs {
    /// Subtitle file to check (SRT or JSON segment list)
    #[arg(value_name = "INPUT_PATH")]
    input_path: PathBuf,

    /// Reading speed ceiling in characters per second
    #[arg(long, env = "MAX_CPS", default_value_t = 22.0)]
    max_cps: f64,

    /// On-screen duration ceiling in seconds
    #[arg(long, env = "MAX_CUE_DURATION", default_value_t = 6.0)]
    max_cue_duration: f64,

    /// Minimum gap between consecutive cues in milliseconds
    #[arg(long, env = "MIN_GAP_MS", default_value_t = 50.0)]
    min_gap_ms: f64,

    /// Print the full verdict as JSON
    #[arg(long)]
    json: bool,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

/// cuegate - subtitle translation with reconciliation and a quality gate
///
/// Translates subtitles through AI providers, guarantees one output cue per
/// input segment, and checks the result for overlaps, reading speed and
/// on-screen duration.
#[derive(Parser, Debug)]
#[command(name = "cuegate")]
#[command(version)]
#[command(about = "AI subtitle translation with a presentation quality gate")]
#[command(long_about = "cuegate translates subtitle files with AI providers and validates the result.

EXAMPLES:
    cuegate translate movie.srt -t he            # Translate using default config
    cuegate translate -f movie.srt -t es         # Force overwrite existing output
    cuegate translate -p openai -m gpt-4o movie.srt
    cuegate translate -p mock movie.srt          # Dry run without a provider
    cuegate check movie.he.srt --max-cps 17      # Quality gate only
    cuegate completions bash > cuegate.bash      # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically. MAX_SEGMENTS_PER_BATCH, MAX_TOKENS_PER_BATCH,
    MAX_RETRIES, MAX_CPS, MAX_CUE_DURATION and MIN_GAP_MS override the file.

EXIT STATUS:
    0 when the output passes the quality gate, 1 on errors, 2 when the gate fails.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger { level: LevelFilter::Trace }))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI colour for log level
    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }

    // @returns: Emoji for log level
    fn emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌",
            Level::Warn => "🚧",
            Level::Info => " ",
            Level::Debug => "🔍",
            Level::Trace => "📋",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level && metadata.target().starts_with("cuegate")
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let _ = writeln!(
                std::io::stderr(),
                "{}{} {} {}\x1B[0m",
                Self::color_for_level(record.level()),
                now,
                Self::emoji_for_level(record.level()),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Exit status when the translated output fails the quality gate
const GATE_FAILED: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    // Level is updated once the config is loaded
    if let Err(e) = CustomLogger::init(LevelFilter::Info) {
        eprintln!("Failed to initialize logger: {}", e);
    }

    let cli = CommandLineOptions::parse();

    let result = match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "cuegate", &mut std::io::stdout());
            Ok(true)
        }
        Commands::Translate(args) => run_translate(args).await,
        Commands::Check(args) => run_check(args),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(GATE_FAILED),
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn apply_log_level(level: app_config::LogLevel) {
    log::set_max_level(level.into());
}

fn print_violations(gate: &GateResult) {
    for violation in &gate.violations {
        warn!("{}", violation);
    }
}

/// Returns whether the output passed the quality gate
async fn run_translate(options: TranslateArgs) -> Result<bool> {
    // Apply the command line level immediately so config loading is visible
    if let Some(level) = options.log_level {
        apply_log_level(level.into());
    }

    let mut config = Config::load_or_create(&options.config_path)?;
    config.apply_env_overrides();

    // Override config with CLI options if provided
    if let Some(provider) = options.provider {
        config.translation.provider = provider.into();
    }
    if let Some(model) = &options.model {
        let provider = config.translation.provider;
        config.translation.provider_config_mut(provider).model = model.clone();
    }
    if let Some(target_language) = &options.target_language {
        config.target_language = target_language.clone();
    }
    if let Some(level) = options.log_level {
        config.log_level = level.into();
    }

    config.validate().context("Configuration validation failed")?;
    apply_log_level(config.log_level);

    let controller = Controller::with_config(config)?;

    let cancellation = controller.cancellation();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the current batch");
            cancellation.cancel();
        }
    });

    let Some(report) = controller
        .run(&options.input_path, options.output, options.force_overwrite)
        .await?
    else {
        return Ok(true);
    };

    if let Some(report_path) = &options.report {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        std::fs::write(report_path, json)
            .with_context(|| format!("Failed to write report: {}", report_path.display()))?;
        info!("Report written to {}", report_path.display());
    }

    if !report.fallback_ids.is_empty() {
        warn!(
            "{} segment(s) kept their source text: {:?}",
            report.fallback_ids.len(),
            report.fallback_ids
        );
    }

    print_violations(&report.gate);
    println!("{}", report.gate.summary());

    Ok(report.gate.passed)
}

/// Returns whether the file passed the quality gate
fn run_check(options: CheckArgs) -> Result<bool> {
    if let Some(level) = options.log_level {
        apply_log_level(level.into());
    }

    let thresholds = GateThresholds {
        max_cps: options.max_cps,
        max_cue_duration: options.max_cue_duration,
        min_gap_ms: options.min_gap_ms,
    };
    app_config::validate_thresholds(&thresholds)?;
    let gate = Controller::check_file(&options.input_path, &thresholds)?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&gate).context("Failed to serialize verdict")?);
    } else {
        print_violations(&gate);
        println!("{}", gate.summary());
    }

    Ok(gate.passed)
}
