// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, error};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use droidlingo::app_config::{self, Config, ProviderConfig, ProviderKind, TextType};
use droidlingo::app_controller::{Controller, OutputMode, RunSummary};
use droidlingo::language_utils;
use droidlingo::translation::FailurePolicy;

/// CLI Wrapper for ProviderKind to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliProvider {
    Azure,
    Google,
    #[value(name = "libretranslate")]
    LibreTranslate,
}

impl From<CliProvider> for ProviderKind {
    fn from(cli_provider: CliProvider) -> Self {
        match cli_provider {
            CliProvider::Azure => ProviderKind::Azure,
            CliProvider::Google => ProviderKind::Google,
            CliProvider::LibreTranslate => ProviderKind::LibreTranslate,
        }
    }
}

/// CLI Wrapper for TextType to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliTextType {
    Plain,
    Html,
}

impl From<CliTextType> for TextType {
    fn from(cli_text_type: CliTextType) -> Self {
        match cli_text_type {
            CliTextType::Plain => TextType::Plain,
            CliTextType::Html => TextType::Html,
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
    /// Translate one strings.xml into every target language
    Translate(TranslateArgs),

    /// Merge all values*/strings.xml of a res/ directory, then translate
    Merge(MergeArgs),

    /// Generate shell completions for droidlingo
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug)]
struct TranslateArgs {
    /// Input strings.xml
    #[arg(value_name = "FILE")]
    input_file: PathBuf,

    /// Source language code, or 'auto'
    #[arg(value_name = "SOURCE_LANG")]
    source_language: String,

    /// Target language codes (e.g. 'es', 'fr', 'pt-BR')
    #[arg(value_name = "TARGET_LANGS", required = true, num_args = 1..)]
    target_languages: Vec<String>,

    /// Overwrite the input file instead of writing strings-<lang>.xml
    #[arg(long)]
    in_place: bool,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args, Debug)]
struct MergeArgs {
    /// Android res/ directory
    #[arg(value_name = "RES_DIR")]
    res_dir: PathBuf,

    /// Language of the default values/ directory, or 'auto'
    #[arg(value_name = "SOURCE_LANG")]
    source_language: String,

    /// Target language codes (e.g. 'es', 'fr', 'pt-BR')
    #[arg(value_name = "TARGET_LANGS", required = true, num_args = 1..)]
    target_languages: Vec<String>,

    /// Source locales from lowest to highest precedence (default: directory order)
    #[arg(long, value_delimiter = ',')]
    precedence: Option<Vec<String>>,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Configuration file path (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Provider chain, in fallback order (repeatable)
    #[arg(short, long = "provider", value_enum)]
    providers: Vec<CliProvider>,

    /// Transliterate into the target script instead of translating
    #[arg(long)]
    transliterate: bool,

    /// Target script for transliteration (e.g. 'Latn')
    #[arg(long)]
    to_script: Option<String>,

    /// Parallel translation workers
    #[arg(long)]
    max_workers: Option<usize>,

    /// Microsoft Translator key
    #[arg(long)]
    ms_key: Option<String>,

    /// Microsoft Translator region
    #[arg(long)]
    ms_region: Option<String>,

    /// Microsoft Translator endpoint
    #[arg(long)]
    ms_endpoint: Option<String>,

    /// Microsoft Translator API version (default 3.0)
    #[arg(long)]
    ms_api_version: Option<String>,

    /// Microsoft Translator custom category
    #[arg(long)]
    ms_category: Option<String>,

    /// Microsoft Translator text type
    #[arg(long, value_enum)]
    ms_text_type: Option<CliTextType>,

    /// HTTP timeout in seconds
    #[arg(long)]
    http_timeout: Option<u64>,

    /// Idle HTTP connections kept per host
    #[arg(long)]
    http_pool_maxsize: Option<usize>,

    /// Attempts per provider for transient failures
    #[arg(long)]
    http_retries: Option<u32>,

    /// Treat a language with failed units as failed
    #[arg(long)]
    mark_incomplete: bool,

    /// Hide the progress bar
    #[arg(long)]
    no_progress: bool,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

/// droidlingo - Android string resource translator
///
/// Translates strings.xml files with machine translation providers while keeping
/// format specifiers, escapes, comments and layout intact.
#[derive(Parser, Debug)]
#[command(name = "droidlingo")]
#[command(version)]
#[command(about = "Translate Android strings.xml resources")]
#[command(long_about = "droidlingo translates Android strings.xml resources with Azure Translator, Google or LibreTranslate.

EXAMPLES:
    droidlingo translate res/values/strings.xml en es fr pt-BR
    droidlingo translate strings.xml en sr --transliterate --to-script Latn --ms-key KEY
    droidlingo merge app/src/main/res auto de it
    droidlingo completions bash > droidlingo.bash

CONFIGURATION:
    Settings come from defaults, then the --config JSON file, then the
    AZURE_TRANSLATOR_* environment variables, then command line flags.
    Without an Azure key the chain falls back to Google then LibreTranslate.")]
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
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji and ANSI colour for log level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("❌ ", "1;31"),
            Level::Warn => ("🚧 ", "1;33"),
            Level::Info => (" ", "1;32"),
            Level::Debug => ("🔍 ", "1;36"),
            Level::Trace => ("📋 ", "1;35"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level && metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (emoji, colour) = Self::style_for_level(record.level());
            let _ = writeln!(
                std::io::stderr(),
                "\x1B[{}m{} {} {}\x1B[0m",
                colour,
                now,
                emoji,
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Accept everything here; the configured level is applied through max_level
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    let summary = match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "droidlingo", &mut std::io::stdout());
            return Ok(ExitCode::SUCCESS);
        }
        Commands::Translate(args) => run_translate(args).await?,
        Commands::Merge(args) => run_merge(args).await?,
    };

    if summary.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        error!("{} language(s) failed", summary.failed_languages.len());
        Ok(ExitCode::FAILURE)
    }
}

async fn run_translate(args: TranslateArgs) -> Result<RunSummary> {
    let config = build_config(&args.common, args.source_language, args.target_languages)?;
    let controller = build_controller(config, &args.common)?;
    let mode = if args.in_place {
        OutputMode::InPlace
    } else {
        OutputMode::Beside
    };
    controller.translate_file(&args.input_file, mode).await
}

async fn run_merge(args: MergeArgs) -> Result<RunSummary> {
    let config = build_config(&args.common, args.source_language, args.target_languages)?;
    let controller = build_controller(config, &args.common)?;
    controller.merge_resources(&args.res_dir, args.precedence.as_deref()).await
}

fn build_controller(config: Config, options: &CommonArgs) -> Result<Controller> {
    let controller = Controller::with_config(config).context("Configuration validation failed")?;
    Ok(if options.no_progress {
        controller.without_progress()
    } else {
        controller
    })
}

/// Assemble the configuration: defaults, file, environment, then flags
fn build_config(options: &CommonArgs, source_language: String, target_languages: Vec<String>) -> Result<Config> {
    if let Some(level) = options.log_level {
        log::set_max_level(app_config::LogLevel::from(level).to_level_filter());
    }

    let mut config = match &options.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    config.apply_env_overrides()?;
    apply_cli_overrides(&mut config, options, source_language, target_languages);

    log::set_max_level(config.log_level.to_level_filter());
    Ok(config)
}

fn apply_cli_overrides(
    config: &mut Config,
    options: &CommonArgs,
    source_language: String,
    target_languages: Vec<String>,
) {
    config.source_language = source_language;
    config.target_languages = language_utils::dedup_locale_codes(target_languages);

    if !options.providers.is_empty() {
        let providers: Vec<ProviderConfig> = options
            .providers
            .iter()
            .map(|cli| {
                let kind = ProviderKind::from(*cli);
                config
                    .translation
                    .get_provider_config(kind)
                    .cloned()
                    .unwrap_or_else(|| ProviderConfig::new(kind))
            })
            .collect();
        config.translation.providers = providers;
    }

    let touches_azure = options.ms_key.is_some()
        || options.ms_region.is_some()
        || options.ms_endpoint.is_some()
        || options.ms_api_version.is_some()
        || options.ms_category.is_some()
        || options.ms_text_type.is_some();
    if touches_azure {
        let azure = config.translation.azure_mut();
        if let Some(key) = &options.ms_key {
            azure.api_key = key.clone();
        }
        if let Some(region) = &options.ms_region {
            azure.region = region.clone();
        }
        if let Some(endpoint) = &options.ms_endpoint {
            azure.endpoint = endpoint.clone();
        }
        if let Some(api_version) = &options.ms_api_version {
            azure.api_version = api_version.clone();
        }
        if let Some(category) = &options.ms_category {
            azure.category = category.clone();
        }
        if let Some(text_type) = options.ms_text_type {
            azure.text_type = text_type.into();
        }
    }

    let common = &mut config.translation.common;
    if options.transliterate {
        common.transliterate = true;
    }
    if let Some(script) = &options.to_script {
        common.to_script = script.clone();
    }
    if let Some(workers) = options.max_workers {
        common.concurrency = workers;
    }
    if let Some(timeout) = options.http_timeout {
        common.timeout_secs = timeout;
    }
    if let Some(pool) = options.http_pool_maxsize {
        common.pool_max_size = pool;
    }
    if let Some(retries) = options.http_retries {
        common.max_attempts = retries;
    }
    if options.mark_incomplete {
        common.failure_policy = FailurePolicy::MarkIncomplete;
    }

    if let Some(level) = options.log_level {
        config.log_level = level.into();
    }
}
