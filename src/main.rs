// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, info, warn};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use moontrans::app_config::{self, Config};
use moontrans::database::DatabaseConnection;
use moontrans::database::import::{ImportOptions, import_review_log};
use moontrans::database::seed;
use moontrans::errors::AppError;
use moontrans::providers::Provider;
use moontrans::providers::geonames::{GeoNames, PlaceQuery};
use moontrans::providers::openai::OpenAI;
use moontrans::translation::{Orchestrator, RunOptions};

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
    /// Translate a source table into its target table
    Sync(SyncArgs),

    /// List the configured table profiles
    List,

    /// Send a one-line request to check the translation service credentials
    Check,

    /// Import a reviewed CSV into a table
    Import(ImportArgs),

    /// Seed the city table from GeoNames, ordered by population
    SeedCities(SeedArgs),

    /// Generate shell completions for moontrans
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct SyncArgs {
    /// Profile to run (see `moontrans list`)
    #[arg(value_name = "PROFILE")]
    profile: String,

    /// Skip records already present in the review log
    #[arg(long)]
    resume: bool,

    /// Check the schema and write the review log header without translating
    #[arg(long)]
    dry_run: bool,

    /// Read at most this many source rows
    #[arg(long)]
    limit: Option<usize>,

    /// Records per service call (values below 1 are treated as 1)
    #[arg(long, allow_negative_numbers = true)]
    batch_size: Option<i64>,

    /// Delay between batches in milliseconds
    #[arg(long)]
    rate_ms: Option<u64>,

    /// Review log path
    #[arg(long)]
    out: Option<PathBuf>,

    /// Model name to use for translation
    #[arg(short, long)]
    model: Option<String>,

    /// Source language code (e.g., 'en', 'ru')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language code (e.g., 'ja')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Translation service key
    #[arg(long)]
    api_key: Option<String>,

    /// Hide the progress bar
    #[arg(long)]
    no_progress: bool,
}

#[derive(Parser, Debug)]
struct ImportArgs {
    /// CSV file to import
    #[arg(long)]
    csv: PathBuf,

    /// Table whose schema is mirrored when truncating
    #[arg(long, default_value = "MOON_DAY_INFO_ENG")]
    source_table: String,

    /// Table receiving the rows
    #[arg(long, default_value = "MOON_DAY_INFO_JA")]
    target_table: String,

    /// Drop and recreate the target table first
    #[arg(long)]
    truncate: bool,
}

#[derive(Parser, Debug)]
struct SeedArgs {
    /// GeoNames username
    #[arg(long)]
    username: Option<String>,

    /// Number of cities to seed
    #[arg(long)]
    limit: Option<usize>,

    /// Language of the place names
    #[arg(long)]
    lang: Option<String>,

    /// Disable TLS certificate verification
    #[arg(long)]
    insecure: bool,

    /// Also write the seeded rows to this CSV
    #[arg(long)]
    csv: Option<PathBuf>,
}

/// moontrans - batch translation of the moon calendar reference tables
///
/// Translates source-language tables of the calendar database with a
/// chat-style translation service, batch by batch, writing each batch to a
/// CSV review log and the target table together.
#[derive(Parser, Debug)]
#[command(name = "moontrans")]
#[command(version)]
#[command(about = "Batch translation of the moon calendar reference tables")]
#[command(long_about = "moontrans translates the source-language tables of the moon calendar database.

EXAMPLES:
    moontrans list                                   # Show the table profiles
    moontrans sync moon-days --dry-run               # Check the schema, write the review log header
    moontrans sync cities --resume                   # Continue where the review log stops
    moontrans sync zodiac-info --batch-size 3        # Smaller batches
    moontrans import --csv scripts/moon_day_info_ja.csv --truncate
    moontrans seed-cities --limit 100 --csv scripts/cities_ja_seed.csv
    moontrans completions bash > moontrans.bash      # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. If it doesn't exist, a
    default one is created. Credentials fall back to OPENAI_API_KEY and
    GEONAMES_USERNAME, which may be set in the --env file.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json", global = true)]
    config: PathBuf,

    /// SQLite database path
    #[arg(long, global = true)]
    db: Option<String>,

    /// Environment file with credentials
    #[arg(long, default_value = "scripts/.env", global = true)]
    env: PathBuf,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,
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

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }

    // @returns: ANSI color for log level
    fn get_color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let level = record.level();
            let _ = writeln!(
                std::io::stderr(),
                "{}{} {} {}\x1B[0m",
                Self::get_color_for_level(level),
                now,
                Self::get_emoji_for_level(level),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // The level is lowered or raised once the config is loaded
    CustomLogger::init(LevelFilter::Trace)?;

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "moontrans", &mut std::io::stdout());
        return Ok(());
    }

    if let Some(cmd_log_level) = &cli.log_level {
        let level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(level.to_level_filter());
    } else {
        log::set_max_level(LevelFilter::Info);
    }

    if cli.env.exists() {
        dotenvy::from_path(&cli.env).with_context(|| format!("Failed to load env file: {:?}", cli.env))?;
    }

    let mut config = Config::load_or_create(&cli.config)?;
    config.apply_env();
    if let Some(db) = &cli.db {
        config.database_path = db.clone();
    }
    if let Some(log_level) = &cli.log_level {
        config.log_level = log_level.clone().into();
    }
    log::set_max_level(config.log_level.to_level_filter());

    match cli.command {
        Commands::Sync(args) => run_sync(config, args).await,
        Commands::List => list_profiles(&config),
        Commands::Check => run_check(config).await,
        Commands::Import(args) => run_import(config, args).await,
        Commands::SeedCities(args) => run_seed(config, args).await,
        Commands::Completions { .. } => Ok(()),
    }
}

fn open_provider(config: &Config) -> Result<OpenAI> {
    let provider = &config.translation.provider;
    let client = OpenAI::new(&provider.api_key, &provider.endpoint, provider.api, provider.timeout_secs)
        .map_err(AppError::from)?;
    Ok(client)
}

async fn run_sync(mut config: Config, args: SyncArgs) -> Result<()> {
    if let Some(model) = args.model {
        config.translation.provider.model = model;
    }
    if let Some(source_lang) = args.source_language {
        config.source_language = source_lang;
    }
    if let Some(target_lang) = args.target_language {
        config.target_language = target_lang;
    }
    if let Some(api_key) = args.api_key {
        config.translation.provider.api_key = api_key;
    }

    config
        .validate(!args.dry_run)
        .context("Configuration validation failed")?;

    let profile = config.profile(&args.profile)?.clone();
    let db = DatabaseConnection::open(&config.database_path)?;
    let provider = Arc::new(open_provider(&config)?);

    info!(
        "🚀 moontrans: {} ({}) {} -> {}",
        provider.name(),
        config.translation.provider.model,
        profile.source_table,
        profile.target_table
    );

    let options = RunOptions {
        resume: args.resume,
        dry_run: args.dry_run,
        limit: args.limit,
        batch_size: args.batch_size,
        review_log: args.out,
        inter_batch_delay: args.rate_ms.map(Duration::from_millis),
        show_progress: !args.no_progress,
    };

    let orchestrator = Orchestrator::new(&config, db, provider);
    let report = orchestrator.run(&profile, &options).await?;
    info!("Success: {}", report);
    Ok(())
}

fn list_profiles(config: &Config) -> Result<()> {
    for profile in &config.profiles {
        println!(
            "{:<14} {} -> {}  keys: {}  shape: {:?}  batch: {}  log: {}",
            profile.name,
            profile.source_table,
            profile.target_table,
            profile.key_columns.join("+"),
            profile.shape,
            profile.batch_size,
            profile.review_log
        );
    }
    Ok(())
}

async fn run_check(config: Config) -> Result<()> {
    config.validate(true).context("Configuration validation failed")?;
    let provider = open_provider(&config)?;
    provider
        .test_connection(&config.translation.provider.model)
        .await
        .map_err(AppError::from)?;
    info!("Success: {} answered with model {}", provider.name(), config.translation.provider.model);
    Ok(())
}

async fn run_import(config: Config, args: ImportArgs) -> Result<()> {
    let db = DatabaseConnection::open(&config.database_path)?;
    let options = ImportOptions {
        target_table: args.target_table,
        source_table: args.source_table,
        truncate: args.truncate,
    };
    let inserted = import_review_log(&db, &args.csv, &options).await?;
    info!("Success: imported {} rows into {}", inserted, options.target_table);
    Ok(())
}

async fn run_seed(config: Config, args: SeedArgs) -> Result<()> {
    let geonames = &config.geonames;
    let username = args.username.unwrap_or_else(|| geonames.username.clone());
    if username.trim().is_empty() {
        return Err(anyhow!(
            "GeoNames username is required (--username, the config or {})",
            app_config::GEONAMES_USERNAME_ENV
        ));
    }
    if args.insecure {
        warn!("TLS certificate verification is disabled for GeoNames");
    }

    let query = PlaceQuery {
        country: geonames.country.clone(),
        lang: args.lang.unwrap_or_else(|| geonames.lang.clone()),
        max_rows: args.limit.unwrap_or(geonames.max_rows),
    };
    let client = GeoNames::new(username, &geonames.endpoint, geonames.timeout_secs, args.insecure)
        .map_err(AppError::from)?;
    let places = client.search_places(&query).await.map_err(AppError::from)?;
    let rows = seed::build_rows(&places, query.max_rows)?;

    let db = DatabaseConnection::open(&config.database_path)?;
    let seeded = seed::seed_table(&db, &geonames.target_table, rows.clone()).await?;

    if let Some(csv_path) = &args.csv {
        seed::write_csv(csv_path, &rows)?;
        info!("Wrote {:?}", csv_path);
    }

    info!("Success: seeded {} with {} rows", geonames.target_table, seeded);
    Ok(())
}
