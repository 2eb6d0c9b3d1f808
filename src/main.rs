// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, info, warn};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use litrans::app_config::{Config, LogLevel};
use litrans::app_controller::Controller;
use litrans::file_utils::{DocumentKind, FileManager};

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LogLevel::Error,
            CliLogLevel::Warn => LogLevel::Warn,
            CliLogLevel::Info => LogLevel::Info,
            CliLogLevel::Debug => LogLevel::Debug,
            CliLogLevel::Trace => LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate an SRT file into translated and bilingual copies
    Subtitles {
        /// SRT file (default: <output_root>/<title>/input.srt)
        #[arg(value_name = "FILE")]
        input: Option<PathBuf>,
    },

    /// Translate a plain-text file into output.txt
    Text {
        /// Text file (default: <output_root>/<title>/input.txt)
        #[arg(value_name = "FILE")]
        input: Option<PathBuf>,
    },

    /// Translate chapter titles, one per line, into a TSV mapping
    Titles {
        /// Titles file (default: <output_root>/<title>/titles.txt)
        #[arg(value_name = "FILE")]
        input: Option<PathBuf>,
    },

    /// Inspect or clean the document's fragment cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Generate shell completions for litrans
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum CacheAction {
    /// Show entry counts and store size
    Stats,
    /// Drop cached translations that fail the current quality checks
    Revalidate,
    /// Drop untranslated fallbacks so the next run retries them
    PurgeUnvalidated,
}

#[derive(Args, Debug)]
struct GlobalOptions {
    /// Configuration file path
    #[arg(short, long, default_value = "conf.json", global = true)]
    config: PathBuf,

    /// Document title (names the working directory under output_root)
    #[arg(short, long, global = true)]
    title: Option<String>,

    /// Replace every translation with a placeholder; no provider calls
    #[arg(long, global = true)]
    dry_run: bool,

    /// Disable backoff sleeps between retries (paid plans)
    #[arg(long, global = true)]
    billing: bool,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,
}

/// litrans - batch-aligned LLM translation of novels, subtitles and titles
#[derive(Parser, Debug)]
#[command(name = "litrans")]
#[command(version)]
#[command(about = "Batch-aligned LLM translation with a durable fragment cache")]
#[command(long_about = "litrans translates subtitles, prose and chapter titles with a chain of LLM providers.

Every document gets a working directory <output_root>/<title>/ holding the
fragment cache (buffer.db), the run log (info.log) and the outputs. Re-running
a command only sends fragments that are not cached yet.

EXAMPLES:
    litrans -t MyNovel subtitles episode1.srt    # Translate subtitles
    litrans -t MyNovel text                      # Translate output/MyNovel/input.txt
    litrans -t MyNovel titles chapters.txt       # Chapter title mapping (TSV)
    litrans -t MyNovel --dry-run titles ch.txt   # Check the pipeline without calls
    litrans -t MyNovel cache stats               # Inspect the cache
    litrans completions bash > litrans.bash      # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. If the file doesn't exist,
    a default one is created. Providers are tried in the order they are listed.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOptions,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
    /// Plain copy of every record, opened once the document is known
    file: Mutex<Option<File>>,
}

static LOGGER: once_cell::sync::Lazy<CustomLogger> = once_cell::sync::Lazy::new(|| CustomLogger {
    level: LevelFilter::Trace,
    file: Mutex::new(None),
});

impl CustomLogger {
    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_logger(&*LOGGER)?;
        log::set_max_level(level);
        Ok(())
    }

    // @attaches: Run log of the document directory
    fn attach_file(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            FileManager::ensure_dir(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file: {:?}", path))?;
        *LOGGER.file.lock() = Some(file);
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
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let now = chrono::Local::now();
        let _ = writeln!(
            std::io::stderr(),
            "{}{} {:<5} {}\x1B[0m",
            Self::color_for_level(record.level()),
            now.format("%H:%M:%S.%3f"),
            record.level(),
            record.args()
        );

        if let Some(file) = self.file.lock().as_mut() {
            let _ = writeln!(
                file,
                "{} | {:<5} | {}:{} - {}",
                now.format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.module_path().unwrap_or("litrans"),
                record.line().unwrap_or(0),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
        if let Some(file) = self.file.lock().as_mut() {
            let _ = file.flush();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(shell, &mut cmd, "litrans", &mut std::io::stdout());
        return Ok(());
    }

    let config = load_config(&cli.global)?;
    log::set_max_level(LevelFilter::from(&config.log_level));
    CustomLogger::attach_file(&FileManager::log_path(config.document_dir()))?;

    match cli.command {
        Commands::Subtitles { input } => {
            let input = FileManager::resolve_input(input, config.document_dir(), DocumentKind::Subtitles)?;
            Controller::with_config(config)?.run_subtitles(&input).await?;
        }
        Commands::Text { input } => {
            let input = FileManager::resolve_input(input, config.document_dir(), DocumentKind::Text)?;
            Controller::with_config(config)?.run_text(&input).await?;
        }
        Commands::Titles { input } => {
            let input = FileManager::resolve_input(input, config.document_dir(), DocumentKind::Titles)?;
            Controller::with_config(config)?.run_titles(&input).await?;
        }
        Commands::Cache { action } => run_cache(config, action)?,
        Commands::Completions { .. } => {}
    }

    log::logger().flush();
    Ok(())
}

fn run_cache(config: Config, action: CacheAction) -> Result<()> {
    let controller = Controller::for_maintenance(config)?;
    match action {
        CacheAction::Stats => {
            let (cache_stats, store_stats) = controller.cache_stats()?;
            info!("{}", cache_stats);
            info!(
                "Store: {} entries, {} unvalidated, {} bytes",
                store_stats.entry_count, store_stats.unvalidated_count, store_stats.file_size_bytes
            );
        }
        CacheAction::Revalidate => {
            controller.revalidate_cache()?;
        }
        CacheAction::PurgeUnvalidated => {
            controller.purge_unvalidated()?;
        }
    }
    Ok(())
}

/// Load or create the configuration, then apply command line overrides
fn load_config(options: &GlobalOptions) -> Result<Config> {
    let mut config = if options.config.exists() {
        Config::load(&options.config)?
    } else {
        warn!("Config file not found at {:?}, creating default config.", options.config);
        let config = Config::default();
        config.save(&options.config)?;
        config
    };

    if let Some(title) = &options.title {
        config.document_title = title.clone();
    }
    if options.dry_run {
        config.translation.dry_run = true;
    }
    if options.billing {
        config.translation.billing = true;
    }
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }

    Ok(config)
}
