//! Bates allocation command-line tool
//!
//! Command-line interface over the allocation engine with support for:
//! - Counter seeding (file or keyed backend)
//! - Number allocation (per-page and per-document)
//! - Non-consuming peeks and backend status
//! - Settings management
//!
//! # Examples
//!
//! ```bash
//! # Seed the configured backend at 1000
//! bates init --start 1000
//!
//! # Stamp a five-page document
//! bates next --pages 5
//!
//! # Preview the next number without consuming it
//! bates peek
//!
//! # Point the engine at a counter file
//! bates config set use_file_backend true
//! bates config set counter_file_path /var/lib/bates/counter.txt
//! ```

use anyhow::bail;
use clap::{Args, Parser, Subcommand};
use batesgen::counter::{FileCounterStore, JsonSlotStore, SlotStore, DEFAULT_SLOT_KEY};
use batesgen::{BatesFormat, NumberAllocator, SettingsStore};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Bates number allocation for document stamping
#[derive(Parser, Debug)]
#[command(name = "bates")]
#[command(version = batesgen::VERSION)]
#[command(about = "Bates number allocation for document stamping", long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Settings document path
    #[arg(long, global = true, default_value = "bates.toml", env = "BATES_SETTINGS")]
    settings: PathBuf,

    /// Keyed slot document path (unused with the file backend)
    #[arg(long, global = true, default_value = "bates-slots.json", env = "BATES_SLOTS")]
    slots: PathBuf,

    /// Log directory path
    #[arg(long, global = true, default_value = "logs", env = "BATES_LOG_DIR")]
    log_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn", env = "RUST_LOG")]
    log_level: String,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Seed the configured counter backend with a starting value
    Init(InitArgs),

    /// Allocate the next number(s) and commit the counter
    Next(NextArgs),

    /// Show the next number without consuming it
    Peek(PeekArgs),

    /// Show backend, counter source, and current value
    Status,

    /// Settings operations
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Show version
    Version,
}

/// Init arguments
#[derive(Args, Debug)]
struct InitArgs {
    /// Starting counter value
    #[arg(long, default_value = "0")]
    start: i64,
}

/// Next arguments
#[derive(Args, Debug)]
struct NextArgs {
    /// Number of pages to stamp
    #[arg(short, long, default_value = "1")]
    pages: u32,

    /// Allocate one document number shared across all pages
    #[arg(short, long)]
    document: bool,
}

/// Peek arguments
#[derive(Args, Debug)]
struct PeekArgs {
    /// Page index to render
    #[arg(short, long, default_value = "1")]
    page: i64,
}

/// Settings commands
#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Print the active settings
    Show,

    /// Update one settings field
    Set {
        /// Field name (e.g. prefix, digits, use_file_backend)
        field: String,
        /// New value
        value: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(&cli)?;

    let settings = SettingsStore::new(&cli.settings);

    match cli.command {
        Commands::Init(args) => init_command(&settings, &cli.slots, args),
        Commands::Next(args) => next_command(&settings, &cli.slots, args),
        Commands::Peek(args) => peek_command(&settings, &cli.slots, args),
        Commands::Status => status_command(&settings, &cli.slots),
        Commands::Config { command } => config_command(&settings, command),
        Commands::Version => {
            println!("batesgen {}", batesgen::VERSION);
            Ok(())
        }
    }
}

/// Setup logging with a rolling file and console output
fn setup_logging(cli: &Cli) -> anyhow::Result<()> {
    std::fs::create_dir_all(&cli.log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &cli.log_dir, "bates.log");

    let log_level = cli
        .log_level
        .parse::<tracing::Level>()
        .unwrap_or(tracing::Level::WARN);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(!cli.no_color),
        )
        .with(fmt::layer().with_writer(file_appender).with_ansi(false))
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .init();

    Ok(())
}

/// Init command - seed the configured backend
fn init_command(settings: &SettingsStore, slots_path: &Path, args: InitArgs) -> anyhow::Result<()> {
    if args.start < 0 {
        bail!("starting value must be non-negative, got {}", args.start);
    }

    let mut format = settings.load()?;
    if format.use_file_backend {
        format.validate()?;
        FileCounterStore::seed(&format.counter_file_path, args.start)?;
        println!(
            "Seeded counter file {} at {}",
            format.counter_file_path.display(),
            args.start
        );
    } else {
        let slots = JsonSlotStore::new(slots_path);
        slots.set_and_release(DEFAULT_SLOT_KEY, args.start)?;
        println!(
            "Seeded slot '{}' in {} at {}",
            DEFAULT_SLOT_KEY,
            slots_path.display(),
            args.start
        );
    }

    format.next_number = args.start;
    settings.save(&format)?;
    info!(start = args.start, "Counter seeded");
    Ok(())
}

/// Next command - allocate and commit
fn next_command(settings: &SettingsStore, slots_path: &Path, args: NextArgs) -> anyhow::Result<()> {
    if args.pages == 0 {
        bail!("nothing to allocate: --pages must be at least 1");
    }

    let mut format = settings.load()?;
    if args.document {
        format.append_page_number = true;
    }
    let keyed = !format.use_file_backend;

    let mut allocator =
        NumberAllocator::for_format(format, Box::new(JsonSlotStore::new(slots_path)))?;

    let mut stamped = Vec::with_capacity(args.pages as usize);
    for page in 1..=args.pages as i64 {
        stamped.push(allocator.allocate(page)?);
    }
    allocator.commit()?;

    for line in &stamped {
        println!("{}", line);
    }

    // The keyed backend's committed value lives on in the settings document
    if keyed {
        let mut persisted = settings.load()?;
        persisted.next_number = allocator.format().next_number;
        settings.save(&persisted)?;
    }
    Ok(())
}

/// Peek command - render without consuming
fn peek_command(settings: &SettingsStore, slots_path: &Path, args: PeekArgs) -> anyhow::Result<()> {
    let format = settings.load()?;
    let allocator =
        NumberAllocator::for_format(format, Box::new(JsonSlotStore::new(slots_path)))?;

    let rendered = allocator.peek(args.page)?;
    if rendered.is_empty() {
        println!("(unavailable)");
    } else {
        println!("{}", rendered);
    }
    Ok(())
}

/// Status command
fn status_command(settings: &SettingsStore, slots_path: &Path) -> anyhow::Result<()> {
    let format = settings.load()?;
    let backend = if format.use_file_backend {
        "file"
    } else {
        "keyed"
    };

    let allocator =
        NumberAllocator::for_format(format, Box::new(JsonSlotStore::new(slots_path)))?;

    println!("Backend: {}", backend);
    println!("Source: {}", allocator.source());
    let value = allocator.peek_value();
    if value < 0 {
        println!("Next number: unavailable");
    } else {
        println!("Next number: {}", value);
    }
    Ok(())
}

/// Config commands
fn config_command(settings: &SettingsStore, command: ConfigCommands) -> anyhow::Result<()> {
    match command {
        ConfigCommands::Show => {
            let format = settings.load()?;
            print!("{}", toml::to_string_pretty(&format)?);
            Ok(())
        }
        ConfigCommands::Set { field, value } => {
            let mut format = settings.load()?;
            apply_setting(&mut format, &field, &value)?;
            settings.save(&format)?;
            println!("Set {} = {}", field, value);
            Ok(())
        }
    }
}

/// Apply one `field = value` update to the settings
fn apply_setting(format: &mut BatesFormat, field: &str, value: &str) -> anyhow::Result<()> {
    match field {
        "prefix" => format.prefix = value.to_string(),
        "suffix" => format.suffix = value.to_string(),
        "zero_pad" => format.zero_pad = value.parse()?,
        "digits" => format.digits = value.parse()?,
        "append_page_number" => format.append_page_number = value.parse()?,
        "zero_pad_page" => format.zero_pad_page = value.parse()?,
        "page_digits" => format.page_digits = value.parse()?,
        "page_separator" => format.page_separator = value.to_string(),
        "use_file_backend" => format.use_file_backend = value.parse()?,
        "counter_file_path" => format.counter_file_path = PathBuf::from(value),
        "next_number" => format.next_number = value.parse()?,
        _ => bail!("unknown settings field '{}'", field),
    }
    Ok(())
}
