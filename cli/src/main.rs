use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use texmap_core::PatternCatalog;
use texmap_core::export::{self, Encoding};
use texmap_core::grammar::render_rules;
use texmap_sources::{BuildConfig, DEFAULT_PREFIX};
use texmap_sqlite::MappingDatabase;
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Export view selected with `--view`.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum View {
    /// Character to LaTeX table, per mode.
    ToLatex,
    /// LaTeX to character table.
    ToUnicode,
    /// Commands consumers wrap in braces.
    Embrace,
    /// Recognizer rules derived from the shape catalog.
    Rules,
}

/// Output format for exports.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliOutputFormat {
    Json,
    Yaml,
    /// Grammar source text; only valid with `--view rules`.
    Peg,
}

/// CLI-side encoding enum with clap argument parsing support.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliEncoding {
    Unicode,
    Ascii,
}

impl From<CliEncoding> for Encoding {
    fn from(encoding: CliEncoding) -> Self {
        match encoding {
            CliEncoding::Unicode => Self::Unicode,
            CliEncoding::Ascii => Self::Ascii,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "texmap")]
#[command(about = "Build and export Unicode to LaTeX mapping tables")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Read the configured sources and rebuild the mapping table.
    Build(BuildArgs),
    /// Show table existence, row counts and the last build.
    Status(DatabaseArgs),
    /// Write an export view of the mapping table.
    Export(ExportArgs),
    /// Run the shape classifier over the stored representations.
    Classify(DatabaseArgs),
    /// Drop the mapping tables.
    Drop(DatabaseArgs),
}

#[derive(Debug, Args)]
struct BuildArgs {
    /// Path to the build configuration (YAML).
    #[arg(long)]
    config: PathBuf,
    /// Rebuild even when the sources are unchanged since the last build.
    #[arg(long)]
    force: bool,
}

#[derive(Debug, Args)]
struct DatabaseArgs {
    /// Database file path.
    #[arg(long)]
    db: PathBuf,
    /// Table prefix.
    #[arg(long, default_value = DEFAULT_PREFIX)]
    prefix: String,
}

#[derive(Debug, Args)]
struct ExportArgs {
    #[command(flatten)]
    database: DatabaseArgs,
    /// View to export.
    #[arg(long)]
    view: View,
    /// Target character set of the consumer (`to-latex` only).
    #[arg(long, default_value = "unicode")]
    encoding: CliEncoding,
    /// Output format.
    #[arg(long, default_value = "json")]
    format: CliOutputFormat,
    /// Output file (default: stdout).
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Build(args) => run_build(args),
        Command::Status(args) => run_status(args),
        Command::Export(args) => run_export(args),
        Command::Classify(args) => run_classify(args),
        Command::Drop(args) => run_drop(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn open_database(db: &Path, prefix: &str) -> Result<MappingDatabase, String> {
    let conn = rusqlite::Connection::open(db)
        .map_err(|e| format!("Failed to open database '{}': {e}", db.display()))?;
    MappingDatabase::new(conn, prefix).map_err(|e| format!("Failed to open mapping tables: {e}"))
}

fn run_build(args: BuildArgs) -> Result<(), String> {
    let config = BuildConfig::load(&args.config)
        .map_err(|e| format!("Failed to load config '{}': {e}", args.config.display()))?;
    let mut db = open_database(&config.database, &config.prefix)?;

    let report = db
        .build_from_config(&config, args.force)
        .map_err(|e| format!("Build failed: {e}"))?;

    let Some(report) = report else {
        warn!(
            database = %config.database.display(),
            "Sources unchanged since last build; skipping rebuild (use --force to override)"
        );
        println!("Mapping table is up to date.");
        return Ok(());
    };

    println!("Build complete:");
    println!("  Associations ingested: {}", report.ingest.inserted);
    println!("  Variants inserted: {}", report.expansion.inserted);
    println!(
        "  Overrides applied: {} deleted, {} inserted, {} substituted",
        report.overrides.deleted, report.overrides.inserted, report.overrides.substituted
    );
    println!("  Rows ranked: {}", report.ranked);
    println!("  Shapes classified: {}", report.classification.classified);
    Ok(())
}

fn run_status(args: DatabaseArgs) -> Result<(), String> {
    let db = open_database(&args.db, &args.prefix)?;
    let status = db
        .status()
        .map_err(|e| format!("Failed to get status: {e}"))?;

    println!("Mapping Status:");
    println!(
        "  Tables exist: {}",
        if status.tables_exist { "yes" } else { "no" }
    );
    println!("  Mapping rows: {}", status.mapping_count);
    println!("  Characters: {}", status.charcode_count);
    match status.last_build {
        Some(last) => {
            println!("  Last build: {} (texmap {})", last.built_at, last.tool_version);
            for fingerprint in &last.fingerprints {
                println!("    {} {}", fingerprint.sha256, fingerprint.path);
            }
        }
        None => println!("  Last build: never"),
    }
    Ok(())
}

fn run_export(args: ExportArgs) -> Result<(), String> {
    let db = open_database(&args.database.db, &args.database.prefix)?;
    let rows = || {
        db.rows()
            .map_err(|e| format!("Failed to load mapping rows: {e}"))
    };

    let rendered = match args.view {
        View::ToLatex => serialize(&export::to_latex(&rows()?, args.encoding.into()), args.format)?,
        View::ToUnicode => serialize(&export::to_unicode(&rows()?), args.format)?,
        View::Embrace => serialize(&export::embrace(&rows()?), args.format)?,
        View::Rules => {
            let rules = export::recognizer_rules(PatternCatalog::builtin(), &rows()?)
                .map_err(|e| format!("Failed to export recognizer rules: {e}"))?;
            match args.format {
                CliOutputFormat::Peg => render_rules(&rules),
                format => serialize(&rules, format)?,
            }
        }
    };

    match args.output {
        Some(path) => fs::write(&path, rendered)
            .map_err(|e| format!("Failed to write '{}': {e}", path.display())),
        None => {
            print!("{rendered}");
            Ok(())
        }
    }
}

fn run_classify(args: DatabaseArgs) -> Result<(), String> {
    let db = open_database(&args.db, &args.prefix)?;
    let rows = db
        .rows()
        .map_err(|e| format!("Failed to load mapping rows: {e}"))?;

    let catalog = PatternCatalog::builtin();
    let report = catalog
        .classify_rows(&rows)
        .map_err(|e| format!("Classification failed: {e}"))?;

    println!("Classification:");
    for (descriptor, count) in catalog.descriptors().iter().zip(&report.counts) {
        println!("  {count:>6}  {}", descriptor.pattern);
    }
    println!("  Classified: {}", report.classified);
    println!("  Skipped: {}", report.skipped);
    Ok(())
}

fn run_drop(args: DatabaseArgs) -> Result<(), String> {
    let mut db = open_database(&args.db, &args.prefix)?;
    db.down().map_err(|e| format!("Drop failed: {e}"))?;
    println!(
        "Tables with prefix '{}' dropped from '{}'.",
        args.prefix,
        args.db.display()
    );
    Ok(())
}

fn serialize<T: Serialize>(value: &T, format: CliOutputFormat) -> Result<String, String> {
    match format {
        CliOutputFormat::Json => serde_json::to_string_pretty(value)
            .map(|json| format!("{json}\n"))
            .map_err(|e| format!("JSON serialization failed: {e}")),
        CliOutputFormat::Yaml => {
            serde_yaml::to_string(value).map_err(|e| format!("YAML serialization failed: {e}"))
        }
        CliOutputFormat::Peg => Err("--format peg is only valid with --view rules".to_string()),
    }
}
