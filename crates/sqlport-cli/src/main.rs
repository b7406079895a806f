//! sqlport CLI - inspect and re-encode backed-up row sets.

use clap::{Parser, Subcommand};
use sqlport::core::{Column, DatabaseInfo, SqlTypeCode};
use sqlport::transfer::{convert_rowset, same_file};
use sqlport::{
    builtin_dialects, Config, DialectSession, FormatCatalog, MigrateError, RowSet, TransferEngine,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, Level};

/// Rows in the sample page printed by `resolve --pk`.
const PAGE_ROWS: i64 = 1000;

#[derive(Parser)]
#[command(name = "sqlport")]
#[command(about = "Inspect and convert portable SQL backup chunks")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Re-encode every chunk of a row set in another format
    Convert {
        /// Row-set metadata file (JSON); chunks are read from its directory
        metadata: PathBuf,

        /// Format of the existing chunks
        #[arg(long)]
        from: String,

        /// Target format [default: format.name from the configuration]
        #[arg(long)]
        to: Option<String>,

        /// Directory for the converted chunks and metadata
        #[arg(short, long)]
        output_dir: PathBuf,
    },

    /// List the available backup formats
    Formats,

    /// Show a row set's columns and chunks
    Inspect {
        /// Row-set metadata file (JSON)
        metadata: PathBuf,
    },

    /// Show which dialect a database identity resolves to
    Resolve {
        /// Product name as reported by the driver (e.g. "PostgreSQL")
        #[arg(long)]
        product: String,

        /// Full product version string
        #[arg(long = "product-version")]
        product_version: String,

        #[arg(long)]
        major: i32,

        #[arg(long, default_value = "0")]
        minor: i32,

        /// Table to build extraction queries for
        #[arg(long)]
        table: Option<String>,

        /// Primary key column for the paged extraction query
        #[arg(long, requires = "table")]
        pk: Option<String>,

        /// Column as NAME:TYPE_CODE[:TYPE_NAME]; shows how its values are framed
        #[arg(long = "column", value_name = "NAME:CODE[:TYPE]")]
        columns: Vec<String>,
    },
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

fn run() -> Result<(), MigrateError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format).map_err(MigrateError::Config)?;

    let config = match cli.config {
        Some(ref path) => {
            let config = Config::load(path)?;
            info!("Loaded configuration from {:?}", path);
            config
        }
        None => Config::default(),
    };
    let catalog = FormatCatalog::with_builtins();

    match cli.command {
        Commands::Convert {
            metadata,
            from,
            to,
            output_dir,
        } => {
            let row_set = RowSet::load(&metadata)?;
            let from = catalog.require(&from)?;
            let to = catalog.require(to.as_deref().unwrap_or(&config.format.name))?;
            let input_dir = metadata.parent().unwrap_or_else(|| Path::new("."));

            std::fs::create_dir_all(&output_dir)?;
            let metadata_out = output_dir.join(row_set.metadata_file_name());
            if same_file(&metadata_out, &metadata) {
                return Err(MigrateError::Config(format!(
                    "output metadata {} would overwrite the input metadata; choose another --output-dir",
                    metadata_out.display()
                )));
            }
            let converted = convert_rowset(
                &row_set,
                input_dir,
                from.as_ref(),
                to.as_ref(),
                &output_dir,
                &config.format,
            )?;
            converted.save(&metadata_out)?;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&converted)?);
            } else {
                println!("Conversion completed!");
                println!("  Row set: {}", converted.full_name());
                println!("  Format: {} -> {}", from.name(), to.name());
                println!("  Chunks: {}", converted.chunks.len());
                println!("  Rows: {}", converted.row_count);
                println!("  Metadata: {}", metadata_out.display());
            }
        }

        Commands::Formats => {
            if cli.output_json {
                println!("{}", serde_json::to_string(&catalog.names())?);
            } else {
                for format in catalog.iter() {
                    println!("{} (.{})", format.name(), format.extension());
                }
            }
        }

        Commands::Inspect { metadata } => {
            let row_set = RowSet::load(&metadata)?;
            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&row_set)?);
            } else {
                println!("Row set: {}", row_set.full_name());
                println!("  Rows: {}", row_set.row_count);
                println!("  Columns:");
                for column in &row_set.columns {
                    println!("    {} ({})", column.name, column.value_kind);
                }
                println!("  Chunks:");
                for chunk in &row_set.chunks {
                    println!("    {} ({} rows)", chunk.name, chunk.row_count);
                }
                if !row_set.chunk_rows_consistent() {
                    println!("  Warning: chunk row counts do not add up to {}", row_set.row_count);
                }
            }
        }

        Commands::Resolve {
            product,
            product_version,
            major,
            minor,
            table,
            pk,
            columns,
        } => {
            let observed = DatabaseInfo::observed(product, product_version, major, minor);
            let resolver = builtin_dialects()?;
            let session = DialectSession::open(&resolver, &observed, &config.connection)?;
            let dialect = session.dialect();

            let table_name = table.as_deref().unwrap_or("");
            let columns = columns
                .iter()
                .map(|spec| parse_column(spec, table_name))
                .collect::<Result<Vec<_>, _>>()?;
            let column_names: Vec<String> = columns.iter().map(|c| c.name.clone()).collect();

            let select = table
                .as_deref()
                .map(|t| session.select_query(t, &column_names));
            let page = match (table.as_deref(), pk.as_deref()) {
                (Some(t), Some(pk)) => Some(session.page_query(t, &column_names, pk, 1, PAGE_ROWS)),
                _ => None,
            };
            let row_set = if columns.is_empty() {
                None
            } else {
                let engine = TransferEngine::for_session(&session, &config);
                Some(engine.describe(table.as_deref().unwrap_or("columns"), &columns)?)
            };

            if cli.output_json {
                let result = serde_json::json!({
                    "observed": &observed,
                    "dialect": dialect.name(),
                    "defaulted": session.is_defaulted(),
                    "window_functions": dialect.supports_row_number(),
                    "select": select,
                    "page": page,
                    "columns": row_set.as_ref().map(|rs| &rs.columns),
                });
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("Dialect: {}", dialect.name());
                if session.is_defaulted() {
                    println!("  (no rule matched {}; using the default)", observed);
                }
                println!("  Identifier quoting: {}", dialect.quote_ident("name"));
                println!("  Placeholder: {}", dialect.param_placeholder(1));
                println!("  Window functions: {}", dialect.supports_row_number());
                if let Some(select) = select {
                    println!("  Select: {}", select);
                }
                if let Some(page) = page {
                    println!("  Page (rows 1-{}):\n{}", PAGE_ROWS, page);
                }
                if let Some(row_set) = row_set {
                    println!("  Columns:");
                    for column in &row_set.columns {
                        println!("    {} ({})", column.name, column.value_kind);
                    }
                }
            }
        }
    }

    Ok(())
}

/// Parse `NAME:TYPE_CODE[:TYPE_NAME]`, e.g. `photo:-4:longblob`.
fn parse_column(spec: &str, table: &str) -> Result<Column, MigrateError> {
    let mut parts = spec.splitn(3, ':');
    let name = parts.next().unwrap_or("").trim();
    let code = parts.next().and_then(|c| c.trim().parse::<i32>().ok());
    match (name, code) {
        (name, Some(code)) if !name.is_empty() => Ok(Column::new(
            table,
            name,
            SqlTypeCode::from_code(code),
            parts.next().unwrap_or("").trim(),
        )),
        _ => Err(MigrateError::Config(format!(
            "Invalid column '{}': expected NAME:TYPE_CODE[:TYPE_NAME]",
            spec
        ))),
    }
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        other => return Err(format!("Unknown verbosity: '{}'", other)),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false);

    match format {
        "json" => subscriber.json().init(),
        "text" => subscriber.init(),
        other => return Err(format!("Unknown log format: '{}'", other)),
    }

    Ok(())
}
