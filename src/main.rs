use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use dremio_extractor::config::{self, ConnectionConfig};
use dremio_extractor::extractor::{format_duration, format_number, generic, table_column};
use dremio_extractor::logging::init_logging;
use dremio_extractor::odbc::OdbcConnector;
use dremio_extractor::{
    drain, ExtractionStats, Extractor, GenericConfig, GenericMetadataExtractor, TableColumnConfig,
    TableColumnExtractor,
};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "dremio-extract")]
#[command(about = "Extract table, column and ownership metadata from Dremio over ODBC")]
struct Args {
    /// JSON configuration document keyed by extractor scope
    #[arg(long)]
    config: Option<PathBuf>,

    /// Dremio host
    #[arg(long)]
    host: Option<String>,

    /// Dremio ODBC port
    #[arg(long)]
    port: Option<String>,

    /// Dremio username
    #[arg(long)]
    user: Option<String>,

    /// Dremio password
    #[arg(long)]
    password: Option<String>,

    /// ODBC driver name or DSN
    #[arg(long)]
    driver: Option<String>,

    /// Rows fetched per ODBC round trip
    #[arg(long, default_value_t = 1000)]
    batch_size: usize,

    /// Log level: off, error, warn, info, debug, trace (default: RUST_LOG or info)
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// One record per table or view, with its columns
    TableColumns {
        /// Cluster name stamped on every table
        #[arg(long)]
        cluster: Option<String>,

        /// Keep SYSTEM_TABLE entries
        #[arg(long)]
        include_system_tables: bool,

        /// Drop physical datasets
        #[arg(long)]
        exclude_pds_tables: bool,

        /// Separator for the collaboration tags field
        #[arg(long)]
        tags_separator: Option<String>,
    },
    /// Rows of an arbitrary statement
    Generic {
        /// Statement to run verbatim
        #[arg(long)]
        sql: Option<String>,

        /// Registered model to build each row into (table_owner, application)
        #[arg(long)]
        model: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.log_level.as_deref());

    let doc = match &args.config {
        Some(path) => config::load(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?,
        None => Value::Object(Default::default()),
    };
    let connector = OdbcConnector::new().with_batch_size(args.batch_size);

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    let stats = match &args.command {
        Command::TableColumns {
            cluster,
            include_system_tables,
            exclude_pds_tables,
            tags_separator,
        } => {
            let mut settings: TableColumnConfig = config::from_scope(&doc, table_column::SCOPE)?;
            apply_connection_overrides(&args, &mut settings.connection);
            if let Some(cluster) = cluster {
                settings.cluster = cluster.clone();
            }
            if *include_system_tables {
                settings.exclude_system_tables = false;
            }
            if *exclude_pds_tables {
                settings.exclude_pds_tables = true;
            }
            if let Some(sep) = tags_separator {
                settings.tags_separator = Some(sep.clone());
            }

            let mut extractor = TableColumnExtractor::new(connector);
            extractor.init(settings).context("Failed to initialize extractor")?;
            drain(&mut extractor, |table| {
                serde_json::to_writer(&mut out, &table)?;
                writeln!(out)?;
                Ok(())
            })?
        }
        Command::Generic { sql, model } => {
            let mut settings: GenericConfig = config::from_scope(&doc, generic::SCOPE)?;
            apply_connection_overrides(&args, &mut settings.connection);
            if let Some(sql) = sql {
                settings.sql_statement = Some(sql.clone());
            }
            if let Some(model) = model {
                settings.model_class = Some(model.clone());
            }

            let mut extractor = GenericMetadataExtractor::new(connector);
            extractor.init(settings).context("Failed to initialize extractor")?;
            drain(&mut extractor, |record| {
                serde_json::to_writer(&mut out, &record.to_json()?)?;
                writeln!(out)?;
                Ok(())
            })?
        }
    };
    out.flush()?;

    print_summary(&stats);
    Ok(())
}

fn apply_connection_overrides(args: &Args, connection: &mut ConnectionConfig) {
    let overrides = [
        (&args.host, &mut connection.host),
        (&args.port, &mut connection.port),
        (&args.user, &mut connection.user),
        (&args.password, &mut connection.password),
        (&args.driver, &mut connection.driver),
    ];
    for (value, target) in overrides {
        if let Some(value) = value {
            *target = value.clone();
        }
    }
}

fn print_summary(stats: &ExtractionStats) {
    eprintln!();
    eprintln!("=== EXTRACTION COMPLETE ===");
    eprintln!("Records: {}", format_number(stats.records_extracted as i64));
    eprintln!("Duration: {}", format_duration(stats.duration_secs));
    if stats.duration_secs > 0.0 {
        eprintln!(
            "Speed: {:.0} records/s",
            stats.records_extracted as f64 / stats.duration_secs
        );
    }
}
