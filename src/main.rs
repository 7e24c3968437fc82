use anyhow::{Context, Result};
use clap::Parser;
use logfanout::config::{split_hosts, RuntimeConfig};
use logfanout::writer::IngestReport;
use logfanout::Input;
use std::path::PathBuf;
use std::process::ExitCode;

/// Write pipe-delimited log lines to the by-id and by-day views
#[derive(Parser)]
#[command(name = "logfanout")]
#[command(version)]
#[command(about = "Write pipe-delimited log lines to the by-id and by-day views", long_about = None)]
struct Cli {
    /// Input file with one `logType|eventTime|rawData` line per record (`-` or omitted: stdin)
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Comma-separated contact points (overrides config file)
    #[arg(long, value_name = "HOSTS")]
    hosts: Option<String>,

    /// Table for the by-id view, e.g. `nginx.t_nginx_log_by_id`
    #[arg(long, value_name = "NAME")]
    table: Option<String>,

    /// Log level: trace, debug, info, warn, error
    #[arg(short = 'v', long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Record writes in memory instead of sending them to the cluster
    #[arg(long)]
    dry_run: bool,

    /// Lines handed to the writer per ingestion call
    #[arg(long, value_name = "N")]
    lines_per_call: Option<usize>,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Build tokio runtime and run async ingestion
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?
        .block_on(async_main(cli))
}

async fn async_main(cli: Cli) -> Result<ExitCode> {
    // Step 1: Load base configuration (file + environment)
    let mut config = if let Some(config_path) = &cli.config {
        RuntimeConfig::load_from_path(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?
    } else {
        RuntimeConfig::load_or_default().context("Failed to load configuration")?
    };

    // Step 2: Apply CLI overrides (highest priority) and re-validate
    apply_cli_overrides(&mut config, &cli);
    config.validate().context("Invalid configuration")?;

    logfanout::init_tracing(&config.logging);

    // Step 3: Ingest
    let input = Input::from_arg(cli.input);
    let report = logfanout::run(&config, &input, cli.dry_run).await?;

    if cli.dry_run {
        print_summary(&report);
    }

    if report.batches_failed() > 0 {
        eprintln!(
            "{} of {} batches failed ({:?})",
            report.batches_failed(),
            report.batches_submitted(),
            report.outcome()
        );
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn apply_cli_overrides(config: &mut RuntimeConfig, cli: &Cli) {
    if let Some(hosts) = &cli.hosts {
        config.storage.contact_points = split_hosts(hosts);
    }

    if let Some(table) = &cli.table {
        config.storage.by_id_table = table.clone();
    }

    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }

    if let Some(lines) = cli.lines_per_call {
        config.ingest.lines_per_call = lines;
    }
}

fn print_summary(report: &IngestReport) {
    for pass in [&report.by_id, &report.by_day] {
        println!(
            "{}  lines={} written={} failed_rows={} parse_skipped={} time_skipped={} batches={} failed_batches={} elapsed_ms={}",
            pass.view,
            pass.lines,
            pass.rows_written,
            pass.rows_failed,
            pass.parse_skipped,
            pass.time_skipped,
            pass.batches_submitted,
            pass.batches_failed,
            pass.elapsed.as_millis()
        );
    }
}
