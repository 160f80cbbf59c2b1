//! ads-pg-clone CLI - clone Advantage Database Server tables into PostgreSQL.

use ads_pg_clone::{CloneError, Config, Orchestrator, RunResult};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Parser)]
#[command(name = "ads-pg-clone")]
#[command(about = "Clone Advantage Database Server tables into PostgreSQL")]
#[command(version)]
struct Cli {
    /// Path to JSON or YAML configuration file
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    /// Print progress updates as JSON lines to stderr
    #[arg(long)]
    progress: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clone the configured tables
    Run {
        /// Override the configured table list (comma-separated)
        #[arg(long, value_delimiter = ',')]
        tables: Option<Vec<String>>,

        /// Print every statement instead of executing it
        #[arg(long)]
        echo: bool,

        /// Override rows per page
        #[arg(long)]
        page_size: Option<usize>,

        /// Do not create source indexes on new tables
        #[arg(long)]
        no_indexes: bool,
    },

    /// Test database connections
    HealthCheck,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), CloneError> {
    let cli = Cli::parse();

    let mut config = Config::load(&cli.config)?;

    let verbosity = if config.migration.debug {
        "debug"
    } else {
        cli.verbosity.as_str()
    };
    setup_logging(verbosity, &cli.log_format).map_err(CloneError::Config)?;
    info!("Loaded configuration from {:?}", cli.config);

    match cli.command {
        Commands::Run {
            tables,
            echo,
            page_size,
            no_indexes,
        } => {
            if let Some(tables) = tables {
                config.migration.tables = tables;
            }
            if echo {
                config.migration.echo = true;
            }
            if let Some(size) = page_size {
                config.migration.page_size = Some(size);
            }
            if no_indexes {
                config.migration.create_indexes = false;
            }
            config.validate()?;

            let echo = config.migration.echo;
            let orchestrator = Orchestrator::new(config).await?.with_progress(cli.progress);
            let result = orchestrator.run().await;
            orchestrator.close().await;

            write_run_result(
                &result,
                cli.output_json,
                echo,
                &mut std::io::stdout(),
                &mut std::io::stderr(),
            )?;
        }

        Commands::HealthCheck => {
            let result = Orchestrator::check_config(&config).await;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("Health Check Results:");
                println!(
                    "  Source (ADS): {} ({}ms)",
                    if result.source_connected { "OK" } else { "FAILED" },
                    result.source_latency_ms
                );
                if let Some(ref err) = result.source_error {
                    println!("    Error: {}", err);
                }
                println!(
                    "  Target (PostgreSQL): {} ({}ms)",
                    if result.target_connected { "OK" } else { "FAILED" },
                    result.target_latency_ms
                );
                if let Some(ref err) = result.target_error {
                    println!("    Error: {}", err);
                }
                println!(
                    "\n  Overall: {}",
                    if result.healthy { "HEALTHY" } else { "UNHEALTHY" }
                );
            }

            if !result.healthy {
                return Err(CloneError::Config("Health check failed".to_string()));
            }
        }
    }

    Ok(())
}

/// Print the run summary.
///
/// The JSON result goes to `out` unless echo mode owns stdout for the SQL
/// script, in which case it joins the human summary on `err`.
fn write_run_result(
    result: &RunResult,
    output_json: bool,
    echo: bool,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> Result<(), CloneError> {
    if output_json {
        let json = result.to_json()?;
        if echo {
            writeln!(err, "{}", json)?;
        } else {
            writeln!(out, "{}", json)?;
        }
        return Ok(());
    }

    writeln!(
        err,
        "Cloned {} of {} tables ({} rows) in {:.2}s",
        result.tables_copied, result.tables_total, result.rows_copied, result.duration_seconds
    )?;
    for skipped in &result.skipped_tables {
        writeln!(err, "  Skipped {}: {}", skipped.table, skipped.reason)?;
    }
    Ok(())
}

/// Logs go to stderr so echo output on stdout stays a clean SQL script.
fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        other => return Err(format!("unknown verbosity: {}", other)),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        "json" => subscriber.json().init(),
        "text" => subscriber.init(),
        other => return Err(format!("unknown log format: {}", other)),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_result() -> RunResult {
        serde_json::from_value(serde_json::json!({
            "run_id": "run-1",
            "status": "completed_with_skips",
            "duration_seconds": 1.5,
            "started_at": "2024-03-01T10:00:00Z",
            "completed_at": "2024-03-01T10:00:01.500Z",
            "tables_total": 2,
            "tables_copied": 1,
            "tables_skipped": 1,
            "rows_copied": 2500,
            "rows_per_second": 1666,
            "skipped_tables": [
                { "table": "broken", "kind": "source_access", "reason": "table is locked" }
            ]
        }))
        .unwrap()
    }

    fn render(output_json: bool, echo: bool) -> (String, String) {
        let mut out = Vec::new();
        let mut err = Vec::new();
        write_run_result(&sample_result(), output_json, echo, &mut out, &mut err).unwrap();
        (
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
        )
    }

    #[test]
    fn test_json_result_goes_to_stdout() {
        let (out, err) = render(true, false);
        assert!(out.contains("\"run_id\": \"run-1\""));
        assert!(err.is_empty());
    }

    #[test]
    fn test_echo_keeps_stdout_free_of_json() {
        let (out, err) = render(true, true);
        assert!(out.is_empty());
        assert!(err.contains("\"rows_copied\": 2500"));
    }

    #[test]
    fn test_text_summary_goes_to_stderr() {
        let (out, err) = render(false, false);
        assert!(out.is_empty());
        assert!(err.contains("Cloned 1 of 2 tables (2500 rows)"));
        assert!(err.contains("Skipped broken: table is locked"));
    }
}
