// orchestrator-service-rs/src/main.rs
// quality-agent: run the diagnostic pipeline against an API from CI or a shell

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use config_rs::AppSettings;
use error_handling::{init_logging, LoggingConfig};
use integration_sdk::KeyValueStore;
use orchestrator::{write_report, Pipeline, PipelineDeps, PipelineRunResult, Publisher, ReportDocument};
use persistence_kb::RunStore;
use shared_types::TestSuite;

const EXIT_SUCCESS: u8 = 0;
const EXIT_TEST_FAILURE: u8 = 1;
const EXIT_CONFIG_ERROR: u8 = 2;

#[derive(Parser)]
#[command(name = "quality-agent")]
#[command(about = "Runs API checks, diagnoses the first failure and writes a report")]
#[command(version, args_conflicts_with_subcommands = true)]
struct Cli {
    /// Base URL of the API under test
    #[arg(long)]
    api_url: Option<String>,
    /// Commit hash or build identifier being tested
    #[arg(long)]
    commit_hash: Option<String>,
    /// JSON file with test case definitions; the built-in suite otherwise
    #[arg(long)]
    suite: Option<PathBuf>,
    #[arg(value_name = "API_URL")]
    positional_api_url: Option<String>,
    #[arg(value_name = "COMMIT_HASH")]
    positional_commit_hash: Option<String>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print stored run results as JSON
    History,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let settings = AppSettings::from_env();

    let logging = LoggingConfig {
        level: settings.pipeline.log_level.clone(),
        json_format: settings.pipeline.log_json,
        ..LoggingConfig::default()
    };
    if let Err(e) = init_logging(Some(logging)) {
        eprintln!("warning: {}", e);
    }

    let outcome = match cli.command {
        Some(Commands::History) => print_history(&settings).await,
        None => {
            let (Some(api_url), Some(commit_hash)) = (
                cli.api_url.or(cli.positional_api_url),
                cli.commit_hash.or(cli.positional_commit_hash),
            ) else {
                Cli::command()
                    .error(
                        clap::error::ErrorKind::MissingRequiredArgument,
                        "Both API URL and commit hash are required (use --api-url and --commit-hash, or pass them positionally)",
                    )
                    .exit();
            };
            run_agent(&settings, &api_url, &commit_hash, cli.suite).await
        }
    };

    match outcome {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!(error = %format!("{:#}", e), "quality-agent failed");
            eprintln!("error: {:#}", e);
            ExitCode::from(EXIT_CONFIG_ERROR)
        }
    }
}

fn load_suite(path: Option<PathBuf>) -> anyhow::Result<TestSuite> {
    match path {
        Some(path) => TestSuite::from_json_file(&path)
            .with_context(|| format!("invalid test suite {}", path.display())),
        None => Ok(TestSuite::default_suite()),
    }
}

async fn run_agent(
    settings: &AppSettings,
    api_url: &str,
    commit_hash: &str,
    suite: Option<PathBuf>,
) -> anyhow::Result<u8> {
    let suite = load_suite(suite)?;
    let deps = PipelineDeps::from_settings(settings)
        .await
        .context("could not initialize the probe client")?;
    let pipeline = Pipeline::new(deps);
    let publisher = Publisher::from_settings(settings);

    let collection_id = publisher
        .register_suite(&format!("API checks {}", commit_hash), &suite, api_url)
        .await;

    let result = pipeline.run(&suite, api_url, commit_hash).await;

    let report = ReportDocument::from_run(&result, collection_id);
    let report_path = match write_report(&settings.pipeline.runs_dir, &report) {
        Ok(path) => Some(path),
        Err(e) => {
            tracing::warn!(error = %e, "Report file not written");
            None
        }
    };
    let report_id = publisher.publish_report(&report).await;

    print_summary(&result, report_path.as_deref(), report_id.as_deref());

    Ok(if result.success {
        EXIT_SUCCESS
    } else {
        EXIT_TEST_FAILURE
    })
}

fn print_summary(result: &PipelineRunResult, report_path: Option<&std::path::Path>, report_id: Option<&str>) {
    let summary = serde_json::json!({
        "run_id": result.run_id,
        "success": result.success,
        "report_path": report_path.map(|p| p.display().to_string()),
        "report_id": report_id,
        "diagnosis": result.diagnosis,
        "diagnosis_source": result.diagnosis_source,
    });
    match serde_json::to_string_pretty(&summary) {
        Ok(text) => println!("{}", text),
        Err(e) => tracing::warn!(error = %e, "Summary did not serialize"),
    }
}

async fn print_history(settings: &AppSettings) -> anyhow::Result<u8> {
    let store = RunStore::new(Arc::new(KeyValueStore::connect(&settings.key_value).await));
    let history = store.list_run_history::<PipelineRunResult>().await;
    if let Some(reason) = &history.reason {
        tracing::info!(reason = %reason, "History read from in-memory store");
    }
    println!("{}", serde_json::to_string_pretty(&history.value)?);
    Ok(EXIT_SUCCESS)
}
