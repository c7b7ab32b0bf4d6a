use anyhow::Context;
use clap::{ArgAction, Parser};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cipapi::{CipApiClient, ClientSettings, Credentials};
use report_core::config::workflow_statuses_from_env_value;
use report_core::constants::{
    DEFAULT_CIPAPI_URL, DEFAULT_TIMEOUT_SECS, DEFAULT_WKHTMLTOPDF, DEFAULT_WORKFLOW_STATUSES,
};
use report_core::{
    FragmentPaths, ReportConfig, ReportOutcome, ReportPipeline, ReportResult,
    SqlitePatientStore, UpstreamErrorPolicy, WkhtmltopdfRenderer,
};
use report_types::ParticipantId;

/// Exit code for configuration that could not be resolved at startup.
const CONFIG_EXIT_CODE: u8 = 64;

#[derive(Parser)]
#[command(name = "gel-report")]
#[command(about = "Fetch a GeL clinical report and relabel it as a local PDF")]
struct Cli {
    /// GeL participant (proband) id
    #[arg(short = 'g', long = "participant")]
    participant: ParticipantId,
    /// Remove GeL branding and add the local header
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    delabel: bool,
    /// Also print failures as a JSON object on stderr
    #[arg(long)]
    json_errors: bool,
}

/// Everything resolved from the environment before any network call.
struct Environment {
    client: ClientSettings,
    username_file: PathBuf,
    password_file: PathBuf,
    lims_database: PathBuf,
    wkhtmltopdf: PathBuf,
    report: Arc<ReportConfig>,
}

/// Main entry point for `gel-report`
///
/// Produces one relabelled PDF per invocation. Configuration is read from the environment
/// (and an optional `.env` file) once, before anything is contacted.
///
/// # Environment Variables
/// - `CIPAPI_URL`: API root (default: the GeL production API)
/// - `CIPAPI_USERNAME_FILE`, `CIPAPI_PASSWORD_FILE`: credential files, first line used
/// - `CIPAPI_PROXY`: optional HTTP proxy
/// - `CIPAPI_TIMEOUT_SECS`: request timeout (default: 60)
/// - `GEL_PROVIDER_ID`: interpretation provider the report must come from
/// - `GEL_WORKFLOW_STATUSES`: comma-separated allow-list
/// - `GEL_PATIENT_INFO_TEMPLATE`, `GEL_CLINICIAN_TEMPLATE`: markup fragments
/// - `GEL_NEW_LOGO`, `GEL_REPORT_TITLE`
/// - `GEL_HTML_DIR`, `GEL_PDF_DIR`: output directories
/// - `WKHTMLTOPDF_PATH`, `LIMS_DATABASE`, `GEL_UPSTREAM_ERROR_POLICY`
fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "gel_report=info,report_core=info,cipapi=info".into());
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let env = match load_environment() {
        Ok(env) => env,
        Err(err) => {
            emit_failure(&cli, "invalid_config", &format!("{err:#}"));
            return ExitCode::from(CONFIG_EXIT_CODE);
        }
    };

    match run(&cli, &env) {
        Ok(outcome) => {
            tracing::info!(
                "report for proband {} written to {} (request {}, report v{})",
                outcome.participant,
                outcome.pdf_path.display(),
                outcome.interpretation_request_id,
                outcome.artifact_version
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            emit_failure(&cli, err.kind(), &err.to_string());
            ExitCode::from(u8::try_from(err.exit_code()).unwrap_or(1))
        }
    }
}

fn run(cli: &Cli, env: &Environment) -> ReportResult<ReportOutcome> {
    let credentials = Credentials::from_files(&env.username_file, &env.password_file)?;
    let client = CipApiClient::connect(&env.client, &credentials)?;
    let store = SqlitePatientStore::open(&env.lims_database)?;
    let renderer = WkhtmltopdfRenderer::new(&env.wkhtmltopdf);

    ReportPipeline::new(env.report.clone(), &client, &store, &renderer)
        .run(&cli.participant, cli.delabel)
}

fn emit_failure(cli: &Cli, kind: &str, message: &str) {
    eprintln!("error: {message}");
    if cli.json_errors {
        let payload = serde_json::json!({
            "error": kind,
            "participant": cli.participant.as_str(),
            "message": message,
        });
        eprintln!("{payload}");
    }
}

fn required(name: &str) -> anyhow::Result<String> {
    let value = std::env::var(name).with_context(|| format!("{name} must be set"))?;
    if value.trim().is_empty() {
        anyhow::bail!("{name} must not be empty");
    }
    Ok(value)
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn load_environment() -> anyhow::Result<Environment> {
    let timeout_secs = match optional("CIPAPI_TIMEOUT_SECS") {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .with_context(|| format!("CIPAPI_TIMEOUT_SECS is not a number: {raw}"))?,
        None => DEFAULT_TIMEOUT_SECS,
    };

    let policy = optional("GEL_UPSTREAM_ERROR_POLICY")
        .unwrap_or_default()
        .parse::<UpstreamErrorPolicy>()?;

    let report = ReportConfig::new(
        &required("GEL_PROVIDER_ID")?,
        workflow_statuses_from_env_value(
            optional("GEL_WORKFLOW_STATUSES"),
            DEFAULT_WORKFLOW_STATUSES,
        ),
        optional("GEL_REPORT_TITLE").as_deref(),
        &required("GEL_NEW_LOGO")?,
        FragmentPaths {
            patient_info: required("GEL_PATIENT_INFO_TEMPLATE")?.into(),
            clinician: required("GEL_CLINICIAN_TEMPLATE")?.into(),
        },
        required("GEL_HTML_DIR")?.into(),
        required("GEL_PDF_DIR")?.into(),
        policy,
    )
    .context("invalid report configuration")?;

    Ok(Environment {
        client: ClientSettings {
            base_url: optional("CIPAPI_URL").unwrap_or_else(|| DEFAULT_CIPAPI_URL.into()),
            proxy: optional("CIPAPI_PROXY"),
            timeout: Duration::from_secs(timeout_secs),
        },
        username_file: required("CIPAPI_USERNAME_FILE")?.into(),
        password_file: required("CIPAPI_PASSWORD_FILE")?.into(),
        lims_database: required("LIMS_DATABASE")?.into(),
        wkhtmltopdf: optional("WKHTMLTOPDF_PATH")
            .unwrap_or_else(|| DEFAULT_WKHTMLTOPDF.into())
            .into(),
        report: Arc::new(report),
    })
}
