use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use std::{fmt::Debug, path::PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use journ_server::background_jobs::{create_task_runner, AuthTokenPruningJob, TaskContext};
use journ_server::clock::{Clock, SystemClock};
use journ_server::config::{AppConfig, CliConfig, FileConfig, MailSettings};
use journ_server::journal::JournalManager;
use journ_server::notifications::{
    EmailAddress, HttpMailer, LogMailer, Mailer, VerificationEmailTemplate,
};
use journ_server::server::{metrics, run_server, RequestsLoggingLevel, ServerState};
use journ_server::user::{AccessTokenSigner, SqliteUserStore, UserManager};
use journ_server::verification::{VerificationLinks, VerificationManager};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to a TOML config file. Its values override the command line.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory holding the SQLite databases.
    #[clap(long, value_parser = parse_path)]
    pub db_dir: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping). 0 disables it.
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Secret used to sign access tokens.
    #[clap(long, env = "JOURN_JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,

    /// Lifetime of access tokens, in minutes.
    #[clap(long, default_value_t = 120)]
    pub access_token_ttl_minutes: i64,

    /// Lifetime of refresh tokens, in days.
    #[clap(long, default_value_t = 7)]
    pub refresh_token_ttl_days: i64,

    /// Public URL of the account activation endpoint, embedded in emails.
    #[clap(long)]
    pub verification_url: Option<String>,

    /// Where users land after a successful activation.
    #[clap(long)]
    pub verified_redirect_url: Option<String>,

    /// Where users land when their activation link has expired.
    #[clap(long)]
    pub request_activation_redirect_url: Option<String>,

    /// Endpoint of the transactional mail API. Emails are only logged when unset.
    #[clap(long)]
    pub mail_api_url: Option<String>,

    #[clap(long, env = "JOURN_MAIL_API_KEY", hide_env_values = true)]
    pub mail_api_key: Option<String>,

    #[clap(long)]
    pub mail_sender_email: Option<String>,

    #[clap(long)]
    pub mail_sender_name: Option<String>,

    /// HTML template for verification emails.
    #[clap(long, value_parser = parse_path)]
    pub email_template: Option<PathBuf>,

    /// Interval in hours between expired refresh token pruning runs.
    #[clap(long, default_value_t = 24)]
    pub token_prune_interval_hours: u64,
}

impl From<&CliArgs> for CliConfig {
    fn from(args: &CliArgs) -> Self {
        CliConfig {
            db_dir: args.db_dir.clone(),
            port: args.port,
            metrics_port: args.metrics_port,
            logging_level: args.logging_level.clone(),
            jwt_secret: args.jwt_secret.clone(),
            access_token_ttl_minutes: args.access_token_ttl_minutes,
            refresh_token_ttl_days: args.refresh_token_ttl_days,
            verification_url: args.verification_url.clone(),
            verified_redirect_url: args.verified_redirect_url.clone(),
            request_activation_redirect_url: args.request_activation_redirect_url.clone(),
            mail_api_url: args.mail_api_url.clone(),
            mail_api_key: args.mail_api_key.clone(),
            mail_sender_email: args.mail_sender_email.clone(),
            mail_sender_name: args.mail_sender_name.clone(),
            email_template_path: args.email_template.clone(),
            token_prune_interval_hours: args.token_prune_interval_hours,
        }
    }
}

fn make_mailer(settings: &MailSettings) -> Result<Arc<dyn Mailer>> {
    match (&settings.api_url, &settings.api_key) {
        (Some(url), Some(key)) => {
            info!("Sending emails through {}", url);
            let sender = EmailAddress::new(&settings.sender_email, settings.sender_name.clone());
            Ok(Arc::new(HttpMailer::new(url.clone(), key.clone(), sender)?))
        }
        _ => {
            info!("No mail API configured, emails will only be logged");
            Ok(Arc::new(LogMailer))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config from {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let config = AppConfig::resolve(&CliConfig::from(&cli_args), file_config)?;

    info!("Initializing metrics...");
    metrics::init_metrics();

    info!("Opening user database at {:?}...", config.user_db_path());
    let user_store = Arc::new(SqliteUserStore::new(config.user_db_path())?);

    let mailer = make_mailer(&config.mail)?;
    let template = match &config.mail.template_path {
        Some(path) => VerificationEmailTemplate::load(path)?,
        None => VerificationEmailTemplate::default(),
    };

    let shutdown = CancellationToken::new();
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let (runner, supervisor) =
        create_task_runner(TaskContext::new(shutdown.clone(), user_store.clone(), mailer));
    let supervisor_handle = tokio::spawn(supervisor.run());

    let prune_interval = Duration::from_secs(config.jobs.token_prune_interval_hours * 60 * 60);
    info!(
        "Pruning expired refresh tokens every {} hours",
        config.jobs.token_prune_interval_hours
    );
    let _pruning = AuthTokenPruningJob::new(config.auth.refresh_token_ttl, clock.clone())
        .into_worker(prune_interval)
        .start(&runner)?;

    let user_manager = UserManager::new(
        user_store.clone(),
        AccessTokenSigner::new(config.auth.jwt_secret.as_bytes(), config.auth.access_token_ttl),
        config.auth.refresh_token_ttl,
        clock.clone(),
    );
    let verification_manager = VerificationManager::new(
        user_store.clone(),
        runner.clone(),
        clock,
        VerificationLinks {
            verification_url: config.verification.verification_url.clone(),
            verified_redirect_url: config.verification.verified_redirect_url.clone(),
            request_activation_redirect_url: config
                .verification
                .request_activation_redirect_url
                .clone(),
        },
        template,
    );
    let journal_manager = JournalManager::new(user_store);

    let state = ServerState::new(
        config.server_config(),
        user_manager,
        verification_manager,
        journal_manager,
    );

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received interrupt, shutting down..."),
            Err(e) => error!("Failed to listen for interrupt: {}", e),
        }
        signal_token.cancel();
    });

    let result = run_server(state, shutdown.clone()).await;

    runner.shutdown();
    if let Err(e) = supervisor_handle.await {
        error!("Task supervisor panicked: {}", e);
    }
    result
}
