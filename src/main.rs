//! HR onboarding backend
//!
//! Serves the onboarding API and provides a few one-shot maintenance
//! commands (superuser bootstrap, catalog fixtures).

use std::env;
use std::net::SocketAddr;
use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use config::LogFormat;
use hr_onboarding::{
    api, config,
    db::{self, CatalogRepository},
    models::CatalogFixtures,
    services::{build_mailer, AuthService},
    AppConfig, AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        print_help();
        return Ok(());
    }

    if args.iter().any(|arg| arg == "--version" || arg == "-V") {
        println!("HR Onboarding {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // Load configuration first (before logging, so we know log format)
    let config = AppConfig::load().context("Failed to load configuration")?;

    // The guard flushes file logs on drop; keep it for the whole run
    let _log_guard = init_logging(&config);

    info!("HR onboarding starting up");

    ensure_data_directory(&config)?;

    let db = db::init_pool(&config.database)
        .await
        .context("Failed to initialize database")?;

    if args.iter().any(|arg| arg == "--create-superuser") {
        return create_superuser(&config, db).await;
    }

    if let Some(pos) = args.iter().position(|arg| arg == "--load-fixtures") {
        let path = args
            .get(pos + 1)
            .context("--load-fixtures needs a YAML file path")?;
        return load_fixtures(Path::new(path), &db).await;
    }

    let mailer = build_mailer(&config.mail).context("Failed to initialize mail backend")?;
    info!(backend = ?config.mail.backend, "Mail backend ready");

    let state = AppState {
        config: config.clone(),
        db,
        mailer,
    };
    let app = api::router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address configuration")?;

    info!("Starting HTTP server on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .await
        .context("HTTP server error")?;

    Ok(())
}

/// Create the bootstrap superuser from config/env
async fn create_superuser(config: &AppConfig, db: db::DbPool) -> Result<()> {
    let Some(bootstrap) = config.bootstrap.as_ref() else {
        bail!(
            "No superuser configured; set bootstrap.superuser_email/superuser_password \
             or ONBOARDING_SUPERUSER_EMAIL/ONBOARDING_SUPERUSER_PASSWORD"
        );
    };
    if bootstrap.superuser_password.chars().count() < config.auth.password_min_length {
        bail!(
            "Superuser password must be at least {} characters",
            config.auth.password_min_length
        );
    }

    let auth = AuthService::new(db);
    match auth
        .create_superuser(&bootstrap.superuser_email, &bootstrap.superuser_password)
        .await?
    {
        Some(user) => println!("Superuser {} created", user.email),
        None => {
            warn!(email = %bootstrap.superuser_email, "Superuser already exists");
            println!("A user with email {} already exists", bootstrap.superuser_email);
        }
    }
    Ok(())
}

/// Load jobs, departments and employee types from a YAML file
async fn load_fixtures(path: &Path, db: &db::DbPool) -> Result<()> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read fixture file: {:?}", path))?;
    let fixtures: CatalogFixtures = serde_norway::from_str(&contents)
        .with_context(|| format!("Failed to parse fixture file: {:?}", path))?;

    let created = CatalogRepository::new(db)
        .load_fixtures(&fixtures)
        .await?;

    info!(created, path = ?path, "Fixtures loaded");
    println!("Loaded {} catalog records from {}", created, path.display());
    Ok(())
}

fn init_logging(config: &AppConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use config::LogTarget;
    use tracing_subscriber::{prelude::*, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    let log_config = &config.logging;

    match &log_config.target {
        LogTarget::Console => {
            let subscriber = tracing_subscriber::registry().with(env_filter);
            init_console_logging(subscriber, &log_config.format);
            None
        }
        LogTarget::File => {
            let (writer, guard) = create_file_writer(log_config);
            let subscriber = tracing_subscriber::registry().with(env_filter);
            init_file_logging(subscriber, &log_config.format, writer);
            Some(guard)
        }
        LogTarget::Both => {
            let (writer, guard) = create_file_writer(log_config);
            let subscriber = tracing_subscriber::registry().with(env_filter);
            init_file_logging(
                subscriber.with(console_layer(&log_config.format)),
                &log_config.format,
                writer,
            );
            Some(guard)
        }
    }
}

fn create_file_writer(
    log_config: &config::LoggingConfig,
) -> (
    tracing_appender::non_blocking::NonBlocking,
    tracing_appender::non_blocking::WorkerGuard,
) {
    if let Err(e) = std::fs::create_dir_all(&log_config.log_dir) {
        eprintln!(
            "Warning: Failed to create log directory {:?}: {}",
            log_config.log_dir, e
        );
    }

    let file_appender = if log_config.daily_rotation {
        tracing_appender::rolling::daily(&log_config.log_dir, &log_config.log_prefix)
    } else {
        tracing_appender::rolling::never(&log_config.log_dir, &log_config.log_prefix)
    };

    tracing_appender::non_blocking(file_appender)
}

type BoxedLayer<S> = Box<dyn tracing_subscriber::Layer<S> + Send + Sync>;

/// Console formatting layer for the configured format
fn console_layer<S>(format: &LogFormat) -> BoxedLayer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a> + Send + Sync + 'static,
{
    use tracing_subscriber::{fmt, Layer};

    match format {
        LogFormat::Json => fmt::layer().json().with_target(true).boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(false).boxed(),
        LogFormat::Pretty => fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
    }
}

fn init_console_logging<S>(subscriber: S, format: &LogFormat)
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a> + Send + Sync + 'static,
{
    use tracing_subscriber::prelude::*;

    subscriber.with(console_layer(format)).init();
}

fn init_file_logging<S>(
    subscriber: S,
    format: &LogFormat,
    writer: tracing_appender::non_blocking::NonBlocking,
) where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a> + Send + Sync + 'static,
{
    use tracing_subscriber::{fmt, prelude::*, Layer};

    let layer = match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_writer(writer)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(false)
            .with_ansi(false)
            .with_writer(writer)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .with_target(true)
            .with_ansi(false)
            .with_writer(writer)
            .boxed(),
    };
    subscriber.with(layer).init();
}

/// Create the directory of a file-backed SQLite database
fn ensure_data_directory(config: &AppConfig) -> Result<()> {
    if let Some(path) = config.database.url.strip_prefix("sqlite://") {
        let path = path.split('?').next().unwrap_or(path);
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).context("Failed to create data directory")?;
                info!("Created data directory: {:?}", parent);
            }
        }
    }
    Ok(())
}

fn print_help() {
    println!(
        r#"HR Onboarding {}

USAGE:
    hr-onboarding [OPTIONS]

OPTIONS:
    -h, --help                  Print this help message
    -V, --version               Print version information
    --create-superuser          Create the bootstrap superuser from configuration
                                (bootstrap.superuser_email / superuser_password)
                                and exit. Does nothing if the email is taken.
    --load-fixtures <FILE>      Load jobs, departments and employee types from
                                a YAML file and exit. Existing records are kept.

ENVIRONMENT:
    ONBOARDING_CONFIG           Path to configuration file (default: config.yaml)
    DATABASE_URL                Database connection string
    JWT_SECRET                  Signing secret for session and activation tokens

CONFIGURATION:
    The application looks for configuration files in the following order:
    1. Path specified by ONBOARDING_CONFIG environment variable
    2. ./config.yaml, ./config/config.yaml
    3. /etc/hr-onboarding/config.yaml"#,
        env!("CARGO_PKG_VERSION")
    );
}
