use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context as _;
use chrono::Utc;
use clap::{Parser, Subcommand};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tracing::{error, info};

use gada_auth::config::AuthConfig;
use gada_auth::handlers::client::ClientAddressPolicy;
use gada_auth::infra::mailer::LogMailer;
use gada_auth::jobs::sweeper::TokenSweeper;
use gada_auth::router::build_router;
use gada_auth::state::AppState;
use gada_auth::usecase::password::PasswordHasher;
use gada_auth::usecase::user::SeedAdminUseCase;
use gada_auth_types::cookie::CookieSettings;
use gada_auth_types::identity::AccessTokenSecret;
use gada_core::config::Config as _;
use gada_core::tracing::init_tracing;

#[derive(Parser)]
#[command(about = "Gada authentication and session service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default).
    Serve,
    /// Create or reset an approved, email-verified admin account.
    SeedAdmin {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "ADMIN_PASSWORD")]
        password: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = AuthConfig::from_env().context("load configuration")?;
    let db = connect(&config).await?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, db).await,
        Command::SeedAdmin {
            username,
            email,
            password,
        } => {
            let usecase = SeedAdminUseCase {
                users: gada_auth::infra::db::DbUserRepository { db },
                hasher: PasswordHasher::default(),
            };
            usecase
                .execute(&username, &email, &password, Utc::now())
                .await
                .context("seed admin")?;
            Ok(())
        }
    }
}

async fn connect(config: &AuthConfig) -> anyhow::Result<DatabaseConnection> {
    let mut options = ConnectOptions::new(config.database_url.clone());
    options
        .acquire_timeout(Duration::from_secs(config.db_acquire_timeout_secs))
        .sqlx_logging(false);
    Database::connect(options)
        .await
        .context("connect to database")
}

async fn serve(config: AuthConfig, db: DatabaseConnection) -> anyhow::Result<()> {
    let state = AppState {
        db,
        access_secret: AccessTokenSecret::new(config.jwt_secret),
        cookies: CookieSettings {
            domain: config.cookie_domain,
            secure: config.cookie_secure,
        },
        mailer: LogMailer,
        hasher: PasswordHasher::default(),
        expose_dev_tokens: config.expose_dev_tokens,
        client_policy: ClientAddressPolicy {
            trust_forwarded_headers: config.trust_forwarded_headers,
        },
    };

    let sweeper = TokenSweeper::spawn(
        state.refresh_ledger(),
        Duration::from_secs(config.sweep_interval_secs),
        config.sweep_batch_limit,
    );

    let router = build_router(state, Duration::from_secs(config.request_timeout_secs));
    let addr = format!("0.0.0.0:{}", config.auth_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("bind {addr}"))?;

    info!("auth service listening on {addr}");
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    sweeper.shutdown().await;
    info!("auth service stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
