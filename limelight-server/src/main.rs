use std::{env, sync::Arc};

use colored::Colorize;
use limelight_core::{DatabaseError, Limelight, PgDatabase, STALE_THRESHOLD, SWEEP_INTERVAL};
use limelight_server::{logging, run_server, ServerContext};
use log::{error, info, warn};
use thiserror::Error;

#[derive(Debug, Error)]
enum StartupError {
    #[error("DATABASE_URL is not set")]
    MissingDatabaseUrl,

    #[error("Could not initialize database: {0}")]
    Database(#[from] DatabaseError),
}

impl StartupError {
    fn hint(&self) -> String {
        match self {
            StartupError::MissingDatabaseUrl => {
                "Set DATABASE_URL to a reachable postgres instance, for example postgres://limelight@localhost/limelight.".to_string()
            }
            StartupError::Database(_) => {
                "This is a database error. Make sure the postgres instance is running and reachable, then try again.".to_string()
            }
        }
    }
}

#[tokio::main]
async fn main() {
    logging::init_logger();

    match init().await {
        Ok(context) => {
            info!("Initialized successfully.");

            spawn_reconciliation(context.clone());
            run_server(context).await
        }
        Err(error) => {
            error!(
                "{} Read the error below to troubleshoot the issue. If you think this might be a bug, please report it by making a GitHub issue.",
                "limelight failed to start!".bold().red()
            );
            error!("{}", error);
            error!("{}", format!("Hint: {}", error.hint()).dimmed().italic());
        }
    }
}

async fn init() -> Result<ServerContext, StartupError> {
    info!("Connecting to database...");

    let url = env::var("DATABASE_URL").map_err(|_| StartupError::MissingDatabaseUrl)?;
    let database = PgDatabase::new(&url).await?;

    Ok(ServerContext {
        limelight: Arc::new(Limelight::new(database)),
    })
}

/// Periodically closes active catalog records whose room has been gone from
/// the registry for longer than the stale threshold.
fn spawn_reconciliation(context: ServerContext) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);

        loop {
            interval.tick().await;

            if let Err(error) = context.limelight.directory.reconcile(STALE_THRESHOLD).await {
                warn!("Stale stream sweep failed: {}", error);
            }
        }
    });
}
