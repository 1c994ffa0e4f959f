use std::sync::Arc;

use axum::extract::FromRef;
use limelight_core::{Limelight, PgDatabase};

#[derive(Clone, FromRef)]
pub struct ServerContext {
    pub limelight: Arc<Limelight<PgDatabase>>,
}
