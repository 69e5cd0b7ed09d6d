use chrono::{DateTime, Utc};
use serde::Serialize;

/// Réponse de GET /api/health
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Backend de stockage actif ("postgres" ou "memory")
    pub store: &'static str,
    pub time: DateTime<Utc>,
}

impl HealthResponse {
    pub fn up(store: &'static str, time: DateTime<Utc>) -> Self {
        Self {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
            store,
            time,
        }
    }
}
