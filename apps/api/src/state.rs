use std::sync::Arc;

use sqlx::PgPool;

use crate::access::AccessPolicy;
use crate::analyzer::JobAnalyzer;
use crate::config::Config;
use crate::matching::ledger::CreditLedger;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    /// External job-text analyzer. Default: HttpJobAnalyzer against ANALYZER_URL.
    pub analyzer: Arc<dyn JobAnalyzer>,
    /// Credit debits for unlocks. Default: PgCreditLedger on the shared database.
    pub ledger: Arc<dyn CreditLedger>,
    pub access: Arc<dyn AccessPolicy>,
}
