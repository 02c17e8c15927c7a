use anyhow::Context;
use std::path::Path;
use std::sync::Arc;

use crate::config::Config;
use crate::db::{HashParams, Store};
use crate::services::mailer::{self, Mailer};
use crate::services::{
    AuthService, IdRegistry, ReportCases, ResetTokenSigner, SeaOrmAuthService,
};

/// Process-wide services shared by every request.
#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: Store,

    pub ids: IdRegistry,

    pub auth_service: Arc<dyn AuthService>,

    pub report_cases: Arc<ReportCases>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let mailer = mailer::from_config(&config.mail).context("Failed to set up mail")?;
        Self::with_mailer(config, mailer).await
    }

    pub async fn with_mailer(config: Config, mailer: Arc<dyn Mailer>) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
            HashParams::from(&config.security),
        )
        .await?;

        let report_cases = ReportCases::load(Path::new(&config.reports.cases_path))
            .context("Failed to load report cases")?;

        let ids = IdRegistry::new(store.clone());
        let signer = ResetTokenSigner::new(
            config.security.secret_key.as_bytes(),
            config.security.reset_token_expires_secs,
        );

        let auth_service: Arc<dyn AuthService> = Arc::new(SeaOrmAuthService::new(
            store.clone(),
            ids.clone(),
            signer,
            mailer,
            config.mail.sender().to_string(),
            config.server.public_url.clone(),
        ));

        Ok(Self {
            config: Arc::new(config),
            store,
            ids,
            auth_service,
            report_cases: Arc::new(report_cases),
        })
    }
}
