use crate::api::client::ApiClient;
use crate::dashboard::config::DashboardConfig;
use crate::sync::service::VersionSource;
use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;

/// `/dashboard/*` endpoints: version lookup for staleness polling and a
/// best-effort push of locally saved configs.
pub struct DashboardApi {
    api: Arc<ApiClient>,
}

impl DashboardApi {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    pub fn fetch(&self, id: &str) -> Result<DashboardConfig> {
        self.api.get_json(&format!("dashboard/{id}"))
    }

    pub fn push(&self, config: &DashboardConfig) -> Result<()> {
        let _: serde_json::Value = self
            .api
            .put_json(&format!("dashboard/{}", config.id), config)?;
        Ok(())
    }
}

impl VersionSource for DashboardApi {
    fn latest_versions(&self) -> Result<HashMap<String, u64>> {
        self.api.get_json("dashboard/versions")
    }
}
