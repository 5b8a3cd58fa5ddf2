use crate::api::client::ApiClient;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A named, backend-stored secret referenced by id from widget settings.
/// Widgets never hold inline secrets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Credential {
    pub id: String,
    pub name: String,
    pub service: String,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NewCredential {
    pub name: String,
    pub service: String,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub secret: Option<String>,
}

/// CRUD over saved service credentials under `/user/credentials`.
pub struct CredentialService {
    api: Arc<ApiClient>,
}

impl CredentialService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    pub fn list(&self) -> Result<Vec<Credential>> {
        self.api.get_json("user/credentials")
    }

    pub fn get(&self, id: &str) -> Result<Credential> {
        self.api.get_json(&format!("user/credentials/{id}"))
    }

    pub fn create(&self, new: &NewCredential) -> Result<Credential> {
        self.api.post_json("user/credentials", new)
    }

    pub fn update(&self, id: &str, changes: &NewCredential) -> Result<Credential> {
        self.api.put_json(&format!("user/credentials/{id}"), changes)
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        self.api.delete(&format!("user/credentials/{id}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_tolerates_missing_optional_fields() {
        let cred: Credential = serde_json::from_str(
            r#"{"id":"c1","name":"Home router","service":"snmp"}"#,
        )
        .unwrap();
        assert_eq!(cred.id, "c1");
        assert!(cred.host.is_none());
        assert!(cred.secret.is_none());
    }
}
