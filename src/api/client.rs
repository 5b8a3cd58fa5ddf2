use crate::session::SessionStore;
use anyhow::{Context, Result};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::AUTHORIZATION;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Single point for REST calls to the companion backend.
///
/// Attaches the bearer token from the session store when one exists. Errors
/// are plain `anyhow` values; callers decide whether a failure is fatal or
/// rendered inline.
pub struct ApiClient {
    http: Client,
    base_url: Url,
    session: Arc<SessionStore>,
}

impl ApiClient {
    pub fn new(base_url: &str, session: Arc<SessionStore>) -> Result<Self> {
        let mut base = base_url.trim_end_matches('/').to_string();
        base.push('/');
        let base_url = Url::parse(&base).context("parse backend url")?;
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent("tileboard api client")
            .build()?;
        Ok(Self {
            http,
            base_url,
            session,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .with_context(|| format!("bad endpoint path '{path}'"))
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match self.session.token() {
            Some(token) => req.header(AUTHORIZATION, format!("Bearer {token}")),
            None => req,
        }
    }

    fn read_json<T: DeserializeOwned>(resp: reqwest::blocking::Response) -> Result<T> {
        if !resp.status().is_success() {
            anyhow::bail!("http status {}", resp.status());
        }
        resp.json().context("parse response body")
    }

    pub fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let req = self.authorize(self.http.get(self.endpoint(path)?));
        Self::read_json(req.send()?)
    }

    pub fn get_json_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let req = self.authorize(self.http.get(self.endpoint(path)?).query(query));
        Self::read_json(req.send()?)
    }

    pub fn post_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let req = self.authorize(self.http.post(self.endpoint(path)?).json(body));
        Self::read_json(req.send()?)
    }

    pub fn put_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let req = self.authorize(self.http.put(self.endpoint(path)?).json(body));
        Self::read_json(req.send()?)
    }

    pub fn delete(&self, path: &str) -> Result<()> {
        let req = self.authorize(self.http.delete(self.endpoint(path)?));
        let resp = req.send()?;
        if !resp.status().is_success() {
            anyhow::bail!("http status {}", resp.status());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ApiClient {
        let dir = tempfile::tempdir().unwrap();
        let session = Arc::new(SessionStore::new(dir.path().join("session.json")));
        ApiClient::new("http://127.0.0.1:7700", session).unwrap()
    }

    #[test]
    fn endpoint_joins_relative_to_base() {
        let api = client();
        assert_eq!(
            api.endpoint("/auth/login").unwrap().as_str(),
            "http://127.0.0.1:7700/auth/login"
        );
        assert_eq!(
            api.endpoint("api/weather").unwrap().as_str(),
            "http://127.0.0.1:7700/api/weather"
        );
    }

    #[test]
    fn base_url_keeps_path_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let session = Arc::new(SessionStore::new(dir.path().join("session.json")));
        let api = ApiClient::new("http://host/proxy/", session).unwrap();
        assert_eq!(
            api.endpoint("dashboard/versions").unwrap().as_str(),
            "http://host/proxy/dashboard/versions"
        );
    }
}
