pub mod auth;
pub mod client;
pub mod credentials;
pub mod dashboards;

pub use auth::{AuthOutcome, AuthService};
pub use client::ApiClient;
pub use credentials::{Credential, CredentialService, NewCredential};
pub use dashboards::DashboardApi;
