use serde::{Deserialize, Serialize};

use crate::Error;

/// Runtime configuration, read once from the environment at startup.
/// Platform credentials stay optional here; a source client demands the
/// ones it needs when it is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database_url: Option<String>,
    pub port: u16,

    pub vtex_base_url: Option<String>,
    pub vtex_app_key: Option<String>,
    pub vtex_app_token: Option<String>,

    pub payway_base_url: Option<String>,
    pub payway_user: Option<String>,
    pub payway_password: Option<String>,

    pub cdp_base_url: Option<String>,
    pub cdp_token: Option<String>,

    pub janis_base_url: Option<String>,
    pub janis_client_id: Option<String>,
    pub janis_client_secret: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL").ok(),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),
            vtex_base_url: std::env::var("VTEX_BASE_URL").ok(),
            vtex_app_key: std::env::var("VTEX_APP_KEY").ok(),
            vtex_app_token: std::env::var("VTEX_APP_TOKEN").ok(),
            payway_base_url: std::env::var("PAYWAY_BASE_URL").ok(),
            payway_user: std::env::var("PAYWAY_USER").ok(),
            payway_password: std::env::var("PAYWAY_PASSWORD").ok(),
            cdp_base_url: std::env::var("CDP_BASE_URL").ok(),
            cdp_token: std::env::var("CDP_TOKEN").ok(),
            janis_base_url: std::env::var("JANIS_BASE_URL").ok(),
            janis_client_id: std::env::var("JANIS_CLIENT_ID").ok(),
            janis_client_secret: std::env::var("JANIS_CLIENT_SECRET").ok(),
        }
    }

    pub fn require(value: &Option<String>, name: &'static str) -> Result<String, Error> {
        value.clone().ok_or(Error::MissingCredentials(name))
    }
}
