//! Search cluster administrative API

use crate::config::LogPipelineConfig;
use crate::{Error, Result};
use std::time::Duration;

/// Issues JSON `PUT` requests against the administrative endpoint.
pub trait AdminClient: Send + Sync {
    /// `PUT <base><path>` with a JSON body. Returns the HTTP status.
    fn put_json(&self, path: &str, body: &str) -> std::result::Result<u16, String>;
}

/// [`AdminClient`] backed by a blocking `reqwest` client.
pub struct HttpAdminClient {
    client: reqwest::blocking::Client,
    base_url: String,
    credentials: Option<(String, String)>,
}

impl HttpAdminClient {
    /// Client for `log_pipeline.admin_url`, `None` when unset. Credentials
    /// resolve from the environment here.
    pub fn from_config(config: &LogPipelineConfig) -> Result<Option<Self>> {
        let Some(base_url) = config.admin_url.as_deref() else {
            return Ok(None);
        };
        let credentials = match (&config.admin_user, &config.admin_password) {
            (Some(user), Some(password)) => Some((
                user.resolve("log_pipeline.admin_user")?,
                password.resolve("log_pipeline.admin_password")?,
            )),
            (None, None) => None,
            _ => {
                return Err(Error::config(
                    "log_pipeline.admin_user",
                    "admin_user and admin_password must be set together",
                ));
            }
        };
        let timeout = Duration::from_secs(config.admin_timeout_secs.max(1));
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(concat!("monforge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::HttpClient {
                message: e.to_string(),
            })?;
        Ok(Some(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        }))
    }
}

impl AdminClient for HttpAdminClient {
    fn put_json(&self, path: &str, body: &str) -> std::result::Result<u16, String> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self
            .client
            .put(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body.to_string());
        if let Some((user, password)) = &self.credentials {
            request = request.basic_auth(user, Some(password));
        }
        let response = request.send().map_err(|e| e.to_string())?;
        Ok(response.status().as_u16())
    }
}
