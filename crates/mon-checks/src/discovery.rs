//! Best-effort service discovery over HTTP
//!
//! Discovery never mutates a dependency and never fails synthesis: it returns
//! the parameters it could infer together with warnings describing what it
//! could not.

use crate::{CheckPlugin, Error, Result};
use mon_model::{Dependency, ParamValue};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Health endpoint paths probed in order; the first 2xx answer wins.
pub const HEALTH_CANDIDATES: &[&str] = &[
    "/health",
    "/healthz",
    "/healthcheck",
    "/status",
    "/api/health",
    "/actuator/health",
    "/health/ready",
    "/health/live",
];

const MAX_BODY_BYTES: usize = 64 * 1024;

/// Response data a probe needs. Header names are lowercase.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProbeResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl ProbeResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Issues blocking HTTP GETs with an explicit timeout.
pub trait Prober: Send + Sync {
    fn get(&self, url: &str) -> std::result::Result<ProbeResponse, String>;
}

/// [`Prober`] backed by a blocking `reqwest` client.
pub struct HttpProber {
    client: reqwest::blocking::Client,
}

impl HttpProber {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(3))
            .user_agent(concat!("monforge-discovery/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::ProbeClient {
                message: e.to_string(),
            })?;
        Ok(Self { client })
    }
}

impl Prober for HttpProber {
    fn get(&self, url: &str) -> std::result::Result<ProbeResponse, String> {
        let response = self.client.get(url).send().map_err(|e| e.to_string())?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_lowercase(), v.to_string()))
            })
            .collect();
        let mut body = response.text().map_err(|e| e.to_string())?;
        if body.len() > MAX_BODY_BYTES {
            let mut cut = MAX_BODY_BYTES;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
        }
        Ok(ProbeResponse {
            status,
            headers,
            body,
        })
    }
}

/// What kind of service answered on the probed port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceFamily {
    Nginx,
    Apache,
    WebServer,
    JsonApi,
}

impl fmt::Display for ServiceFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Nginx => "nginx web server",
            Self::Apache => "apache web server",
            Self::WebServer => "web server",
            Self::JsonApi => "JSON API",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryWarning {
    Unreachable {
        dependency: String,
        url: String,
        message: String,
    },
    AmbiguousSignature {
        dependency: String,
        detail: String,
    },
    NoHealthEndpoint {
        dependency: String,
    },
}

impl fmt::Display for DiscoveryWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreachable {
                dependency,
                url,
                message,
            } => write!(
                f,
                "dependency '{}': probe of {} failed ({}); using protocol defaults",
                dependency, url, message
            ),
            Self::AmbiguousSignature { dependency, detail } => write!(
                f,
                "dependency '{}': could not classify service ({})",
                dependency, detail
            ),
            Self::NoHealthEndpoint { dependency } => write!(
                f,
                "dependency '{}': no health endpoint found; using default path",
                dependency
            ),
        }
    }
}

/// Parameters inferred for one dependency.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InferredParams {
    pub family: Option<ServiceFamily>,
    pub params: BTreeMap<String, ParamValue>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscoveryOutcome {
    pub inferred: InferredParams,
    pub warnings: Vec<DiscoveryWarning>,
}

/// Classify a root response. `Err` carries the reason classification failed.
pub fn classify(response: &ProbeResponse) -> std::result::Result<ServiceFamily, String> {
    let content_type = response.header("content-type").unwrap_or("").to_lowercase();
    if content_type.contains("application/json") {
        return Ok(ServiceFamily::JsonApi);
    }

    let server = response.header("server").unwrap_or("").to_lowercase();
    let body = response.body.to_lowercase();
    let mentions_nginx = server.contains("nginx") || body.contains("nginx");
    let mentions_apache = server.contains("apache") || body.contains("apache");

    match (mentions_nginx, mentions_apache) {
        (true, true) if server.contains("nginx") => Ok(ServiceFamily::Nginx),
        (true, true) if server.contains("apache") => Ok(ServiceFamily::Apache),
        (true, true) => Err("response mentions both nginx and apache".to_string()),
        (true, false) => Ok(ServiceFamily::Nginx),
        (false, true) => Ok(ServiceFamily::Apache),
        (false, false) if content_type.contains("text/html") || body.contains("<html") => {
            Ok(ServiceFamily::WebServer)
        }
        (false, false) => Err(format!(
            "unrecognized content type '{}'",
            if content_type.is_empty() { "none" } else { &content_type }
        )),
    }
}

/// Probe `dependency` and infer check parameters.
///
/// Runs only for plugins that support discovery and dependencies that declare
/// a host. An explicit `ssl` check parameter decides the scheme; otherwise
/// ports 443 and 8443 are probed over https.
pub fn discover(
    dependency: &Dependency,
    plugin: &dyn CheckPlugin,
    prober: &dyn Prober,
) -> DiscoveryOutcome {
    let mut outcome = DiscoveryOutcome::default();
    if !plugin.supports_discovery() {
        return outcome;
    }
    let Some(host) = dependency.host.as_deref() else {
        tracing::debug!(dependency = %dependency.name, "no host declared, skipping discovery");
        return outcome;
    };

    let explicit_ssl = dependency.check_params.get("ssl").and_then(ParamValue::as_bool);
    let port = dependency.port();
    let tls = explicit_ssl.unwrap_or(matches!(port, Some(443) | Some(8443)))
        || dependency.protocol_key() == "https";
    let scheme = if tls { "https" } else { "http" };
    let base = match port {
        Some(port) => format!("{}://{}:{}", scheme, host, port),
        None => format!("{}://{}", scheme, host),
    };

    let root_url = format!("{}/", base);
    match prober.get(&root_url) {
        Ok(response) => match classify(&response) {
            Ok(family) => {
                tracing::debug!(dependency = %dependency.name, %family, "classified service");
                outcome.inferred.family = Some(family);
            }
            Err(detail) => outcome.warnings.push(DiscoveryWarning::AmbiguousSignature {
                dependency: dependency.name.clone(),
                detail,
            }),
        },
        Err(message) => {
            outcome.warnings.push(DiscoveryWarning::Unreachable {
                dependency: dependency.name.clone(),
                url: root_url,
                message,
            });
            return outcome;
        }
    }

    for path in HEALTH_CANDIDATES {
        let url = format!("{}{}", base, path);
        match prober.get(&url) {
            Ok(response) if response.is_success() => {
                tracing::info!(dependency = %dependency.name, path, "discovered health endpoint");
                outcome
                    .inferred
                    .params
                    .insert("url".to_string(), ParamValue::from(*path));
                outcome.inferred.params.insert(
                    "expected_status".to_string(),
                    ParamValue::Integer(i64::from(response.status)),
                );
                if outcome.inferred.family.is_none()
                    && response
                        .header("content-type")
                        .is_some_and(|ct| ct.contains("application/json"))
                {
                    outcome.inferred.family = Some(ServiceFamily::JsonApi);
                }
                return outcome;
            }
            Ok(_) => {}
            Err(message) => {
                tracing::debug!(dependency = %dependency.name, %url, %message, "health probe failed");
            }
        }
    }

    outcome.warnings.push(DiscoveryWarning::NoHealthEndpoint {
        dependency: dependency.name.clone(),
    });
    outcome
}
