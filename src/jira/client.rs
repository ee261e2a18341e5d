//! Jira REST client.
//!
//! Fetches issue metadata from `/rest/api/2/issue/{id}` and checks the
//! current session via `/rest/auth/latest/session`.

use crate::jira::fetcher::{FetchUnavailable, MetadataFetcher, UnavailableReason};
use crate::models::TicketDetail;
use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use serde_json::Value;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, info, warn};

/// `name=` entry of a legacy Greenhopper sprint string.
static LEGACY_SPRINT_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\[,]name=([^,\]]*)").expect("Invalid sprint name regex"));

/// Connection settings for [`JiraClient`].
#[derive(Debug, Clone)]
pub struct JiraClientConfig {
    pub base_url: String,
    pub sprint_field: String,
    pub timeout_seconds: u64,
    pub user_email: Option<String>,
    pub api_token: Option<String>,
}

impl Default for JiraClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://your-domain.atlassian.net".to_string(),
            sprint_field: "customfield_10007".to_string(),
            timeout_seconds: 30,
            user_email: None,
            api_token: None,
        }
    }
}

impl From<&crate::config::JiraConfig> for JiraClientConfig {
    fn from(config: &crate::config::JiraConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            sprint_field: config.sprint_field.clone(),
            timeout_seconds: config.timeout_seconds,
            user_email: config.user_email.clone(),
            api_token: config.api_token.clone(),
        }
    }
}

/// Jira REST API client.
pub struct JiraClient {
    config: JiraClientConfig,
    http_client: reqwest::Client,
}

impl JiraClient {
    /// Create a new client.
    pub fn new(config: JiraClientConfig) -> Result<Self> {
        info!("Initializing Jira client for {}", config.base_url);

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            config,
            http_client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        let request = self.http_client.get(url);
        match (&self.config.user_email, &self.config.api_token) {
            (Some(user), token) => request.basic_auth(user, token.as_deref()),
            _ => request,
        }
    }

    /// Check whether the configured credentials have a valid Jira session.
    ///
    /// Any failure, including an unreachable server, reports `false`.
    pub async fn check_session(&self) -> bool {
        let url = format!("{}/rest/auth/latest/session", self.config.base_url);
        debug!("Checking Jira session at {}", url);

        match self.get(&url).send().await {
            Ok(response) => {
                let ok = response.status().is_success();
                if !ok {
                    warn!("Session check returned {}", response.status());
                }
                ok
            }
            Err(e) => {
                warn!("Error checking Jira login status: {}", e);
                false
            }
        }
    }

    fn transport_error(&self, id: &str, e: reqwest::Error) -> FetchUnavailable {
        let message = if e.is_timeout() {
            format!("timed out after {}s", self.config.timeout_seconds)
        } else if e.is_connect() {
            format!("cannot connect to {}", self.config.base_url)
        } else {
            e.to_string()
        };
        FetchUnavailable::new(id, UnavailableReason::Transport(message))
    }
}

#[async_trait]
impl MetadataFetcher for JiraClient {
    async fn fetch_detail(&self, id: &str) -> Result<TicketDetail, FetchUnavailable> {
        let url = format!("{}/rest/api/2/issue/{}", self.config.base_url, id);

        let response = self
            .get(&url)
            .send()
            .await
            .map_err(|e| self.transport_error(id, e))?;

        if !response.status().is_success() {
            return Err(FetchUnavailable::new(
                id,
                UnavailableReason::Status(response.status().as_u16()),
            ));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| FetchUnavailable::new(id, UnavailableReason::Decode(e.to_string())))?;

        parse_issue(id, &body, &self.config.sprint_field)
            .map_err(|msg| FetchUnavailable::new(id, UnavailableReason::Decode(msg)))
    }
}

/// Decode a Jira issue document into a [`TicketDetail`].
pub fn parse_issue(id: &str, body: &Value, sprint_field: &str) -> Result<TicketDetail, String> {
    let fields = body
        .get("fields")
        .filter(|f| f.is_object())
        .ok_or_else(|| "missing 'fields'".to_string())?;

    let issue_type = fields["issuetype"]["name"]
        .as_str()
        .ok_or_else(|| "missing 'issuetype.name'".to_string())?
        .to_string();

    Ok(TicketDetail {
        id: id.to_string(),
        summary: fields["summary"].as_str().unwrap_or_default().to_string(),
        issue_type,
        sprint_names: parse_sprint_names(&fields[sprint_field]),
    })
}

/// Extract sprint names from a sprint custom field value.
///
/// Accepts `null`, an array of sprint objects, or an array of legacy
/// Greenhopper strings (`...Sprint@1a2b[id=1,name=Sprint 1,...]`).
pub fn parse_sprint_names(value: &Value) -> Vec<String> {
    let Some(entries) = value.as_array() else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| match entry {
            Value::Object(_) => entry["name"].as_str().map(String::from),
            Value::String(s) => LEGACY_SPRINT_NAME
                .captures(s)
                .map(|caps| caps[1].to_string()),
            _ => None,
        })
        .collect()
}
