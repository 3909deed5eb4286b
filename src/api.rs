use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;

use crate::config::Account;
use crate::errors::ProbeError;
use crate::flex_id::FlexId;
use crate::probe::ProbeTarget;

/// Listing responses can be tens of megabytes on large panels.
pub const API_BODY_LIMIT: usize = 256 * 1024 * 1024;

/// The parts of one `get_live_streams` element the benchmark reads.
///
/// Panels disagree on field types (ids as numbers or strings, nulls for
/// names, numbers for EPG ids), so elements are read out of raw JSON and
/// anything unexpected falls back to empty rather than failing the list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stream {
    pub name: String,
    pub stream_id: FlexId,
    pub category_id: FlexId,
}

impl Stream {
    pub fn from_value(value: &Value) -> Self {
        Self {
            name: value
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            stream_id: flex_field(value, "stream_id"),
            category_id: flex_field(value, "category_id"),
        }
    }
}

fn flex_field(value: &Value, key: &str) -> FlexId {
    value
        .get(key)
        .and_then(|v| FlexId::deserialize(v).ok())
        .unwrap_or_default()
}

/// URL builder for one Xtream-Codes panel login.
#[derive(Debug, Clone)]
pub struct XtreamAccount {
    pub base_url: String,
    pub username: String,
    pub password: String,
}

impl XtreamAccount {
    pub fn new(base_url: &str, username: &str, password: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    pub fn player_api_url(&self, action: Option<&str>) -> Result<Url, ProbeError> {
        let endpoint = format!("{}/player_api.php", self.base_url);
        let mut params = vec![
            ("username", self.username.as_str()),
            ("password", self.password.as_str()),
        ];
        if let Some(action) = action {
            params.push(("action", action));
        }
        Url::parse_with_params(&endpoint, &params)
            .map_err(|e| ProbeError::InvalidTarget(format!("{}: {}", endpoint, e)))
    }

    pub fn live_categories_target(&self, name: &str, timeout_secs: u64) -> Result<ProbeTarget, ProbeError> {
        let url = self.player_api_url(Some("get_live_categories"))?;
        Ok(ProbeTarget::get(name, url.as_str(), timeout_secs)?.sample_body(API_BODY_LIMIT))
    }

    pub fn live_streams_target(&self, name: &str, timeout_secs: u64) -> Result<ProbeTarget, ProbeError> {
        let url = self.player_api_url(Some("get_live_streams"))?;
        Ok(ProbeTarget::get(name, url.as_str(), timeout_secs)?.sample_body(API_BODY_LIMIT))
    }

    pub fn get_stream_url(&self, stream_id: &FlexId, extension: &str) -> String {
        format!(
            "{}/live/{}/{}/{}.{}",
            self.base_url, self.username, self.password, stream_id, extension
        )
    }
}

impl From<&Account> for XtreamAccount {
    fn from(acc: &Account) -> Self {
        XtreamAccount::new(&acc.base_url, &acc.username, &acc.password)
    }
}
