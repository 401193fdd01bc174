use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

/// Length of every check identifier.
pub const CHECK_ID_LEN: usize = 20;

/// Scheme used to reach a check's target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    Https,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "http" => Ok(Protocol::Http),
            "https" => Ok(Protocol::Https),
            other => Err(format!("unsupported protocol '{other}' (expected http or https)")),
        }
    }
}

/// HTTP verb a check is probed with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Delete => "delete",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "get" => Ok(HttpMethod::Get),
            "post" => Ok(HttpMethod::Post),
            "put" => Ok(HttpMethod::Put),
            "delete" => Ok(HttpMethod::Delete),
            other => Err(format!("unsupported method '{other}' (expected get, post, put or delete)")),
        }
    }
}

/// Up/down classification of a check
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckState {
    Up,
    #[default]
    Down,
}

impl fmt::Display for CheckState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckState::Up => write!(f, "up"),
            CheckState::Down => write!(f, "down"),
        }
    }
}

impl FromStr for CheckState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(CheckState::Up),
            "down" => Ok(CheckState::Down),
            other => Err(format!("unknown state '{other}'")),
        }
    }
}

/// A validated check, as stored in the `checks` collection.
///
/// The on-disk field names (`userPhone`, `method`, `lastChecked`) are kept
/// stable so records written by the check-creation path stay readable.
/// `state` and `last_checked_at` are only ever written by the monitoring
/// engine, which patches them into the stored document, so they are never
/// serialized from a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckRecord {
    pub id: String,

    #[serde(rename = "userPhone")]
    pub owner_phone: String,

    pub protocol: Protocol,

    /// Host and path, including the query string, without the scheme
    pub url: String,

    #[serde(rename = "method")]
    pub http_method: HttpMethod,

    pub success_codes: Vec<u16>,

    pub timeout_seconds: u64,

    #[serde(default, skip_serializing)]
    pub state: CheckState,

    /// Unix epoch milliseconds of the last completed probe
    #[serde(rename = "lastChecked", default, skip_serializing)]
    pub last_checked_at: Option<i64>,
}

impl CheckRecord {
    /// Full URL the prober requests.
    pub fn target_url(&self) -> Result<Url, url::ParseError> {
        parse_target(self.protocol, &self.url)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Whether the engine has completed at least one probe of this check.
    pub fn has_been_checked(&self) -> bool {
        self.last_checked_at.is_some()
    }
}

/// Join a protocol and a scheme-less target into a URL with a host.
pub fn parse_target(protocol: Protocol, target: &str) -> Result<Url, url::ParseError> {
    let url = Url::parse(&format!("{protocol}://{target}"))?;
    if url.host_str().is_none_or(str::is_empty) {
        return Err(url::ParseError::EmptyHost);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> CheckRecord {
        CheckRecord {
            id: "abcdefghij0123456789".to_string(),
            owner_phone: "5551234567".to_string(),
            protocol: Protocol::Https,
            url: "example.com/health?deep=1".to_string(),
            http_method: HttpMethod::Get,
            success_codes: vec![200, 201],
            timeout_seconds: 3,
            state: CheckState::Down,
            last_checked_at: None,
        }
    }

    #[test]
    fn test_target_url_keeps_path_and_query() {
        let url = record().target_url().unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host_str(), Some("example.com"));
        assert_eq!(url.path(), "/health");
        assert_eq!(url.query(), Some("deep=1"));
    }

    #[test]
    fn test_parse_target_rejects_missing_host() {
        assert!(parse_target(Protocol::Http, "").is_err());
        assert!(parse_target(Protocol::Https, "exa mple.com").is_err());
    }

    #[test]
    fn test_serializes_with_stored_field_names() {
        let value = serde_json::to_value(record()).unwrap();
        assert_eq!(value["userPhone"], json!("5551234567"));
        assert_eq!(value["method"], json!("get"));
        assert_eq!(value["successCodes"], json!([200, 201]));
        assert_eq!(value["timeoutSeconds"], json!(3));
    }

    #[test]
    fn test_engine_owned_fields_are_never_serialized() {
        let checked = CheckRecord { state: CheckState::Up, last_checked_at: Some(42), ..record() };
        let value = serde_json::to_value(checked).unwrap();
        assert!(value.get("state").is_none());
        assert!(value.get("lastChecked").is_none());
        assert!(!record().has_been_checked());
    }

    #[test]
    fn test_enum_parsing_is_exact() {
        assert_eq!("https".parse::<Protocol>(), Ok(Protocol::Https));
        assert!("HTTPS".parse::<Protocol>().is_err());
        assert_eq!("delete".parse::<HttpMethod>(), Ok(HttpMethod::Delete));
        assert!("patch".parse::<HttpMethod>().is_err());
        assert_eq!("up".parse::<CheckState>(), Ok(CheckState::Up));
        assert_eq!(CheckState::default(), CheckState::Down);
    }
}
