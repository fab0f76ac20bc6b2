use std::time::Duration;

use serde::Deserialize;

use crate::args::HttpMethod;
use crate::error::AppResult;

#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    pub url: Option<String>,
    #[serde(alias = "thread", alias = "client")]
    pub concurrency: Option<usize>,
    #[serde(alias = "time")]
    pub duration: Option<DurationValue>,
    pub interval: Option<DurationValue>,
    pub timeout: Option<DurationValue>,
    pub connect_timeout: Option<DurationValue>,
    pub method: Option<HttpMethod>,
    pub data: Option<String>,
    pub headers: Option<Vec<String>>,
    pub http2: Option<bool>,
    pub proxy: Option<String>,
    pub socks5: Option<String>,
    pub reload: Option<bool>,
    pub status: Option<u16>,
    pub accept_2xx: Option<bool>,
    pub urls_file: Option<String>,
    pub queue_passes: Option<usize>,
    pub export_json: Option<String>,
}

/// Either a bare number (unit depends on the field) or a string with a
/// `ms/s/m/h` suffix.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DurationValue {
    Number(u64),
    Text(String),
}

impl DurationValue {
    pub(crate) fn to_duration(&self, parse: fn(&str) -> AppResult<Duration>) -> AppResult<Duration> {
        match self {
            DurationValue::Number(value) => parse(&value.to_string()),
            DurationValue::Text(text) => parse(text),
        }
    }
}
