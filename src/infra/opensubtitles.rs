use std::cell::OnceCell;
use std::time::Duration;
use tracing::{debug, warn};

use crate::domain::models::{Candidate, FetchedSubtitle, SearchCriteria};
use crate::infra::xmlrpc::{self, RpcError, Value};

pub const DEFAULT_SERVER: &str = "http://api.opensubtitles.org/xml-rpc";
pub const DEFAULT_USER_AGENT: &str = "OSTestUserAgent";

/// Remote lookup of subtitles by video fingerprint.
pub trait SubtitleService {
    fn search(&self, criteria: &SearchCriteria) -> Result<Vec<Candidate>, RpcError>;

    fn fetch(&self, file_ids: &[String]) -> Result<Vec<FetchedSubtitle>, RpcError>;
}

#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub url: String,
    pub user_agent: String,
    pub language: String,
    pub timeout: Duration,
}

/// An OpenSubtitles XML-RPC session. Logs in on first use; every later
/// call carries the token it got back.
#[derive(Debug)]
pub struct Session {
    http: reqwest::blocking::Client,
    url: String,
    user_agent: String,
    language: String,
    token: OnceCell<Option<String>>,
}

/// Extracts `key` from a response struct if its status is `200 ...`.
fn payload<'a>(response: &'a Value, key: &str) -> Option<&'a Value> {
    let status = response.get_text("status").unwrap_or_default();
    if status.split_whitespace().next() == Some("200") {
        response.get(key)
    } else {
        warn!(status = %status, "subtitle service refused request");
        None
    }
}

impl Session {
    /// Builds the HTTP client. No request is made until the first search
    /// or fetch.
    pub fn new(settings: &ServiceSettings) -> Result<Self, RpcError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(settings.timeout)
            .user_agent(settings.user_agent.clone())
            .build()?;
        Ok(Self {
            http,
            url: settings.url.clone(),
            user_agent: settings.user_agent.clone(),
            language: settings.language.clone(),
            token: OnceCell::new(),
        })
    }

    /// Logs in anonymously. A failed or refused login leaves the session
    /// without a token; its calls then return no data.
    fn login(&self) -> Option<String> {
        let params = [
            Value::from(""),
            Value::from(""),
            Value::from(self.language.as_str()),
            Value::from(self.user_agent.as_str()),
        ];
        let token = match self.call("LogIn", &params) {
            Ok(response) => payload(&response, "token")
                .and_then(Value::as_str)
                .map(str::to_string),
            Err(e) => {
                warn!(error = %e, url = %self.url, "login request failed");
                None
            }
        };
        if token.is_none() {
            warn!("Couldn't log in to the subtitle service");
        }
        token
    }

    fn post(&self, body: &str) -> Result<Value, RpcError> {
        let response = self
            .http
            .post(&self.url)
            .header("Content-Type", "text/xml")
            .body(body.to_string())
            .send()?
            .error_for_status()?;
        xmlrpc::decode_response(&response.text()?)
    }

    /// Issues one call, retrying a single time if it timed out.
    fn call(&self, method: &str, params: &[Value]) -> Result<Value, RpcError> {
        let body = xmlrpc::encode_call(method, params)?;
        debug!(method, "calling subtitle service");
        match self.post(&body) {
            Err(e) if e.is_timeout() => {
                warn!(method, "subtitle service timed out, retrying once");
                self.post(&body)
            }
            result => result,
        }
    }

    fn token(&self) -> Option<Value> {
        self.token
            .get_or_init(|| self.login())
            .as_deref()
            .map(Value::from)
    }
}

impl SubtitleService for Session {
    fn search(&self, criteria: &SearchCriteria) -> Result<Vec<Candidate>, RpcError> {
        let Some(token) = self.token() else {
            return Ok(Vec::new());
        };
        let query: Value = [
            ("sublanguageid", Value::from(criteria.language.as_str())),
            ("moviehash", Value::from(criteria.fingerprint.to_string())),
            ("moviebytesize", Value::from(criteria.size.to_string())),
        ]
        .into_iter()
        .collect();

        let response = self.call("SearchSubtitles", &[token, Value::Array(vec![query])])?;
        Ok(parse_candidates(&response))
    }

    fn fetch(&self, file_ids: &[String]) -> Result<Vec<FetchedSubtitle>, RpcError> {
        let Some(token) = self.token() else {
            return Ok(Vec::new());
        };
        let ids = file_ids.iter().map(|id| Value::from(id.as_str())).collect();

        let response = self.call("DownloadSubtitles", &[token, Value::Array(ids)])?;
        Ok(parse_downloads(&response))
    }
}

/// A result with no data comes back as `false` rather than an empty array.
fn entries<'a>(response: &'a Value) -> &'a [Value] {
    payload(response, "data")
        .and_then(Value::as_array)
        .unwrap_or_default()
}

fn parse_candidates(response: &Value) -> Vec<Candidate> {
    entries(response)
        .iter()
        .filter_map(|entry| {
            Some(Candidate {
                file_id: entry.get_text("IDSubtitleFile")?,
                display_name: entry.get_text("SubFileName").unwrap_or_default(),
            })
        })
        .collect()
}

fn parse_downloads(response: &Value) -> Vec<FetchedSubtitle> {
    entries(response)
        .iter()
        .filter_map(|entry| {
            Some(FetchedSubtitle {
                file_id: entry.get_text("idsubtitlefile").unwrap_or_default(),
                payload: entry.get_text("data")?,
            })
        })
        .collect()
}
