//! GitHub contents API backend.

use crate::store::{Blob, BlobStore, PutOutcome, StoreError, VersionToken};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::time::Duration;
use tracing::{debug, warn};

const BACKEND: &str = "github";
const JSON_MEDIA_TYPE: &str = "application/vnd.github.v3+json";
/// Returns file bytes directly; the only way to read blobs over 1 MB.
const RAW_MEDIA_TYPE: &str = "application/vnd.github.raw";

#[derive(Debug, Clone)]
pub struct GithubConfig {
    pub api_base: String,
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub token: String,
    pub timeout: Duration,
    /// Commit message prefix; the write time is appended.
    pub commit_prefix: String,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".to_string(),
            owner: String::new(),
            repo: String::new(),
            branch: "main".to_string(),
            token: String::new(),
            timeout: Duration::from_secs(15),
            commit_prefix: "Add corrections".to_string(),
        }
    }
}

pub struct GithubBlobStore {
    config: GithubConfig,
    agent: ureq::Agent,
}

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    sha: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: String,
}

#[derive(Debug, Serialize)]
struct PutContentsRequest<'a> {
    message: String,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct PutContentsResponse {
    content: ContentsEntry,
}

#[derive(Debug, Deserialize)]
struct ContentsEntry {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct DirEntry {
    path: String,
    #[serde(rename = "type")]
    kind: String,
}

impl GithubBlobStore {
    pub fn new(config: GithubConfig) -> Result<Self, StoreError> {
        if config.token.trim().is_empty() {
            return Err(StoreError::Configuration(
                "GitHub token not configured (set FIELDFIX_GITHUB_TOKEN or --token)".to_string(),
            ));
        }
        if config.owner.is_empty() || config.repo.is_empty() {
            return Err(StoreError::Configuration(
                "GitHub owner and repo must be set in [remote]".to_string(),
            ));
        }
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(config.timeout)
            .timeout_read(config.timeout)
            .timeout_write(config.timeout)
            .user_agent(concat!("fieldfix/", env!("CARGO_PKG_VERSION")))
            .build();
        Ok(Self { config, agent })
    }

    fn contents_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.config.api_base.trim_end_matches('/'),
            self.config.owner,
            self.config.repo,
            path.trim_start_matches('/')
        )
    }

    fn request(&self, method: &str, url: &str) -> ureq::Request {
        self.agent
            .request(method, url)
            .set("Authorization", &format!("token {}", self.config.token))
            .set("Accept", JSON_MEDIA_TYPE)
    }

    /// Blob bytes via the raw media type, for files the JSON response leaves empty.
    fn get_raw(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        let url = self.contents_url(path);
        let resp = self
            .request("GET", &url)
            .set("Accept", RAW_MEDIA_TYPE)
            .query("ref", &self.config.branch)
            .call();
        match resp {
            Ok(resp) => {
                let mut content = Vec::new();
                resp.into_reader()
                    .read_to_end(&mut content)
                    .map_err(|e| transient(path, format!("reading raw content: {}", e)))?;
                Ok(content)
            }
            Err(ureq::Error::Status(code, resp)) => Err(status_error(path, code, resp)),
            Err(ureq::Error::Transport(t)) => Err(transient(path, t.to_string())),
        }
    }

    fn commit_message(&self) -> String {
        format!(
            "{} - {}",
            self.config.commit_prefix,
            Local::now().format("%Y-%m-%d %H:%M")
        )
    }
}

fn transient(path: &str, message: impl Into<String>) -> StoreError {
    StoreError::Transient {
        path: path.to_string(),
        message: message.into(),
    }
}

fn status_error(path: &str, code: u16, resp: ureq::Response) -> StoreError {
    if code == 401 {
        return StoreError::AuthExpired { backend: BACKEND };
    }
    let body = resp.into_string().unwrap_or_default();
    transient(path, format!("http status {}: {}", code, body.trim()))
}

/// The contents API omits the body of files over 1 MB and reports `encoding: "none"`.
fn needs_raw_fetch(body: &ContentsResponse) -> bool {
    body.encoding == "none"
}

fn decode_content(path: &str, body: ContentsResponse) -> Result<Blob, StoreError> {
    if body.encoding != "base64" {
        return Err(transient(
            path,
            format!("unsupported content encoding '{}'", body.encoding),
        ));
    }
    let compact: String = body.content.split_whitespace().collect();
    let content = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| transient(path, format!("invalid base64 content: {}", e)))?;
    Ok(Blob {
        content,
        version: VersionToken::new(body.sha),
    })
}

impl BlobStore for GithubBlobStore {
    fn name(&self) -> &'static str {
        BACKEND
    }

    fn check_access(&self) -> Result<(), StoreError> {
        let url = format!("{}/user", self.config.api_base.trim_end_matches('/'));
        match self.request("GET", &url).call() {
            Ok(_) => Ok(()),
            Err(ureq::Error::Status(code, resp)) => Err(status_error("/user", code, resp)),
            Err(ureq::Error::Transport(t)) => Err(transient("/user", t.to_string())),
        }
    }

    fn get_blob(&self, path: &str) -> Result<Option<Blob>, StoreError> {
        let url = self.contents_url(path);
        debug!(url = %url, "fetching blob");
        let resp = self
            .request("GET", &url)
            .query("ref", &self.config.branch)
            .call();
        match resp {
            Ok(resp) => {
                let body: ContentsResponse = resp
                    .into_json()
                    .map_err(|e| transient(path, format!("invalid contents response: {}", e)))?;
                if needs_raw_fetch(&body) {
                    // A newer file under this older sha fails the next write as a conflict.
                    debug!(path, "blob over the inline limit; fetching raw");
                    let content = self.get_raw(path)?;
                    return Ok(Some(Blob {
                        content,
                        version: VersionToken::new(body.sha),
                    }));
                }
                decode_content(path, body).map(Some)
            }
            Err(ureq::Error::Status(404, _)) => Ok(None),
            Err(ureq::Error::Status(code, resp)) => Err(status_error(path, code, resp)),
            Err(ureq::Error::Transport(t)) => Err(transient(path, t.to_string())),
        }
    }

    fn put_blob(&self, path: &str, content: &[u8], version: Option<&VersionToken>) -> PutOutcome {
        let payload = PutContentsRequest {
            message: self.commit_message(),
            content: STANDARD.encode(content),
            branch: &self.config.branch,
            sha: version.map(VersionToken::as_str),
        };
        let url = self.contents_url(path);
        match self.request("PUT", &url).send_json(&payload) {
            Ok(resp) => {
                let version = resp
                    .into_json::<PutContentsResponse>()
                    .map(|r| VersionToken::new(r.content.sha))
                    .map_err(|e| warn!(path = %path, error = %e, "unreadable put response"))
                    .ok();
                PutOutcome::Success { version }
            }
            // 409: sha mismatch; 422: sha missing for an existing file.
            Err(ureq::Error::Status(409 | 422, _)) => PutOutcome::Conflict,
            Err(ureq::Error::Status(401, _)) => PutOutcome::AuthExpired { backend: BACKEND },
            Err(ureq::Error::Status(code, resp)) => PutOutcome::Failure {
                reason: status_error(path, code, resp).to_string(),
            },
            Err(ureq::Error::Transport(t)) => PutOutcome::Failure {
                reason: t.to_string(),
            },
        }
    }

    fn list_blobs(&self) -> Result<Vec<String>, StoreError> {
        let url = self.contents_url("");
        let resp = self
            .request("GET", &url)
            .query("ref", &self.config.branch)
            .call();
        match resp {
            Ok(resp) => {
                let entries: Vec<DirEntry> = resp
                    .into_json()
                    .map_err(|e| transient("/", format!("invalid listing: {}", e)))?;
                let mut out: Vec<String> = entries
                    .into_iter()
                    .filter(|e| e.kind == "file")
                    .map(|e| e.path)
                    .collect();
                out.sort();
                Ok(out)
            }
            Err(ureq::Error::Status(code, resp)) => Err(status_error("/", code, resp)),
            Err(ureq::Error::Transport(t)) => Err(transient("/", t.to_string())),
        }
    }
}
