// ABOUTME: Blocking HTTP client for the Dropbox v2 files API
// ABOUTME: Maps HTTP failures to feed error kinds and never retries

use crate::feed::ChangeFeed;
use crate::model::ListFolderResult;
use crate::{Credential, Cursor, Error, Page, Result};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_API_BASE: &str = "https://api.dropboxapi.com";
pub const DEFAULT_CONTENT_BASE: &str = "https://content.dropboxapi.com";

const LIST_FOLDER: &str = "/2/files/list_folder";
const LIST_FOLDER_CONTINUE: &str = "/2/files/list_folder/continue";
const DOWNLOAD: &str = "/2/files/download";
const UPLOAD: &str = "/2/files/upload";

fn truncate_str(s: &str, max_chars: usize) -> String {
    if s.len() <= max_chars {
        return s.to_string();
    }

    let mut boundary = max_chars;
    while boundary > 0 && !s.is_char_boundary(boundary) {
        boundary -= 1;
    }

    if boundary == 0 {
        return String::new();
    }

    format!("{}...", &s[..boundary])
}

/// Serializes a `Dropbox-API-Arg` value; header values must stay ASCII.
fn header_arg(value: &serde_json::Value) -> String {
    let raw = value.to_string();
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{:04x}", unit));
            }
        }
    }
    out
}

/// Transport failures, including a body cut off mid-read, are worth retrying.
fn transport_error(endpoint: &str, err: impl std::fmt::Display) -> Error {
    Error::FeedTransient {
        endpoint: endpoint.into(),
        message: err.to_string(),
    }
}

/// Maps a non-success status from any endpoint to an error kind.
fn classify_status(endpoint: &str, status: StatusCode, body: &str) -> Error {
    let message = truncate_str(body, 100);
    match status {
        StatusCode::UNAUTHORIZED => Error::FeedAuth {
            endpoint: endpoint.into(),
            message,
        },
        StatusCode::TOO_MANY_REQUESTS => Error::FeedTransient {
            endpoint: endpoint.into(),
            message: format!("rate limited: {}", message),
        },
        s if s.is_server_error() => Error::FeedTransient {
            endpoint: endpoint.into(),
            message: format!("{}: {}", s.as_u16(), message),
        },
        s => Error::Api {
            endpoint: endpoint.into(),
            status: s.as_u16(),
            message,
        },
    }
}

pub struct DropboxClient {
    client: Client,
    api_base: String,
    content_base: String,
    recursive: bool,
}

impl DropboxClient {
    pub fn new(api_base: Option<String>, content_base: Option<String>) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(DropboxClient {
            client,
            api_base: api_base.unwrap_or_else(|| DEFAULT_API_BASE.into()),
            content_base: content_base.unwrap_or_else(|| DEFAULT_CONTENT_BASE.into()),
            recursive: false,
        })
    }

    /// List the whole tree instead of only the root folder.
    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    fn send(&self, endpoint: &str, request: RequestBuilder) -> Result<Response> {
        let response = request
            .header("User-Agent", "markbox/0.1 (Rust)")
            .send()
            .map_err(|e| transport_error(endpoint, e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().unwrap_or_default();
        let err = classify_status(endpoint, status, &body);
        warn!(endpoint, status = status.as_u16(), "dropbox request failed");
        Err(err)
    }

    fn rpc<T: serde::de::DeserializeOwned>(
        &self,
        credential: &Credential,
        endpoint: &str,
        body: serde_json::Value,
    ) -> Result<T> {
        let url = format!("{}{}", self.api_base, endpoint);
        let request = self
            .client
            .post(&url)
            .bearer_auth(credential.secret())
            .header("Accept", "application/json")
            .json(&body);

        let response = self.send(endpoint, request)?;
        let body = response.text().map_err(|e| transport_error(endpoint, e))?;
        serde_json::from_str(&body).map_err(|e| {
            warn!(endpoint, preview = %truncate_str(&body, 500), "unparseable response: {}", e);
            Error::Parse(e)
        })
    }
}

impl ChangeFeed for DropboxClient {
    fn list_initial(&self, credential: &Credential) -> Result<Page> {
        debug!(recursive = self.recursive, "listing folder from scratch");
        let result: ListFolderResult = self.rpc(
            credential,
            LIST_FOLDER,
            json!({ "path": "", "recursive": self.recursive }),
        )?;
        Ok(result.into())
    }

    fn list_continue(&self, credential: &Credential, cursor: &Cursor) -> Result<Page> {
        let result: ListFolderResult = self.rpc(
            credential,
            LIST_FOLDER_CONTINUE,
            json!({ "cursor": cursor.as_str() }),
        )?;
        Ok(result.into())
    }

    fn download(&self, credential: &Credential, path: &str) -> Result<Vec<u8>> {
        let url = format!("{}{}", self.content_base, DOWNLOAD);
        let request = self
            .client
            .post(&url)
            .bearer_auth(credential.secret())
            .header("Dropbox-API-Arg", header_arg(&json!({ "path": path })));

        let response = self.send(DOWNLOAD, request)?;
        let bytes = response
            .bytes()
            .map_err(|e| transport_error(DOWNLOAD, e))?;
        Ok(bytes.to_vec())
    }

    fn upload(&self, credential: &Credential, path: &str, content: &[u8]) -> Result<()> {
        let url = format!("{}{}", self.content_base, UPLOAD);
        let arg = json!({ "path": path, "mode": "overwrite", "mute": true });
        let request = self
            .client
            .post(&url)
            .bearer_auth(credential.secret())
            .header("Dropbox-API-Arg", header_arg(&arg))
            .header("Content-Type", "application/octet-stream")
            .body(content.to_vec());

        match self.send(UPLOAD, request) {
            Ok(_) => Ok(()),
            Err(Error::Api {
                status: 409,
                message,
                ..
            }) => Err(Error::UploadConflict {
                path: path.into(),
                message,
            }),
            Err(Error::Api {
                status, message, ..
            }) => Err(Error::Upload {
                path: path.into(),
                message: format!("{}: {}", status, message),
            }),
            Err(e) => Err(e),
        }
    }
}
