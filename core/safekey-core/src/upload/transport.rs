//! HTTP transport abstraction.
//!
//! The uploader and the API client only need "POST this body, tell me the status". Keeping
//! that behind [`Transport`] lets tests record requests without a server.

use once_cell::sync::OnceCell;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("{0}")]
    Other(String),
}

/// Blocking POST to the collection API.
///
/// Implementations must be callable from the upload worker thread.
pub trait Transport: Send + Sync {
    /// Sends `body` to `path` (e.g. `/endpoint`) and returns the HTTP status.
    fn post(&self, path: &str, content_type: &str, body: String) -> Result<u16, TransportError>;
}

/// Transport backed by a blocking reqwest client.
///
/// The client is built on first use, so it is created (and later dropped) on whichever
/// thread does the first request, normally the upload worker.
///
/// Requests carry no timeout unless one is set with [`HttpTransport::with_timeout`]. The
/// worker is the only caller, so a stalled request delays later uploads but never a key
/// handler.
#[derive(Debug)]
pub struct HttpTransport {
    base_url: String,
    timeout: Option<Duration>,
    client: OnceCell<reqwest::blocking::Client>,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: None,
            client: OnceCell::new(),
        }
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..Self::new(base_url)
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn client(&self) -> Result<&reqwest::blocking::Client, TransportError> {
        self.client.get_or_try_init(|| {
            // reqwest's blocking client defaults to 30s; None disables it.
            reqwest::blocking::Client::builder()
                .timeout(self.timeout)
                .build()
                .map_err(Self::convert_error)
        })
    }

    fn convert_error(err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout(err.to_string())
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else {
            TransportError::Other(err.to_string())
        }
    }
}

impl Transport for HttpTransport {
    fn post(&self, path: &str, content_type: &str, body: String) -> Result<u16, TransportError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client()?
            .post(&url)
            .header(CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .map_err(Self::convert_error)?;

        let status = response.status().as_u16();
        tracing::debug!(url = %url, status, "Collection API responded");
        Ok(status)
    }
}

#[cfg(test)]
pub(crate) mod test_utils {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct RecordedRequest {
        pub path: String,
        pub content_type: String,
        pub body: String,
    }

    /// Records every request and answers from a script (200 once the script runs out).
    #[derive(Default)]
    pub struct RecordingTransport {
        pub requests: Mutex<Vec<RecordedRequest>>,
        pub responses: Mutex<VecDeque<Result<u16, TransportError>>>,
    }

    impl RecordingTransport {
        pub fn with_responses(responses: Vec<Result<u16, TransportError>>) -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                responses: Mutex::new(responses.into()),
            }
        }

        pub fn requests(&self) -> Vec<RecordedRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl Transport for RecordingTransport {
        fn post(
            &self,
            path: &str,
            content_type: &str,
            body: String,
        ) -> Result<u16, TransportError> {
            self.requests.lock().unwrap().push(RecordedRequest {
                path: path.to_string(),
                content_type: content_type.to_string(),
                body,
            });
            self.responses.lock().unwrap().pop_front().unwrap_or(Ok(200))
        }
    }
}
