//! HTTP fetch of `http://<name>/` with a byte cap on the body.

use std::error::Error as _;

use futures_util::StreamExt;
use reqwest::redirect::Policy;
use url::Url;

use delve_types::HttpOutcome;

use crate::SetupError;
use crate::settings::{DEFAULT_HTTP_PORT, HttpSettings};

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    port: u16,
    max_body_bytes: usize,
}

impl HttpFetcher {
    pub fn new(settings: &HttpSettings) -> Result<Self, SetupError> {
        let client = reqwest::Client::builder()
            .redirect(Policy::limited(settings.max_redirects))
            .user_agent(&settings.user_agent)
            .connect_timeout(settings.timeout)
            .timeout(settings.timeout)
            .build()
            .map_err(SetupError::HttpClient)?;
        Ok(Self {
            client,
            port: settings.port,
            max_body_bytes: settings.max_body_bytes,
        })
    }

    pub fn url_for(&self, name: &str) -> Result<Url, url::ParseError> {
        if self.port == DEFAULT_HTTP_PORT {
            Url::parse(&format!("http://{name}/"))
        } else {
            Url::parse(&format!("http://{name}:{}/", self.port))
        }
    }

    /// Fetch the name's root page. Failures become [`HttpOutcome::Failed`]
    /// carrying the error text.
    pub async fn fetch(&self, name: &str) -> HttpOutcome {
        let url = match self.url_for(name) {
            Ok(url) => url,
            Err(e) => {
                return HttpOutcome::Failed {
                    error: format!("invalid URL for {name}: {e}"),
                };
            }
        };

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                return HttpOutcome::Failed {
                    error: error_chain(&e),
                };
            }
        };
        let status = response.status().as_u16();

        let mut body = Vec::new();
        let mut truncated = false;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    return HttpOutcome::Failed {
                        error: format!("response body: {}", error_chain(&e)),
                    };
                }
            };
            let room = self.max_body_bytes - body.len();
            if chunk.len() > room {
                body.extend_from_slice(&chunk[..room]);
                truncated = true;
                break;
            }
            body.extend_from_slice(&chunk);
        }

        HttpOutcome::Response {
            status,
            body,
            truncated,
        }
    }
}

/// Error text including underlying causes (`reqwest` hides them in `source`).
fn error_chain(err: &reqwest::Error) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}
