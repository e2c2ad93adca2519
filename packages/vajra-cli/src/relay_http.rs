//! [`Relay`] over the VajraShare HTTP API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use vajra_core::{
    crypto::ExportedPublicKey, Error, FileMetadata, FileSubmission, PasswordWrapper, Registration,
    Relay, Result,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyResponse {
    public_key: ExportedPublicKey,
}

#[derive(Deserialize)]
struct UploadResponse {
    id: String,
}

/// HTTP client for a relay at a base URL
#[derive(Debug, Clone)]
pub struct HttpRelay {
    client: reqwest::Client,
    base: Url,
}

impl HttpRelay {
    /// Client for the relay at `base_url`
    pub fn new(base_url: &str) -> Result<Self> {
        let base = Url::parse(base_url)
            .map_err(|e| Error::ProtocolError(format!("invalid relay URL {}: {}", base_url, e)))?;
        if base.cannot_be_a_base() {
            return Err(Error::ProtocolError(format!(
                "invalid relay URL {}",
                base_url
            )));
        }
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Internal(e.to_string()))?;
        Ok(Self { client, base })
    }

    /// Relay base URL
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| Error::ProtocolError(format!("invalid relay URL {}", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get(&self, segments: &[&str]) -> Result<reqwest::Response> {
        let url = self.endpoint(segments)?;
        tracing::debug!(url = %url, "GET");
        self.client.get(url).send().await.map_err(transport)
    }

    async fn post<T: serde::Serialize + ?Sized>(
        &self,
        segments: &[&str],
        body: &T,
    ) -> Result<reqwest::Response> {
        let url = self.endpoint(segments)?;
        tracing::debug!(url = %url, "POST");
        self.client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(transport)
    }
}

fn transport(e: reqwest::Error) -> Error {
    Error::RelayUnavailable(e.to_string())
}

/// Error for a status the endpoint does not define
fn unexpected(status: StatusCode, context: &str) -> Error {
    if status.is_server_error() {
        Error::RelayUnavailable(format!("{}: relay answered {}", context, status))
    } else {
        Error::ProtocolError(format!("{}: relay answered {}", context, status))
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response, context: &str) -> Result<T> {
    response.json().await.map_err(|e| {
        if e.is_decode() {
            Error::ProtocolError(format!("{}: {}", context, e))
        } else {
            transport(e)
        }
    })
}

#[async_trait]
impl Relay for HttpRelay {
    async fn register(&self, registration: &Registration) -> Result<()> {
        let response = self.post(&["register"], registration).await?;
        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::CONFLICT => Err(Error::HandleTaken(registration.handle.clone())),
            status => Err(unexpected(status, "register")),
        }
    }

    async fn lookup_public_key(&self, handle: &str) -> Result<Option<ExportedPublicKey>> {
        let response = self.get(&["key", handle]).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let body: KeyResponse = read_json(response, "key lookup").await?;
                Ok(Some(body.public_key))
            }
            status => Err(unexpected(status, "key lookup")),
        }
    }

    async fn fetch_wrapper(&self, handle: &str) -> Result<Option<PasswordWrapper>> {
        let response = self.get(&["login", handle]).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => read_json(response, "key backup").await.map(Some),
            status => Err(unexpected(status, "key backup")),
        }
    }

    async fn submit_file(&self, submission: &FileSubmission) -> Result<String> {
        let response = self.post(&["upload"], submission).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(unexpected(status, "upload"));
        }
        let body: UploadResponse = read_json(response, "upload").await?;
        Ok(body.id)
    }

    async fn list_inbox(&self, handle: &str) -> Result<Vec<FileMetadata>> {
        let response = self.get(&["inbox", handle]).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(unexpected(status, "inbox"));
        }
        read_json(response, "inbox").await
    }

    async fn fetch_file(&self, id: &str) -> Result<FileSubmission> {
        let response = self.get(&["file", id]).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(Error::NotFound(format!("file {}", id))),
            status if status.is_success() => {
                let record: serde_json::Value = read_json(response, "file").await?;
                FileSubmission::from_record(record).map_err(|e| match e {
                    Error::DecodeError(msg) => Error::ProtocolError(format!("file: {}", msg)),
                    other => other,
                })
            }
            status => Err(unexpected(status, "file")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints() {
        let relay = HttpRelay::new("http://localhost:5000").unwrap();
        assert_eq!(
            relay.endpoint(&["key", "alice"]).unwrap().as_str(),
            "http://localhost:5000/key/alice"
        );

        let nested = HttpRelay::new("https://relay.test/vajra/").unwrap();
        assert_eq!(
            nested.endpoint(&["inbox", "bob"]).unwrap().as_str(),
            "https://relay.test/vajra/inbox/bob"
        );
    }

    #[test]
    fn test_handles_are_escaped() {
        let relay = HttpRelay::new("http://localhost:5000").unwrap();
        let url = relay.endpoint(&["key", "a?b#c"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/key/a%3Fb%23c");
        assert!(url.query().is_none());
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            HttpRelay::new("not a url"),
            Err(Error::ProtocolError(_))
        ));
        assert!(matches!(
            HttpRelay::new("mailto:someone@example.com"),
            Err(Error::ProtocolError(_))
        ));
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            unexpected(StatusCode::BAD_REQUEST, "register"),
            Error::ProtocolError(_)
        ));
        assert!(matches!(
            unexpected(StatusCode::BAD_GATEWAY, "upload"),
            Error::RelayUnavailable(_)
        ));
    }

    #[tokio::test]
    async fn test_unreachable_relay() {
        // Port 9 (discard) is closed on test machines.
        let relay = HttpRelay::new("http://127.0.0.1:9").unwrap();
        assert!(matches!(
            relay.lookup_public_key("alice").await,
            Err(Error::RelayUnavailable(_))
        ));
    }
}
