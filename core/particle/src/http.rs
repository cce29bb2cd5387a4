//! HTTP particle store client.
//!
//! REST surface:
//! - `PUT|GET|DELETE {uri}/api/data/{id}` and `{uri}/api/secrets/{id}`
//! - `PUT|GET|DELETE {uri}/api/manifest/{id}`
//! - `GET {uri}/api/classification`, `GET {uri}/api/check`

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{header, Client, Method, RequestBuilder, Response};
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

use ionfs_common::{Error, Result, Usage, STATUS_OK};

use crate::client::{ParticleResponse, ParticleStore};

/// One classification policy as returned by the service.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Classification {
    #[serde(alias = "id")]
    id: i32,
    #[serde(alias = "name")]
    name: String,
}

/// HTTP particle store.
///
/// The HTTP client is built on first use and shared afterwards.
pub struct HttpParticleStore {
    base: Url,
    token: Option<String>,
    timeout: Duration,
    client: OnceCell<Client>,
}

impl HttpParticleStore {
    /// Create a client for the service at `uri`.
    ///
    /// # Errors
    /// - `InvalidInput` if `uri` is not an absolute URL
    pub fn new(uri: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
        let base = Url::parse(uri.trim_end_matches('/'))
            .map_err(|e| Error::InvalidInput(format!("Invalid particle service URI '{}': {}", uri, e)))?;
        Ok(Self {
            base,
            token,
            timeout,
            client: OnceCell::new(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        let url = format!("{}/api/{}", self.base.as_str().trim_end_matches('/'), path);
        Url::parse(&url).map_err(|e| Error::InvalidInput(format!("Invalid URL '{}': {}", url, e)))
    }

    fn particle_path(usage: Usage, id: &Uuid) -> String {
        match usage {
            Usage::Data => format!("data/{}", id),
            Usage::Secrets => format!("secrets/{}", id),
        }
    }

    async fn client(&self) -> Result<&Client> {
        self.client
            .get_or_try_init(|| async {
                info!(uri = %self.base, "Creating particle service client");
                Client::builder()
                    .user_agent("IonFS/0.1")
                    .timeout(self.timeout)
                    .build()
                    .map_err(|e| Error::Backend(format!("Failed to create HTTP client: {}", e)))
            })
            .await
    }

    async fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = self.endpoint(path)?;
        let mut builder = self.client().await?.request(method, url);
        if let Some(token) = &self.token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        Ok(builder)
    }

    async fn send(builder: RequestBuilder) -> Result<Response> {
        builder.send().await.map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                Error::BackendUnavailable(format!("Particle service unreachable: {}", e))
            } else {
                Error::Backend(format!("Particle request failed: {}", e))
            }
        })
    }

    async fn read(response: Response) -> Result<ParticleResponse> {
        let status = response.status().as_u16();
        if status != STATUS_OK {
            return Ok(ParticleResponse::status(status));
        }
        let data = response
            .bytes()
            .await
            .map_err(|e| Error::Backend(format!("Failed to read particle: {}", e)))?;
        Ok(ParticleResponse::ok(data))
    }

    fn with_classification(builder: RequestBuilder, classification: Option<&str>) -> RequestBuilder {
        match classification {
            Some(c) => builder.query(&[("classification", c)]),
            None => builder,
        }
    }
}

#[async_trait]
impl ParticleStore for HttpParticleStore {
    fn name(&self) -> &str {
        "http"
    }

    async fn put(
        &self,
        usage: Usage,
        id: Uuid,
        data: Bytes,
        classification: Option<&str>,
    ) -> Result<u16> {
        let builder = self
            .request(Method::PUT, &Self::particle_path(usage, &id))
            .await?
            .body(data);
        let response = Self::send(Self::with_classification(builder, classification)).await?;
        debug!(id = %id, status = response.status().as_u16(), "PUT particle");
        Ok(response.status().as_u16())
    }

    async fn get(&self, usage: Usage, id: Uuid) -> Result<ParticleResponse> {
        let builder = self.request(Method::GET, &Self::particle_path(usage, &id)).await?;
        Self::read(Self::send(builder).await?).await
    }

    async fn delete(&self, usage: Usage, id: Uuid, timeout: Duration) -> Result<u16> {
        let builder = self
            .request(Method::DELETE, &Self::particle_path(usage, &id))
            .await?
            .timeout(timeout);
        Ok(Self::send(builder).await?.status().as_u16())
    }

    async fn put_manifest(
        &self,
        id: Uuid,
        data: Bytes,
        chunk_size: usize,
        classification: Option<&str>,
    ) -> Result<u16> {
        let builder = self
            .request(Method::PUT, &format!("manifest/{}", id))
            .await?
            .query(&[("chunkSize", chunk_size.to_string())])
            .body(data);
        let response = Self::send(Self::with_classification(builder, classification)).await?;
        Ok(response.status().as_u16())
    }

    async fn get_manifest(&self, id: Uuid) -> Result<ParticleResponse> {
        let builder = self.request(Method::GET, &format!("manifest/{}", id)).await?;
        Self::read(Self::send(builder).await?).await
    }

    async fn delete_manifest(&self, id: Uuid, timeout: Duration) -> Result<u16> {
        let builder = self
            .request(Method::DELETE, &format!("manifest/{}", id))
            .await?
            .timeout(timeout);
        Ok(Self::send(builder).await?.status().as_u16())
    }

    async fn classifications(&self) -> Result<BTreeMap<i32, String>> {
        let builder = self.request(Method::GET, "classification").await?;
        let response = Self::send(builder).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Backend(format!(
                "Classification request failed: {}",
                status
            )));
        }

        let list: Vec<Classification> = response
            .json()
            .await
            .map_err(|e| Error::Serialization(format!("Invalid classification list: {}", e)))?;
        Ok(list.into_iter().map(|c| (c.id, c.name)).collect())
    }

    async fn check(&self) -> Result<bool> {
        let builder = self.request(Method::GET, "check").await?;
        Ok(Self::send(builder).await?.status().is_success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned response on a local port.
    async fn one_shot_server(response: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let _ = socket.read(&mut buf).await;
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_endpoint_building() {
        let store =
            HttpParticleStore::new("https://api.example.com/", None, Duration::from_secs(5)).unwrap();
        let id = Uuid::nil();
        let url = store
            .endpoint(&HttpParticleStore::particle_path(Usage::Secrets, &id))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.com/api/secrets/00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(
            store.endpoint("classification").unwrap().as_str(),
            "https://api.example.com/api/classification"
        );
    }

    #[test]
    fn test_invalid_uri() {
        assert!(matches!(
            HttpParticleStore::new("not a url", None, Duration::from_secs(1)),
            Err(Error::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_get_particle() {
        let uri = one_shot_server(
            "HTTP/1.1 200 OK\r\nContent-Length: 5\r\nConnection: close\r\n\r\nhello",
        )
        .await;
        let store = HttpParticleStore::new(&uri, Some("t".into()), Duration::from_secs(5)).unwrap();

        let got = store.get(Usage::Data, Uuid::new_v4()).await.unwrap();
        assert_eq!(got.status, STATUS_OK);
        assert_eq!(got.data.unwrap(), Bytes::from_static(b"hello"));
    }

    #[tokio::test]
    async fn test_status_passed_through() {
        let uri = one_shot_server(
            "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .await;
        let store = HttpParticleStore::new(&uri, None, Duration::from_secs(5)).unwrap();

        let got = store.get(Usage::Data, Uuid::new_v4()).await.unwrap();
        assert_eq!(got.status, 404);
        assert!(got.data.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_service() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let store =
            HttpParticleStore::new(&format!("http://{}", addr), None, Duration::from_secs(5))
                .unwrap();
        let result = store.get(Usage::Data, Uuid::new_v4()).await;
        assert!(matches!(result, Err(Error::BackendUnavailable(_))));
    }
}
