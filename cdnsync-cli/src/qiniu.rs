//! Qiniu-compatible HTTP implementation of [`RemoteService`].

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{header, Body, Client};
use serde::Serialize;
use tokio_util::io::ReaderStream;

use cdnsync_core::{RemoteKey, Zone};
use cdnsync_sync::auth::encoded_entry;
use cdnsync_sync::{
    BatchDeleteResponse, BatchOpResult, Credentials, RefreshResponse, RemoteError, RemoteService,
};

const BATCH_PATH: &str = "/batch";
const REFRESH_PATH: &str = "/v2/tune/refresh";
const FUSION_HOST: &str = "fusion.qiniuapi.com";

/// Base URLs for the three services the engine talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub upload: String,
    pub rs: String,
    pub fusion: String,
}

impl Endpoints {
    pub fn for_zone(zone: Zone) -> Self {
        Self {
            upload: format!("https://{}", zone.upload_host()),
            rs: format!("https://{}", zone.rs_host()),
            fusion: format!("https://{FUSION_HOST}"),
        }
    }
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    urls: &'a [String],
}

/// HTTP client for form upload, batch delete and CDN refresh.
pub struct QiniuClient {
    http: Client,
    credentials: Credentials,
    endpoints: Endpoints,
}

impl QiniuClient {
    pub fn new(
        credentials: Credentials,
        endpoints: Endpoints,
        timeout: Duration,
    ) -> Result<Self, RemoteError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(transport)?;
        Ok(Self {
            http,
            credentials,
            endpoints,
        })
    }
}

fn transport(err: reqwest::Error) -> RemoteError {
    if err.is_timeout() {
        RemoteError::Transport(format!("request timed out: {err}"))
    } else {
        RemoteError::Transport(err.to_string())
    }
}

/// Form body of a batch delete: one `op=/delete/<entry>` per key.
pub fn batch_delete_body(bucket: &str, keys: &[RemoteKey]) -> String {
    keys.iter()
        .map(|key| format!("op=/delete/{}", encoded_entry(bucket, key.as_str())))
        .collect::<Vec<_>>()
        .join("&")
}

#[async_trait]
impl RemoteService for QiniuClient {
    async fn put_object(
        &self,
        token: &str,
        key: &RemoteKey,
        local_path: &Path,
    ) -> Result<u16, RemoteError> {
        let io = |source| RemoteError::Io {
            path: local_path.to_path_buf(),
            source,
        };
        let file = tokio::fs::File::open(local_path).await.map_err(io)?;
        let len = file.metadata().await.map_err(io)?.len();

        let part = Part::stream_with_length(Body::wrap_stream(ReaderStream::new(file)), len)
            .file_name(key.to_string())
            .mime_str("application/octet-stream")
            .map_err(transport)?;
        let form = Form::new()
            .text("token", token.to_owned())
            .text("key", key.to_string())
            .part("file", part);

        let response = self
            .http
            .post(&self.endpoints.upload)
            .multipart(form)
            .send()
            .await
            .map_err(transport)?;
        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(key = %key, status, body = %body, "upload rejected");
        }
        Ok(status)
    }

    async fn batch_delete(
        &self,
        bucket: &str,
        keys: &[RemoteKey],
    ) -> Result<BatchDeleteResponse, RemoteError> {
        let body = batch_delete_body(bucket, keys);
        let authorization = self
            .credentials
            .management_token(BATCH_PATH, Some(body.as_bytes()));

        let response = self
            .http
            .post(format!("{}{BATCH_PATH}", self.endpoints.rs))
            .header(header::AUTHORIZATION, authorization)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .map_err(transport)?;
        let status = response.status().as_u16();
        let results = response
            .json::<Vec<BatchOpResult>>()
            .await
            .unwrap_or_default();
        Ok(BatchDeleteResponse { status, results })
    }

    async fn refresh_urls(&self, urls: &[String]) -> Result<RefreshResponse, RemoteError> {
        let authorization = self.credentials.management_token(REFRESH_PATH, None);

        let response = self
            .http
            .post(format!("{}{REFRESH_PATH}", self.endpoints.fusion))
            .header(header::AUTHORIZATION, authorization)
            .json(&RefreshRequest { urls })
            .send()
            .await
            .map_err(transport)?;
        let status = response.status().as_u16();
        let mut parsed = response
            .json::<RefreshResponse>()
            .await
            .unwrap_or_default();
        parsed.status = status;
        Ok(parsed)
    }
}
