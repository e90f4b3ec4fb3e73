use std::{future::Future, time::Duration};

use reqwest::{Client, StatusCode};
use tracing::debug;

use super::{dataset::Dataset, error::WebError};
use crate::iov::IovTimeStamp;

/// Request for one folder's data as of `time`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataRequest {
    pub folder: String,
    pub tag: Option<String>,
    pub time: IovTimeStamp,
}

/// An unsuccessful attempt. `status` is `None` when no HTTP response came back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub status: Option<u16>,
    pub message: String,
}

/// Anything that can hand back a folder's tuple table for a point in time
pub trait DataSource {
    fn fetch(
        &self,
        request: &DataRequest,
    ) -> impl Future<Output = Result<Dataset, FetchFailure>> + Send;
}

impl DataRequest {
    fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![("f", self.folder.clone()), ("t", self.time.db_stamp())];
        if let Some(tag) = self.tag.as_ref().filter(|t| !t.is_empty()) {
            query.push(("tag", tag.clone()));
        }
        query
    }

    /// Full request url, ex. `{base}/data?f=pedestals&t=1620000000.000000&tag=v2`
    pub fn to_url(&self, base: &str) -> String {
        let params: Vec<String> = self.query().into_iter().map(|(k, v)| format!("{k}={v}")).collect();
        format!("{}/data?{}", base.trim_end_matches('/'), params.join("&"))
    }
}

/// Conditions database web interface
#[derive(Debug, Clone)]
pub struct HttpSource {
    url: String,
    client: Client,
}

impl HttpSource {
    pub fn new(url: &str) -> Result<Self, WebError> {
        Self::build(url, Client::builder())
    }

    /// Bounds each request, not the whole retry loop
    pub fn with_timeout(url: &str, timeout: Duration) -> Result<Self, WebError> {
        Self::build(url, Client::builder().timeout(timeout))
    }

    fn build(url: &str, builder: reqwest::ClientBuilder) -> Result<Self, WebError> {
        let client = builder.build().map_err(|e| WebError::Client(e.to_string()))?;
        Ok(Self {
            url: url.strip_suffix('/').unwrap_or(url).to_string(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl DataSource for HttpSource {
    async fn fetch(&self, request: &DataRequest) -> Result<Dataset, FetchFailure> {
        debug!("GET {}", request.to_url(&self.url));

        let resp = self
            .client
            .get(format!("{}/data", self.url))
            .query(&request.query())
            .send()
            .await
            .map_err(|e| FetchFailure {
                status: e.status().map(|s| s.as_u16()),
                message: e.to_string(),
            })?;

        let status = resp.status();
        if status != StatusCode::OK {
            return Err(FetchFailure {
                status: Some(status.as_u16()),
                message: status.canonical_reason().unwrap_or("unknown").to_string(),
            });
        }

        let body = resp.text().await.map_err(|e| FetchFailure {
            status: Some(status.as_u16()),
            message: format!("reading body: {e}"),
        })?;

        Dataset::from_csv(&body).map_err(|e| FetchFailure {
            status: Some(status.as_u16()),
            message: format!("parsing body: {e}"),
        })
    }
}
