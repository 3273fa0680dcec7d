//! Remote HTTP backend
//!
//! Speaks to a query service: `POST {base}/query` returns a JSON array of
//! column-keyed row objects, `POST {base}/execute` returns no body. A
//! non-2xx response's body is the error message. No timeouts and no
//! retries; a hung request hangs the caller.

use serde::Serialize;

use super::{DataAccess, Rows, Value};
use crate::error::{Error, Result};

#[derive(Serialize)]
struct WireStatement<'a> {
    sql: &'a str,
    params: &'a [Value],
}

pub struct RemoteDb {
    base_url: String,
    client: reqwest::Client,
}

impl RemoteDb {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    async fn post(&self, endpoint: &str, sql: &str, params: &[Value]) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(format!("{}/{}", self.base_url, endpoint))
            .json(&WireStatement { sql, params })
            .send()
            .await?;

        if response.status().is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(Error::backend(body))
        }
    }
}

impl DataAccess for RemoteDb {
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<Rows> {
        let response = self.post("query", sql, params).await?;
        let objects: Vec<serde_json::Map<String, serde_json::Value>> = response.json().await?;
        Ok(Rows::from_json_objects(objects))
    }

    async fn run(&self, sql: &str, params: &[Value]) -> Result<()> {
        self.post("execute", sql, params).await?;
        Ok(())
    }
}
