//! HTTP adapter for the school's record service.
//!
//! The service is one endpoint. Reads are `GET ?table=<collection>&apiKey=<key>`;
//! writes are a `POST` of `{action, table, data, apiKey}`. Every reply is an
//! envelope `{status, data, message}` where `status == "error"` marks a
//! refusal, whatever the HTTP status.

use crate::error::{ClientError, Result};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use roster_engine::normalize::TEACHER_IDS_FIELD;
use roster_engine::{Collection, Record, RemoteError, RemoteService};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

/// Write actions understood by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Create,
    Update,
    Delete,
}

/// Reply envelope. `data` is only meaningful for reads; write replies may
/// echo anything there.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    message: Option<String>,
}

impl Envelope {
    /// The payload, or the service's refusal.
    fn into_result(self) -> Result<Option<Value>> {
        if self.status.as_deref() == Some("error") {
            return Err(ClientError::Api(
                self.message.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }
        Ok(self.data)
    }
}

/// Rows of a table read. Missing or null data is an empty table; rows that
/// are not objects (blank sheet rows) are dropped.
fn table_rows(collection: Collection, data: Option<Value>) -> Result<Vec<Record>> {
    let rows = match data {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(rows)) => rows,
        Some(other) => {
            return Err(ClientError::Shape(format!(
                "expected an array of rows, got {other}"
            )))
        }
    };

    let total = rows.len();
    let records: Vec<Record> = rows.into_iter().filter_map(Record::from_value).collect();
    if records.len() < total {
        tracing::warn!(
            %collection,
            skipped = total - records.len(),
            "skipping rows that are not objects"
        );
    }
    Ok(records)
}

/// Body of a write request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WriteRequest<'a> {
    action: Action,
    table: Collection,
    data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

/// [`RemoteService`] backed by the record service's web endpoint.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl HttpRemote {
    /// Create an adapter for `url`, failing only if the HTTP client cannot be
    /// built.
    pub fn new(url: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
            api_key,
        })
    }

    /// Endpoint this adapter talks to.
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn get_table(&self, collection: Collection) -> Result<Vec<Record>> {
        let mut query = vec![("table", collection.as_str())];
        if let Some(key) = &self.api_key {
            query.push(("apiKey", key.as_str()));
        }

        let response = self.client.get(&self.url).query(&query).send().await?;
        let data = read_envelope(response).await?.into_result()?;
        table_rows(collection, data)
    }

    async fn post(&self, action: Action, collection: Collection, data: Value) -> Result<()> {
        let request = WriteRequest {
            action,
            table: collection,
            data,
            api_key: self.api_key.as_deref(),
        };

        // Plain text keeps the request "simple" for the script host.
        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "text/plain;charset=utf-8")
            .body(serde_json::to_string(&request)?)
            .send()
            .await?;
        read_envelope(response).await?.into_result().map(|_| ())
    }
}

async fn read_envelope(response: reqwest::Response) -> Result<Envelope> {
    let status = response.status();
    if !status.is_success() {
        return Err(ClientError::Status {
            status: status.as_u16(),
            message: status.canonical_reason().unwrap_or("").to_string(),
        });
    }
    let body = response.text().await?;
    Ok(serde_json::from_str(&body)?)
}

/// Outgoing form of a record: the service stores teacher lists as JSON text.
pub fn prepare_for_save(record: &Record) -> Value {
    let mut fields = record.fields().clone();
    if let Some(ids) = fields.get_mut(TEACHER_IDS_FIELD) {
        if ids.is_array() {
            *ids = Value::String(ids.to_string());
        }
    }
    Value::Object(fields)
}

#[async_trait]
impl RemoteService for HttpRemote {
    async fn fetch(&self, collection: Collection) -> std::result::Result<Vec<Record>, RemoteError> {
        let records = self
            .get_table(collection)
            .await
            .map_err(|e| e.into_remote(collection))?;
        tracing::debug!(%collection, count = records.len(), "fetched");
        Ok(records)
    }

    async fn create(
        &self,
        collection: Collection,
        record: &Record,
    ) -> std::result::Result<(), RemoteError> {
        self.post(Action::Create, collection, prepare_for_save(record))
            .await
            .map_err(|e| e.into_remote(collection))
    }

    async fn update(
        &self,
        collection: Collection,
        record: &Record,
    ) -> std::result::Result<(), RemoteError> {
        self.post(Action::Update, collection, prepare_for_save(record))
            .await
            .map_err(|e| e.into_remote(collection))
    }

    async fn delete(&self, collection: Collection, id: &str) -> std::result::Result<(), RemoteError> {
        self.post(Action::Delete, collection, json!({ "id": id }))
            .await
            .map_err(|e| e.into_remote(collection))
    }
}
