use crate::{BatchPart, BatchReply, Envelope, FieldSpec, QueryWriter, Result, WireRecord};
use futures::future::BoxFuture;
use serde::Deserialize;
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::{self, Debug, Formatter},
    future::Future,
    sync::Arc,
    time::Duration,
};
use url::Url;

/// Key addressing one record. The adapter applies the protocol quoting
/// rules: string keys are single quoted, numeric keys render bare.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordKey {
    Text(String),
    Int(i64),
}

impl From<&str> for RecordKey {
    fn from(value: &str) -> Self {
        RecordKey::Text(value.to_owned())
    }
}
impl From<String> for RecordKey {
    fn from(value: String) -> Self {
        RecordKey::Text(value)
    }
}
impl From<i64> for RecordKey {
    fn from(value: i64) -> Self {
        RecordKey::Int(value)
    }
}
impl From<i32> for RecordKey {
    fn from(value: i32) -> Self {
        RecordKey::Int(value.into())
    }
}

/// One HTTP exchange as the transport sees it. Headers are already complete,
/// the URL carries the rendered query string.
#[derive(Debug, Clone)]
pub struct WireRequest {
    pub method: String,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

#[derive(Debug, Clone)]
pub struct WireResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl WireResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Performs the actual network exchange. The default implementation lives in
/// the protocol adapter crate; tests substitute a stub.
pub trait Transport: Send + Sync {
    fn send(&self, request: WireRequest) -> BoxFuture<'_, Result<WireResponse>>;
}

/// Per call execution knobs accepted by every adapter operation.
///
/// The timeout races the in-flight transport call and aborts only that call;
/// the transport override substitutes the network layer for this call alone.
#[derive(Clone, Default)]
pub struct CallOptions {
    pub timeout: Option<Duration>,
    pub transport: Option<Arc<dyn Transport>>,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }
}

impl Debug for CallOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallOptions")
            .field("timeout", &self.timeout)
            .field("transport", &self.transport.is_some())
            .finish()
    }
}

/// One entry of the service root document.
#[derive(Debug, Clone, Deserialize)]
pub struct TableInfo {
    pub name: String,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Relationship metadata reported by the service: navigable relation names
/// per table. The service is the source of truth, declarations are checked
/// against this at call time.
#[derive(Debug, Clone, Default)]
pub struct SchemaMetadata {
    relations: BTreeMap<String, BTreeSet<String>>,
}

impl SchemaMetadata {
    pub fn insert(&mut self, table: impl Into<String>, relation: impl Into<String>) {
        self.relations
            .entry(table.into())
            .or_default()
            .insert(relation.into());
    }

    pub fn relations_of(&self, table: &str) -> Option<&BTreeSet<String>> {
        self.relations.get(table)
    }

    pub fn has_relation(&self, table: &str, relation: &str) -> bool {
        self.relations_of(table)
            .is_some_and(|set| set.contains(relation))
    }
}

/// The wire contract. One method per protocol capability; the adapter is the
/// only component touching the network, and every operation accepts per call
/// options.
///
/// Error semantics: non-2xx responses surface as typed `Protocol` errors,
/// except that [`Adapter::fetch_record`] answers a missing record with
/// `Ok(None)` and [`Adapter::update_record`] raises a `NotFound` kind, which
/// the composite operations rely on.
pub trait Adapter: Send + Sync {
    type Writer: QueryWriter;

    /// Query writer used to render builder state for this adapter.
    fn writer(&self) -> Self::Writer;

    /// List the tables exposed by the service root document.
    fn list_tables(
        &self,
        options: &CallOptions,
    ) -> impl Future<Output = Result<Vec<TableInfo>>> + Send;

    /// Fetch relationship metadata.
    fn metadata(
        &self,
        options: &CallOptions,
    ) -> impl Future<Output = Result<SchemaMetadata>> + Send;

    /// Fetch records with a rendered query string.
    fn fetch_records(
        &self,
        table: &str,
        query: &str,
        options: &CallOptions,
    ) -> impl Future<Output = Result<Envelope>> + Send;

    /// Fetch one record by key; `Ok(None)` when it does not exist.
    fn fetch_record(
        &self,
        table: &str,
        key: &RecordKey,
        query: &str,
        options: &CallOptions,
    ) -> impl Future<Output = Result<Option<WireRecord>>> + Send;

    /// Count records, optionally restricted by a rendered filter.
    fn count_records(
        &self,
        table: &str,
        filter: Option<&str>,
        options: &CallOptions,
    ) -> impl Future<Output = Result<u64>> + Send;

    /// Fetch a single field value of one record.
    fn fetch_field_value(
        &self,
        table: &str,
        key: &RecordKey,
        field: &str,
        options: &CallOptions,
    ) -> impl Future<Output = Result<serde_json::Value>> + Send;

    fn create_record(
        &self,
        table: &str,
        body: serde_json::Map<String, serde_json::Value>,
        options: &CallOptions,
    ) -> impl Future<Output = Result<WireRecord>> + Send;

    /// Patch one record by key. `Ok(None)` when the service answers with an
    /// empty body; a missing record raises a `NotFound` error.
    fn update_record(
        &self,
        table: &str,
        key: &RecordKey,
        body: serde_json::Map<String, serde_json::Value>,
        options: &CallOptions,
    ) -> impl Future<Output = Result<Option<WireRecord>>> + Send;

    fn delete_record(
        &self,
        table: &str,
        key: &RecordKey,
        options: &CallOptions,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Replace the references of a navigable relation with the given entity
    /// reference URLs.
    fn update_references(
        &self,
        table: &str,
        key: &RecordKey,
        relation: &str,
        targets: &[String],
        options: &CallOptions,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Fetch the records related to one record through a navigable relation.
    fn navigate(
        &self,
        table: &str,
        key: &RecordKey,
        relation: &str,
        query: &str,
        options: &CallOptions,
    ) -> impl Future<Output = Result<Envelope>> + Send;

    /// Cross join multiple tables.
    fn cross_join(
        &self,
        tables: &[&str],
        query: &str,
        options: &CallOptions,
    ) -> impl Future<Output = Result<Envelope>> + Send;

    /// Submit independent sub-requests as one multi-part request and return
    /// the ordered decoded sub-responses.
    fn execute_batch(
        &self,
        parts: &[BatchPart],
        options: &CallOptions,
    ) -> impl Future<Output = Result<Vec<BatchReply>>> + Send;

    fn create_table(
        &self,
        table: &str,
        fields: &[FieldSpec],
        options: &CallOptions,
    ) -> impl Future<Output = Result<()>> + Send;

    fn add_fields(
        &self,
        table: &str,
        fields: &[FieldSpec],
        options: &CallOptions,
    ) -> impl Future<Output = Result<()>> + Send;

    fn drop_table(
        &self,
        table: &str,
        options: &CallOptions,
    ) -> impl Future<Output = Result<()>> + Send;

    fn drop_field(
        &self,
        table: &str,
        field: &str,
        options: &CallOptions,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Run a named remote procedure with JSON parameters.
    fn call_procedure(
        &self,
        name: &str,
        parameters: serde_json::Value,
        options: &CallOptions,
    ) -> impl Future<Output = Result<serde_json::Value>> + Send;
}
