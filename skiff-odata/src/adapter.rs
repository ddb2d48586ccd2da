use crate::{
    AuthProvider, HttpTransport, ODataWriter,
    batch::{parse_batch, render_batch},
    response::{Payload, ServiceResponse, decode_response, ensure_success, protocol_error},
};
use serde_json::{Map, Value as Json, json};
use skiff_core::{
    Adapter, BatchPart, BatchReply, CallOptions, Envelope, Error, FieldSpec, RecordKey, Result,
    SchemaMetadata, TableInfo, Transport, WireRecord, WireRequest, printable_query,
};
use std::{sync::Arc, time::Duration};
use url::Url;
use uuid::Uuid;

/// Concrete OData v4 adapter: builds URLs, headers and bodies, performs the
/// network call through a [`Transport`], and decodes responses and errors
/// into typed results. The connection level configuration is immutable after
/// [`ODataAdapterBuilder::build`].
pub struct ODataAdapter {
    endpoint: Url,
    auth: Option<Arc<dyn AuthProvider>>,
    transport: Arc<dyn Transport>,
    numeric_compat: bool,
    system_collection: String,
    timeout: Option<Duration>,
}

pub struct ODataAdapterBuilder {
    server: String,
    database: String,
    root: String,
    version: String,
    auth: Option<Arc<dyn AuthProvider>>,
    transport: Option<Arc<dyn Transport>>,
    numeric_compat: bool,
    system_collection: String,
    timeout: Option<Duration>,
}

impl ODataAdapter {
    pub fn builder(server: impl Into<String>, database: impl Into<String>) -> ODataAdapterBuilder {
        ODataAdapterBuilder {
            server: server.into(),
            database: database.into(),
            root: "odata".to_owned(),
            version: "4".to_owned(),
            auth: None,
            transport: None,
            numeric_compat: false,
            system_collection: "SystemTables".to_owned(),
            timeout: None,
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn accept_header(&self) -> String {
        if self.numeric_compat {
            "application/json;IEEE754Compatible=true".to_owned()
        } else {
            "application/json".to_owned()
        }
    }

    /// Key path segment with the protocol quoting rules: numeric keys render
    /// bare, string keys single quoted with embedded quotes doubled.
    fn key_segment(key: &RecordKey) -> String {
        match key {
            RecordKey::Int(v) => format!("({v})"),
            RecordKey::Text(v) => {
                format!("('{}')", urlencoding::encode(&v.replace('\'', "''")))
            }
        }
    }

    fn url(&self, path: &str, query: Option<&str>) -> Result<Url> {
        let mut url = self
            .endpoint
            .join(path)
            .map_err(|e| Error::validation(format!("cannot address `{path}`: {e}")))?;
        if let Some(query) = query
            && !query.is_empty()
        {
            url.set_query(Some(query));
        }
        Ok(url)
    }

    async fn send(
        &self,
        method: &str,
        path: &str,
        query: Option<&str>,
        body: Option<Vec<u8>>,
        content_type: Option<&str>,
        options: &CallOptions,
    ) -> Result<ServiceResponse> {
        let url = self.url(path, query)?;
        let mut headers = vec![
            ("OData-Version".to_owned(), "4.0".to_owned()),
            ("OData-MaxVersion".to_owned(), "4.0".to_owned()),
            ("Accept".to_owned(), self.accept_header()),
        ];
        if let Some(auth) = &self.auth {
            headers.push(("Authorization".to_owned(), auth.authorization().await?));
        }
        if let Some(content_type) = content_type {
            headers.push(("Content-Type".to_owned(), content_type.to_owned()));
        }
        log::debug!("{} {}", method, printable_query!(url.as_str()));
        let transport = options.transport.as_ref().unwrap_or(&self.transport);
        let request = WireRequest {
            method: method.to_owned(),
            url,
            headers,
            body,
        };
        // The timeout races the in-flight transport call and aborts only
        // that call; committed writes of a composite stay committed.
        let response = match options.timeout.or(self.timeout) {
            Some(limit) => tokio::time::timeout(limit, transport.send(request))
                .await
                .map_err(|_| {
                    Error::timeout(format!(
                        "request did not complete within {} ms",
                        limit.as_millis()
                    ))
                })??,
            None => transport.send(request).await?,
        };
        Ok(decode_response(response))
    }

    async fn send_json(
        &self,
        method: &str,
        path: &str,
        query: Option<&str>,
        body: Option<&Json>,
        options: &CallOptions,
    ) -> Result<ServiceResponse> {
        let body = body.map(|json| json.to_string().into_bytes());
        let content_type = body.as_ref().map(|_| "application/json");
        self.send(method, path, query, body, content_type, options)
            .await
    }

    fn base_path(&self) -> &str {
        self.endpoint.path().trim_end_matches('/')
    }
}

impl ODataAdapterBuilder {
    /// Authentication provider; without one no `Authorization` header is set.
    pub fn auth(mut self, auth: impl AuthProvider + 'static) -> Self {
        self.auth = Some(Arc::new(auth));
        self
    }

    /// Default transport for every call, unless overridden per call.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Protocol root path segment, `odata` by default.
    pub fn root(mut self, root: impl Into<String>) -> Self {
        self.root = root.into();
        self
    }

    /// Protocol version path segment, `4` by default.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Ask the service for IEEE754 compatible number rendering, wide numbers
    /// arrive as strings.
    pub fn numeric_compat(mut self, enabled: bool) -> Self {
        self.numeric_compat = enabled;
        self
    }

    /// Name of the reserved collection addressing schema mutation.
    pub fn system_collection(mut self, name: impl Into<String>) -> Self {
        self.system_collection = name.into();
        self
    }

    /// Connection level default timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<ODataAdapter> {
        let base = format!(
            "{}/{}/v{}/{}/",
            self.server.trim_end_matches('/'),
            self.root,
            self.version,
            self.database
        );
        let endpoint = Url::parse(&base)
            .map_err(|e| Error::validation(format!("invalid endpoint `{base}`: {e}")))?;
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new()?),
        };
        Ok(ODataAdapter {
            endpoint,
            auth: self.auth,
            transport,
            numeric_compat: self.numeric_compat,
            system_collection: self.system_collection,
            timeout: self.timeout,
        })
    }
}

fn envelope_from(payload: Payload) -> Result<Envelope> {
    match payload {
        Payload::Empty => Ok(Envelope::default()),
        Payload::Json(json) => Envelope::from_json(json),
        Payload::Text(text) => Err(Error::protocol(format!(
            "expected a JSON response, got: {text}"
        ))),
    }
}

fn metadata_from(json: &Json) -> SchemaMetadata {
    let mut metadata = SchemaMetadata::default();
    let Some(root) = json.as_object() else {
        return metadata;
    };
    for namespace in root.values() {
        let Some(namespace) = namespace.as_object() else {
            continue;
        };
        for (type_name, declaration) in namespace {
            let Some(declaration) = declaration.as_object() else {
                continue;
            };
            if declaration.get("$Kind").and_then(Json::as_str) != Some("EntityType") {
                continue;
            }
            for (member, property) in declaration {
                if property.get("$Kind").and_then(Json::as_str) == Some("NavigationProperty") {
                    metadata.insert(type_name.clone(), member.clone());
                }
            }
        }
    }
    metadata
}

impl Adapter for ODataAdapter {
    type Writer = ODataWriter;

    fn writer(&self) -> Self::Writer {
        ODataWriter
    }

    async fn list_tables(&self, options: &CallOptions) -> Result<Vec<TableInfo>> {
        let payload = ensure_success(self.send("GET", "", None, None, None, options).await?)?;
        match payload {
            Payload::Json(json) => match json.get("value") {
                Some(value) => serde_json::from_value(value.clone()).map_err(|e| {
                    Error::protocol(format!("malformed service root document: {e}"))
                }),
                None => Err(Error::protocol(
                    "service root document carries no table list",
                )),
            },
            _ => Err(Error::protocol("expected a JSON service root document")),
        }
    }

    async fn metadata(&self, options: &CallOptions) -> Result<SchemaMetadata> {
        let payload = ensure_success(
            self.send("GET", "$metadata", Some("$format=json"), None, None, options)
                .await?,
        )?;
        match payload {
            Payload::Json(json) => Ok(metadata_from(&json)),
            _ => Err(Error::protocol("expected CSDL JSON metadata")),
        }
    }

    async fn fetch_records(
        &self,
        table: &str,
        query: &str,
        options: &CallOptions,
    ) -> Result<Envelope> {
        let query = (!query.is_empty()).then_some(query);
        let response = self.send("GET", table, query, None, None, options).await?;
        envelope_from(ensure_success(response)?)
    }

    async fn fetch_record(
        &self,
        table: &str,
        key: &RecordKey,
        query: &str,
        options: &CallOptions,
    ) -> Result<Option<WireRecord>> {
        let path = format!("{table}{}", Self::key_segment(key));
        let query = (!query.is_empty()).then_some(query);
        let response = self.send("GET", &path, query, None, None, options).await?;
        if response.status == 404 {
            return Ok(None);
        }
        match ensure_success(response)? {
            Payload::Json(json) => WireRecord::from_json(json).map(Some),
            Payload::Empty => Ok(None),
            Payload::Text(text) => Err(Error::protocol(format!(
                "expected a JSON record, got: {text}"
            ))),
        }
    }

    async fn count_records(
        &self,
        table: &str,
        filter: Option<&str>,
        options: &CallOptions,
    ) -> Result<u64> {
        let path = format!("{table}/$count");
        let query = filter.map(|f| format!("$filter={f}"));
        let payload = ensure_success(
            self.send("GET", &path, query.as_deref(), None, None, options)
                .await?,
        )?;
        match payload {
            Payload::Json(Json::Number(n)) => n
                .as_u64()
                .ok_or_else(|| Error::protocol("count is not an unsigned integer")),
            Payload::Text(text) => text
                .trim()
                .parse()
                .map_err(|_| Error::protocol(format!("malformed count `{text}`"))),
            _ => Err(Error::protocol("service answered the count with no body")),
        }
    }

    async fn fetch_field_value(
        &self,
        table: &str,
        key: &RecordKey,
        field: &str,
        options: &CallOptions,
    ) -> Result<Json> {
        let path = format!("{table}{}/{field}", Self::key_segment(key));
        let payload =
            ensure_success(self.send("GET", &path, None, None, None, options).await?)?;
        Ok(match payload {
            Payload::Empty => Json::Null,
            Payload::Json(Json::Object(mut map)) => match map.remove("value") {
                Some(value) => value,
                None => Json::Object(map),
            },
            Payload::Json(json) => json,
            Payload::Text(text) => Json::String(text),
        })
    }

    async fn create_record(
        &self,
        table: &str,
        body: Map<String, Json>,
        options: &CallOptions,
    ) -> Result<WireRecord> {
        let payload = ensure_success(
            self.send_json("POST", table, None, Some(&Json::Object(body)), options)
                .await?,
        )?;
        match payload {
            Payload::Json(json) => WireRecord::from_json(json),
            _ => Err(Error::protocol(
                "service returned no record for the create",
            )),
        }
    }

    async fn update_record(
        &self,
        table: &str,
        key: &RecordKey,
        body: Map<String, Json>,
        options: &CallOptions,
    ) -> Result<Option<WireRecord>> {
        let path = format!("{table}{}", Self::key_segment(key));
        let response = self
            .send_json("PATCH", &path, None, Some(&Json::Object(body)), options)
            .await?;
        if response.status == 404 {
            return Err(Error::not_found(format!(
                "table `{table}` has no record {key:?}"
            ))
            .with_code("404"));
        }
        match ensure_success(response)? {
            Payload::Json(json) => WireRecord::from_json(json).map(Some),
            Payload::Empty => Ok(None),
            Payload::Text(text) => Err(Error::protocol(format!(
                "expected a JSON record, got: {text}"
            ))),
        }
    }

    async fn delete_record(
        &self,
        table: &str,
        key: &RecordKey,
        options: &CallOptions,
    ) -> Result<()> {
        let path = format!("{table}{}", Self::key_segment(key));
        ensure_success(self.send("DELETE", &path, None, None, None, options).await?)?;
        Ok(())
    }

    async fn update_references(
        &self,
        table: &str,
        key: &RecordKey,
        relation: &str,
        targets: &[String],
        options: &CallOptions,
    ) -> Result<()> {
        let path = format!("{table}{}/{relation}/$ref", Self::key_segment(key));
        for target in targets {
            let body = json!({ "@odata.id": target });
            ensure_success(
                self.send_json("POST", &path, None, Some(&body), options)
                    .await?,
            )?;
        }
        Ok(())
    }

    async fn navigate(
        &self,
        table: &str,
        key: &RecordKey,
        relation: &str,
        query: &str,
        options: &CallOptions,
    ) -> Result<Envelope> {
        let path = format!("{table}{}/{relation}", Self::key_segment(key));
        let query = (!query.is_empty()).then_some(query);
        let response = self.send("GET", &path, query, None, None, options).await?;
        envelope_from(ensure_success(response)?)
    }

    async fn cross_join(
        &self,
        tables: &[&str],
        query: &str,
        options: &CallOptions,
    ) -> Result<Envelope> {
        let path = format!("$crossjoin({})", tables.join(","));
        let query = (!query.is_empty()).then_some(query);
        let response = self.send("GET", &path, query, None, None, options).await?;
        envelope_from(ensure_success(response)?)
    }

    async fn execute_batch(
        &self,
        parts: &[BatchPart],
        options: &CallOptions,
    ) -> Result<Vec<BatchReply>> {
        let boundary = format!("batch_{}", Uuid::new_v4());
        let body = render_batch(&boundary, self.base_path(), parts);
        let content_type = format!("multipart/mixed; boundary={boundary}");
        let response = self
            .send(
                "POST",
                "$batch",
                None,
                Some(body.into_bytes()),
                Some(&content_type),
                options,
            )
            .await?;
        if !response.is_success() {
            return Err(protocol_error(response.status, &response.payload));
        }
        let text = match response.payload {
            Payload::Text(text) => text,
            Payload::Empty => return Err(Error::protocol("batch response carries no body")),
            Payload::Json(json) => {
                return Err(Error::protocol(format!(
                    "expected a multipart batch response, got: {json}"
                )));
            }
        };
        parse_batch(response.content_type.as_deref(), &text)
    }

    async fn create_table(
        &self,
        table: &str,
        fields: &[FieldSpec],
        options: &CallOptions,
    ) -> Result<()> {
        let body = json!({ "tableName": table, "fields": fields });
        ensure_success(
            self.send_json("POST", &self.system_collection, None, Some(&body), options)
                .await?,
        )?;
        Ok(())
    }

    async fn add_fields(
        &self,
        table: &str,
        fields: &[FieldSpec],
        options: &CallOptions,
    ) -> Result<()> {
        let path = format!("{}/{table}", self.system_collection);
        let body = json!({ "fields": fields });
        ensure_success(
            self.send_json("PATCH", &path, None, Some(&body), options)
                .await?,
        )?;
        Ok(())
    }

    async fn drop_table(&self, table: &str, options: &CallOptions) -> Result<()> {
        let path = format!("{}/{table}", self.system_collection);
        ensure_success(self.send("DELETE", &path, None, None, None, options).await?)?;
        Ok(())
    }

    async fn drop_field(&self, table: &str, field: &str, options: &CallOptions) -> Result<()> {
        let path = format!("{}/{table}/{field}", self.system_collection);
        ensure_success(self.send("DELETE", &path, None, None, None, options).await?)?;
        Ok(())
    }

    async fn call_procedure(
        &self,
        name: &str,
        parameters: Json,
        options: &CallOptions,
    ) -> Result<Json> {
        let payload = ensure_success(
            self.send_json("POST", name, None, Some(&parameters), options)
                .await?,
        )?;
        Ok(match payload {
            Payload::Empty => Json::Null,
            Payload::Json(json) => json,
            Payload::Text(text) => Json::String(text),
        })
    }
}
