#![allow(dead_code)]

use futures::future::BoxFuture;
use serde_json::Value as Json;
use skiff::{
    BasicAuth, Database, Error, FieldDef, ODataAdapter, Result, TableSchema, Transport,
    WireRequest, WireResponse,
};
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

/// Scripted transport: answers from a queue and records every request.
pub struct StubTransport {
    requests: Mutex<Vec<WireRequest>>,
    responses: Mutex<VecDeque<WireResponse>>,
}

impl StubTransport {
    pub fn with_responses(responses: impl IntoIterator<Item = WireResponse>) -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            responses: Mutex::new(responses.into_iter().collect()),
        })
    }

    pub fn requests(&self) -> Vec<WireRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Transport for StubTransport {
    fn send(&self, request: WireRequest) -> BoxFuture<'_, Result<WireResponse>> {
        self.requests.lock().unwrap().push(request);
        let response = self.responses.lock().unwrap().pop_front();
        Box::pin(async move {
            response.ok_or_else(|| Error::transport("stub transport ran out of responses"))
        })
    }
}

pub fn json_response(status: u16, body: Json) -> WireResponse {
    WireResponse {
        status,
        content_type: Some("application/json".to_owned()),
        body: body.to_string().into_bytes(),
    }
}

pub fn empty_response(status: u16) -> WireResponse {
    WireResponse {
        status,
        content_type: None,
        body: Vec::new(),
    }
}

pub fn text_response(status: u16, content_type: &str, body: &str) -> WireResponse {
    WireResponse {
        status,
        content_type: Some(content_type.to_owned()),
        body: body.as_bytes().to_vec(),
    }
}

pub fn customers() -> TableSchema {
    TableSchema::declare("Customers")
        .field("code", FieldDef::text().primary_key())
        .field("name", FieldDef::text().nullable(false))
        .field("balance", FieldDef::number())
        .relation("Orders")
        .build()
        .unwrap()
}

pub fn database(transport: Arc<StubTransport>) -> Database<ODataAdapter> {
    let adapter = ODataAdapter::builder("https://server.test", "crm")
        .auth(BasicAuth::new("user", "pass"))
        .transport(transport)
        .build()
        .unwrap();
    Database::new(adapter)
}

pub fn header<'a>(request: &'a WireRequest, name: &str) -> Option<&'a str> {
    request
        .headers
        .iter()
        .find_map(|(n, v)| (n == name).then_some(v.as_str()))
}
