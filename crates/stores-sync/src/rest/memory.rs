//! In-process [`RestTransport`] that speaks the same wire format as the
//! document REST API. Used by tests and offline runs.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use stores_db::JsonMap;

use super::codec;
use super::{Method, RestRequest, RestResponse, RestTransport};
use crate::document::Collection;
use crate::error::{AccessError, AccessResult};

const NAME_PREFIX: &str = "projects/stores/databases/(default)/documents";

/// A failure to inject into the next matching request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectedFailure {
    /// Answer with this status and an error body.
    Status(u16),
    /// Fail before reaching the "server".
    Connection,
}

#[derive(Debug)]
struct PendingFailure {
    method: Method,
    path_prefix: String,
    failure: InjectedFailure,
}

#[derive(Debug, Default)]
struct State {
    collections: HashMap<String, BTreeMap<String, JsonMap>>,
    log: Vec<RestRequest>,
    failures: Vec<PendingFailure>,
}

/// In-memory document server.
#[derive(Debug, Default)]
pub struct MemoryRestTransport {
    state: Mutex<State>,
}

impl MemoryRestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Stores a document directly, bypassing the request log.
    pub fn seed(&self, collection: Collection, id: &str, fields: JsonMap) {
        self.lock()
            .collections
            .entry(collection.as_str().to_string())
            .or_default()
            .insert(id.to_string(), fields);
    }

    pub fn document(&self, collection: Collection, id: &str) -> Option<JsonMap> {
        self.lock()
            .collections
            .get(collection.as_str())
            .and_then(|docs| docs.get(id))
            .cloned()
    }

    pub fn count(&self, collection: Collection) -> usize {
        self.lock()
            .collections
            .get(collection.as_str())
            .map_or(0, BTreeMap::len)
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<RestRequest> {
        self.lock().log.clone()
    }

    /// Number of list (page) requests made against a collection.
    pub fn list_calls(&self, collection: Collection) -> usize {
        self.lock()
            .log
            .iter()
            .filter(|r| r.method == Method::Get && r.path == collection.as_str())
            .count()
    }

    /// Fails the next request with this method whose path starts with
    /// `path_prefix`. Each injection fires once.
    pub fn fail_next(&self, method: Method, path_prefix: &str, failure: InjectedFailure) {
        self.lock().failures.push(PendingFailure {
            method,
            path_prefix: path_prefix.to_string(),
            failure,
        });
    }

    fn handle(state: &mut State, request: &RestRequest) -> RestResponse {
        let mut segments = request.path.splitn(2, '/');
        let collection = segments.next().unwrap_or_default().to_string();
        let id = segments.next().map(str::to_string);
        let fields = codec::decode_fields(request.body.as_ref().and_then(|b| b.get("fields")));
        let docs = state.collections.entry(collection.clone()).or_default();

        match (request.method, id) {
            (Method::Get, None) => {
                let page_size = request
                    .query_values("pageSize")
                    .next()
                    .and_then(|s| s.parse::<usize>().ok())
                    .unwrap_or(usize::MAX)
                    .max(1);
                let offset = request
                    .query_values("pageToken")
                    .next()
                    .and_then(|s| s.parse::<usize>().ok())
                    .unwrap_or(0);

                let page: Vec<Value> = docs
                    .iter()
                    .skip(offset)
                    .take(page_size)
                    .map(|(id, fields)| wire_document(&collection, id, fields))
                    .collect();

                let mut body = json!({ "documents": page });
                let next = offset.saturating_add(page_size);
                if next < docs.len() {
                    body["nextPageToken"] = Value::String(next.to_string());
                }
                ok(body)
            }
            (Method::Get, Some(id)) => match docs.get(&id) {
                Some(fields) => ok(wire_document(&collection, &id, fields)),
                None => status(404, "document not found"),
            },
            (Method::Post, None) => {
                let id = Uuid::new_v4().to_string();
                let body = wire_document(&collection, &id, &fields);
                docs.insert(id, fields);
                ok(body)
            }
            (Method::Patch, Some(id)) => {
                let mask: Vec<&str> = request.query_values("updateMask.fieldPaths").collect();
                let must_exist = request
                    .query_values("currentDocument.exists")
                    .any(|v| v == "true");

                if must_exist && !docs.contains_key(&id) {
                    return status(404, "document not found");
                }

                let stored = if mask.is_empty() {
                    fields
                } else {
                    let mut merged = docs.get(&id).cloned().unwrap_or_default();
                    for key in mask {
                        match fields.get(key) {
                            Some(value) => merged.insert(key.to_string(), value.clone()),
                            None => merged.remove(key),
                        };
                    }
                    merged
                };
                let body = wire_document(&collection, &id, &stored);
                docs.insert(id, stored);
                ok(body)
            }
            (Method::Delete, Some(id)) => match docs.remove(&id) {
                Some(_) => ok(json!({})),
                None => status(404, "document not found"),
            },
            _ => status(400, "unsupported request"),
        }
    }
}

fn wire_document(collection: &str, id: &str, fields: &JsonMap) -> Value {
    json!({
        "name": format!("{}/{}/{}", NAME_PREFIX, collection, id),
        "fields": codec::encode_fields(fields),
    })
}

fn ok(body: Value) -> RestResponse {
    RestResponse { status: 200, body }
}

fn status(status: u16, message: &str) -> RestResponse {
    RestResponse {
        status,
        body: json!({ "error": { "code": status, "message": message } }),
    }
}

#[async_trait]
impl RestTransport for MemoryRestTransport {
    async fn send(&self, request: RestRequest) -> AccessResult<RestResponse> {
        let mut state = self.lock();
        state.log.push(request.clone());

        let injected = state
            .failures
            .iter()
            .position(|f| f.method == request.method && request.path.starts_with(&f.path_prefix));
        if let Some(index) = injected {
            let pending = state.failures.remove(index);
            return match pending.failure {
                InjectedFailure::Status(code) => Ok(status(code, "injected failure")),
                InjectedFailure::Connection => {
                    Err(AccessError::ConnectionFailed("injected failure".to_string()))
                }
            };
        }

        Ok(Self::handle(&mut state, &request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pages_use_offset_tokens() {
        let transport = MemoryRestTransport::new();
        for n in 0..3 {
            transport.seed(Collection::Items, &format!("I{}", n), JsonMap::new());
        }

        let first = transport
            .send(RestRequest::new(Method::Get, "items").query("pageSize", "2"))
            .await
            .unwrap();
        assert_eq!(first.body["documents"].as_array().unwrap().len(), 2);
        assert_eq!(first.body["nextPageToken"], "2");

        let second = transport
            .send(
                RestRequest::new(Method::Get, "items")
                    .query("pageSize", "2")
                    .query("pageToken", "2"),
            )
            .await
            .unwrap();
        assert_eq!(second.body["documents"].as_array().unwrap().len(), 1);
        assert!(second.body.get("nextPageToken").is_none());
    }

    #[tokio::test]
    async fn test_injected_failure_fires_once() {
        let transport = MemoryRestTransport::new();
        transport.fail_next(Method::Get, "items", InjectedFailure::Status(503));

        let failed = transport
            .send(RestRequest::new(Method::Get, "items"))
            .await
            .unwrap();
        assert_eq!(failed.status, 503);

        let retried = transport
            .send(RestRequest::new(Method::Get, "items"))
            .await
            .unwrap();
        assert!(retried.is_success());
        assert_eq!(transport.requests().len(), 2);
    }
}
