//! # REST Strategy
//!
//! Pull-based access over the document REST API.
//!
//! ## Request Shapes
//! ```text
//! list     GET    {collection}?pageSize=N[&pageToken=T]   (follows nextPageToken)
//! create   POST   {collection}                 { fields }
//! update   PATCH  {collection}/{id}?updateMask.fieldPaths=a&updateMask.fieldPaths=b
//!                                              &currentDocument.exists=true
//! set      PATCH  {collection}/{id}            { fields }   (no mask: replace)
//! remove   DELETE {collection}/{id}            404 counts as success
//! ```
//!
//! ## No Atomic Batch
//! The API offers no multi-document write here, so [`RestStrategy::batch`]
//! issues the writes one by one and stops at the first failure:
//! ```text
//! batch([update item, set transaction])
//!   1. PATCH items/I1         ✓  (applied = 1)
//!   2. PATCH transactions/T9  ✗
//!        └─► PartialBatch { applied: 1, total: 2, source }
//! ```
//! Nothing is rolled back. Callers decide how to surface the gap.

pub mod codec;
pub mod http;
pub mod memory;

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use stores_db::JsonMap;

use crate::access::{DataAccess, StrategyKind};
use crate::document::{Collection, Document, WriteOp};
use crate::error::{AccessError, AccessResult};

pub use http::HttpTransport;
pub use memory::{InjectedFailure, MemoryRestTransport};

/// Default page size for list requests.
pub const DEFAULT_PAGE_SIZE: u32 = 1000;

// =============================================================================
// Transport Seam
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// A request relative to the documents root.
#[derive(Debug, Clone, PartialEq)]
pub struct RestRequest {
    pub method: Method,
    /// `items` or `items/abc123`.
    pub path: String,
    /// Repeated keys are allowed (field masks).
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl RestRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        RestRequest {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Values of a query key, in order.
    pub fn query_values<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.query
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// A response with any status. Only transport failures are `Err`.
#[derive(Debug, Clone, PartialEq)]
pub struct RestResponse {
    pub status: u16,
    pub body: Value,
}

impl RestResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    fn error_message(&self) -> String {
        self.body
            .pointer("/error/message")
            .and_then(Value::as_str)
            .unwrap_or("request failed")
            .to_string()
    }
}

/// Sends requests to the document REST API.
#[async_trait]
pub trait RestTransport: Send + Sync {
    async fn send(&self, request: RestRequest) -> AccessResult<RestResponse>;
}

// =============================================================================
// Strategy
// =============================================================================

/// REST data access strategy.
#[derive(Clone)]
pub struct RestStrategy {
    transport: Arc<dyn RestTransport>,
    page_size: u32,
}

impl fmt::Debug for RestStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestStrategy")
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

impl RestStrategy {
    pub fn new(transport: Arc<dyn RestTransport>) -> Self {
        RestStrategy {
            transport,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Sends a request and maps non-success statuses to errors.
    async fn execute(&self, collection: Collection, id: &str, request: RestRequest) -> AccessResult<Value> {
        let method = request.method;
        let response = self.transport.send(request).await?;

        if response.is_success() {
            return Ok(response.body);
        }

        debug!(%method, collection = %collection, id = %id, status = response.status, "REST request rejected");
        Err(match response.status {
            404 => AccessError::not_found(collection.as_str(), id),
            409 => AccessError::AlreadyExists {
                collection: collection.as_str().to_string(),
                id: id.to_string(),
            },
            status => AccessError::Http {
                status,
                message: response.error_message(),
            },
        })
    }

    /// Replaces a document wholesale (no field mask).
    pub async fn set(&self, collection: Collection, id: &str, fields: &JsonMap) -> AccessResult<()> {
        let request = RestRequest::new(Method::Patch, format!("{}/{}", collection, id))
            .body(codec::encode_body(fields));
        self.execute(collection, id, request).await?;
        Ok(())
    }

    async fn patch_masked(&self, collection: Collection, id: &str, fields: &JsonMap) -> AccessResult<()> {
        let mut request = RestRequest::new(Method::Patch, format!("{}/{}", collection, id));
        for key in fields.keys() {
            request = request.query("updateMask.fieldPaths", key.as_str());
        }
        let request = request
            .query("currentDocument.exists", "true")
            .body(codec::encode_body(fields));

        self.execute(collection, id, request).await?;
        Ok(())
    }

    async fn apply(&self, op: &WriteOp) -> AccessResult<()> {
        match op {
            WriteOp::Set {
                collection,
                id,
                fields,
            } => self.set(*collection, id, fields).await,
            WriteOp::Update {
                collection,
                id,
                fields,
            } => self.patch_masked(*collection, id, fields).await,
        }
    }
}

#[async_trait]
impl DataAccess for RestStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Rest
    }

    async fn list(&self, collection: Collection) -> AccessResult<Vec<Document>> {
        let mut docs = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = RestRequest::new(Method::Get, collection.as_str())
                .query("pageSize", self.page_size.to_string());
            if let Some(token) = page_token.take() {
                request = request.query("pageToken", token);
            }

            let body = self.execute(collection, "", request).await?;

            if let Some(page) = body.get("documents").and_then(Value::as_array) {
                for wire in page {
                    match codec::decode_document(wire) {
                        Ok(doc) => docs.push(doc),
                        Err(e) => warn!(collection = %collection, error = %e, "Skipping undecodable document"),
                    }
                }
            }

            match body.get("nextPageToken").and_then(Value::as_str) {
                Some(token) if !token.is_empty() => page_token = Some(token.to_string()),
                _ => break,
            }
        }

        debug!(collection = %collection, count = docs.len(), "Fetched collection over REST");
        Ok(docs)
    }

    async fn get(&self, collection: Collection, id: &str) -> AccessResult<Option<Document>> {
        let request = RestRequest::new(Method::Get, format!("{}/{}", collection, id));
        match self.execute(collection, id, request).await {
            Ok(body) => Ok(Some(codec::decode_document(&body)?)),
            Err(AccessError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn create(&self, collection: Collection, fields: JsonMap) -> AccessResult<Document> {
        let request =
            RestRequest::new(Method::Post, collection.as_str()).body(codec::encode_body(&fields));
        let body = self.execute(collection, "", request).await?;
        let created = codec::decode_document(&body)?;

        // Echo what was sent if the server omitted fields in its reply.
        let fields = if created.fields.is_empty() {
            fields
        } else {
            created.fields
        };
        Ok(Document::new(created.id, fields))
    }

    async fn update(&self, collection: Collection, id: &str, fields: JsonMap) -> AccessResult<()> {
        self.patch_masked(collection, id, &fields).await
    }

    async fn remove(&self, collection: Collection, id: &str) -> AccessResult<()> {
        let request = RestRequest::new(Method::Delete, format!("{}/{}", collection, id));
        match self.execute(collection, id, request).await {
            Ok(_) => Ok(()),
            Err(AccessError::NotFound { .. }) => {
                debug!(collection = %collection, id = %id, "Remove of absent document");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn batch(&self, writes: Vec<WriteOp>) -> AccessResult<()> {
        let total = writes.len();
        for (applied, op) in writes.iter().enumerate() {
            if let Err(e) = self.apply(op).await {
                if applied == 0 {
                    return Err(e);
                }
                warn!(
                    applied,
                    total,
                    collection = %op.collection(),
                    id = %op.id(),
                    error = %e,
                    "Sequential batch stopped midway"
                );
                return Err(AccessError::PartialBatch {
                    applied,
                    total,
                    source: Box::new(e),
                });
            }
        }
        Ok(())
    }

    fn atomic_batches(&self) -> bool {
        false
    }
}
