//! Remote API collaborator interface
//!
//! The ORM core only talks to Salesforce through these traits. A
//! [`Transport`] knows how to authenticate and produces a [`SessionHandle`];
//! the handle carries out the actual bulk query and CRUD calls. Responses are
//! handed back as raw JSON-shaped values and decoded by the caller.

pub mod soap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::error::TransportError;

pub use soap::SoapTransport;

/// Authenticated client capability returned by a successful login
pub type SessionHandle = Arc<dyn RemoteClient>;

/// Authentication and statement/object normalization
#[async_trait]
pub trait Transport: Send + Sync {
    /// Authenticate with stored credentials
    async fn login(&self) -> Result<SessionHandle, TransportError>;

    /// Normalize a SOQL statement before dispatch
    fn format_query(&self, statement: &str) -> String {
        statement.to_string()
    }

    /// Normalize a record's field map before it is sent to create/update
    fn format_object(&self, fields: Map<String, Value>, _object_type: &str) -> Map<String, Value> {
        fields
    }
}

/// Calls available on an authenticated session
///
/// `query_all` resolves to `{"result": {"done": bool, "records": [...]}}`;
/// `create` and `update` resolve to `{"result": [{"id", "success", "errors"}]}`
/// with one entry per submitted record, in submission order.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    async fn query_all(&self, statement: &str) -> Result<Value, TransportError>;

    async fn create(&self, batch: RecordBatch) -> Result<Value, TransportError>;

    async fn update(&self, batch: RecordBatch) -> Result<Value, TransportError>;

    async fn delete(&self, batch: IdBatch) -> Result<Value, TransportError>;
}

/// Records submitted in one create/update call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordBatch {
    /// sObject type of every record in the batch (e.g., "Account")
    pub object_type: String,
    pub records: Vec<Map<String, Value>>,
}

impl RecordBatch {
    pub fn single(object_type: impl Into<String>, record: Map<String, Value>) -> Self {
        Self {
            object_type: object_type.into(),
            records: vec![record],
        }
    }
}

/// Record ids submitted in one delete call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdBatch {
    pub ids: Vec<String>,
}

impl IdBatch {
    pub fn single(id: impl Into<String>) -> Self {
        Self {
            ids: vec![id.into()],
        }
    }
}
