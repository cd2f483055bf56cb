//! In-memory transport used by unit tests
//!
//! Queued responses are returned first. With nothing queued, the mock acts
//! as a tiny record store: creates assign ids, updates merge fields, deletes
//! remove rows and `WHERE Id = '...'` queries return the stored row.

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::TransportError;
use crate::transport::{IdBatch, RecordBatch, RemoteClient, SessionHandle, Transport};

type Reply = Result<Value, TransportError>;

#[derive(Default)]
struct MockState {
    logins: AtomicUsize,
    fail_login: AtomicBool,
    login_delay: Duration,
    next_id: AtomicUsize,
    statements: Mutex<Vec<String>>,
    created: Mutex<Vec<RecordBatch>>,
    updated: Mutex<Vec<RecordBatch>>,
    deleted: Mutex<Vec<IdBatch>>,
    query_replies: Mutex<VecDeque<Reply>>,
    create_replies: Mutex<VecDeque<Reply>>,
    update_replies: Mutex<VecDeque<Reply>>,
    delete_replies: Mutex<VecDeque<Reply>>,
    store: Mutex<HashMap<String, (String, Map<String, Value>)>>,
}

pub(crate) struct MockTransport {
    state: Arc<MockState>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Self::with_login_delay(Duration::ZERO)
    }

    pub fn with_login_delay(login_delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            state: Arc::new(MockState {
                login_delay,
                ..MockState::default()
            }),
        })
    }

    pub fn set_fail_login(&self, fail: bool) {
        self.state.fail_login.store(fail, Ordering::SeqCst);
    }

    pub fn login_count(&self) -> usize {
        self.state.logins.load(Ordering::SeqCst)
    }

    pub fn statements(&self) -> Vec<String> {
        self.state.statements.lock().unwrap().clone()
    }

    pub fn created(&self) -> Vec<RecordBatch> {
        self.state.created.lock().unwrap().clone()
    }

    pub fn updated(&self) -> Vec<RecordBatch> {
        self.state.updated.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<IdBatch> {
        self.state.deleted.lock().unwrap().clone()
    }

    pub fn push_query(&self, reply: Reply) {
        self.state.query_replies.lock().unwrap().push_back(reply);
    }

    pub fn push_create(&self, reply: Reply) {
        self.state.create_replies.lock().unwrap().push_back(reply);
    }

    pub fn push_update(&self, reply: Reply) {
        self.state.update_replies.lock().unwrap().push_back(reply);
    }

    pub fn push_delete(&self, reply: Reply) {
        self.state.delete_replies.lock().unwrap().push_back(reply);
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn login(&self) -> Result<SessionHandle, TransportError> {
        self.state.logins.fetch_add(1, Ordering::SeqCst);

        if !self.state.login_delay.is_zero() {
            tokio::time::sleep(self.state.login_delay).await;
        }

        if self.state.fail_login.load(Ordering::SeqCst) {
            return Err(TransportError::new("INVALID_LOGIN: Invalid username, password, security token; or user locked out."));
        }

        Ok(Arc::new(MockClient {
            state: self.state.clone(),
        }))
    }
}

struct MockClient {
    state: Arc<MockState>,
}

impl MockClient {
    fn stored_row(&self, statement: &str) -> Option<Value> {
        let start = statement.find("WHERE Id = '")? + "WHERE Id = '".len();
        let end = start + statement[start..].find('\'')?;
        let id = &statement[start..end];

        let store = self.state.store.lock().unwrap();
        let (object_type, fields) = store.get(id)?;

        let mut row = fields.clone();
        row.insert("attributes".to_string(), json!({"type": object_type}));
        row.insert("Id".to_string(), json!(id));
        Some(Value::Object(row))
    }
}

#[async_trait]
impl RemoteClient for MockClient {
    async fn query_all(&self, statement: &str) -> Result<Value, TransportError> {
        self.state.statements.lock().unwrap().push(statement.to_string());

        if let Some(reply) = self.state.query_replies.lock().unwrap().pop_front() {
            return reply;
        }

        let records: Vec<Value> = self.stored_row(statement).into_iter().collect();
        Ok(json!({"result": {"done": true, "size": records.len(), "records": records}}))
    }

    async fn create(&self, batch: RecordBatch) -> Result<Value, TransportError> {
        self.state.created.lock().unwrap().push(batch.clone());

        if let Some(reply) = self.state.create_replies.lock().unwrap().pop_front() {
            return reply;
        }

        let mut results = Vec::new();
        let mut store = self.state.store.lock().unwrap();
        for record in batch.records {
            let n = self.state.next_id.fetch_add(1, Ordering::SeqCst) + 1;
            let id = format!("001MOCK{:011}", n);
            store.insert(id.clone(), (batch.object_type.clone(), record));
            results.push(json!({"id": id, "success": true, "errors": []}));
        }
        Ok(json!({ "result": results }))
    }

    async fn update(&self, batch: RecordBatch) -> Result<Value, TransportError> {
        self.state.updated.lock().unwrap().push(batch.clone());

        if let Some(reply) = self.state.update_replies.lock().unwrap().pop_front() {
            return reply;
        }

        let mut results = Vec::new();
        let mut store = self.state.store.lock().unwrap();
        for mut record in batch.records {
            let id = record
                .remove("Id")
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default();
            match store.get_mut(&id) {
                Some((_, fields)) => {
                    fields.extend(record);
                    results.push(json!({"id": id, "success": true, "errors": []}));
                }
                None => results.push(json!({
                    "id": null,
                    "success": false,
                    "errors": [{"statusCode": "ENTITY_IS_DELETED", "message": "entity is deleted"}]
                })),
            }
        }
        Ok(json!({ "result": results }))
    }

    async fn delete(&self, batch: IdBatch) -> Result<Value, TransportError> {
        self.state.deleted.lock().unwrap().push(batch.clone());

        if let Some(reply) = self.state.delete_replies.lock().unwrap().pop_front() {
            return reply;
        }

        let mut store = self.state.store.lock().unwrap();
        let results: Vec<Value> = batch
            .ids
            .iter()
            .map(|id| json!({"id": id, "success": store.remove(id).is_some()}))
            .collect();
        Ok(json!({ "result": results }))
    }
}
