//! Records bound to a registered model
//!
//! A [`Record`] holds the current field values of one remote record. Every
//! remote operation first makes sure the shared session is ready, then
//! performs a single-record call and maps the response back.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{OrmError, Result};
use crate::model::{ID_FIELD, ModelDescriptor};
use crate::response::{self, Row};
use crate::session::SessionManager;
use crate::soql;
use crate::transport::{IdBatch, RecordBatch};

/// Metadata key the remote API attaches to every row
pub const ATTRIBUTES_KEY: &str = "attributes";

/// One remote record of a registered model
///
/// New records have no `Id` until [`create`](Record::create) succeeds;
/// [`delete`](Record::delete) clears it again.
pub struct Record {
    model: Arc<ModelDescriptor>,
    session: Arc<SessionManager>,
    values: HashMap<String, Value>,
    id: Option<String>,
}

impl Record {
    /// Create an empty record, destined for `create`
    pub fn new(model: Arc<ModelDescriptor>, session: Arc<SessionManager>) -> Self {
        Self {
            model,
            session,
            values: HashMap::new(),
            id: None,
        }
    }

    /// Build a record from a remote row
    ///
    /// Only declared fields, the given extra projection fields and `Id` are
    /// copied; `attributes` and any other keys are dropped.
    pub(crate) fn from_row(
        model: Arc<ModelDescriptor>,
        session: Arc<SessionManager>,
        row: &Row,
        extra_fields: &[&str],
    ) -> Self {
        let mut record = Self::new(model, session);
        record.hydrate(row, extra_fields);
        record
    }

    pub fn model(&self) -> &ModelDescriptor {
        &self.model
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Current in-memory value of a field
    pub fn get_field(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// All field values currently held
    pub fn fields(&self) -> &HashMap<String, Value> {
        &self.values
    }

    /// Set a declared field, returning false if the model does not declare it
    ///
    /// Setting `Id` binds the record to an existing remote record.
    pub fn set_field(&mut self, field: &str, value: impl Into<Value>) -> bool {
        let value = value.into();

        if field == ID_FIELD {
            return match value {
                Value::Null => {
                    self.id = None;
                    true
                }
                Value::String(id) if !id.is_empty() => {
                    self.id = Some(id);
                    true
                }
                other => {
                    log::warn!("Ignoring non-string Id {} on {}", other, self.model.name);
                    false
                }
            };
        }

        if !self.model.has_field(field) {
            log::warn!("Ignoring undeclared field '{}' on {}", field, self.model.name);
            return false;
        }

        self.values.insert(field.to_string(), value);
        true
    }

    /// Declared fields that currently hold a value
    ///
    /// Fields never set are left out, so only an explicit null asks the
    /// remote side to clear a field.
    pub fn object_values(&self) -> Map<String, Value> {
        self.model
            .fields
            .iter()
            .filter_map(|field| {
                self.values
                    .get(field)
                    .map(|value| (field.clone(), value.clone()))
            })
            .collect()
    }

    /// Field values plus `Id`, as a JSON object
    pub fn to_value(&self) -> Value {
        let mut object = Map::new();
        if let Some(id) = &self.id {
            object.insert(ID_FIELD.to_string(), Value::String(id.clone()));
        }
        for (field, value) in &self.values {
            object.insert(field.clone(), value.clone());
        }
        Value::Object(object)
    }

    /// Reload this record's declared fields from the remote service
    pub async fn get(&mut self) -> Result<()> {
        let id = self.require_id("get")?;
        let client = self.session.ensure_ready().await?;

        let statement = self
            .session
            .transport()
            .format_query(&soql::select_by_id(&self.model, &id));
        log::debug!("Fetching {} {}: {}", self.model.name, id, statement);

        let response = client.query_all(&statement).await?;
        let mut rows = response::completed_rows(&response)?;
        if rows.len() != 1 {
            return Err(OrmError::malformed(format!(
                "expected exactly one {} row for Id {}, got {}",
                self.model.name,
                id,
                rows.len()
            )));
        }

        let row = rows.remove(0);
        self.hydrate(&row, &[]);
        Ok(())
    }

    /// Insert this record and store the returned `Id`
    pub async fn create(&mut self) -> Result<()> {
        let client = self.session.ensure_ready().await?;

        let object = self
            .session
            .transport()
            .format_object(self.object_values(), &self.model.name);
        log::debug!("Creating {} record", self.model.name);

        let response = client
            .create(RecordBatch::single(&self.model.name, object))
            .await?;
        let id = response::first_saved_id(&response)?;

        log::info!("Created {} {}", self.model.name, id);
        self.id = Some(id);
        Ok(())
    }

    /// Push this record's declared fields to the remote record
    pub async fn update(&mut self) -> Result<()> {
        let id = self.require_id("update")?;
        let client = self.session.ensure_ready().await?;

        let mut values = self.object_values();
        values.insert(ID_FIELD.to_string(), Value::String(id.clone()));
        let object = self
            .session
            .transport()
            .format_object(values, &self.model.name);
        log::debug!("Updating {} {}", self.model.name, id);

        let response = client
            .update(RecordBatch::single(&self.model.name, object))
            .await?;
        let id = response::first_saved_id(&response)?;

        self.id = Some(id);
        Ok(())
    }

    /// Delete the remote record and clear `Id`
    ///
    /// Whatever payload the transport returns is accepted as success.
    pub async fn delete(&mut self) -> Result<()> {
        let id = self.require_id("delete")?;
        let client = self.session.ensure_ready().await?;

        log::debug!("Deleting {} {}", self.model.name, id);
        let response = client.delete(IdBatch::single(id.clone())).await?;
        log::trace!("Delete response for {}: {}", id, response);

        log::info!("Deleted {} {}", self.model.name, id);
        self.id = None;
        Ok(())
    }

    fn require_id(&self, operation: &'static str) -> Result<String> {
        self.id.clone().ok_or_else(|| OrmError::MissingId {
            model: self.model.name.clone(),
            operation,
        })
    }

    fn hydrate(&mut self, row: &Row, extra_fields: &[&str]) {
        for (key, value) in row {
            if key == ATTRIBUTES_KEY {
                continue;
            }

            if key == ID_FIELD {
                if let Some(id) = value.as_str().filter(|id| !id.is_empty()) {
                    self.id = Some(id.to_string());
                }
                continue;
            }

            if projects(&self.model.fields, key) || projects(extra_fields, key) {
                self.values.insert(key.clone(), value.clone());
            } else {
                log::debug!("Ignoring unexpected field '{}' on {} row", key, self.model.name);
            }
        }
    }
}

/// Whether a row key was requested, either directly or as the root of a
/// relationship path such as `Owner.Name`
fn projects<S: AsRef<str>>(fields: &[S], key: &str) -> bool {
    fields.iter().any(|field| {
        let field = field.as_ref();
        field == key || field.split('.').next() == Some(key)
    })
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("model", &self.model.name)
            .field("id", &self.id)
            .field("values", &self.values)
            .finish()
    }
}
