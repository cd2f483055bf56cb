//! Lightweight ORM over the Salesforce SOAP API
//!
//! Register models (an sObject name plus its fields), create records bound to
//! them, and run CRUD and bulk query operations through one shared session
//! that is renewed on demand.
//!
//! ```no_run
//! use salesforce_orm::{Credentials, ModelDescriptor, Orm, OrmConfig, SoapTransport};
//! use std::sync::Arc;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = OrmConfig::default();
//! let transport = SoapTransport::new(Credentials::from_env()?, &config);
//! let orm = Orm::with_config(Arc::new(transport), &config);
//!
//! orm.add_model(ModelDescriptor::new("Account", ["Name", "Industry"]));
//!
//! let mut account = orm.new_record("Account")?;
//! account.set_field("Name", "Acme");
//! account.create().await?;
//!
//! let tech = orm.search("Account", "Industry = 'Technology'", &[]).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod model;
pub mod orm;
pub mod record;
pub mod response;
pub mod session;
pub mod soql;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{Credentials, ModelsFile, OrmConfig};
pub use error::{AuthError, OrmError, TransportError};
pub use model::{ModelDescriptor, ModelRegistry};
pub use orm::{Orm, RawQuery};
pub use record::Record;
pub use session::SessionManager;
pub use transport::{IdBatch, RecordBatch, RemoteClient, SessionHandle, SoapTransport, Transport};
