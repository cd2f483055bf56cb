//! Session lifecycle management
//!
//! A [`SessionManager`] owns the one authenticated session used by every
//! record and query operation. Sessions are renewed lazily: the first
//! operation after the renewal deadline triggers a fresh login.

use arc_swap::ArcSwapOption;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::config::OrmConfig;
use crate::error::AuthError;
use crate::transport::{SessionHandle, Transport};

/// An authenticated handle and the local deadline after which it is renewed
struct Session {
    handle: SessionHandle,
    expires_at: Instant,
}

impl Session {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Owns the shared session and renews it on demand
///
/// The current session is read without locking. Renewal goes through a
/// login gate so that concurrent callers finding no valid session share a
/// single login instead of each starting their own.
pub struct SessionManager {
    transport: Arc<dyn Transport>,
    renewal_window: Duration,
    current: ArcSwapOption<Session>,
    login_gate: Mutex<()>,
}

impl SessionManager {
    /// Create a manager with the default 100 minute renewal window
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_config(transport, &OrmConfig::default())
    }

    pub fn with_config(transport: Arc<dyn Transport>, config: &OrmConfig) -> Self {
        Self {
            transport,
            renewal_window: config.renewal_window,
            current: ArcSwapOption::empty(),
            login_gate: Mutex::new(()),
        }
    }

    /// Return a valid session handle, logging in first if there is none
    ///
    /// Safe to call before every remote operation: while the session is
    /// live this makes no network call and takes no lock.
    pub async fn ensure_ready(&self) -> Result<SessionHandle, AuthError> {
        if let Some(handle) = self.live_handle() {
            return Ok(handle);
        }

        let _gate = self.login_gate.lock().await;

        // Another caller may have finished logging in while we waited
        if let Some(handle) = self.live_handle() {
            log::debug!("Reusing session established by a concurrent login");
            return Ok(handle);
        }

        log::info!("No valid session, logging in");
        let handle = self.transport.login().await.map_err(|e| {
            log::warn!("Login failed: {}", e);
            AuthError(e)
        })?;

        let expires_at = Instant::now() + self.renewal_window;
        self.current.store(Some(Arc::new(Session {
            handle: handle.clone(),
            expires_at,
        })));
        log::info!(
            "Session established, renewing in {} minutes",
            self.renewal_window.as_secs() / 60
        );

        Ok(handle)
    }

    /// Whether a live session is currently held
    pub fn is_ready(&self) -> bool {
        self.live_handle().is_some()
    }

    /// Renewal deadline of the current session, live or stale
    pub fn expires_at(&self) -> Option<Instant> {
        self.current.load_full().map(|s| s.expires_at)
    }

    /// The transport used for logins and statement/object formatting
    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    fn live_handle(&self) -> Option<SessionHandle> {
        self.current
            .load_full()
            .filter(|s| s.is_live(Instant::now()))
            .map(|s| s.handle.clone())
    }
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("renewal_window", &self.renewal_window)
            .field("expires_at", &self.expires_at())
            .finish()
    }
}
