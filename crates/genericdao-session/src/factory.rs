//! Opening sessions over a shared datastore handle.

use crate::{Datastore, Session, SessionConfig};

/// Hands out sessions that share one datastore and one configuration.
///
/// The datastore is cloned per session, so `D` should be a cheap handle (such as
/// [`MemoryDatastore`](crate::MemoryDatastore), whose clones share tables).
#[derive(Debug, Clone)]
pub struct SessionFactory<D: Datastore + Clone> {
    datastore: D,
    config: SessionConfig,
}

impl<D: Datastore + Clone> SessionFactory<D> {
    /// Create a factory with the default session configuration.
    pub fn new(datastore: D) -> Self {
        Self::with_config(datastore, SessionConfig::default())
    }

    /// Create a factory with a custom session configuration.
    pub fn with_config(datastore: D, config: SessionConfig) -> Self {
        Self { datastore, config }
    }

    /// Open a fresh session with an empty identity map.
    pub fn open_session(&self) -> Session<D> {
        tracing::debug!(auto_flush = self.config.auto_flush, "Opening session");
        Session::with_config(self.datastore.clone(), self.config.clone())
    }

    /// The datastore handle sessions are opened over.
    pub fn datastore(&self) -> &D {
        &self.datastore
    }

    /// The configuration new sessions receive.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}
