//! Store handle injected into request handlers.
//!
//! [`StorePool`] owns the connection lifecycle policy:
//!
//! - [`Lifecycle::Shared`]: one store opened at startup and reused. Until
//!   the first connection succeeds, [`StorePool::acquire`] fails fast with
//!   [`StoreError::Unavailable`]; a background task keeps retrying.
//! - [`Lifecycle::PerRequest`]: every [`acquire`](StorePool::acquire) opens a
//!   fresh connection, and [`Lease::release`] closes it.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;

use crate::config::{Lifecycle, StoreConfig};

use super::{ConnectOptions, DocumentStore, StoreError};

/// Opens new store connections for a [`StorePool`].
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn DocumentStore>, StoreError>;
}

/// Connects through [`super::open`] using a connection string.
pub struct UriConnector {
    options: ConnectOptions,
}

impl UriConnector {
    pub fn new(options: ConnectOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Connector for UriConnector {
    async fn connect(&self) -> Result<Arc<dyn DocumentStore>, StoreError> {
        super::open(&self.options).await
    }
}

/// Hands out the same, already-open store on every call.
pub struct FixedConnector(pub Arc<dyn DocumentStore>);

#[async_trait]
impl Connector for FixedConnector {
    async fn connect(&self) -> Result<Arc<dyn DocumentStore>, StoreError> {
        Ok(self.0.clone())
    }
}

pub struct StorePool {
    connector: Arc<dyn Connector>,
    lifecycle: Lifecycle,
    shared: RwLock<Option<Arc<dyn DocumentStore>>>,
}

impl StorePool {
    pub fn new(connector: Arc<dyn Connector>, lifecycle: Lifecycle) -> Self {
        Self {
            connector,
            lifecycle,
            shared: RwLock::new(None),
        }
    }

    /// Builds a pool from `[store]` settings. Does not connect.
    pub fn from_config(config: &StoreConfig) -> anyhow::Result<Self> {
        let connector = UriConnector::new(ConnectOptions::from_config(config)?);
        Ok(Self::new(Arc::new(connector), config.lifecycle))
    }

    /// A shared-lifecycle pool that is ready immediately.
    pub fn ready(store: Arc<dyn DocumentStore>) -> Self {
        let pool = Self::new(Arc::new(FixedConnector(store.clone())), Lifecycle::Shared);
        *pool.shared.write().unwrap() = Some(store);
        pool
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Whether [`acquire`](Self::acquire) can succeed without waiting for a
    /// reconnect. Per-request pools are always considered ready.
    pub fn is_ready(&self) -> bool {
        match self.lifecycle {
            Lifecycle::Shared => self.shared.read().unwrap().is_some(),
            Lifecycle::PerRequest => true,
        }
    }

    /// Opens the shared store once. No-op if it is already open.
    pub async fn connect_shared(&self) -> Result<(), StoreError> {
        let connected = self.shared.read().unwrap().is_some();
        if connected {
            return Ok(());
        }
        let store = self.connector.connect().await?;
        tracing::info!(backend = store.backend(), "document store connected");
        *self.shared.write().unwrap() = Some(store);
        Ok(())
    }

    /// Performs the startup connection for the shared lifecycle.
    ///
    /// On failure the error is logged and a background task retries every
    /// `retry_interval` until the store is reachable; the handle of that task
    /// is returned. Per-request pools never connect here.
    pub async fn start(self: &Arc<Self>, retry_interval: Duration) -> Option<JoinHandle<()>> {
        if self.lifecycle == Lifecycle::PerRequest {
            tracing::info!("document store lifecycle: per_request");
            return None;
        }

        match self.connect_shared().await {
            Ok(()) => None,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    retry_secs = retry_interval.as_secs_f64(),
                    "document store unreachable at startup; uploads are refused until it connects"
                );
                let pool = Arc::clone(self);
                Some(tokio::spawn(async move {
                    loop {
                        tokio::time::sleep(retry_interval).await;
                        match pool.connect_shared().await {
                            Ok(()) => break,
                            Err(e) => tracing::warn!(error = %e, "document store reconnect failed"),
                        }
                    }
                }))
            }
        }
    }

    /// Obtains a store for one request.
    pub async fn acquire(&self) -> Result<Lease, StoreError> {
        match self.lifecycle {
            Lifecycle::Shared => {
                let store = self.shared.read().unwrap().clone();
                store
                    .map(|store| Lease {
                        store,
                        close_on_release: false,
                    })
                    .ok_or_else(|| StoreError::Unavailable("not connected yet".to_string()))
            }
            Lifecycle::PerRequest => {
                let store = self.connector.connect().await?;
                Ok(Lease {
                    store,
                    close_on_release: true,
                })
            }
        }
    }

    /// Closes the shared store, if one is open.
    pub async fn shutdown(&self) {
        let store = self.shared.write().unwrap().take();
        if let Some(store) = store {
            store.close().await;
        }
    }
}

/// A store borrowed from a [`StorePool`] for the duration of one request.
pub struct Lease {
    store: Arc<dyn DocumentStore>,
    close_on_release: bool,
}

impl Lease {
    pub fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    /// Returns the store to the pool, closing it under the per-request lifecycle.
    pub async fn release(self) {
        if self.close_on_release {
            self.store.close().await;
        }
    }
}
