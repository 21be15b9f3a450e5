//! Interfaces to the services the core drives but does not implement: the
//! proximity transport, durable storage, the remote database and the local
//! resource resolver.

use std::{fmt, path::Path, sync::Arc};

use futures::future::BoxFuture;
use url::Url;

use crate::{errors::Result, file::IncomingFile, packet::Packet};

/// Progress reported by the transport for an outgoing payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransferStatus {
    InProgress,
    Success,
    Failure,
}

impl TransferStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

pub trait Transport: Send + Sync {
    /// Delivers `bytes` to the endpoint with the given transport id.
    fn send(&self, endpoint_id: &str, bytes: Vec<u8>) -> BoxFuture<'static, Result<()>>;
}

pub trait Storage: Send + Sync {
    /// Fetches the object at `remote_path` into `destination`.
    fn download(
        &self,
        remote_path: &str,
        destination: &Path,
    ) -> BoxFuture<'static, Result<()>>;
}

/// Callback receiving packet snapshots from the remote database.
pub type SnapshotCallback = Arc<dyn Fn(Packet<IncomingFile>) + Send + Sync>;

pub trait RemoteDatabase: Send + Sync {
    /// Starts delivering snapshots of `packet_id` to `on_update`, zero or more
    /// times, until the returned subscription is dropped.
    fn observe(
        &self,
        packet_id: &str,
        on_update: SnapshotCallback,
    ) -> Result<Subscription>;
}

/// Mime type and size of a local resource.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceInfo {
    pub mime_type: String,
    pub size: u64,
}

pub trait ResourceResolver: Send + Sync {
    /// Fails with [`DropError::Resource`](crate::errors::DropError::Resource)
    /// when the resource is inaccessible or its size cannot be read.
    fn resolve(&self, resource: &Url) -> Result<ResourceInfo>;
}

/// A live remote database subscription. Dropping it runs the cancel hook
/// the database provided.
pub struct Subscription {
    packet_id: String,
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn with_cancel(
        packet_id: impl Into<String>,
        cancel: impl FnOnce() + Send + Sync + 'static,
    ) -> Self {
        Self {
            packet_id: packet_id.into(),
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn packet_id(&self) -> &str {
        &self.packet_id
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("packet_id", &self.packet_id)
            .field("cancellable", &self.cancel.is_some())
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}
