//! Services shared by every endpoint of one drop session.

use std::sync::Arc;

use crate::{
    collaborators::{RemoteDatabase, ResourceResolver, Storage, Transport},
    config::DropConfig,
    download::FileDownloader,
    events::{DropSubscriber, Subscribers},
    highlight::Highlighter,
    reconcile::ReconciliationBridge,
    store::PacketStore,
};

/// Implementations of the external services a session talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub transport: Arc<dyn Transport>,
    pub storage: Arc<dyn Storage>,
    pub database: Arc<dyn RemoteDatabase>,
    pub resolver: Arc<dyn ResourceResolver>,
}

pub struct DropSession {
    config: DropConfig,
    transport: Arc<dyn Transport>,
    resolver: Arc<dyn ResourceResolver>,
    subscribers: Arc<Subscribers>,
    store: PacketStore,
    highlighter: Highlighter,
    bridge: ReconciliationBridge,
    downloader: FileDownloader,
}

impl DropSession {
    pub fn new(config: DropConfig, collaborators: Collaborators) -> Arc<Self> {
        let subscribers = Arc::new(Subscribers::new());
        let highlighter =
            Highlighter::new(config.highlight_duration(), subscribers.clone());
        let bridge = ReconciliationBridge::new(
            collaborators.database,
            highlighter.clone(),
            subscribers.clone(),
        );
        let downloader = FileDownloader::new(
            collaborators.storage,
            config.download_dir(),
            subscribers.clone(),
        );

        log::debug!(
            "session: started as {}, highlight {}ms",
            config.local_endpoint_name,
            config.highlight_duration_ms
        );

        Arc::new(Self {
            store: PacketStore::new(subscribers.clone()),
            transport: collaborators.transport,
            resolver: collaborators.resolver,
            config,
            subscribers,
            highlighter,
            bridge,
            downloader,
        })
    }

    pub fn config(&self) -> &DropConfig {
        &self.config
    }

    pub fn local_endpoint_name(&self) -> &str {
        &self.config.local_endpoint_name
    }

    pub fn store(&self) -> &PacketStore {
        &self.store
    }

    pub fn downloader(&self) -> &FileDownloader {
        &self.downloader
    }

    pub fn bridge(&self) -> &ReconciliationBridge {
        &self.bridge
    }

    pub fn highlighter(&self) -> &Highlighter {
        &self.highlighter
    }

    pub fn subscribers(&self) -> &Arc<Subscribers> {
        &self.subscribers
    }

    pub fn subscribe(&self, subscriber: Arc<dyn DropSubscriber>) {
        self.subscribers.subscribe(subscriber);
    }

    pub fn unsubscribe(&self, subscriber: Arc<dyn DropSubscriber>) {
        self.subscribers.unsubscribe(subscriber);
    }

    pub(crate) fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub(crate) fn resolver(&self) -> &Arc<dyn ResourceResolver> {
        &self.resolver
    }
}
