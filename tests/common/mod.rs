#![allow(dead_code)]

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use drop_packets::{
    collaborators::{
        RemoteDatabase, ResourceInfo, ResourceResolver, SnapshotCallback, Storage,
        Subscription, Transport,
    },
    events::{
        DropSubscriber, EndpointStateEvent, ErrorEvent, FileStateEvent, PacketEvent,
    },
    Collaborators, DropConfig, DropError, DropSession, Endpoint, EndpointRegistry,
    IncomingFile, Packet, Result,
};
use futures::future::BoxFuture;
use url::Url;

/// Delivers payloads straight into the registry of the linked device.
#[derive(Default)]
pub struct LoopbackTransport {
    peer: Mutex<Option<(Arc<EndpointRegistry>, String)>>,
    failures: AtomicUsize,
    pub sent: AtomicUsize,
}

impl LoopbackTransport {
    /// `local_id` is the id this device has in the peer's registry.
    pub fn link(&self, peer: Arc<EndpointRegistry>, local_id: &str) {
        *self.peer.lock().unwrap() = Some((peer, local_id.to_owned()));
    }

    pub fn fail_next(&self) {
        self.failures.fetch_add(1, Ordering::SeqCst);
    }
}

impl Transport for LoopbackTransport {
    fn send(&self, endpoint_id: &str, bytes: Vec<u8>) -> BoxFuture<'static, Result<()>> {
        self.sent.fetch_add(1, Ordering::SeqCst);
        let fail = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        let peer = self.peer.lock().unwrap().clone();
        let target = endpoint_id.to_owned();

        Box::pin(async move {
            tokio::task::yield_now().await;
            if fail {
                return Err(DropError::Transport(format!("{} out of range", target)));
            }
            let Some((registry, from)) = peer else {
                return Err(DropError::Transport("not linked".to_owned()));
            };
            if let Some(endpoint) = registry.get(&from) {
                endpoint.begin_receiving();
            }
            registry.on_payload_received(&from, &bytes).map(|_| ())
        })
    }
}

/// Bucket of remote objects kept in a local directory.
pub struct DirStorage {
    root: PathBuf,
    failures: AtomicUsize,
    pub calls: AtomicUsize,
}

impl DirStorage {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_owned(),
            failures: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn put(&self, remote_path: &str, content: &[u8]) {
        let path = self.root.join(remote_path);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    pub fn fail_next(&self) {
        self.failures.fetch_add(1, Ordering::SeqCst);
    }
}

impl Storage for DirStorage {
    fn download(
        &self,
        remote_path: &str,
        destination: &Path,
    ) -> BoxFuture<'static, Result<()>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let fail = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        let source = self.root.join(remote_path);
        let destination = destination.to_owned();

        Box::pin(async move {
            if fail {
                return Err(DropError::Storage("connection reset".to_owned()));
            }
            if let Some(parent) = destination.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| DropError::Storage(e.to_string()))?;
            }
            tokio::fs::copy(&source, &destination)
                .await
                .map_err(|e| DropError::Storage(e.to_string()))?;
            Ok(())
        })
    }
}

type Observers = Arc<Mutex<HashMap<String, SnapshotCallback>>>;

#[derive(Default)]
pub struct InMemoryDatabase {
    observers: Observers,
}

impl InMemoryDatabase {
    /// Pushes a snapshot to whoever observes its packet. Returns false when
    /// nobody does.
    pub fn publish(&self, snapshot: Packet<IncomingFile>) -> bool {
        let observer = self.observers.lock().unwrap().get(&snapshot.id).cloned();
        match observer {
            Some(observer) => {
                observer(snapshot);
                true
            }
            None => false,
        }
    }

    pub fn is_observed(&self, packet_id: &str) -> bool {
        self.observers.lock().unwrap().contains_key(packet_id)
    }
}

impl RemoteDatabase for InMemoryDatabase {
    fn observe(&self, packet_id: &str, on_update: SnapshotCallback) -> Result<Subscription> {
        self.observers
            .lock()
            .unwrap()
            .insert(packet_id.to_owned(), on_update);
        let observers = Arc::downgrade(&self.observers);
        let id = packet_id.to_owned();
        Ok(Subscription::with_cancel(packet_id, move || {
            if let Some(observers) = observers.upgrade() {
                observers.lock().unwrap().remove(&id);
            }
        }))
    }
}

/// Resolves `file://` urls against the local filesystem.
pub struct FileResolver;

impl ResourceResolver for FileResolver {
    fn resolve(&self, resource: &Url) -> Result<ResourceInfo> {
        let path = resource
            .to_file_path()
            .map_err(|_| DropError::resource(resource, "not a local file"))?;
        let metadata =
            std::fs::metadata(&path).map_err(|e| DropError::resource(resource, e))?;

        let mime_type = match path.extension().and_then(|e| e.to_str()) {
            Some("jpg") | Some("jpeg") => "image/jpeg",
            Some("png") => "image/png",
            Some("txt") => "text/plain",
            _ => "application/octet-stream",
        };
        Ok(ResourceInfo {
            mime_type: mime_type.to_owned(),
            size: metadata.len(),
        })
    }
}

#[derive(Default)]
pub struct EventLog {
    pub endpoints: Mutex<Vec<EndpointStateEvent>>,
    pub packets: Mutex<Vec<PacketEvent>>,
    pub files: Mutex<Vec<FileStateEvent>>,
    pub errors: Mutex<Vec<ErrorEvent>>,
}

impl DropSubscriber for EventLog {
    fn get_id(&self) -> String {
        "event-log".to_owned()
    }

    fn notify_endpoint(&self, event: EndpointStateEvent) {
        self.endpoints.lock().unwrap().push(event);
    }

    fn notify_packet(&self, event: PacketEvent) {
        self.packets.lock().unwrap().push(event);
    }

    fn notify_file(&self, event: FileStateEvent) {
        self.files.lock().unwrap().push(event);
    }

    fn notify_error(&self, event: ErrorEvent) {
        self.errors.lock().unwrap().push(event);
    }
}

pub struct Device {
    pub id: String,
    pub registry: Arc<EndpointRegistry>,
    pub transport: Arc<LoopbackTransport>,
    pub storage: Arc<DirStorage>,
    pub database: Arc<InMemoryDatabase>,
    pub events: Arc<EventLog>,
}

impl Device {
    /// A device named `name` whose downloads land under `root/<id>` and
    /// whose storage bucket is `root/bucket`, shared by all devices.
    pub fn new(id: &str, name: &str, root: &Path) -> Self {
        let transport = Arc::new(LoopbackTransport::default());
        let storage = Arc::new(DirStorage::new(&root.join("bucket")));
        let database = Arc::new(InMemoryDatabase::default());
        let events = Arc::new(EventLog::default());

        let mut config = DropConfig::new(name);
        config.download_dir = Some(root.join(id));
        let session = DropSession::new(
            config,
            Collaborators {
                transport: transport.clone(),
                storage: storage.clone(),
                database: database.clone(),
                resolver: Arc::new(FileResolver),
            },
        );
        session.subscribe(events.clone());

        Self {
            id: id.to_owned(),
            registry: Arc::new(EndpointRegistry::new(session)),
            transport,
            storage,
            database,
            events,
        }
    }

    pub fn session(&self) -> &Arc<DropSession> {
        self.registry.session()
    }

    pub fn name(&self) -> &str {
        self.session().local_endpoint_name()
    }
}

/// Discovers and connects the two devices to each other. Returns the
/// endpoint `a` uses for `b` and the one `b` uses for `a`.
pub fn pair(a: &Device, b: &Device) -> (Arc<Endpoint>, Arc<Endpoint>) {
    a.transport.link(b.registry.clone(), &a.id);
    b.transport.link(a.registry.clone(), &b.id);

    let to_b = a.registry.on_endpoint_found(&b.id, b.name(), false);
    let to_a = b.registry.on_endpoint_found(&a.id, a.name(), true);
    for endpoint in [&to_b, &to_a] {
        assert!(endpoint.mark_connecting());
        assert!(endpoint.on_connected());
    }
    (to_b, to_a)
}

pub fn local_file(dir: &Path, name: &str, content: &[u8]) -> Url {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    Url::from_file_path(path).unwrap()
}
