//! File entries carried by a [`Packet`](crate::packet::Packet).
//!
//! Both kinds share the attributes described by [`PacketFile`]; everything
//! else (local resource, download destination, transfer state) is local to
//! one side of the exchange and never leaves the device.

use std::path::PathBuf;

use url::Url;
use uuid::Uuid;

/// Attributes common to outgoing and incoming file entries. These are the
/// ones that travel in the wire envelope.
pub trait PacketFile: Clone + std::fmt::Debug + Send + Sync + 'static {
    fn id(&self) -> &str;
    fn mime_type(&self) -> &str;
    fn file_size(&self) -> u64;
    fn remote_path(&self) -> Option<&str>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OutgoingFileState {
    Loading,
    Loaded,
}

/// A local file selected for sending.
#[derive(Clone, Debug, PartialEq)]
pub struct OutgoingFile {
    pub id: String,
    pub mime_type: String,
    /// Size in bytes, read once when the packet is built.
    pub file_size: u64,
    pub resource: Url,
    pub state: OutgoingFileState,
}

impl OutgoingFile {
    pub fn new(resource: Url, mime_type: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            mime_type: mime_type.into(),
            file_size: 0,
            resource,
            state: OutgoingFileState::Loading,
        }
    }

    pub fn with_file_size(mut self, file_size: u64) -> Self {
        self.file_size = file_size;
        self
    }

    pub fn with_state(mut self, state: OutgoingFileState) -> Self {
        self.state = state;
        self
    }
}

impl PacketFile for OutgoingFile {
    fn id(&self) -> &str {
        &self.id
    }

    fn mime_type(&self) -> &str {
        &self.mime_type
    }

    fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Not known yet: the receiving side learns it from the remote database.
    fn remote_path(&self) -> Option<&str> {
        None
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IncomingFileState {
    Received,
    Downloading,
    Downloaded,
}

/// A file announced by a peer. It has to be downloaded from durable storage
/// before it is available locally.
#[derive(Clone, Debug, PartialEq)]
pub struct IncomingFile {
    pub id: String,
    pub mime_type: String,
    pub file_size: u64,
    pub remote_path: Option<String>,
    /// Where the downloaded content goes. Local only.
    pub destination: Option<PathBuf>,
    /// Local only. Every decoded file starts as `Received`.
    pub state: IncomingFileState,
}

impl IncomingFile {
    pub fn new(
        id: impl Into<String>,
        mime_type: impl Into<String>,
        file_size: u64,
        remote_path: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            mime_type: mime_type.into(),
            file_size,
            remote_path,
            destination: None,
            state: IncomingFileState::Received,
        }
    }

    pub fn with_destination(mut self, destination: PathBuf) -> Self {
        self.destination = Some(destination);
        self
    }

    pub fn is_busy(&self) -> bool {
        self.state == IncomingFileState::Downloading
    }

    pub fn can_download(&self) -> bool {
        self.state == IncomingFileState::Received
    }

    /// Takes the shared attributes of `other`, keeping the local state and
    /// destination of `self`.
    pub(crate) fn refresh_from(&mut self, other: &IncomingFile) {
        self.mime_type = other.mime_type.clone();
        self.file_size = other.file_size;
        self.remote_path = other.remote_path.clone();
    }
}

impl PacketFile for IncomingFile {
    fn id(&self) -> &str {
        &self.id
    }

    fn mime_type(&self) -> &str {
        &self.mime_type
    }

    fn file_size(&self) -> u64 {
        self.file_size
    }

    fn remote_path(&self) -> Option<&str> {
        self.remote_path.as_deref()
    }
}
