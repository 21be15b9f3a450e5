//! Packets: one bundle of files exchanged in a single logical transfer.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::file::{IncomingFile, IncomingFileState, PacketFile};

/// Coarse packet-level progress.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PacketState {
    Loaded,
    Sending,
    Sent,
    Received,
}

/// A packet held by several owners at once (store, endpoint, reconciliation
/// bridge, highlight timer). Merges happen in place behind the lock.
pub type SharedPacket<F> = Arc<RwLock<Packet<F>>>;

#[derive(Clone, Debug, PartialEq)]
pub struct Packet<F> {
    pub id: String,
    pub sender: String,
    pub receiver: String,
    pub state: PacketState,
    pub notification_token: Option<String>,
    /// Transient "just updated" flag, never serialized.
    pub highlighted: bool,
    pub files: Vec<F>,
}

impl<F: PacketFile> Packet<F> {
    pub fn new(sender: impl Into<String>, receiver: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), sender, receiver)
    }

    pub fn with_id(
        id: impl Into<String>,
        sender: impl Into<String>,
        receiver: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            sender: sender.into(),
            receiver: receiver.into(),
            state: PacketState::Loaded,
            notification_token: None,
            highlighted: false,
            files: Vec::new(),
        }
    }

    pub fn into_shared(self) -> SharedPacket<F> {
        Arc::new(RwLock::new(self))
    }

    pub fn file(&self, file_id: &str) -> Option<&F> {
        self.files.iter().find(|f| f.id() == file_id)
    }

    /// Sum of the declared sizes of every file.
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.file_size()).sum()
    }
}

impl Packet<IncomingFile> {
    pub fn file_mut(&mut self, file_id: &str) -> Option<&mut IncomingFile> {
        self.files.iter_mut().find(|f| f.id == file_id)
    }

    /// Merges a later snapshot of the same packet into `self`.
    ///
    /// `sender` keeps the routing name stamped when the packet arrived. Files
    /// are matched by id: matching entries keep their local state and
    /// destination, new entries are appended, missing ones are dropped.
    pub fn merge(&mut self, snapshot: Packet<IncomingFile>) {
        self.receiver = snapshot.receiver;
        self.state = snapshot.state;
        if snapshot.notification_token.is_some() {
            self.notification_token = snapshot.notification_token;
        }

        let mut incoming: HashMap<String, IncomingFile> = HashMap::new();
        let mut order = Vec::with_capacity(snapshot.files.len());
        for file in snapshot.files {
            order.push(file.id.clone());
            incoming.insert(file.id.clone(), file);
        }

        self.files.retain_mut(|file| match incoming.remove(&file.id) {
            Some(remote) => {
                file.refresh_from(&remote);
                true
            }
            None => false,
        });

        for id in order {
            if let Some(mut file) = incoming.remove(&id) {
                file.state = IncomingFileState::Received;
                file.destination = None;
                self.files.push(file);
            }
        }
    }
}
