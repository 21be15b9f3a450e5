//! State change notifications.
//!
//! Everything observable about endpoints, packets and files is reported to
//! the [`DropSubscriber`]s registered on a shared [`Subscribers`] hub. How a
//! subscriber turns events into UI updates is up to it.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use crate::{
    endpoint::EndpointState, file::IncomingFileState, lock, packet::PacketState,
};

pub trait DropSubscriber: Send + Sync {
    fn get_id(&self) -> String;
    fn notify_endpoint(&self, event: EndpointStateEvent);
    fn notify_packet(&self, event: PacketEvent);
    fn notify_file(&self, event: FileStateEvent);
    fn notify_error(&self, event: ErrorEvent);
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EndpointStateEvent {
    pub endpoint_id: String,
    pub name: String,
    pub previous: EndpointState,
    pub state: EndpointState,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PacketDirection {
    Outgoing,
    Incoming,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PacketChange {
    Added,
    State(PacketState),
    Merged,
    Highlighted(bool),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PacketEvent {
    pub packet_id: String,
    pub direction: PacketDirection,
    pub change: PacketChange,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileStateEvent {
    pub packet_id: String,
    pub file_id: String,
    pub state: IncomingFileState,
}

/// A failure the user should hear about.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorEvent {
    pub endpoint_id: Option<String>,
    pub message: String,
}

#[derive(Default)]
pub struct Subscribers {
    inner: RwLock<HashMap<String, Arc<dyn DropSubscriber>>>,
}

impl Subscribers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, subscriber: Arc<dyn DropSubscriber>) {
        lock::write(&self.inner).insert(subscriber.get_id(), subscriber);
    }

    pub fn unsubscribe(&self, subscriber: Arc<dyn DropSubscriber>) {
        lock::write(&self.inner).remove(&subscriber.get_id());
    }

    pub fn len(&self) -> usize {
        lock::read(&self.inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn endpoint_changed(&self, event: EndpointStateEvent) {
        self.each(|s| s.notify_endpoint(event.clone()));
    }

    pub fn packet_changed(
        &self,
        packet_id: &str,
        direction: PacketDirection,
        change: PacketChange,
    ) {
        let event = PacketEvent {
            packet_id: packet_id.to_owned(),
            direction,
            change,
        };
        self.each(|s| s.notify_packet(event.clone()));
    }

    pub fn file_changed(
        &self,
        packet_id: &str,
        file_id: &str,
        state: IncomingFileState,
    ) {
        let event = FileStateEvent {
            packet_id: packet_id.to_owned(),
            file_id: file_id.to_owned(),
            state,
        };
        self.each(|s| s.notify_file(event.clone()));
    }

    pub fn error(&self, endpoint_id: Option<&str>, message: impl Into<String>) {
        let event = ErrorEvent {
            endpoint_id: endpoint_id.map(str::to_owned),
            message: message.into(),
        };
        self.each(|s| s.notify_error(event.clone()));
    }

    // Subscribers are collected first so a callback may (un)subscribe.
    fn each(&self, f: impl Fn(&Arc<dyn DropSubscriber>)) {
        let subscribers: Vec<Arc<dyn DropSubscriber>> =
            lock::read(&self.inner).values().cloned().collect();
        subscribers.iter().for_each(f);
    }
}
