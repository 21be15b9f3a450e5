//! The outgoing and incoming packet collections of one drop session.
//!
//! Packets are only ever appended. Readers get a copy of the list of
//! handles, so iterating never blocks an append and never sees a half
//! written entry.

use std::sync::{Arc, RwLock};

use crate::{
    events::{PacketChange, PacketDirection, Subscribers},
    file::{IncomingFile, OutgoingFile},
    lock,
    packet::SharedPacket,
};

pub struct PacketStore {
    outgoing: RwLock<Vec<SharedPacket<OutgoingFile>>>,
    incoming: RwLock<Vec<SharedPacket<IncomingFile>>>,
    subscribers: Arc<Subscribers>,
}

impl PacketStore {
    pub fn new(subscribers: Arc<Subscribers>) -> Self {
        Self {
            outgoing: RwLock::new(Vec::new()),
            incoming: RwLock::new(Vec::new()),
            subscribers,
        }
    }

    pub fn add_outgoing(&self, packet: SharedPacket<OutgoingFile>) {
        let id = lock::read(&packet).id.clone();
        lock::write(&self.outgoing).push(packet);
        log::debug!("store: outgoing packet {} added", id);
        self.subscribers
            .packet_changed(&id, PacketDirection::Outgoing, PacketChange::Added);
    }

    /// Adds `packet` unless an incoming packet with the same id is already
    /// stored, in which case that one is returned and nothing is added.
    pub fn add_incoming(
        &self,
        packet: SharedPacket<IncomingFile>,
    ) -> Option<SharedPacket<IncomingFile>> {
        let id = lock::read(&packet).id.clone();
        {
            let mut incoming = lock::write(&self.incoming);
            if let Some(existing) = incoming.iter().find(|p| lock::read(p).id == id) {
                return Some(existing.clone());
            }
            incoming.push(packet);
        }
        log::debug!("store: incoming packet {} added", id);
        self.subscribers
            .packet_changed(&id, PacketDirection::Incoming, PacketChange::Added);
        None
    }

    pub fn outgoing(&self) -> Vec<SharedPacket<OutgoingFile>> {
        lock::read(&self.outgoing).clone()
    }

    pub fn incoming(&self) -> Vec<SharedPacket<IncomingFile>> {
        lock::read(&self.incoming).clone()
    }

    pub fn find_outgoing(&self, packet_id: &str) -> Option<SharedPacket<OutgoingFile>> {
        lock::read(&self.outgoing)
            .iter()
            .find(|p| lock::read(p).id == packet_id)
            .cloned()
    }

    pub fn find_incoming(&self, packet_id: &str) -> Option<SharedPacket<IncomingFile>> {
        lock::read(&self.incoming)
            .iter()
            .find(|p| lock::read(p).id == packet_id)
            .cloned()
    }
}
