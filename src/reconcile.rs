//! Keeps received packets in sync with the remote database.
//!
//! Every snapshot the database delivers for an observed packet is merged into
//! the packet the store already holds, so anything holding that packet sees
//! the update without fetching it again.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use crate::{
    collaborators::{RemoteDatabase, SnapshotCallback, Subscription},
    errors::Result,
    events::{PacketChange, PacketDirection, Subscribers},
    file::IncomingFile,
    highlight::Highlighter,
    lock,
    packet::{Packet, SharedPacket},
};

pub struct ReconciliationBridge {
    database: Arc<dyn RemoteDatabase>,
    highlighter: Highlighter,
    subscribers: Arc<Subscribers>,
    subscriptions: Mutex<HashMap<String, Subscription>>,
}

impl ReconciliationBridge {
    pub fn new(
        database: Arc<dyn RemoteDatabase>,
        highlighter: Highlighter,
        subscribers: Arc<Subscribers>,
    ) -> Self {
        Self {
            database,
            highlighter,
            subscribers,
            subscriptions: Mutex::new(HashMap::new()),
        }
    }

    /// Subscribes `packet` to remote updates. Observing the same packet id
    /// again replaces the earlier subscription.
    pub fn observe(&self, packet: &SharedPacket<IncomingFile>) -> Result<()> {
        let packet_id = lock::read(packet).id.clone();

        let target = packet.clone();
        let highlighter = self.highlighter.clone();
        let subscribers = self.subscribers.clone();
        let on_update: SnapshotCallback = Arc::new(move |snapshot| {
            merge_snapshot(&target, snapshot, &highlighter, &subscribers);
        });

        // Databases may cancel by packet id, so the old subscription has to be
        // gone before the new one is registered.
        let previous = lock::lock(&self.subscriptions).remove(&packet_id);
        if previous.is_some() {
            log::debug!("packet/{}: replacing remote subscription", packet_id);
        }
        drop(previous);

        let subscription = self.database.observe(&packet_id, on_update)?;
        log::debug!("packet/{}: observing remote updates", packet_id);
        lock::lock(&self.subscriptions).insert(packet_id, subscription);
        Ok(())
    }

    /// Merges `update` into `packet` the same way a remote snapshot is.
    pub(crate) fn merge(
        &self,
        packet: &SharedPacket<IncomingFile>,
        update: Packet<IncomingFile>,
    ) {
        merge_snapshot(packet, update, &self.highlighter, &self.subscribers);
    }

    /// Drops the subscription of `packet_id`. Returns false if there was none.
    pub fn forget(&self, packet_id: &str) -> bool {
        let removed = lock::lock(&self.subscriptions).remove(packet_id);
        removed.is_some()
    }

    pub fn is_observing(&self, packet_id: &str) -> bool {
        lock::lock(&self.subscriptions).contains_key(packet_id)
    }
}

fn merge_snapshot(
    packet: &SharedPacket<IncomingFile>,
    snapshot: Packet<IncomingFile>,
    highlighter: &Highlighter,
    subscribers: &Subscribers,
) {
    let id = {
        let mut packet = lock::write(packet);
        if snapshot.id != packet.id {
            log::warn!(
                "packet/{}: ignoring snapshot of packet {}",
                packet.id,
                snapshot.id
            );
            return;
        }
        packet.merge(snapshot);
        log::debug!(
            "packet/{}: merged remote snapshot, {} files",
            packet.id,
            packet.files.len()
        );
        packet.id.clone()
    };

    subscribers.packet_changed(&id, PacketDirection::Incoming, PacketChange::Merged);
    highlighter.pulse(packet);
}
