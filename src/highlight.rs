//! Transient "just updated" flag on incoming packets.
//!
//! A pulse sets `highlighted` and schedules clearing it. Pulsing a packet
//! whose clear is still pending cancels that clear and schedules a new one,
//! so there is at most one pending clear per packet and the flag always
//! drops one full duration after the last pulse.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use tokio::{runtime::Handle, task::JoinHandle};

use crate::{
    events::{PacketChange, PacketDirection, Subscribers},
    file::IncomingFile,
    lock,
    packet::SharedPacket,
};

#[derive(Default)]
struct Pending {
    generation: u64,
    clears: HashMap<String, (u64, JoinHandle<()>)>,
}

#[derive(Clone)]
pub struct Highlighter {
    duration: Duration,
    pending: Arc<Mutex<Pending>>,
    subscribers: Arc<Subscribers>,
    runtime: Option<Handle>,
}

impl Highlighter {
    /// Timers run on the current Tokio runtime, if any, so pulses coming
    /// from threads outside the runtime are still cleared.
    pub fn new(duration: Duration, subscribers: Arc<Subscribers>) -> Self {
        Self {
            duration,
            pending: Arc::new(Mutex::new(Pending::default())),
            subscribers,
            runtime: Handle::try_current().ok(),
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Highlights `packet` and (re)schedules the clear.
    pub fn pulse(&self, packet: &SharedPacket<IncomingFile>) {
        let Some(runtime) =
            Handle::try_current().ok().or_else(|| self.runtime.clone())
        else {
            log::error!("highlight: no runtime to schedule the clear on");
            return;
        };

        let id = {
            let mut pending = lock::lock(&self.pending);
            let id = {
                let mut packet = lock::write(packet);
                packet.highlighted = true;
                packet.id.clone()
            };

            pending.generation += 1;
            let generation = pending.generation;
            if let Some((_, previous)) = pending.clears.remove(&id) {
                log::debug!("packet/{}: rescheduling highlight clear", id);
                previous.abort();
            }

            let clear = runtime.spawn(Self::clear_later(
                self.clone(),
                packet.clone(),
                id.clone(),
                generation,
            ));
            pending.clears.insert(id.clone(), (generation, clear));
            id
        };

        self.subscribers.packet_changed(
            &id,
            PacketDirection::Incoming,
            PacketChange::Highlighted(true),
        );
    }

    /// True while a clear is scheduled for the packet.
    pub fn is_pending(&self, packet_id: &str) -> bool {
        lock::lock(&self.pending)
            .clears
            .contains_key(packet_id)
    }

    async fn clear_later(
        self,
        packet: SharedPacket<IncomingFile>,
        id: String,
        generation: u64,
    ) {
        tokio::time::sleep(self.duration).await;

        {
            let mut pending = lock::lock(&self.pending);
            match pending.clears.get(&id) {
                Some((current, _)) if *current == generation => {
                    pending.clears.remove(&id);
                }
                // superseded by a newer pulse
                _ => return,
            }
            lock::write(&packet).highlighted = false;
        }

        log::debug!("packet/{}: highlight cleared", id);
        self.subscribers.packet_changed(
            &id,
            PacketDirection::Incoming,
            PacketChange::Highlighted(false),
        );
    }
}
