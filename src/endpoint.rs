//! One discovered peer and the lifecycle of the connection to it.
//!
//! ```text
//! DISCOVERED -> CONNECTING -> CONNECTED -> DISCONNECTING
//!      ^             |         |    ^
//!      +-------------+         v    |
//!                       SENDING / RECEIVING
//! ```
//!
//! Every operation checks the current state first and does nothing when it
//! does not apply, so late or duplicated transport callbacks are harmless.

use std::{
    fmt,
    sync::{Arc, RwLock},
};

use tokio::task::JoinHandle;
use url::Url;

use crate::{
    collaborators::TransferStatus,
    envelope,
    errors::{DropError, Result},
    events::{EndpointStateEvent, PacketChange, PacketDirection},
    file::{IncomingFile, OutgoingFile, OutgoingFileState},
    lock,
    packet::{Packet, PacketState, SharedPacket},
    session::DropSession,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EndpointState {
    Discovered,
    Connecting,
    Connected,
    Disconnecting,
    Sending,
    Receiving,
}

impl EndpointState {
    pub fn can_transition_to(self, next: EndpointState) -> bool {
        use EndpointState::*;
        matches!(
            (self, next),
            (Discovered, Connecting)
                | (Connecting, Connected)
                | (Connecting, Discovered)
                | (Connected, Sending)
                | (Connected, Receiving)
                | (Sending, Connected)
                | (Receiving, Connected)
                | (Connected | Sending | Receiving, Disconnecting)
        )
    }

    /// Sending or receiving: the connection is up but occupied.
    pub fn is_busy(self) -> bool {
        matches!(self, Self::Sending | Self::Receiving)
    }

    pub fn is_connected(self) -> bool {
        matches!(self, Self::Connected | Self::Sending | Self::Receiving)
    }
}

impl fmt::Display for EndpointState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Discovered => "Discovered",
            Self::Connecting => "Connecting",
            Self::Connected => "Connected",
            Self::Disconnecting => "Disconnecting",
            Self::Sending => "Sending",
            Self::Receiving => "Receiving",
        };
        f.write_str(label)
    }
}

pub struct Endpoint {
    id: String,
    name: String,
    is_incoming: bool,
    state: RwLock<EndpointState>,
    notification_token: RwLock<Option<String>>,
    session: Arc<DropSession>,
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("is_incoming", &self.is_incoming)
            .field("state", &self.state())
            .finish()
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.name)
    }
}

impl Endpoint {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        is_incoming: bool,
        session: Arc<DropSession>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            is_incoming,
            state: RwLock::new(EndpointState::Discovered),
            notification_token: RwLock::new(None),
            session,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_incoming(&self) -> bool {
        self.is_incoming
    }

    pub fn state(&self) -> EndpointState {
        *lock::read(&self.state)
    }

    pub fn is_busy(&self) -> bool {
        self.state().is_busy()
    }

    pub fn notification_token(&self) -> Option<String> {
        lock::read(&self.notification_token).clone()
    }

    pub fn session(&self) -> &Arc<DropSession> {
        &self.session
    }

    /// Moves to `next` if the graph allows it from the current state.
    pub fn set_state(&self, next: EndpointState) -> bool {
        let current = self.state();
        self.transition(&[current], next)
    }

    pub fn mark_connecting(&self) -> bool {
        self.transition(&[EndpointState::Discovered], EndpointState::Connecting)
    }

    pub fn on_connected(&self) -> bool {
        self.transition(&[EndpointState::Connecting], EndpointState::Connected)
    }

    pub fn on_connection_failed(&self) -> bool {
        self.transition(&[EndpointState::Connecting], EndpointState::Discovered)
    }

    pub fn mark_disconnecting(&self) -> bool {
        self.transition(
            &[
                EndpointState::Connected,
                EndpointState::Sending,
                EndpointState::Receiving,
            ],
            EndpointState::Disconnecting,
        )
    }

    /// The transport started delivering a payload from this endpoint.
    pub fn begin_receiving(&self) -> bool {
        self.transition(&[EndpointState::Connected], EndpointState::Receiving)
    }

    /// Builds a packet out of `resources` and sends it to this endpoint.
    ///
    /// Returns `Ok(None)` without doing anything unless the endpoint is
    /// `Connected`. The packet is added to the outgoing list before the
    /// transport is done with it; the returned bubble tells how the send
    /// ended. Must be called from within a Tokio runtime.
    ///
    /// Errors:
    /// - a resource cannot be resolved; no packet is published and the
    ///   endpoint goes back to `Connected`.
    pub fn send_packet(
        self: &Arc<Self>,
        resources: &[Url],
    ) -> Result<Option<SendPacketBubble>> {
        if !self.transition(&[EndpointState::Connected], EndpointState::Sending) {
            log::debug!(
                "endpoint/{}: not connected ({}), ignoring send",
                self.id,
                self.state()
            );
            return Ok(None);
        }

        let encoded = self
            .build_packet(resources)
            .and_then(|packet| Ok((envelope::encode(&packet)?, packet)));
        let (bytes, packet) = match encoded {
            Ok(encoded) => encoded,
            Err(e) => {
                log::warn!("endpoint/{}: cannot build packet: {}", self.id, e);
                self.transition(&[EndpointState::Sending], EndpointState::Connected);
                return Err(e);
            }
        };

        let packet_id = packet.id.clone();
        log::info!(
            "endpoint/{}: sending packet {} with {} files ({} bytes)",
            self.id,
            packet_id,
            packet.files.len(),
            packet.total_size()
        );

        let packet = packet.into_shared();
        self.session.store().add_outgoing(packet.clone());
        self.set_packet_state(&packet, PacketState::Sending);

        let send = self.session.transport().send(&self.id, bytes);
        let endpoint = self.clone();
        let sent_packet = packet.clone();
        let completion = tokio::spawn(async move {
            let result = send.await;
            endpoint.on_send_complete(&sent_packet, &result);
            result
        });

        Ok(Some(SendPacketBubble {
            packet_id,
            packet,
            completion,
        }))
    }

    /// Progress of an outgoing payload. Only a terminal status while
    /// `Sending` has an effect: the endpoint is `Connected` again.
    pub fn on_packet_transfer_update(&self, status: TransferStatus) {
        if !status.is_terminal() {
            return;
        }
        self.transition(&[EndpointState::Sending], EndpointState::Connected);
    }

    pub fn on_notification_token_received(&self, token: impl Into<String>) {
        let token = token.into();
        log::info!("endpoint/{}: notification token received: {}", self.id, token);
        *lock::write(&self.notification_token) = Some(token);
    }

    /// Decodes a payload delivered by this endpoint and hands the packet to
    /// [`Endpoint::on_packet_received`].
    pub fn on_payload_received(
        &self,
        bytes: &[u8],
    ) -> Result<SharedPacket<IncomingFile>> {
        let decoded = envelope::decode(bytes);
        self.transition(&[EndpointState::Receiving], EndpointState::Connected);

        match decoded {
            Ok(packet) => Ok(self.on_packet_received(packet)),
            Err(e) => {
                log::error!("endpoint/{}: undecodable payload: {}", self.id, e);
                self.session.subscribers().error(
                    Some(&self.id),
                    format!("Cannot read packet from {}: {}", self.name, e),
                );
                Err(e)
            }
        }
    }

    /// Takes in a decoded packet: stamps it as coming from this endpoint,
    /// stores it, highlights it and subscribes it to remote updates.
    ///
    /// A packet id that is already stored is merged into the stored packet,
    /// whose handle is returned.
    pub fn on_packet_received(
        &self,
        mut packet: Packet<IncomingFile>,
    ) -> SharedPacket<IncomingFile> {
        log::info!("endpoint/{}: packet received: {}", self.id, packet.id);
        packet.sender = self.name.clone();
        packet.state = PacketState::Received;
        let packet_id = packet.id.clone();

        let shared = packet.clone().into_shared();
        let stored = match self.session.store().add_incoming(shared.clone()) {
            None => {
                self.session.highlighter().pulse(&shared);
                shared
            }
            Some(existing) => {
                log::debug!(
                    "endpoint/{}: packet {} already stored, merging",
                    self.id,
                    packet_id
                );
                self.session.bridge().merge(&existing, packet);
                if self.session.bridge().is_observing(&packet_id) {
                    return existing;
                }
                // The first observe failed; try again for this copy.
                existing
            }
        };

        if let Err(e) = self.session.bridge().observe(&stored) {
            log::warn!(
                "endpoint/{}: packet {} will not get remote updates: {}",
                self.id,
                packet_id,
                e
            );
        }
        stored
    }

    fn build_packet(&self, resources: &[Url]) -> Result<Packet<OutgoingFile>> {
        let mut packet =
            Packet::new(self.session.local_endpoint_name(), self.name.clone());
        packet.notification_token = self.notification_token();

        for resource in resources {
            let info = self.session.resolver().resolve(resource)?;
            packet.files.push(
                OutgoingFile::new(resource.clone(), info.mime_type)
                    .with_file_size(info.size)
                    .with_state(OutgoingFileState::Loaded),
            );
        }
        Ok(packet)
    }

    fn on_send_complete(
        &self,
        packet: &SharedPacket<OutgoingFile>,
        result: &Result<()>,
    ) {
        match result {
            Ok(()) => {
                log::info!(
                    "endpoint/{}: packet {} sent",
                    self.id,
                    lock::read(packet).id
                );
                self.set_packet_state(packet, PacketState::Sent);
            }
            Err(e) => {
                log::error!("endpoint/{}: cannot send payload: {}", self.id, e);
                self.set_packet_state(packet, PacketState::Loaded);
                self.session.subscribers().error(
                    Some(&self.id),
                    format!("Cannot send packet to {}: {}", self.name, e),
                );
            }
        }
        self.transition(&[EndpointState::Sending], EndpointState::Connected);
    }

    fn set_packet_state(
        &self,
        packet: &SharedPacket<OutgoingFile>,
        state: PacketState,
    ) {
        let id = {
            let mut packet = lock::write(packet);
            packet.state = state;
            packet.id.clone()
        };
        self.session.subscribers().packet_changed(
            &id,
            PacketDirection::Outgoing,
            PacketChange::State(state),
        );
    }

    fn transition(&self, from: &[EndpointState], next: EndpointState) -> bool {
        let previous = {
            let mut state = lock::write(&self.state);
            if !from.contains(&*state) || !state.can_transition_to(next) {
                return false;
            }
            std::mem::replace(&mut *state, next)
        };

        log::debug!("endpoint/{}: {} -> {}", self.id, previous, next);
        self.session
            .subscribers()
            .endpoint_changed(EndpointStateEvent {
                endpoint_id: self.id.clone(),
                name: self.name.clone(),
                previous,
                state: next,
            });
        true
    }
}

/// Handle to a packet handed to the transport.
#[derive(Debug)]
pub struct SendPacketBubble {
    packet_id: String,
    packet: SharedPacket<OutgoingFile>,
    completion: JoinHandle<Result<()>>,
}

impl SendPacketBubble {
    pub fn get_packet_id(&self) -> &str {
        &self.packet_id
    }

    pub fn get_packet(&self) -> SharedPacket<OutgoingFile> {
        self.packet.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.completion.is_finished()
    }

    /// Waits for the transport outcome.
    pub async fn wait(self) -> Result<()> {
        self.completion.await.map_err(|e| {
            DropError::Other(anyhow::anyhow!("send task failed: {}", e))
        })?
    }
}
