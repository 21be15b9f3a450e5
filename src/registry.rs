//! Endpoints known to the session, keyed by the transport's endpoint id.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use crate::{
    collaborators::TransferStatus,
    endpoint::Endpoint,
    errors::Result,
    file::IncomingFile,
    lock,
    packet::SharedPacket,
    session::DropSession,
};

pub struct EndpointRegistry {
    session: Arc<DropSession>,
    endpoints: RwLock<HashMap<String, Arc<Endpoint>>>,
}

impl EndpointRegistry {
    pub fn new(session: Arc<DropSession>) -> Self {
        Self {
            session,
            endpoints: RwLock::new(HashMap::new()),
        }
    }

    pub fn session(&self) -> &Arc<DropSession> {
        &self.session
    }

    /// Registers a discovered endpoint. Discovering an id twice returns the
    /// endpoint registered first, with its state untouched.
    pub fn on_endpoint_found(
        &self,
        id: &str,
        name: &str,
        is_incoming: bool,
    ) -> Arc<Endpoint> {
        let mut endpoints = lock::write(&self.endpoints);
        if let Some(existing) = endpoints.get(id) {
            log::debug!("registry: {} rediscovered", existing);
            return existing.clone();
        }

        let endpoint = Arc::new(Endpoint::new(
            id,
            name,
            is_incoming,
            self.session.clone(),
        ));
        log::info!("registry: endpoint {} found", endpoint);
        endpoints.insert(id.to_owned(), endpoint.clone());
        endpoint
    }

    pub fn on_endpoint_lost(&self, id: &str) -> Option<Arc<Endpoint>> {
        let removed = lock::write(&self.endpoints).remove(id);
        match &removed {
            Some(endpoint) => log::info!("registry: endpoint {} lost", endpoint),
            None => log::debug!("registry: unknown endpoint {} lost", id),
        }
        removed
    }

    pub fn get(&self, id: &str) -> Option<Arc<Endpoint>> {
        lock::read(&self.endpoints).get(id).cloned()
    }

    pub fn endpoints(&self) -> Vec<Arc<Endpoint>> {
        let mut endpoints: Vec<Arc<Endpoint>> =
            lock::read(&self.endpoints).values().cloned().collect();
        endpoints.sort_by(|a, b| a.id().cmp(b.id()));
        endpoints
    }

    /// Routes a payload from the transport to the endpoint that sent it.
    /// Payloads from unknown endpoints are dropped.
    pub fn on_payload_received(
        &self,
        id: &str,
        bytes: &[u8],
    ) -> Result<Option<SharedPacket<IncomingFile>>> {
        let Some(endpoint) = self.get(id) else {
            log::warn!("registry: payload from unknown endpoint {}", id);
            return Ok(None);
        };
        endpoint.on_payload_received(bytes).map(Some)
    }

    pub fn on_transfer_progress(&self, id: &str, status: TransferStatus) {
        if let Some(endpoint) = self.get(id) {
            endpoint.on_packet_transfer_update(status);
        }
    }
}
