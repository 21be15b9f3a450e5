//! Wire envelope exchanged as payload bytes between peers.
//!
//! A packet travels as a single JSON object. Files are keyed by their id
//! instead of being listed in order, so the remote database can address and
//! patch a single file:
//!
//! ```json
//! {
//!   "id": "6f1c...",
//!   "sender": "Phone A",
//!   "receiver": "Phone B",
//!   "state": "LOADED",
//!   "notificationToken": "dUcj...",
//!   "files": {
//!     "0b9e...": { "mimeType": "image/jpeg", "fileSize": 204800 }
//!   }
//! }
//! ```
//!
//! Decoding yields files ordered by id. The order the sender used is not
//! preserved.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    errors::Result,
    file::{IncomingFile, PacketFile},
    packet::{Packet, PacketState},
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PacketEnvelope {
    pub id: String,
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub receiver: String,
    pub state: PacketState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_token: Option<String>,
    #[serde(default)]
    pub files: BTreeMap<String, FileEnvelope>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEnvelope {
    pub mime_type: String,
    pub file_size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_path: Option<String>,
}

impl<F: PacketFile> From<&Packet<F>> for PacketEnvelope {
    fn from(packet: &Packet<F>) -> Self {
        Self {
            id: packet.id.clone(),
            sender: packet.sender.clone(),
            receiver: packet.receiver.clone(),
            state: packet.state,
            notification_token: packet.notification_token.clone(),
            files: packet
                .files
                .iter()
                .map(|f| {
                    (
                        f.id().to_owned(),
                        FileEnvelope {
                            mime_type: f.mime_type().to_owned(),
                            file_size: f.file_size(),
                            remote_path: f.remote_path().map(str::to_owned),
                        },
                    )
                })
                .collect(),
        }
    }
}

impl From<PacketEnvelope> for Packet<IncomingFile> {
    fn from(envelope: PacketEnvelope) -> Self {
        let mut packet =
            Packet::with_id(envelope.id, envelope.sender, envelope.receiver);
        packet.state = envelope.state;
        packet.notification_token = envelope.notification_token;
        packet.files = envelope
            .files
            .into_iter()
            .map(|(id, f)| {
                IncomingFile::new(id, f.mime_type, f.file_size, f.remote_path)
            })
            .collect();
        packet
    }
}

/// Serializes a packet into payload bytes.
pub fn encode<F: PacketFile>(packet: &Packet<F>) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(&PacketEnvelope::from(packet))?)
}

/// Parses payload bytes into a packet of incoming files.
pub fn decode(bytes: &[u8]) -> Result<Packet<IncomingFile>> {
    let envelope: PacketEnvelope = serde_json::from_slice(bytes)?;
    Ok(envelope.into())
}
