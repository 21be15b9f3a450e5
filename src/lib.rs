//! Peer-to-peer packet exchange between nearby devices.
//!
//! An [`endpoint::Endpoint`] is one discovered peer. Connected endpoints send
//! [`packet::Packet`]s of [`file::OutgoingFile`]s, encoded by [`envelope`],
//! over an abstract [`collaborators::Transport`]. On the receiving side the
//! decoded packet of [`file::IncomingFile`]s is stored, briefly highlighted
//! and kept in sync with a [`collaborators::RemoteDatabase`] by the
//! [`reconcile::ReconciliationBridge`]. Files are then fetched one by one from
//! [`collaborators::Storage`] by the [`download::FileDownloader`].
//!
//! Every state change is published to the [`events::DropSubscriber`]s of the
//! [`session::DropSession`].

pub mod collaborators;
pub mod config;
pub mod download;
pub mod endpoint;
pub mod envelope;
pub mod errors;
pub mod events;
pub mod file;
pub mod highlight;
pub mod packet;
pub mod reconcile;
pub mod registry;
pub mod session;
pub mod store;

mod lock;

pub use config::DropConfig;
pub use endpoint::{Endpoint, EndpointState, SendPacketBubble};
pub use errors::{DropError, Result};
pub use file::{IncomingFile, IncomingFileState, OutgoingFile, OutgoingFileState};
pub use packet::{Packet, PacketState, SharedPacket};
pub use registry::EndpointRegistry;
pub use session::{Collaborators, DropSession};
