//! Receiving side of a file transfer: RECEIVED -> DOWNLOADING -> DOWNLOADED.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use uuid::Uuid;

use crate::{
    collaborators::Storage,
    errors::{DropError, Result},
    events::Subscribers,
    file::{IncomingFile, IncomingFileState},
    lock,
    packet::SharedPacket,
};

pub struct FileDownloader {
    storage: Arc<dyn Storage>,
    download_dir: PathBuf,
    subscribers: Arc<Subscribers>,
}

impl FileDownloader {
    pub fn new(
        storage: Arc<dyn Storage>,
        download_dir: PathBuf,
        subscribers: Arc<Subscribers>,
    ) -> Self {
        Self {
            storage,
            download_dir,
            subscribers,
        }
    }

    /// Downloads one file of `packet`.
    ///
    /// Only a file in `Received` is downloaded; for any other state this
    /// returns `Ok(())` right away and changes nothing. A storage failure
    /// puts the file back to `Received` so the call can be repeated.
    pub async fn download(
        &self,
        packet: &SharedPacket<IncomingFile>,
        file_id: &str,
    ) -> Result<()> {
        let (packet_id, remote_path, destination) = {
            let mut packet = lock::write(packet);
            let packet_id = packet.id.clone();
            let file = packet
                .file_mut(file_id)
                .ok_or_else(|| DropError::UnknownFile(file_id.to_owned()))?;

            if !file.can_download() {
                log::debug!(
                    "packet/{}: file {} is {:?}, skipping download",
                    packet_id,
                    file_id,
                    file.state
                );
                return Ok(());
            }
            let Some(remote_path) = file.remote_path.clone() else {
                log::warn!(
                    "packet/{}: file {} has no remote path yet, skipping download",
                    packet_id,
                    file_id
                );
                return Ok(());
            };

            let destination = match &file.destination {
                Some(destination) => destination.clone(),
                None => {
                    let destination =
                        destination_for(&self.download_dir, &remote_path);
                    file.destination = Some(destination.clone());
                    destination
                }
            };
            file.state = IncomingFileState::Downloading;
            (packet_id, remote_path, destination)
        };
        self.subscribers.file_changed(
            &packet_id,
            file_id,
            IncomingFileState::Downloading,
        );

        log::debug!(
            "packet/{}: downloading {} into {}",
            packet_id,
            remote_path,
            destination.display()
        );
        let result = self
            .storage
            .download(&remote_path, &destination)
            .await;

        let state = match result {
            Ok(()) => IncomingFileState::Downloaded,
            Err(_) => IncomingFileState::Received,
        };
        if let Some(file) = lock::write(packet).file_mut(file_id) {
            file.state = state;
        }
        self.subscribers
            .file_changed(&packet_id, file_id, state);

        match result {
            Ok(()) => {
                log::info!("packet/{}: file {} downloaded", packet_id, file_id);
                Ok(())
            }
            Err(e) => {
                log::warn!(
                    "packet/{}: download of {} failed: {}",
                    packet_id,
                    file_id,
                    e
                );
                Err(e)
            }
        }
    }

    /// Downloads every file of `packet` that is still `Received`, one after
    /// the other. Returns true once all files are `Downloaded`.
    pub async fn download_all(
        &self,
        packet: &SharedPacket<IncomingFile>,
    ) -> bool {
        let file_ids: Vec<String> = lock::read(packet)
            .files
            .iter()
            .filter(|f| f.can_download())
            .map(|f| f.id.clone())
            .collect();

        for file_id in file_ids {
            // failures are already reflected in the file state
            let _ = self.download(packet, &file_id).await;
        }

        lock::read(packet)
            .files
            .iter()
            .all(|f| f.state == IncomingFileState::Downloaded)
    }
}

/// Fresh local path for a download, keeping the extension of the remote
/// object.
fn destination_for(download_dir: &Path, remote_path: &str) -> PathBuf {
    let extension = Path::new(remote_path)
        .extension()
        .and_then(|e| e.to_str());
    let name = match extension {
        Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
        None => Uuid::new_v4().to_string(),
    };
    download_dir.join(name)
}
