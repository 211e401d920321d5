use std::path::PathBuf;
use std::sync::Arc;

use crate::archive_import::ArchiveImporter;
use crate::ports::import_dispatcher::ImportDispatcher;

/// Runs archive imports on the tokio runtime, detached from the request that queued them.
pub struct BackgroundImporter {
    importer: Arc<ArchiveImporter>,
}

impl BackgroundImporter {
    pub fn new(importer: Arc<ArchiveImporter>) -> Self {
        Self { importer }
    }
}

impl ImportDispatcher for BackgroundImporter {
    fn dispatch(&self, archive_path: PathBuf) {
        let importer = self.importer.clone();
        let _ = tokio::spawn(async move {
            tracing::info!("Importing {} in background", archive_path.display());
            match importer.import_archive_file(&archive_path).await {
                Ok(summary) => tracing::info!(
                    archive = %archive_path.display(),
                    tracks_created = summary.tracks_created,
                    tracks_skipped = summary.tracks_skipped,
                    "Background import finished"
                ),
                Err(e) => tracing::error!(
                    archive = %archive_path.display(),
                    "Background import failed: {}",
                    e
                ),
            }
        });
    }
}
