use std::collections::HashSet;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, Condition, DbErr, EntityTrait,
    QueryFilter, Set,
};
use tracing::instrument;
use zip::ZipArchive;
use zip::result::ZipError;

use crate::database::Database;
use crate::entities;

pub const AUTHOR_TITLE_DELIMITER: &str = " - ";
pub const UNKNOWN_AUTHOR: &str = "Unknown artist";

/// Directory under the media root where imported track files are stored.
pub const TRACKS_DIR: &str = "tracks";

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("It is not a ZIP archive")]
    NotAZipArchive,

    #[error("Archive contains a nested directory: {0}")]
    NestedDirectory(String),

    #[error("Corrupt archive entry: {0}")]
    Archive(#[from] ZipError),

    #[error("File system error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

#[derive(Debug, Clone, Copy)]
pub struct ImportOptions {
    pub album_price: f64,
    pub track_price: f64,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            album_price: 0.0,
            track_price: 0.0,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub albums_created: usize,
    pub albums_reused: usize,
    pub tracks_created: usize,
    pub tracks_skipped: usize,
}

/// What an archive entry name says about the track it holds.
#[derive(Debug, Clone, PartialEq, Eq)]
struct EntryInfo {
    author: String,
    album: Option<String>,
    title: String,
    extension: Option<String>,
}

impl EntryInfo {
    /// Parse `track.ext` or `album_dir/track.ext`.
    ///
    /// A track inside an album directory takes the album's author.
    fn parse(name: &str) -> Self {
        let (album, track) = match name.split_once('/') {
            Some((album, track)) => (Some(album), track),
            None => (None, name),
        };

        let track_path = Path::new(track);
        let stem = track_path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(track);
        let extension = track_path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase);

        let (track_author, title) = split_author_title(stem);

        match album {
            Some(album) => {
                let (album_author, album_title) = split_author_title(album);
                Self {
                    author: album_author,
                    album: Some(album_title),
                    title,
                    extension,
                }
            }
            None => Self {
                author: track_author,
                album: None,
                title,
                extension,
            },
        }
    }
}

/// Split `author - title` on the first delimiter. A bare `title` gets the unknown author.
fn split_author_title(segment: &str) -> (String, String) {
    match segment.split_once(AUTHOR_TITLE_DELIMITER) {
        Some((author, title)) => (author.trim().to_string(), title.trim().to_string()),
        None => (UNKNOWN_AUTHOR.to_string(), segment.trim().to_string()),
    }
}

fn nested_entry(names: &[String]) -> Option<&String> {
    names.iter().find(|name| name.matches('/').count() > 1)
}

pub struct ArchiveImporter {
    db: Arc<Database>,
    media_dir: PathBuf,
    options: ImportOptions,
}

impl ArchiveImporter {
    pub fn new(db: Arc<Database>, media_dir: PathBuf, options: ImportOptions) -> Self {
        Self {
            db,
            media_dir,
            options,
        }
    }

    #[instrument(skip(self))]
    pub async fn import_archive_file(&self, path: &Path) -> Result<ImportSummary, ImportError> {
        let bytes = tokio::fs::read(path).await?;
        self.import_bytes(bytes).await
    }

    /// Import every track in a zip archive.
    ///
    /// The archive layout is validated before anything is written. After that,
    /// records are committed entry by entry, so a failure keeps earlier entries.
    pub async fn import_bytes(&self, bytes: Vec<u8>) -> Result<ImportSummary, ImportError> {
        if !infer::archive::is_zip(&bytes) {
            return Err(ImportError::NotAZipArchive);
        }
        let mut archive =
            ZipArchive::new(Cursor::new(bytes)).map_err(|_| ImportError::NotAZipArchive)?;

        let names: Vec<String> = archive.file_names().map(str::to_string).collect();
        if let Some(name) = nested_entry(&names) {
            tracing::warn!(entry = %name, "Rejecting archive with nested directory");
            return Err(ImportError::NestedDirectory(name.clone()));
        }

        let mut summary = ImportSummary::default();
        let mut seen_albums = HashSet::new();

        for index in 0..archive.len() {
            let (name, data) = {
                let mut entry = archive.by_index(index)?;
                if entry.is_dir() {
                    continue;
                }
                // The declared size is untrusted, so no preallocation.
                let mut data = Vec::new();
                entry
                    .read_to_end(&mut data)
                    .map_err(|e| ImportError::Archive(ZipError::Io(e)))?;
                (entry.name().to_string(), data)
            };

            let info = EntryInfo::parse(&name);
            tracing::debug!(entry = %name, ?info, "Importing archive entry");

            let album_id = match &info.album {
                Some(title) => {
                    let (album, created) = self.find_or_create_album(&info.author, title).await?;
                    if created {
                        summary.albums_created += 1;
                    } else if !seen_albums.contains(&album.id) {
                        summary.albums_reused += 1;
                    }
                    seen_albums.insert(album.id);
                    Some(album.id)
                }
                None => None,
            };

            if self.track_exists(&info.author, &info.title).await? {
                tracing::debug!(
                    author = %info.author,
                    title = %info.title,
                    "Track exists, skipping"
                );
                summary.tracks_skipped += 1;
                continue;
            }

            let full_version = self.store_track_file(info.extension.as_deref(), &data).await?;
            let inserted = entities::track::ActiveModel {
                title: Set(info.title.clone()),
                author: Set(info.author.clone()),
                album_id: Set(album_id),
                price: Set(self.options.track_price),
                full_version: Set(Some(full_version.clone())),
                ..entities::track::ActiveModel::new()
            }
            .insert(&self.db.conn)
            .await;
            if let Err(e) = inserted {
                if let Err(remove_err) =
                    tokio::fs::remove_file(self.media_dir.join(&full_version)).await
                {
                    tracing::warn!(
                        path = %full_version,
                        "Failed to remove orphaned track file: {}",
                        remove_err
                    );
                }
                return Err(e.into());
            }
            summary.tracks_created += 1;
        }

        tracing::info!(
            albums_created = summary.albums_created,
            albums_reused = summary.albums_reused,
            tracks_created = summary.tracks_created,
            tracks_skipped = summary.tracks_skipped,
            "Archive imported"
        );
        Ok(summary)
    }

    async fn find_or_create_album(
        &self,
        author: &str,
        title: &str,
    ) -> Result<(entities::album::Model, bool), DbErr> {
        let existing = entities::album::Entity::find()
            .filter(
                Condition::all()
                    .add(entities::album::Column::Author.eq(author))
                    .add(entities::album::Column::Title.eq(title)),
            )
            .one(&self.db.conn)
            .await?;
        if let Some(album) = existing {
            return Ok((album, false));
        }

        let album = entities::album::ActiveModel {
            author: Set(author.to_string()),
            title: Set(title.to_string()),
            price: Set(self.options.album_price),
            ..entities::album::ActiveModel::new()
        }
        .insert(&self.db.conn)
        .await?;
        tracing::info!(album_id = album.id, author, title, "Created album");
        Ok((album, true))
    }

    async fn track_exists(&self, author: &str, title: &str) -> Result<bool, DbErr> {
        let track = entities::track::Entity::find()
            .filter(
                Condition::all()
                    .add(entities::track::Column::Author.eq(author))
                    .add(entities::track::Column::Title.eq(title)),
            )
            .one(&self.db.conn)
            .await?;
        Ok(track.is_some())
    }

    /// Write the track bytes under the media directory, returning the media-relative path.
    async fn store_track_file(
        &self,
        extension: Option<&str>,
        data: &[u8],
    ) -> Result<String, std::io::Error> {
        let file_name = match extension {
            Some(ext) => format!("{}.{ext}", uuid::Uuid::new_v4().simple()),
            None => uuid::Uuid::new_v4().simple().to_string(),
        };
        let dir = self.media_dir.join(TRACKS_DIR);
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(&file_name), data).await?;
        Ok(format!("{TRACKS_DIR}/{file_name}"))
    }
}
