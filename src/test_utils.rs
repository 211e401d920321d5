use std::io::Write;
use std::sync::Arc;

use sea_orm::{ActiveModelBehavior, ActiveModelTrait, Database as SeaDatabase, Set};
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

use crate::database::Database;
use crate::entities;

pub async fn test_db() -> Arc<Database> {
    let conn = SeaDatabase::connect("sqlite::memory:").await.unwrap();
    Arc::new(Database::prepare(conn).await.unwrap())
}

pub async fn insert_user(db: &Database, email: &str, balance: f64) -> entities::user::Model {
    let user = entities::user::ActiveModel {
        email: Set(email.to_string()),
        username: Set(email.split('@').next().unwrap_or(email).to_string()),
        balance: Set(balance),
        ..entities::user::ActiveModel::new()
    };
    user.insert(&db.conn).await.unwrap()
}

pub async fn insert_album(
    db: &Database,
    author: &str,
    title: &str,
    price: f64,
) -> entities::album::Model {
    let album = entities::album::ActiveModel {
        author: Set(author.to_string()),
        title: Set(title.to_string()),
        price: Set(price),
        ..entities::album::ActiveModel::new()
    };
    album.insert(&db.conn).await.unwrap()
}

pub async fn insert_track(
    db: &Database,
    title: &str,
    price: f64,
    album_id: Option<i64>,
) -> entities::track::Model {
    let track = entities::track::ActiveModel {
        title: Set(title.to_string()),
        author: Set("Test Author".to_string()),
        album_id: Set(album_id),
        price: Set(price),
        free_version: Set(Some(format!("previews/{title}.mp3"))),
        full_version: Set(Some(format!("tracks/{title}.mp3"))),
        ..entities::track::ActiveModel::new()
    };
    track.insert(&db.conn).await.unwrap()
}

pub async fn insert_payment_method(db: &Database, title: &str) -> entities::payment_method::Model {
    let method = entities::payment_method::ActiveModel {
        title: Set(title.to_string()),
        ..Default::default()
    };
    method.insert(&db.conn).await.unwrap()
}

pub async fn link_payment_method(db: &Database, user_id: i64, payment_method_id: i64) {
    let link = entities::user_payment_method::ActiveModel {
        user_id: Set(user_id),
        payment_method_id: Set(payment_method_id),
    };
    link.insert(&db.conn).await.unwrap();
}

/// Build an in-memory zip archive from `(name, contents)` pairs.
/// Names ending with `/` become directory entries.
pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    build_zip(entries, SimpleFileOptions::default())
}

/// Like [`zip_bytes`], but entries are stored uncompressed so their bytes can be
/// located and tampered with.
pub fn stored_zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    build_zip(
        entries,
        SimpleFileOptions::default().compression_method(CompressionMethod::Stored),
    )
}

fn build_zip(entries: &[(&str, &[u8])], options: SimpleFileOptions) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (name, contents) in entries {
        if name.ends_with('/') {
            writer.add_directory(*name, options).unwrap();
        } else {
            writer.start_file(*name, options).unwrap();
            writer.write_all(contents).unwrap();
        }
    }
    writer.finish().unwrap().into_inner()
}
