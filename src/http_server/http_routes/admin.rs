use std::fmt::Write;
use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    response::{Html, Redirect},
};
use color_eyre::eyre::Context;
use html_escape::encode_text;

use crate::http_server::{auth::StaffUser, error::ApiError, state::AppState};
use crate::services::catalog::CatalogService;

pub const UPLOADS_DIR: &str = "uploads";
const UPLOAD_FIELD: &str = "file";

fn page(title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>{title}</title></head>\n\
         <body>\n<h1>{title}</h1>\n{body}\n</body>\n</html>\n",
        title = encode_text(title),
    ))
}

pub async fn upload_form(StaffUser(_): StaffUser) -> Html<String> {
    page(
        "Albums Upload",
        r#"<form method="post" action="/admin/upload" enctype="multipart/form-data">
<input type="file" name="file" accept=".zip,application/zip" required>
<button type="submit">Upload</button>
</form>
<p><a href="/admin/albums">Albums</a></p>"#,
    )
}

/// Store the uploaded archive and queue it for import.
pub async fn upload_archive(
    State(app_state): State<Arc<AppState>>,
    StaffUser(staff): StaffUser,
    mut multipart: Multipart,
) -> Result<Redirect, ApiError> {
    let mut archive = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        if field.name() == Some(UPLOAD_FIELD) {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?;
            archive = Some(bytes);
            break;
        }
    }

    let archive = archive
        .ok_or_else(|| ApiError::BadRequest(format!("Missing `{UPLOAD_FIELD}` field")))?;
    if !infer::archive::is_zip(&archive) {
        return Err(ApiError::BadRequest("It is not a ZIP archive".to_string()));
    }

    let uploads = app_state.media_directory.join(UPLOADS_DIR);
    tokio::fs::create_dir_all(&uploads)
        .await
        .wrap_err_with(|| format!("Failed to create {}", uploads.display()))?;
    let path = uploads.join(format!("{}.zip", uuid::Uuid::new_v4().simple()));
    tokio::fs::write(&path, &archive)
        .await
        .wrap_err_with(|| format!("Failed to save upload to {}", path.display()))?;

    tracing::info!(
        user_id = staff.id,
        path = %path.display(),
        size = archive.len(),
        "Archive uploaded"
    );
    app_state.import_dispatcher.dispatch(path);

    Ok(Redirect::to("/admin/albums"))
}

pub async fn album_table(
    State(app_state): State<Arc<AppState>>,
    StaffUser(_): StaffUser,
) -> Result<Html<String>, ApiError> {
    let albums = CatalogService::new(app_state.db.clone())
        .albums_with_track_counts()
        .await?;

    let mut body = String::from(
        "<p><a href=\"/admin/upload\">Upload archive</a></p>\n<table>\n\
         <tr><th>Id</th><th>Author</th><th>Title</th><th>Price</th><th>Tracks</th></tr>\n",
    );
    for summary in &albums {
        let _ = writeln!(
            body,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{:.2}</td><td>{}</td></tr>",
            summary.album.id,
            encode_text(&summary.album.author),
            encode_text(&summary.album.title),
            summary.album.price,
            summary.track_count,
        );
    }
    body.push_str("</table>");

    Ok(page("Albums", &body))
}
