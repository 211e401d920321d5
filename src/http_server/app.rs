use std::sync::Arc;

use axum::{Json, Router, routing::get};
use color_eyre::eyre::{Context, eyre};
use serde_json::{Value, json};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::http_server::{
    http_routes::{admin_routes, api_routes},
    state::AppState,
};

pub const API_PREFIX: &str = "/api/v1/music_store";

async fn root() -> Json<Value> {
    Json(json!({ "name": "music-store", "api": API_PREFIX }))
}

pub fn router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .nest(API_PREFIX, api_routes())
        .nest("/admin", admin_routes(app_state.upload_limit_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(app_state)
}

pub async fn start(port: u16, app_state: Arc<AppState>) -> color_eyre::Result<()> {
    let app = router(app_state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .wrap_err_with(|| eyre!("Failed to bind to port {}", port))?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .wrap_err("Failed to start HTTP server")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use crate::ports::import_dispatcher::MockImportDispatcher;
    use crate::services::accounts::AccountService;
    use crate::test_utils::{
        insert_album, insert_payment_method, insert_track, link_payment_method, test_db,
        zip_bytes,
    };
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use axum_extra::headers::{Authorization, authorization::Credentials};
    use mockall::predicate::function;
    use sea_orm::ConnectionTrait;
    use tower::ServiceExt;

    struct TestApp {
        app: Router,
        db: Arc<Database>,
        _media: tempfile::TempDir,
    }

    async fn test_app(dispatcher: MockImportDispatcher) -> TestApp {
        let db = test_db().await;
        let media = tempfile::tempdir().unwrap();
        let state = Arc::new(AppState {
            db: db.clone(),
            media_directory: media.path().to_path_buf(),
            import_dispatcher: Arc::new(dispatcher),
            upload_limit_bytes: 1024 * 1024,
        });
        TestApp {
            app: router(state),
            db,
            _media: media,
        }
    }

    async fn user_with_token(db: &Arc<Database>, email: &str, staff: bool) -> (i64, String) {
        let accounts = AccountService::new(db.clone());
        let (user, token) = accounts.create_user(email, "someone", staff).await.unwrap();
        (user.id, token)
    }

    async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    fn get(uri: &str, token: Option<&str>) -> Request<Body> {
        request("GET", uri, token)
    }

    fn request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    fn api(path: &str) -> String {
        format!("{API_PREFIX}{path}")
    }

    #[tokio::test]
    async fn test_protected_lists_require_authentication() {
        let test = test_app(MockImportDispatcher::new()).await;

        for path in [
            "/liked",
            "/listened",
            "/bought_albums",
            "/bought_tracks",
            "/payment_methods",
            "/account",
        ] {
            let (status, body) = call(&test.app, get(&api(path), None)).await;
            assert_eq!(status, StatusCode::FORBIDDEN, "{path}");
            assert!(body["message"].is_string());
        }

        let (status, _) = call(&test.app, get(&api("/liked"), Some("bogus"))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_public_catalog_is_paginated() {
        let test = test_app(MockImportDispatcher::new()).await;
        let album = insert_album(&test.db, "Band", "Record", 5.0).await;
        insert_track(&test.db, "One", 1.0, Some(album.id)).await;
        insert_track(&test.db, "Two", 1.0, None).await;

        let (status, body) = call(&test.app, get(&api("/tracks?page_size=1"), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 2);
        assert_eq!(body["page_size"], 1);
        assert_eq!(body["results"].as_array().unwrap().len(), 1);
        assert_eq!(body["results"][0]["content"], "previews/One.mp3");

        let (status, body) =
            call(&test.app, get(&api(&format!("/albums/{}", album.id)), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tracks"].as_array().unwrap().len(), 1);
        assert_eq!(body["is_bought"], false);

        let (status, _) = call(&test.app, get(&api("/albums/999"), None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_like_twice_and_unlike_unliked() {
        let test = test_app(MockImportDispatcher::new()).await;
        let (_, token) = user_with_token(&test.db, "ann@example.com", false).await;
        let track = insert_track(&test.db, "Song", 1.0, None).await;
        let like = api(&format!("/tracks/{}/like", track.id));

        let (status, _) = call(&test.app, request("POST", &like, Some(&token))).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, _) = call(&test.app, request("POST", &like, Some(&token))).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = call(&test.app, request("DELETE", &like, Some(&token))).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = call(&test.app, request("DELETE", &like, Some(&token))).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(body, Value::Null);
    }

    #[tokio::test]
    async fn test_listen_records_every_call() {
        let test = test_app(MockImportDispatcher::new()).await;
        let (_, token) = user_with_token(&test.db, "ann@example.com", false).await;
        let track = insert_track(&test.db, "Song", 1.0, None).await;
        let listen = api(&format!("/tracks/{}/listen", track.id));

        for _ in 0..3 {
            let (status, body) = call(&test.app, request("POST", &listen, Some(&token))).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["message"], "Yeah! Music!");
        }

        let (_, body) = call(&test.app, get(&api("/listened"), Some(&token))).await;
        assert_eq!(body["count"], 3);
    }

    #[tokio::test]
    async fn test_buy_flow() {
        let test = test_app(MockImportDispatcher::new()).await;
        let (user_id, token) = user_with_token(&test.db, "ann@example.com", false).await;
        let card = insert_payment_method(&test.db, "Card").await;
        link_payment_method(&test.db, user_id, card.id).await;
        AccountService::new(test.db.clone())
            .deposit("ann@example.com", 1.0)
            .await
            .unwrap();
        let cheap = insert_track(&test.db, "Cheap", 1.0, None).await;
        let pricey = insert_track(&test.db, "Pricey", 5.0, None).await;

        let buy = |id: i64| api(&format!("/tracks/{id}/buy?payment_id={}", card.id));

        let (status, body) = call(&test.app, request("POST", &buy(pricey.id), Some(&token))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Not enough money");

        let (status, _) = call(&test.app, request("POST", &buy(cheap.id), Some(&token))).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(&test.app, request("POST", &buy(cheap.id), Some(&token))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Item already bought");

        let (_, body) = call(
            &test.app,
            get(&api(&format!("/tracks/{}", cheap.id)), Some(&token)),
        )
        .await;
        assert_eq!(body["is_bought"], true);
        assert_eq!(body["content"], "tracks/Cheap.mp3");

        let (_, body) = call(&test.app, get(&api("/account"), Some(&token))).await;
        assert_eq!(body["balance"], 0.0);

        let (_, body) = call(&test.app, get(&api("/bought_tracks"), Some(&token))).await;
        assert_eq!(body["count"], 1);
    }

    #[tokio::test]
    async fn test_buy_without_payment_method() {
        let test = test_app(MockImportDispatcher::new()).await;
        let (_, token) = user_with_token(&test.db, "ann@example.com", false).await;
        let album = insert_album(&test.db, "Band", "Record", 0.0).await;

        let (status, body) = call(
            &test.app,
            request("POST", &api(&format!("/albums/{}/buy", album.id)), Some(&token)),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Payment method not found");
    }

    #[tokio::test]
    async fn test_account_default_method() {
        let test = test_app(MockImportDispatcher::new()).await;
        let (user_id, token) = user_with_token(&test.db, "ann@example.com", false).await;
        let card = insert_payment_method(&test.db, "Card").await;
        let other = insert_payment_method(&test.db, "Other").await;
        link_payment_method(&test.db, user_id, card.id).await;

        let patch = |body: Value| {
            Request::builder()
                .method("PATCH")
                .uri(api("/account"))
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap()
        };

        let (status, body) = call(&test.app, patch(json!({ "default_method": card.id }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["default_method"], card.id);

        let (status, _) = call(&test.app, patch(json!({ "default_method": other.id }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        // Balance is read-only
        let (_, body) = call(&test.app, patch(json!({ "balance": 1000.0 }))).await;
        assert_eq!(body["balance"], 0.0);
        assert_eq!(body["default_method"], card.id);
    }

    #[tokio::test]
    async fn test_search() {
        let test = test_app(MockImportDispatcher::new()).await;
        insert_album(&test.db, "Air", "Moon Safari", 5.0).await;
        insert_track(&test.db, "Sexy Boy", 1.0, None).await;

        let (status, body) = call(&test.app, get(&api("/search?q=moon"), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["albums"].as_array().unwrap().len(), 1);
        assert!(body["tracks"].as_array().unwrap().is_empty());
    }

    fn multipart_upload(token: &str, contents: &[u8]) -> Request<Body> {
        let boundary = "music-store-boundary";
        let mut body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"albums.zip\"\r\n\
             Content-Type: application/zip\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(contents);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/admin/upload")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_admin_upload_dispatches_import() {
        let mut dispatcher = MockImportDispatcher::new();
        dispatcher
            .expect_dispatch()
            .with(function(|path: &std::path::PathBuf| {
                path.extension().is_some_and(|ext| ext == "zip") && path.exists()
            }))
            .times(1)
            .return_const(());
        let test = test_app(dispatcher).await;
        let (_, token) = user_with_token(&test.db, "admin@example.com", true).await;

        let archive = zip_bytes(&[("Band - Song.mp3", b"data")]);
        let response = test
            .app
            .clone()
            .oneshot(multipart_upload(&token, &archive))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/admin/albums");
    }

    #[tokio::test]
    async fn test_admin_upload_rejects_non_zip() {
        let mut dispatcher = MockImportDispatcher::new();
        dispatcher.expect_dispatch().times(0);
        let test = test_app(dispatcher).await;
        let (_, token) = user_with_token(&test.db, "admin@example.com", true).await;

        let (status, _) = call(&test.app, multipart_upload(&token, b"plain text")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_admin_auth_reports_database_failure() {
        let test = test_app(MockImportDispatcher::new()).await;
        test.db
            .conn
            .execute_unprepared("DROP TABLE users")
            .await
            .unwrap();

        let response = test
            .app
            .clone()
            .oneshot(get("/admin/albums", Some("some-token")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!response.headers().contains_key(header::WWW_AUTHENTICATE));
    }

    #[tokio::test]
    async fn test_admin_requires_staff() {
        let test = test_app(MockImportDispatcher::new()).await;
        let (_, token) = user_with_token(&test.db, "ann@example.com", false).await;
        let (_, staff_token) = user_with_token(&test.db, "admin@example.com", true).await;
        insert_album(&test.db, "Band", "<b>Record</b>", 5.0).await;

        let response = test
            .app
            .clone()
            .oneshot(get("/admin/albums", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));

        let response = test
            .app
            .clone()
            .oneshot(get("/admin/albums", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        // Basic credentials: email and API token
        let basic = Request::builder()
            .uri("/admin/upload")
            .header(
                header::AUTHORIZATION,
                Authorization::basic("admin@example.com", &staff_token)
                    .0
                    .encode(),
            )
            .body(Body::empty())
            .unwrap();
        let response = test.app.clone().oneshot(basic).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = test
            .app
            .clone()
            .oneshot(get("/admin/albums", Some(&staff_token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let html = String::from_utf8(html.to_vec()).unwrap();
        assert!(html.contains("&lt;b&gt;Record&lt;/b&gt;"));
    }
}
