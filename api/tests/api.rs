mod common;

use std::collections::HashMap;

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{
    TestApp, delete, get, json_request, multipart_request, send_json, unnamed_part_request,
};
use notes_api::{app, build_state, config::Config};
use serde_json::{Value, json};
use tempfile::TempDir;

fn created_at(post: &Value) -> DateTime<Utc> {
    post["created_at"].as_str().unwrap().parse().unwrap()
}

#[tokio::test]
async fn create_list_edit_delete_round_trip() {
    let app = TestApp::new();

    let (status, created) = app
        .json(json_request("POST", "/api/posts", json!({ "content": "hello" })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["id"], 1);
    assert_eq!(created["content"], "hello");
    assert_eq!(created["images"], json!([]));

    let (status, list) = app.json(get("/api/posts")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list, json!([created.clone()]));

    let (status, updated) = app
        .json(json_request("PUT", "/api/posts/1", json!({ "content": "hi" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["id"], 1);
    assert_eq!(updated["content"], "hi");
    assert!(created_at(&updated) > created_at(&created));

    let (status, body) = app.json(delete("/api/posts/1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true }));

    let (_, list) = app.json(get("/api/posts")).await;
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn list_is_newest_first() {
    let app = TestApp::new();
    for text in ["one", "two", "three"] {
        app.json(json_request("POST", "/api/posts", json!({ "content": text })))
            .await;
    }
    // editing bumps a post back to the top
    app.json(json_request("PUT", "/api/posts/1", json!({ "content": "one, edited" })))
        .await;

    let (_, list) = app.json(get("/api/posts")).await;
    let contents: Vec<_> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["content"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(contents, vec!["one, edited", "three", "two"]);
}

#[tokio::test]
async fn empty_posts_are_rejected() {
    let app = TestApp::new();

    for body in [json!({ "content": "" }), json!({ "content": "  \n\t" }), json!({})] {
        let (status, err) = app.json(json_request("POST", "/api/posts", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(err["error"].is_string());
    }

    let (_, list) = app.json(get("/api/posts")).await;
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn content_is_trimmed_and_capped() {
    let app = TestApp::new();

    let (_, created) = app
        .json(json_request("POST", "/api/posts", json!({ "content": "  padded  " })))
        .await;
    assert_eq!(created["content"], "padded");

    let (status, _) = app
        .json(json_request(
            "POST",
            "/api/posts",
            json!({ "content": "a".repeat(2001) }),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // the limit applies to what gets stored, after trimming
    let (status, created) = app
        .json(json_request(
            "POST",
            "/api/posts",
            json!({ "content": format!("{}\n", "a".repeat(2000)) }),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["content"].as_str().unwrap().chars().count(), 2000);

    let id = created["id"].as_i64().unwrap();
    let (status, _) = app
        .json(json_request(
            "PUT",
            &format!("/api/posts/{id}"),
            json!({ "content": format!("  {}  ", "b".repeat(2000)) }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn edits_validate_and_need_an_existing_post() {
    let app = TestApp::new();
    app.json(json_request("POST", "/api/posts", json!({ "content": "keep me" })))
        .await;

    let (status, _) = app
        .json(json_request("PUT", "/api/posts/1", json!({ "content": "   " })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, list) = app.json(get("/api/posts")).await;
    assert_eq!(list[0]["content"], "keep me");

    let (status, err) = app
        .json(json_request("PUT", "/api/posts/42", json!({ "content": "x" })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(err["error"], "Post not found");

    let (status, _) = app
        .json(json_request("PUT", "/api/posts/abc", json!({ "content": "x" })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleting_unknown_posts_reports_failure() {
    let app = TestApp::new();
    app.json(json_request("POST", "/api/posts", json!({ "content": "stay" })))
        .await;

    for uri in ["/api/posts/99", "/api/posts/not-a-number"] {
        let (status, body) = app.json(delete(uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }

    let (_, list) = app.json(get("/api/posts")).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn images_keep_upload_order_and_are_reclaimed() {
    let app = TestApp::new();
    let payloads: Vec<Vec<u8>> = (0..9).map(|i| format!("image-{i}").into_bytes()).collect();
    let names: Vec<String> = (0..9).map(|i| format!("photo{i}.JPG")).collect();
    let files: Vec<_> = names
        .iter()
        .zip(&payloads)
        .map(|(name, data)| (name.as_str(), "image/jpeg", data.as_slice()))
        .collect();

    let (status, created) = app.json(multipart_request(Some("trip"), &files)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["content"], "trip");

    let urls: Vec<String> = created["images"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u.as_str().unwrap().to_string())
        .collect();
    assert_eq!(urls.len(), 9);
    assert_eq!(app.stored_files(), 9);

    for (url, expected) in urls.iter().zip(&payloads) {
        assert!(url.starts_with("/uploads/"));
        assert!(url.ends_with(".jpg"));
        let (status, body) = app.bytes(url).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(&body, expected);
    }

    let (_, list) = app.json(get("/api/posts")).await;
    assert_eq!(list[0]["images"], created["images"]);

    let id = created["id"].as_i64().unwrap();
    let (status, _) = app.json(delete(&format!("/api/posts/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.stored_files(), 0);

    let (status, _) = app.bytes(&urls[0]).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn images_alone_make_a_post() {
    let app = TestApp::new();
    let (status, created) = app
        .json(multipart_request(
            Some("   "),
            &[("cat.png", "image/png", b"meow".as_slice())],
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["content"], "");
    assert_eq!(created["images"].as_array().unwrap().len(), 1);

    // images are fixed at creation, edits only touch the text
    let id = created["id"].as_i64().unwrap();
    let (_, updated) = app
        .json(json_request(
            "PUT",
            &format!("/api/posts/{id}"),
            json!({ "content": "a cat" }),
        ))
        .await;
    assert_eq!(updated["images"], created["images"]);
}

#[tokio::test]
async fn multipart_without_text_or_files_is_rejected() {
    let app = TestApp::new();

    // what a browser sends when the file picker was left empty
    let (status, _) = app
        .json(multipart_request(
            Some(""),
            &[("", "application/octet-stream", b"".as_slice())],
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.stored_files(), 0);
}

#[tokio::test]
async fn image_parts_without_a_file_name_are_kept() {
    let app = TestApp::new();

    let (status, created) = app
        .json(unnamed_part_request("hi", "image/png", b"PNGDATA"))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["content"], "hi");

    let images = created["images"].as_array().unwrap();
    assert_eq!(images.len(), 1);
    let url = images[0].as_str().unwrap();
    assert!(!url.trim_start_matches("/uploads/").contains('.'));
    assert_eq!(app.stored_files(), 1);

    let (status, body) = app.bytes(url).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"PNGDATA");
}

#[tokio::test]
async fn unnamed_non_image_data_is_rejected() {
    let app = TestApp::new();

    let (status, _) = app
        .json(unnamed_part_request("hi", "application/octet-stream", b"bytes"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.stored_files(), 0);
}

#[tokio::test]
async fn more_than_nine_images_is_rejected_without_leftovers() {
    let app = TestApp::new();
    let names: Vec<String> = (0..10).map(|i| format!("{i}.png")).collect();
    let files: Vec<_> = names
        .iter()
        .map(|name| (name.as_str(), "image/png", b"png".as_slice()))
        .collect();

    let (status, err) = app.json(multipart_request(Some("too many"), &files)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(err["error"].as_str().unwrap().contains('9'));
    assert_eq!(app.stored_files(), 0);

    let (_, list) = app.json(get("/api/posts")).await;
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn non_image_attachments_are_rejected() {
    let app = TestApp::new();
    let (status, _) = app
        .json(multipart_request(
            Some("look"),
            &[
                ("ok.png", "image/png", b"png".as_slice()),
                ("notes.txt", "text/plain", b"text".as_slice()),
            ],
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.stored_files(), 0);
}

#[tokio::test]
async fn serves_health_and_client_assets() {
    let app = TestApp::new();
    std::fs::write(app.public.path().join("index.html"), "<h1>notes</h1>").unwrap();

    let (status, health) = app.json(get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "healthy");

    let (status, body) = app.bytes("/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"<h1>notes</h1>");
}

#[tokio::test]
async fn file_backend_from_config_persists_across_restarts() {
    let root = TempDir::new().unwrap();
    let env: HashMap<&str, String> = HashMap::from([
        ("STORE_BACKEND", "file".to_string()),
        ("DATA_DIR", root.path().join("data").display().to_string()),
        ("UPLOAD_DIR", root.path().join("uploads").display().to_string()),
        ("PUBLIC_DIR", root.path().join("public").display().to_string()),
    ]);
    let config = Config::from_lookup(|key| env.get(key).cloned()).unwrap();

    let state = build_state(&config).await.unwrap();
    assert!(config.data_dir.is_dir());
    assert!(config.upload_dir.is_dir());

    let router = app(state, &config.public_dir, config.max_upload_bytes);
    let (status, created) = send_json(
        &router,
        json_request("POST", "/api/posts", json!({ "content": "on disk" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(config.snapshot_path().is_file());

    // a fresh process reads the same snapshot
    let restarted = app(
        build_state(&config).await.unwrap(),
        &config.public_dir,
        config.max_upload_bytes,
    );
    let (_, list) = send_json(&restarted, get("/api/posts")).await;
    assert_eq!(list, json!([created]));
}
