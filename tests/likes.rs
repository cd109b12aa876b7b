//! Like toggle and listing tests.

mod common;

use axum::http::StatusCode;
use common::app;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn toggle_like_alternates() {
    let app = app().await;
    let user = app.create_user("like_toggle").await;
    let post_id = app.create_post_for_user(user.id).await;
    let payload = json!({ "postId": post_id.to_string() });

    let resp = app
        .post_json("/likes", payload.clone(), Some(&user.token))
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert_eq!(body["message"].as_str().unwrap(), "like toggled successfully");
    assert_eq!(body["like"]["isActive"].as_bool().unwrap(), true);

    let resp = app
        .post_json("/likes", payload.clone(), Some(&user.token))
        .await;
    assert_eq!(resp.json()["like"]["isActive"].as_bool().unwrap(), false);

    let resp = app.post_json("/likes", payload, Some(&user.token)).await;
    assert_eq!(resp.json()["like"]["isActive"].as_bool().unwrap(), true);
}

#[tokio::test]
async fn toggle_like_single_row_per_pair() {
    let app = app().await;
    let user = app.create_user("like_onerow").await;
    let post_id = app.create_post_for_user(user.id).await;
    let payload = json!({ "postId": post_id.to_string() });

    app.post_json("/likes", payload.clone(), Some(&user.token))
        .await;
    app.post_json("/likes", payload, Some(&user.token)).await;

    // Toggling reuses the same row instead of inserting a new one
    let rows: i64 =
        sqlx::query_scalar("SELECT count(*) FROM likes WHERE user_id = $1 AND post_id = $2")
            .bind(user.id)
            .bind(post_id)
            .fetch_one(app.pool())
            .await
            .unwrap();
    assert_eq!(rows, 1);
}

#[tokio::test]
async fn toggle_like_missing_post() {
    let app = app().await;
    let user = app.create_user("like_nopost").await;

    let resp = app
        .post_json(
            "/likes",
            json!({ "postId": Uuid::new_v4().to_string() }),
            Some(&user.token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(resp.error_message(), "post not found");
}

#[tokio::test]
async fn toggle_like_requires_auth() {
    let app = app().await;
    let user = app.create_user("like_noauth").await;
    let post_id = app.create_post_for_user(user.id).await;

    let resp = app
        .post_json("/likes", json!({ "postId": post_id.to_string() }), None)
        .await;

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn list_likes_active_only() {
    let app = app().await;
    let keeper = app.create_user("like_keeper").await;
    let quitter = app.create_user("like_quitter").await;
    let post_id = app.create_post_for_user(keeper.id).await;
    let payload = json!({ "postId": post_id.to_string() });

    app.post_json("/likes", payload.clone(), Some(&keeper.token))
        .await;
    app.post_json("/likes", payload.clone(), Some(&quitter.token))
        .await;
    // quitter toggles their like back off
    app.post_json("/likes", payload, Some(&quitter.token)).await;

    let resp = app
        .get(
            &format!("/likes?postId={}&page=1&limit=10", post_id),
            Some(&keeper.token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["userId"].as_str().unwrap(), keeper.id.to_string());
    assert_eq!(data[0]["username"].as_str().unwrap(), keeper.username);
    assert_eq!(body["meta"]["totalItems"].as_i64().unwrap(), 1);
}

#[tokio::test]
async fn list_likes_pagination_meta() {
    let app = app().await;
    let owner = app.create_user("like_page_owner").await;
    let post_id = app.create_post_for_user(owner.id).await;
    let payload = json!({ "postId": post_id.to_string() });

    for i in 0..3 {
        let fan = app.create_user(&format!("like_page_fan{}", i)).await;
        app.post_json("/likes", payload.clone(), Some(&fan.token))
            .await;
    }

    let resp = app
        .get(
            &format!("/likes?postId={}&page=1&limit=2", post_id),
            Some(&owner.token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    let meta = &body["meta"];
    assert_eq!(meta["totalItems"].as_i64().unwrap(), 3);
    assert_eq!(meta["totalPages"].as_i64().unwrap(), 2);
    assert_eq!(meta["hasNextPage"].as_bool().unwrap(), true);
}

#[tokio::test]
async fn like_count_follows_toggle() {
    let app = app().await;
    let user = app.create_user("like_count").await;
    let post_id = app.create_post_for_user(user.id).await;
    let payload = json!({ "postId": post_id.to_string() });

    app.post_json("/likes", payload.clone(), Some(&user.token))
        .await;
    let resp = app
        .get(&format!("/posts/{}", post_id), Some(&user.token))
        .await;
    let body = resp.json();
    assert_eq!(body["likes"].as_i64().unwrap(), 1);
    assert_eq!(body["isLiked"].as_bool().unwrap(), true);

    app.post_json("/likes", payload, Some(&user.token)).await;
    let resp = app
        .get(&format!("/posts/{}", post_id), Some(&user.token))
        .await;
    let body = resp.json();
    assert_eq!(body["likes"].as_i64().unwrap(), 0);
    assert_eq!(body["isLiked"].as_bool().unwrap(), false);
}
