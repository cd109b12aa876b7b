//! Post CRUD, derived-field and pagination tests.

mod common;

use axum::http::StatusCode;
use common::app;
use serde_json::json;
use uuid::Uuid;

// ===========================================================================
// Creation
// ===========================================================================

#[tokio::test]
async fn create_post_valid() {
    let app = app().await;
    let user = app.create_user("post_create").await;

    let resp = app
        .post_json(
            "/posts",
            json!({ "title": "Hi", "content": "World" }),
            Some(&user.token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::CREATED);
    let body = resp.json();
    assert!(body["id"].is_string());
    assert_eq!(body["userId"].as_str().unwrap(), user.id.to_string());
    assert_eq!(body["username"].as_str().unwrap(), user.username);
    assert_eq!(body["title"].as_str().unwrap(), "Hi");
    assert_eq!(body["content"].as_str().unwrap(), "World");
    assert_eq!(body["likes"].as_i64().unwrap(), 0);
    assert_eq!(body["comments"].as_i64().unwrap(), 0);
    assert_eq!(body["isLiked"].as_bool().unwrap(), false);
    assert_eq!(body["isAccessible"].as_bool().unwrap(), true);
}

#[tokio::test]
async fn create_post_missing_title() {
    let app = app().await;
    let user = app.create_user("post_notitle").await;

    let resp = app
        .post_json("/posts", json!({ "content": "World" }), Some(&user.token))
        .await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "title and content are required");
}

#[tokio::test]
async fn create_post_unauthenticated() {
    let app = app().await;

    let resp = app
        .post_json("/posts", json!({ "title": "Hi", "content": "World" }), None)
        .await;

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.error_message(), "authentication token is missing");
}

// ===========================================================================
// Detail view
// ===========================================================================

#[tokio::test]
async fn get_post_derived_fields() {
    let app = app().await;
    let owner = app.create_user("post_owner").await;
    let viewer = app.create_user("post_viewer").await;
    let post_id = app.create_post_for_user(owner.id).await;

    app.create_comment_for_user(viewer.id, post_id, "nice").await;
    let resp = app
        .post_json(
            "/likes",
            json!({ "postId": post_id.to_string() }),
            Some(&viewer.token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);

    // Owner sees the counts but not the viewer's like
    let resp = app
        .get(&format!("/posts/{}", post_id), Some(&owner.token))
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert_eq!(body["likes"].as_i64().unwrap(), 1);
    assert_eq!(body["comments"].as_i64().unwrap(), 1);
    assert_eq!(body["isLiked"].as_bool().unwrap(), false);
    assert_eq!(body["isAccessible"].as_bool().unwrap(), true);

    // The liker sees their own like; the post is not theirs
    let resp = app
        .get(&format!("/posts/{}", post_id), Some(&viewer.token))
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert_eq!(body["isLiked"].as_bool().unwrap(), true);
    assert_eq!(body["isAccessible"].as_bool().unwrap(), false);
}

#[tokio::test]
async fn get_nonexistent_post() {
    let app = app().await;
    let user = app.create_user("post_get404").await;

    let resp = app
        .get(&format!("/posts/{}", Uuid::new_v4()), Some(&user.token))
        .await;

    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(resp.error_message(), "post not found");
}

#[tokio::test]
async fn get_post_requires_auth() {
    let app = app().await;
    let user = app.create_user("post_get_noauth").await;
    let post_id = app.create_post_for_user(user.id).await;

    let resp = app.get(&format!("/posts/{}", post_id), None).await;

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

// ===========================================================================
// Update
// ===========================================================================

#[tokio::test]
async fn update_post_partial_fields() {
    let app = app().await;
    let user = app.create_user("post_update").await;
    let post_id = app.create_post_for_user(user.id).await;

    let resp = app
        .put_json(
            &format!("/posts/{}", post_id),
            json!({ "title": "Updated title" }),
            Some(&user.token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert_eq!(body["title"].as_str().unwrap(), "Updated title");
    // Omitted field keeps its prior value
    assert_eq!(body["content"].as_str().unwrap(), "test content");
}

#[tokio::test]
async fn update_post_wrong_user() {
    let app = app().await;
    let owner = app.create_user("post_upd_a").await;
    let other = app.create_user("post_upd_b").await;
    let post_id = app.create_post_for_user(owner.id).await;

    let resp = app
        .put_json(
            &format!("/posts/{}", post_id),
            json!({ "title": "Hijacked" }),
            Some(&other.token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::FORBIDDEN);
    assert_eq!(
        resp.error_message(),
        "you are not authorized to update this post"
    );
}

#[tokio::test]
async fn update_nonexistent_post() {
    let app = app().await;
    let user = app.create_user("post_upd404").await;

    let resp = app
        .put_json(
            &format!("/posts/{}", Uuid::new_v4()),
            json!({ "title": "Whatever" }),
            Some(&user.token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

// ===========================================================================
// Delete
// ===========================================================================

#[tokio::test]
async fn delete_post_cascades() {
    let app = app().await;
    let user = app.create_user("post_cascade").await;
    let post_id = app.create_post_for_user(user.id).await;
    app.create_comment_for_user(user.id, post_id, "soon gone")
        .await;
    app.post_json(
        "/likes",
        json!({ "postId": post_id.to_string() }),
        Some(&user.token),
    )
    .await;

    let resp = app
        .delete(&format!("/posts/{}", post_id), Some(&user.token))
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(
        resp.json()["message"].as_str().unwrap(),
        "post deleted successfully"
    );

    // Post is gone
    let resp = app
        .get(&format!("/posts/{}", post_id), Some(&user.token))
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);

    // Its comments and likes went with it
    let comments: i64 =
        sqlx::query_scalar("SELECT count(*) FROM comments WHERE post_id = $1")
            .bind(post_id)
            .fetch_one(app.pool())
            .await
            .unwrap();
    let likes: i64 = sqlx::query_scalar("SELECT count(*) FROM likes WHERE post_id = $1")
        .bind(post_id)
        .fetch_one(app.pool())
        .await
        .unwrap();
    assert_eq!(comments, 0);
    assert_eq!(likes, 0);

    // List calls scoped to the post now 404
    let resp = app
        .get(
            &format!("/comment?postId={}&page=1&limit=10", post_id),
            Some(&user.token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_post_wrong_user() {
    let app = app().await;
    let owner = app.create_user("post_del_a").await;
    let other = app.create_user("post_del_b").await;
    let post_id = app.create_post_for_user(owner.id).await;

    let resp = app
        .delete(&format!("/posts/{}", post_id), Some(&other.token))
        .await;

    assert_eq!(resp.status, StatusCode::FORBIDDEN);

    // Post still exists
    let resp = app
        .get(&format!("/posts/{}", post_id), Some(&owner.token))
        .await;
    assert_eq!(resp.status, StatusCode::OK);
}

// ===========================================================================
// Listing and pagination
// ===========================================================================

#[tokio::test]
async fn list_posts_contains_new_post() {
    let app = app().await;
    let user = app.create_user("post_list").await;
    let post_id = app.create_post_for_user(user.id).await;

    let resp = app.get("/posts?page=1&limit=100", Some(&user.token)).await;

    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    let data = body["data"].as_array().unwrap();
    let post = data
        .iter()
        .find(|p| p["id"].as_str() == Some(&post_id.to_string()))
        .expect("created post not in page 1");
    assert_eq!(post["likes"].as_i64().unwrap(), 0);
    assert_eq!(post["comments"].as_i64().unwrap(), 0);
    assert_eq!(body["meta"]["page"].as_i64().unwrap(), 1);
}

#[tokio::test]
async fn my_posts_pagination_meta() {
    let app = app().await;
    let user = app.create_user("post_paging").await;
    for _ in 0..5 {
        app.create_post_for_user(user.id).await;
    }

    let resp = app
        .get("/posts/my-posts?page=1&limit=2", Some(&user.token))
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    let meta = &body["meta"];
    assert_eq!(meta["page"].as_i64().unwrap(), 1);
    assert_eq!(meta["limit"].as_i64().unwrap(), 2);
    assert_eq!(meta["totalItems"].as_i64().unwrap(), 5);
    assert_eq!(meta["totalPages"].as_i64().unwrap(), 3);
    assert_eq!(meta["hasNextPage"].as_bool().unwrap(), true);
    assert_eq!(meta["hasPreviousPage"].as_bool().unwrap(), false);

    let resp = app
        .get("/posts/my-posts?page=3&limit=2", Some(&user.token))
        .await;
    let body = resp.json();
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    let meta = &body["meta"];
    assert_eq!(meta["hasNextPage"].as_bool().unwrap(), false);
    assert_eq!(meta["hasPreviousPage"].as_bool().unwrap(), true);
}

#[tokio::test]
async fn my_posts_excludes_other_users() {
    let app = app().await;
    let mine = app.create_user("post_mine").await;
    let other = app.create_user("post_theirs").await;
    app.create_post_for_user(mine.id).await;
    app.create_post_for_user(other.id).await;

    let resp = app
        .get("/posts/my-posts?page=1&limit=100", Some(&mine.token))
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert!(data
        .iter()
        .all(|p| p["userId"].as_str() == Some(&mine.id.to_string())));
}

#[tokio::test]
async fn list_posts_invalid_pagination() {
    let app = app().await;
    let user = app.create_user("post_badpage").await;

    let resp = app.get("/posts?page=0&limit=10", Some(&user.token)).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        resp.error_message(),
        "page and limit must be positive integers"
    );

    let resp = app.get("/posts?page=1&limit=0", Some(&user.token)).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);

    let resp = app.get("/posts?page=1&limit=101", Some(&user.token)).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "limit must be at most 100");
}

#[tokio::test]
async fn list_posts_huge_page_is_empty() {
    let app = app().await;
    let user = app.create_user("post_farpage").await;
    app.create_post_for_user(user.id).await;

    // A page far beyond the data is a valid request for an empty page,
    // even at the extreme end of the integer range
    let resp = app
        .get(
            &format!("/posts/my-posts?page={}&limit=100", i64::MAX),
            Some(&user.token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert!(body["data"].as_array().unwrap().is_empty());
    let meta = &body["meta"];
    assert_eq!(meta["totalItems"].as_i64().unwrap(), 1);
    assert_eq!(meta["hasNextPage"].as_bool().unwrap(), false);
    assert_eq!(meta["hasPreviousPage"].as_bool().unwrap(), true);
}
