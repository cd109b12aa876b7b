use axum::{routing::delete, routing::get, routing::post, routing::put, Router};

use crate::http::handlers;
use crate::AppState;

pub fn health() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health))
}

pub fn users() -> Router<AppState> {
    Router::new()
        .route("/users", post(handlers::create_user))
        .route("/users", get(handlers::get_current_user))
        .route("/users/login", post(handlers::login))
}

pub fn posts() -> Router<AppState> {
    Router::new()
        .route("/posts", get(handlers::list_posts))
        .route("/posts", post(handlers::create_post))
        .route("/posts/my-posts", get(handlers::list_my_posts))
        .route("/posts/:id", get(handlers::get_post))
        .route("/posts/:id", put(handlers::update_post))
        .route("/posts/:id", delete(handlers::delete_post))
}

pub fn comments() -> Router<AppState> {
    Router::new()
        .route("/comment", get(handlers::list_comments))
        .route("/comment", post(handlers::create_comment))
        .route("/comment/:id", put(handlers::update_comment))
        .route("/comment/:id", delete(handlers::delete_comment))
}

pub fn likes() -> Router<AppState> {
    Router::new()
        .route("/likes", post(handlers::toggle_like))
        .route("/likes", get(handlers::list_likes))
}
