use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::AppendHeaders,
    Json,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::app::auth::AuthService;
use crate::app::comments::{self, CommentService};
use crate::app::likes::LikeService;
use crate::app::posts::PostService;
use crate::domain::engagement::{Comment, Like, LikeState};
use crate::domain::post::Post;
use crate::domain::user::User;
use crate::http::{auth_cookie, AppError, AuthUser};
use crate::AppState;

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

// ---------------------------------------------------------------------------
// Pagination convention shared by every list endpoint
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Copy)]
struct PageParams {
    page: i64,
    limit: i64,
    offset: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub page: i64,
    pub limit: i64,
    pub total_items: i64,
    pub total_pages: i64,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

#[derive(Serialize)]
pub struct PageResponse<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

fn page_params(page: Option<i64>, limit: Option<i64>) -> Result<PageParams, AppError> {
    let page = page.unwrap_or(1);
    let limit = limit.unwrap_or(10);
    if page < 1 || limit < 1 {
        return Err(AppError::bad_request(
            "page and limit must be positive integers",
        ));
    }
    if limit > 100 {
        return Err(AppError::bad_request("limit must be at most 100"));
    }
    // An absurdly large page is still a valid request for a far-off
    // (empty) page; saturate rather than overflow the offset.
    let offset = page
        .checked_sub(1)
        .and_then(|p| p.checked_mul(limit))
        .unwrap_or(i64::MAX);
    Ok(PageParams { page, limit, offset })
}

fn page_meta(params: PageParams, total_items: i64) -> PageMeta {
    let total_pages = if total_items == 0 {
        0
    } else {
        (total_items + params.limit - 1) / params.limit
    };
    PageMeta {
        page: params.page,
        limit: params.limit,
        total_items,
        total_pages,
        has_next_page: params.page < total_pages,
        has_previous_page: params.page > 1,
    }
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = if state.db.ping().await.is_ok() {
        "ok"
    } else {
        "degraded"
    };
    Json(HealthResponse { status })
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    const MAX_PASSWORD_LEN: usize = 128;

    if payload.username.trim().is_empty()
        || payload.email.trim().is_empty()
        || payload.password.trim().is_empty()
    {
        return Err(AppError::bad_request(
            "username, email and password are required",
        ));
    }
    if payload.password.len() > MAX_PASSWORD_LEN {
        return Err(AppError::bad_request(
            "password must be at most 128 characters",
        ));
    }

    let service = auth_service(&state);
    let user = service
        .signup(payload.username, payload.email, payload.password)
        .await
        .map_err(|err| {
            if let Some(sqlx_err) = err.downcast_ref::<sqlx::Error>() {
                if let Some(db_err) = sqlx_err.as_database_error() {
                    if db_err.code().as_deref() == Some("23505") {
                        return AppError::bad_request("user already exists");
                    }
                }
            }
            tracing::error!(error = ?err, "failed to create user");
            AppError::internal("failed to create user")
        })?;

    Ok((StatusCode::CREATED, Json(user)))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub message: &'static str,
    pub user: User,
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<(AppendHeaders<[(header::HeaderName, String); 1]>, Json<LoginResponse>), AppError> {
    if payload.email.trim().is_empty() || payload.password.trim().is_empty() {
        return Err(AppError::bad_request("email and password are required"));
    }

    let service = auth_service(&state);
    let outcome = service
        .login(&payload.email, &payload.password)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to login");
            AppError::internal("failed to login")
        })?;

    let (user, token) = match outcome {
        Some(outcome) => outcome,
        None => return Err(AppError::unauthorized("invalid email or password")),
    };

    let cookie = auth_cookie(
        &token,
        state.auth_token_ttl_hours * 60 * 60,
        state.cookie_secure,
    );
    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Json(LoginResponse {
            message: "login successful",
            user,
        }),
    ))
}

pub async fn get_current_user(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<User>, AppError> {
    let service = auth_service(&state);
    let user = service.current_user(auth.user_id).await.map_err(|err| {
        tracing::error!(error = ?err, user_id = %auth.user_id, "failed to fetch current user");
        AppError::internal("failed to fetch current user")
    })?;

    match user {
        Some(user) => Ok(Json(user)),
        None => Err(AppError::not_found("user not found")),
    }
}

fn auth_service(state: &AppState) -> AuthService {
    AuthService::new(
        state.db.clone(),
        state.auth_token_key,
        state.auth_token_ttl_hours,
    )
}

// ---------------------------------------------------------------------------
// Posts
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct CreatePostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
}

pub async fn create_post(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<Post>), AppError> {
    let (title, content) = match (payload.title, payload.content) {
        (Some(title), Some(content))
            if !title.trim().is_empty() && !content.trim().is_empty() =>
        {
            (title, content)
        }
        _ => return Err(AppError::bad_request("title and content are required")),
    };

    let service = PostService::new(state.db.clone());
    let post = service
        .create_post(auth.user_id, title, content)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %auth.user_id, "failed to create post");
            AppError::internal("failed to create post")
        })?;

    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn list_posts(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PageResponse<Post>>, AppError> {
    let params = page_params(query.page, query.limit)?;

    let service = PostService::new(state.db.clone());
    let posts = service
        .list_posts(auth.user_id, params.limit, params.offset)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to list posts");
            AppError::internal("failed to list posts")
        })?;
    let total = service.count_posts().await.map_err(|err| {
        tracing::error!(error = ?err, "failed to count posts");
        AppError::internal("failed to list posts")
    })?;

    Ok(Json(PageResponse {
        data: posts,
        meta: page_meta(params, total),
    }))
}

pub async fn list_my_posts(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PageResponse<Post>>, AppError> {
    let params = page_params(query.page, query.limit)?;

    let service = PostService::new(state.db.clone());
    let posts = service
        .list_posts_by_owner(auth.user_id, params.limit, params.offset)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %auth.user_id, "failed to list own posts");
            AppError::internal("failed to list posts")
        })?;
    let total = service
        .count_posts_by_owner(auth.user_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %auth.user_id, "failed to count own posts");
            AppError::internal("failed to list posts")
        })?;

    Ok(Json(PageResponse {
        data: posts,
        meta: page_meta(params, total),
    }))
}

pub async fn get_post(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Post>, AppError> {
    let service = PostService::new(state.db.clone());
    let post = service.get_post(id, auth.user_id).await.map_err(|err| {
        tracing::error!(error = ?err, post_id = %id, "failed to fetch post");
        AppError::internal("failed to fetch post")
    })?;

    match post {
        Some(post) => Ok(Json(post)),
        None => Err(AppError::not_found("post not found")),
    }
}

#[derive(Deserialize)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
}

pub async fn update_post(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdatePostRequest>,
) -> Result<Json<Post>, AppError> {
    if let Some(title) = &payload.title {
        if title.trim().is_empty() {
            return Err(AppError::bad_request("title cannot be empty"));
        }
    }
    if let Some(content) = &payload.content {
        if content.trim().is_empty() {
            return Err(AppError::bad_request("content cannot be empty"));
        }
    }

    let service = PostService::new(state.db.clone());
    require_post_owner(&service, id, auth.user_id, "update").await?;

    let post = service
        .update_post(id, auth.user_id, payload.title, payload.content)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, post_id = %id, "failed to update post");
            AppError::internal("failed to update post")
        })?;

    match post {
        Some(post) => Ok(Json(post)),
        None => Err(AppError::not_found("post not found")),
    }
}

pub async fn delete_post(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, AppError> {
    let service = PostService::new(state.db.clone());
    require_post_owner(&service, id, auth.user_id, "delete").await?;

    let deleted = service.delete_post(id).await.map_err(|err| {
        tracing::error!(error = ?err, post_id = %id, "failed to delete post");
        AppError::internal("failed to delete post")
    })?;

    if !deleted {
        return Err(AppError::not_found("post not found"));
    }
    Ok(Json(MessageResponse {
        message: "post deleted successfully",
    }))
}

/// 404 if the post is absent, 403 if the caller is not its owner.
async fn require_post_owner(
    service: &PostService,
    post_id: Uuid,
    user_id: Uuid,
    action: &'static str,
) -> Result<(), AppError> {
    let owner = service.post_owner(post_id).await.map_err(|err| {
        tracing::error!(error = ?err, post_id = %post_id, "failed to fetch post owner");
        AppError::internal("failed to fetch post")
    })?;

    match owner {
        None => Err(AppError::not_found("post not found")),
        Some(owner) if owner != user_id => Err(AppError::forbidden(format!(
            "you are not authorized to {} this post",
            action
        ))),
        Some(_) => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Comments
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    pub post_id: Option<Uuid>,
    pub content: Option<String>,
}

pub async fn create_comment(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<Comment>), AppError> {
    let (post_id, content) = match (payload.post_id, payload.content) {
        (Some(post_id), Some(content)) if !content.trim().is_empty() => (post_id, content),
        _ => return Err(AppError::bad_request("post id and content are required")),
    };

    let service = CommentService::new(state.db.clone());
    let comment = service
        .create_comment(auth.user_id, post_id, content)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, post_id = %post_id, "failed to create comment");
            AppError::internal("failed to create comment")
        })?;

    match comment {
        Some(comment) => Ok((StatusCode::CREATED, Json(comment))),
        None => Err(AppError::not_found("post not found")),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementListQuery {
    pub post_id: Option<Uuid>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

pub async fn list_comments(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<EngagementListQuery>,
) -> Result<Json<PageResponse<Comment>>, AppError> {
    let post_id = query
        .post_id
        .ok_or_else(|| AppError::bad_request("post id is required"))?;
    let params = page_params(query.page, query.limit)?;

    require_post_exists(&state, post_id).await?;

    let service = CommentService::new(state.db.clone());
    let comments = service
        .list_comments(post_id, params.limit, params.offset)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, post_id = %post_id, "failed to list comments");
            AppError::internal("failed to list comments")
        })?;
    let total = service.count_comments(post_id).await.map_err(|err| {
        tracing::error!(error = ?err, post_id = %post_id, "failed to count comments");
        AppError::internal("failed to list comments")
    })?;

    Ok(Json(PageResponse {
        data: comments,
        meta: page_meta(params, total),
    }))
}

#[derive(Deserialize)]
pub struct UpdateCommentRequest {
    pub content: Option<String>,
}

pub async fn update_comment(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdateCommentRequest>,
) -> Result<Json<Comment>, AppError> {
    let content = match payload.content {
        Some(content) if !content.trim().is_empty() => content,
        _ => return Err(AppError::bad_request("content is required")),
    };

    let service = CommentService::new(state.db.clone());
    let meta = service.comment_meta(id).await.map_err(|err| {
        tracing::error!(error = ?err, comment_id = %id, "failed to fetch comment");
        AppError::internal("failed to fetch comment")
    })?;

    let meta = match meta {
        Some(meta) => meta,
        None => return Err(AppError::not_found("comment not found")),
    };
    if meta.user_id != auth.user_id {
        return Err(AppError::forbidden(
            "you are not authorized to edit this comment",
        ));
    }
    if !comments::is_editable(meta.created_at, OffsetDateTime::now_utc()) {
        return Err(AppError::forbidden("comment can no longer be edited"));
    }

    let comment = service.update_comment(id, content).await.map_err(|err| {
        tracing::error!(error = ?err, comment_id = %id, "failed to update comment");
        AppError::internal("failed to update comment")
    })?;

    match comment {
        Some(comment) => Ok(Json(comment)),
        None => Err(AppError::not_found("comment not found")),
    }
}

pub async fn delete_comment(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, AppError> {
    let service = CommentService::new(state.db.clone());
    let meta = service.comment_meta(id).await.map_err(|err| {
        tracing::error!(error = ?err, comment_id = %id, "failed to fetch comment");
        AppError::internal("failed to fetch comment")
    })?;

    let meta = match meta {
        Some(meta) => meta,
        None => return Err(AppError::not_found("comment not found")),
    };
    if meta.user_id != auth.user_id {
        return Err(AppError::forbidden(
            "you are not authorized to delete this comment",
        ));
    }

    let deleted = service.delete_comment(id).await.map_err(|err| {
        tracing::error!(error = ?err, comment_id = %id, "failed to delete comment");
        AppError::internal("failed to delete comment")
    })?;

    if !deleted {
        return Err(AppError::not_found("comment not found"));
    }
    Ok(Json(MessageResponse {
        message: "comment deleted successfully",
    }))
}

// ---------------------------------------------------------------------------
// Likes
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleLikeRequest {
    pub post_id: Option<Uuid>,
}

#[derive(Serialize)]
pub struct ToggleLikeResponse {
    pub message: &'static str,
    pub like: LikeState,
}

pub async fn toggle_like(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<ToggleLikeRequest>,
) -> Result<Json<ToggleLikeResponse>, AppError> {
    let post_id = payload
        .post_id
        .ok_or_else(|| AppError::bad_request("post id is required"))?;

    require_post_exists(&state, post_id).await?;

    let service = LikeService::new(state.db.clone());
    let like = service.toggle(auth.user_id, post_id).await.map_err(|err| {
        tracing::error!(error = ?err, post_id = %post_id, user_id = %auth.user_id, "failed to toggle like");
        AppError::internal("failed to toggle like")
    })?;

    Ok(Json(ToggleLikeResponse {
        message: "like toggled successfully",
        like,
    }))
}

pub async fn list_likes(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<EngagementListQuery>,
) -> Result<Json<PageResponse<Like>>, AppError> {
    let post_id = query
        .post_id
        .ok_or_else(|| AppError::bad_request("post id is required"))?;
    let params = page_params(query.page, query.limit)?;

    require_post_exists(&state, post_id).await?;

    let service = LikeService::new(state.db.clone());
    let likes = service
        .list_likes(post_id, params.limit, params.offset)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, post_id = %post_id, "failed to list likes");
            AppError::internal("failed to list likes")
        })?;
    let total = service.count_likes(post_id).await.map_err(|err| {
        tracing::error!(error = ?err, post_id = %post_id, "failed to count likes");
        AppError::internal("failed to list likes")
    })?;

    Ok(Json(PageResponse {
        data: likes,
        meta: page_meta(params, total),
    }))
}

async fn require_post_exists(state: &AppState, post_id: Uuid) -> Result<(), AppError> {
    let service = PostService::new(state.db.clone());
    let owner = service.post_owner(post_id).await.map_err(|err| {
        tracing::error!(error = ?err, post_id = %post_id, "failed to fetch post");
        AppError::internal("failed to fetch post")
    })?;

    if owner.is_none() {
        return Err(AppError::not_found("post not found"));
    }
    Ok(())
}
