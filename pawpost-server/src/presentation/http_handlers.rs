use crate::application::{CommentService, PostService, UserService};
use crate::domain::comment::CommentRequest;
use crate::domain::user::{LoginRequest, SignUpRequest, UpdateProfileRequest, UserResponse};
use crate::domain::DomainError;
use crate::presentation::middleware::AuthenticatedUser;
use crate::presentation::multipart::read_post_form;
use actix_multipart::Multipart;
use actix_web::{web, HttpMessage, HttpRequest, HttpResponse, Responder};
use std::sync::Arc;

#[derive(serde::Serialize)]
struct AuthResponse {
    token: String,
    user: UserResponse,
}

#[derive(serde::Deserialize)]
pub struct PostListQuery {
    pub page: Option<i64>,
    pub size: Option<i64>,
    pub sort_by: Option<String>,
    pub direction: Option<String>,
}

fn get_user_id_from_request(req: &HttpRequest) -> Result<i64, DomainError> {
    req.extensions()
        .get::<AuthenticatedUser>()
        .map(|user| user.user_id)
        .ok_or(DomainError::Unauthorized(
            "User not authenticated".to_string(),
        ))
}

pub fn error_to_response(err: DomainError) -> HttpResponse {
    let status_code = err.to_status_code();
    let message = err.to_string();

    match status_code {
        400 => HttpResponse::BadRequest().json(serde_json::json!({ "error": message })),
        401 => HttpResponse::Unauthorized().json(serde_json::json!({ "error": message })),
        403 => HttpResponse::Forbidden().json(serde_json::json!({ "error": message })),
        404 => HttpResponse::NotFound().json(serde_json::json!({ "error": message })),
        409 => HttpResponse::Conflict().json(serde_json::json!({ "error": message })),
        _ => {
            tracing::error!("Request failed: {}", message);
            HttpResponse::InternalServerError()
                .json(serde_json::json!({ "error": "Internal server error" }))
        }
    }
}

// ============== User Handlers ==============

pub async fn sign_up(
    user_service: web::Data<Arc<UserService>>,
    req: web::Json<SignUpRequest>,
) -> impl Responder {
    match user_service.sign_up(req.into_inner()).await {
        Ok(user) => HttpResponse::Created().json(user),
        Err(err) => error_to_response(err),
    }
}

pub async fn login(
    user_service: web::Data<Arc<UserService>>,
    req: web::Json<LoginRequest>,
) -> impl Responder {
    match user_service.login(req.into_inner()).await {
        Ok((token, user)) => HttpResponse::Ok().json(AuthResponse { token, user }),
        Err(err) => error_to_response(err),
    }
}

pub async fn update_profile(
    req: HttpRequest,
    user_service: web::Data<Arc<UserService>>,
    profile: web::Json<UpdateProfileRequest>,
) -> impl Responder {
    let user_id = match get_user_id_from_request(&req) {
        Ok(id) => id,
        Err(err) => return error_to_response(err),
    };

    match user_service
        .update_profile(user_id, profile.into_inner())
        .await
    {
        Ok(user) => HttpResponse::Ok().json(user),
        Err(err) => error_to_response(err),
    }
}

// ============== Post Handlers ==============

pub async fn list_posts(
    post_service: web::Data<Arc<PostService>>,
    query: web::Query<PostListQuery>,
) -> impl Responder {
    let page = query.page.unwrap_or(0);
    let size = query.size.unwrap_or(10);
    let sort_by = query.sort_by.as_deref().unwrap_or("createdAt");
    let direction = query.direction.as_deref().unwrap_or("desc");

    tracing::info!(
        "Listing posts page={}, size={}, sort_by={}, direction={}",
        page,
        size,
        sort_by,
        direction
    );

    match post_service
        .get_post_list(page, size, sort_by, direction)
        .await
    {
        Ok(page) => HttpResponse::Ok().json(page),
        Err(err) => error_to_response(err),
    }
}

pub async fn popular_posts(post_service: web::Data<Arc<PostService>>) -> impl Responder {
    match post_service.get_popular_post_list().await {
        Ok(posts) => HttpResponse::Ok().json(posts),
        Err(err) => error_to_response(err),
    }
}

pub async fn get_post(
    post_service: web::Data<Arc<PostService>>,
    path: web::Path<i64>,
) -> impl Responder {
    let post_id = path.into_inner();

    tracing::info!("Getting post with id={}", post_id);

    match post_service.get_post_by_id(post_id).await {
        Ok(post) => HttpResponse::Ok().json(post),
        Err(err) => error_to_response(err),
    }
}

pub async fn create_post(
    req: HttpRequest,
    post_service: web::Data<Arc<PostService>>,
    payload: Multipart,
) -> impl Responder {
    let user_id = match get_user_id_from_request(&req) {
        Ok(id) => id,
        Err(err) => return error_to_response(err),
    };

    let form = match read_post_form(payload, post_service.max_image_bytes()).await {
        Ok(form) => form,
        Err(err) => return error_to_response(err),
    };

    tracing::info!(
        "Creating post for user_id={} (image attached: {})",
        user_id,
        form.image.is_some()
    );

    match post_service
        .create_post(user_id, form.post, form.image)
        .await
    {
        Ok(post) => HttpResponse::Created().json(post),
        Err(err) => error_to_response(err),
    }
}

pub async fn update_post(
    req: HttpRequest,
    post_service: web::Data<Arc<PostService>>,
    path: web::Path<i64>,
    payload: Multipart,
) -> impl Responder {
    let post_id = path.into_inner();

    let user_id = match get_user_id_from_request(&req) {
        Ok(id) => id,
        Err(err) => return error_to_response(err),
    };

    let form = match read_post_form(payload, post_service.max_image_bytes()).await {
        Ok(form) => form,
        Err(err) => return error_to_response(err),
    };

    tracing::info!("Updating post id={} for user_id={}", post_id, user_id);

    match post_service
        .update_post(post_id, user_id, form.post, form.image)
        .await
    {
        Ok(post) => HttpResponse::Ok().json(post),
        Err(err) => error_to_response(err),
    }
}

pub async fn delete_post(
    req: HttpRequest,
    post_service: web::Data<Arc<PostService>>,
    path: web::Path<i64>,
) -> impl Responder {
    let post_id = path.into_inner();

    let user_id = match get_user_id_from_request(&req) {
        Ok(id) => id,
        Err(err) => return error_to_response(err),
    };

    tracing::info!("Deleting post id={} for user_id={}", post_id, user_id);

    match post_service.delete_post(post_id, user_id).await {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(err) => error_to_response(err),
    }
}

pub async fn like_post(
    req: HttpRequest,
    post_service: web::Data<Arc<PostService>>,
    path: web::Path<i64>,
) -> impl Responder {
    let post_id = path.into_inner();

    let user_id = match get_user_id_from_request(&req) {
        Ok(id) => id,
        Err(err) => return error_to_response(err),
    };

    match post_service.post_like(post_id, user_id).await {
        Ok(like) => HttpResponse::Ok().json(like),
        Err(err) => error_to_response(err),
    }
}

// ============== Comment Handlers ==============

pub async fn create_comment(
    req: HttpRequest,
    comment_service: web::Data<Arc<CommentService>>,
    path: web::Path<i64>,
    comment: web::Json<CommentRequest>,
) -> impl Responder {
    let post_id = path.into_inner();

    let user_id = match get_user_id_from_request(&req) {
        Ok(id) => id,
        Err(err) => return error_to_response(err),
    };

    match comment_service
        .create_comment(post_id, user_id, comment.into_inner())
        .await
    {
        Ok(comment) => HttpResponse::Created().json(comment),
        Err(err) => error_to_response(err),
    }
}

pub async fn delete_comment(
    req: HttpRequest,
    comment_service: web::Data<Arc<CommentService>>,
    path: web::Path<i64>,
) -> impl Responder {
    let comment_id = path.into_inner();

    let user_id = match get_user_id_from_request(&req) {
        Ok(id) => id,
        Err(err) => return error_to_response(err),
    };

    match comment_service.delete_comment(comment_id, user_id).await {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(err) => error_to_response(err),
    }
}
