use crate::infrastructure::config::UPLOADS_ROUTE;
use crate::presentation::{http_handlers, middleware::jwt_middleware};
use actix_files::Files;
use actix_web::web;
use actix_web_httpauth::middleware::HttpAuthentication;

pub fn configure(cfg: &mut web::ServiceConfig) {
    let auth_middleware = HttpAuthentication::bearer(jwt_middleware);

    cfg
        // Public routes - users
        .service(
            web::scope("/api/v1/users")
                .route("/signup", web::post().to(http_handlers::sign_up))
                .route("/login", web::post().to(http_handlers::login)),
        )
        // Public routes - posts (read-only)
        .service(
            web::scope("/api/v1/posts")
                .route("", web::get().to(http_handlers::list_posts))
                .route("/popular", web::get().to(http_handlers::popular_posts))
                .route("/{id}", web::get().to(http_handlers::get_post)),
        )
        // Protected routes
        .service(
            web::scope("/api/v1/protected")
                .wrap(auth_middleware)
                .route("/users/profile", web::patch().to(http_handlers::update_profile))
                .route("/posts", web::post().to(http_handlers::create_post))
                .route("/posts/{id}", web::put().to(http_handlers::update_post))
                .route("/posts/{id}", web::delete().to(http_handlers::delete_post))
                .route("/posts/{id}/like", web::post().to(http_handlers::like_post))
                .route(
                    "/posts/{id}/comments",
                    web::post().to(http_handlers::create_comment),
                )
                .route(
                    "/comments/{id}",
                    web::delete().to(http_handlers::delete_comment),
                ),
        );
}

/// Serves locally stored images so their public URLs resolve.
pub fn uploads(upload_dir: &str) -> Files {
    Files::new(UPLOADS_ROUTE, upload_dir)
}
