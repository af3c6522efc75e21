use dotenvy::dotenv;
use std::sync::Arc;

mod application;
mod data;
mod domain;
mod infrastructure;
mod presentation;

use application::post_service::PostSettings;
use application::{CommentService, LikeService, PostService, UserService};
use data::{
    comment_repository::PostgresCommentRepository, like_repository::PostgresLikeRepository,
    post_repository::PostgresPostRepository, user_repository::PostgresUserRepository,
};
use infrastructure::{
    cache::{Cache, InMemoryCache, RedisCache},
    config::AppConfig,
    database::{create_pool, run_migrations},
    jwt::JwtService,
    logging::init_logging,
    storage::{LocalObjectStorage, ObjectStorage, S3ObjectStorage},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    init_logging()?;

    let config = AppConfig::from_env()?;

    tracing::info!("Starting pawpost server...");
    tracing::info!("HTTP server will listen on {}", config.http_addr());
    tracing::info!("CORS allowed origins: {}", config.cors_allowed_origins);

    tracing::info!("Connecting to database...");
    let pool = create_pool(&config.database_url, config.database_max_connections).await?;

    tracing::info!("Running database migrations...");
    run_migrations(&pool).await?;

    let cache: Arc<dyn Cache> = match &config.redis_url {
        Some(url) => Arc::new(RedisCache::connect(url).await?),
        None => {
            tracing::warn!("REDIS_URL not set, using in-process cache");
            Arc::new(InMemoryCache::new())
        }
    };

    let storage: Arc<dyn ObjectStorage> = match &config.s3 {
        Some(s3) => Arc::new(S3ObjectStorage::connect(s3).await),
        None => {
            tracing::info!("S3_BUCKET not set, storing uploads in {}", config.upload_dir);
            Arc::new(LocalObjectStorage::new(
                &config.upload_dir,
                &config.public_base_url,
            ))
        }
    };
    let local_upload_dir = config.s3.is_none().then(|| config.upload_dir.clone());

    tracing::info!("Initializing services...");

    let jwt_service = Arc::new(JwtService::new(&config.jwt_secret)?);

    // Repositories
    let user_repo = Arc::new(PostgresUserRepository::new(pool.clone()));
    let post_repo = Arc::new(PostgresPostRepository::new(pool.clone()));
    let comment_repo = Arc::new(PostgresCommentRepository::new(pool.clone()));
    let like_repo = Arc::new(PostgresLikeRepository::new(pool.clone()));

    // Application services
    let user_service = Arc::new(UserService::new(user_repo.clone(), jwt_service.clone()));
    let comment_service = Arc::new(CommentService::new(
        comment_repo,
        post_repo.clone(),
        cache.clone(),
    ));
    let like_service = Arc::new(LikeService::new(like_repo));
    let post_service = Arc::new(PostService::new(
        post_repo,
        user_repo,
        storage,
        cache,
        comment_service.clone(),
        like_service,
        PostSettings {
            post_cache_ttl: config.post_cache_ttl,
            popular_cache_ttl: config.popular_cache_ttl,
            max_image_bytes: config.max_image_bytes,
        },
    ));

    tracing::info!("Services initialized successfully");

    run_http_server(
        config,
        local_upload_dir,
        user_service,
        post_service,
        comment_service,
        jwt_service,
    )
    .await?;

    tracing::info!("Shutting down...");
    Ok(())
}

/// Configure CORS for the HTTP server with allowed origins from .env
fn configure_cors(allowed_origins: &str) -> actix_cors::Cors {
    use actix_cors::Cors;
    use actix_web::http::header;

    let mut cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
        .allowed_headers(vec![
            header::AUTHORIZATION,
            header::ACCEPT,
            header::CONTENT_TYPE,
        ])
        .expose_headers(vec![header::AUTHORIZATION])
        .max_age(3600);

    for origin in allowed_origins.split(',').map(|s| s.trim()) {
        if !origin.is_empty() {
            cors = cors.allowed_origin(origin);
            tracing::debug!("Added allowed CORS origin: {}", origin);
        }
    }

    cors
}

async fn run_http_server(
    config: AppConfig,
    local_upload_dir: Option<String>,
    user_service: Arc<UserService>,
    post_service: Arc<PostService>,
    comment_service: Arc<CommentService>,
    jwt_service: Arc<JwtService>,
) -> anyhow::Result<()> {
    use actix_web::{middleware::Logger, web, App, HttpServer};

    let addr = config.http_addr();
    let cors_allowed_origins = config.cors_allowed_origins.clone();

    let server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(configure_cors(&cors_allowed_origins))
            .app_data(web::Data::new(user_service.clone()))
            .app_data(web::Data::new(post_service.clone()))
            .app_data(web::Data::new(comment_service.clone()))
            .app_data(web::Data::new(jwt_service.clone()))
            .configure(presentation::routes::configure)
            .configure(|cfg| {
                if let Some(dir) = &local_upload_dir {
                    cfg.service(presentation::routes::uploads(dir));
                }
            })
    })
    .bind(&addr)?
    .run();

    tracing::info!("HTTP server running on {}", addr);

    server.await?;

    Ok(())
}
