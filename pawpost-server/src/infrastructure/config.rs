use anyhow::{Context, Result};
use std::time::Duration;

const DEFAULT_MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;
const MAX_CACHE_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Path under which the server exposes `UPLOAD_DIR` when images are stored locally.
pub const UPLOADS_ROUTE: &str = "/uploads";

/// Bucket settings; present only when `S3_BUCKET` is set.
#[derive(Debug, Clone)]
pub struct S3Settings {
    pub bucket: String,
    pub region: String,
    /// Custom endpoint for S3-compatible services (MinIO, LocalStack).
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub public_base_url: String,
}

impl S3Settings {
    /// Virtual-hosted AWS URL, or `<endpoint>/<bucket>` for custom endpoints.
    pub fn default_public_url(bucket: &str, region: &str, endpoint: Option<&str>) -> String {
        match endpoint {
            Some(endpoint) => format!("{}/{}", endpoint.trim_end_matches('/'), bucket),
            None => format!("https://{}.s3.{}.amazonaws.com", bucket, region),
        }
    }

    fn from_env() -> Option<Self> {
        let bucket = non_empty_var("S3_BUCKET")?;
        let region = var_or("S3_REGION", "us-east-1");
        let endpoint = non_empty_var("S3_ENDPOINT");
        let public_base_url = non_empty_var("S3_PUBLIC_URL").unwrap_or_else(|| {
            Self::default_public_url(&bucket, &region, endpoint.as_deref())
        });

        Some(Self {
            access_key_id: non_empty_var("AWS_ACCESS_KEY_ID"),
            secret_access_key: non_empty_var("AWS_SECRET_ACCESS_KEY"),
            bucket,
            region,
            endpoint,
            public_base_url,
        })
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub http_port: String,
    pub cors_allowed_origins: String,
    pub redis_url: Option<String>,
    pub s3: Option<S3Settings>,
    pub upload_dir: String,
    pub public_base_url: String,
    pub post_cache_ttl: Duration,
    pub popular_cache_ttl: Duration,
    pub max_image_bytes: usize,
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} has an invalid value: {}", name, raw)),
        Err(_) => Ok(default),
    }
}

fn check_ttl(name: &str, secs: u64) -> Result<Duration> {
    if secs > MAX_CACHE_TTL_SECS {
        anyhow::bail!(
            "{} must be at most {} seconds, got {}",
            name,
            MAX_CACHE_TTL_SECS,
            secs
        );
    }
    Ok(Duration::from_secs(secs))
}

fn ttl_or(name: &str, default_secs: u64) -> Result<Duration> {
    check_ttl(name, parse_or(name, default_secs)?)
}

impl AppConfig {
    /// Reads the configuration from the environment (after `.env` has been loaded).
    pub fn from_env() -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let jwt_secret = std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        let http_port = var_or("HTTP_PORT", "3000");

        Ok(Self {
            database_url,
            database_max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 5)?,
            jwt_secret,
            cors_allowed_origins: var_or(
                "CORS_ALLOWED_ORIGINS",
                "http://localhost:8000,http://127.0.0.1:8000",
            ),
            redis_url: non_empty_var("REDIS_URL"),
            s3: S3Settings::from_env(),
            upload_dir: var_or("UPLOAD_DIR", "uploads"),
            public_base_url: var_or(
                "PUBLIC_BASE_URL",
                &format!("http://localhost:{}{}", http_port, UPLOADS_ROUTE),
            ),
            http_port,
            post_cache_ttl: ttl_or("POST_CACHE_TTL_SECS", 300)?,
            popular_cache_ttl: ttl_or("POPULAR_CACHE_TTL_SECS", 60)?,
            max_image_bytes: parse_or("MAX_IMAGE_BYTES", DEFAULT_MAX_IMAGE_BYTES)?,
        })
    }

    pub fn http_addr(&self) -> String {
        format!("0.0.0.0:{}", self.http_port)
    }
}
