pub mod http_handlers;
pub mod middleware;
pub mod multipart;
pub mod routes;
