pub mod comment_service;
pub mod like_service;
pub mod post_service;
pub mod user_service;

pub use comment_service::CommentService;
pub use like_service::LikeService;
pub use post_service::PostService;
pub use user_service::UserService;
