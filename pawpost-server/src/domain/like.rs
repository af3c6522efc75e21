use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LikeStatus {
    Liked,
    Unliked,
}

#[derive(Debug, Serialize)]
pub struct LikeResponse {
    pub post_id: i64,
    pub status: LikeStatus,
    pub like_count: i64,
}
