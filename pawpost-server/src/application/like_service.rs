use crate::data::like_repository::LikeRepository;
use crate::domain::like::LikeStatus;
use crate::domain::DomainError;
use std::sync::Arc;

pub struct LikeService {
    like_repo: Arc<dyn LikeRepository + Send + Sync>,
}

impl LikeService {
    pub fn new(like_repo: Arc<dyn LikeRepository + Send + Sync>) -> Self {
        Self { like_repo }
    }

    /// Likes the post, or takes the like back if the user already liked it.
    pub async fn update_like(&self, user_id: i64, post_id: i64) -> Result<LikeStatus, DomainError> {
        if self.like_repo.remove(post_id, user_id).await? {
            tracing::info!("Like removed: post_id={}, user_id={}", post_id, user_id);
            return Ok(LikeStatus::Unliked);
        }

        self.like_repo.insert(post_id, user_id).await?;
        tracing::info!("Like added: post_id={}, user_id={}", post_id, user_id);
        Ok(LikeStatus::Liked)
    }

    pub async fn delete_likes(&self, post_id: i64) -> Result<u64, DomainError> {
        let removed = self.like_repo.remove_all_for_post(post_id).await?;
        tracing::debug!("Removed {} likes of post {}", removed, post_id);
        Ok(removed)
    }

    pub async fn like_count(&self, post_id: i64) -> Result<i64, DomainError> {
        self.like_repo.count_for_post(post_id).await
    }
}
