use crate::application::post_service::post_cache_key;
use crate::data::comment_repository::CommentRepository;
use crate::data::post_repository::PostRepository;
use crate::domain::comment::{CommentRequest, CommentResponse};
use crate::domain::policy::ensure_owner;
use crate::domain::DomainError;
use crate::infrastructure::cache::{self, Cache};
use std::sync::Arc;

pub struct CommentService {
    comment_repo: Arc<dyn CommentRepository + Send + Sync>,
    post_repo: Arc<dyn PostRepository + Send + Sync>,
    cache: Arc<dyn Cache>,
}

impl CommentService {
    pub fn new(
        comment_repo: Arc<dyn CommentRepository + Send + Sync>,
        post_repo: Arc<dyn PostRepository + Send + Sync>,
        cache: Arc<dyn Cache>,
    ) -> Self {
        Self {
            comment_repo,
            post_repo,
            cache,
        }
    }

    pub async fn get_comment_list(&self, post_id: i64) -> Result<Vec<CommentResponse>, DomainError> {
        let comments = self.comment_repo.find_by_post(post_id).await?;
        Ok(comments.into_iter().map(CommentResponse::from).collect())
    }

    pub async fn create_comment(
        &self,
        post_id: i64,
        user_id: i64,
        req: CommentRequest,
    ) -> Result<CommentResponse, DomainError> {
        if req.content.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "Comment cannot be empty".to_string(),
            ));
        }

        self.post_repo.find_by_id(post_id).await?.ensure_active()?;

        let comment = self
            .comment_repo
            .create(post_id, user_id, req.content)
            .await?;

        // cached post projections embed their comments
        cache::evict(self.cache.as_ref(), &post_cache_key(post_id)).await;

        tracing::info!(
            "Comment created: id={}, post_id={}, author_id={}",
            comment.id,
            post_id,
            user_id
        );

        Ok(CommentResponse::from(comment))
    }

    pub async fn delete_comment(&self, comment_id: i64, user_id: i64) -> Result<(), DomainError> {
        let comment = self.comment_repo.find_by_id(comment_id).await?;

        ensure_owner(user_id, comment.author_id).inspect_err(|_| {
            tracing::warn!(
                "User {} attempted to delete comment {} owned by {}",
                user_id,
                comment_id,
                comment.author_id
            );
        })?;

        self.comment_repo.delete(comment_id).await?;
        cache::evict(self.cache.as_ref(), &post_cache_key(comment.post_id)).await;

        tracing::info!("Comment deleted: id={}, author_id={}", comment_id, user_id);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::memory::{MemoryCommentRepository, MemoryPostRepository};
    use crate::domain::post::{NewPost, PostResponse};
    use crate::infrastructure::cache::InMemoryCache;
    use std::time::Duration;

    async fn setup() -> (CommentService, Arc<InMemoryCache>, i64) {
        let posts = Arc::new(MemoryPostRepository::default());
        let post = posts
            .create(NewPost {
                author_id: 1,
                title: "walk".to_string(),
                content: "park".to_string(),
                image: None,
            })
            .await
            .unwrap();
        let cache = Arc::new(InMemoryCache::new());
        let service = CommentService::new(
            Arc::new(MemoryCommentRepository::default()),
            posts,
            cache.clone(),
        );
        (service, cache, post.id)
    }

    fn request(content: &str) -> CommentRequest {
        CommentRequest {
            content: content.to_string(),
        }
    }

    #[actix_rt::test]
    async fn create_then_list() {
        let (service, _, post_id) = setup().await;
        service
            .create_comment(post_id, 2, request("good dog"))
            .await
            .unwrap();

        let comments = service.get_comment_list(post_id).await.unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].content, "good dog");
    }

    #[actix_rt::test]
    async fn comment_on_missing_post_is_not_found() {
        let (service, _, _) = setup().await;
        assert!(matches!(
            service.create_comment(999, 2, request("hello")).await,
            Err(DomainError::PostNotFound)
        ));
    }

    #[actix_rt::test]
    async fn only_author_can_delete() {
        let (service, _, post_id) = setup().await;
        let comment = service
            .create_comment(post_id, 2, request("mine"))
            .await
            .unwrap();

        assert!(matches!(
            service.delete_comment(comment.id, 3).await,
            Err(DomainError::Forbidden)
        ));
        service.delete_comment(comment.id, 2).await.unwrap();
        assert!(matches!(
            service.delete_comment(comment.id, 2).await,
            Err(DomainError::CommentNotFound)
        ));
    }

    #[actix_rt::test]
    async fn new_comment_evicts_cached_post() {
        let (service, cache, post_id) = setup().await;
        let key = post_cache_key(post_id);
        cache
            .put(&key, "{}".to_string(), Duration::from_secs(60))
            .await
            .unwrap();

        service
            .create_comment(post_id, 2, request("fresh"))
            .await
            .unwrap();

        let cached: Option<PostResponse> = cache::get_json(cache.as_ref(), &key).await;
        assert!(cached.is_none());
    }
}
