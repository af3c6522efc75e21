use crate::application::comment_service::CommentService;
use crate::application::like_service::LikeService;
use crate::data::post_repository::PostRepository;
use crate::data::user_repository::UserRepository;
use crate::domain::image::{ImageRef, ImageUpload};
use crate::domain::like::LikeResponse;
use crate::domain::page::{PageRequest, PageResponse};
use crate::domain::policy::ensure_owner;
use crate::domain::post::{NewPost, PopularPostResponse, PostChanges, PostRequest, PostResponse};
use crate::domain::DomainError;
use crate::infrastructure::cache::{self, Cache, CacheKey};
use crate::infrastructure::storage::ObjectStorage;
use std::sync::Arc;
use std::time::Duration;

pub const POPULAR_POST_LIMIT: i64 = 10;
pub const POST_CACHE: &str = "posts";
pub const POPULAR_POST_CACHE: &str = "popular_posts";

pub fn post_cache_key(post_id: i64) -> CacheKey {
    CacheKey::new(POST_CACHE, post_id)
}

pub fn popular_post_cache_key() -> CacheKey {
    CacheKey::new(POPULAR_POST_CACHE, "get_popular_post_list")
}

#[derive(Debug, Clone, Copy)]
pub struct PostSettings {
    pub post_cache_ttl: Duration,
    pub popular_cache_ttl: Duration,
    pub max_image_bytes: usize,
}

pub struct PostService {
    post_repo: Arc<dyn PostRepository + Send + Sync>,
    user_repo: Arc<dyn UserRepository + Send + Sync>,
    storage: Arc<dyn ObjectStorage>,
    cache: Arc<dyn Cache>,
    comment_service: Arc<CommentService>,
    like_service: Arc<LikeService>,
    settings: PostSettings,
}

impl PostService {
    pub fn new(
        post_repo: Arc<dyn PostRepository + Send + Sync>,
        user_repo: Arc<dyn UserRepository + Send + Sync>,
        storage: Arc<dyn ObjectStorage>,
        cache: Arc<dyn Cache>,
        comment_service: Arc<CommentService>,
        like_service: Arc<LikeService>,
        settings: PostSettings,
    ) -> Self {
        Self {
            post_repo,
            user_repo,
            storage,
            cache,
            comment_service,
            like_service,
            settings,
        }
    }

    pub fn max_image_bytes(&self) -> usize {
        self.settings.max_image_bytes
    }

    /// Most viewed active posts. Cached for `popular_cache_ttl` and dropped
    /// whenever a post is updated or deleted.
    pub async fn get_popular_post_list(&self) -> Result<Vec<PopularPostResponse>, DomainError> {
        cache::get_or_populate(
            self.cache.as_ref(),
            &popular_post_cache_key(),
            self.settings.popular_cache_ttl,
            || async {
                let posts = self.post_repo.find_top_by_views(POPULAR_POST_LIMIT).await?;
                Ok::<_, DomainError>(posts.into_iter().map(PopularPostResponse::from).collect())
            },
        )
        .await
    }

    pub async fn get_post_list(
        &self,
        page: i64,
        size: i64,
        sort_by: &str,
        direction: &str,
    ) -> Result<PageResponse<PostResponse>, DomainError> {
        let page_request = PageRequest::new(page, size, sort_by, direction)?;
        let (posts, total) = self.post_repo.find_active_page(page_request).await?;

        let mut content = Vec::with_capacity(posts.len());
        for post in posts {
            let comments = self.comment_service.get_comment_list(post.id).await?;
            content.push(PostResponse::from_post(post, comments));
        }

        Ok(PageResponse {
            content,
            page,
            size,
            total_elements: total,
        })
    }

    /// Every successful read adds one view in the database. A cached projection
    /// is returned as stored, so its `views` lags behind the persisted count.
    pub async fn get_post_by_id(&self, post_id: i64) -> Result<PostResponse, DomainError> {
        let key = post_cache_key(post_id);

        if let Some(cached) = cache::get_json::<PostResponse>(self.cache.as_ref(), &key).await {
            return match self.post_repo.increment_views(post_id).await? {
                Some(_) => Ok(cached),
                None => {
                    cache::evict(self.cache.as_ref(), &key).await;
                    Err(DomainError::PostNotFound)
                }
            };
        }

        let mut post = self.post_repo.find_by_id(post_id).await?.ensure_active()?;
        post.views = self
            .post_repo
            .increment_views(post_id)
            .await?
            .ok_or(DomainError::PostNotFound)?;

        let comments = self.comment_service.get_comment_list(post_id).await?;
        let response = PostResponse::from_post(post, comments);

        cache::put_json(
            self.cache.as_ref(),
            &key,
            &response,
            self.settings.post_cache_ttl,
        )
        .await;

        Ok(response)
    }

    pub async fn create_post(
        &self,
        user_id: i64,
        req: PostRequest,
        image: Option<ImageUpload>,
    ) -> Result<PostResponse, DomainError> {
        let user = self.user_repo.find_by_id(user_id).await?;

        req.validate()?;
        if let Some(upload) = &image {
            upload.validate(self.settings.max_image_bytes)?;
        }

        let image = match image {
            Some(upload) => Some(self.storage.upload(upload).await?),
            None => None,
        };

        let new_post = NewPost {
            author_id: user.id,
            title: req.title,
            content: req.content,
            image: image.clone(),
        };

        let post = match self.post_repo.create(new_post).await {
            Ok(post) => post,
            Err(e) => {
                self.discard_image(image.as_ref()).await;
                return Err(e);
            }
        };

        tracing::info!("Post created: id={}, author_id={}", post.id, user_id);

        Ok(PostResponse::from_post(post, Vec::new()))
    }

    /// Replaces title, content and image. The previous image is removed from
    /// storage before the new one is uploaded.
    pub async fn update_post(
        &self,
        post_id: i64,
        user_id: i64,
        req: PostRequest,
        image: Option<ImageUpload>,
    ) -> Result<PostResponse, DomainError> {
        let post = self.post_repo.find_by_id(post_id).await?.ensure_active()?;

        ensure_owner(user_id, post.author_id).inspect_err(|_| {
            tracing::warn!(
                "User {} attempted to update post {} owned by {}",
                user_id,
                post_id,
                post.author_id
            );
        })?;

        req.validate()?;
        if let Some(upload) = &image {
            upload.validate(self.settings.max_image_bytes)?;
        }

        if let Some(old_image) = &post.image {
            self.storage.delete(&old_image.object_key()?).await?;
        }

        let image = match image {
            Some(upload) => Some(self.storage.upload(upload).await?),
            None => None,
        };

        let changes = PostChanges {
            title: req.title,
            content: req.content,
            image: image.clone(),
        };

        let updated_post = match self.post_repo.update(post_id, changes).await {
            Ok(post) => post,
            Err(e) => {
                self.discard_image(image.as_ref()).await;
                return Err(e);
            }
        };

        let comments = self.comment_service.get_comment_list(post_id).await?;
        let response = PostResponse::from_post(updated_post, comments);

        cache::put_json(
            self.cache.as_ref(),
            &post_cache_key(post_id),
            &response,
            self.settings.post_cache_ttl,
        )
        .await;
        cache::evict(self.cache.as_ref(), &popular_post_cache_key()).await;

        tracing::info!("Post updated: id={}, author_id={}", post_id, user_id);

        Ok(response)
    }

    pub async fn delete_post(&self, post_id: i64, user_id: i64) -> Result<(), DomainError> {
        let post = self.post_repo.find_by_id(post_id).await?.ensure_active()?;

        ensure_owner(user_id, post.author_id).inspect_err(|_| {
            tracing::warn!(
                "User {} attempted to delete post {} owned by {}",
                user_id,
                post_id,
                post.author_id
            );
        })?;

        if let Some(image) = &post.image {
            self.storage.delete(&image.object_key()?).await?;
        }

        self.post_repo.soft_delete(post_id).await?;
        self.like_service.delete_likes(post_id).await?;

        cache::evict(self.cache.as_ref(), &post_cache_key(post_id)).await;
        cache::evict(self.cache.as_ref(), &popular_post_cache_key()).await;

        tracing::info!("Post deleted: id={}, author_id={}", post_id, user_id);

        Ok(())
    }

    pub async fn post_like(&self, post_id: i64, user_id: i64) -> Result<LikeResponse, DomainError> {
        self.post_repo.find_by_id(post_id).await?.ensure_active()?;

        let status = self.like_service.update_like(user_id, post_id).await?;
        let like_count = self.like_service.like_count(post_id).await?;

        Ok(LikeResponse {
            post_id,
            status,
            like_count,
        })
    }

    /// Best-effort removal of an object uploaded for a write that did not persist.
    async fn discard_image(&self, image: Option<&ImageRef>) {
        let Some(key) = image.and_then(|image| image.key.as_deref()) else {
            return;
        };

        if let Err(e) = self.storage.delete(key).await {
            tracing::error!("Failed to discard orphaned image {}: {}", key, e);
        }
    }
}
