//! In-memory repositories used by the service tests.

use crate::data::comment_repository::CommentRepository;
use crate::data::like_repository::LikeRepository;
use crate::data::post_repository::PostRepository;
use crate::data::user_repository::UserRepository;
use crate::domain::page::{PageRequest, PostSortField, SortDirection};
use crate::domain::post::{NewPost, PostChanges, PostStatus};
use crate::domain::user::SignUpRequest;
use crate::domain::{Comment, DomainError, Post, User};
use async_trait::async_trait;
use chrono::Utc;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Mutex;

#[derive(Default)]
pub struct MemoryPostRepository {
    posts: Mutex<Vec<Post>>,
    pub fail_writes: Mutex<bool>,
}

impl MemoryPostRepository {
    pub fn insert(&self, post: Post) {
        self.posts.lock().unwrap().push(post);
    }

    pub fn get(&self, id: i64) -> Option<Post> {
        self.posts.lock().unwrap().iter().find(|p| p.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.posts.lock().unwrap().len()
    }

    fn check_writes(&self) -> Result<(), DomainError> {
        if *self.fail_writes.lock().unwrap() {
            Err(DomainError::DatabaseError("write rejected".to_string()))
        } else {
            Ok(())
        }
    }
}

fn compare(a: &Post, b: &Post, field: PostSortField) -> Ordering {
    match field {
        PostSortField::Id => a.id.cmp(&b.id),
        PostSortField::Title => a.title.cmp(&b.title),
        PostSortField::Views => a.views.cmp(&b.views),
        PostSortField::CreatedAt => a.created_at.cmp(&b.created_at),
        PostSortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
    }
}

#[async_trait]
impl PostRepository for MemoryPostRepository {
    async fn create(&self, new_post: NewPost) -> Result<Post, DomainError> {
        self.check_writes()?;
        let mut posts = self.posts.lock().unwrap();
        let now = Utc::now();
        let post = Post {
            id: posts.iter().map(|p| p.id).max().unwrap_or(0) + 1,
            author_id: new_post.author_id,
            title: new_post.title,
            content: new_post.content,
            image: new_post.image,
            views: 0,
            status: PostStatus::Active,
            created_at: now,
            updated_at: now,
        };
        posts.push(post.clone());
        Ok(post)
    }

    async fn find_by_id(&self, id: i64) -> Result<Post, DomainError> {
        self.get(id).ok_or(DomainError::PostNotFound)
    }

    async fn update(&self, id: i64, changes: PostChanges) -> Result<Post, DomainError> {
        self.check_writes()?;
        let mut posts = self.posts.lock().unwrap();
        let post = posts
            .iter_mut()
            .find(|p| p.id == id && p.is_active())
            .ok_or(DomainError::PostNotFound)?;
        post.title = changes.title;
        post.content = changes.content;
        post.image = changes.image;
        post.updated_at = Utc::now();
        Ok(post.clone())
    }

    async fn increment_views(&self, id: i64) -> Result<Option<i64>, DomainError> {
        let mut posts = self.posts.lock().unwrap();
        Ok(posts
            .iter_mut()
            .find(|p| p.id == id && p.is_active())
            .map(|post| {
                post.views += 1;
                post.views
            }))
    }

    async fn soft_delete(&self, id: i64) -> Result<(), DomainError> {
        self.check_writes()?;
        let mut posts = self.posts.lock().unwrap();
        let post = posts
            .iter_mut()
            .find(|p| p.id == id && p.is_active())
            .ok_or(DomainError::PostNotFound)?;
        post.status = PostStatus::Deleted;
        Ok(())
    }

    async fn find_top_by_views(&self, limit: i64) -> Result<Vec<Post>, DomainError> {
        let mut active: Vec<Post> = self
            .posts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.is_active())
            .cloned()
            .collect();
        active.sort_by(|a, b| b.views.cmp(&a.views).then(b.id.cmp(&a.id)));
        active.truncate(limit as usize);
        Ok(active)
    }

    async fn find_active_page(&self, page: PageRequest) -> Result<(Vec<Post>, i64), DomainError> {
        let mut active: Vec<Post> = self
            .posts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.is_active())
            .cloned()
            .collect();
        active.sort_by(|a, b| {
            let ordering = compare(a, b, page.sort).then(a.id.cmp(&b.id));
            match page.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });
        let total = active.len() as i64;
        let content = active
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.size as usize)
            .collect();
        Ok((content, total))
    }
}

#[derive(Default)]
pub struct MemoryUserRepository {
    users: Mutex<Vec<User>>,
    pub fail_reads: Mutex<bool>,
}

impl MemoryUserRepository {
    pub fn with_user(id: i64, username: &str) -> Self {
        let repo = Self::default();
        repo.add(id, username);
        repo
    }

    pub fn add(&self, id: i64, username: &str) {
        let now = Utc::now();
        self.users.lock().unwrap().push(User {
            id,
            username: username.to_string(),
            email: format!("{}@example.com", username),
            nickname: None,
            password_hash: String::new(),
            created_at: now,
            updated_at: now,
        });
    }

    fn check_reads(&self) -> Result<(), DomainError> {
        if *self.fail_reads.lock().unwrap() {
            Err(DomainError::DatabaseError("read rejected".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn create(&self, req: SignUpRequest, password_hash: String) -> Result<User, DomainError> {
        let mut users = self.users.lock().unwrap();
        if users
            .iter()
            .any(|u| u.username == req.username || u.email == req.email)
        {
            return Err(DomainError::UserAlreadyExists);
        }
        let now = Utc::now();
        let user = User {
            id: users.iter().map(|u| u.id).max().unwrap_or(0) + 1,
            username: req.username,
            email: req.email,
            nickname: req.nickname,
            password_hash,
            created_at: now,
            updated_at: now,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<User, DomainError> {
        self.check_reads()?;
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.username == username)
            .cloned()
            .ok_or(DomainError::UserNotFound)
    }

    async fn find_by_email(&self, email: &str) -> Result<User, DomainError> {
        self.check_reads()?;
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(DomainError::UserNotFound)
    }

    async fn find_by_id(&self, id: i64) -> Result<User, DomainError> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or(DomainError::UserNotFound)
    }

    async fn update_profile(
        &self,
        id: i64,
        nickname: Option<String>,
        password_hash: Option<String>,
    ) -> Result<User, DomainError> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(DomainError::UserNotFound)?;
        if let Some(nickname) = nickname {
            user.nickname = Some(nickname);
        }
        if let Some(password_hash) = password_hash {
            user.password_hash = password_hash;
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }
}

#[derive(Default)]
pub struct MemoryCommentRepository {
    comments: Mutex<Vec<Comment>>,
}

#[async_trait]
impl CommentRepository for MemoryCommentRepository {
    async fn create(&self, post_id: i64, author_id: i64, content: String) -> Result<Comment, DomainError> {
        let mut comments = self.comments.lock().unwrap();
        let comment = Comment {
            id: comments.iter().map(|c| c.id).max().unwrap_or(0) + 1,
            post_id,
            author_id,
            content,
            created_at: Utc::now(),
        };
        comments.push(comment.clone());
        Ok(comment)
    }

    async fn find_by_id(&self, id: i64) -> Result<Comment, DomainError> {
        self.comments
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or(DomainError::CommentNotFound)
    }

    async fn delete(&self, id: i64) -> Result<(), DomainError> {
        let mut comments = self.comments.lock().unwrap();
        let before = comments.len();
        comments.retain(|c| c.id != id);
        if comments.len() == before {
            Err(DomainError::CommentNotFound)
        } else {
            Ok(())
        }
    }

    async fn find_by_post(&self, post_id: i64) -> Result<Vec<Comment>, DomainError> {
        Ok(self
            .comments
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct MemoryLikeRepository {
    likes: Mutex<HashSet<(i64, i64)>>,
}

impl MemoryLikeRepository {
    pub fn contains(&self, post_id: i64, user_id: i64) -> bool {
        self.likes.lock().unwrap().contains(&(post_id, user_id))
    }
}

#[async_trait]
impl LikeRepository for MemoryLikeRepository {
    async fn insert(&self, post_id: i64, user_id: i64) -> Result<bool, DomainError> {
        Ok(self.likes.lock().unwrap().insert((post_id, user_id)))
    }

    async fn remove(&self, post_id: i64, user_id: i64) -> Result<bool, DomainError> {
        Ok(self.likes.lock().unwrap().remove(&(post_id, user_id)))
    }

    async fn remove_all_for_post(&self, post_id: i64) -> Result<u64, DomainError> {
        let mut likes = self.likes.lock().unwrap();
        let before = likes.len();
        likes.retain(|(p, _)| *p != post_id);
        Ok((before - likes.len()) as u64)
    }

    async fn count_for_post(&self, post_id: i64) -> Result<i64, DomainError> {
        Ok(self
            .likes
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| *p == post_id)
            .count() as i64)
    }
}
