use crate::data::user_repository::UserRepository;
use crate::domain::user::{LoginRequest, SignUpRequest, UpdateProfileRequest, UserResponse};
use crate::domain::DomainError;
use crate::infrastructure::jwt::JwtService;
use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use std::sync::Arc;

const MIN_PASSWORD_LEN: usize = 8;

pub struct UserService {
    user_repo: Arc<dyn UserRepository + Send + Sync>,
    jwt_service: Arc<JwtService>,
}

fn hash_password(password: &str) -> Result<String, DomainError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            tracing::error!("Password hashing failed: {}", e);
            DomainError::InternalError(format!("Password hashing failed: {}", e))
        })
}

fn validate_password(password: &str) -> Result<(), DomainError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(DomainError::ValidationError(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

impl UserService {
    pub fn new(
        user_repo: Arc<dyn UserRepository + Send + Sync>,
        jwt_service: Arc<JwtService>,
    ) -> Self {
        Self {
            user_repo,
            jwt_service,
        }
    }

    pub async fn sign_up(&self, req: SignUpRequest) -> Result<UserResponse, DomainError> {
        tracing::debug!("Sign up: username={}, email={}", req.username, req.email);

        if req.username.trim().is_empty() || req.email.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "Username and email are required".to_string(),
            ));
        }
        validate_password(&req.password)?;

        match self.user_repo.find_by_username(&req.username).await {
            Ok(_) => {
                tracing::warn!("Sign up failed: username already exists");
                return Err(DomainError::UserAlreadyExists);
            }
            Err(DomainError::UserNotFound) => {}
            Err(e) => return Err(e),
        }

        match self.user_repo.find_by_email(&req.email).await {
            Ok(_) => {
                tracing::warn!("Sign up failed: email already exists");
                return Err(DomainError::UserAlreadyExists);
            }
            Err(DomainError::UserNotFound) => {}
            Err(e) => return Err(e),
        }

        let password_hash = hash_password(&req.password)?;
        let user = self.user_repo.create(req, password_hash).await?;

        tracing::info!(
            "User signed up: id={}, username={}",
            user.id,
            user.username
        );

        Ok(UserResponse::from(user))
    }

    pub async fn login(&self, req: LoginRequest) -> Result<(String, UserResponse), DomainError> {
        tracing::debug!("Login: username={}", req.username);

        let user = match self.user_repo.find_by_username(&req.username).await {
            Ok(u) => u,
            Err(DomainError::UserNotFound) => {
                tracing::warn!("User not found: {}", req.username);
                return Err(DomainError::InvalidCredentials);
            }
            Err(e) => return Err(e),
        };

        let parsed_hash = PasswordHash::new(&user.password_hash).map_err(|e| {
            tracing::error!("Invalid password hash format: {}", e);
            DomainError::InternalError(format!("Invalid password hash: {}", e))
        })?;

        if Argon2::default()
            .verify_password(req.password.as_bytes(), &parsed_hash)
            .is_err()
        {
            tracing::warn!("Invalid password for user {}", user.username);
            return Err(DomainError::InvalidCredentials);
        }

        let token = self
            .jwt_service
            .generate_token(user.id, user.username.clone())?;

        tracing::info!(
            "User logged in: id={}, username={}",
            user.id,
            user.username
        );

        Ok((token, UserResponse::from(user)))
    }

    pub async fn update_profile(
        &self,
        user_id: i64,
        req: UpdateProfileRequest,
    ) -> Result<UserResponse, DomainError> {
        let nickname = req
            .nickname
            .map(|nickname| nickname.trim().to_string())
            .filter(|nickname| !nickname.is_empty());

        let password_hash = match req.password {
            Some(password) => {
                validate_password(&password)?;
                Some(hash_password(&password)?)
            }
            None => None,
        };

        let user = self
            .user_repo
            .update_profile(user_id, nickname, password_hash)
            .await?;

        tracing::info!("Profile updated: id={}", user_id);

        Ok(UserResponse::from(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::memory::MemoryUserRepository;

    fn service() -> (UserService, Arc<JwtService>) {
        let jwt = Arc::new(JwtService::new("a-test-secret-that-is-long-enough-123").unwrap());
        let service = UserService::new(Arc::new(MemoryUserRepository::default()), jwt.clone());
        (service, jwt)
    }

    fn sign_up_request(username: &str) -> SignUpRequest {
        SignUpRequest {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            password: "correct horse".to_string(),
            nickname: Some("Rex".to_string()),
        }
    }

    fn login_request(username: &str, password: &str) -> LoginRequest {
        LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    #[actix_rt::test]
    async fn sign_up_then_login_issues_token() {
        let (service, jwt) = service();
        let user = service.sign_up(sign_up_request("rex")).await.unwrap();
        assert_eq!(user.nickname.as_deref(), Some("Rex"));

        let (token, logged_in) = service
            .login(login_request("rex", "correct horse"))
            .await
            .unwrap();
        assert_eq!(logged_in.id, user.id);
        assert_eq!(jwt.verify_token(&token).unwrap(), user.id);
    }

    #[actix_rt::test]
    async fn duplicate_sign_up_conflicts() {
        let (service, _) = service();
        service.sign_up(sign_up_request("rex")).await.unwrap();
        assert!(matches!(
            service.sign_up(sign_up_request("rex")).await,
            Err(DomainError::UserAlreadyExists)
        ));
    }

    #[actix_rt::test]
    async fn wrong_password_or_user_is_invalid_credentials() {
        let (service, _) = service();
        service.sign_up(sign_up_request("rex")).await.unwrap();

        assert!(matches!(
            service.login(login_request("rex", "wrong password")).await,
            Err(DomainError::InvalidCredentials)
        ));
        assert!(matches!(
            service.login(login_request("nobody", "correct horse")).await,
            Err(DomainError::InvalidCredentials)
        ));
    }

    #[actix_rt::test]
    async fn profile_update_changes_nickname_and_password() {
        let (service, _) = service();
        let user = service.sign_up(sign_up_request("rex")).await.unwrap();

        let updated = service
            .update_profile(
                user.id,
                UpdateProfileRequest {
                    nickname: Some("Sir Rex".to_string()),
                    password: Some("new password".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.nickname.as_deref(), Some("Sir Rex"));

        assert!(service
            .login(login_request("rex", "new password"))
            .await
            .is_ok());
        assert!(service
            .login(login_request("rex", "correct horse"))
            .await
            .is_err());
    }

    #[actix_rt::test]
    async fn short_password_is_rejected() {
        let (service, _) = service();
        let mut req = sign_up_request("rex");
        req.password = "short".to_string();
        assert!(matches!(
            service.sign_up(req).await,
            Err(DomainError::ValidationError(_))
        ));
    }

    #[actix_rt::test]
    async fn sign_up_surfaces_lookup_failures() {
        let jwt = Arc::new(JwtService::new("a-test-secret-that-is-long-enough-123").unwrap());
        let users = Arc::new(MemoryUserRepository::default());
        *users.fail_reads.lock().unwrap() = true;
        let service = UserService::new(users.clone(), jwt);

        assert!(matches!(
            service.sign_up(sign_up_request("rex")).await,
            Err(DomainError::DatabaseError(_))
        ));

        *users.fail_reads.lock().unwrap() = false;
        assert!(matches!(
            service.login(login_request("rex", "correct horse")).await,
            Err(DomainError::InvalidCredentials)
        ));
    }
}
