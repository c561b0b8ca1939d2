use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::auth::{
    dto::{LoginRequest, LoginResponse, PublicUser, RegisterRequest},
    jwt::TokenKeys,
    password::PasswordHasher,
    repo::UserStore,
    repo_types::{NewUser, StoreError},
};

const MIN_PASSWORD_LEN: usize = 6;

/// Caller-visible failure kinds. Underlying causes are logged, never carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("invalid input")]
    InvalidInput,
    #[error("email already registered")]
    EmailExists,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("user not found")]
    UserNotFound,
    #[error("unauthenticated")]
    Unauthenticated,
    #[error("internal error")]
    Internal,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub struct AuthService {
    store: Arc<dyn UserStore>,
    hasher: PasswordHasher,
    tokens: TokenKeys,
}

impl AuthService {
    pub fn new(store: Arc<dyn UserStore>, hasher: PasswordHasher, tokens: TokenKeys) -> Self {
        Self {
            store,
            hasher,
            tokens,
        }
    }

    pub async fn register(&self, req: RegisterRequest) -> Result<PublicUser, AuthError> {
        let email = normalize_email(&req.email);
        let full_name = req.full_name.trim().to_string();

        let password_too_short = req.password.chars().count() < MIN_PASSWORD_LEN;
        if full_name.is_empty() || email.is_empty() || password_too_short {
            warn!(email = %email, "registration rejected: invalid input");
            return Err(AuthError::InvalidInput);
        }

        match self.store.find_by_email(&email).await {
            Ok(Some(_)) => {
                warn!(email = %email, "email already registered");
                return Err(AuthError::EmailExists);
            }
            Ok(None) => {}
            Err(e) => {
                error!(error = %e, "find_by_email failed");
                return Err(AuthError::Internal);
            }
        }

        let password_hash = self.hasher.hash(&req.password).map_err(|e| {
            error!(error = %e, "hash_password failed");
            AuthError::Internal
        })?;

        let user = self
            .store
            .create(NewUser {
                full_name,
                email,
                password_hash,
            })
            .await
            .map_err(|e| match e {
                StoreError::Duplicate => {
                    warn!("email registered concurrently");
                    AuthError::EmailExists
                }
                StoreError::Backend(e) => {
                    error!(error = %e, "create user failed");
                    AuthError::Internal
                }
            })?;

        info!(
            user_id = user.id,
            email = %user.email,
            created_at = %user.created_at,
            "user registered"
        );
        Ok(user.into())
    }

    pub async fn login(&self, req: LoginRequest) -> Result<LoginResponse, AuthError> {
        let email = normalize_email(&req.email);
        if email.is_empty() || req.password.is_empty() {
            return Err(AuthError::InvalidInput);
        }

        // Unknown email, store failure and wrong password all look the same to the caller.
        let user = match self.store.find_by_email(&email).await {
            Ok(Some(u)) => u,
            Ok(None) => {
                warn!(email = %email, "login unknown email");
                self.hasher.verify_dummy(&req.password);
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => {
                error!(error = %e, "find_by_email failed during login");
                self.hasher.verify_dummy(&req.password);
                return Err(AuthError::InvalidCredentials);
            }
        };

        match self.hasher.verify(&req.password, &user.password_hash) {
            Ok(true) => {}
            Ok(false) => {
                warn!(email = %email, user_id = user.id, "login invalid password");
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => {
                error!(error = %e, user_id = user.id, "stored hash could not be verified");
                return Err(AuthError::InvalidCredentials);
            }
        }

        let token = self
            .tokens
            .issue(user.id, &user.email, self.tokens.ttl())
            .map_err(|e| {
                error!(error = %e, "jwt sign failed");
                AuthError::Internal
            })?;

        info!(user_id = user.id, "user logged in");
        Ok(LoginResponse {
            token,
            user: user.into(),
        })
    }

    pub async fn profile(&self, user_id: i64) -> Result<PublicUser, AuthError> {
        if user_id <= 0 {
            return Err(AuthError::InvalidInput);
        }

        match self.store.find_by_id(user_id).await {
            Ok(Some(user)) => Ok(user.into()),
            Ok(None) => Err(AuthError::UserNotFound),
            Err(e) => {
                error!(error = %e, user_id, "find_by_id failed");
                Err(AuthError::Internal)
            }
        }
    }
}
