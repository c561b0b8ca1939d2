use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};

use crate::{
    auth::{
        dto::{LoginRequest, LoginResponse, PublicUser, RegisterRequest},
        extractors::{require_auth, Identity},
        services::AuthError,
    },
    response::{error_response, ApiResponse},
    state::AppState,
};

impl AuthError {
    pub fn status(self) -> StatusCode {
        match self {
            AuthError::InvalidInput => StatusCode::BAD_REQUEST,
            AuthError::EmailExists => StatusCode::CONFLICT,
            AuthError::InvalidCredentials | AuthError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AuthError::UserNotFound => StatusCode::NOT_FOUND,
            AuthError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(self) -> &'static str {
        match self {
            AuthError::InvalidInput => {
                "full_name and email are required, password must be at least 6 characters"
            }
            AuthError::EmailExists => "email already registered",
            AuthError::InvalidCredentials => "invalid email or password",
            AuthError::UserNotFound => "user not found",
            AuthError::Unauthenticated => "unauthorized",
            AuthError::Internal => "internal server error",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        error_response(self.status(), self.public_message())
    }
}

fn bad_body(rejection: JsonRejection) -> Response {
    warn!(error = %rejection, "invalid request body");
    error_response(StatusCode::BAD_REQUEST, "invalid request body")
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

pub fn profile_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/profile", get(profile))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<PublicUser>>), Response> {
    let Json(payload) = payload.map_err(bad_body)?;
    let user = state
        .auth
        .register(payload)
        .await
        .map_err(IntoResponse::into_response)?;
    Ok(ApiResponse::success(StatusCode::CREATED, "registration successful", user))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<LoginResponse>>), Response> {
    let Json(payload) = payload.map_err(bad_body)?;
    let res = match state.auth.login(payload).await {
        Ok(res) => res,
        Err(AuthError::InvalidInput) => {
            return Err(error_response(
                StatusCode::BAD_REQUEST,
                "email and password are required",
            ))
        }
        Err(e) => return Err(e.into_response()),
    };
    Ok(ApiResponse::success(StatusCode::OK, "login successful", res))
}

#[instrument(skip(state))]
pub async fn profile(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<(StatusCode, Json<ApiResponse<PublicUser>>), AuthError> {
    let user = state.auth.profile(identity.user_id).await?;
    Ok(ApiResponse::success(StatusCode::OK, "success", user))
}
