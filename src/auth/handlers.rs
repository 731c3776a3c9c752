use axum::{
    extract::{FromRef, State},
    routing::post,
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, CredentialsRequest},
        jwt::JwtKeys,
        password::{hash_password, verify_password},
    },
    error::ApiError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

/// Both fields must be non-empty after trimming. The email is stored and
/// looked up lowercased; the password is hashed exactly as supplied.
fn normalize(payload: &CredentialsRequest) -> Result<(String, &str), ApiError> {
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() || payload.password.trim().is_empty() {
        return Err(ApiError::InvalidInput("Email and password are required."));
    }
    Ok((email, payload.password.as_str()))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let (email, password) = normalize(&payload)?;

    if state.users.find_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(ApiError::DuplicateUser);
    }

    let hash = hash_password(password)?;
    let user = state.users.insert(&email, &hash).await?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(Json(AuthResponse {
        success: true,
        message: "User registered successfully.".into(),
        token: None,
    }))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let (email, password) = normalize(&payload)?;

    // Unknown email and wrong password answer identically.
    let Some(user) = state.users.find_by_email(&email).await? else {
        warn!(email = %email, "login with unknown email");
        return Err(ApiError::InvalidCredentials);
    };

    if !verify_password(password, &user.password_hash)? {
        warn!(email = %email, "login with wrong password");
        return Err(ApiError::InvalidCredentials);
    }

    let token = JwtKeys::from_ref(&state).sign(&email)?;
    info!(email = %email, "user logged in");
    Ok(Json(AuthResponse {
        success: true,
        message: "Login successful.".into(),
        token: Some(token),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(email: &str, password: &str) -> CredentialsRequest {
        CredentialsRequest {
            email: email.into(),
            password: password.into(),
        }
    }

    #[test]
    fn normalize_lowercases_and_trims_the_email() {
        let binding = creds("  A@X.com ", "pw");
        let (email, password) = normalize(&binding).unwrap();
        assert_eq!(email, "a@x.com");
        assert_eq!(password, "pw");
    }

    #[test]
    fn normalize_keeps_the_password_as_supplied() {
        let binding = creds("a@x.com", " spaced pw ");
        let (_, password) = normalize(&binding).unwrap();
        assert_eq!(password, " spaced pw ");
    }

    #[test]
    fn normalize_rejects_blank_fields() {
        assert!(matches!(
            normalize(&creds("", "pw")),
            Err(ApiError::InvalidInput(_))
        ));
        assert!(matches!(
            normalize(&creds("a@x.com", "   ")),
            Err(ApiError::InvalidInput(_))
        ));
    }

    // Validation runs before any store access, so these never touch the
    // lazily connecting fake pool.
    #[tokio::test]
    async fn register_rejects_missing_fields_before_the_store() {
        let state = AppState::fake();
        let result = register(State(state), Json(creds("   ", "pw"))).await;
        assert!(matches!(result, Err(ApiError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn login_rejects_missing_fields_before_the_store() {
        let state = AppState::fake();
        let result = login(State(state), Json(creds("a@x.com", ""))).await;
        assert!(matches!(result, Err(ApiError::InvalidInput(_))));
    }
}
