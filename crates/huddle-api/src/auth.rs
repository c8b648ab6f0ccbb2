use std::sync::OnceLock;

use anyhow::anyhow;
use argon2::password_hash::{SaltString, rand_core::OsRng};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::extract::State;
use axum::{Extension, Json};
use rand::{Rng, distr::Alphanumeric};
use regex::Regex;
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use tracing::info;
use uuid::Uuid;

use huddle_types::api::{
    AuthResponse, LoginRequest, PasswordResetBody, PasswordResetRequestBody, RegisterRequest,
};
use huddle_types::models::{User, UserStats, Workspace};

use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthUser;
use crate::state::AppState;
use crate::stats;

const SESSION_TOKEN_LEN: usize = 32;
const RESET_CODE_LEN: usize = 8;

/// Sessions are stored as SHA-256 hex digests of the raw bearer token,
/// so the persisted document never contains a usable credential.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn generate_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_TOKEN_LEN)
        .map(char::from)
        .collect()
}

fn generate_reset_code() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(RESET_CODE_LEN)
        .map(char::from)
        .collect::<String>()
        .to_lowercase()
}

fn hash_password(password: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(anyhow!("hash password: {e}")))
}

fn verify_password(password: &str, stored: &str) -> bool {
    PasswordHash::new(stored).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid regex"))
        .is_match(email)
}

/// Lowercased alphanumeric concat of the names, truncated to 20 chars;
/// collisions take the smallest free integer suffix (which may push the
/// handle past 20 chars).
fn derive_handle(data: &Workspace, name_first: &str, name_last: &str) -> String {
    let base: String = format!("{name_first}{name_last}")
        .to_lowercase()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(20)
        .collect();

    let taken = |candidate: &str| data.users.iter().any(|u| u.handle_str == candidate);
    if !taken(&base) {
        return base;
    }
    let mut n: u32 = 0;
    loop {
        let candidate = format!("{base}{n}");
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// Email delivery seam. Real delivery is an external collaborator;
/// the code lands in the structured log so operators can relay it.
fn deliver_reset_code(email: &str, code: &str) {
    info!(email, code, "password reset code issued");
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<Json<AuthResponse>> {
    if !is_valid_email(&req.email) {
        return Err(ApiError::input("invalid email"));
    }
    if req.password.chars().count() < 6 {
        return Err(ApiError::input("password must be at least 6 characters"));
    }
    for name in [&req.name_first, &req.name_last] {
        if !(1..=50).contains(&name.chars().count()) {
            return Err(ApiError::input("names must be between 1 and 50 characters"));
        }
    }

    let password = hash_password(&req.password)?;
    let token = generate_token();
    let token_hash = hash_token(&token);
    let base_url = state.base_url.clone();

    let auth_user_id = state.store.write(move |data| {
        if data.user_by_email(&req.email).is_some() {
            return Err(ApiError::input("email already in use"));
        }
        let handle_str = derive_handle(data, &req.name_first, &req.name_last);
        let user = User {
            auth_user_id: Uuid::new_v4(),
            email: req.email,
            password,
            name_first: req.name_first,
            name_last: req.name_last,
            handle_str,
            tokens: vec![token_hash],
            reset_code: None,
            profile_img_url: format!("{base_url}/static/default.jpg"),
            user_stats: UserStats::seeded(),
        };
        let id = user.auth_user_id;
        data.users.push(user);
        stats::update_utilization(data);
        Ok::<_, ApiError>(id)
    })?;

    Ok(Json(AuthResponse { token, auth_user_id }))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let token = generate_token();
    let token_hash = hash_token(&token);

    let auth_user_id = state.store.write(move |data| {
        let user = data
            .users
            .iter_mut()
            .find(|u| u.email == req.email && verify_password(&req.password, &u.password))
            .ok_or_else(|| ApiError::input("incorrect email or password"))?;
        user.tokens.push(token_hash);
        Ok::<_, ApiError>(user.auth_user_id)
    })?;

    Ok(Json(AuthResponse { token, auth_user_id }))
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<Value>> {
    state.store.write(|data| {
        let user = data
            .user_by_id_mut(auth.id)
            .ok_or_else(|| ApiError::internal("authenticated user missing from store"))?;
        user.tokens.retain(|t| *t != auth.token_hash);
        Ok::<_, ApiError>(())
    })?;
    Ok(Json(json!({})))
}

pub async fn password_reset_request(
    State(state): State<AppState>,
    Extension(_auth): Extension<AuthUser>,
    Json(req): Json<PasswordResetRequestBody>,
) -> ApiResult<Json<Value>> {
    let code = generate_reset_code();
    // Unknown emails get the same empty response as known ones.
    state.store.write(|data| {
        if let Some(user) = data.users.iter_mut().find(|u| u.email == req.email) {
            user.reset_code = Some(code.clone());
            deliver_reset_code(&req.email, &code);
        }
        Ok::<_, ApiError>(())
    })?;
    Ok(Json(json!({})))
}

pub async fn password_reset(
    State(state): State<AppState>,
    Extension(_auth): Extension<AuthUser>,
    Json(req): Json<PasswordResetBody>,
) -> ApiResult<Json<Value>> {
    if req.new_password.chars().count() < 6 {
        return Err(ApiError::input("password must be at least 6 characters"));
    }
    let password = hash_password(&req.new_password)?;

    state.store.write(move |data| {
        let user = data
            .users
            .iter_mut()
            .find(|u| u.reset_code.as_deref() == Some(req.reset_code.as_str()))
            .ok_or_else(|| ApiError::input("invalid reset code"))?;
        user.password = password;
        user.reset_code = None;
        Ok::<_, ApiError>(())
    })?;
    Ok(Json(json!({})))
}
