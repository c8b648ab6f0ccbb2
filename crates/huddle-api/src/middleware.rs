use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

use crate::auth::hash_token;
use crate::error::ApiError;
use crate::state::AppState;

/// Identity of the caller, resolved from the `token` header and
/// inserted as a request extension by [`require_auth`].
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    /// Hash of the session token this request authenticated with;
    /// logout removes exactly this session.
    pub token_hash: String,
}

/// Validate the `token` header against the stored session hashes.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get("token")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::forbidden("token header missing"))?;

    let token_hash = hash_token(token);
    let user_id = state.store.read(|data| {
        data.user_by_token_hash(&token_hash)
            .map(|u| u.auth_user_id)
            .ok_or_else(|| ApiError::forbidden("invalid token"))
    })?;

    req.extensions_mut().insert(AuthUser { id: user_id, token_hash });
    Ok(next.run(req).await)
}
