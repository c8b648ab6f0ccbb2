use axum::{Extension, Json};
use axum::extract::{Query, State};
use serde_json::{Value, json};

use huddle_types::api::{
    SetEmailRequest, SetHandleRequest, SetNameRequest, UploadPhotoRequest, UserProfile,
    UserProfileQuery, UserProfileResponse, UsersAllResponse,
};

use crate::auth::is_valid_email;
use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthUser;
use crate::state::AppState;

pub async fn profile(
    State(state): State<AppState>,
    Extension(_auth): Extension<AuthUser>,
    Query(query): Query<UserProfileQuery>,
) -> ApiResult<Json<UserProfileResponse>> {
    let user = state.store.read(|data| {
        data.user_by_id(query.u_id)
            .map(UserProfile::from)
            .ok_or_else(|| ApiError::input("uId does not refer to a valid user"))
    })?;
    Ok(Json(UserProfileResponse { user }))
}

pub async fn all(
    State(state): State<AppState>,
    Extension(_auth): Extension<AuthUser>,
) -> ApiResult<Json<UsersAllResponse>> {
    let users = state.store.read(|data| {
        Ok::<_, ApiError>(data.users.iter().map(UserProfile::from).collect())
    })?;
    Ok(Json(UsersAllResponse { users }))
}

pub async fn set_name(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<SetNameRequest>,
) -> ApiResult<Json<Value>> {
    for name in [&req.name_first, &req.name_last] {
        if !(1..=50).contains(&name.chars().count()) {
            return Err(ApiError::input("names must be between 1 and 50 characters"));
        }
    }

    state.store.write(|data| {
        let user = data
            .user_by_id_mut(auth.id)
            .ok_or_else(|| ApiError::internal("authenticated user missing from store"))?;
        user.name_first = req.name_first.clone();
        user.name_last = req.name_last.clone();
        Ok::<_, ApiError>(())
    })?;
    Ok(Json(json!({})))
}

pub async fn set_email(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<SetEmailRequest>,
) -> ApiResult<Json<Value>> {
    if !is_valid_email(&req.email) {
        return Err(ApiError::input("invalid email"));
    }

    state.store.write(|data| {
        if data
            .users
            .iter()
            .any(|u| u.email == req.email && u.auth_user_id != auth.id)
        {
            return Err(ApiError::input("email already in use"));
        }
        let user = data
            .user_by_id_mut(auth.id)
            .ok_or_else(|| ApiError::internal("authenticated user missing from store"))?;
        user.email = req.email.clone();
        Ok(())
    })?;
    Ok(Json(json!({})))
}

pub async fn set_handle(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<SetHandleRequest>,
) -> ApiResult<Json<Value>> {
    let len = req.handle_str.chars().count();
    if !(3..=20).contains(&len) || !req.handle_str.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ApiError::input("handle must be 3 to 20 alphanumeric characters"));
    }

    state.store.write(|data| {
        if data
            .users
            .iter()
            .any(|u| u.handle_str == req.handle_str && u.auth_user_id != auth.id)
        {
            return Err(ApiError::input("handle already in use"));
        }
        let user = data
            .user_by_id_mut(auth.id)
            .ok_or_else(|| ApiError::internal("authenticated user missing from store"))?;
        user.handle_str = req.handle_str.clone();
        Ok(())
    })?;
    Ok(Json(json!({})))
}

pub async fn upload_photo(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<UploadPhotoRequest>,
) -> ApiResult<Json<Value>> {
    // Image fetching/cropping is an external collaborator; only the
    // crop geometry and file type are validated here.
    if req.x_start < 0
        || req.y_start < 0
        || req.x_start >= req.x_end
        || req.y_start >= req.y_end
        || req.x_end > 1000
        || req.y_end > 1000
        || !req.img_url.ends_with(".jpg")
    {
        return Err(ApiError::input("invalid crop bounds or image url"));
    }

    state.store.write(|data| {
        let user = data
            .user_by_id_mut(auth.id)
            .ok_or_else(|| ApiError::internal("authenticated user missing from store"))?;
        user.profile_img_url = req.img_url.clone();
        Ok::<_, ApiError>(())
    })?;
    Ok(Json(json!({})))
}
