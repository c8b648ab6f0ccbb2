use std::collections::HashSet;

use axum::{Extension, Json};
use axum::extract::{Query, State};
use serde_json::{Value, json};
use uuid::Uuid;

use huddle_types::api::{
    DmCreateRequest, DmCreateResponse, DmDetailsResponse, DmIdBody, DmIdQuery,
    DmListResponse, DmMessagesQuery, DmSummary, MessagesPage, UserProfile,
};
use huddle_types::models::{Dm, Notification};

use crate::error::{ApiError, ApiResult};
use crate::message::paginate;
use crate::middleware::AuthUser;
use crate::state::AppState;
use crate::stats;

pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<DmCreateRequest>,
) -> ApiResult<Json<DmCreateResponse>> {
    let unique: HashSet<Uuid> = req.u_ids.iter().copied().collect();
    if unique.len() != req.u_ids.len() || unique.contains(&auth.id) {
        return Err(ApiError::input("uIds must not repeat or include the creator"));
    }

    let dm_id = state.store.write(|data| {
        let mut handles = Vec::with_capacity(req.u_ids.len() + 1);
        for u_id in req.u_ids.iter().copied().chain([auth.id]) {
            let user = data
                .user_by_id(u_id)
                .ok_or_else(|| ApiError::input("uId does not refer to a valid user"))?;
            handles.push(user.handle_str.clone());
        }
        handles.sort();
        let name = handles.join(", ");

        let creator_handle = data
            .user_by_id(auth.id)
            .map(|u| u.handle_str.clone())
            .ok_or_else(|| ApiError::internal("authenticated user missing from store"))?;

        let dm = Dm {
            dm_id: Uuid::new_v4(),
            name: name.clone(),
            owner_members: vec![auth.id],
            all_members: req.u_ids.iter().copied().chain([auth.id]).collect(),
            messages: Vec::new(),
            pinned: Vec::new(),
        };
        let id = dm.dm_id;
        data.dms.push(dm);

        for u_id in &req.u_ids {
            data.notifications.push(Notification {
                u_id: *u_id,
                channel_id: None,
                dm_id: Some(id),
                notification_message: format!("{creator_handle} added you to {name}"),
            });
        }

        stats::update_user_stats(data, auth.id)?;
        stats::update_workspace_stats(data);
        Ok::<_, ApiError>(id)
    })?;

    Ok(Json(DmCreateResponse { dm_id }))
}

pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<DmListResponse>> {
    let dms = state.store.read(|data| {
        Ok::<_, ApiError>(
            data.dms
                .iter()
                .filter(|d| d.is_member(auth.id))
                .map(|d| DmSummary { dm_id: d.dm_id, name: d.name.clone() })
                .collect(),
        )
    })?;
    Ok(Json(DmListResponse { dms }))
}

pub async fn details(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<DmIdQuery>,
) -> ApiResult<Json<DmDetailsResponse>> {
    let response = state.store.read(|data| {
        let dm = data
            .dm_by_id(query.dm_id)
            .ok_or_else(|| ApiError::input("dmId does not refer to a valid DM"))?;
        if !dm.is_member(auth.id) {
            return Err(ApiError::forbidden("user is not a member of the DM"));
        }
        Ok(DmDetailsResponse {
            name: dm.name.clone(),
            members: dm
                .all_members
                .iter()
                .filter_map(|id| data.user_by_id(*id))
                .map(UserProfile::from)
                .collect(),
        })
    })?;
    Ok(Json(response))
}

pub async fn messages(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<DmMessagesQuery>,
) -> ApiResult<Json<MessagesPage>> {
    let page = state.store.read(|data| {
        let dm = data
            .dm_by_id(query.dm_id)
            .ok_or_else(|| ApiError::input("dmId does not refer to a valid DM"))?;
        if !dm.is_member(auth.id) {
            return Err(ApiError::forbidden("user is not a member of the DM"));
        }
        paginate(&dm.messages, query.start)
    })?;
    Ok(Json(page))
}

pub async fn leave(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<DmIdBody>,
) -> ApiResult<Json<Value>> {
    state.store.write(|data| {
        let dm = data
            .dm_by_id_mut(req.dm_id)
            .ok_or_else(|| ApiError::input("dmId does not refer to a valid DM"))?;
        if !dm.is_member(auth.id) {
            return Err(ApiError::forbidden("user is not a member of the DM"));
        }
        dm.all_members.retain(|id| *id != auth.id);
        dm.owner_members.retain(|id| *id != auth.id);
        stats::update_user_stats(data, auth.id)?;
        Ok(())
    })?;
    Ok(Json(json!({})))
}

pub async fn remove(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<DmIdQuery>,
) -> ApiResult<Json<Value>> {
    state.store.write(|data| {
        let dm = data
            .dm_by_id(query.dm_id)
            .ok_or_else(|| ApiError::input("dmId does not refer to a valid DM"))?;
        if !dm.is_owner(auth.id) {
            return Err(ApiError::forbidden("only an owner can remove the DM"));
        }
        data.dms.retain(|d| d.dm_id != query.dm_id);
        stats::update_user_stats(data, auth.id)?;
        stats::update_workspace_stats(data);
        Ok(())
    })?;
    Ok(Json(json!({})))
}
