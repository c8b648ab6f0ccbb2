use axum::{Extension, Json};
use axum::extract::{Query, State};
use serde_json::{Value, json};

use huddle_types::api::{
    ChannelDetailsResponse, ChannelIdBody, ChannelIdQuery, ChannelMessagesQuery,
    ChannelUserBody, MessagesPage, UserProfile,
};
use huddle_types::models::{Notification, Workspace};

use crate::error::{ApiError, ApiResult};
use crate::message::paginate;
use crate::middleware::AuthUser;
use crate::state::AppState;
use crate::stats;

fn profiles(data: &Workspace, ids: &[uuid::Uuid]) -> Vec<UserProfile> {
    ids.iter()
        .filter_map(|id| data.user_by_id(*id))
        .map(UserProfile::from)
        .collect()
}

pub async fn details(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<ChannelIdQuery>,
) -> ApiResult<Json<ChannelDetailsResponse>> {
    let response = state.store.read(|data| {
        let channel = data
            .channel_by_id(query.channel_id)
            .ok_or_else(|| ApiError::input("channelId does not refer to a valid channel"))?;
        if !channel.is_member(auth.id) {
            return Err(ApiError::forbidden("user is not a member of the channel"));
        }
        Ok(ChannelDetailsResponse {
            name: channel.name.clone(),
            is_public: channel.is_public,
            owner_members: profiles(data, &channel.owner_members),
            all_members: profiles(data, &channel.all_members),
        })
    })?;
    Ok(Json(response))
}

pub async fn join(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<ChannelIdBody>,
) -> ApiResult<Json<Value>> {
    state.store.write(|data| {
        let is_global = data.is_global_owner(auth.id);
        let channel = data
            .channel_by_id_mut(req.channel_id)
            .ok_or_else(|| ApiError::input("channelId does not refer to a valid channel"))?;
        if channel.is_member(auth.id) {
            return Err(ApiError::input("user is already a member of the channel"));
        }
        if !channel.is_public && !is_global {
            return Err(ApiError::forbidden("channel is private"));
        }
        channel.all_members.push(auth.id);
        stats::update_user_stats(data, auth.id)?;
        stats::update_workspace_stats(data);
        Ok(())
    })?;
    Ok(Json(json!({})))
}

pub async fn leave(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<ChannelIdBody>,
) -> ApiResult<Json<Value>> {
    state.store.write(|data| {
        let channel = data
            .channel_by_id_mut(req.channel_id)
            .ok_or_else(|| ApiError::input("channelId does not refer to a valid channel"))?;
        if channel
            .standup
            .as_ref()
            .is_some_and(|s| s.starter == auth.id)
        {
            return Err(ApiError::input("user started the active standup in the channel"));
        }
        if !channel.is_member(auth.id) {
            return Err(ApiError::forbidden("user is not a member of the channel"));
        }
        channel.all_members.retain(|id| *id != auth.id);
        channel.owner_members.retain(|id| *id != auth.id);
        stats::update_user_stats(data, auth.id)?;
        stats::update_workspace_stats(data);
        Ok(())
    })?;
    Ok(Json(json!({})))
}

pub async fn invite(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<ChannelUserBody>,
) -> ApiResult<Json<Value>> {
    state.store.write(|data| {
        if data.user_by_id(req.u_id).is_none() {
            return Err(ApiError::input("uId does not refer to a valid user"));
        }
        let inviter_handle = data
            .user_by_id(auth.id)
            .map(|u| u.handle_str.clone())
            .ok_or_else(|| ApiError::internal("authenticated user missing from store"))?;
        let channel = data
            .channel_by_id_mut(req.channel_id)
            .ok_or_else(|| ApiError::input("channelId does not refer to a valid channel"))?;
        if !channel.is_member(auth.id) {
            return Err(ApiError::forbidden("user is not a member of the channel"));
        }
        if channel.is_member(req.u_id) {
            return Err(ApiError::input("target user is already a member of the channel"));
        }
        channel.all_members.push(req.u_id);
        let notification = Notification {
            u_id: req.u_id,
            channel_id: Some(channel.channel_id),
            dm_id: None,
            notification_message: format!("{inviter_handle} added you to {}", channel.name),
        };
        data.notifications.push(notification);
        stats::update_user_stats(data, req.u_id)?;
        stats::update_workspace_stats(data);
        Ok(())
    })?;
    Ok(Json(json!({})))
}

pub async fn add_owner(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<ChannelUserBody>,
) -> ApiResult<Json<Value>> {
    state.store.write(|data| {
        if data.user_by_id(req.u_id).is_none() {
            return Err(ApiError::input("uId does not refer to a valid user"));
        }
        let channel = data
            .channel_by_id_mut(req.channel_id)
            .ok_or_else(|| ApiError::input("channelId does not refer to a valid channel"))?;
        if !channel.is_member(req.u_id) {
            return Err(ApiError::input("target user is not a member of the channel"));
        }
        if channel.is_owner(req.u_id) {
            return Err(ApiError::input("target user is already an owner of the channel"));
        }
        if !channel.is_owner(auth.id) {
            return Err(ApiError::forbidden("user does not have owner permissions"));
        }
        channel.owner_members.push(req.u_id);
        Ok(())
    })?;
    Ok(Json(json!({})))
}

pub async fn remove_owner(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<ChannelUserBody>,
) -> ApiResult<Json<Value>> {
    state.store.write(|data| {
        if data.user_by_id(req.u_id).is_none() {
            return Err(ApiError::input("uId does not refer to a valid user"));
        }
        let channel = data
            .channel_by_id_mut(req.channel_id)
            .ok_or_else(|| ApiError::input("channelId does not refer to a valid channel"))?;
        if !channel.is_owner(req.u_id) {
            return Err(ApiError::input("target user is not an owner of the channel"));
        }
        if channel.owner_members.len() == 1 {
            return Err(ApiError::input("target user is the only owner of the channel"));
        }
        if !channel.is_owner(auth.id) {
            return Err(ApiError::forbidden("user does not have owner permissions"));
        }
        channel.owner_members.retain(|id| *id != req.u_id);
        Ok(())
    })?;
    Ok(Json(json!({})))
}

pub async fn messages(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<ChannelMessagesQuery>,
) -> ApiResult<Json<MessagesPage>> {
    let page = state.store.read(|data| {
        let channel = data
            .channel_by_id(query.channel_id)
            .ok_or_else(|| ApiError::input("channelId does not refer to a valid channel"))?;
        if !channel.is_member(auth.id) {
            return Err(ApiError::forbidden("user is not a member of the channel"));
        }
        paginate(&channel.messages, query.start)
    })?;
    Ok(Json(page))
}
