use axum::{Extension, Json};
use axum::extract::State;
use uuid::Uuid;

use huddle_types::api::{
    ChannelSummary, ChannelsCreateRequest, ChannelsCreateResponse, ChannelsListResponse,
};
use huddle_types::models::Channel;

use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthUser;
use crate::state::AppState;
use crate::stats;

pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<ChannelsCreateRequest>,
) -> ApiResult<Json<ChannelsCreateResponse>> {
    if !(1..=20).contains(&req.name.chars().count()) {
        return Err(ApiError::input("channel name must be between 1 and 20 characters"));
    }

    let channel_id = state.store.write(|data| {
        let channel = Channel {
            channel_id: Uuid::new_v4(),
            name: req.name.clone(),
            is_public: req.is_public,
            owner_members: vec![auth.id],
            all_members: vec![auth.id],
            messages: Vec::new(),
            pinned: Vec::new(),
            standup: None,
        };
        let id = channel.channel_id;
        data.channels.push(channel);
        stats::update_user_stats(data, auth.id)?;
        stats::update_workspace_stats(data);
        Ok::<_, ApiError>(id)
    })?;

    Ok(Json(ChannelsCreateResponse { channel_id }))
}

pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<ChannelsListResponse>> {
    let channels = state.store.read(|data| {
        Ok::<_, ApiError>(
            data.channels
                .iter()
                .filter(|c| c.is_member(auth.id))
                .map(|c| ChannelSummary { channel_id: c.channel_id, name: c.name.clone() })
                .collect(),
        )
    })?;
    Ok(Json(ChannelsListResponse { channels }))
}

pub async fn list_all(
    State(state): State<AppState>,
    Extension(_auth): Extension<AuthUser>,
) -> ApiResult<Json<ChannelsListResponse>> {
    let channels = state.store.read(|data| {
        Ok::<_, ApiError>(
            data.channels
                .iter()
                .map(|c| ChannelSummary { channel_id: c.channel_id, name: c.name.clone() })
                .collect(),
        )
    })?;
    Ok(Json(ChannelsListResponse { channels }))
}
