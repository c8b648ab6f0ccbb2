use axum::{Extension, Json};
use axum::extract::{Query, State};
use serde_json::{Value, json};
use uuid::Uuid;

use huddle_types::api::{
    MessageEditRequest, MessageIdQuery, MessageIdResponse, MessagePinRequest,
    MessageReactRequest, MessageSendDmRequest, MessageSendRequest, MessagesPage,
};
use huddle_types::models::{ConversationMut, Message, React, VALID_REACT_IDS};

use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthUser;
use crate::state::AppState;
use crate::stats;

pub const MAX_MESSAGE_LEN: usize = 1000;
pub(crate) const PAGE_SIZE: usize = 50;

fn check_length(body: &str) -> Result<(), ApiError> {
    let len = body.chars().count();
    if len < 1 || len > MAX_MESSAGE_LEN {
        return Err(ApiError::input("message must be between 1 and 1000 characters"));
    }
    Ok(())
}

/// Slice one page out of a message log. `end` is the next start index,
/// or -1 once the page reaches the end of the log.
pub(crate) fn paginate(log: &[Message], start: usize) -> Result<MessagesPage, ApiError> {
    if start > log.len() {
        return Err(ApiError::input("start is past the end of the message log"));
    }
    let end_index = (start + PAGE_SIZE).min(log.len());
    let end = if end_index == log.len() { -1 } else { end_index as i64 };
    Ok(MessagesPage { messages: log[start..end_index].to_vec(), start, end })
}

/// Author, conversation owner, or (in channels) the global owner.
fn can_moderate(conv: &ConversationMut<'_>, author: Uuid, user: Uuid, is_global: bool) -> bool {
    author == user || conv.is_owner(user) || (conv.is_channel() && is_global)
}

pub async fn send(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<MessageSendRequest>,
) -> ApiResult<Json<MessageIdResponse>> {
    check_length(&req.message)?;

    let message_id = state.store.write(|data| {
        let channel = data
            .channel_by_id_mut(req.channel_id)
            .ok_or_else(|| ApiError::input("channelId does not refer to a valid channel"))?;
        if !channel.is_member(auth.id) {
            return Err(ApiError::forbidden("user is not a member of the channel"));
        }
        let message = Message::new(auth.id, req.message.clone());
        let id = message.message_id;
        channel.messages.push(message);
        stats::update_user_stats(data, auth.id)?;
        stats::update_workspace_stats(data);
        Ok(id)
    })?;

    Ok(Json(MessageIdResponse { message_id }))
}

pub async fn send_dm(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<MessageSendDmRequest>,
) -> ApiResult<Json<MessageIdResponse>> {
    check_length(&req.message)?;

    let message_id = state.store.write(|data| {
        let dm = data
            .dm_by_id_mut(req.dm_id)
            .ok_or_else(|| ApiError::input("dmId does not refer to a valid DM"))?;
        if !dm.is_member(auth.id) {
            return Err(ApiError::forbidden("user is not a member of the DM"));
        }
        let message = Message::new(auth.id, req.message.clone());
        let id = message.message_id;
        dm.messages.push(message);
        stats::update_user_stats(data, auth.id)?;
        stats::update_workspace_stats(data);
        Ok(id)
    })?;

    Ok(Json(MessageIdResponse { message_id }))
}

pub async fn edit(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<MessageEditRequest>,
) -> ApiResult<Json<Value>> {
    if req.message.chars().count() > MAX_MESSAGE_LEN {
        return Err(ApiError::input("message is over 1000 characters"));
    }

    state.store.write(|data| {
        let is_global = data.is_global_owner(auth.id);
        let (mut conv, idx) = data
            .conversation_with_message(req.message_id)
            .ok_or_else(|| ApiError::input("messageId does not refer to a valid message"))?;
        if !conv.is_member(auth.id) {
            return Err(ApiError::forbidden("user is not a member of the channel/DM"));
        }
        let author = conv.messages_mut()[idx].u_id;
        if !can_moderate(&conv, author, auth.id, is_global) {
            return Err(ApiError::forbidden("no permission to edit the message"));
        }
        if req.message.is_empty() {
            // An empty edit is a removal.
            let removed = conv.messages_mut().remove(idx);
            conv.pinned_mut().retain(|id| *id != removed.message_id);
            stats::update_workspace_stats(data);
        } else {
            conv.messages_mut()[idx].message = req.message.clone();
        }
        Ok(())
    })?;

    Ok(Json(json!({})))
}

pub async fn remove(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<MessageIdQuery>,
) -> ApiResult<Json<Value>> {
    state.store.write(|data| {
        let is_global = data.is_global_owner(auth.id);
        let (mut conv, idx) = data
            .conversation_with_message(query.message_id)
            .ok_or_else(|| ApiError::input("messageId does not refer to a valid message"))?;
        let author = conv.messages_mut()[idx].u_id;
        if !can_moderate(&conv, author, auth.id, is_global) {
            return Err(ApiError::forbidden("no permission to remove the message"));
        }
        let removed = conv.messages_mut().remove(idx);
        conv.pinned_mut().retain(|id| *id != removed.message_id);
        stats::update_workspace_stats(data);
        Ok(())
    })?;

    Ok(Json(json!({})))
}

pub async fn react(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<MessageReactRequest>,
) -> ApiResult<Json<Value>> {
    if !VALID_REACT_IDS.contains(&req.react_id) {
        return Err(ApiError::input("invalid reactId"));
    }

    state.store.write(|data| {
        let (mut conv, idx) = data
            .conversation_with_message(req.message_id)
            .ok_or_else(|| ApiError::input("messageId does not refer to a valid message"))?;
        if !conv.is_member(auth.id) {
            // A message in a conversation the user never joined is not
            // visible to them at all.
            return Err(ApiError::input("messageId does not refer to a valid message"));
        }
        let message = &mut conv.messages_mut()[idx];
        match message.reacts.iter().position(|g| g.react_id == req.react_id) {
            Some(pos) => {
                let group = &mut message.reacts[pos];
                if group.u_ids.contains(&auth.id) {
                    return Err(ApiError::input("user has already reacted with this reactId"));
                }
                group.u_ids.push(auth.id);
            }
            None => {
                message.reacts.push(React { react_id: req.react_id, u_ids: vec![auth.id] });
            }
        }
        Ok(())
    })?;

    Ok(Json(json!({})))
}

pub async fn unreact(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<MessageReactRequest>,
) -> ApiResult<Json<Value>> {
    if !VALID_REACT_IDS.contains(&req.react_id) {
        return Err(ApiError::input("invalid reactId"));
    }

    state.store.write(|data| {
        let (mut conv, idx) = data
            .conversation_with_message(req.message_id)
            .ok_or_else(|| ApiError::input("messageId does not refer to a valid message"))?;
        if !conv.is_member(auth.id) {
            return Err(ApiError::input("messageId does not refer to a valid message"));
        }
        let message = &mut conv.messages_mut()[idx];
        let pos = message
            .reacts
            .iter()
            .position(|g| g.react_id == req.react_id && g.u_ids.contains(&auth.id))
            .ok_or_else(|| ApiError::input("no react with this reactId from the user"))?;
        message.reacts[pos].u_ids.retain(|id| *id != auth.id);
        message.reacts.retain(|g| !g.u_ids.is_empty());
        Ok(())
    })?;

    Ok(Json(json!({})))
}

pub async fn pin(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<MessagePinRequest>,
) -> ApiResult<Json<Value>> {
    state.store.write(|data| {
        let (mut conv, _idx) = data
            .conversation_with_message(req.message_id)
            .ok_or_else(|| ApiError::input("messageId does not refer to a valid message"))?;
        if !conv.is_member(auth.id) {
            return Err(ApiError::forbidden("user is not a member of the channel/DM"));
        }
        let pinned = conv.pinned_mut();
        if pinned.contains(&req.message_id) {
            return Err(ApiError::input("message is already pinned"));
        }
        pinned.push(req.message_id);
        Ok(())
    })?;

    Ok(Json(json!({})))
}

pub async fn unpin(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<MessagePinRequest>,
) -> ApiResult<Json<Value>> {
    state.store.write(|data| {
        let (mut conv, _idx) = data
            .conversation_with_message(req.message_id)
            .ok_or_else(|| ApiError::input("messageId does not refer to a valid message"))?;
        if !conv.is_member(auth.id) {
            return Err(ApiError::forbidden("user is not a member of the channel/DM"));
        }
        let pinned = conv.pinned_mut();
        if !pinned.contains(&req.message_id) {
            return Err(ApiError::input("message is not pinned"));
        }
        pinned.retain(|id| *id != req.message_id);
        Ok(())
    })?;

    Ok(Json(json!({})))
}
