//! Standup windows.
//!
//! Each channel is either Idle (`standup: None`) or Active. Start
//! opens a window and schedules a flush task; send queues a line;
//! the flush synthesizes one combined message and returns the channel
//! to Idle. Flush tasks are keyed by channel id so `/clear` can cancel
//! them, and they mutate the workspace through the same single-writer
//! store boundary as request handlers.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use axum::{Extension, Json};
use axum::extract::{Query, State};
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use tracing::{error, warn};
use uuid::Uuid;

use huddle_types::api::{
    ChannelIdQuery, StandupActiveResponse, StandupSendRequest, StandupStartRequest,
    StandupStartResponse,
};
use huddle_types::models::{Message, Standup, StandupEntry, Workspace};
use huddle_types::unix_now;

use crate::error::{ApiError, ApiResult};
use crate::message::MAX_MESSAGE_LEN;
use crate::middleware::AuthUser;
use crate::state::AppState;
use crate::stats;

/// Pending flush tasks, one per channel with an active standup.
#[derive(Default)]
pub struct StandupTimers {
    tasks: Mutex<HashMap<Uuid, JoinHandle<()>>>,
}

impl StandupTimers {
    fn with_tasks<T>(&self, f: impl FnOnce(&mut HashMap<Uuid, JoinHandle<()>>) -> T) -> Option<T> {
        match self.tasks.lock() {
            Ok(mut guard) => Some(f(&mut guard)),
            Err(_) => {
                error!("standup timer registry lock poisoned");
                None
            }
        }
    }

    /// Schedule the flush for `channel_id` after `delay`. Replaces (and
    /// aborts) any stale handle left for the same channel.
    pub fn schedule(&self, state: AppState, channel_id: Uuid, delay: Duration) {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let result = state
                .store
                .write(|data| flush_standup(data, channel_id));
            if let Err(err) = result {
                error!(%channel_id, "standup flush failed: {err}");
            }
            state.standups.with_tasks(|tasks| tasks.remove(&channel_id));
        });
        self.with_tasks(|tasks| {
            if let Some(stale) = tasks.insert(channel_id, handle) {
                stale.abort();
            }
        });
    }

    /// Abort every pending flush. Used by `/clear`.
    pub fn cancel_all(&self) {
        self.with_tasks(|tasks| {
            for (_, handle) in tasks.drain() {
                handle.abort();
            }
        });
    }
}

/// Close the window on `channel_id`: synthesize the combined message if
/// anything was queued, then return to Idle. A channel already Idle
/// (cleared or never started) is left alone.
pub fn flush_standup(data: &mut Workspace, channel_id: Uuid) -> Result<(), ApiError> {
    let Some(channel) = data.channel_by_id(channel_id) else {
        warn!(%channel_id, "standup flush for unknown channel");
        return Ok(());
    };
    let Some(standup) = &channel.standup else {
        return Ok(());
    };

    let starter = standup.starter;
    // Handles are resolved at flush time, so renames during the window
    // show the current handle.
    let lines: Vec<String> = standup
        .queued
        .iter()
        .map(|entry| {
            let handle = data
                .user_by_id(entry.u_id)
                .map(|u| u.handle_str.as_str())
                .unwrap_or("unknown");
            format!("[{handle}]: [{}]", entry.message)
        })
        .collect();

    let channel = data
        .channel_by_id_mut(channel_id)
        .ok_or_else(|| ApiError::internal("standup channel vanished"))?;
    channel.standup = None;
    if lines.is_empty() {
        return Ok(());
    }

    channel.messages.push(Message::new(starter, lines.join("\n")));
    stats::update_user_stats(data, starter)?;
    stats::update_workspace_stats(data);
    Ok(())
}

/// Re-arm flush timers for standups that were active when the process
/// last stopped. Windows whose deadline already passed flush on the
/// next tick.
pub fn resume_pending(state: &AppState) -> Result<(), ApiError> {
    let pending = state.store.read(|data| {
        Ok::<_, ApiError>(
            data.channels
                .iter()
                .filter_map(|c| c.standup.as_ref().map(|s| (c.channel_id, s.finish_time)))
                .collect::<Vec<_>>(),
        )
    })?;

    let now = unix_now();
    for (channel_id, finish_time) in pending {
        let delay = Duration::from_secs(finish_time.saturating_sub(now).max(0) as u64);
        state.standups.schedule(state.clone(), channel_id, delay);
    }
    Ok(())
}

pub async fn start(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<StandupStartRequest>,
) -> ApiResult<Json<StandupStartResponse>> {
    if req.length < 0 {
        return Err(ApiError::input("length must not be negative"));
    }

    let time_finish = state.store.write(|data| {
        let channel = data
            .channel_by_id_mut(req.channel_id)
            .ok_or_else(|| ApiError::input("channelId does not refer to a valid channel"))?;
        if !channel.is_member(auth.id) {
            return Err(ApiError::forbidden("user is not a member of the channel"));
        }
        if channel.standup.is_some() {
            return Err(ApiError::input("an active standup is already running in the channel"));
        }
        let start_time = unix_now();
        let finish_time = start_time + req.length;
        channel.standup = Some(Standup {
            start_time,
            finish_time,
            length: req.length,
            starter: auth.id,
            queued: Vec::new(),
        });
        Ok(finish_time)
    })?;

    state
        .standups
        .schedule(state.clone(), req.channel_id, Duration::from_secs(req.length as u64));

    Ok(Json(StandupStartResponse { time_finish }))
}

pub async fn send(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<StandupSendRequest>,
) -> ApiResult<Json<Value>> {
    if req.message.chars().count() > MAX_MESSAGE_LEN {
        return Err(ApiError::input("message is over 1000 characters"));
    }

    state.store.write(|data| {
        let channel = data
            .channel_by_id_mut(req.channel_id)
            .ok_or_else(|| ApiError::input("channelId does not refer to a valid channel"))?;
        if !channel.is_member(auth.id) {
            return Err(ApiError::forbidden("user is not a member of the channel"));
        }
        let standup = channel
            .standup
            .as_mut()
            .ok_or_else(|| ApiError::input("no active standup in the channel"))?;
        standup.queued.push(StandupEntry { u_id: auth.id, message: req.message });
        Ok(())
    })?;

    Ok(Json(json!({})))
}

pub async fn active(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<ChannelIdQuery>,
) -> ApiResult<Json<StandupActiveResponse>> {
    let response = state.store.read(|data| {
        let channel = data
            .channel_by_id(query.channel_id)
            .ok_or_else(|| ApiError::input("channelId does not refer to a valid channel"))?;
        if !channel.is_member(auth.id) {
            return Err(ApiError::forbidden("user is not a member of the channel"));
        }
        Ok(StandupActiveResponse {
            is_active: channel.standup.is_some(),
            time_finish: channel.standup.as_ref().map(|s| s.finish_time),
        })
    })?;
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use huddle_types::models::{Channel, User, UserStats};

    fn seed_user(data: &mut Workspace, handle: &str) -> Uuid {
        let id = Uuid::new_v4();
        data.users.push(User {
            auth_user_id: id,
            email: format!("{handle}@example.com"),
            password: String::new(),
            name_first: handle.into(),
            name_last: "test".into(),
            handle_str: handle.into(),
            tokens: vec![],
            reset_code: None,
            profile_img_url: String::new(),
            user_stats: UserStats::seeded(),
        });
        id
    }

    fn seed_channel(data: &mut Workspace, members: Vec<Uuid>) -> Uuid {
        let id = Uuid::new_v4();
        data.channels.push(Channel {
            channel_id: id,
            name: "standup".into(),
            is_public: true,
            owner_members: vec![members[0]],
            all_members: members,
            messages: vec![],
            pinned: vec![],
            standup: None,
        });
        id
    }

    fn open_standup(data: &mut Workspace, channel_id: Uuid, starter: Uuid) {
        let now = unix_now();
        data.channel_by_id_mut(channel_id).unwrap().standup = Some(Standup {
            start_time: now,
            finish_time: now + 1,
            length: 1,
            starter,
            queued: vec![],
        });
    }

    #[test]
    fn flush_concatenates_queued_lines_in_arrival_order() {
        let mut data = Workspace::new();
        let ada = seed_user(&mut data, "ada");
        let grace = seed_user(&mut data, "grace");
        let channel_id = seed_channel(&mut data, vec![ada, grace]);
        open_standup(&mut data, channel_id, ada);

        let standup = data.channel_by_id_mut(channel_id).unwrap().standup.as_mut().unwrap();
        standup.queued.push(StandupEntry { u_id: grace, message: "shipped the parser".into() });
        standup.queued.push(StandupEntry { u_id: ada, message: "reviewing it".into() });

        flush_standup(&mut data, channel_id).unwrap();

        let channel = data.channel_by_id(channel_id).unwrap();
        assert!(channel.standup.is_none());
        assert_eq!(channel.messages.len(), 1);
        let message = &channel.messages[0];
        assert_eq!(message.u_id, ada);
        assert_eq!(
            message.message,
            "[grace]: [shipped the parser]\n[ada]: [reviewing it]"
        );
    }

    #[test]
    fn flush_of_empty_queue_adds_no_message() {
        let mut data = Workspace::new();
        let ada = seed_user(&mut data, "ada");
        let channel_id = seed_channel(&mut data, vec![ada]);
        open_standup(&mut data, channel_id, ada);

        let samples_before = data.workspace_stats.messages_exist.len();
        flush_standup(&mut data, channel_id).unwrap();

        let channel = data.channel_by_id(channel_id).unwrap();
        assert!(channel.standup.is_none());
        assert!(channel.messages.is_empty());
        // no message means no stats churn either
        assert_eq!(data.workspace_stats.messages_exist.len(), samples_before);
    }

    #[test]
    fn flush_on_idle_channel_is_a_no_op() {
        let mut data = Workspace::new();
        let ada = seed_user(&mut data, "ada");
        let channel_id = seed_channel(&mut data, vec![ada]);
        flush_standup(&mut data, channel_id).unwrap();
        assert!(data.channel_by_id(channel_id).unwrap().messages.is_empty());
    }
}
