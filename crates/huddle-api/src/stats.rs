//! Statistics aggregation.
//!
//! Counts are never maintained incrementally: every count-affecting
//! mutation recomputes the acting user's and the workspace's counters
//! by a full scan and appends a fresh timestamped sample to each
//! series. Rates are recomputed from the same scan.

use axum::{Extension, Json};
use axum::extract::State;
use uuid::Uuid;

use huddle_types::api::{UserStatsResponse, WorkspaceStatsResponse};
use huddle_types::models::{
    ChannelsExistSample, ChannelsJoinedSample, DmsExistSample, DmsJoinedSample,
    MessagesExistSample, MessagesSentSample, Workspace,
};
use huddle_types::unix_now;

use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthUser;
use crate::state::AppState;

/// Recompute one user's joined/sent counters and involvement rate,
/// appending a sample to each series. The user is always an already
/// authenticated (or just validated) identity, so a missing user is a
/// hard failure rather than an input error.
pub fn update_user_stats(data: &mut Workspace, u_id: Uuid) -> Result<(), ApiError> {
    let num_channels_joined = data.channels.iter().filter(|c| c.is_member(u_id)).count() as u64;
    let num_dms_joined = data.dms.iter().filter(|d| d.is_member(u_id)).count() as u64;
    let num_messages_sent = (data
        .channels
        .iter()
        .flat_map(|c| &c.messages)
        .filter(|m| m.u_id == u_id)
        .count()
        + data
            .dms
            .iter()
            .flat_map(|d| &d.messages)
            .filter(|m| m.u_id == u_id)
            .count()) as u64;

    let denominator = (data.channels.len() + data.dms.len() + data.total_messages()) as u64;
    let involvement = involvement_rate(
        num_channels_joined + num_dms_joined + num_messages_sent,
        denominator,
    );

    let now = unix_now();
    let user = data
        .user_by_id_mut(u_id)
        .ok_or_else(|| ApiError::internal("stats update for unknown user"))?;
    let user_stats = &mut user.user_stats;
    user_stats
        .channels_joined
        .push(ChannelsJoinedSample { num_channels_joined, time_stamp: now });
    user_stats
        .dms_joined
        .push(DmsJoinedSample { num_dms_joined, time_stamp: now });
    user_stats
        .messages_sent
        .push(MessagesSentSample { num_messages_sent, time_stamp: now });
    user_stats.involvement_rate = involvement;
    Ok(())
}

/// Append fresh existence samples and recompute the utilization rate.
pub fn update_workspace_stats(data: &mut Workspace) {
    let num_channels_exist = data.channels.len() as u64;
    let num_dms_exist = data.dms.len() as u64;
    let num_messages_exist = data.total_messages() as u64;
    let utilization = utilization_rate(data);

    let now = unix_now();
    let stats = &mut data.workspace_stats;
    stats
        .channels_exist
        .push(ChannelsExistSample { num_channels_exist, time_stamp: now });
    stats
        .dms_exist
        .push(DmsExistSample { num_dms_exist, time_stamp: now });
    stats
        .messages_exist
        .push(MessagesExistSample { num_messages_exist, time_stamp: now });
    stats.utilization_rate = utilization;
}

/// Refresh only the utilization rate, without appending samples.
/// Registration changes the denominator but not any existence count.
pub fn update_utilization(data: &mut Workspace) {
    data.workspace_stats.utilization_rate = utilization_rate(data);
}

/// involvement = (channels + dms + messages by the user) / (channels +
/// dms + messages in the workspace); 0 on an empty workspace, clamped
/// to [0, 1] (removals can leave the numerator counting deleted
/// messages the denominator no longer has).
fn involvement_rate(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        (numerator as f64 / denominator as f64).min(1.0)
    }
}

/// Fraction of registered users who are a member of at least one
/// channel or DM; 0 when nobody is registered.
fn utilization_rate(data: &Workspace) -> f64 {
    if data.users.is_empty() {
        return 0.0;
    }
    let active = data
        .users
        .iter()
        .filter(|u| {
            data.channels.iter().any(|c| c.is_member(u.auth_user_id))
                || data.dms.iter().any(|d| d.is_member(u.auth_user_id))
        })
        .count();
    active as f64 / data.users.len() as f64
}

pub async fn user_stats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<UserStatsResponse>> {
    let user_stats = state.store.read(|data| {
        data.user_by_id(auth.id)
            .map(|u| u.user_stats.clone())
            .ok_or_else(|| ApiError::internal("authenticated user missing from store"))
    })?;
    Ok(Json(UserStatsResponse { user_stats }))
}

pub async fn workspace_stats(
    State(state): State<AppState>,
    Extension(_auth): Extension<AuthUser>,
) -> ApiResult<Json<WorkspaceStatsResponse>> {
    let workspace_stats =
        state.store.read(|data| Ok::<_, ApiError>(data.workspace_stats.clone()))?;
    Ok(Json(WorkspaceStatsResponse { workspace_stats }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use huddle_types::models::{Channel, Dm, Message, User, UserStats};

    fn user(data: &mut Workspace) -> Uuid {
        let id = Uuid::new_v4();
        data.users.push(User {
            auth_user_id: id,
            email: format!("{id}@example.com"),
            password: String::new(),
            name_first: "a".into(),
            name_last: "b".into(),
            handle_str: id.simple().to_string(),
            tokens: vec![],
            reset_code: None,
            profile_img_url: String::new(),
            user_stats: UserStats::seeded(),
        });
        id
    }

    fn channel(data: &mut Workspace, members: &[Uuid]) -> Uuid {
        let id = Uuid::new_v4();
        data.channels.push(Channel {
            channel_id: id,
            name: "c".into(),
            is_public: true,
            owner_members: members.first().copied().into_iter().collect(),
            all_members: members.to_vec(),
            messages: vec![],
            pinned: vec![],
            standup: None,
        });
        id
    }

    #[test]
    fn involvement_is_zero_on_empty_workspace() {
        let mut data = Workspace::new();
        let u = user(&mut data);
        update_user_stats(&mut data, u).unwrap();
        let stats = &data.user_by_id(u).unwrap().user_stats;
        assert_eq!(stats.involvement_rate, 0.0);
        // seed sample plus the one just appended
        assert_eq!(stats.channels_joined.len(), 2);
    }

    #[test]
    fn involvement_counts_joins_and_messages() {
        let mut data = Workspace::new();
        let u = user(&mut data);
        let other = user(&mut data);
        let c = channel(&mut data, &[u, other]);
        channel(&mut data, &[other]);
        data.channel_by_id_mut(c)
            .unwrap()
            .messages
            .push(Message::new(u, "hi".into()));

        update_user_stats(&mut data, u).unwrap();
        // 1 channel joined + 1 message sent over 2 channels + 1 message
        let rate = data.user_by_id(u).unwrap().user_stats.involvement_rate;
        assert!((rate - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn involvement_is_clamped_to_one() {
        assert_eq!(involvement_rate(5, 3), 1.0);
        assert_eq!(involvement_rate(0, 0), 0.0);
    }

    #[test]
    fn utilization_counts_distinct_members() {
        let mut data = Workspace::new();
        let a = user(&mut data);
        let b = user(&mut data);
        user(&mut data); // never joins anything
        channel(&mut data, &[a, b]);
        data.dms.push(Dm {
            dm_id: Uuid::new_v4(),
            name: "d".into(),
            owner_members: vec![a],
            all_members: vec![a, b],
            messages: vec![],
            pinned: vec![],
        });

        // a and b are each in a channel and a DM but count once
        assert!((utilization_rate(&data) - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn workspace_samples_append() {
        let mut data = Workspace::new();
        let u = user(&mut data);
        channel(&mut data, &[u]);
        update_workspace_stats(&mut data);

        let stats = &data.workspace_stats;
        assert_eq!(stats.channels_exist.len(), 2);
        assert_eq!(stats.channels_exist[1].num_channels_exist, 1);
        assert_eq!(stats.messages_exist[1].num_messages_exist, 0);
        assert_eq!(stats.utilization_rate, 1.0);
    }
}
