use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::unix_now;

/// The only react kind the workspace knows about (thumbs-up).
pub const VALID_REACT_IDS: &[u32] = &[1];

// -- Statistics time series --
//
// One sample struct per series; the counter field carries the series
// name in the serialized document.

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelsJoinedSample {
    pub num_channels_joined: u64,
    pub time_stamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DmsJoinedSample {
    pub num_dms_joined: u64,
    pub time_stamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagesSentSample {
    pub num_messages_sent: u64,
    pub time_stamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelsExistSample {
    pub num_channels_exist: u64,
    pub time_stamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DmsExistSample {
    pub num_dms_exist: u64,
    pub time_stamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagesExistSample {
    pub num_messages_exist: u64,
    pub time_stamp: i64,
}

/// Per-user participation series, embedded in the user record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub channels_joined: Vec<ChannelsJoinedSample>,
    pub dms_joined: Vec<DmsJoinedSample>,
    pub messages_sent: Vec<MessagesSentSample>,
    pub involvement_rate: f64,
}

impl UserStats {
    /// Fresh series: one zero sample per counter, taken now.
    pub fn seeded() -> Self {
        let now = unix_now();
        Self {
            channels_joined: vec![ChannelsJoinedSample { num_channels_joined: 0, time_stamp: now }],
            dms_joined: vec![DmsJoinedSample { num_dms_joined: 0, time_stamp: now }],
            messages_sent: vec![MessagesSentSample { num_messages_sent: 0, time_stamp: now }],
            involvement_rate: 0.0,
        }
    }
}

/// Workspace-wide existence series plus the utilization rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceStats {
    pub channels_exist: Vec<ChannelsExistSample>,
    pub dms_exist: Vec<DmsExistSample>,
    pub messages_exist: Vec<MessagesExistSample>,
    pub utilization_rate: f64,
}

impl WorkspaceStats {
    pub fn seeded() -> Self {
        let now = unix_now();
        Self {
            channels_exist: vec![ChannelsExistSample { num_channels_exist: 0, time_stamp: now }],
            dms_exist: vec![DmsExistSample { num_dms_exist: 0, time_stamp: now }],
            messages_exist: vec![MessagesExistSample { num_messages_exist: 0, time_stamp: now }],
            utilization_rate: 0.0,
        }
    }
}

// -- Users --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub auth_user_id: Uuid,
    pub email: String,
    /// Argon2id PHC string. Raw passwords are never stored.
    pub password: String,
    pub name_first: String,
    pub name_last: String,
    pub handle_str: String,
    /// SHA-256 hex digests of the active session tokens. One entry per
    /// session; logout removes exactly one.
    pub tokens: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_code: Option<String>,
    pub profile_img_url: String,
    pub user_stats: UserStats,
}

// -- Messages --

/// One react group on a message: everyone who reacted with `react_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct React {
    pub react_id: u32,
    pub u_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub message_id: Uuid,
    pub u_id: Uuid,
    pub message: String,
    pub time_sent: i64,
    #[serde(default)]
    pub reacts: Vec<React>,
}

impl Message {
    pub fn new(author: Uuid, body: String) -> Self {
        Self {
            message_id: Uuid::new_v4(),
            u_id: author,
            message: body,
            time_sent: unix_now(),
            reacts: Vec::new(),
        }
    }
}

// -- Standups --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandupEntry {
    pub u_id: Uuid,
    pub message: String,
}

/// Present on a channel only while a standup window is open. The
/// `Option` wrapper on `Channel::standup` is what holds the "at most
/// one active standup per channel" invariant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Standup {
    pub start_time: i64,
    pub finish_time: i64,
    /// Window length in seconds.
    pub length: i64,
    pub starter: Uuid,
    pub queued: Vec<StandupEntry>,
}

// -- Channels & DMs --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub channel_id: Uuid,
    pub name: String,
    pub is_public: bool,
    pub owner_members: Vec<Uuid>,
    pub all_members: Vec<Uuid>,
    pub messages: Vec<Message>,
    #[serde(default)]
    pub pinned: Vec<Uuid>,
    #[serde(default)]
    pub standup: Option<Standup>,
}

impl Channel {
    pub fn is_member(&self, u_id: Uuid) -> bool {
        self.all_members.contains(&u_id)
    }

    pub fn is_owner(&self, u_id: Uuid) -> bool {
        self.owner_members.contains(&u_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dm {
    pub dm_id: Uuid,
    pub name: String,
    pub owner_members: Vec<Uuid>,
    pub all_members: Vec<Uuid>,
    pub messages: Vec<Message>,
    #[serde(default)]
    pub pinned: Vec<Uuid>,
}

impl Dm {
    pub fn is_member(&self, u_id: Uuid) -> bool {
        self.all_members.contains(&u_id)
    }

    pub fn is_owner(&self, u_id: Uuid) -> bool {
        self.owner_members.contains(&u_id)
    }
}

// -- Notifications --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub u_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dm_id: Option<Uuid>,
    pub notification_message: String,
}

// -- Conversation view --

/// Uniform mutable view over the two message containers. Message
/// operations (edit/remove/react/pin) work against this instead of
/// duplicating the channel and DM paths.
pub enum ConversationMut<'a> {
    Channel(&'a mut Channel),
    Dm(&'a mut Dm),
}

impl ConversationMut<'_> {
    pub fn is_channel(&self) -> bool {
        matches!(self, ConversationMut::Channel(_))
    }

    pub fn is_member(&self, u_id: Uuid) -> bool {
        match self {
            ConversationMut::Channel(c) => c.is_member(u_id),
            ConversationMut::Dm(d) => d.is_member(u_id),
        }
    }

    pub fn is_owner(&self, u_id: Uuid) -> bool {
        match self {
            ConversationMut::Channel(c) => c.is_owner(u_id),
            ConversationMut::Dm(d) => d.is_owner(u_id),
        }
    }

    pub fn messages_mut(&mut self) -> &mut Vec<Message> {
        match self {
            ConversationMut::Channel(c) => &mut c.messages,
            ConversationMut::Dm(d) => &mut d.messages,
        }
    }

    pub fn pinned_mut(&mut self) -> &mut Vec<Uuid> {
        match self {
            ConversationMut::Channel(c) => &mut c.pinned,
            ConversationMut::Dm(d) => &mut d.pinned,
        }
    }
}

// -- Document root --

/// The whole workspace, persisted as one JSON document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub users: Vec<User>,
    pub channels: Vec<Channel>,
    pub dms: Vec<Dm>,
    #[serde(default)]
    pub notifications: Vec<Notification>,
    pub workspace_stats: WorkspaceStats,
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            users: Vec::new(),
            channels: Vec::new(),
            dms: Vec::new(),
            notifications: Vec::new(),
            workspace_stats: WorkspaceStats::seeded(),
        }
    }

    pub fn user_by_id(&self, u_id: Uuid) -> Option<&User> {
        self.users.iter().find(|u| u.auth_user_id == u_id)
    }

    pub fn user_by_id_mut(&mut self, u_id: Uuid) -> Option<&mut User> {
        self.users.iter_mut().find(|u| u.auth_user_id == u_id)
    }

    pub fn user_by_email(&self, email: &str) -> Option<&User> {
        self.users.iter().find(|u| u.email == email)
    }

    pub fn user_by_token_hash(&self, hash: &str) -> Option<&User> {
        self.users.iter().find(|u| u.tokens.iter().any(|t| t == hash))
    }

    /// The first registered user holds global owner permissions.
    pub fn is_global_owner(&self, u_id: Uuid) -> bool {
        self.users.first().is_some_and(|u| u.auth_user_id == u_id)
    }

    pub fn channel_by_id(&self, channel_id: Uuid) -> Option<&Channel> {
        self.channels.iter().find(|c| c.channel_id == channel_id)
    }

    pub fn channel_by_id_mut(&mut self, channel_id: Uuid) -> Option<&mut Channel> {
        self.channels.iter_mut().find(|c| c.channel_id == channel_id)
    }

    pub fn dm_by_id(&self, dm_id: Uuid) -> Option<&Dm> {
        self.dms.iter().find(|d| d.dm_id == dm_id)
    }

    pub fn dm_by_id_mut(&mut self, dm_id: Uuid) -> Option<&mut Dm> {
        self.dms.iter_mut().find(|d| d.dm_id == dm_id)
    }

    /// Locate a message anywhere in the workspace, returning its
    /// container and index within that container's log.
    pub fn conversation_with_message(
        &mut self,
        message_id: Uuid,
    ) -> Option<(ConversationMut<'_>, usize)> {
        for channel in &mut self.channels {
            if let Some(idx) = channel.messages.iter().position(|m| m.message_id == message_id) {
                return Some((ConversationMut::Channel(channel), idx));
            }
        }
        for dm in &mut self.dms {
            if let Some(idx) = dm.messages.iter().position(|m| m.message_id == message_id) {
                return Some((ConversationMut::Dm(dm), idx));
            }
        }
        None
    }

    pub fn total_messages(&self) -> usize {
        self.channels.iter().map(|c| c.messages.len()).sum::<usize>()
            + self.dms.iter().map(|d| d.messages.len()).sum::<usize>()
    }
}
