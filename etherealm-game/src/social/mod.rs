//! Friends and guilds.
//!
//! Both live in local storage: the friend list per account, the guild
//! directory in the device-wide namespace so every account on the device
//! sees the same guilds.
use thiserror::Error;

use crate::address::Address;

pub mod friends;
pub mod guilds;

pub use friends::{Friend, FriendList, FriendRequest};
pub use guilds::{Guild, GuildDirectory, GuildMember, GuildRole, LeaveOutcome};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SocialError {
    #[error("cannot befriend yourself")]
    SelfRequest,
    #[error("{0} is already a friend")]
    AlreadyFriends(Address),
    #[error("a request with {0} is already pending")]
    AlreadyPending(Address),
    #[error("no pending request with {0}")]
    NoRequest(Address),
    #[error("{0} is not a friend")]
    NotFriends(Address),
    #[error("friend list is full ({0})")]
    FriendLimit(usize),
    #[error("invalid guild name '{0}'")]
    InvalidGuildName(String),
    #[error("invalid guild tag '{0}'")]
    InvalidGuildTag(String),
    #[error("guild name or tag already taken: {0}")]
    GuildTaken(String),
    #[error("guild #{0} does not exist")]
    UnknownGuild(u64),
    #[error("guild #{0} is full")]
    GuildFull(u64),
    #[error("{0} is already in a guild")]
    AlreadyInGuild(Address),
    #[error("{0} is not in a guild")]
    NotInGuild(Address),
    #[error("{0} is not a member of that guild")]
    NotAMember(Address),
    #[error("insufficient guild permissions")]
    PermissionDenied,
}
