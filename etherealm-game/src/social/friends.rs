use serde::{Deserialize, Serialize};

use super::SocialError;
use crate::address::Address;
use crate::constants::{FRIEND_LIMIT, KEY_FRIENDS};
use crate::daily::GameDay;
use crate::storage::StoredBlob;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Friend {
    pub address: Address,
    #[serde(default)]
    pub nickname: Option<String>,
    pub since: GameDay,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendRequest {
    /// The other party: sender for incoming, recipient for outgoing.
    pub peer: Address,
    pub day: GameDay,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendList {
    #[serde(default)]
    pub friends: Vec<Friend>,
    #[serde(default)]
    pub incoming: Vec<FriendRequest>,
    #[serde(default)]
    pub outgoing: Vec<FriendRequest>,
}

impl StoredBlob for FriendList {
    const KEY: &'static str = KEY_FRIENDS;
}

impl FriendList {
    #[must_use]
    pub fn is_friend(&self, address: &Address) -> bool {
        self.friends.iter().any(|f| &f.address == address)
    }

    fn is_pending(&self, address: &Address) -> bool {
        self.incoming.iter().chain(&self.outgoing).any(|r| &r.peer == address)
    }

    fn check_new_peer(&self, me: &Address, peer: &Address) -> Result<(), SocialError> {
        if me == peer {
            return Err(SocialError::SelfRequest);
        }
        if self.is_friend(peer) {
            return Err(SocialError::AlreadyFriends(*peer));
        }
        if self.friends.len() >= FRIEND_LIMIT {
            return Err(SocialError::FriendLimit(FRIEND_LIMIT));
        }
        Ok(())
    }

    fn befriend(&mut self, peer: Address, day: GameDay) {
        self.incoming.retain(|r| r.peer != peer);
        self.outgoing.retain(|r| r.peer != peer);
        self.friends.push(Friend {
            address: peer,
            nickname: None,
            since: day,
        });
    }

    /// Record an outgoing request from `me` to `to`.
    ///
    /// # Errors
    ///
    /// Fails for self-requests, existing friends, duplicate pending requests,
    /// or a full list.
    pub fn send_request(&mut self, me: &Address, to: Address, day: GameDay) -> Result<(), SocialError> {
        self.check_new_peer(me, &to)?;
        if self.is_pending(&to) {
            return Err(SocialError::AlreadyPending(to));
        }
        self.outgoing.push(FriendRequest { peer: to, day });
        Ok(())
    }

    /// Record a request arriving from `from`. If we already asked them, the
    /// two requests meet and they become friends immediately; returns `true`
    /// in that case.
    ///
    /// # Errors
    ///
    /// Fails for self-requests, existing friends, or a full list.
    pub fn receive_request(&mut self, me: &Address, from: Address, day: GameDay) -> Result<bool, SocialError> {
        self.check_new_peer(me, &from)?;
        if self.outgoing.iter().any(|r| r.peer == from) {
            self.befriend(from, day);
            return Ok(true);
        }
        if self.incoming.iter().any(|r| r.peer == from) {
            return Err(SocialError::AlreadyPending(from));
        }
        self.incoming.push(FriendRequest { peer: from, day });
        Ok(false)
    }

    /// Accept a pending incoming request.
    ///
    /// # Errors
    ///
    /// Fails when no request from `from` is pending or the list is full.
    pub fn accept(&mut self, from: Address, day: GameDay) -> Result<(), SocialError> {
        if !self.incoming.iter().any(|r| r.peer == from) {
            return Err(SocialError::NoRequest(from));
        }
        if self.friends.len() >= FRIEND_LIMIT {
            return Err(SocialError::FriendLimit(FRIEND_LIMIT));
        }
        self.befriend(from, day);
        Ok(())
    }

    /// Record that `peer` accepted us, whether or not our outgoing request
    /// is still on this list. Already being friends is not an error.
    ///
    /// # Errors
    ///
    /// Fails for self-friendship or a full list.
    pub fn confirm(&mut self, me: &Address, peer: Address, day: GameDay) -> Result<(), SocialError> {
        if self.is_friend(&peer) {
            return Ok(());
        }
        self.check_new_peer(me, &peer)?;
        self.befriend(peer, day);
        Ok(())
    }

    /// Drop a pending incoming request.
    ///
    /// # Errors
    ///
    /// Fails when no request from `from` is pending.
    pub fn decline(&mut self, from: Address) -> Result<(), SocialError> {
        let before = self.incoming.len();
        self.incoming.retain(|r| r.peer != from);
        if self.incoming.len() == before {
            return Err(SocialError::NoRequest(from));
        }
        Ok(())
    }

    /// Withdraw a pending outgoing request.
    ///
    /// # Errors
    ///
    /// Fails when no request to `to` is pending.
    pub fn cancel_request(&mut self, to: Address) -> Result<(), SocialError> {
        let before = self.outgoing.len();
        self.outgoing.retain(|r| r.peer != to);
        if self.outgoing.len() == before {
            return Err(SocialError::NoRequest(to));
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Fails when `address` is not a friend.
    pub fn remove(&mut self, address: &Address) -> Result<Friend, SocialError> {
        let pos = self
            .friends
            .iter()
            .position(|f| &f.address == address)
            .ok_or(SocialError::NotFriends(*address))?;
        Ok(self.friends.remove(pos))
    }

    /// Set or clear a friend's nickname.
    ///
    /// # Errors
    ///
    /// Fails when `address` is not a friend.
    pub fn set_nickname(&mut self, address: &Address, nickname: Option<String>) -> Result<(), SocialError> {
        let friend = self
            .friends
            .iter_mut()
            .find(|f| &f.address == address)
            .ok_or(SocialError::NotFriends(*address))?;
        friend.nickname = nickname
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        Ok(())
    }
}
