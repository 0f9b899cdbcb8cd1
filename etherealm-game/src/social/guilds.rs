use serde::{Deserialize, Serialize};

use super::SocialError;
use crate::address::Address;
use crate::constants::{
    GUILD_MEMBER_LIMIT, GUILD_NAME_MAX_LEN, GUILD_NAME_MIN_LEN, GUILD_TAG_MAX_LEN,
    GUILD_TAG_MIN_LEN, GUILD_XP_PER_LEVEL, KEY_GUILDS,
};
use crate::daily::GameDay;
use crate::storage::StoredBlob;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuildRole {
    Member,
    Officer,
    Leader,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildMember {
    pub address: Address,
    pub role: GuildRole,
    pub joined: GameDay,
    #[serde(default)]
    pub contributed: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guild {
    pub id: u64,
    pub name: String,
    pub tag: String,
    pub created: GameDay,
    #[serde(default)]
    pub xp: u64,
    /// Join order; the first entry is the longest-standing member.
    pub members: Vec<GuildMember>,
}

impl Guild {
    #[must_use]
    pub const fn level(&self) -> u64 {
        1 + self.xp / GUILD_XP_PER_LEVEL
    }

    #[must_use]
    pub fn leader(&self) -> Option<&GuildMember> {
        self.members.iter().find(|m| m.role == GuildRole::Leader)
    }

    #[must_use]
    pub fn member(&self, address: &Address) -> Option<&GuildMember> {
        self.members.iter().find(|m| &m.address == address)
    }

    fn member_mut(&mut self, address: &Address) -> Option<&mut GuildMember> {
        self.members.iter_mut().find(|m| &m.address == address)
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.members.len() >= GUILD_MEMBER_LIMIT
    }
}

/// What happened when a member left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    Left,
    LeadershipPassed(Address),
    Disbanded,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildDirectory {
    #[serde(default)]
    pub guilds: Vec<Guild>,
    #[serde(default)]
    pub next_id: u64,
}

impl StoredBlob for GuildDirectory {
    const KEY: &'static str = KEY_GUILDS;
}

fn validate_name(name: &str) -> Result<String, SocialError> {
    let trimmed = name.trim();
    let len = trimmed.chars().count();
    let allowed = trimmed
        .chars()
        .all(|c| c.is_alphanumeric() || c == ' ' || c == '\'' || c == '-');
    if !(GUILD_NAME_MIN_LEN..=GUILD_NAME_MAX_LEN).contains(&len) || !allowed {
        return Err(SocialError::InvalidGuildName(name.to_string()));
    }
    Ok(trimmed.to_string())
}

fn validate_tag(tag: &str) -> Result<String, SocialError> {
    let upper = tag.trim().to_ascii_uppercase();
    let ok = (GUILD_TAG_MIN_LEN..=GUILD_TAG_MAX_LEN).contains(&upper.len())
        && upper.chars().all(|c| c.is_ascii_alphanumeric());
    if !ok {
        return Err(SocialError::InvalidGuildTag(tag.to_string()));
    }
    Ok(upper)
}

impl GuildDirectory {
    #[must_use]
    pub fn get(&self, id: u64) -> Option<&Guild> {
        self.guilds.iter().find(|g| g.id == id)
    }

    fn get_mut(&mut self, id: u64) -> Result<&mut Guild, SocialError> {
        self.guilds
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or(SocialError::UnknownGuild(id))
    }

    #[must_use]
    pub fn guild_of(&self, address: &Address) -> Option<&Guild> {
        self.guilds.iter().find(|g| g.member(address).is_some())
    }

    fn guild_id_of(&self, address: &Address) -> Result<u64, SocialError> {
        self.guild_of(address)
            .map(|g| g.id)
            .ok_or(SocialError::NotInGuild(*address))
    }

    /// Guilds sorted by level, then XP, then age.
    #[must_use]
    pub fn ranking(&self) -> Vec<&Guild> {
        let mut ranked: Vec<&Guild> = self.guilds.iter().collect();
        ranked.sort_by(|a, b| {
            b.xp.cmp(&a.xp)
                .then_with(|| a.created.cmp(&b.created))
                .then_with(|| a.id.cmp(&b.id))
        });
        ranked
    }

    /// Found a guild with `leader` as its only member. Returns the new id.
    ///
    /// # Errors
    ///
    /// Fails for invalid or taken names/tags, or when the leader already
    /// belongs to a guild.
    pub fn create(&mut self, name: &str, tag: &str, leader: Address, day: GameDay) -> Result<u64, SocialError> {
        let name = validate_name(name)?;
        let tag = validate_tag(tag)?;
        if self.guild_of(&leader).is_some() {
            return Err(SocialError::AlreadyInGuild(leader));
        }
        if self
            .guilds
            .iter()
            .any(|g| g.name.eq_ignore_ascii_case(&name) || g.tag == tag)
        {
            return Err(SocialError::GuildTaken(format!("{name} [{tag}]")));
        }
        self.next_id += 1;
        let id = self.next_id;
        self.guilds.push(Guild {
            id,
            name,
            tag,
            created: day,
            xp: 0,
            members: vec![GuildMember {
                address: leader,
                role: GuildRole::Leader,
                joined: day,
                contributed: 0,
            }],
        });
        log::debug!("guild #{id} founded by {leader}");
        Ok(id)
    }

    /// # Errors
    ///
    /// Fails for unknown or full guilds, or when `who` is already in a guild.
    pub fn join(&mut self, id: u64, who: Address, day: GameDay) -> Result<(), SocialError> {
        if self.guild_of(&who).is_some() {
            return Err(SocialError::AlreadyInGuild(who));
        }
        let guild = self.get_mut(id)?;
        if guild.is_full() {
            return Err(SocialError::GuildFull(id));
        }
        guild.members.push(GuildMember {
            address: who,
            role: GuildRole::Member,
            joined: day,
            contributed: 0,
        });
        Ok(())
    }

    /// Leave the current guild. A departing leader hands over to the
    /// longest-serving officer, else the longest-serving member; the last
    /// member out disbands the guild.
    ///
    /// # Errors
    ///
    /// Fails when `who` is not in a guild.
    pub fn leave(&mut self, who: &Address) -> Result<LeaveOutcome, SocialError> {
        let id = self.guild_id_of(who)?;
        let guild = self.get_mut(id)?;
        let was_leader = guild.member(who).is_some_and(|m| m.role == GuildRole::Leader);
        guild.members.retain(|m| &m.address != who);

        if guild.members.is_empty() {
            self.guilds.retain(|g| g.id != id);
            return Ok(LeaveOutcome::Disbanded);
        }
        if !was_leader {
            return Ok(LeaveOutcome::Left);
        }
        let successor = guild
            .members
            .iter()
            .position(|m| m.role == GuildRole::Officer)
            .unwrap_or(0);
        guild.members[successor].role = GuildRole::Leader;
        Ok(LeaveOutcome::LeadershipPassed(guild.members[successor].address))
    }

    fn roles(&self, actor: &Address, target: &Address) -> Result<(u64, GuildRole, GuildRole), SocialError> {
        let guild = self.guild_of(actor).ok_or(SocialError::NotInGuild(*actor))?;
        let actor_role = guild.member(actor).map(|m| m.role).ok_or(SocialError::NotInGuild(*actor))?;
        let target_role = guild
            .member(target)
            .map(|m| m.role)
            .ok_or(SocialError::NotAMember(*target))?;
        Ok((guild.id, actor_role, target_role))
    }

    /// Remove `target` from `actor`'s guild. Leaders may kick anyone else;
    /// officers may kick members.
    ///
    /// # Errors
    ///
    /// Fails when the two are not guildmates or `actor` outranks nobody.
    pub fn kick(&mut self, actor: &Address, target: &Address) -> Result<(), SocialError> {
        let (id, actor_role, target_role) = self.roles(actor, target)?;
        if actor == target || actor_role == GuildRole::Member || target_role >= actor_role {
            return Err(SocialError::PermissionDenied);
        }
        self.get_mut(id)?.members.retain(|m| &m.address != target);
        Ok(())
    }

    /// Leader-only: raise a member to officer, or hand leadership to an
    /// officer (the old leader becomes an officer).
    ///
    /// # Errors
    ///
    /// Fails when `actor` is not the leader of `target`'s guild.
    pub fn promote(&mut self, actor: &Address, target: &Address) -> Result<GuildRole, SocialError> {
        let (id, actor_role, target_role) = self.roles(actor, target)?;
        if actor_role != GuildRole::Leader || actor == target {
            return Err(SocialError::PermissionDenied);
        }
        let guild = self.get_mut(id)?;
        let new_role = match target_role {
            GuildRole::Member => GuildRole::Officer,
            GuildRole::Officer | GuildRole::Leader => {
                if let Some(leader) = guild.member_mut(actor) {
                    leader.role = GuildRole::Officer;
                }
                GuildRole::Leader
            }
        };
        if let Some(member) = guild.member_mut(target) {
            member.role = new_role;
        }
        Ok(new_role)
    }

    /// Leader-only: drop an officer back to member.
    ///
    /// # Errors
    ///
    /// Fails when `actor` is not the leader or `target` is not an officer.
    pub fn demote(&mut self, actor: &Address, target: &Address) -> Result<(), SocialError> {
        let (id, actor_role, target_role) = self.roles(actor, target)?;
        if actor_role != GuildRole::Leader || target_role != GuildRole::Officer {
            return Err(SocialError::PermissionDenied);
        }
        if let Some(member) = self.get_mut(id)?.member_mut(target) {
            member.role = GuildRole::Member;
        }
        Ok(())
    }

    /// Add guild XP on behalf of `who`. Returns the guild's new level.
    ///
    /// # Errors
    ///
    /// Fails when `who` is not in a guild.
    pub fn contribute(&mut self, who: &Address, xp: u64) -> Result<u64, SocialError> {
        let id = self.guild_id_of(who)?;
        let guild = self.get_mut(id)?;
        guild.xp = guild.xp.saturating_add(xp);
        if let Some(member) = guild.member_mut(who) {
            member.contributed = member.contributed.saturating_add(xp);
        }
        Ok(guild.level())
    }
}
