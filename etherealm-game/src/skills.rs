//! Skill tree definitions and the player's allocated ranks.
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

use crate::constants::KEY_SKILLS;
use crate::items::StatBlock;
use crate::storage::StoredBlob;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SkillError {
    #[error("unknown skill: {0}")]
    UnknownSkill(String),
    #[error("{0} is already at max rank")]
    MaxRank(String),
    #[error("not enough skill points: have {have}, need {need}")]
    NotEnoughPoints { have: u32, need: u32 },
    #[error("{skill} requires level {required}")]
    LevelTooLow { skill: String, required: u32 },
    #[error("{skill} requires {prerequisite} rank {rank}")]
    PrerequisiteMissing {
        skill: String,
        prerequisite: String,
        rank: u8,
    },
    #[error("invalid skill tree: {0}")]
    InvalidTree(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prerequisite {
    pub skill: String,
    pub rank: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillDef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub desc: String,
    pub max_rank: u8,
    #[serde(default = "default_cost")]
    pub cost_per_rank: u32,
    #[serde(default = "default_level_req")]
    pub level_req: u32,
    #[serde(default)]
    pub requires: Option<Prerequisite>,
    /// Bonus granted for each rank.
    #[serde(default)]
    pub per_rank: StatBlock,
}

const fn default_cost() -> u32 {
    1
}

const fn default_level_req() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
struct TreeFile {
    skills: Vec<SkillDef>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "TreeFile")]
pub struct SkillTree {
    skills: Vec<SkillDef>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl TryFrom<TreeFile> for SkillTree {
    type Error = SkillError;

    fn try_from(file: TreeFile) -> Result<Self, Self::Error> {
        Self::new(file.skills)
    }
}

impl SkillTree {
    /// Build a tree; every prerequisite must name another skill in the tree
    /// at a reachable rank.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTree` for duplicate ids, zero max ranks, free ranks,
    /// or dangling prerequisites.
    pub fn new(skills: Vec<SkillDef>) -> Result<Self, SkillError> {
        let mut index = HashMap::with_capacity(skills.len());
        for (pos, skill) in skills.iter().enumerate() {
            if skill.max_rank == 0 {
                return Err(SkillError::InvalidTree(format!("{} has max_rank 0", skill.id)));
            }
            if skill.cost_per_rank == 0 {
                return Err(SkillError::InvalidTree(format!("{} has cost_per_rank 0", skill.id)));
            }
            if index.insert(skill.id.clone(), pos).is_some() {
                return Err(SkillError::InvalidTree(format!("duplicate skill {}", skill.id)));
            }
        }
        for skill in &skills {
            let Some(req) = &skill.requires else { continue };
            let target = index
                .get(&req.skill)
                .map(|&pos| &skills[pos])
                .filter(|target| target.id != skill.id)
                .ok_or_else(|| {
                    SkillError::InvalidTree(format!("{} requires unknown {}", skill.id, req.skill))
                })?;
            if req.rank == 0 || req.rank > target.max_rank {
                return Err(SkillError::InvalidTree(format!(
                    "{} requires unreachable {} rank {}",
                    skill.id, req.skill, req.rank
                )));
            }
        }
        Ok(Self { skills, index })
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&SkillDef> {
        self.index.get(id).map(|&pos| &self.skills[pos])
    }

    pub fn iter(&self) -> impl Iterator<Item = &SkillDef> {
        self.skills.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.skills.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }
}

/// Allocated ranks. `unspent + spent` always equals the points granted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillBook {
    #[serde(default)]
    pub unspent: u32,
    #[serde(default)]
    pub spent: u32,
    #[serde(default)]
    pub ranks: BTreeMap<String, u8>,
}

impl StoredBlob for SkillBook {
    const KEY: &'static str = KEY_SKILLS;
}

impl SkillBook {
    pub fn grant_points(&mut self, points: u32) {
        self.unspent = self.unspent.saturating_add(points);
    }

    #[must_use]
    pub fn rank(&self, id: &str) -> u8 {
        self.ranks.get(id).copied().unwrap_or(0)
    }

    #[must_use]
    pub const fn total_points(&self) -> u32 {
        self.unspent.saturating_add(self.spent)
    }

    /// Check whether one more rank of `id` could be bought right now.
    ///
    /// # Errors
    ///
    /// Returns the first rule that blocks the allocation.
    pub fn check_allocate(&self, tree: &SkillTree, id: &str, level: u32) -> Result<u32, SkillError> {
        let def = tree
            .get(id)
            .ok_or_else(|| SkillError::UnknownSkill(id.to_string()))?;
        if self.rank(id) >= def.max_rank {
            return Err(SkillError::MaxRank(id.to_string()));
        }
        if level < def.level_req {
            return Err(SkillError::LevelTooLow {
                skill: id.to_string(),
                required: def.level_req,
            });
        }
        if let Some(req) = &def.requires
            && self.rank(&req.skill) < req.rank
        {
            return Err(SkillError::PrerequisiteMissing {
                skill: id.to_string(),
                prerequisite: req.skill.clone(),
                rank: req.rank,
            });
        }
        if self.unspent < def.cost_per_rank {
            return Err(SkillError::NotEnoughPoints {
                have: self.unspent,
                need: def.cost_per_rank,
            });
        }
        Ok(def.cost_per_rank)
    }

    /// Spend points on one rank of `id`. Returns the new rank.
    ///
    /// # Errors
    ///
    /// Fails without changes when any allocation rule is violated.
    pub fn allocate(&mut self, tree: &SkillTree, id: &str, level: u32) -> Result<u8, SkillError> {
        let cost = self.check_allocate(tree, id, level)?;
        self.unspent -= cost;
        self.spent += cost;
        let rank = self.ranks.entry(id.to_string()).or_insert(0);
        *rank += 1;
        Ok(*rank)
    }

    /// Refund every spent point. Returns the refunded amount.
    pub fn reset(&mut self) -> u32 {
        let refunded = self.spent;
        self.unspent = self.unspent.saturating_add(refunded);
        self.spent = 0;
        self.ranks.clear();
        refunded
    }

    #[must_use]
    pub fn total_stats(&self, tree: &SkillTree) -> StatBlock {
        self.ranks
            .iter()
            .filter_map(|(id, &rank)| tree.get(id).map(|def| def.per_rank.scaled(i32::from(rank))))
            .sum()
    }
}
