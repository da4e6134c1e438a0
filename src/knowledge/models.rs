//! 数据模型定义
//!
//! 持久化文档的结构：单词键 × 练习方向 × 受众模式 三维的掌握度记录，
//! 外加有界的游戏历史与全局元数据。字段名与存储中的 JSON 保持 camelCase。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::knowledge::history::GameHistory;
use crate::knowledge::scoring::clamp_score;

/// 当前文档 schema 版本
pub const CURRENT_SCHEMA_VERSION: u32 = 5;

// ============================================================
// 枚举维度
// ============================================================

/// 单次作答质量
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Quality {
    FirstTry,
    SecondTry,
    ThirdTry,
    Failed,
}

impl Quality {
    /// 按尝试次数归类（第 1/2/3 次答对，其余为失败）
    pub fn from_attempt(attempt: u32) -> Self {
        match attempt {
            1 => Quality::FirstTry,
            2 => Quality::SecondTry,
            3 => Quality::ThirdTry,
            _ => Quality::Failed,
        }
    }
}

/// 练习方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Forward,
    Reverse,
}

impl Direction {
    pub const ALL: [Direction; 2] = [Direction::Forward, Direction::Reverse];
}

/// 受众模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Primary,
    Junior,
}

impl Mode {
    pub const ALL: [Mode; 2] = [Mode::Primary, Mode::Junior];
}

// ============================================================
// WordKnowledge - 单个模式下单个方向的掌握度
// ============================================================

/// 故事阅读中遇到该词的记录
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryEncounters {
    pub story_ids: BTreeSet<String>,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordKnowledge {
    /// 掌握度分数 [0, 100]
    pub score: f64,
    #[serde(default)]
    pub practice_count: u32,
    #[serde(default)]
    pub first_try_count: u32,
    #[serde(default)]
    pub second_try_count: u32,
    #[serde(default)]
    pub third_try_count: u32,
    #[serde(default)]
    pub failed_count: u32,
    #[serde(default)]
    pub last_practiced_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub first_practiced_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub story_encounters: Option<StoryEncounters>,
}

impl Default for WordKnowledge {
    fn default() -> Self {
        Self {
            score: 0.0,
            practice_count: 0,
            first_try_count: 0,
            second_try_count: 0,
            third_try_count: 0,
            failed_count: 0,
            last_practiced_at: None,
            first_practiced_at: None,
            story_encounters: None,
        }
    }
}

impl WordKnowledge {
    /// 是否真正练习过（仅有故事记录的不算）
    pub fn is_practiced(&self) -> bool {
        self.practice_count > 0
    }

    pub(crate) fn bump_quality(&mut self, quality: Quality) {
        match quality {
            Quality::FirstTry => self.first_try_count += 1,
            Quality::SecondTry => self.second_try_count += 1,
            Quality::ThirdTry => self.third_try_count += 1,
            Quality::Failed => self.failed_count += 1,
        }
    }
}

// ============================================================
// WordKnowledgeBidirectional - 单词键下的全部记录
// ============================================================

/// 单个方向下的模式分桶
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModeBuckets {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<WordKnowledge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub junior: Option<WordKnowledge>,
}

impl ModeBuckets {
    pub fn get(&self, mode: Mode) -> Option<&WordKnowledge> {
        match mode {
            Mode::Primary => self.primary.as_ref(),
            Mode::Junior => self.junior.as_ref(),
        }
    }

    pub fn slot_mut(&mut self, mode: Mode) -> &mut Option<WordKnowledge> {
        match mode {
            Mode::Primary => &mut self.primary,
            Mode::Junior => &mut self.junior,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.primary.is_none() && self.junior.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WordKnowledgeBidirectional {
    #[serde(default, skip_serializing_if = "ModeBuckets::is_empty")]
    pub forward: ModeBuckets,
    #[serde(default, skip_serializing_if = "ModeBuckets::is_empty")]
    pub reverse: ModeBuckets,
}

impl WordKnowledgeBidirectional {
    pub fn direction(&self, direction: Direction) -> &ModeBuckets {
        match direction {
            Direction::Forward => &self.forward,
            Direction::Reverse => &self.reverse,
        }
    }

    pub fn direction_mut(&mut self, direction: Direction) -> &mut ModeBuckets {
        match direction {
            Direction::Forward => &mut self.forward,
            Direction::Reverse => &mut self.reverse,
        }
    }

    pub fn get(&self, direction: Direction, mode: Mode) -> Option<&WordKnowledge> {
        self.direction(direction).get(mode)
    }

    /// 取出（必要时创建）指定方向与模式的记录
    pub fn entry(&mut self, direction: Direction, mode: Mode) -> &mut WordKnowledge {
        self.direction_mut(direction)
            .slot_mut(mode)
            .get_or_insert_with(WordKnowledge::default)
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty() && self.reverse.is_empty()
    }

    /// 该模式下是否至少有一个方向练习过
    pub fn is_practiced_in(&self, mode: Mode) -> bool {
        Direction::ALL
            .iter()
            .any(|&d| self.get(d, mode).is_some_and(WordKnowledge::is_practiced))
    }

    /// 把越界或非有限的分数截回 [0, 100]，返回被修正的记录数
    pub fn clamp_scores(&mut self) -> usize {
        let mut adjusted = 0;
        for direction in Direction::ALL {
            for mode in Mode::ALL {
                if let Some(record) = self.direction_mut(direction).slot_mut(mode) {
                    let clamped = clamp_score(record.score);
                    if clamped != record.score {
                        record.score = clamped;
                        adjusted += 1;
                    }
                }
            }
        }
        adjusted
    }

    /// 只保留指定模式的分桶，没有任何分桶时返回 `None`
    pub fn only_mode(&self, mode: Mode) -> Option<Self> {
        let mut filtered = Self::default();
        for direction in Direction::ALL {
            if let Some(record) = self.get(direction, mode) {
                *filtered.direction_mut(direction).slot_mut(mode) = Some(record.clone());
            }
        }
        (!filtered.is_empty()).then_some(filtered)
    }
}

// ============================================================
// GameRecord - 游戏历史条目
// ============================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeTally {
    pub first_try: u32,
    pub second_try: u32,
    pub third_try: u32,
    pub failed: u32,
}

impl OutcomeTally {
    pub fn add(&mut self, quality: Quality) {
        match quality {
            Quality::FirstTry => self.first_try += 1,
            Quality::SecondTry => self.second_try += 1,
            Quality::ThirdTry => self.third_try += 1,
            Quality::Failed => self.failed += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.first_try + self.second_try + self.third_try + self.failed
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordOutcome {
    pub word_key: String,
    pub quality: Quality,
}

impl WordOutcome {
    pub fn new(word_key: impl Into<String>, quality: Quality) -> Self {
        Self {
            word_key: word_key.into(),
            quality,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub category: String,
    pub direction: Direction,
    /// V2 之前的记录没有该字段，统一视为 primary
    #[serde(default)]
    pub mode: Mode,
    pub question_count: u32,
    pub outcome_tally: OutcomeTally,
    #[serde(default)]
    pub per_word_outcomes: Vec<WordOutcome>,
}

// ============================================================
// KnowledgeData - 持久化根文档
// ============================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeMeta {
    /// 早期文档可能没有时间戳，读入时以当前时间补齐
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub total_sessions: u32,
    #[serde(default)]
    pub primary_sessions: u32,
    #[serde(default)]
    pub junior_sessions: u32,
}

impl KnowledgeMeta {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            created_at: now,
            updated_at: now,
            total_sessions: 0,
            primary_sessions: 0,
            junior_sessions: 0,
        }
    }

    pub fn sessions_for(&self, mode: Mode) -> u32 {
        match mode {
            Mode::Primary => self.primary_sessions,
            Mode::Junior => self.junior_sessions,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeData {
    pub schema_version: u32,
    #[serde(default)]
    pub words: BTreeMap<String, WordKnowledgeBidirectional>,
    #[serde(default)]
    pub game_history: GameHistory,
    pub meta: KnowledgeMeta,
}

impl KnowledgeData {
    /// 全新的空文档
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            words: BTreeMap::new(),
            game_history: GameHistory::default(),
            meta: KnowledgeMeta::new(now),
        }
    }
}
