//! 单局游戏会话
//!
//! 在一局进行中累积每个单词的作答结果，结束时一次性提交给 [`KnowledgeStore`]。
//! 同一单词重复作答时保留最后一次结果。

use crate::knowledge::models::{Direction, GameRecord, Mode, OutcomeTally, Quality, WordOutcome};
use crate::knowledge::KnowledgeStore;

#[derive(Debug, Clone)]
pub struct GameSession {
    category: String,
    direction: Direction,
    mode: Mode,
    outcomes: Vec<WordOutcome>,
}

impl GameSession {
    pub fn new(category: impl Into<String>, direction: Direction, mode: Mode) -> Self {
        Self {
            category: category.into(),
            direction,
            mode,
            outcomes: Vec::new(),
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    /// 记录一个单词的作答；`attempt` 为答对时的尝试次数，放弃或超过 3 次记为失败
    pub fn record_attempt(&mut self, word_key: &str, attempt: u32) -> Quality {
        let quality = Quality::from_attempt(attempt);
        match self.outcomes.iter_mut().find(|o| o.word_key == word_key) {
            Some(existing) => existing.quality = quality,
            None => self.outcomes.push(WordOutcome::new(word_key, quality)),
        }
        quality
    }

    pub fn outcomes(&self) -> &[WordOutcome] {
        &self.outcomes
    }

    pub fn tally(&self) -> OutcomeTally {
        let mut tally = OutcomeTally::default();
        for outcome in &self.outcomes {
            tally.add(outcome.quality);
        }
        tally
    }

    /// 结束本局并写入掌握度存储
    pub fn finish(self, store: &mut KnowledgeStore) -> GameRecord {
        store.record_game(&self.category, self.direction, self.outcomes, self.mode)
    }
}
