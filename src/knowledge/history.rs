//! 游戏历史日志
//!
//! 新记录插在最前，超过 [`MAX_GAME_HISTORY`] 条时直接丢弃最旧的记录，不做归档。
//! 条目插入后不再修改。

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::knowledge::models::{GameRecord, Mode};

/// 历史记录上限
pub const MAX_GAME_HISTORY: usize = 100;

/// 反序列化时同样截断，存储中超长的列表读入后即满足上限
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<GameRecord>", into = "Vec<GameRecord>")]
pub struct GameHistory(Vec<GameRecord>);

impl From<Vec<GameRecord>> for GameHistory {
    fn from(records: Vec<GameRecord>) -> Self {
        Self::from_records(records)
    }
}

impl From<GameHistory> for Vec<GameRecord> {
    fn from(history: GameHistory) -> Self {
        history.0
    }
}

impl GameHistory {
    /// 从已有列表构造（按新到旧排列），超出上限的部分截掉
    pub fn from_records(mut records: Vec<GameRecord>) -> Self {
        records.truncate(MAX_GAME_HISTORY);
        Self(records)
    }

    pub fn push(&mut self, record: GameRecord) {
        self.0.insert(0, record);
        self.0.truncate(MAX_GAME_HISTORY);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 新到旧遍历
    pub fn iter(&self) -> std::slice::Iter<'_, GameRecord> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[GameRecord] {
        &self.0
    }

    /// 最近的若干条，可按模式过滤
    pub fn recent(&self, limit: usize, mode: Option<Mode>) -> Vec<&GameRecord> {
        self.0
            .iter()
            .filter(|r| mode.map_or(true, |m| r.mode == m))
            .take(limit)
            .collect()
    }

    /// 合并导入的历史：导入列表在前，已有列表在后，按 id 去重后截断
    pub fn merged(imported: &GameHistory, existing: &GameHistory) -> Self {
        let mut seen = HashSet::new();
        let records = imported
            .iter()
            .chain(existing.iter())
            .filter(|r| seen.insert(r.id.clone()))
            .take(MAX_GAME_HISTORY)
            .cloned()
            .collect();
        Self(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::models::{Direction, OutcomeTally};
    use chrono::Utc;

    fn record(id: &str, mode: Mode) -> GameRecord {
        GameRecord {
            id: id.to_string(),
            timestamp: Utc::now(),
            category: "animals".to_string(),
            direction: Direction::Forward,
            mode,
            question_count: 0,
            outcome_tally: OutcomeTally::default(),
            per_word_outcomes: Vec::new(),
        }
    }

    #[test]
    fn test_push_is_newest_first_and_bounded() {
        let mut history = GameHistory::default();
        for i in 0..(MAX_GAME_HISTORY + 5) {
            history.push(record(&format!("g{i}"), Mode::Primary));
        }

        assert_eq!(history.len(), MAX_GAME_HISTORY);
        assert_eq!(history.as_slice()[0].id, format!("g{}", MAX_GAME_HISTORY + 4));
        assert_eq!(history.as_slice()[MAX_GAME_HISTORY - 1].id, "g5");
    }

    #[test]
    fn test_recent_with_mode_filter() {
        let mut history = GameHistory::default();
        history.push(record("a", Mode::Primary));
        history.push(record("b", Mode::Junior));
        history.push(record("c", Mode::Primary));

        let ids: Vec<&str> = history.recent(10, Some(Mode::Primary)).iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a"]);
        assert_eq!(history.recent(1, None)[0].id, "c");
    }

    #[test]
    fn test_merged_puts_imported_first_and_dedupes() {
        let imported = GameHistory::from_records(vec![record("x", Mode::Primary), record("a", Mode::Primary)]);
        let existing = GameHistory::from_records(vec![record("b", Mode::Primary), record("a", Mode::Primary)]);

        let merged = GameHistory::merged(&imported, &existing);
        let ids: Vec<&str> = merged.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["x", "a", "b"]);
    }

    #[test]
    fn test_deserialize_truncates() {
        let records: Vec<GameRecord> = (0..(MAX_GAME_HISTORY + 20))
            .map(|i| record(&format!("g{i}"), Mode::Junior))
            .collect();
        let json = serde_json::to_string(&records).unwrap();

        let history: GameHistory = serde_json::from_str(&json).unwrap();
        assert_eq!(history.len(), MAX_GAME_HISTORY);
        assert_eq!(history.as_slice()[0].id, "g0");
    }

    #[test]
    fn test_merged_is_bounded() {
        let imported = GameHistory::from_records(
            (0..80).map(|i| record(&format!("i{i}"), Mode::Primary)).collect(),
        );
        let existing = GameHistory::from_records(
            (0..80).map(|i| record(&format!("e{i}"), Mode::Primary)).collect(),
        );

        let merged = GameHistory::merged(&imported, &existing);
        assert_eq!(merged.len(), MAX_GAME_HISTORY);
        assert_eq!(merged.as_slice()[79].id, "i79");
        assert_eq!(merged.as_slice()[80].id, "e0");
    }
}
