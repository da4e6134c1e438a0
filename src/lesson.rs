//! 课程进度追踪
//!
//! 每节课按受众模式分别记录尝试次数、最佳与最近得分（百分比）以及完成时间，
//! 独立存放在自己的存储槽位中，与掌握度文档互不影响。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::KnowledgeConfig;
use crate::knowledge::scoring::round2;
use crate::knowledge::{KnowledgeResult, Mode};
use crate::storage::{DocumentStorage, SqliteKeyValueStore};

/// 课程进度文档版本
pub const LESSON_SCHEMA_VERSION: u32 = 1;

/// 达到该百分比即视为完成
pub const LESSON_PASS_PERCENT: f64 = 80.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonProgress {
    pub attempts: u32,
    pub best_score: f64,
    pub last_score: f64,
    /// 首次达到及格线的时间，之后不再变化
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_attempt_at: Option<DateTime<Utc>>,
}

impl LessonProgress {
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// 单节课在各模式下的进度
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LessonModes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<LessonProgress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub junior: Option<LessonProgress>,
}

impl LessonModes {
    pub fn get(&self, mode: Mode) -> Option<&LessonProgress> {
        match mode {
            Mode::Primary => self.primary.as_ref(),
            Mode::Junior => self.junior.as_ref(),
        }
    }

    fn entry(&mut self, mode: Mode) -> &mut LessonProgress {
        let slot = match mode {
            Mode::Primary => &mut self.primary,
            Mode::Junior => &mut self.junior,
        };
        slot.get_or_insert_with(LessonProgress::default)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonProgressData {
    pub schema_version: u32,
    #[serde(default)]
    pub lessons: BTreeMap<String, LessonModes>,
}

impl Default for LessonProgressData {
    fn default() -> Self {
        Self {
            schema_version: LESSON_SCHEMA_VERSION,
            lessons: BTreeMap::new(),
        }
    }
}

pub struct LessonProgressStore {
    data: LessonProgressData,
    storage: DocumentStorage,
}

impl LessonProgressStore {
    /// 加载课程进度
    ///
    /// 槽位为空或版本不符时以空白进度启动并立即写回；内容无法解析时同样从空白开始，
    /// 但不覆盖原内容，直到下一次记录成绩。
    pub fn open(storage: DocumentStorage) -> Self {
        let (data, needs_save) = match storage.load() {
            None => (LessonProgressData::default(), true),
            Some(raw) => match serde_json::from_value::<LessonProgressData>(raw) {
                Ok(data) if data.schema_version == LESSON_SCHEMA_VERSION => (data, false),
                Ok(data) => {
                    tracing::warn!(
                        found = data.schema_version,
                        current = LESSON_SCHEMA_VERSION,
                        "课程进度版本不受支持，重置"
                    );
                    (LessonProgressData::default(), true)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "课程进度文档无法解析，以空白进度启动");
                    (LessonProgressData::default(), false)
                }
            },
        };

        let store = Self { data, storage };
        if needs_save {
            store.persist();
        }
        store
    }

    pub fn from_config(config: &KnowledgeConfig) -> KnowledgeResult<Self> {
        let kv = SqliteKeyValueStore::open(&config.db_path)?;
        Ok(Self::open(DocumentStorage::new(
            kv,
            config.lesson_storage_key.clone(),
        )))
    }

    pub fn data(&self) -> &LessonProgressData {
        &self.data
    }

    /// 记录一次课程练习结果，返回更新后的进度
    pub fn record_lesson_result(
        &mut self,
        lesson_id: &str,
        correct: u32,
        total: u32,
        mode: Mode,
    ) -> LessonProgress {
        let percent = if total == 0 {
            0.0
        } else {
            round2(f64::from(correct.min(total)) * 100.0 / f64::from(total))
        };
        let now = Utc::now();

        let progress = self
            .data
            .lessons
            .entry(lesson_id.to_string())
            .or_default()
            .entry(mode);

        progress.attempts += 1;
        progress.last_score = percent;
        progress.best_score = progress.best_score.max(percent);
        progress.last_attempt_at = Some(now);
        if percent >= LESSON_PASS_PERCENT && progress.completed_at.is_none() {
            progress.completed_at = Some(now);
            tracing::info!(lesson_id, ?mode, percent, "课程完成");
        }

        let snapshot = progress.clone();
        self.persist();
        snapshot
    }

    pub fn get_lesson_progress(&self, lesson_id: &str, mode: Mode) -> Option<&LessonProgress> {
        self.data.lessons.get(lesson_id)?.get(mode)
    }

    /// 该模式下已完成的课程 ID
    pub fn completed_lessons(&self, mode: Mode) -> Vec<String> {
        self.data
            .lessons
            .iter()
            .filter(|(_, modes)| modes.get(mode).is_some_and(LessonProgress::is_completed))
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn reset(&mut self) {
        self.data = LessonProgressData::default();
        self.persist();
    }

    fn persist(&self) {
        match serde_json::to_value(&self.data) {
            Ok(document) => {
                self.storage.save(&document);
            }
            Err(e) => tracing::error!(error = %e, "课程进度序列化失败"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{KeyValueStore, MemoryKeyValueStore};

    fn store() -> (LessonProgressStore, MemoryKeyValueStore) {
        let kv = MemoryKeyValueStore::new();
        let store = LessonProgressStore::open(DocumentStorage::new(kv.clone(), "lessons"));
        (store, kv)
    }

    #[test]
    fn test_record_tracks_best_and_last() {
        let (mut store, _kv) = store();

        store.record_lesson_result("animals-1", 9, 10, Mode::Primary);
        let progress = store.record_lesson_result("animals-1", 5, 10, Mode::Primary);

        assert_eq!(progress.attempts, 2);
        assert_eq!(progress.best_score, 90.0);
        assert_eq!(progress.last_score, 50.0);
        assert!(progress.is_completed());
        assert!(store.get_lesson_progress("animals-1", Mode::Junior).is_none());
    }

    #[test]
    fn test_completion_threshold() {
        let (mut store, _kv) = store();

        store.record_lesson_result("a", 7, 10, Mode::Junior);
        store.record_lesson_result("b", 8, 10, Mode::Junior);
        store.record_lesson_result("c", 0, 0, Mode::Junior);

        assert_eq!(store.completed_lessons(Mode::Junior), vec!["b".to_string()]);
        assert!(store.completed_lessons(Mode::Primary).is_empty());
    }

    #[test]
    fn test_completed_at_is_sticky() {
        let (mut store, _kv) = store();

        let first = store.record_lesson_result("a", 10, 10, Mode::Primary);
        let second = store.record_lesson_result("a", 10, 10, Mode::Primary);
        assert_eq!(first.completed_at, second.completed_at);
    }

    #[test]
    fn test_persists_and_resets() {
        let (mut store, kv) = store();
        store.record_lesson_result("a", 4, 5, Mode::Primary);

        let reopened = LessonProgressStore::open(DocumentStorage::new(kv.clone(), "lessons"));
        assert_eq!(reopened.completed_lessons(Mode::Primary), vec!["a".to_string()]);

        store.reset();
        let reopened = LessonProgressStore::open(DocumentStorage::new(kv, "lessons"));
        assert!(reopened.data().lessons.is_empty());
    }

    #[test]
    fn test_unknown_version_starts_fresh_and_is_written_back() {
        let kv = MemoryKeyValueStore::with_entry("lessons", r#"{"schemaVersion": 9, "lessons": {"a": {}}}"#);
        let store = LessonProgressStore::open(DocumentStorage::new(kv.clone(), "lessons"));
        assert!(store.data().lessons.is_empty());

        let saved: serde_json::Value =
            serde_json::from_str(&kv.get("lessons").unwrap().unwrap()).unwrap();
        assert_eq!(saved["schemaVersion"], serde_json::json!(LESSON_SCHEMA_VERSION));
        assert!(saved["lessons"].as_object().unwrap().is_empty());
    }

    #[test]
    fn test_unparsable_document_is_left_in_place() {
        let raw = r#"{"schemaVersion": 1, "lessons": {"a": {"primary": {"attempts": "many"}}}}"#;
        let kv = MemoryKeyValueStore::with_entry("lessons", raw);
        let store = LessonProgressStore::open(DocumentStorage::new(kv.clone(), "lessons"));

        assert!(store.data().lessons.is_empty());
        assert_eq!(kv.get("lessons").unwrap().as_deref(), Some(raw));
    }

    #[test]
    fn test_first_open_writes_empty_document() {
        let (_store, kv) = store();
        let saved: serde_json::Value =
            serde_json::from_str(&kv.get("lessons").unwrap().unwrap()).unwrap();
        assert_eq!(saved["schemaVersion"], serde_json::json!(LESSON_SCHEMA_VERSION));
    }
}
