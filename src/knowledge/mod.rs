//! 掌握度追踪引擎
//!
//! 维护 单词键 × 方向 × 受众模式 的掌握度记录、有界游戏历史与全局元数据：
//! - 每次变更都在内存中一次完成，随后持久化并同步通知订阅者
//! - 首次加载时把存储中的原始文档交给迁移链，升级后立即写回
//! - 导入走 校验 -> 迁移 -> 合并，校验失败时现有数据保持不变

// ============================================================
// 子模块声明
// ============================================================

pub mod category;
pub mod history;
pub mod migrations;
pub mod models;
pub mod scoring;
pub mod session;
pub mod transfer;

// ============================================================
// 重新导出主要类型
// ============================================================

pub use category::{CategoryKnowledge, KnowledgeStatistics, WeakWord};
pub use history::{GameHistory, MAX_GAME_HISTORY};
pub use migrations::{migrate, DropReason, DroppedWord, MigrationOutcome};
pub use models::*;
pub use scoring::next_score;
pub use session::GameSession;
pub use transfer::ImportSummary;

use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::catalog::VocabularyCatalog;
use crate::config::{KnowledgeConfig, DEFAULT_STORAGE_KEY};
use crate::storage::{DocumentStorage, MemoryKeyValueStore, SqliteKeyValueStore, StorageError};

// ============================================================
// 错误类型定义
// ============================================================

/// 引擎错误类型
#[derive(Error, Debug)]
pub enum KnowledgeError {
    #[error("文档格式无效: {0}")]
    InvalidDocument(String),

    #[error("不支持的 schema 版本: {found}（当前版本 {current}）")]
    UnsupportedVersion { found: u32, current: u32 },

    #[error("迁移错误: {0}")]
    Migration(String),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("存储错误: {0}")]
    Storage(#[from] StorageError),
}

pub type KnowledgeResult<T> = Result<T, KnowledgeError>;

// ============================================================
// 订阅
// ============================================================

/// 订阅句柄，用于取消订阅
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn Fn(&KnowledgeData)>;

// ============================================================
// KnowledgeStore - 掌握度存储
// ============================================================

/// 掌握度存储
///
/// 由应用组合根构造并持有，按引用传给各界面组件。单线程使用：
/// 所有变更方法都在一次调用内完成状态更新、持久化与通知。
pub struct KnowledgeStore {
    data: KnowledgeData,
    storage: DocumentStorage,
    catalog: Arc<dyn VocabularyCatalog>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_listener_id: u64,
}

impl KnowledgeStore {
    /// 从持久化适配器加载（必要时迁移）
    ///
    /// 读取失败、内容损坏或版本高于当前版本时都从空文档开始，不向调用方报错。
    pub fn open(storage: DocumentStorage, catalog: Arc<dyn VocabularyCatalog>) -> Self {
        let (data, needs_save) = load_document(&storage, catalog.as_ref());

        let store = Self {
            data,
            storage,
            catalog,
            listeners: Vec::new(),
            next_listener_id: 0,
        };

        if needs_save {
            store.persist();
        }

        store
    }

    /// 按配置打开 SQLite 存储
    pub fn from_config(
        config: &KnowledgeConfig,
        catalog: Arc<dyn VocabularyCatalog>,
    ) -> KnowledgeResult<Self> {
        let kv = SqliteKeyValueStore::open(&config.db_path)?;
        let storage = DocumentStorage::new(kv, config.storage_key.clone());
        Ok(Self::open(storage, catalog))
    }

    /// 内存存储（用于测试）
    pub fn in_memory(catalog: Arc<dyn VocabularyCatalog>) -> Self {
        let storage = DocumentStorage::new(MemoryKeyValueStore::new(), DEFAULT_STORAGE_KEY);
        Self::open(storage, catalog)
    }

    /// 当前文档（只读）
    pub fn data(&self) -> &KnowledgeData {
        &self.data
    }

    // ========== 订阅 ==========

    /// 订阅变更通知，每次变更完成后同步调用
    pub fn subscribe(&mut self, listener: impl Fn(&KnowledgeData) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_listener_id);
        self.next_listener_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// 取消订阅，返回该句柄是否存在
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    // ========== 变更操作 ==========

    /// 记录一次作答，返回新分数
    pub fn record_answer(
        &mut self,
        word_key: &str,
        direction: Direction,
        quality: Quality,
        mode: Mode,
    ) -> f64 {
        let score = self.apply_answer(word_key, direction, quality, mode);
        self.commit();
        score
    }

    /// 记录一局游戏
    ///
    /// 逐词更新掌握度，写入历史并累加会话计数，全部完成后只持久化和通知一次。
    pub fn record_game(
        &mut self,
        category: &str,
        direction: Direction,
        per_word_outcomes: Vec<WordOutcome>,
        mode: Mode,
    ) -> GameRecord {
        let mut tally = OutcomeTally::default();
        for outcome in &per_word_outcomes {
            self.apply_answer(&outcome.word_key, direction, outcome.quality, mode);
            tally.add(outcome.quality);
        }

        let record = GameRecord {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            category: category.to_string(),
            direction,
            mode,
            question_count: per_word_outcomes.len() as u32,
            outcome_tally: tally,
            per_word_outcomes,
        };
        self.data.game_history.push(record.clone());

        let meta = &mut self.data.meta;
        meta.total_sessions += 1;
        match mode {
            Mode::Primary => meta.primary_sessions += 1,
            Mode::Junior => meta.junior_sessions += 1,
        }

        tracing::debug!(
            category = %record.category,
            questions = record.question_count,
            ?mode,
            "记录游戏"
        );

        self.commit();
        record
    }

    /// 记录故事阅读中遇到的单词（固定记在 primary / forward 下）
    pub fn record_story_encounter(&mut self, word_key: &str, story_id: &str) {
        self.apply_story_encounter(word_key, story_id);
        self.commit();
    }

    /// 按拼写登记一篇故事的词汇
    ///
    /// 拼写经目录解析为规范 ID；多义或已下架的拼写跳过。返回实际登记的单词数。
    pub fn record_story_vocabulary<S: AsRef<str>>(&mut self, story_id: &str, spellings: &[S]) -> usize {
        let mut recorded = 0;
        for spelling in spellings {
            let spelling = spelling.as_ref();
            let ids = self.catalog.resolve_spelling(spelling);
            match ids.as_slice() {
                [key] => {
                    self.apply_story_encounter(key, story_id);
                    recorded += 1;
                }
                [] => tracing::debug!(%spelling, story_id, "故事词汇不在目录中，跳过"),
                _ => tracing::debug!(%spelling, story_id, "故事词汇存在多个义项，跳过"),
            }
        }

        if recorded > 0 {
            self.commit();
        }
        recorded
    }

    /// 重置为空文档
    pub fn reset(&mut self) {
        tracing::info!("重置掌握度数据");
        self.data = KnowledgeData::empty(Utc::now());
        self.commit();
    }

    // ========== 查询 ==========

    /// 单词分数；没有记录时为 0
    pub fn get_word_score(&self, word_key: &str, direction: Direction, mode: Mode) -> f64 {
        self.get_word_knowledge(word_key, direction, mode)
            .map_or(0.0, |r| r.score)
    }

    pub fn get_word_knowledge(
        &self,
        word_key: &str,
        direction: Direction,
        mode: Mode,
    ) -> Option<&WordKnowledge> {
        self.data.words.get(word_key)?.get(direction, mode)
    }

    /// 分类汇总，平均分按整个单词列表计算
    pub fn get_category_knowledge<S: AsRef<str>>(
        &self,
        category_key: &str,
        words: &[S],
        mode: Mode,
    ) -> CategoryKnowledge {
        category::summarize_category(&self.data.words, category_key, words, mode)
    }

    /// 以目录中的分类成员计算汇总
    pub fn get_category_knowledge_from_catalog(&self, category_key: &str, mode: Mode) -> CategoryKnowledge {
        let words = self.catalog.words_in_category(category_key);
        self.get_category_knowledge(category_key, words.as_slice(), mode)
    }

    /// 该模式下至少一个方向练习过的单词
    pub fn get_words_for_mode(&self, mode: Mode) -> Vec<String> {
        self.data
            .words
            .iter()
            .filter(|(_, word)| word.is_practiced_in(mode))
            .map(|(key, _)| key.clone())
            .collect()
    }

    pub fn get_statistics(&self, mode: Option<Mode>) -> KnowledgeStatistics {
        let sessions = match mode {
            Some(m) => self.data.meta.sessions_for(m),
            None => self.data.meta.total_sessions,
        };
        category::compute_statistics(&self.data.words, sessions, mode)
    }

    /// 最近的游戏记录（新到旧）
    pub fn get_recent_games(&self, limit: usize, mode: Option<Mode>) -> Vec<&GameRecord> {
        self.data.game_history.recent(limit, mode)
    }

    /// 需要复习的弱项单词
    pub fn get_weak_words(&self, mode: Mode, limit: usize) -> Vec<WeakWord> {
        category::weak_words(&self.data.words, mode, limit)
    }

    // ========== 导入导出 ==========

    /// 导出文档；指定模式时只保留该模式的分桶
    pub fn export_document(&self, mode: Option<Mode>) -> KnowledgeData {
        match mode {
            Some(m) => transfer::filter_by_mode(&self.data, m),
            None => self.data.clone(),
        }
    }

    /// 导出为 JSON 字符串
    pub fn export_data(&self, mode: Option<Mode>) -> KnowledgeResult<String> {
        Ok(serde_json::to_string_pretty(&self.export_document(mode))?)
    }

    /// 导入 JSON 字符串并合并
    pub fn import_data(&mut self, json: &str) -> KnowledgeResult<ImportSummary> {
        let document: Value = serde_json::from_str(json)
            .map_err(|e| KnowledgeError::InvalidDocument(format!("JSON 解析失败: {e}")))?;
        self.import_value(document)
    }

    /// 导入已解析的文档并合并
    pub fn import_value(&mut self, document: Value) -> KnowledgeResult<ImportSummary> {
        let (imported, source_version, dropped) =
            match transfer::prepare_import(document, self.catalog.as_ref()) {
                Ok(prepared) => prepared,
                Err(e) => {
                    tracing::warn!(error = %e, "导入被拒绝");
                    return Err(e);
                }
            };

        let mut summary = transfer::merge_into(&mut self.data, imported);
        summary.source_version = source_version;
        summary.dropped = dropped;

        tracing::info!(
            source_version,
            words_added = summary.words_added,
            words_updated = summary.words_updated,
            games_added = summary.games_added,
            "导入完成"
        );

        self.commit();
        Ok(summary)
    }

    // ========== 内部实现 ==========

    fn apply_answer(&mut self, word_key: &str, direction: Direction, quality: Quality, mode: Mode) -> f64 {
        let now = Utc::now();
        let record = self
            .data
            .words
            .entry(word_key.to_string())
            .or_default()
            .entry(direction, mode);

        record.bump_quality(quality);
        record.practice_count += 1;
        record.score = scoring::next_score(record.score, quality);
        record.last_practiced_at = Some(now);
        record.first_practiced_at.get_or_insert(now);
        record.score
    }

    fn apply_story_encounter(&mut self, word_key: &str, story_id: &str) {
        let encounters = self
            .data
            .words
            .entry(word_key.to_string())
            .or_default()
            .entry(Direction::Forward, Mode::Primary)
            .story_encounters
            .get_or_insert_with(StoryEncounters::default);

        if encounters.story_ids.insert(story_id.to_string()) {
            encounters.count += 1;
        }
    }

    /// 盖时间戳、持久化并通知订阅者
    fn commit(&mut self) {
        self.data.schema_version = CURRENT_SCHEMA_VERSION;
        self.data.meta.updated_at = Utc::now();
        self.persist();

        for (_, listener) in &self.listeners {
            listener(&self.data);
        }
    }

    fn persist(&self) {
        match serde_json::to_value(&self.data) {
            Ok(document) => {
                self.storage.save(&document);
            }
            Err(e) => tracing::error!(error = %e, "掌握度文档序列化失败"),
        }
    }
}

/// 读取并迁移存储中的文档，返回 (文档, 是否需要立即写回)
///
/// 存储中已有但无法使用的文档不会在加载时被覆盖；高于当前版本的文档除外，它被新文档取代。
fn load_document(storage: &DocumentStorage, catalog: &dyn VocabularyCatalog) -> (KnowledgeData, bool) {
    let Some(raw) = storage.load() else {
        tracing::info!(key = storage.key(), "没有历史数据，创建新文档");
        return (KnowledgeData::empty(Utc::now()), true);
    };

    let outcome = match migrate(raw, catalog) {
        Ok(outcome) => outcome,
        Err(KnowledgeError::UnsupportedVersion { found, current }) => {
            tracing::warn!(found, current, "存储的 schema 版本高于当前版本，无法降级，重置为新文档");
            return (KnowledgeData::empty(Utc::now()), true);
        }
        Err(e) => {
            tracing::warn!(error = %e, "存储的文档无效，以空文档启动，保留原内容");
            return (KnowledgeData::empty(Utc::now()), false);
        }
    };

    let migrated = outcome.migrated();
    match transfer::decode_document(outcome.document) {
        Ok(data) => (data, migrated),
        Err(e) => {
            tracing::warn!(error = %e, "存储的文档无法解析，以空文档启动，保留原内容");
            (KnowledgeData::empty(Utc::now()), false)
        }
    }
}
