//! # vocab-knowledge - 客户端词汇掌握度追踪引擎
//!
//! 本 crate 负责学习者掌握度数据的记录、持久化与演进:
//!
//! - **评分** - 指数加权移动平均，每次作答向目标分靠近 30%
//! - **掌握度存储** - 单词键 × 练习方向 × 受众模式 三维记录，变更即持久化
//! - **游戏历史** - 最近 100 局的有界日志
//! - **导入导出** - 备份恢复与跨设备合并
//! - **Schema 迁移** - V1 → V5 逐级升级，含按词汇目录重新映射单词键
//!
//! ## 模块结构
//!
//! - [`knowledge`] - 掌握度存储、评分、分类汇总、迁移链
//! - [`lesson`] - 课程进度追踪
//! - [`catalog`] - 词汇目录查询接口
//! - [`storage`] - 键值存储后端 (SQLite / 内存) 与文档适配器
//! - [`config`] - 运行配置
//! - [`logging`] - tracing 初始化
//!
//! ## 使用示例
//!
//! ```rust
//! use std::sync::Arc;
//! use vocab_knowledge::{CatalogEntry, Direction, InMemoryCatalog, KnowledgeStore, Mode, Quality};
//!
//! let catalog = InMemoryCatalog::new(vec![CatalogEntry::new("gato", "gato", &["animals"])]);
//! let mut store = KnowledgeStore::in_memory(Arc::new(catalog));
//!
//! let score = store.record_answer("gato", Direction::Forward, Quality::FirstTry, Mode::Primary);
//! assert_eq!(score, 30.0);
//! ```

// ============================================================================
// 模块声明
// ============================================================================

pub mod catalog;
pub mod config;
pub mod knowledge;
pub mod lesson;
pub mod logging;
pub mod storage;

// ============================================================================
// 重新导出
// ============================================================================

pub use catalog::{CatalogEntry, InMemoryCatalog, VocabularyCatalog};
pub use config::KnowledgeConfig;
pub use knowledge::{
    CategoryKnowledge, Direction, GameRecord, GameSession, ImportSummary, KnowledgeData,
    KnowledgeError, KnowledgeResult, KnowledgeStatistics, KnowledgeStore, Mode, Quality,
    SubscriptionId, WeakWord, WordKnowledge, WordOutcome,
};
pub use lesson::{LessonProgress, LessonProgressStore};
pub use logging::init_tracing;
pub use storage::{
    DocumentStorage, KeyValueStore, MemoryKeyValueStore, SqliteKeyValueStore, StorageError,
    StorageResult,
};
