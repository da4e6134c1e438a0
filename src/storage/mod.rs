//! 本地键值存储模块
//!
//! 掌握度数据以单个 JSON 文档的形式保存在本地键值存储的一个槽位中：
//! - [`KeyValueStore`] 抽象底层存储设施（SQLite / 内存）
//! - [`DocumentStorage`] 在其之上提供"读不抛错、写失败只记日志"的持久化适配

// ============================================================
// 子模块声明
// ============================================================

pub mod document;
pub mod memory;
pub mod sqlite;

// ============================================================
// 重新导出主要类型
// ============================================================

pub use document::DocumentStorage;
pub use memory::MemoryKeyValueStore;
pub use sqlite::SqliteKeyValueStore;

use thiserror::Error;

// ============================================================
// 错误类型定义
// ============================================================

/// 存储模块错误类型
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("数据库错误: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("锁获取失败: {0}")]
    LockError(String),

    #[error("IO 错误: {0}")]
    Io(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

// ============================================================
// KeyValueStore - 键值存储抽象
// ============================================================

/// 本地键值存储设施
///
/// 值一律为字符串，序列化由上层负责。
pub trait KeyValueStore {
    /// 读取槽位，不存在时返回 `None`
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// 写入槽位（插入或覆盖）
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// 删除槽位，返回是否确实删除了记录
    fn remove(&self, key: &str) -> StorageResult<bool>;
}
