//! 运行配置
//!
//! 从环境变量读取存储位置与日志设置，缺省值适用于桌面端。

use std::path::PathBuf;

/// 默认存储槽位：掌握度文档
pub const DEFAULT_STORAGE_KEY: &str = "vocab-knowledge";

/// 默认存储槽位：课程进度文档
pub const DEFAULT_LESSON_STORAGE_KEY: &str = "vocab-lesson-progress";

#[derive(Debug, Clone)]
pub struct KnowledgeConfig {
    /// SQLite 键值库文件路径
    pub db_path: PathBuf,
    /// 掌握度文档所在槽位
    pub storage_key: String,
    /// 课程进度文档所在槽位
    pub lesson_storage_key: String,
    pub log_level: String,
    /// 是否额外写入滚动日志文件
    pub file_logs: bool,
    pub log_dir: PathBuf,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        let base = dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_default()
            .join("danci");

        Self {
            db_path: base.join("knowledge.db"),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            lesson_storage_key: DEFAULT_LESSON_STORAGE_KEY.to_string(),
            log_level: "info".to_string(),
            file_logs: false,
            log_dir: base.join("logs"),
        }
    }
}

impl KnowledgeConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let db_path = std::env::var("KNOWLEDGE_DB_PATH")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.db_path);

        let storage_key = std::env::var("KNOWLEDGE_STORAGE_KEY")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or(defaults.storage_key);

        let log_level = std::env::var("RUST_LOG").unwrap_or(defaults.log_level);

        let file_logs = std::env::var("ENABLE_FILE_LOGS")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let log_dir = std::env::var("LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.log_dir);

        Self {
            db_path,
            storage_key,
            lesson_storage_key: defaults.lesson_storage_key,
            log_level,
            file_logs,
            log_dir,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = KnowledgeConfig::default();
        assert_eq!(config.storage_key, DEFAULT_STORAGE_KEY);
        assert_eq!(config.lesson_storage_key, DEFAULT_LESSON_STORAGE_KEY);
        assert!(config.db_path.ends_with("knowledge.db"));
        assert!(!config.file_logs);
    }
}
