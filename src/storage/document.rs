//! 文档持久化适配器
//!
//! 对调用方永不返回错误：
//! - 读取失败（槽位缺失、内容无法解析）返回 `None`，视为"无历史数据"
//! - 写入失败记录日志后吞掉，内存中的状态在本次会话内仍然有效

use serde_json::Value;

use crate::storage::KeyValueStore;

pub struct DocumentStorage {
    store: Box<dyn KeyValueStore>,
    key: String,
}

impl DocumentStorage {
    pub fn new(store: impl KeyValueStore + 'static, key: impl Into<String>) -> Self {
        Self {
            store: Box::new(store),
            key: key.into(),
        }
    }

    /// 槽位名
    pub fn key(&self) -> &str {
        &self.key
    }

    /// 读取原始文档
    pub fn load(&self) -> Option<Value> {
        let raw = match self.store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "读取存储槽位失败，按无数据处理");
                return None;
            }
        };

        match serde_json::from_str::<Value>(&raw) {
            Ok(value) if value.is_object() => Some(value),
            Ok(_) => {
                tracing::warn!(key = %self.key, "存储内容不是 JSON 对象，按无数据处理");
                None
            }
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "存储内容无法解析，按无数据处理");
                None
            }
        }
    }

    /// 写入文档，返回是否成功
    pub fn save(&self, document: &Value) -> bool {
        let raw = match serde_json::to_string(document) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!(key = %self.key, error = %e, "文档序列化失败");
                return false;
            }
        };

        match self.store.set(&self.key, &raw) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(key = %self.key, error = %e, "写入存储失败，保留内存状态");
                false
            }
        }
    }

    /// 删除槽位
    pub fn clear(&self) -> bool {
        match self.store.remove(&self.key) {
            Ok(removed) => removed,
            Err(e) => {
                tracing::error!(key = %self.key, error = %e, "删除存储槽位失败");
                false
            }
        }
    }
}
