//! 词汇目录边界
//!
//! 引擎本身不持有词表，只在迁移与故事词汇登记时通过 [`VocabularyCatalog`] 查询。

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// 词汇目录查询接口
pub trait VocabularyCatalog {
    /// 拼写 -> 当前有效的规范 ID（0 个、1 个或多个义项）
    fn resolve_spelling(&self, spelling: &str) -> Vec<String>;

    /// 规范 ID 所属的分类
    fn categories_of(&self, word_key: &str) -> Vec<String>;

    /// 分类下的全部有效单词
    fn words_in_category(&self, category: &str) -> Vec<String>;
}

/// 目录条目
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    /// 规范 ID（无歧义时与拼写相同）
    pub id: String,
    pub spelling: String,
    #[serde(default)]
    pub categories: Vec<String>,
    /// 已下架的条目不参与解析
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl CatalogEntry {
    pub fn new(id: impl Into<String>, spelling: impl Into<String>, categories: &[&str]) -> Self {
        Self {
            id: id.into(),
            spelling: spelling.into(),
            categories: categories.iter().map(|c| c.to_string()).collect(),
            active: true,
        }
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}

/// 内存词汇目录
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    entries: BTreeMap<String, CatalogEntry>,
}

impl InMemoryCatalog {
    pub fn new(entries: impl IntoIterator<Item = CatalogEntry>) -> Self {
        let entries = entries
            .into_iter()
            .map(|entry| (entry.id.clone(), entry))
            .collect();
        Self { entries }
    }

    /// 从 JSON 数组加载（宿主打包的词表清单）
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let entries: Vec<CatalogEntry> = serde_json::from_str(json)?;
        Ok(Self::new(entries))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl VocabularyCatalog for InMemoryCatalog {
    fn resolve_spelling(&self, spelling: &str) -> Vec<String> {
        self.entries
            .values()
            .filter(|e| e.active && e.spelling == spelling)
            .map(|e| e.id.clone())
            .collect()
    }

    fn categories_of(&self, word_key: &str) -> Vec<String> {
        self.entries
            .get(word_key)
            .filter(|e| e.active)
            .map(|e| e.categories.clone())
            .unwrap_or_default()
    }

    fn words_in_category(&self, category: &str) -> Vec<String> {
        let ids: BTreeSet<&String> = self
            .entries
            .values()
            .filter(|e| e.active && e.categories.iter().any(|c| c == category))
            .map(|e| &e.id)
            .collect();
        ids.into_iter().cloned().collect()
    }
}
