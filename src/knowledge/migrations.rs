//! 文档 schema 迁移模块
//!
//! 持久化文档按整数版本演进，读入时逐级升级到 [`CURRENT_SCHEMA_VERSION`]。
//!
//! ## 版本历史
//! - V1: `words[拼写][方向] = WordKnowledge`，无受众模式维度
//! - V2: 引入受众模式，`words[键][方向][模式]`；元数据增加分模式会话计数
//! - V3: 仅版本号变化
//! - V4: 仅版本号变化（WordKnowledge 增加可选的 storyEncounters）
//! - V5: 以目录中的规范 ID 代替拼写作为单词键
//!
//! 每一步都是 `Value(version = N) -> Value(version = N + 1)` 的纯变换，
//! 由 [`migrate`] 循环分派，直到版本号追平。

use serde_json::{json, Map, Value};

use crate::catalog::VocabularyCatalog;
use crate::knowledge::models::CURRENT_SCHEMA_VERSION;
use crate::knowledge::{KnowledgeError, KnowledgeResult};

/// 单步迁移函数
pub type MigrationFn =
    fn(Value, &dyn VocabularyCatalog, &mut Vec<DroppedWord>) -> KnowledgeResult<Value>;

/// 迁移定义
#[derive(Clone)]
pub struct Migration {
    /// 起始版本，执行后文档为 `from_version + 1`
    pub from_version: u32,
    pub name: &'static str,
    pub apply: MigrationFn,
}

impl std::fmt::Debug for Migration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Migration")
            .field("from_version", &self.from_version)
            .field("name", &self.name)
            .finish()
    }
}

/// 单词被丢弃的原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// 同一拼写对应多个义项，无法判断历史数据属于哪一个
    Ambiguous { candidates: Vec<String> },
    /// 目录中已不存在该拼写
    Removed,
    /// 解析出的键已被另一拼写占用
    DuplicateKey { key: String },
}

/// 迁移中被丢弃的单词
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedWord {
    pub spelling: String,
    pub reason: DropReason,
}

/// 迁移结果
#[derive(Debug, Clone)]
pub struct MigrationOutcome {
    pub document: Value,
    pub from_version: u32,
    pub to_version: u32,
    pub dropped: Vec<DroppedWord>,
}

impl MigrationOutcome {
    /// 是否实际执行了迁移
    pub fn migrated(&self) -> bool {
        self.from_version != self.to_version
    }
}

/// 获取所有迁移定义（按起始版本排序）
pub fn get_migrations() -> Vec<Migration> {
    vec![
        Migration {
            from_version: 1,
            name: "引入受众模式维度",
            apply: add_mode_dimension,
        },
        Migration {
            from_version: 2,
            name: "元数据说明更新",
            apply: version_bump,
        },
        Migration {
            from_version: 3,
            name: "故事遭遇记录",
            apply: version_bump,
        },
        Migration {
            from_version: 4,
            name: "按规范 ID 重建单词键",
            apply: rekey_by_catalog,
        },
    ]
}

/// 读取文档版本
///
/// 缺少 `schemaVersion` 但带有 `words` 的文档视为 V1。
pub fn detect_version(document: &Value) -> KnowledgeResult<u32> {
    let obj = document
        .as_object()
        .ok_or_else(|| KnowledgeError::InvalidDocument("文档不是 JSON 对象".to_string()))?;

    match obj.get("schemaVersion") {
        Some(version) => version
            .as_u64()
            .filter(|&v| v >= 1)
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| {
                KnowledgeError::InvalidDocument(format!("schemaVersion 无效: {version}"))
            }),
        None if obj.get("words").is_some_and(Value::is_object) => Ok(1),
        None => Err(KnowledgeError::InvalidDocument(
            "缺少 schemaVersion".to_string(),
        )),
    }
}

/// 运行迁移链
///
/// 已是当前版本的文档原样返回；版本高于当前版本时拒绝（无法降级）。
pub fn migrate(document: Value, catalog: &dyn VocabularyCatalog) -> KnowledgeResult<MigrationOutcome> {
    let from_version = detect_version(&document)?;

    if from_version > CURRENT_SCHEMA_VERSION {
        return Err(KnowledgeError::UnsupportedVersion {
            found: from_version,
            current: CURRENT_SCHEMA_VERSION,
        });
    }

    let migrations = get_migrations();
    let mut document = document;
    let mut version = from_version;
    let mut dropped = Vec::new();

    while version < CURRENT_SCHEMA_VERSION {
        let migration = migrations
            .iter()
            .find(|m| m.from_version == version)
            .ok_or_else(|| KnowledgeError::Migration(format!("缺少 v{version} 的迁移定义")))?;

        tracing::info!(
            from = version,
            to = version + 1,
            migration = migration.name,
            "运行文档迁移"
        );

        document = (migration.apply)(document, catalog, &mut dropped)?;
        version += 1;
        set_version(&mut document, version)?;
    }

    if version != from_version {
        tracing::info!(
            from = from_version,
            to = version,
            dropped = dropped.len(),
            "文档迁移完成"
        );
    }

    Ok(MigrationOutcome {
        document,
        from_version,
        to_version: version,
        dropped,
    })
}

// ============================================================
// 单步迁移
// ============================================================

fn version_bump(
    document: Value,
    _catalog: &dyn VocabularyCatalog,
    _dropped: &mut Vec<DroppedWord>,
) -> KnowledgeResult<Value> {
    Ok(document)
}

/// V1 -> V2：每条记录挂到 primary 模式下，junior 留空
fn add_mode_dimension(
    mut document: Value,
    _catalog: &dyn VocabularyCatalog,
    _dropped: &mut Vec<DroppedWord>,
) -> KnowledgeResult<Value> {
    let root = root_object(&mut document)?;

    let words = take_words(root)?;
    let mut migrated = Map::new();
    for (key, entry) in words {
        let Value::Object(directions) = entry else {
            tracing::warn!(word = %key, "V1 单词记录格式无效，跳过");
            continue;
        };

        let mut nested = Map::new();
        for direction in ["forward", "reverse"] {
            if let Some(record) = directions.get(direction).filter(|r| r.is_object()) {
                nested.insert(
                    direction.to_string(),
                    json!({ "primary": record, "junior": null }),
                );
            }
        }

        if !nested.is_empty() {
            migrated.insert(key, Value::Object(nested));
        }
    }
    root.insert("words".to_string(), Value::Object(migrated));

    let meta = root
        .entry("meta")
        .or_insert_with(|| Value::Object(Map::new()));
    if let Value::Object(meta) = meta {
        let total = meta
            .get("totalSessions")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        meta.insert("primarySessions".to_string(), json!(total));
        meta.insert("juniorSessions".to_string(), json!(0));
    }

    if let Some(Value::Array(history)) = root.get_mut("gameHistory") {
        for record in history.iter_mut().filter_map(Value::as_object_mut) {
            record
                .entry("mode")
                .or_insert_with(|| Value::String("primary".to_string()));
        }
    }

    Ok(document)
}

/// V4 -> V5：拼写 -> 规范 ID
///
/// 只有目录中恰好一个有效条目的拼写才会迁移；多义词与已下架的词连同其历史记录一并丢弃。
fn rekey_by_catalog(
    mut document: Value,
    catalog: &dyn VocabularyCatalog,
    dropped: &mut Vec<DroppedWord>,
) -> KnowledgeResult<Value> {
    let root = root_object(&mut document)?;

    let words = take_words(root)?;
    let mut rekeyed = Map::new();
    for (spelling, record) in words {
        let mut candidates = catalog.resolve_spelling(&spelling);

        let reason = match candidates.len() {
            1 => {
                let key = candidates.remove(0);
                if rekeyed.contains_key(&key) {
                    DropReason::DuplicateKey { key }
                } else {
                    rekeyed.insert(key, record);
                    continue;
                }
            }
            0 => DropReason::Removed,
            _ => DropReason::Ambiguous { candidates },
        };

        match &reason {
            DropReason::Ambiguous { candidates } => tracing::warn!(
                spelling = %spelling,
                candidates = ?candidates,
                "多义词无法确定义项，丢弃历史记录: {spelling}"
            ),
            DropReason::Removed => tracing::warn!(
                spelling = %spelling,
                "目录中已不存在该词，丢弃历史记录: {spelling}"
            ),
            DropReason::DuplicateKey { key } => tracing::warn!(
                spelling = %spelling,
                key = %key,
                "单词键已被占用，丢弃历史记录: {spelling}"
            ),
        }

        dropped.push(DroppedWord { spelling, reason });
    }
    root.insert("words".to_string(), Value::Object(rekeyed));

    Ok(document)
}

// ============================================================
// 辅助函数
// ============================================================

fn root_object(document: &mut Value) -> KnowledgeResult<&mut Map<String, Value>> {
    document
        .as_object_mut()
        .ok_or_else(|| KnowledgeError::InvalidDocument("文档不是 JSON 对象".to_string()))
}

fn take_words(root: &mut Map<String, Value>) -> KnowledgeResult<Map<String, Value>> {
    match root.remove("words") {
        Some(Value::Object(words)) => Ok(words),
        None | Some(Value::Null) => Ok(Map::new()),
        Some(_) => Err(KnowledgeError::InvalidDocument(
            "words 字段不是对象".to_string(),
        )),
    }
}

fn set_version(document: &mut Value, version: u32) -> KnowledgeResult<()> {
    root_object(document)?.insert("schemaVersion".to_string(), json!(version));
    Ok(())
}
