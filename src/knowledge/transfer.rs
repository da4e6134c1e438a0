//! 导入 / 导出 / 合并
//!
//! 导出文档与持久化文档同构，可直接用于备份恢复与"分享进度"。
//! 导入时先校验顶层结构与版本，旧版本走迁移链，然后与现有数据合并（而非替换）。

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

use crate::catalog::VocabularyCatalog;
use crate::knowledge::history::GameHistory;
use crate::knowledge::migrations::{self, DroppedWord};
use crate::knowledge::models::{
    Direction, GameRecord, KnowledgeData, KnowledgeMeta, Mode, WordKnowledgeBidirectional,
    CURRENT_SCHEMA_VERSION,
};
use crate::knowledge::{KnowledgeError, KnowledgeResult};

/// 导入结果摘要
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    /// 文档原始版本
    pub source_version: u32,
    /// 新增的单词数
    pub words_added: usize,
    /// 被导入数据覆盖的已有单词数
    pub words_updated: usize,
    /// 新增的历史记录数
    pub games_added: usize,
    /// 迁移中被丢弃的拼写
    #[serde(skip)]
    pub dropped: Vec<DroppedWord>,
}

/// 按模式过滤导出文档
///
/// 没有对应分桶的单词整体省略；历史只保留该模式的对局，会话计数只保留该模式。
pub fn filter_by_mode(data: &KnowledgeData, mode: Mode) -> KnowledgeData {
    let words = data
        .words
        .iter()
        .filter_map(|(key, word)| word.only_mode(mode).map(|w| (key.clone(), w)))
        .collect();

    let game_history = GameHistory::from_records(
        data.game_history
            .iter()
            .filter(|r| r.mode == mode)
            .cloned()
            .collect(),
    );

    let sessions = data.meta.sessions_for(mode);
    let meta = KnowledgeMeta {
        total_sessions: sessions,
        primary_sessions: if mode == Mode::Primary { sessions } else { 0 },
        junior_sessions: if mode == Mode::Junior { sessions } else { 0 },
        ..data.meta.clone()
    };

    KnowledgeData {
        schema_version: data.schema_version,
        words,
        game_history,
        meta,
    }
}

/// 校验顶层结构
///
/// 必须是包含 `schemaVersion`、`words`、`gameHistory`、`meta` 四个字段的对象。
pub fn validate_shape(document: &Value) -> KnowledgeResult<u32> {
    let obj = document
        .as_object()
        .ok_or_else(|| KnowledgeError::InvalidDocument("导入内容不是 JSON 对象".to_string()))?;

    let missing: Vec<&str> = ["schemaVersion", "words", "gameHistory", "meta"]
        .into_iter()
        .filter(|field| !obj.contains_key(*field))
        .collect();
    if !missing.is_empty() {
        return Err(KnowledgeError::InvalidDocument(format!(
            "缺少必需字段: {}",
            missing.join(", ")
        )));
    }

    if !obj["words"].is_object() {
        return Err(KnowledgeError::InvalidDocument("words 必须是对象".to_string()));
    }
    if !obj["gameHistory"].is_array() {
        return Err(KnowledgeError::InvalidDocument(
            "gameHistory 必须是数组".to_string(),
        ));
    }
    if !obj["meta"].is_object() {
        return Err(KnowledgeError::InvalidDocument("meta 必须是对象".to_string()));
    }

    let version = migrations::detect_version(document)?;
    if version > CURRENT_SCHEMA_VERSION {
        return Err(KnowledgeError::UnsupportedVersion {
            found: version,
            current: CURRENT_SCHEMA_VERSION,
        });
    }

    Ok(version)
}

/// 校验、迁移并解析导入文档，不触碰现有数据
pub fn prepare_import(
    document: Value,
    catalog: &dyn VocabularyCatalog,
) -> KnowledgeResult<(KnowledgeData, u32, Vec<DroppedWord>)> {
    let source_version = validate_shape(&document)?;
    let outcome = migrations::migrate(document, catalog)?;
    let data = decode_document(outcome.document)?;
    Ok((data, source_version, outcome.dropped))
}

/// 把已迁移到当前版本的文档解析为 [`KnowledgeData`]
///
/// 逐条解析单词与历史记录，个别记录损坏时只丢弃该条并记录警告，其余照常保留。
/// 分数截回 [0, 100]。只有顶层结构不可用时才返回错误。
pub fn decode_document(document: Value) -> KnowledgeResult<KnowledgeData> {
    let Value::Object(mut root) = document else {
        return Err(KnowledgeError::InvalidDocument("文档不是 JSON 对象".to_string()));
    };

    let mut words = BTreeMap::new();
    match root.remove("words") {
        Some(Value::Object(entries)) => {
            for (key, entry) in entries {
                let mut word = match serde_json::from_value::<WordKnowledgeBidirectional>(entry) {
                    Ok(word) => word,
                    Err(e) => {
                        tracing::warn!(word = %key, error = %e, "单词记录无法解析，丢弃: {key}");
                        continue;
                    }
                };

                let adjusted = word.clamp_scores();
                if adjusted > 0 {
                    tracing::warn!(word = %key, adjusted, "分数超出 [0, 100]，已截断");
                }
                if !word.is_empty() {
                    words.insert(key, word);
                }
            }
        }
        None | Some(Value::Null) => {}
        Some(_) => {
            return Err(KnowledgeError::InvalidDocument(
                "words 必须是对象".to_string(),
            ))
        }
    }

    let records = match root.remove("gameHistory") {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match serde_json::from_value::<GameRecord>(item) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!(error = %e, "游戏记录无法解析，丢弃");
                    None
                }
            })
            .collect(),
        None | Some(Value::Null) => Vec::new(),
        Some(_) => {
            tracing::warn!("gameHistory 不是数组，忽略");
            Vec::new()
        }
    };

    let meta = match root.remove("meta") {
        Some(value @ Value::Object(_)) => serde_json::from_value(value).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "元数据无法解析，使用默认值");
            KnowledgeMeta::new(Utc::now())
        }),
        _ => KnowledgeMeta::new(Utc::now()),
    };

    Ok(KnowledgeData {
        schema_version: CURRENT_SCHEMA_VERSION,
        words,
        game_history: GameHistory::from_records(records),
        meta,
    })
}

/// 合并导入数据
///
/// - 单词按 方向 × 模式 分桶取并集，冲突时导入方优先
/// - 历史：导入列表在前、已有列表在后，按 id 去重并截断
/// - `createdAt` 取较早者，会话计数相加
pub fn merge_into(target: &mut KnowledgeData, imported: KnowledgeData) -> ImportSummary {
    let mut summary = ImportSummary::default();

    for (key, incoming) in imported.words {
        if incoming.is_empty() {
            continue;
        }

        match target.words.get_mut(&key) {
            Some(existing) => {
                for direction in Direction::ALL {
                    for mode in Mode::ALL {
                        if let Some(record) = incoming.get(direction, mode) {
                            *existing.direction_mut(direction).slot_mut(mode) = Some(record.clone());
                        }
                    }
                }
                summary.words_updated += 1;
            }
            None => {
                target.words.insert(key, incoming);
                summary.words_added += 1;
            }
        }
    }

    let existing_ids: HashSet<&str> = target.game_history.iter().map(|r| r.id.as_str()).collect();
    let merged = GameHistory::merged(&imported.game_history, &target.game_history);
    summary.games_added = merged
        .iter()
        .filter(|r| !existing_ids.contains(r.id.as_str()))
        .count();
    target.game_history = merged;

    target.meta.created_at = target.meta.created_at.min(imported.meta.created_at);
    target.meta.total_sessions += imported.meta.total_sessions;
    target.meta.primary_sessions += imported.meta.primary_sessions;
    target.meta.junior_sessions += imported.meta.junior_sessions;

    summary
}
