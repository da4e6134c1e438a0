//! 分类进度汇总与全局统计
//!
//! 分类平均分的分母始终是分类的全部单词数：没练过的词按 0 分计入，
//! 因此显示的平均分会被未接触的词稀释。需要"只看练过的词"时用 `practiced_count` 自行换算。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::knowledge::models::{Direction, Mode, WordKnowledge, WordKnowledgeBidirectional};
use crate::knowledge::scoring::round2;

/// 强项阈值（含）
pub const STRONG_SCORE_THRESHOLD: f64 = 80.0;

/// 弱项阈值（不含）
pub const WEAK_SCORE_THRESHOLD: f64 = 40.0;

/// 分类掌握度汇总（派生数据，不持久化）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryKnowledge {
    pub category_key: String,
    pub forward_score: f64,
    pub reverse_score: f64,
    /// 正反两个方向平均分的简单平均
    pub combined_score: f64,
    pub practiced_count: usize,
    pub total_count: usize,
    pub last_practiced_at: Option<DateTime<Utc>>,
}

/// 全局统计
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeStatistics {
    pub total_words_learned: usize,
    pub total_sessions: u32,
    pub average_score: f64,
    pub strong_word_count: usize,
    pub weak_word_count: usize,
}

/// 需要复习的弱项单词
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeakWord {
    pub word_key: String,
    pub score: f64,
}

/// 计算分类汇总
pub fn summarize_category<S: AsRef<str>>(
    words: &BTreeMap<String, WordKnowledgeBidirectional>,
    category_key: &str,
    category_words: &[S],
    mode: Mode,
) -> CategoryKnowledge {
    let total_count = category_words.len();
    let mut forward_sum = 0.0;
    let mut reverse_sum = 0.0;
    let mut practiced_count = 0;
    let mut last_practiced_at: Option<DateTime<Utc>> = None;

    for key in category_words {
        let Some(word) = words.get(key.as_ref()) else {
            continue;
        };

        forward_sum += score_of(word.get(Direction::Forward, mode));
        reverse_sum += score_of(word.get(Direction::Reverse, mode));

        if word.is_practiced_in(mode) {
            practiced_count += 1;
        }

        for direction in Direction::ALL {
            if let Some(at) = word.get(direction, mode).and_then(|r| r.last_practiced_at) {
                last_practiced_at = Some(last_practiced_at.map_or(at, |prev| prev.max(at)));
            }
        }
    }

    let (forward_score, reverse_score) = if total_count == 0 {
        (0.0, 0.0)
    } else {
        (
            round2(forward_sum / total_count as f64),
            round2(reverse_sum / total_count as f64),
        )
    };

    CategoryKnowledge {
        category_key: category_key.to_string(),
        forward_score,
        reverse_score,
        combined_score: round2((forward_score + reverse_score) / 2.0),
        practiced_count,
        total_count,
        last_practiced_at,
    }
}

/// 计算全局统计（只看 forward 方向）
///
/// `mode` 为 `None` 时在所有模式上累加。
pub fn compute_statistics(
    words: &BTreeMap<String, WordKnowledgeBidirectional>,
    total_sessions: u32,
    mode: Option<Mode>,
) -> KnowledgeStatistics {
    let modes: &[Mode] = match mode {
        Some(ref m) => std::slice::from_ref(m),
        None => &Mode::ALL,
    };

    let scores: Vec<f64> = words
        .values()
        .flat_map(|word| {
            modes
                .iter()
                .filter_map(move |&m| word.get(Direction::Forward, m))
        })
        .filter(|record| record.is_practiced())
        .map(|record| record.score)
        .collect();

    let average_score = if scores.is_empty() {
        0.0
    } else {
        round2(scores.iter().sum::<f64>() / scores.len() as f64)
    };

    KnowledgeStatistics {
        total_words_learned: scores.len(),
        total_sessions,
        average_score,
        strong_word_count: scores.iter().filter(|&&s| s >= STRONG_SCORE_THRESHOLD).count(),
        weak_word_count: scores.iter().filter(|&&s| s < WEAK_SCORE_THRESHOLD).count(),
    }
}

/// 弱项单词，分数从低到高
pub fn weak_words(
    words: &BTreeMap<String, WordKnowledgeBidirectional>,
    mode: Mode,
    limit: usize,
) -> Vec<WeakWord> {
    let mut weak: Vec<WeakWord> = words
        .iter()
        .filter_map(|(key, word)| {
            word.get(Direction::Forward, mode)
                .filter(|r| r.is_practiced() && r.score < WEAK_SCORE_THRESHOLD)
                .map(|r| WeakWord {
                    word_key: key.clone(),
                    score: r.score,
                })
        })
        .collect();

    weak.sort_by(|a, b| a.score.total_cmp(&b.score).then_with(|| a.word_key.cmp(&b.word_key)));
    weak.truncate(limit);
    weak
}

fn score_of(record: Option<&WordKnowledge>) -> f64 {
    record.map_or(0.0, |r| r.score)
}
