//! 掌握度评分
//!
//! 指数加权移动平均：`next = old * 0.7 + target * 0.3`，保留两位小数。
//! 两个操作数都在 [0, 100] 内，结果天然有界；仍做一次截断以兜住脏数据。

use crate::knowledge::models::Quality;

/// 旧分数的权重
const RETAIN_WEIGHT: f64 = 0.7;

/// 本次作答目标分的权重
const TARGET_WEIGHT: f64 = 0.3;

pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 100.0;

impl Quality {
    /// 作答质量对应的目标分
    pub fn target_score(self) -> f64 {
        match self {
            Quality::FirstTry => 100.0,
            Quality::SecondTry => 70.0,
            Quality::ThirdTry => 40.0,
            Quality::Failed => 0.0,
        }
    }
}

/// 根据旧分数与本次作答质量计算新分数
pub fn next_score(old: f64, quality: Quality) -> f64 {
    let old = clamp_score(old);
    let next = old * RETAIN_WEIGHT + quality.target_score() * TARGET_WEIGHT;
    clamp_score(round2(next))
}

/// 截断到 [0, 100]，非有限值记为 0
pub fn clamp_score(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(MIN_SCORE, MAX_SCORE)
    } else {
        MIN_SCORE
    }
}

/// 四舍五入到两位小数
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
