// ==========================================
// 班组管理系统 - 综合评分 / 重点人员 / 九宫格
// ==========================================

use crate::config::algorithm::{KeyPersonnelConfig, ScoreWeights, YAxisWeights};
use crate::engine::round_to;
use serde::Serialize;

/// 五维得分
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct DimensionScores {
    pub performance: f64,
    pub safety: f64,
    pub training: f64,
    pub stability: f64,
    pub learning: f64,
}

/// 综合分 = Σ 权重 × 维度分
pub fn comprehensive_score(scores: &DimensionScores, weights: &ScoreWeights) -> f64 {
    round_to(
        scores.performance * weights.performance
            + scores.safety * weights.safety
            + scores.training * weights.training
            + scores.stability * weights.stability
            + scores.learning * weights.learning,
        1,
    )
}

#[derive(Debug, Clone, Serialize)]
pub struct KeyPersonnelVerdict {
    pub is_key_personnel: bool,
    pub reasons: Vec<String>,
}

/// 重点人员判定: 综合分低于阈值 或 月均违规频次达到阈值
pub fn key_personnel(
    comprehensive: f64,
    avg_freq: u32,
    config: &KeyPersonnelConfig,
) -> KeyPersonnelVerdict {
    let mut reasons = Vec::new();
    if comprehensive < config.comprehensive_threshold {
        reasons.push(format!(
            "综合评分{:.1}低于阈值{}",
            comprehensive, config.comprehensive_threshold
        ));
    }
    if avg_freq as f64 >= config.monthly_violation_threshold {
        reasons.push(format!(
            "月均违规{}次，达到阈值{}",
            avg_freq, config.monthly_violation_threshold
        ));
    }
    KeyPersonnelVerdict {
        is_key_personnel: !reasons.is_empty(),
        reasons,
    }
}

/// 九宫格落点
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GridPlacement {
    pub x_score: f64,
    pub y_score: f64,
    pub grid_row: u8,
    pub grid_col: u8,
}

fn axis_level(score: f64) -> u8 {
    if score >= 90.0 {
        3
    } else if score >= 75.0 {
        2
    } else {
        1
    }
}

/// 九宫格定位
///
/// X = 绩效/安全/培训按综合权重归一化加权；Y = 稳定度/学习能力按九宫格权重归一化加权。
/// 行号自上而下为 Y 由高到低，列号自左而右为 X 由低到高
pub fn nine_grid_placement(
    scores: &DimensionScores,
    weights: &ScoreWeights,
    y_weights: &YAxisWeights,
) -> GridPlacement {
    let mut x_total = weights.performance + weights.safety + weights.training;
    if x_total <= 0.0 {
        x_total = 1.0;
    }
    let x_raw = scores.performance * weights.performance
        + scores.safety * weights.safety
        + scores.training * weights.training;
    let x_score = round_to(x_raw / x_total, 1);

    let mut y_total = y_weights.stability + y_weights.learning;
    if y_total <= 0.0 {
        y_total = 1.0;
    }
    let y_raw = scores.stability * y_weights.stability + scores.learning * y_weights.learning;
    let y_score = round_to(y_raw / y_total, 1);

    GridPlacement {
        x_score,
        y_score,
        grid_row: 4 - axis_level(y_score),
        grid_col: axis_level(x_score),
    }
}
