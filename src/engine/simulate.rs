// ==========================================
// 班组管理系统 - 算法配置模拟计算
// ==========================================
// 用候选配置对样例数据试算，不落库
// ==========================================

use crate::config::algorithm::{AlgorithmConfig, ScoreWeights};
use crate::engine::performance::PerformanceEngine;
use crate::engine::round_to;
use crate::engine::safety::SafetyEngine;
use crate::engine::training::{TrainingEngine, TrainingSample};
use serde::{Deserialize, Serialize};

/// 模拟培训的统计周期天数
const SIMULATED_TRAINING_DAYS: i64 = 90;
/// 模拟绩效的原始分
const SIMULATED_RAW_SCORE: f64 = 95.0;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SimulationSample {
    #[serde(default)]
    pub performance: Option<PerformanceSample>,
    #[serde(default)]
    pub safety: Option<SafetySample>,
    #[serde(default)]
    pub training: Option<TrainingSampleSet>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PerformanceSample {
    #[serde(default)]
    pub grades: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SafetySample {
    #[serde(default)]
    pub violations: Vec<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrainingSampleSet {
    #[serde(default)]
    pub scores: Vec<f64>,
    #[serde(default)]
    pub is_qualified: Vec<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulatedPerformance {
    pub grade: String,
    pub score: f64,
    pub label: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulatedSafety {
    pub violation_score: f64,
    pub score: f64,
    pub label: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulatedTraining {
    pub index: usize,
    pub input_score: f64,
    pub is_qualified: bool,
    pub final_score: f64,
    pub label: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulatedComprehensive {
    pub score: f64,
    pub weights: ScoreWeights,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationResult {
    pub performance: Vec<SimulatedPerformance>,
    pub safety: Vec<SimulatedSafety>,
    pub training: Vec<SimulatedTraining>,
    pub comprehensive: Option<SimulatedComprehensive>,
    pub errors: Vec<String>,
}

/// 模拟计算
///
/// 综合分取三个维度各自第一个样例按权重求和，三者均有结果时才给出
pub fn simulate(config: &AlgorithmConfig, sample: &SimulationSample) -> SimulationResult {
    let mut errors = Vec::new();

    let performance_engine = PerformanceEngine::new(&config.performance);
    let performance: Vec<SimulatedPerformance> = sample
        .performance
        .iter()
        .flat_map(|p| p.grades.iter())
        .map(|grade| {
            let result = performance_engine.monthly(Some(grade), SIMULATED_RAW_SCORE);
            SimulatedPerformance {
                grade: grade.clone(),
                score: result.radar_value,
                label: result.alert_tag,
            }
        })
        .collect();

    let safety_engine = SafetyEngine::new(&config.safety);
    let safety: Vec<SimulatedSafety> = sample
        .safety
        .iter()
        .flat_map(|s| s.violations.iter())
        .map(|&v| {
            let result = safety_engine.dual_track(&[v], 1);
            SimulatedSafety {
                violation_score: v,
                score: result.final_score,
                label: result.alert_tag,
            }
        })
        .collect();

    let training_engine = TrainingEngine::new(&config.training);
    let mut training = Vec::new();
    if let Some(set) = &sample.training {
        if set.scores.len() == set.is_qualified.len() {
            for (i, (&score, &qualified)) in set.scores.iter().zip(&set.is_qualified).enumerate() {
                let record = TrainingSample {
                    score: Some(score),
                    is_qualified: qualified,
                    is_disqualified: !qualified,
                };
                let result = training_engine.with_penalty(&[record], SIMULATED_TRAINING_DAYS, None);
                training.push(SimulatedTraining {
                    index: i + 1,
                    input_score: score,
                    is_qualified: qualified,
                    final_score: result.radar_score,
                    label: result.alert_tag,
                });
            }
        } else {
            errors.push(format!(
                "培训样例成绩数量({})与合格标记数量({})不一致",
                set.scores.len(),
                set.is_qualified.len()
            ));
        }
    }

    let weights = &config.comprehensive.score_weights;
    let comprehensive = match (performance.first(), safety.first(), training.first()) {
        (Some(p), Some(s), Some(t)) => Some(SimulatedComprehensive {
            score: round_to(
                p.score * weights.performance
                    + s.score * weights.safety
                    + t.final_score * weights.training,
                1,
            ),
            weights: weights.clone(),
        }),
        _ => None,
    };

    SimulationResult {
        performance,
        safety,
        training,
        comprehensive,
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::presets;
    use serde_json::json;

    #[test]
    fn test_simulate_full_sample() {
        let cfg = AlgorithmConfig::from_value(&presets::standard_config()).unwrap();
        let sample: SimulationSample = serde_json::from_value(json!({
            "performance": {"grades": ["B+", "D"]},
            "safety": {"violations": [2, 12]},
            "training": {"scores": [90, 0], "is_qualified": [true, false]}
        }))
        .unwrap();

        let result = simulate(&cfg, &sample);
        assert_eq!(result.performance[0].score, 95.0);
        assert_eq!(result.performance[1].score, 50.0);
        assert_eq!(result.safety[0].score, 98.0);
        assert_eq!(result.safety[1].label, "⛔ 重大红线（存在高扣分）");
        assert_eq!(result.training[0].final_score, 90.0);
        assert_eq!(result.training[1].index, 2);
        // 95*.35 + 98*.3 + 90*.2 = 33.25 + 29.4 + 18 = 80.65
        let comprehensive = result.comprehensive.unwrap();
        assert!((comprehensive.score - 80.7).abs() < 0.051);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_simulate_partial_and_mismatch() {
        let cfg = AlgorithmConfig::from_value(&presets::standard_config()).unwrap();
        let sample: SimulationSample = serde_json::from_value(json!({
            "performance": {"grades": ["A"]},
            "training": {"scores": [90, 80], "is_qualified": [true]}
        }))
        .unwrap();
        let result = simulate(&cfg, &sample);
        assert_eq!(result.performance.len(), 1);
        assert!(result.training.is_empty());
        assert!(result.comprehensive.is_none());
        assert_eq!(result.errors.len(), 1);
    }
}
