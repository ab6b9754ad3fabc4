// ==========================================
// 班组管理系统 - 引擎层
// ==========================================
// 职责: 评分算法与业务规则，纯函数实现
// 红线: Engine 不拼 SQL, 输入输出均为内存数据
// ==========================================

pub mod access;
pub mod comprehensive;
pub mod config_diff;
pub mod learning;
pub mod month;
pub mod performance;
pub mod personnel_stats;
pub mod safety;
pub mod simulate;
pub mod stability;
pub mod text;
pub mod training;

// 重导出核心引擎
pub use access::{AccessError, AccessScope, DepartmentScope};
pub use comprehensive::{
    comprehensive_score, key_personnel, nine_grid_placement, DimensionScores, GridPlacement,
    KeyPersonnelVerdict,
};
pub use config_diff::diff_configs;
pub use learning::{LearningEngine, LearningScore};
pub use month::{month_range, YearMonth};
pub use performance::{quarter_months, PerformanceEngine, QuarterGrade};
pub use safety::{SafetyEngine, SafetyScore};
pub use simulate::{simulate, SimulationResult, SimulationSample};
pub use stability::{StabilityEngine, StabilityScore};
pub use training::{TrainingEngine, TrainingSample, TrainingScore};

/// 四舍五入到指定小数位
pub fn round_to(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::round_to;

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(98.166, 1), 98.2);
        assert_eq!(round_to(0.1234, 3), 0.123);
        assert_eq!(round_to(-1.25, 0), -1.0);
    }
}
