// ==========================================
// 班组管理系统 - 领域类型定义
// ==========================================
// 角色 / 状态颜色 / 风险等级 / 配置动作 / 导入模块
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 用户角色 (User Role)
// ==========================================
// 序列化格式: 小写（与数据库一致）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,   // 管理员: 全部部门
    Manager, // 经理: 本部门及下级，可写
    User,    // 普通用户: 本部门及下级，只读
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl UserRole {
    /// 从数据库字符串解析
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(UserRole::Admin),
            "manager" => Some(UserRole::Manager),
            "user" => Some(UserRole::User),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Manager => "manager",
            UserRole::User => "user",
        }
    }

    /// 是否具备写入权限
    pub fn can_write(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Manager)
    }
}

// ==========================================
// 状态颜色 (Status Color)
// ==========================================
// 评分结果的展示颜色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusColor {
    Red,
    Orange,
    Yellow,
    Green,
    Blue,
    Purple,
    Gray,
}

impl fmt::Display for StatusColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StatusColor::Red => "RED",
            StatusColor::Orange => "ORANGE",
            StatusColor::Yellow => "YELLOW",
            StatusColor::Green => "GREEN",
            StatusColor::Blue => "BLUE",
            StatusColor::Purple => "PURPLE",
            StatusColor::Gray => "GRAY",
        };
        write!(f, "{}", s)
    }
}

// ==========================================
// 风险等级 (Risk Level)
// ==========================================
// 培训/学习能力评分的风险分级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Critical,
    HighRisk,
    Warning,
    Notice,
    Normal,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskLevel::Critical => "CRITICAL",
            RiskLevel::HighRisk => "HIGH_RISK",
            RiskLevel::Warning => "WARNING",
            RiskLevel::Notice => "NOTICE",
            RiskLevel::Normal => "NORMAL",
        };
        write!(f, "{}", s)
    }
}

impl RiskLevel {
    /// 风险等级对应的展示颜色
    pub fn color(&self) -> StatusColor {
        match self {
            RiskLevel::Critical => StatusColor::Red,
            RiskLevel::HighRisk => StatusColor::Purple,
            RiskLevel::Warning => StatusColor::Orange,
            RiskLevel::Notice => StatusColor::Yellow,
            RiskLevel::Normal => StatusColor::Green,
        }
    }
}

// ==========================================
// 算法配置变更动作 (Config Action)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfigAction {
    Init,
    ApplyPreset,
    CustomUpdate,
    UpdatePreset,
    RollbackPreset,
}

impl fmt::Display for ConfigAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl ConfigAction {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "INIT" => Some(ConfigAction::Init),
            "APPLY_PRESET" => Some(ConfigAction::ApplyPreset),
            "CUSTOM_UPDATE" => Some(ConfigAction::CustomUpdate),
            "UPDATE_PRESET" => Some(ConfigAction::UpdatePreset),
            "ROLLBACK_PRESET" => Some(ConfigAction::RollbackPreset),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            ConfigAction::Init => "INIT",
            ConfigAction::ApplyPreset => "APPLY_PRESET",
            ConfigAction::CustomUpdate => "CUSTOM_UPDATE",
            ConfigAction::UpdatePreset => "UPDATE_PRESET",
            ConfigAction::RollbackPreset => "ROLLBACK_PRESET",
        }
    }
}

// ==========================================
// 导入模块 (Import Module)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportModule {
    Personnel,
    Performance,
    Training,
    Safety,
}

impl fmt::Display for ImportModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl ImportModule {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ImportModule::Personnel => "personnel",
            ImportModule::Performance => "performance",
            ImportModule::Training => "training",
            ImportModule::Safety => "safety",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse_and_write() {
        assert_eq!(UserRole::from_str(" Manager "), Some(UserRole::Manager));
        assert_eq!(UserRole::from_str("root"), None);
        assert!(UserRole::Admin.can_write());
        assert!(!UserRole::User.can_write());
    }

    #[test]
    fn test_risk_level_color() {
        assert_eq!(RiskLevel::HighRisk.color(), StatusColor::Purple);
        assert_eq!(
            serde_json::to_string(&RiskLevel::HighRisk).unwrap(),
            "\"HIGH_RISK\""
        );
    }

    #[test]
    fn test_config_action_round_trip() {
        for action in [
            ConfigAction::Init,
            ConfigAction::ApplyPreset,
            ConfigAction::CustomUpdate,
            ConfigAction::UpdatePreset,
            ConfigAction::RollbackPreset,
        ] {
            assert_eq!(ConfigAction::from_str(action.to_db_str()), Some(action));
        }
    }
}
