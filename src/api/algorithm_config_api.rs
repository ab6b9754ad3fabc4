// ==========================================
// 班组管理系统 - 算法配置 API
// ==========================================
// 职责: 当前配置读取（带缓存）、预设查询/应用/更新/回滚、
//       自定义配置、校验、模拟计算、变更日志
// 缓存: 以 algorithm_active_config.updated_at 判定失效
// 写操作: 仅管理员，必须填写变更原因
// ==========================================

use std::sync::{Arc, Mutex};

use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::config::algorithm::AlgorithmConfig;
use crate::config::validate_config;
use crate::domain::algorithm::{
    ActiveConfigInfo, AlgorithmPreset, ConfigChangeLog, ConfigLogDetail, NewConfigLog,
};
use crate::domain::types::ConfigAction;
use crate::domain::user::AuthUser;
use crate::engine::config_diff::diff_configs;
use crate::engine::simulate::{simulate, SimulationResult, SimulationSample};
use crate::i18n::t;
use crate::repository::AlgorithmConfigRepository;

/// 日志列表默认条数
const DEFAULT_LOG_LIMIT: i64 = 50;

/// 校验结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationOutcome {
    pub valid: bool,
    pub message: String,
}

/// 已解析的当前配置
#[derive(Debug, Clone)]
struct CachedConfig {
    updated_at: NaiveDateTime,
    raw: Value,
    typed: Arc<AlgorithmConfig>,
}

// ==========================================
// AlgorithmConfigApi - 算法配置 API
// ==========================================
pub struct AlgorithmConfigApi {
    repo: Arc<AlgorithmConfigRepository>,
    cache: Mutex<Option<CachedConfig>>,
}

impl AlgorithmConfigApi {
    pub fn new(repo: Arc<AlgorithmConfigRepository>) -> Self {
        Self {
            repo,
            cache: Mutex::new(None),
        }
    }

    fn not_initialized() -> ApiError {
        ApiError::InternalError(t("config.not_initialized"))
    }

    /// 读取当前配置；updated_at 未变化时直接返回缓存
    fn load_cached(&self) -> ApiResult<CachedConfig> {
        let updated_at = self
            .repo
            .active_updated_at()?
            .ok_or_else(Self::not_initialized)?;

        let mut cache = self
            .cache
            .lock()
            .map_err(|e| ApiError::InternalError(format!("配置缓存锁获取失败: {}", e)))?;
        if let Some(cached) = cache.as_ref().filter(|c| c.updated_at == updated_at) {
            return Ok(cached.clone());
        }

        let active = self.repo.get_active()?.ok_or_else(Self::not_initialized)?;
        let typed = AlgorithmConfig::from_value(&active.config_data)
            .map_err(|e| ApiError::ValidationError(format!("当前算法配置无法解析: {}", e)))?;
        let entry = CachedConfig {
            updated_at: active.updated_at,
            raw: active.config_data,
            typed: Arc::new(typed),
        };
        debug!(updated_at = %entry.updated_at, "算法配置缓存已刷新");
        *cache = Some(entry.clone());
        Ok(entry)
    }

    /// 当前生效配置（JSON）
    pub fn get_active_config(&self) -> ApiResult<Value> {
        Ok(self.load_cached()?.raw)
    }

    /// 当前生效配置（强类型，供评分引擎使用）
    pub fn current_config(&self) -> ApiResult<Arc<AlgorithmConfig>> {
        Ok(self.load_cached()?.typed)
    }

    pub fn get_current_info(&self) -> ApiResult<ActiveConfigInfo> {
        self.repo.active_info()?.ok_or_else(Self::not_initialized)
    }

    pub fn get_presets(&self) -> ApiResult<Vec<AlgorithmPreset>> {
        Ok(self.repo.list_presets()?)
    }

    /// 应用预设方案
    ///
    /// # 参数
    /// - user: 操作者（仅管理员）
    /// - preset_key: 预设 key（strict / standard / lenient）
    /// - reason: 变更原因（必填）
    ///
    /// # 返回
    /// - Ok(i64): 变更日志ID
    #[instrument(skip(self, user, reason), fields(user_id = user.id))]
    pub fn apply_preset(&self, user: &AuthUser, preset_key: &str, reason: &str) -> ApiResult<i64> {
        let reason = require_admin_and_reason(user, reason)?;
        let preset = self
            .repo
            .find_preset(preset_key)?
            .ok_or_else(|| ApiError::NotFound(t("config.preset_not_found")))?;
        let old = self.repo.get_active()?.map(|a| a.config_data);

        let log = NewConfigLog {
            action: ConfigAction::ApplyPreset,
            preset_name: Some(&preset.preset_key),
            old_config: old.as_ref(),
            new_config: Some(&preset.config_data),
            change_reason: reason,
            changed_by: Some(user.id),
            changed_by_name: &user.username,
        };
        let log_id = self.repo.save_active(
            Some(&preset.preset_key),
            false,
            &preset.config_data,
            Some(user.id),
            &log,
        )?;
        info!(preset = %preset.preset_key, log_id, "已应用预设方案");
        Ok(log_id)
    }

    /// 保存自定义配置（based_on_preset 置空）
    #[instrument(skip(self, user, config, reason), fields(user_id = user.id))]
    pub fn update_custom_config(&self, user: &AuthUser, config: &Value, reason: &str) -> ApiResult<i64> {
        let reason = require_admin_and_reason(user, reason)?;
        ensure_valid(config)?;
        let old = self.repo.get_active()?.map(|a| a.config_data);

        let log = NewConfigLog {
            action: ConfigAction::CustomUpdate,
            preset_name: None,
            old_config: old.as_ref(),
            new_config: Some(config),
            change_reason: reason,
            changed_by: Some(user.id),
            changed_by_name: &user.username,
        };
        let log_id = self
            .repo
            .save_active(None, true, config, Some(user.id), &log)?;
        info!(log_id, "自定义算法配置已保存");
        Ok(log_id)
    }

    /// 更新预设；当前配置基于该预设且未自定义时同步刷新
    #[instrument(skip(self, user, config, reason), fields(user_id = user.id))]
    pub fn update_preset(
        &self,
        user: &AuthUser,
        preset_key: &str,
        config: &Value,
        reason: &str,
    ) -> ApiResult<i64> {
        let reason = require_admin_and_reason(user, reason)?;
        ensure_valid(config)?;
        let preset = self
            .repo
            .find_preset(preset_key)?
            .ok_or_else(|| ApiError::NotFound(t("config.preset_not_found")))?;

        let log = NewConfigLog {
            action: ConfigAction::UpdatePreset,
            preset_name: Some(&preset.preset_key),
            old_config: Some(&preset.config_data),
            new_config: Some(config),
            change_reason: reason,
            changed_by: Some(user.id),
            changed_by_name: &user.username,
        };
        let sync = self.sync_target(&preset.preset_key, user)?;
        let log_id = self.repo.save_preset(&preset.preset_key, config, sync, &log)?;
        info!(preset = %preset.preset_key, log_id, synced = sync.is_some(), "预设方案已更新");
        Ok(log_id)
    }

    /// 回滚一次预设更新
    #[instrument(skip(self, user, reason), fields(user_id = user.id))]
    pub fn rollback_preset_update(&self, user: &AuthUser, log_id: i64, reason: &str) -> ApiResult<i64> {
        let reason = require_admin_and_reason(user, reason)?;
        let entry = self
            .repo
            .find_log(log_id)?
            .ok_or_else(|| ApiError::NotFound(t("config.log_not_found")))?;
        if entry.action != ConfigAction::UpdatePreset {
            return Err(ApiError::BusinessRuleViolation(t("config.rollback_unsupported")));
        }
        let (Some(preset_key), Some(old_config)) = (entry.preset_name.as_deref(), entry.old_config.as_ref())
        else {
            return Err(ApiError::BusinessRuleViolation(t("config.rollback_unsupported")));
        };
        let current = self
            .repo
            .find_preset(preset_key)?
            .ok_or_else(|| ApiError::NotFound(t("config.preset_not_found")))?;

        let log = NewConfigLog {
            action: ConfigAction::RollbackPreset,
            preset_name: Some(preset_key),
            old_config: Some(&current.config_data),
            new_config: Some(old_config),
            change_reason: reason,
            changed_by: Some(user.id),
            changed_by_name: &user.username,
        };
        let sync = self.sync_target(preset_key, user)?;
        let new_log_id = self.repo.save_preset(preset_key, old_config, sync, &log)?;
        info!(preset = preset_key, from_log = log_id, new_log_id, "预设更新已回滚");
        Ok(new_log_id)
    }

    /// 当前配置基于该预设且未自定义时，返回同步写入的更新人
    fn sync_target(&self, preset_key: &str, user: &AuthUser) -> ApiResult<Option<Option<i64>>> {
        let active = self.repo.get_active()?;
        Ok(active
            .filter(|a| !a.is_customized && a.based_on_preset.as_deref() == Some(preset_key))
            .map(|_| Some(user.id)))
    }

    pub fn validate(&self, config: &Value) -> ValidationOutcome {
        let (valid, message) = validate_config(config);
        ValidationOutcome { valid, message }
    }

    /// 用候选配置（缺省为当前配置）试算样例
    pub fn simulate(&self, config: Option<&Value>, sample: &SimulationSample) -> ApiResult<SimulationResult> {
        let typed = match config {
            Some(raw) => {
                ensure_valid(raw)?;
                Arc::new(
                    AlgorithmConfig::from_value(raw)
                        .map_err(|e| ApiError::ValidationError(e.to_string()))?,
                )
            }
            None => self.current_config()?,
        };
        Ok(simulate(&typed, sample))
    }

    pub fn get_logs(&self, user: &AuthUser, limit: Option<i64>, offset: Option<i64>) -> ApiResult<Vec<ConfigChangeLog>> {
        ensure_admin(user)?;
        let limit = limit.unwrap_or(DEFAULT_LOG_LIMIT).clamp(1, 500);
        Ok(self.repo.list_logs(limit, offset.unwrap_or(0).max(0))?)
    }

    pub fn get_log_detail(&self, user: &AuthUser, log_id: i64) -> ApiResult<ConfigLogDetail> {
        ensure_admin(user)?;
        let log = self
            .repo
            .find_log(log_id)?
            .ok_or_else(|| ApiError::NotFound(t("config.log_not_found")))?;
        let diff = diff_configs(log.old_config.as_ref(), log.new_config.as_ref());
        Ok(ConfigLogDetail { log, diff })
    }
}

/// 仅管理员
pub(crate) fn ensure_admin(user: &AuthUser) -> ApiResult<()> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(ApiError::PermissionDenied(t("access.admin_required")))
    }
}

fn require_admin_and_reason<'a>(user: &AuthUser, reason: &'a str) -> ApiResult<&'a str> {
    ensure_admin(user)?;
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(ApiError::InvalidInput(t("config.reason_required")));
    }
    Ok(reason)
}

fn ensure_valid(config: &Value) -> ApiResult<()> {
    let (valid, message) = validate_config(config);
    if valid {
        Ok(())
    } else {
        warn!(message = %message, "算法配置校验未通过");
        Err(ApiError::ValidationError(message))
    }
}
