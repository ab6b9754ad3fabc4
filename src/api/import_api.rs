// ==========================================
// 班组管理系统 - 文件导入 API 与导入日志
// ==========================================
// 职责: 统一的导入执行流程 + 导入日志查询
// 流程: 权限校验 → 扩展名校验 → 解析 → 模块导入 → 写导入日志
// 文件级失败同样写一条日志（success_rows = 0）
// ==========================================

use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, instrument};

use crate::api::error::{ApiError, ApiResult};
use crate::config::settings::is_allowed_extension;
use crate::domain::import_log::{ImportLog, ImportLogFilter, NewImportLog};
use crate::domain::types::ImportModule;
use crate::domain::user::AuthUser;
use crate::engine::access::AccessScope;
use crate::i18n::t_with_args;
use crate::importer::{ImportContext, ImportError, ImportOutcome, SheetImporter, UniversalFileParser};
use crate::repository::{DepartmentRepository, ImportLogRepository};

/// 日志列表默认条数
const DEFAULT_LOG_LIMIT: i64 = 50;

/// 导入结果响应
#[derive(Debug, Clone, Serialize)]
pub struct ImportApiResponse {
    #[serde(flatten)]
    pub outcome: ImportOutcome,
    pub message: String,
    pub log_id: i64,
}

// ==========================================
// ImportApi - 导入执行与日志
// ==========================================
pub struct ImportApi {
    import_log_repo: Arc<ImportLogRepository>,
    department_repo: Arc<DepartmentRepository>,
    parser: UniversalFileParser,
}

impl ImportApi {
    pub fn new(
        import_log_repo: Arc<ImportLogRepository>,
        department_repo: Arc<DepartmentRepository>,
    ) -> Self {
        Self {
            import_log_repo,
            department_repo,
            parser: UniversalFileParser,
        }
    }

    fn scope(&self, user: &AuthUser) -> ApiResult<AccessScope> {
        let departments = self.department_repo.list_all()?;
        Ok(AccessScope::resolve(user, &departments))
    }

    /// 执行一次文件导入
    ///
    /// # 参数
    /// - user: 当前操作者（需写入权限）
    /// - importer: 模块导入器
    /// - file_name: 上传文件名（决定解析方式）
    /// - bytes: 文件内容
    ///
    /// # 返回
    /// - Ok(ImportApiResponse): 行级统计与日志ID
    /// - Err(ApiError): 权限不足 / 文件无法解析 / 缺少必需列
    #[instrument(skip(self, user, importer, bytes), fields(module = %importer.module(), size = bytes.len()))]
    pub fn run_import(
        &self,
        user: &AuthUser,
        importer: &dyn SheetImporter,
        file_name: &str,
        bytes: &[u8],
    ) -> ApiResult<ImportApiResponse> {
        let scope = self.scope(user)?;
        scope.ensure_can_write()?;

        let module = importer.module();
        if !is_allowed_extension(file_name) {
            let ext = file_name.rsplit_once('.').map(|(_, e)| e).unwrap_or("");
            return Err(ApiError::ImportError(t_with_args(
                "import.unsupported_file",
                &[("ext", ext)],
            )));
        }

        let ctx = ImportContext {
            scope: &scope,
            created_by: Some(user.id),
            source_file: Some(file_name.to_string()),
        };
        let result = self
            .parser
            .parse(file_name, bytes)
            .and_then(|sheet| importer.import(&sheet, &ctx));

        match result {
            Ok(outcome) => {
                let log_id = self.write_log(user, module, file_name, Ok(&outcome))?;
                info!(log_id, imported = outcome.imported, "导入完成");
                Ok(ImportApiResponse {
                    message: outcome.summary_message(),
                    outcome,
                    log_id,
                })
            }
            Err(err) => {
                error!(error = %err, "导入失败");
                if let Err(log_err) = self.write_log(user, module, file_name, Err(&err)) {
                    error!(error = %log_err, "导入日志写入失败");
                }
                Err(err.into())
            }
        }
    }

    fn write_log(
        &self,
        user: &AuthUser,
        module: ImportModule,
        file_name: &str,
        result: Result<&ImportOutcome, &ImportError>,
    ) -> ApiResult<i64> {
        let mut log = NewImportLog {
            module,
            operation: "import".to_string(),
            user_id: Some(user.id),
            username: Some(user.username.clone()),
            user_role: Some(user.role.to_db_str().to_string()),
            department_id: user.department_id,
            department_name: user.department_name.clone(),
            file_name: Some(file_name.to_string()),
            total_rows: 0,
            success_rows: 0,
            failed_rows: 0,
            skipped_rows: 0,
            error_message: None,
            import_details: None,
        };
        match result {
            Ok(outcome) => {
                log.total_rows = outcome.total as i64;
                log.success_rows = outcome.imported as i64;
                log.failed_rows = outcome.failed as i64;
                log.skipped_rows = outcome.skipped() as i64;
                log.error_message = outcome.first_error();
                log.import_details = Some(outcome.to_details());
            }
            Err(err) => log.error_message = Some(err.to_string()),
        }
        Ok(self.import_log_repo.insert(&log)?)
    }

    /// 导入日志列表: 管理员看全部，其他角色看本部门范围内操作者的日志
    pub fn list_logs(&self, user: &AuthUser, filter: &ImportLogFilter) -> ApiResult<Vec<ImportLog>> {
        let scope = self.scope(user)?;
        let ids = scope.department_ids();
        let limit = filter.limit.unwrap_or(DEFAULT_LOG_LIMIT).clamp(1, 500);
        let offset = filter.offset.unwrap_or(0).max(0);
        Ok(self
            .import_log_repo
            .list(filter.module.as_deref(), ids.as_deref(), limit, offset)?)
    }
}
