// ==========================================
// 班组管理系统 - 服务入口
// ==========================================

use std::sync::Arc;

use anyhow::{anyhow, Context};
use team_management::{http, logging, AppSettings, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();
    team_management::i18n::init_from_env();

    tracing::info!("==================================================");
    tracing::info!("{} v{}", team_management::APP_NAME, team_management::VERSION);
    tracing::info!("==================================================");

    let settings = AppSettings::from_env().context("读取环境变量失败")?;
    for dir in [&settings.upload_dir, &settings.export_dir, &settings.backup_dir] {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("无法创建目录: {}", dir.display()))?;
    }
    tracing::info!("使用数据库: {}", settings.db_path);

    let state = tokio::task::spawn_blocking(move || AppState::new(settings))
        .await
        .context("初始化任务异常退出")?
        .map_err(|e| anyhow!(e))?;

    http::run_server(Arc::new(state)).await?;
    Ok(())
}
