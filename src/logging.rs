// ==========================================
// 班组管理系统 - 日志
// ==========================================
// RUST_LOG   过滤规则，缺省见 DEFAULT_DIRECTIVES
// LOG_FORMAT json 时输出结构化日志（便于采集），否则为可读文本
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

/// 缺省过滤规则：业务模块 info，HTTP 访问日志 info，SQL 追踪关闭
pub const DEFAULT_DIRECTIVES: &str = "team_management=info,tower_http=info,warn";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    fn from_env_value(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        }
    }
}

fn build_filter(raw: Option<&str>) -> EnvFilter {
    raw.filter(|s| !s.trim().is_empty())
        .and_then(|s| EnvFilter::try_new(s).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVES))
}

/// 初始化全局日志订阅者，重复调用无副作用
pub fn init() {
    let filter = build_filter(std::env::var("RUST_LOG").ok().as_deref());
    let format = LogFormat::from_env_value(std::env::var("LOG_FORMAT").ok().as_deref());

    let builder = fmt().with_env_filter(filter).with_target(true);
    let result = match format {
        LogFormat::Json => builder.json().with_current_span(false).try_init(),
        LogFormat::Text => builder.with_line_number(true).try_init(),
    };
    if result.is_err() {
        tracing::debug!("日志订阅者已存在，跳过初始化");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_from_env() {
        assert_eq!(LogFormat::from_env_value(Some(" JSON ")), LogFormat::Json);
        assert_eq!(LogFormat::from_env_value(Some("pretty")), LogFormat::Text);
        assert_eq!(LogFormat::from_env_value(None), LogFormat::Text);
    }

    #[test]
    fn test_bad_filter_falls_back() {
        let filter = build_filter(Some("team_management=loud"));
        assert_eq!(filter.to_string(), EnvFilter::new(DEFAULT_DIRECTIVES).to_string());
        let filter = build_filter(Some(""));
        assert_eq!(filter.to_string(), EnvFilter::new(DEFAULT_DIRECTIVES).to_string());
    }
}
