// ==========================================
// 班组管理系统 - 请求提取器
// ==========================================
// CurrentUser: Authorization: Bearer <token> → 会话用户
// Upload: multipart 中的首个文件字段（校验扩展名）
// ==========================================

use std::sync::Arc;

use axum::extract::{FromRequest, FromRequestParts, Multipart, Request};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;

use crate::api::error::ApiError;
use crate::app::AppState;
use crate::config::settings::is_allowed_extension;
use crate::domain::user::AuthUser;
use crate::http::routes::blocking;
use crate::i18n::{t, t_with_args};

/// 解析 Bearer token
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?;
    let text = value.to_str().ok()?.trim();
    let prefix = text.get(..7)?;
    if !prefix.eq_ignore_ascii_case("bearer ") {
        return None;
    }
    let token = text.get(7..)?.trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// 已登录用户
pub struct CurrentUser(pub AuthUser);

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers);
        let state = Arc::clone(state);
        let user = blocking(move || state.auth_api.authenticate(token.as_deref())).await?;
        Ok(Self(user))
    }
}

/// 原始 token（登出用）
pub struct BearerToken(pub Option<String>);

impl<S: Send + Sync> FromRequestParts<S> for BearerToken {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(extract_bearer_token(&parts.headers)))
    }
}

/// 上传文件
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl<S: Send + Sync> FromRequest<S> for Upload {
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| ApiError::InvalidInput(e.body_text()))?;
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::InvalidInput(e.body_text()))?
        {
            let Some(file_name) = field.file_name().map(str::to_string) else {
                continue;
            };
            if !is_allowed_extension(&file_name) {
                let ext = file_name.rsplit_once('.').map_or("", |(_, e)| e).to_string();
                return Err(ApiError::InvalidInput(t_with_args(
                    "import.unsupported_file",
                    &[("ext", &ext)],
                )));
            }
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::InvalidInput(e.body_text()))?;
            return Ok(Self {
                file_name,
                bytes: bytes.to_vec(),
            });
        }
        Err(ApiError::InvalidInput(t("http.file_required")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(extract_bearer_token(&headers).as_deref(), Some("abc123"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("bearer   xyz "));
        assert_eq!(extract_bearer_token(&headers).as_deref(), Some("xyz"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(extract_bearer_token(&headers), None);
    }
}
