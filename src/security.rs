// ==========================================
// 班组管理系统 - 密码哈希
// ==========================================
// 算法: Argon2id (PHC 字符串格式)
// ==========================================

use argon2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::Argon2;
use tracing::warn;

/// 生成密码哈希
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    if password.is_empty() {
        anyhow::bail!("密码不能为空");
    }
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| anyhow::anyhow!(err.to_string()))?;
    Ok(hash.to_string())
}

/// 校验密码，哈希格式异常时视为不匹配
pub fn verify_password(hash: &str, password: &str) -> bool {
    let parsed = match PasswordHash::new(hash) {
        Ok(value) => value,
        Err(err) => {
            warn!("password hash parse failed: {err}");
            return false;
        }
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("admin123").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password(&hash, "admin123"));
        assert!(!verify_password(&hash, "admin124"));
    }

    #[test]
    fn test_verify_garbage_hash() {
        assert!(!verify_password("not-a-hash", "whatever"));
    }

    #[test]
    fn test_empty_password_rejected() {
        assert!(hash_password("").is_err());
    }
}
