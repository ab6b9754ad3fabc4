// ==========================================
// 班组管理系统 - 会话存储
// ==========================================
// 内存会话: token(uuid) → 用户ID + 过期时间
// 每次校验成功即按超时时长顺延
// 过期会话: 创建时清理；校验时至多每 SWEEP_INTERVAL_SECS 秒清理一次
// ==========================================

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

const SWEEP_INTERVAL_SECS: i64 = 60;

#[derive(Debug, Clone)]
struct SessionEntry {
    user_id: i64,
    expires_at: DateTime<Utc>,
}

pub struct SessionStore {
    sessions: Mutex<HashMap<String, SessionEntry>>,
    timeout: Duration,
    /// 上次清理时间（unix 秒）
    last_sweep: AtomicI64,
}

impl SessionStore {
    pub fn new(timeout_secs: i64) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            timeout: Duration::seconds(timeout_secs.max(1)),
            last_sweep: AtomicI64::new(Utc::now().timestamp()),
        }
    }

    /// 创建会话并返回 token
    pub fn create(&self, user_id: i64) -> String {
        let token = Uuid::new_v4().simple().to_string();
        let entry = SessionEntry {
            user_id,
            expires_at: Utc::now() + self.timeout,
        };
        if let Ok(mut sessions) = self.sessions.lock() {
            self.sweep(&mut sessions, Utc::now());
            sessions.insert(token.clone(), entry);
        }
        token
    }

    /// 校验 token，有效时顺延过期时间并返回用户ID
    pub fn authenticate(&self, token: &str) -> Option<i64> {
        let mut sessions = self.sessions.lock().ok()?;
        let now = Utc::now();
        if now.timestamp() - self.last_sweep.load(Ordering::Relaxed) >= SWEEP_INTERVAL_SECS {
            self.sweep(&mut sessions, now);
        }
        let expired = match sessions.get_mut(token) {
            Some(entry) if entry.expires_at > now => {
                entry.expires_at = now + self.timeout;
                return Some(entry.user_id);
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            debug!("会话已过期");
            sessions.remove(token);
        }
        None
    }

    fn sweep(&self, sessions: &mut HashMap<String, SessionEntry>, now: DateTime<Utc>) {
        let before = sessions.len();
        sessions.retain(|_, s| s.expires_at > now);
        self.last_sweep.store(now.timestamp(), Ordering::Relaxed);
        if sessions.len() < before {
            debug!(removed = before - sessions.len(), "已清理过期会话");
        }
    }

    pub fn revoke(&self, token: &str) -> bool {
        self.sessions
            .lock()
            .map(|mut s| s.remove(token).is_some())
            .unwrap_or(false)
    }

    /// 清除某用户的全部会话（删除用户/重置密码后）
    pub fn revoke_user(&self, user_id: i64) -> usize {
        match self.sessions.lock() {
            Ok(mut sessions) => {
                let before = sessions.len();
                sessions.retain(|_, s| s.user_id != user_id);
                before - sessions.len()
            }
            Err(_) => 0,
        }
    }
}
