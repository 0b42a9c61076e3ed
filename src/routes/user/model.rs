use std::fmt;

use serde::{Deserialize, Serialize};

use crate::auth::AccessToken;
use crate::store::UserId;

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 32;
const PASSWORD_MIN: usize = 6;
// bcrypt 只使用前 72 字节
const PASSWORD_MAX: usize = 72;

#[derive(Deserialize, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

fn redact_credentials(name: &str, username: &str, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct(name)
        .field("username", &username)
        .field("password", &"[REDACTED]")
        .finish()
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        redact_credentials("RegisterRequest", &self.username, f)
    }
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        redact_credentials("LoginRequest", &self.username, f)
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user_id: UserId,
}

impl From<AccessToken> for TokenResponse {
    fn from(token: AccessToken) -> Self {
        Self {
            expires_in: (token.expires_at - token.issued_at).num_seconds(),
            access_token: token.token,
            token_type: "bearer".into(),
            user_id: token.user_id,
        }
    }
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), String> {
        let len = self.username.chars().count();
        if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
            return Err(format!(
                "用户名长度必须在{}到{}个字符之间",
                USERNAME_MIN, USERNAME_MAX
            ));
        }
        if !self
            .username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err("用户名格式无效，只允许使用字母、数字和下划线".to_string());
        }
        if !(PASSWORD_MIN..=PASSWORD_MAX).contains(&self.password.len()) {
            return Err(format!(
                "密码长度必须在{}到{}个字节之间",
                PASSWORD_MIN, PASSWORD_MAX
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(username: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.into(),
            password: password.into(),
        }
    }

    #[test]
    fn accepts_plain_usernames() {
        assert!(req("alice_01", "correct-horse").validate().is_ok());
    }

    #[test]
    fn debug_output_hides_password() {
        let register = format!("{:?}", req("alice", "correct-horse"));
        let login = format!(
            "{:?}",
            LoginRequest {
                username: "alice".into(),
                password: "correct-horse".into(),
            }
        );
        for output in [register, login] {
            assert!(output.contains("alice"));
            assert!(!output.contains("correct-horse"));
        }
    }

    #[test]
    fn rejects_bad_input() {
        assert!(req("al", "correct-horse").validate().is_err());
        assert!(req("alice bob", "correct-horse").validate().is_err());
        assert!(req("ålice", "correct-horse").validate().is_err());
        assert!(req("alice", "short").validate().is_err());
        assert!(req("alice", &"x".repeat(73)).validate().is_err());
    }
}
