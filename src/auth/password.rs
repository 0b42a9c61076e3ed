use std::sync::Arc;

use bcrypt::BcryptError;
use thiserror::Error;
use tokio::task::JoinError;

use crate::store::{ChatStore, StoreError, UserId};

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("password verification task failed: {0}")]
    Task(#[from] JoinError),
}

/// 对外的校验结果，`Rejected` 不区分用户不存在和密码错误
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    Authenticated(UserId),
    Rejected,
}

/// 拒绝原因，只写日志
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RejectReason {
    EmptyInput,
    UnknownUser,
    PasswordMismatch,
    CorruptHash,
}

impl RejectReason {
    fn as_str(self) -> &'static str {
        match self {
            RejectReason::EmptyInput => "empty_input",
            RejectReason::UnknownUser => "unknown_user",
            RejectReason::PasswordMismatch => "password_mismatch",
            RejectReason::CorruptHash => "corrupt_hash",
        }
    }
}

pub fn hash_password(password: &str, cost: u32) -> Result<String, BcryptError> {
    bcrypt::hash(password.as_bytes(), cost)
}

/// bcrypt 比较本身是常数时间的
fn verify_password(password: &str, hash: &str) -> Result<bool, BcryptError> {
    bcrypt::verify(password.as_bytes(), hash)
}

async fn run_blocking<T, F>(f: F) -> Result<T, VerifyError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    Ok(tokio::task::spawn_blocking(f).await?)
}

#[derive(Clone)]
pub struct CredentialVerifier {
    store: Arc<dyn ChatStore>,
    cost: u32,
    // 用户不存在时也跑一次 bcrypt，让两种失败耗时一致
    dummy_hash: Arc<str>,
}

impl CredentialVerifier {
    pub fn new(store: Arc<dyn ChatStore>, cost: u32) -> Result<Self, BcryptError> {
        let dummy_hash = hash_password("dummy-password-for-timing", cost)?;
        Ok(Self {
            store,
            cost,
            dummy_hash: dummy_hash.into(),
        })
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    pub async fn verify(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Verification, VerifyError> {
        if username.is_empty() || password.is_empty() {
            return Ok(self.reject(username, RejectReason::EmptyInput));
        }

        let user = self.store.find_user_by_username(username).await?;

        let (hash, user_id) = match &user {
            Some(user) => (user.password_hash.clone(), Some(user.id)),
            None => (self.dummy_hash.to_string(), None),
        };

        let password = password.to_owned();
        let matched = run_blocking(move || verify_password(&password, &hash)).await?;

        match (user_id, matched) {
            (Some(user_id), Ok(true)) => {
                tracing::info!(user_id, "Credentials verified");
                Ok(Verification::Authenticated(user_id))
            }
            (None, _) => Ok(self.reject(username, RejectReason::UnknownUser)),
            (Some(_), Ok(false)) => Ok(self.reject(username, RejectReason::PasswordMismatch)),
            (Some(user_id), Err(e)) => {
                tracing::error!(user_id, "Stored password hash is unreadable: {}", e);
                Ok(self.reject(username, RejectReason::CorruptHash))
            }
        }
    }

    fn reject(&self, username: &str, reason: RejectReason) -> Verification {
        tracing::info!(username, reason = reason.as_str(), "Credentials rejected");
        Verification::Rejected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    const TEST_COST: u32 = 4;

    async fn verifier_with_alice() -> (CredentialVerifier, UserId) {
        let store = Arc::new(MemoryStore::new());
        let hash = hash_password("correct-horse", TEST_COST).unwrap();
        let alice = store.create_user("alice", &hash).await.unwrap();
        let verifier = CredentialVerifier::new(store, TEST_COST).unwrap();
        (verifier, alice.id)
    }

    #[test]
    fn hash_is_salted_and_one_way() {
        let a = hash_password("secret", TEST_COST).unwrap();
        let b = hash_password("secret", TEST_COST).unwrap();
        assert_ne!(a, b);
        assert!(!a.contains("secret"));
        assert!(verify_password("secret", &a).unwrap());
        assert!(verify_password("secret", &b).unwrap());
    }

    #[tokio::test]
    async fn correct_password_authenticates() {
        let (verifier, alice_id) = verifier_with_alice().await;
        let result = verifier.verify("alice", "correct-horse").await.unwrap();
        assert_eq!(result, Verification::Authenticated(alice_id));
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_look_the_same() {
        let (verifier, _) = verifier_with_alice().await;
        let wrong = verifier.verify("alice", "wrong").await.unwrap();
        let unknown = verifier.verify("bob", "anything").await.unwrap();
        assert_eq!(wrong, Verification::Rejected);
        assert_eq!(unknown, Verification::Rejected);
        assert_eq!(wrong, unknown);
    }

    #[tokio::test]
    async fn empty_input_is_rejected() {
        let (verifier, _) = verifier_with_alice().await;
        assert_eq!(
            verifier.verify("", "correct-horse").await.unwrap(),
            Verification::Rejected
        );
        assert_eq!(
            verifier.verify("alice", "").await.unwrap(),
            Verification::Rejected
        );
    }

    #[tokio::test]
    async fn panicking_bcrypt_task_is_an_error() {
        let result = run_blocking(|| -> bool { panic!("bcrypt worker crashed") }).await;
        assert!(matches!(result, Err(VerifyError::Task(e)) if e.is_panic()));
    }

    #[tokio::test]
    async fn corrupt_stored_hash_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        store.create_user("carol", "not-a-bcrypt-hash").await.unwrap();
        let verifier = CredentialVerifier::new(store, TEST_COST).unwrap();
        assert_eq!(
            verifier.verify("carol", "whatever").await.unwrap(),
            Verification::Rejected
        );
    }
}
