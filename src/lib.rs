use std::sync::Arc;

use auth::{AccessGuard, CredentialVerifier, TokenService};
use store::ChatStore;

pub mod auth;
pub mod config;
pub mod error;
pub mod middleware;
pub mod result;
pub mod router;
pub mod routes;
pub mod store;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ChatStore>,
    pub verifier: CredentialVerifier,
    pub tokens: Arc<TokenService>,
    pub guard: AccessGuard,
}

impl AppState {
    /// 签名密钥在这里注入，之后在进程生命周期内不变
    pub fn new(
        store: Arc<dyn ChatStore>,
        tokens: TokenService,
        bcrypt_cost: u32,
    ) -> Result<Self, bcrypt::BcryptError> {
        Ok(Self {
            verifier: CredentialVerifier::new(store.clone(), bcrypt_cost)?,
            guard: AccessGuard::new(store.clone()),
            tokens: Arc::new(tokens),
            store,
        })
    }
}
