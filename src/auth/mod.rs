//! 认证与授权核心
//!
//! 一次请求的流程：
//! `Unauthenticated -> TokenPresented -> TokenValidated -> Authorized | Denied`，
//! 中途可能以 `Rejected` / `Expired` / `Malformed` / `SignatureInvalid` 提前结束。
//! 请求之间不保留任何状态。

mod guard;
mod password;
mod token;

pub use guard::{AccessGuard, Action, Decision, Resource};
pub use password::{CredentialVerifier, Verification, VerifyError, hash_password};
pub use token::{AccessToken, Claims, TokenError, TokenService, Validation};
