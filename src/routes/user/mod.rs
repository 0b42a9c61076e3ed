mod handler;
mod model;

pub use handler::{login, me, register};
pub use model::{LoginRequest, RegisterRequest, TokenResponse};
