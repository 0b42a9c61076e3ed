use std::fmt;

use chrono::{DateTime, Duration, SubsecRound, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation as JwtValidation, decode, encode,
    errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::UserId;

const ALGORITHM: Algorithm = Algorithm::HS256;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // 用户ID
    pub iat: i64,    // 签发时间
    pub exp: i64,    // 过期时间
}

#[derive(Debug, Error)]
#[error("failed to sign access token: {0}")]
pub struct TokenError(#[from] jsonwebtoken::errors::Error);

/// 签发后不可变的访问令牌
#[derive(Clone)]
pub struct AccessToken {
    pub token: String,
    pub user_id: UserId,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"[REDACTED]")
            .field("user_id", &self.user_id)
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// 令牌校验结果。除 `Valid` 外调用方一律按拒绝处理
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
    Valid(UserId),
    Expired,
    Malformed,
    SignatureInvalid,
}

impl Validation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Validation::Valid(_) => "valid",
            Validation::Expired => "expired",
            Validation::Malformed => "malformed",
            Validation::SignatureInvalid => "signature_invalid",
        }
    }
}

/// HS256 签发与校验。密钥在启动时注入，之后只读
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: JwtValidation,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let mut validation = JwtValidation::new(ALGORITHM);
        // 过期时间由调用方传入的 now 判断，不使用库里的系统时钟
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    pub fn issue(&self, user_id: UserId, now: DateTime<Utc>) -> Result<AccessToken, TokenError> {
        // claims 只有秒精度，返回值与之保持一致
        let now = now.trunc_subsecs(0);
        let expires_at = now + self.ttl;
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(ALGORITHM), &claims, &self.encoding_key)?;
        tracing::debug!(user_id, exp = claims.exp, "Issued access token");

        Ok(AccessToken {
            token,
            user_id,
            issued_at: now,
            expires_at,
        })
    }

    pub fn validate(&self, token: &str, now: DateTime<Utc>) -> Validation {
        let claims = match decode::<Claims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => data.claims,
            Err(e) => {
                return match e.kind() {
                    ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                        Validation::SignatureInvalid
                    }
                    _ => Validation::Malformed,
                };
            }
        };

        let Ok(user_id) = claims.sub.parse::<UserId>() else {
            return Validation::Malformed;
        };

        if now.timestamp() >= claims.exp {
            return Validation::Expired;
        }

        Validation::Valid(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};

    const SECRET: &[u8] = b"test-secret-with-enough-entropy";

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn service(ttl_secs: i64) -> TokenService {
        TokenService::new(SECRET, Duration::seconds(ttl_secs))
    }

    #[test]
    fn issue_sets_expiry_from_ttl() {
        let token = service(1800).issue(42, at(1_000)).unwrap();
        assert_eq!(token.issued_at, at(1_000));
        assert_eq!(token.expires_at, at(2_800));
        assert_eq!(token.user_id, 42);
    }

    #[test]
    fn valid_right_after_issue() {
        let svc = service(1800);
        let token = svc.issue(7, at(1_700_000_000)).unwrap();
        assert_eq!(
            svc.validate(&token.token, token.issued_at),
            Validation::Valid(7)
        );
        assert_eq!(
            svc.validate(&token.token, at(1_700_000_001)),
            Validation::Valid(7)
        );
    }

    #[test]
    fn expires_at_and_after_expiry() {
        let svc = service(3600);
        let token = svc.issue(1, at(0)).unwrap();
        assert_eq!(svc.validate(&token.token, at(3599)), Validation::Valid(1));
        assert_eq!(svc.validate(&token.token, at(3600)), Validation::Expired);
        assert_eq!(svc.validate(&token.token, at(3601)), Validation::Expired);
        assert_eq!(svc.validate(&token.token, at(100_000)), Validation::Expired);
    }

    #[test]
    fn sub_second_issue_agrees_with_validate() {
        let svc = service(10);
        let now = at(1_000) + Duration::milliseconds(600);
        let token = svc.issue(1, now).unwrap();
        assert_eq!(token.issued_at, at(1_000));
        assert_eq!(token.expires_at, at(1_010));

        let just_before = token.expires_at - Duration::milliseconds(300);
        assert_eq!(svc.validate(&token.token, just_before), Validation::Valid(1));
        assert_eq!(
            svc.validate(&token.token, token.expires_at),
            Validation::Expired
        );
    }

    #[test]
    fn flipping_any_signature_bit_is_detected() {
        let svc = service(3600);
        let token = svc.issue(1, at(0)).unwrap().token;
        let (message, signature) = token.rsplit_once('.').unwrap();
        let signature = URL_SAFE_NO_PAD.decode(signature).unwrap();

        for byte in 0..signature.len() {
            for bit in 0..8 {
                let mut tampered = signature.clone();
                tampered[byte] ^= 1 << bit;
                let forged = format!("{}.{}", message, URL_SAFE_NO_PAD.encode(&tampered));
                assert_eq!(
                    svc.validate(&forged, at(1)),
                    Validation::SignatureInvalid,
                    "byte {byte} bit {bit}"
                );
            }
        }
    }

    #[test]
    fn wrong_secret_is_signature_invalid() {
        let token = service(3600).issue(1, at(0)).unwrap().token;
        let other = TokenService::new(b"another-secret", Duration::seconds(3600));
        assert_eq!(other.validate(&token, at(1)), Validation::SignatureInvalid);
    }

    #[test]
    fn unexpected_algorithm_is_signature_invalid() {
        let claims = Claims {
            sub: "1".into(),
            iat: 0,
            exp: 3600,
        };
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();
        assert_eq!(
            service(3600).validate(&token, at(1)),
            Validation::SignatureInvalid
        );
    }

    #[test]
    fn garbage_is_malformed() {
        let svc = service(3600);
        assert_eq!(svc.validate("", at(0)), Validation::Malformed);
        assert_eq!(svc.validate("not-a-token", at(0)), Validation::Malformed);
        assert_eq!(svc.validate("a.b", at(0)), Validation::Malformed);
        assert_eq!(svc.validate("!!!.???.***", at(0)), Validation::Malformed);
    }

    #[test]
    fn signed_but_unusable_claims_are_malformed() {
        #[derive(Serialize)]
        struct NoSubject {
            exp: i64,
        }

        let key = EncodingKey::from_secret(SECRET);
        let svc = service(3600);

        let missing_sub = encode(&Header::new(ALGORITHM), &NoSubject { exp: 3600 }, &key).unwrap();
        assert_eq!(svc.validate(&missing_sub, at(1)), Validation::Malformed);

        let claims = Claims {
            sub: "alice".into(),
            iat: 0,
            exp: 3600,
        };
        let text_sub = encode(&Header::new(ALGORITHM), &claims, &key).unwrap();
        assert_eq!(svc.validate(&text_sub, at(1)), Validation::Malformed);
    }
}
