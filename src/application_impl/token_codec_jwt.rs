use crate::application_port::{SessionError, TokenCodec, TokenError};
use crate::domain_model::Principal;
use crate::domain_port::Clock;
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    sub: String,
    auth: Vec<String>,
    iat: i64,
    exp: i64,
    jti: String, // keeps two tokens minted in the same second distinct
}

/// HMAC-SHA512 signed JWTs carrying subject, authorities and expiry.
///
/// Expiry is checked against the injected clock with no leeway:
/// a token is expired once `now >= exp`.
pub struct JwtHs512Codec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    clock: Arc<dyn Clock>,
}

impl JwtHs512Codec {
    pub fn new(signing_key: &[u8], clock: Arc<dyn Clock>) -> Self {
        let mut validation = Validation::new(Algorithm::HS512);
        // expiry is compared against `clock` below
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        JwtHs512Codec {
            encoding_key: EncodingKey::from_secret(signing_key),
            decoding_key: DecodingKey::from_secret(signing_key),
            validation,
            clock,
        }
    }

    #[inline]
    fn gen_jti() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    fn decode_claims(&self, token: &str) -> Result<SessionClaims, TokenError> {
        let data = decode::<SessionClaims>(token, &self.decoding_key, &self.validation).map_err(
            |e| match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    TokenError::BadSignature
                }
                _ => TokenError::Malformed,
            },
        )?;
        if data.claims.sub.is_empty() {
            return Err(TokenError::Malformed);
        }
        Ok(data.claims)
    }

    fn to_principal(claims: SessionClaims) -> Principal {
        Principal::new(claims.sub, claims.auth)
    }
}

impl TokenCodec for JwtHs512Codec {
    fn issue(
        &self,
        principal: &Principal,
        ttl: Duration,
    ) -> Result<(String, DateTime<Utc>), SessionError> {
        let iat_dt = self.clock.now();
        let exp_dt = iat_dt + ttl;
        let claims = SessionClaims {
            sub: principal.subject_id.0.clone(),
            auth: principal.authorities.iter().cloned().collect(),
            iat: iat_dt.timestamp(),
            exp: exp_dt.timestamp(),
            jti: Self::gen_jti(),
        };
        let token = encode(&Header::new(Algorithm::HS512), &claims, &self.encoding_key)
            .map_err(|e| SessionError::InternalError(e.to_string()))?;
        Ok((token, exp_dt))
    }

    fn parse_and_verify(&self, token: &str) -> Result<Principal, TokenError> {
        let claims = self.decode_claims(token)?;
        if self.clock.now().timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }
        Ok(Self::to_principal(claims))
    }

    fn parse_ignoring_expiry(&self, token: &str) -> Result<Principal, TokenError> {
        self.decode_claims(token).map(Self::to_principal)
    }
}
