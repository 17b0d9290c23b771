use jsonwebtoken::{
    decode, decode_header, errors::ErrorKind, Algorithm, DecodingKey, Validation,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::{collections::HashSet, fs, path::Path};
use thiserror::Error;
use tracing::debug;

lazy_static! {
    static ref BEARER_JWT: Regex =
        Regex::new(r"^Bearer [A-Za-z0-9_=-]+\.[A-Za-z0-9_=-]+\.?[A-Za-z0-9_.+/=-]*$")
            .expect("bearer token pattern is valid");
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("No authentication token provided")]
    MissingToken,
    #[error("Invalid authentication token provided")]
    MalformedToken,
    #[error("Unsupported Token signature algorithm")]
    UnsupportedAlgorithm,
    #[error("Token not signed correctly")]
    InvalidSignature,
    #[error("Token expired")]
    Expired,
    #[error("Token missing room claim")]
    MissingRoomClaim,
}

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("Failed to read public key {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("Invalid RSA public key: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),
}

#[derive(Debug, Deserialize)]
struct TokenClaims {
    room: Option<String>,
    name: Option<String>,
}

/// Identity carried by a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub room: String,
    pub name: Option<String>,
}

/// Verifies RS256 signed bearer tokens against a fixed public key.
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn from_rsa_pem(pem: &[u8]) -> Result<Self, KeyError> {
        let key = DecodingKey::from_rsa_pem(pem)?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.required_spec_claims = HashSet::new();
        validation.validate_aud = false;

        Ok(Self { key, validation })
    }

    pub fn from_file(path: &Path) -> Result<Self, KeyError> {
        let pem = fs::read(path).map_err(|source| KeyError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_rsa_pem(&pem)
    }

    /// Checks a complete `Authorization` header value and returns the identity it carries.
    pub fn verify(&self, authorization: Option<&str>) -> Result<VerifiedToken, AuthError> {
        let authorization = authorization.ok_or(AuthError::MissingToken)?;
        if !BEARER_JWT.is_match(authorization) {
            return Err(AuthError::MalformedToken);
        }
        let token = authorization
            .strip_prefix("Bearer ")
            .ok_or(AuthError::MalformedToken)?;

        let header = decode_header(token).map_err(|_| AuthError::MalformedToken)?;
        if header.alg != Algorithm::RS256 {
            return Err(AuthError::UnsupportedAlgorithm);
        }

        let claims = decode::<TokenClaims>(token, &self.key, &self.validation)
            .map_err(|err| {
                debug!(?err, "Rejected token");
                match err.kind() {
                    ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                    ErrorKind::ExpiredSignature => AuthError::Expired,
                    ErrorKind::InvalidAlgorithm => AuthError::UnsupportedAlgorithm,
                    _ => AuthError::MalformedToken,
                }
            })?
            .claims;

        let room = claims.room.ok_or(AuthError::MissingRoomClaim)?;
        Ok(VerifiedToken {
            room,
            name: claims.name,
        })
    }
}
