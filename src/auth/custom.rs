//! Custom signing methods
//!
//! A [`CustomAuthMethod`] is a named, versioned strategy with its own config
//! schema. The per-call payload *is* the method config; it is deserialised
//! into the method's typed config struct, so validation and defaulting
//! happen in one step.
//!
//! Built-ins:
//! - `aws_sigv4`: AWS Signature V4 style header stamping. This is a
//!   simplified placeholder: it stamps the credential scope and date but does
//!   not build or sign a canonical request.
//! - `hmac`: HMAC signature over a timestamp (or a fixed literal)
//! - `jwt`: self-signed HMAC JWT minted per request

use crate::error::{Error, Result};
use crate::types::{JsonObject, JsonValue, StringMap};
use chrono::Utc;
use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha1::Sha1;
use sha2::{Sha256, Sha512};
use std::fmt;

/// A named signing strategy resolvable through `AuthFactory`
pub trait CustomAuthMethod: Send + Sync + fmt::Debug {
    /// Registry key
    fn name(&self) -> &str;

    /// Human-readable description
    fn description(&self) -> &str;

    /// Method version, bumped when the produced headers change
    fn version(&self) -> &str {
        "1"
    }

    /// JSON-schema style description of the expected config
    fn config_schema(&self) -> JsonValue;

    /// Validate `config` against the method's schema
    fn validate_config(&self, config: &JsonValue) -> Result<()>;

    /// Apply the method to `headers`
    fn authenticate(&self, headers: StringMap, config: &JsonValue) -> Result<StringMap>;

    /// Sign arbitrary data, for methods that support it
    fn sign(&self, _data: &str, _config: &JsonValue) -> Result<String> {
        Err(Error::signing(format!(
            "{} does not support data signing",
            self.name()
        )))
    }
}

/// Deserialize a method config, reporting the offending field path
fn parse_config<T: DeserializeOwned>(config: &JsonValue) -> Result<T> {
    serde_path_to_error::deserialize(config).map_err(|err| {
        let path = err.path().to_string();
        Error::invalid_value(path, err.into_inner().to_string())
    })
}

// ============================================================================
// HMAC primitives
// ============================================================================

/// Hash function used for HMAC signatures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HashAlgorithm {
    #[serde(rename = "SHA-1")]
    Sha1,
    #[default]
    #[serde(rename = "SHA-256")]
    Sha256,
    #[serde(rename = "SHA-512")]
    Sha512,
}

fn mac_bytes<M: Mac + KeyInit>(secret: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac = <M as KeyInit>::new_from_slice(secret)
        .map_err(|e| Error::signing(format!("invalid HMAC key: {e}")))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Hex-encoded HMAC of `data` under `secret`
pub fn hmac_hex(algorithm: HashAlgorithm, secret: &str, data: &str) -> Result<String> {
    let secret = secret.as_bytes();
    let data = data.as_bytes();
    let bytes = match algorithm {
        HashAlgorithm::Sha1 => mac_bytes::<Hmac<Sha1>>(secret, data)?,
        HashAlgorithm::Sha256 => mac_bytes::<Hmac<Sha256>>(secret, data)?,
        HashAlgorithm::Sha512 => mac_bytes::<Hmac<Sha512>>(secret, data)?,
    };
    Ok(hex::encode(bytes))
}

// ============================================================================
// AWS Signature V4 (simplified)
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AwsConfig {
    access_key_id: String,
    secret_access_key: String,
    region: String,
    service: String,
    #[serde(default)]
    session_token: Option<String>,
}

/// AWS SigV4-style credential stamping
#[derive(Debug, Clone, Default)]
pub struct AwsSignatureV4Method;

impl CustomAuthMethod for AwsSignatureV4Method {
    fn name(&self) -> &str {
        "aws_sigv4"
    }

    fn description(&self) -> &str {
        "AWS Signature Version 4 style credential headers (simplified, no canonical request)"
    }

    fn config_schema(&self) -> JsonValue {
        json!({
            "type": "object",
            "required": ["accessKeyId", "secretAccessKey", "region", "service"],
            "properties": {
                "accessKeyId": {"type": "string"},
                "secretAccessKey": {"type": "string"},
                "region": {"type": "string"},
                "service": {"type": "string"},
                "sessionToken": {"type": "string"}
            }
        })
    }

    fn validate_config(&self, config: &JsonValue) -> Result<()> {
        parse_config::<AwsConfig>(config).map(|_| ())
    }

    fn authenticate(&self, mut headers: StringMap, config: &JsonValue) -> Result<StringMap> {
        let cfg: AwsConfig = parse_config(config)?;
        let now = Utc::now();
        let timestamp = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date = now.format("%Y%m%d");

        headers.insert(
            "Authorization".to_string(),
            format!(
                "AWS4-HMAC-SHA256 Credential={}/{date}/{}/{}/aws4_request",
                cfg.access_key_id, cfg.region, cfg.service
            ),
        );
        headers.insert("X-Amz-Date".to_string(), timestamp);
        if let Some(token) = cfg.session_token {
            headers.insert("X-Amz-Security-Token".to_string(), token);
        }
        Ok(headers)
    }

    fn sign(&self, data: &str, config: &JsonValue) -> Result<String> {
        let cfg: AwsConfig = parse_config(config)?;
        hmac_hex(HashAlgorithm::Sha256, &cfg.secret_access_key, data)
    }
}

// ============================================================================
// HMAC
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HmacConfig {
    secret: String,
    #[serde(default)]
    algorithm: HashAlgorithm,
    #[serde(default = "default_signature_header")]
    header_name: String,
    #[serde(default = "default_true")]
    include_timestamp: bool,
    #[serde(default = "default_timestamp_header")]
    timestamp_header: String,
}

fn default_signature_header() -> String {
    "X-HMAC-Signature".to_string()
}

fn default_timestamp_header() -> String {
    "X-Timestamp".to_string()
}

fn default_true() -> bool {
    true
}

/// Literal signed when no timestamp is included
const HMAC_FIXED_PAYLOAD: &str = "request";

/// HMAC signature header over a millisecond timestamp
#[derive(Debug, Clone, Default)]
pub struct HmacAuthMethod;

impl CustomAuthMethod for HmacAuthMethod {
    fn name(&self) -> &str {
        "hmac"
    }

    fn description(&self) -> &str {
        "HMAC-based authentication with customizable algorithm and header names"
    }

    fn config_schema(&self) -> JsonValue {
        json!({
            "type": "object",
            "required": ["secret"],
            "properties": {
                "secret": {"type": "string"},
                "algorithm": {"enum": ["SHA-1", "SHA-256", "SHA-512"], "default": "SHA-256"},
                "headerName": {"type": "string", "default": "X-HMAC-Signature"},
                "includeTimestamp": {"type": "boolean", "default": true},
                "timestampHeader": {"type": "string", "default": "X-Timestamp"}
            }
        })
    }

    fn validate_config(&self, config: &JsonValue) -> Result<()> {
        parse_config::<HmacConfig>(config).map(|_| ())
    }

    fn authenticate(&self, mut headers: StringMap, config: &JsonValue) -> Result<StringMap> {
        let cfg: HmacConfig = parse_config(config)?;

        if cfg.include_timestamp {
            let timestamp = Utc::now().timestamp_millis().to_string();
            let signature = hmac_hex(cfg.algorithm, &cfg.secret, &timestamp)?;
            headers.insert(cfg.header_name, signature);
            headers.insert(cfg.timestamp_header, timestamp);
        } else {
            let signature = hmac_hex(cfg.algorithm, &cfg.secret, HMAC_FIXED_PAYLOAD)?;
            headers.insert(cfg.header_name, signature);
        }
        Ok(headers)
    }

    fn sign(&self, data: &str, config: &JsonValue) -> Result<String> {
        let cfg: HmacConfig = parse_config(config)?;
        hmac_hex(cfg.algorithm, &cfg.secret, data)
    }
}

// ============================================================================
// JWT
// ============================================================================

/// HMAC algorithms available for self-signed JWTs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum JwtHmacAlgorithm {
    #[default]
    HS256,
    HS512,
}

impl JwtHmacAlgorithm {
    fn hash(self) -> HashAlgorithm {
        match self {
            JwtHmacAlgorithm::HS256 => HashAlgorithm::Sha256,
            JwtHmacAlgorithm::HS512 => HashAlgorithm::Sha512,
        }
    }
}

impl From<JwtHmacAlgorithm> for Algorithm {
    fn from(alg: JwtHmacAlgorithm) -> Self {
        match alg {
            JwtHmacAlgorithm::HS256 => Algorithm::HS256,
            JwtHmacAlgorithm::HS512 => Algorithm::HS512,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JwtConfig {
    secret: String,
    #[serde(default)]
    algorithm: JwtHmacAlgorithm,
    #[serde(default = "default_jwt_lifetime")]
    expires_in: i64,
    #[serde(default)]
    issuer: Option<String>,
    #[serde(default)]
    audience: Option<String>,
    #[serde(default)]
    payload: Option<JsonObject>,
}

fn default_jwt_lifetime() -> i64 {
    3600
}

/// Mints a short-lived HMAC-signed JWT and sends it as a bearer token
#[derive(Debug, Clone, Default)]
pub struct JwtAuthMethod;

impl JwtAuthMethod {
    fn generate(&self, cfg: &JwtConfig) -> Result<String> {
        let now = Utc::now().timestamp();
        let mut claims = cfg.payload.clone().unwrap_or_default();
        claims.insert("iat".to_string(), json!(now));
        claims.insert("exp".to_string(), json!(now + cfg.expires_in));
        if let Some(issuer) = &cfg.issuer {
            claims.insert("iss".to_string(), json!(issuer));
        }
        if let Some(audience) = &cfg.audience {
            claims.insert("aud".to_string(), json!(audience));
        }

        let header = Header::new(cfg.algorithm.into());
        let key = EncodingKey::from_secret(cfg.secret.as_bytes());
        encode(&header, &claims, &key)
            .map_err(|e| Error::signing(format!("Failed to encode JWT: {e}")))
    }
}

impl CustomAuthMethod for JwtAuthMethod {
    fn name(&self) -> &str {
        "jwt"
    }

    fn description(&self) -> &str {
        "JSON Web Token authentication for API requests"
    }

    fn config_schema(&self) -> JsonValue {
        json!({
            "type": "object",
            "required": ["secret"],
            "properties": {
                "secret": {"type": "string"},
                "algorithm": {"enum": ["HS256", "HS512"], "default": "HS256"},
                "expiresIn": {"type": "integer", "default": 3600},
                "issuer": {"type": "string"},
                "audience": {"type": "string"},
                "payload": {"type": "object"}
            }
        })
    }

    fn validate_config(&self, config: &JsonValue) -> Result<()> {
        parse_config::<JwtConfig>(config).map(|_| ())
    }

    fn authenticate(&self, mut headers: StringMap, config: &JsonValue) -> Result<StringMap> {
        let cfg: JwtConfig = parse_config(config)?;
        let token = self.generate(&cfg)?;
        headers.insert("Authorization".to_string(), format!("Bearer {token}"));
        Ok(headers)
    }

    fn sign(&self, data: &str, config: &JsonValue) -> Result<String> {
        let cfg: JwtConfig = parse_config(config)?;
        hmac_hex(cfg.algorithm.hash(), &cfg.secret, data)
    }
}
