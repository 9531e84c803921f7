//! AWS Signature Version 4 for JSON-RPC style POST requests
//!
//! Lightsail takes every call as `POST /` with an `X-Amz-Target` header
//! and a JSON body, so only that request shape is supported here.
//!
//! Signed headers, in canonical order:
//!
//! ```text
//! content-type;host;x-amz-date;x-amz-target
//! ```

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const SIGNED_HEADERS: &str = "content-type;host;x-amz-date;x-amz-target";

/// Content type of every Lightsail request
pub const CONTENT_TYPE: &str = "application/x-amz-json-1.1";

/// Static access key pair
#[derive(Clone)]
pub struct Credentials {
    pub access_key_id: String,
    /// ⚠️ NEVER log this value
    pub secret_access_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<REDACTED>")
            .finish()
    }
}

/// One request to be signed
#[derive(Debug)]
pub struct SigningRequest<'a> {
    pub host: &'a str,
    pub target: &'a str,
    pub payload: &'a [u8],
    pub region: &'a str,
    pub service: &'a str,
    pub time: DateTime<Utc>,
}

/// Header values produced by signing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    pub amz_date: String,
    pub authorization: String,
}

pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> anyhow::Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| anyhow::anyhow!("Failed to create HMAC: {e}"))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Derive the per-day signing key
pub fn signing_key(
    secret_access_key: &str,
    date_stamp: &str,
    region: &str,
    service: &str,
) -> anyhow::Result<Vec<u8>> {
    let k_date = hmac_sha256(
        format!("AWS4{secret_access_key}").as_bytes(),
        date_stamp.as_bytes(),
    )?;
    let k_region = hmac_sha256(&k_date, region.as_bytes())?;
    let k_service = hmac_sha256(&k_region, service.as_bytes())?;
    hmac_sha256(&k_service, b"aws4_request")
}

pub fn canonical_request(request: &SigningRequest<'_>, amz_date: &str) -> String {
    format!(
        "POST\n/\n\ncontent-type:{CONTENT_TYPE}\nhost:{}\nx-amz-date:{amz_date}\nx-amz-target:{}\n\n{SIGNED_HEADERS}\n{}",
        request.host,
        request.target,
        sha256_hex(request.payload)
    )
}

fn credential_scope(date_stamp: &str, request: &SigningRequest<'_>) -> String {
    format!(
        "{date_stamp}/{}/{}/aws4_request",
        request.region, request.service
    )
}

pub fn string_to_sign(request: &SigningRequest<'_>, amz_date: &str, scope: &str) -> String {
    format!(
        "{ALGORITHM}\n{amz_date}\n{scope}\n{}",
        sha256_hex(canonical_request(request, amz_date).as_bytes())
    )
}

/// Sign a request and return the headers to attach
pub fn sign(credentials: &Credentials, request: &SigningRequest<'_>) -> anyhow::Result<SignedHeaders> {
    let amz_date = request.time.format("%Y%m%dT%H%M%SZ").to_string();
    let date_stamp = request.time.format("%Y%m%d").to_string();
    let scope = credential_scope(&date_stamp, request);

    let key = signing_key(
        &credentials.secret_access_key,
        &date_stamp,
        request.region,
        request.service,
    )?;
    let signature = hex::encode(hmac_sha256(
        &key,
        string_to_sign(request, &amz_date, &scope).as_bytes(),
    )?);

    Ok(SignedHeaders {
        authorization: format!(
            "{ALGORITHM} Credential={}/{scope}, SignedHeaders={SIGNED_HEADERS}, Signature={signature}",
            credentials.access_key_id
        ),
        amz_date,
    })
}
