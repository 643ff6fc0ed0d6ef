//! Object-storage adapter for the archive task — an S3-compatible PUT uploader signed
//! with AWS Signature Version 4, so MinIO, S3, and compatible providers all work
//! against the same bucket/access-key/secret-key settings triad.

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum ObjectStorageError {
    #[error("object storage not configured: {0}")]
    NotConfigured(String),
    #[error("upload failed: {0}")]
    UploadFailed(String),
}

#[derive(Debug, Clone)]
pub struct ObjectStorageConfig {
    pub endpoint: String,
    pub region: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
}

impl ObjectStorageConfig {
    pub fn is_configured(&self) -> bool {
        !self.bucket.is_empty() && !self.access_key.is_empty() && !self.secret_key.is_empty()
    }
}

#[derive(Clone)]
pub struct ObjectStorage {
    http: reqwest::Client,
    config: ObjectStorageConfig,
}

impl ObjectStorage {
    pub fn new(config: ObjectStorageConfig) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(60))
                .build()
                .expect("failed to build object storage HTTP client"),
            config,
        }
    }

    /// Uploads `body` to `key` under the configured bucket and date-scoped prefix,
    /// returning the fully-qualified object key on success.
    pub async fn put_object(&self, key: &str, body: Vec<u8>) -> Result<String, ObjectStorageError> {
        if !self.config.is_configured() {
            return Err(ObjectStorageError::NotConfigured("object storage credentials are not set".to_string()));
        }

        let date_prefix = Utc::now().format("%Y/%m/%d").to_string();
        let object_key = format!("{date_prefix}/{key}");
        let url = format!("{}/{}/{}", self.config.endpoint.trim_end_matches('/'), self.config.bucket, object_key);

        let now = Utc::now();
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date_stamp = now.format("%Y%m%d").to_string();
        let payload_hash = hex::encode(Sha256::digest(&body));
        let host = self
            .config
            .endpoint
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .to_string();

        let canonical_headers = format!(
            "host:{host}\nx-amz-content-sha256:{payload_hash}\nx-amz-date:{amz_date}\n"
        );
        let signed_headers = "host;x-amz-content-sha256;x-amz-date";
        let canonical_request = format!(
            "PUT\n/{bucket}/{object_key}\n\n{canonical_headers}\n{signed_headers}\n{payload_hash}",
            bucket = self.config.bucket,
        );

        let scope = format!("{date_stamp}/{}/s3/aws4_request", self.config.region);
        let string_to_sign = format!(
            "AWS4-HMAC-SHA256\n{amz_date}\n{scope}\n{}",
            hex::encode(Sha256::digest(canonical_request.as_bytes()))
        );

        let signature = self.sign(&date_stamp, &string_to_sign)?;
        let authorization = format!(
            "AWS4-HMAC-SHA256 Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
            self.config.access_key
        );

        let resp = self
            .http
            .put(&url)
            .header("x-amz-date", amz_date)
            .header("x-amz-content-sha256", payload_hash)
            .header("Authorization", authorization)
            .body(body)
            .send()
            .await
            .map_err(|e| ObjectStorageError::UploadFailed(e.to_string()))?;

        if resp.status().is_success() {
            Ok(object_key)
        } else {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            Err(ObjectStorageError::UploadFailed(format!("{status}: {text}")))
        }
    }

    fn sign(&self, date_stamp: &str, string_to_sign: &str) -> Result<String, ObjectStorageError> {
        let hmac_err = |_| ObjectStorageError::UploadFailed("invalid HMAC key length".to_string());

        let k_date = hmac_sha256(format!("AWS4{}", self.config.secret_key).as_bytes(), date_stamp.as_bytes()).map_err(hmac_err)?;
        let k_region = hmac_sha256(&k_date, self.config.region.as_bytes()).map_err(hmac_err)?;
        let k_service = hmac_sha256(&k_region, b"s3").map_err(hmac_err)?;
        let k_signing = hmac_sha256(&k_service, b"aws4_request").map_err(hmac_err)?;
        let signature = hmac_sha256(&k_signing, string_to_sign.as_bytes()).map_err(hmac_err)?;
        Ok(hex::encode(signature))
    }
}

fn hmac_sha256(key: &[u8], message: &[u8]) -> Result<Vec<u8>, hmac::digest::InvalidLength> {
    let mut mac = HmacSha256::new_from_slice(key)?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_storage_is_detected() {
        let config = ObjectStorageConfig {
            endpoint: "https://s3.example.com".to_string(),
            region: "us-east-1".to_string(),
            bucket: String::new(),
            access_key: String::new(),
            secret_key: String::new(),
        };
        assert!(!config.is_configured());
    }

    #[test]
    fn hmac_sha256_is_deterministic() {
        let a = hmac_sha256(b"key", b"message").unwrap();
        let b = hmac_sha256(b"key", b"message").unwrap();
        assert_eq!(a, b);
    }
}
