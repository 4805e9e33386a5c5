//! HTTPS client for the signed release manifest.
//!
//! The artifact repository serves `manifest.json`, an envelope holding a
//! base64 targets document and a set of detached Ed25519 signatures over the
//! raw document bytes. A document is accepted when at least `threshold`
//! distinct trusted keys verify, it has not expired, and its version never
//! moves backwards. The full target map is re-read wholesale on every
//! accepted update; updates do not say which entries changed.

use std::collections::{HashMap, HashSet};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use ed25519_dalek::{Signature, VerifyingKey};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::debug;

use super::{FetchOutcome, TrustedSource};
use crate::error::TrustError;
use crate::snapshot::{FileMeta, TargetSnapshot};

const SHA512_LEN: usize = 64;

#[derive(Debug, Deserialize)]
struct ManifestEnvelope {
    payload: String,
    signatures: Vec<ManifestSignature>,
}

#[derive(Debug, Deserialize)]
struct ManifestSignature {
    keyid: String,
    sig: String,
}

#[derive(Debug, Deserialize)]
struct TargetsDocument {
    version: u64,
    expires: DateTime<Utc>,
    targets: HashMap<String, TargetEntry>,
}

#[derive(Debug, Deserialize)]
struct TargetEntry {
    sha512: String,
    length: u64,
}

impl TargetsDocument {
    fn into_snapshot(self) -> Result<TargetSnapshot, TrustError> {
        let mut targets = HashMap::with_capacity(self.targets.len());
        for (name, entry) in self.targets {
            let sha512 = hex::decode(&entry.sha512).map_err(|err| {
                TrustError::Transient(format!("target {name} carries a malformed digest: {err}"))
            })?;
            if sha512.len() != SHA512_LEN {
                return Err(TrustError::Transient(format!(
                    "target {name} digest is {} bytes, expected {SHA512_LEN}",
                    sha512.len()
                )));
            }
            targets.insert(
                name,
                FileMeta {
                    sha512,
                    length: entry.length,
                },
            );
        }
        Ok(TargetSnapshot::new(self.version, targets))
    }
}

/// Production [`TrustedSource`] backed by a signed manifest over HTTPS.
#[derive(Debug)]
pub struct ManifestSource {
    http: reqwest::Client,
    manifest_url: String,
    keys: HashMap<String, VerifyingKey>,
    threshold: usize,
    current: Mutex<Option<TargetSnapshot>>,
}

impl ManifestSource {
    /// Parses the trust material and builds the client.
    ///
    /// `root_keys` is a JSON array of hex-encoded 32-byte Ed25519 public
    /// keys. `threshold` is the number of distinct keys that must sign each
    /// manifest; `None` requires all of them. Any defect in the material is
    /// an [`TrustError::Initialization`] and must abort startup.
    pub fn new(
        source_url: &str,
        root_keys: &str,
        threshold: Option<usize>,
    ) -> Result<Self, TrustError> {
        let encoded: Vec<String> = serde_json::from_str(root_keys).map_err(|err| {
            TrustError::Initialization(format!(
                "root keys are not a JSON array of hex strings: {err}"
            ))
        })?;
        if encoded.is_empty() {
            return Err(TrustError::Initialization("no root keys provided".into()));
        }

        let mut keys = HashMap::with_capacity(encoded.len());
        for hex_key in &encoded {
            let raw = hex::decode(hex_key).map_err(|err| {
                TrustError::Initialization(format!("root key {hex_key} is not hex: {err}"))
            })?;
            let raw: [u8; 32] = raw.as_slice().try_into().map_err(|_| {
                TrustError::Initialization(format!("root key {hex_key} is not 32 bytes"))
            })?;
            let key = VerifyingKey::from_bytes(&raw).map_err(|err| {
                TrustError::Initialization(format!("root key {hex_key} is invalid: {err}"))
            })?;
            keys.insert(key_id(&key), key);
        }

        let threshold = threshold.unwrap_or(keys.len());
        if threshold == 0 || threshold > keys.len() {
            return Err(TrustError::Initialization(format!(
                "signature threshold {threshold} outside 1..={}",
                keys.len()
            )));
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!("downlink/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| {
                TrustError::Initialization(format!("failed to build http client: {err}"))
            })?;

        Ok(Self {
            http,
            manifest_url: format!("{}/manifest.json", source_url.trim_end_matches('/')),
            keys,
            threshold,
            current: Mutex::new(None),
        })
    }

    /// Decodes, signature-checks, and expiry-checks one manifest body.
    fn verify_manifest(&self, body: &[u8]) -> Result<TargetsDocument, TrustError> {
        let envelope: ManifestEnvelope = serde_json::from_slice(body)
            .map_err(|err| TrustError::Transient(format!("manifest is not valid JSON: {err}")))?;
        let payload = BASE64.decode(&envelope.payload).map_err(|err| {
            TrustError::Transient(format!("manifest payload is not valid base64: {err}"))
        })?;

        let mut satisfied: HashSet<&str> = HashSet::new();
        for signature in &envelope.signatures {
            let Some(key) = self.keys.get(signature.keyid.as_str()) else {
                continue;
            };
            let Ok(raw) = hex::decode(&signature.sig) else {
                continue;
            };
            let Ok(sig) = Signature::from_slice(&raw) else {
                continue;
            };
            if key.verify_strict(&payload, &sig).is_ok() {
                satisfied.insert(signature.keyid.as_str());
            }
        }
        if satisfied.len() < self.threshold {
            return Err(TrustError::Transient(format!(
                "manifest carries {} valid signatures, {} required",
                satisfied.len(),
                self.threshold
            )));
        }

        let document: TargetsDocument = serde_json::from_slice(&payload).map_err(|err| {
            TrustError::Transient(format!("signed targets document is malformed: {err}"))
        })?;
        if document.expires <= Utc::now() {
            return Err(TrustError::Transient(format!(
                "manifest expired at {}",
                document.expires
            )));
        }
        Ok(document)
    }
}

#[async_trait::async_trait]
impl TrustedSource for ManifestSource {
    async fn update(&self) -> Result<FetchOutcome, TrustError> {
        let body = self
            .http
            .get(&self.manifest_url)
            .send()
            .await
            .map_err(|err| TrustError::Transient(format!("manifest request failed: {err}")))?
            .error_for_status()
            .map_err(|err| TrustError::Transient(format!("manifest request failed: {err}")))?
            .bytes()
            .await
            .map_err(|err| TrustError::Transient(format!("manifest read failed: {err}")))?;

        let document = self.verify_manifest(&body)?;

        let mut current = self.current.lock().await;
        match current.as_ref().map(TargetSnapshot::version) {
            Some(held) if document.version == held => {
                debug!(version = held, "manifest unchanged");
                Ok(FetchOutcome::Unchanged)
            }
            Some(held) if document.version < held => Err(TrustError::Transient(format!(
                "manifest version went backwards: held {held}, fetched {}",
                document.version
            ))),
            _ => {
                let snapshot = document.into_snapshot()?;
                debug!(
                    version = snapshot.version(),
                    targets = snapshot.len(),
                    "verified new manifest"
                );
                *current = Some(snapshot.clone());
                Ok(FetchOutcome::Updated(snapshot))
            }
        }
    }

    async fn current_targets(&self) -> Result<TargetSnapshot, TrustError> {
        self.current
            .lock()
            .await
            .clone()
            .ok_or_else(|| TrustError::Transient("no verified snapshot loaded yet".into()))
    }
}

fn key_id(key: &VerifyingKey) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}
