//! Signed request verification
//!
//! A caller's identity is the hex-encoded ed25519 public key that signed the
//! request. Each signer carries a strictly sequential nonce (last + 1), so a
//! captured request cannot be replayed.

use crate::errors::{RouletteError, RouletteResult};
use crate::games::types::{Address, TableAction};
use dashmap::DashMap;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};

const SIGNING_DOMAIN: &str = "roulette-request-v1";

/// Identity fields attached to every mutating request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignedEnvelope {
    /// Hex public key, or a plain address when signatures are disabled
    pub signer: String,
    #[serde(default)]
    pub nonce: u64,
    #[serde(default)]
    pub signature: Option<String>,
}

#[derive(Serialize)]
struct SigningPayload<'a> {
    domain: &'static str,
    table_id: &'a str,
    nonce: u64,
    action: &'a TableAction,
}

/// Canonical bytes a client signs for `action` on `table_id`
pub fn signing_message(table_id: &str, action: &TableAction, nonce: u64) -> RouletteResult<Vec<u8>> {
    let payload = SigningPayload {
        domain: SIGNING_DOMAIN,
        table_id,
        nonce,
        action,
    };
    Ok(serde_json::to_vec(&payload)?)
}

/// Client-side helper producing a ready-to-send envelope
pub fn sign_request(
    key: &SigningKey,
    table_id: &str,
    action: &TableAction,
    nonce: u64,
) -> RouletteResult<SignedEnvelope> {
    let message = signing_message(table_id, action, nonce)?;
    let signature = key.sign(&message);

    Ok(SignedEnvelope {
        signer: hex::encode(key.verifying_key().as_bytes()),
        nonce,
        signature: Some(hex::encode(signature.to_bytes())),
    })
}

pub struct RequestAuthenticator {
    require_signatures: bool,
    last_nonce: DashMap<String, u64>,
}

impl RequestAuthenticator {
    pub fn new(require_signatures: bool) -> Self {
        Self {
            require_signatures,
            last_nonce: DashMap::new(),
        }
    }

    pub fn requires_signatures(&self) -> bool {
        self.require_signatures
    }

    /// Next nonce `signer` must use
    pub fn next_nonce(&self, signer: &str) -> u64 {
        self.last_nonce.get(signer).map(|n| *n).unwrap_or(0) + 1
    }

    /// Resolve the caller of a request, verifying signature and nonce when
    /// signatures are required. The nonce is consumed once the signature
    /// checks out, whatever the outcome of the operation itself.
    pub fn authenticate(
        &self,
        table_id: &str,
        action: &TableAction,
        envelope: &SignedEnvelope,
    ) -> RouletteResult<Address> {
        if envelope.signer.is_empty() {
            return Err(RouletteError::InvalidSignature("missing signer".to_string()));
        }
        if !self.require_signatures {
            return Ok(Address::new(envelope.signer.clone()));
        }

        let verifying_key = parse_verifying_key(&envelope.signer)?;
        let signature = parse_signature(envelope.signature.as_deref())?;

        // Entry guard serializes concurrent requests from the same signer
        let mut last = self.last_nonce.entry(envelope.signer.clone()).or_insert(0);
        let expected = *last + 1;
        if envelope.nonce != expected {
            return Err(RouletteError::StaleNonce {
                expected,
                actual: envelope.nonce,
            });
        }

        let message = signing_message(table_id, action, envelope.nonce)?;
        verifying_key
            .verify(&message, &signature)
            .map_err(|_| RouletteError::InvalidSignature("signature does not match request".to_string()))?;

        *last = envelope.nonce;
        Ok(Address::new(envelope.signer.clone()))
    }
}

fn parse_verifying_key(signer: &str) -> RouletteResult<VerifyingKey> {
    let bytes = hex::decode(signer)
        .map_err(|e| RouletteError::InvalidSignature(format!("signer is not hex: {}", e)))?;
    let bytes: [u8; 32] = bytes
        .try_into()
        .map_err(|_| RouletteError::InvalidSignature("signer must be 32 bytes".to_string()))?;
    VerifyingKey::from_bytes(&bytes)
        .map_err(|e| RouletteError::InvalidSignature(format!("invalid public key: {}", e)))
}

fn parse_signature(signature: Option<&str>) -> RouletteResult<Signature> {
    let signature = signature.ok_or_else(|| RouletteError::InvalidSignature("missing signature".to_string()))?;
    let bytes = hex::decode(signature)
        .map_err(|e| RouletteError::InvalidSignature(format!("signature is not hex: {}", e)))?;
    let bytes: [u8; 64] = bytes
        .try_into()
        .map_err(|_| RouletteError::InvalidSignature("signature must be 64 bytes".to_string()))?;
    Ok(Signature::from_bytes(&bytes))
}
