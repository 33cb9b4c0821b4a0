use crate::errors::{RouletteError, RouletteResult, StorageError};
use crate::games::types::VRFBundle;
use crate::storage::TableStore;
use schnorrkel::{ExpansionMode, Keypair, MiniSecretKey, PublicKey, Signature};
use sha2::{Digest, Sha256};
use std::sync::Arc;

const VRF_SIGNING_CONTEXT: &[u8] = b"roulette-spin";
const VRF_SEED_KEY: &[u8] = b"vrf:mini_secret_seed";

/// Signature-derived randomness with a publicly verifiable proof
pub struct VrfEngine {
    keypair: Arc<Keypair>,
}

impl VrfEngine {
    /// Create a new VRF engine with a keypair
    pub fn new(keypair: Keypair) -> Self {
        Self {
            keypair: Arc::new(keypair),
        }
    }

    /// Create a new VRF engine with a random keypair (for testing)
    pub fn new_random() -> Self {
        use rand_core::OsRng;
        let keypair = Keypair::generate_with(OsRng);
        Self::new(keypair)
    }

    /// Create an engine from a 32-byte seed
    pub fn from_seed(seed: &[u8]) -> RouletteResult<Self> {
        let mini = MiniSecretKey::from_bytes(seed)
            .map_err(|e| RouletteError::Entropy(format!("Invalid VRF seed: {:?}", e)))?;
        Ok(Self::new(mini.expand_to_keypair(ExpansionMode::Ed25519)))
    }

    /// Load the seed kept in storage, creating one on first start.
    ///
    /// Keeps the published public key stable across restarts.
    pub fn with_persistent_key(store: &dyn TableStore) -> RouletteResult<Self> {
        if let Some(existing) = store.get_meta(VRF_SEED_KEY)? {
            if existing.len() != 32 {
                return Err(StorageError::CorruptedData("VRF seed must be 32 bytes".to_string()).into());
            }
            return Self::from_seed(&existing);
        }

        use rand_core::OsRng;
        let mini = MiniSecretKey::generate_with(OsRng);
        store.put_meta(VRF_SEED_KEY, &mini.to_bytes())?;
        Ok(Self::new(mini.expand_to_keypair(ExpansionMode::Ed25519)))
    }

    /// Sign `input_message` and derive an output from the signature
    pub fn generate(&self, input_message: &str) -> RouletteResult<VRFBundle> {
        let (vrf_output, vrf_proof) = self.vrf_sign(input_message.as_bytes());

        Ok(VRFBundle {
            vrf_output: hex::encode(vrf_output),
            vrf_proof: hex::encode(vrf_proof),
            public_key: self.public_key_hex(),
            input_message: input_message.to_string(),
        })
    }

    fn vrf_sign(&self, message: &[u8]) -> (Vec<u8>, Vec<u8>) {
        use schnorrkel::context::SigningContext;

        let ctx = SigningContext::new(VRF_SIGNING_CONTEXT);
        let transcript = ctx.bytes(message);
        let signature = self.keypair.sign(transcript);

        // Output is the hash of the signature; the signature is the proof
        let mut hasher = Sha256::new();
        hasher.update(signature.to_bytes());
        let vrf_output = hasher.finalize().to_vec();

        (vrf_output, signature.to_bytes().to_vec())
    }

    /// Map a VRF output uniformly onto `0..bound`.
    ///
    /// Rejection sampling over 64-bit words keeps every pocket equally
    /// likely; a fully rejected block is re-hashed.
    pub fn uniform_from_output(vrf_output: &[u8], bound: u32) -> u32 {
        if bound <= 1 {
            return 0;
        }
        let bound = u64::from(bound);
        let zone = u64::MAX - (u64::MAX % bound);

        let mut block = vrf_output.to_vec();
        loop {
            for chunk in block.chunks_exact(8) {
                let mut word = [0u8; 8];
                word.copy_from_slice(chunk);
                let value = u64::from_le_bytes(word);
                if value < zone {
                    return (value % bound) as u32;
                }
            }
            block = Sha256::digest(&block).to_vec();
        }
    }

    /// Verify a VRF proof (public verification function)
    pub fn verify_vrf_proof(vrf_bundle: &VRFBundle, expected_input: &str) -> RouletteResult<bool> {
        if vrf_bundle.input_message != expected_input {
            return Ok(false);
        }

        let vrf_output = decode_hex("VRF output", &vrf_bundle.vrf_output)?;
        let vrf_proof = decode_hex("VRF proof", &vrf_bundle.vrf_proof)?;
        let public_key_bytes = decode_hex("public key", &vrf_bundle.public_key)?;

        let public_key = PublicKey::from_bytes(&public_key_bytes)
            .map_err(|e| RouletteError::Entropy(format!("Invalid public key: {:?}", e)))?;
        let signature = Signature::from_bytes(&vrf_proof)
            .map_err(|e| RouletteError::Entropy(format!("Invalid signature: {:?}", e)))?;

        use schnorrkel::context::SigningContext;
        let ctx = SigningContext::new(VRF_SIGNING_CONTEXT);
        let transcript = ctx.bytes(expected_input.as_bytes());
        if public_key.verify(transcript, &signature).is_err() {
            return Ok(false);
        }

        let computed_output = Sha256::digest(&vrf_proof);
        Ok(computed_output.as_slice() == vrf_output.as_slice())
    }

    /// Get the public key for this VRF engine
    pub fn public_key(&self) -> Vec<u8> {
        self.keypair.public.to_bytes().to_vec()
    }

    /// Get the public key as hex string
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key())
    }
}

fn decode_hex(what: &str, value: &str) -> RouletteResult<Vec<u8>> {
    hex::decode(value).map_err(|e| RouletteError::Entropy(format!("Invalid {} hex: {}", what, e)))
}
