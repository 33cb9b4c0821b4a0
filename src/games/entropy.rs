//! Entropy capabilities for the result generator
//!
//! The table only asks for `next_uniform(37)`; where the number comes from
//! is injected. `VrfEntropy` additionally returns a proof that anyone can
//! check against the published public key.

use crate::errors::{RouletteError, RouletteResult};
use crate::games::types::VRFBundle;
use crate::games::vrf_engine::VrfEngine;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::sync::Mutex;

/// A single draw in `0..bound`, with an optional fairness proof
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntropyDraw {
    pub value: u32,
    pub proof: Option<VRFBundle>,
}

impl EntropyDraw {
    pub fn plain(value: u32) -> Self {
        Self { value, proof: None }
    }
}

/// Opaque source of uniformly distributed values
pub trait EntropySource: Send + Sync {
    /// Draw a value in `0..bound`. `context` identifies what the draw is for
    /// and is bound into proofs when the source produces them.
    fn next_uniform(&self, bound: u32, context: &str) -> RouletteResult<EntropyDraw>;

    /// Short label for logs
    fn name(&self) -> &'static str;
}

/// Provably fair draws from a persistent VRF key
pub struct VrfEntropy {
    engine: VrfEngine,
}

impl VrfEntropy {
    pub fn new(engine: VrfEngine) -> Self {
        Self { engine }
    }

    pub fn public_key_hex(&self) -> String {
        self.engine.public_key_hex()
    }
}

impl EntropySource for VrfEntropy {
    fn next_uniform(&self, bound: u32, context: &str) -> RouletteResult<EntropyDraw> {
        let bundle = self.engine.generate(context)?;
        let output = hex::decode(&bundle.vrf_output)
            .map_err(|e| RouletteError::Entropy(format!("VRF decode failed: {}", e)))?;
        let value = VrfEngine::uniform_from_output(&output, bound);

        Ok(EntropyDraw {
            value,
            proof: Some(bundle),
        })
    }

    fn name(&self) -> &'static str {
        "vrf"
    }
}

/// Operating-system randomness, no proof
#[derive(Default)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn next_uniform(&self, bound: u32, _context: &str) -> RouletteResult<EntropyDraw> {
        if bound == 0 {
            return Err(RouletteError::Entropy("bound must be positive".to_string()));
        }
        Ok(EntropyDraw::plain(rand::thread_rng().gen_range(0..bound)))
    }

    fn name(&self) -> &'static str {
        "os"
    }
}

/// Reproducible sequence from a fixed seed (simulations, load tests)
pub struct SeededEntropy {
    rng: Mutex<StdRng>,
}

impl SeededEntropy {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl EntropySource for SeededEntropy {
    fn next_uniform(&self, bound: u32, _context: &str) -> RouletteResult<EntropyDraw> {
        if bound == 0 {
            return Err(RouletteError::Entropy("bound must be positive".to_string()));
        }
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| RouletteError::Internal("seeded entropy lock poisoned".to_string()))?;
        Ok(EntropyDraw::plain(rng.gen_range(0..bound)))
    }

    fn name(&self) -> &'static str {
        "seeded"
    }
}

/// Scripted draws for deterministic tests.
///
/// Values are returned in order; the last one repeats once the script runs out.
pub struct FixedEntropy {
    values: Mutex<VecDeque<u32>>,
    last: Mutex<u32>,
}

impl FixedEntropy {
    pub fn new(values: impl IntoIterator<Item = u32>) -> Self {
        let values: VecDeque<u32> = values.into_iter().collect();
        let last = values.back().copied().unwrap_or(0);
        Self {
            values: Mutex::new(values),
            last: Mutex::new(last),
        }
    }

    pub fn constant(value: u32) -> Self {
        Self::new([value])
    }
}

impl EntropySource for FixedEntropy {
    fn next_uniform(&self, _bound: u32, _context: &str) -> RouletteResult<EntropyDraw> {
        let mut values = self.values.lock().map_err(poisoned)?;
        let mut last = self.last.lock().map_err(poisoned)?;

        if let Some(next) = values.pop_front() {
            *last = next;
        }
        Ok(EntropyDraw::plain(*last))
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

fn poisoned<T>(_: T) -> RouletteError {
    RouletteError::Internal("fixed entropy lock poisoned".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_entropy_follows_script() {
        let entropy = FixedEntropy::new([3, 0, 36]);

        assert_eq!(entropy.next_uniform(37, "a").unwrap().value, 3);
        assert_eq!(entropy.next_uniform(37, "b").unwrap().value, 0);
        assert_eq!(entropy.next_uniform(37, "c").unwrap().value, 36);
        assert_eq!(entropy.next_uniform(37, "d").unwrap().value, 36);
    }

    #[test]
    fn test_seeded_entropy_is_reproducible() {
        let a = SeededEntropy::new(42);
        let b = SeededEntropy::new(42);

        for _ in 0..20 {
            let x = a.next_uniform(37, "").unwrap().value;
            assert_eq!(x, b.next_uniform(37, "").unwrap().value);
            assert!(x < 37);
        }
    }

    #[test]
    fn test_os_entropy_covers_range() {
        let entropy = OsEntropy;
        let mut seen = [false; 37];
        for _ in 0..5_000 {
            let v = entropy.next_uniform(37, "").unwrap().value;
            seen[v as usize] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn test_vrf_entropy_attaches_verifiable_proof() {
        let entropy = VrfEntropy::new(VrfEngine::new_random());

        let draw = entropy.next_uniform(37, "table:QWER123").unwrap();
        let proof = draw.proof.expect("vrf draws carry a proof");

        assert!(draw.value < 37);
        assert_eq!(proof.public_key, entropy.public_key_hex());
        assert!(VrfEngine::verify_vrf_proof(&proof, "table:QWER123").unwrap());

        let output = hex::decode(&proof.vrf_output).unwrap();
        assert_eq!(VrfEngine::uniform_from_output(&output, 37), draw.value);
    }
}
