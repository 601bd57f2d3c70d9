//! Provable fairness for crash rounds.
//!
//! Every round is committed before betting opens: the house draws a fresh
//! seed, chains in the previous round's revealed seed and publishes the
//! SHA-256 commitment. At run start the seed is unsealed and the crash point
//! derived from it; at crash the seed is revealed together with a schnorrkel
//! signature so anyone can recompute the outcome.

use crate::{
    config::FairnessConfig,
    errors::{ConfigurationError, CrashResult, FairnessError},
    games::types::{Commitment, Multiplier, RoundId, Seed, SeedReveal},
};
use dashmap::DashMap;
use rand::{rngs::StdRng, RngCore, SeedableRng};
use rand_core::OsRng;
use schnorrkel::{signing_context, ExpansionMode, Keypair, MiniSecretKey, PublicKey, Signature};
use sha2::{Digest, Sha256};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

const COMMIT_DOMAIN: &[u8] = b"crashpoint:commit:v1";
const CRASH_DOMAIN: &[u8] = b"crashpoint:crash:v1";
const REVEAL_SIGNING_CONTEXT: &[u8] = b"crashpoint-reveal";

/// Significant bits of the crash hash
const HASH_BITS: u32 = 52;

/// Policy parameters of the crash-point distribution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrashDistribution {
    /// One in `instant_crash_divisor` rounds crashes at 1.00x
    pub instant_crash_divisor: u64,
    pub max_multiplier: Multiplier,
}

impl CrashDistribution {
    /// Probability mass reserved for the house
    pub fn house_edge(&self) -> f64 {
        1.0 / self.instant_crash_divisor as f64
    }
}

impl Default for CrashDistribution {
    fn default() -> Self {
        Self {
            instant_crash_divisor: 33,
            max_multiplier: Multiplier::from_hundredths(100_000_000),
        }
    }
}

/// Commitment over the round id, the chained previous seed and the new seed
pub fn commitment_for(round_id: RoundId, previous_seed: &Seed, seed: &Seed) -> Commitment {
    let mut hasher = Sha256::new();
    hasher.update(COMMIT_DOMAIN);
    hasher.update(round_id.to_be_bytes());
    hasher.update(previous_seed.as_bytes());
    hasher.update(seed.as_bytes());
    Commitment(hasher.finalize().into())
}

/// Deterministic crash point for a seed and round id
pub fn crash_point_for(seed: &Seed, round_id: RoundId, distribution: &CrashDistribution) -> Multiplier {
    let mut hasher = Sha256::new();
    hasher.update(CRASH_DOMAIN);
    hasher.update(seed.as_bytes());
    hasher.update(round_id.to_be_bytes());
    let digest = hasher.finalize();

    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    let h = u64::from_be_bytes(head) >> (64 - HASH_BITS);

    if h % distribution.instant_crash_divisor.max(1) == 0 {
        return Multiplier::ONE;
    }

    let e: u128 = 1u128 << HASH_BITS;
    let h = h as u128;
    let hundredths = (Multiplier::SCALE as u128 * e - h) / (e - h);
    let hundredths = u64::try_from(hundredths).unwrap_or(u64::MAX);

    Multiplier::from_hundredths(hundredths.max(Multiplier::SCALE)).min(distribution.max_multiplier)
}

/// Check a reveal against its commitment and derive the crash point
pub fn resolve(
    commitment: &Commitment,
    reveal: &SeedReveal,
    distribution: &CrashDistribution,
) -> Result<Multiplier, FairnessError> {
    if commitment_for(reveal.round_id, &reveal.previous_seed, &reveal.seed) != *commitment {
        return Err(FairnessError::CommitmentMismatch {
            round_id: reveal.round_id,
        });
    }
    Ok(crash_point_for(&reveal.seed, reveal.round_id, distribution))
}

fn reveal_message(round_id: RoundId, commitment: &Commitment, seed: &Seed) -> Vec<u8> {
    let mut message = Vec::with_capacity(8 + 32 + 32);
    message.extend_from_slice(&round_id.to_be_bytes());
    message.extend_from_slice(commitment.as_bytes());
    message.extend_from_slice(seed.as_bytes());
    message
}

/// Third-party verification: house signature plus commitment and crash point
pub fn verify_reveal(
    public_key: &[u8],
    commitment: &Commitment,
    reveal: &SeedReveal,
    distribution: &CrashDistribution,
) -> Result<Multiplier, FairnessError> {
    let public_key =
        PublicKey::from_bytes(public_key).map_err(|e| FairnessError::InvalidPublicKey(format!("{:?}", e)))?;
    let signature_bytes =
        hex::decode(&reveal.signature).map_err(|e| FairnessError::MalformedHex(e.to_string()))?;
    let signature = Signature::from_bytes(&signature_bytes).map_err(|_| FairnessError::InvalidSignature)?;

    let ctx = signing_context(REVEAL_SIGNING_CONTEXT);
    let message = reveal_message(reveal.round_id, commitment, &reveal.seed);
    public_key
        .verify(ctx.bytes(&message), &signature)
        .map_err(|_| FairnessError::InvalidSignature)?;

    resolve(commitment, reveal, distribution)
}

/// Secret half of a commitment, held until run start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedSeed {
    pub seed: Seed,
    pub previous_seed: Seed,
    pub commitment: Commitment,
}

/// Storage for sealed seeds between commit and reveal
pub trait SeedVault: Send + Sync {
    fn seal(&self, round_id: RoundId, sealed: SealedSeed);

    /// Remove and return the sealed seed; `None` if it was lost
    fn unseal(&self, round_id: RoundId) -> Option<SealedSeed>;
}

/// In-process vault; seeds do not survive a restart
#[derive(Default)]
pub struct MemorySeedVault {
    sealed: DashMap<RoundId, SealedSeed>,
}

impl MemorySeedVault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sealed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sealed.is_empty()
    }
}

impl SeedVault for MemorySeedVault {
    fn seal(&self, round_id: RoundId, sealed: SealedSeed) {
        self.sealed.insert(round_id, sealed);
    }

    fn unseal(&self, round_id: RoundId) -> Option<SealedSeed> {
        self.sealed.remove(&round_id).map(|(_, sealed)| sealed)
    }
}

/// Source of fresh round seeds
pub trait EntropySource: Send + Sync {
    fn next_seed(&self, round_id: RoundId) -> Seed;
}

/// Operating-system randomness
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn next_seed(&self, _round_id: RoundId) -> Seed {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        Seed(bytes)
    }
}

/// Reproducible seed stream for simulations and local replays
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
    fn next_seed(&self, _round_id: RoundId) -> Seed {
        let mut bytes = [0u8; 32];
        self.rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .fill_bytes(&mut bytes);
        Seed(bytes)
    }
}

/// Replays a fixed queue of seeds, then falls back to OS randomness.
/// Used to re-run recorded rounds.
pub struct ScriptedEntropy {
    queue: Mutex<VecDeque<Seed>>,
}

impl ScriptedEntropy {
    pub fn new(seeds: impl IntoIterator<Item = Seed>) -> Self {
        Self {
            queue: Mutex::new(seeds.into_iter().collect()),
        }
    }
}

impl EntropySource for ScriptedEntropy {
    fn next_seed(&self, round_id: RoundId) -> Seed {
        let next = self.queue.lock().unwrap_or_else(PoisonError::into_inner).pop_front();
        next.unwrap_or_else(|| OsEntropy.next_seed(round_id))
    }
}

/// Issues commitments and reveals for consecutive rounds
pub struct SeedGenerator {
    keypair: Keypair,
    vault: Arc<dyn SeedVault>,
    entropy: Arc<dyn EntropySource>,
    distribution: CrashDistribution,
    /// Last revealed seed, chained into the next commitment
    chain_tip: Mutex<Seed>,
}

impl SeedGenerator {
    pub fn new(
        keypair: Keypair,
        vault: Arc<dyn SeedVault>,
        entropy: Arc<dyn EntropySource>,
        distribution: CrashDistribution,
    ) -> Self {
        Self {
            keypair,
            vault,
            entropy,
            distribution,
            chain_tip: Mutex::new(Seed::ZERO),
        }
    }

    /// Random house key, in-memory vault, OS entropy
    pub fn new_random(distribution: CrashDistribution) -> Self {
        let keypair = MiniSecretKey::generate_with(OsRng).expand_to_keypair(ExpansionMode::Ed25519);
        Self::new(
            keypair,
            Arc::new(MemorySeedVault::new()),
            Arc::new(OsEntropy),
            distribution,
        )
    }

    pub fn from_config(config: &FairnessConfig) -> CrashResult<Self> {
        let keypair = match &config.signing_seed_hex {
            Some(seed_hex) => keypair_from_hex(seed_hex)?,
            None => MiniSecretKey::generate_with(OsRng).expand_to_keypair(ExpansionMode::Ed25519),
        };
        let entropy: Arc<dyn EntropySource> = match config.deterministic_entropy {
            Some(seed) => Arc::new(SeededEntropy::new(seed)),
            None => Arc::new(OsEntropy),
        };
        Ok(Self::new(
            keypair,
            Arc::new(MemorySeedVault::new()),
            entropy,
            config.distribution(),
        ))
    }

    /// Draw and seal a seed for `round_id`, returning the public commitment
    pub fn commit(&self, round_id: RoundId) -> Commitment {
        let seed = self.entropy.next_seed(round_id);
        let previous_seed = *self.chain_tip.lock().unwrap_or_else(PoisonError::into_inner);
        let commitment = commitment_for(round_id, &previous_seed, &seed);

        self.vault.seal(
            round_id,
            SealedSeed {
                seed,
                previous_seed,
                commitment,
            },
        );

        tracing::debug!("Committed round {} to {}", round_id, commitment);
        commitment
    }

    /// Unseal and sign the seed for `round_id`
    pub fn reveal(&self, round_id: RoundId) -> Result<SeedReveal, FairnessError> {
        let sealed = self
            .vault
            .unseal(round_id)
            .ok_or(FairnessError::SeedUnavailable { round_id })?;

        if commitment_for(round_id, &sealed.previous_seed, &sealed.seed) != sealed.commitment {
            return Err(FairnessError::CommitmentMismatch { round_id });
        }

        let ctx = signing_context(REVEAL_SIGNING_CONTEXT);
        let message = reveal_message(round_id, &sealed.commitment, &sealed.seed);
        let signature = self.keypair.sign(ctx.bytes(&message));

        *self.chain_tip.lock().unwrap_or_else(PoisonError::into_inner) = sealed.seed;

        Ok(SeedReveal {
            round_id,
            seed: sealed.seed,
            previous_seed: sealed.previous_seed,
            signature: hex::encode(signature.to_bytes()),
        })
    }

    pub fn distribution(&self) -> &CrashDistribution {
        &self.distribution
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.keypair.public.to_bytes()
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key())
    }
}

fn keypair_from_hex(seed_hex: &str) -> CrashResult<Keypair> {
    let invalid = |reason: String| ConfigurationError::InvalidValue {
        field: "fairness.signing_seed_hex".to_string(),
        value: "<redacted>".to_string(),
        reason,
    };

    let bytes = hex::decode(seed_hex.trim()).map_err(|e| invalid(e.to_string()))?;
    let mini = MiniSecretKey::from_bytes(&bytes).map_err(|e| invalid(format!("{:?}", e)))?;
    Ok(mini.expand_to_keypair(ExpansionMode::Ed25519))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Vault that loses everything it is given, as after a crash before reveal
    struct AmnesiacVault;

    impl SeedVault for AmnesiacVault {
        fn seal(&self, _round_id: RoundId, _sealed: SealedSeed) {}

        fn unseal(&self, _round_id: RoundId) -> Option<SealedSeed> {
            None
        }
    }

    fn generator() -> SeedGenerator {
        SeedGenerator::new_random(CrashDistribution::default())
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let distribution = CrashDistribution::default();
        let seed = Seed([42u8; 32]);
        let reveal = SeedReveal {
            round_id: 9,
            seed,
            previous_seed: Seed::ZERO,
            signature: String::new(),
        };
        let commitment = commitment_for(9, &Seed::ZERO, &seed);

        let first = resolve(&commitment, &reveal, &distribution).unwrap();
        let second = resolve(&commitment, &reveal, &distribution).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, crash_point_for(&seed, 9, &distribution));
    }

    #[test]
    fn test_round_id_changes_outcome_input() {
        let seed = Seed([1u8; 32]);
        assert_ne!(commitment_for(1, &Seed::ZERO, &seed), commitment_for(2, &Seed::ZERO, &seed));
    }

    #[test]
    fn test_commit_reveal_verify() {
        let seeds = generator();
        let commitment = seeds.commit(1);
        let reveal = seeds.reveal(1).expect("reveal");

        assert_eq!(reveal.round_id, 1);
        assert_eq!(reveal.previous_seed, Seed::ZERO);

        let crash = verify_reveal(&seeds.public_key(), &commitment, &reveal, seeds.distribution())
            .expect("verification");
        assert!(crash >= Multiplier::ONE);
    }

    #[test]
    fn test_reveal_chains_previous_seed() {
        let seeds = generator();
        seeds.commit(1);
        let first = seeds.reveal(1).unwrap();
        let commitment = seeds.commit(2);
        let second = seeds.reveal(2).unwrap();

        assert_eq!(second.previous_seed, first.seed);
        assert!(resolve(&commitment, &second, seeds.distribution()).is_ok());
    }

    #[test]
    fn test_reveal_is_single_use() {
        let seeds = generator();
        seeds.commit(5);
        assert!(seeds.reveal(5).is_ok());
        assert_eq!(
            seeds.reveal(5).unwrap_err(),
            FairnessError::SeedUnavailable { round_id: 5 }
        );
    }

    #[test]
    fn test_tampered_seed_detected() {
        let seeds = generator();
        let commitment = seeds.commit(3);
        let mut reveal = seeds.reveal(3).unwrap();
        reveal.seed = Seed([0xff; 32]);

        assert_eq!(
            resolve(&commitment, &reveal, seeds.distribution()).unwrap_err(),
            FairnessError::CommitmentMismatch { round_id: 3 }
        );
    }

    #[test]
    fn test_foreign_signature_rejected() {
        let seeds = generator();
        let other = generator();
        let commitment = seeds.commit(4);
        let reveal = seeds.reveal(4).unwrap();

        assert_eq!(
            verify_reveal(&other.public_key(), &commitment, &reveal, seeds.distribution()).unwrap_err(),
            FairnessError::InvalidSignature
        );
    }

    #[test]
    fn test_lost_seed_is_unavailable() {
        let seeds = SeedGenerator::new(
            MiniSecretKey::generate_with(OsRng).expand_to_keypair(ExpansionMode::Ed25519),
            Arc::new(AmnesiacVault),
            Arc::new(OsEntropy),
            CrashDistribution::default(),
        );
        seeds.commit(1);
        assert_eq!(seeds.reveal(1).unwrap_err(), FairnessError::SeedUnavailable { round_id: 1 });
    }

    #[test]
    fn test_seeded_entropy_reproducible() {
        let a = SeededEntropy::new(77);
        let b = SeededEntropy::new(77);
        assert_eq!(a.next_seed(1), b.next_seed(1));
        assert_eq!(a.next_seed(2), b.next_seed(2));
    }

    #[test]
    fn test_scripted_entropy_replays_then_falls_back() {
        let entropy = ScriptedEntropy::new([Seed([1u8; 32]), Seed([2u8; 32])]);
        assert_eq!(entropy.next_seed(1), Seed([1u8; 32]));
        assert_eq!(entropy.next_seed(2), Seed([2u8; 32]));
        assert_ne!(entropy.next_seed(3), Seed([2u8; 32]));
    }

    #[test]
    fn test_distribution_shape() {
        let distribution = CrashDistribution::default();
        let entropy = SeededEntropy::new(2024);
        let samples = 10_000;

        let mut instant = 0;
        let mut at_least_double = 0;
        for round_id in 0..samples {
            let crash = crash_point_for(&entropy.next_seed(round_id), round_id, &distribution);
            assert!(crash >= Multiplier::ONE);
            assert!(crash <= distribution.max_multiplier);
            if crash == Multiplier::ONE {
                instant += 1;
            }
            if crash >= Multiplier::from_hundredths(200) {
                at_least_double += 1;
            }
        }

        let instant_rate = instant as f64 / samples as f64;
        let double_rate = at_least_double as f64 / samples as f64;
        assert!((0.02..0.06).contains(&instant_rate), "instant rate {}", instant_rate);
        assert!((0.44..0.53).contains(&double_rate), "2x rate {}", double_rate);
    }

    #[test]
    fn test_keypair_from_config_is_stable() {
        let config = FairnessConfig {
            signing_seed_hex: Some("11".repeat(32)),
            ..Default::default()
        };
        let a = SeedGenerator::from_config(&config).unwrap();
        let b = SeedGenerator::from_config(&config).unwrap();
        assert_eq!(a.public_key_hex(), b.public_key_hex());

        let bad = FairnessConfig {
            signing_seed_hex: Some("zz".to_string()),
            ..Default::default()
        };
        assert!(SeedGenerator::from_config(&bad).is_err());
    }
}
