//! Feature corruption (dropout) strategies used to regularize training.

use rand::RngCore;

use crate::sequence::Sequence;

/// A strategy for zeroing out a subset of a token's active features before
/// it is decoded and updated on, for one training pass.
pub trait Corrupter {
    fn corrupt(&self, seq: &mut Sequence, rng: &mut dyn RngCore);
}

/// Drops each active feature independently with probability `p`, matching
/// the `--drop-out` flag's documented behavior (p = 0.1 by default).
pub struct BinomialCorruption {
    pub p: f64,
}

impl BinomialCorruption {
    pub fn new(p: f64) -> Self {
        BinomialCorruption { p }
    }
}

impl Corrupter for BinomialCorruption {
    fn corrupt(&self, seq: &mut Sequence, rng: &mut dyn RngCore) {
        for tok in &mut seq.tokens {
            tok.features
                .retain(|_| (rng.next_u32() as f64 / u32::MAX as f64) >= self.p);
        }
    }
}

/// Drops features by sampling a replacement index from a caller-supplied
/// distribution rather than zeroing, simulating unseen-feature noise.
pub struct RecycledDistributionCorruption<F: Fn(&mut dyn RngCore) -> u32> {
    pub p: f64,
    pub sampler: F,
}

impl<F: Fn(&mut dyn RngCore) -> u32> Corrupter for RecycledDistributionCorruption<F> {
    fn corrupt(&self, seq: &mut Sequence, rng: &mut dyn RngCore) {
        for tok in &mut seq.tokens {
            for feat in &mut tok.features {
                if (rng.next_u32() as f64 / u32::MAX as f64) < self.p {
                    feat.0 = (self.sampler)(rng);
                }
            }
        }
    }
}

/// Drops the features with the largest-magnitude current weight for the
/// gold label, the adversarial variant: always attacks what the model
/// currently relies on most instead of sampling uniformly.
pub struct AdversarialCorruption<'a> {
    pub p: f64,
    pub emission: &'a crate::weights::WeightVector,
}

impl<'a> Corrupter for AdversarialCorruption<'a> {
    fn corrupt(&self, seq: &mut Sequence, rng: &mut dyn RngCore) {
        for tok in &mut seq.tokens {
            let Some(gold) = tok.gold_label else { continue };
            let threshold = {
                let mut weights: Vec<f64> = tok
                    .features
                    .iter()
                    .map(|&(idx, _)| self.emission.get(gold as usize, idx as usize).abs())
                    .collect();
                weights.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
                let cutoff = ((weights.len() as f64) * self.p).ceil() as usize;
                weights.get(cutoff.saturating_sub(1)).copied().unwrap_or(0.0)
            };
            let _ = rng.next_u32();
            tok.features
                .retain(|&(idx, _)| self.emission.get(gold as usize, idx as usize).abs() < threshold);
        }
    }
}
