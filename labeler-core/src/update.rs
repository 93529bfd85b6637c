//! Perceptron weight updates: plain mistake-driven, cost-sensitive sampled,
//! and confusion-scaled. All three share the same emission/transition delta
//! plumbing; they differ only in which competing label is demoted and
//! whether the delta is rescaled.

use rand::Rng;

use crate::error::Result;
use crate::sequence::Sequence;
use crate::weights::WeightVector;

/// A closed set of update strategies, selected once per training run from
/// the CLI's `--cost-sensitive` / `--confusion-scaling` flags.
pub enum UpdateRule {
    Plain,
    CostSensitiveSampled,
    /// `C[gold][pred]` scales the emission delta only; transitions are
    /// never confusion-scaled.
    ConfusionScaled(Vec<Vec<f64>>),
}

/// The structured perceptron's default step size (spec section 4.G).
pub const DEFAULT_ETA: f64 = 0.1;

impl UpdateRule {
    /// Applies one step's worth of updates to `transition`/`emission` for
    /// the already-decoded `seq`, advancing both weight vectors' tick
    /// counter to `n_updates`. `eta` is the perceptron's learning rate.
    pub fn apply<R: Rng>(
        &self,
        seq: &Sequence,
        transition: &mut WeightVector,
        emission: &mut WeightVector,
        n_labels: usize,
        eta: f64,
        n_updates: u64,
        rng: &mut R,
    ) -> Result<()> {
        let start = n_labels;
        let stop = n_labels + 1;

        let mut prev_gold = start;
        let mut prev_pred = start;

        for tok in &seq.tokens {
            // Cost-sensitive mode drives the update from the sampled label
            // costs rather than `gold_label`: the parser leaves
            // `gold_label` unset whenever a token carries a real cost list
            // (two or more `label:cost` entries), so sampling has to stand
            // in for it rather than run only after a gold label is found.
            let sampled_gold = match self {
                UpdateRule::CostSensitiveSampled if tok.label_costs.len() >= 2 => {
                    sample_cost_sensitive_gold(&tok.label_costs, rng)
                }
                _ => None,
            };
            let Some(gold) = sampled_gold.or_else(|| tok.gold_label.map(|g| g as usize)) else {
                prev_gold = prev_pred;
                continue;
            };
            let pred = tok.pred_label.map(|p| p as usize).unwrap_or(gold);

            let importance = tok.importance_weight;
            let scale = match self {
                UpdateRule::ConfusionScaled(matrix) => matrix
                    .get(gold)
                    .and_then(|row| row.get(pred))
                    .copied()
                    .unwrap_or(1.0),
                _ => 1.0,
            };

            if pred != gold {
                for &(idx, val) in &tok.features {
                    emission.update(gold, idx as usize, eta * importance * scale * val)?;
                    emission.update(pred, idx as usize, -eta * importance * scale * val)?;
                }
            }

            if (prev_gold, gold) != (prev_pred, pred) {
                transition.update(prev_gold, gold, eta * importance)?;
                transition.update(prev_pred, pred, -eta * importance)?;
            }

            prev_gold = gold;
            prev_pred = pred;
        }

        if prev_gold != prev_pred {
            transition.update(prev_gold, stop, eta)?;
            transition.update(prev_pred, stop, -eta)?;
        }

        transition.advance(n_updates)?;
        emission.advance(n_updates)?;
        Ok(())
    }
}

/// Samples a stand-in "gold" label from a token's cost-sensitive label
/// costs, weighted so cheaper labels are picked more often:
/// `w_k = c_max - c_k + eps`, `eps` keeping the most expensive label's
/// weight strictly positive.
fn sample_cost_sensitive_gold<R: Rng>(label_costs: &[(u32, f64)], rng: &mut R) -> Option<usize> {
    const EPS: f64 = 1e-6;
    let c_max = label_costs
        .iter()
        .map(|(_, cost)| *cost)
        .fold(f64::NEG_INFINITY, f64::max);
    let weights: Vec<(usize, f64)> = label_costs
        .iter()
        .map(|(label, cost)| (*label as usize, c_max - cost + EPS))
        .collect();
    if weights.is_empty() {
        return None;
    }
    let total: f64 = weights.iter().map(|(_, w)| w).sum();
    let mut draw = rng.random::<f64>() * total;
    for (label, weight) in &weights {
        draw -= weight;
        if draw <= 0.0 {
            return Some(*label);
        }
    }
    weights.last().map(|(label, _)| *label)
}
