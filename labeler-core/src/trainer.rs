//! The epoch loop: decode, update, repeat; average at the end.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::RngCore;

use crate::corruption::Corrupter;
use crate::error::Result;
use crate::sequence::Sequence;
use crate::update::{UpdateRule, DEFAULT_ETA};
use crate::viterbi::Decoder;
use crate::weights::WeightVector;

/// Training hyperparameters not already captured in `UpdateRule`/`Corrupter`.
pub struct TrainerConfig {
    pub n_labels: usize,
    pub passes: usize,
    pub average: bool,
    /// Perceptron learning rate, applied to every emission/transition delta.
    pub eta: f64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        TrainerConfig {
            n_labels: 0,
            passes: 5,
            average: true,
            eta: DEFAULT_ETA,
        }
    }
}

/// Reported once per epoch so the caller (the CLI) can log progress the
/// way the original tool printed `"[{epoch}] train loss={loss:.4f}"`.
#[derive(Debug, Clone, Copy)]
pub struct TrainerProgress {
    pub epoch: usize,
    pub sentences_done: u64,
    pub avg_loss: f64,
}

pub struct Trainer {
    pub config: TrainerConfig,
    pub update_rule: UpdateRule,
    pub corrupter: Option<Box<dyn Corrupter>>,
}

impl Trainer {
    pub fn new(config: TrainerConfig, update_rule: UpdateRule) -> Self {
        Trainer {
            config,
            update_rule,
            corrupter: None,
        }
    }

    /// Runs all configured passes over `train`, mutating `transition` and
    /// `emission` in place. `progress` is called once per epoch;
    /// `cancel`, when set, stops the loop between sequences (not
    /// mid-sequence) the next time it is checked.
    pub fn run(
        &self,
        train: &[Sequence],
        transition: &mut WeightVector,
        emission: &mut WeightVector,
        rng: &mut dyn RngCore,
        cancel: Arc<AtomicBool>,
        mut progress: impl FnMut(TrainerProgress),
    ) -> Result<()> {
        let n_labels = self.config.n_labels;
        let mut n_updates: u64 = 0;

        'epochs: for epoch in 1..=self.config.passes {
            let mut loss_sum = 0.0f64;
            let mut loss_n = 0usize;

            for seq in train {
                if cancel.load(Ordering::Relaxed) {
                    break 'epochs;
                }

                let mut working = seq.clone();
                if let Some(corrupter) = &self.corrupter {
                    corrupter.corrupt(&mut working, &mut *rng);
                }

                let decoder = Decoder::new(n_labels, transition, emission);
                decoder.decode(&mut working)?;

                if self.corrupter.is_some() {
                    // The dropout mask only applies to decoding; the update
                    // step always sees the original, uncorrupted features.
                    for (w, orig) in working.tokens.iter_mut().zip(seq.tokens.iter()) {
                        w.features = orig.features.clone();
                    }
                }

                if let Some(acc) = working.accuracy() {
                    loss_sum += 1.0 - acc;
                    loss_n += 1;
                }

                n_updates += 1;
                self.update_rule.apply(
                    &working,
                    transition,
                    emission,
                    n_labels,
                    self.config.eta,
                    n_updates,
                    &mut RngAdapter(&mut *rng),
                )?;

                if n_updates % 1000 == 0 {
                    progress(TrainerProgress {
                        epoch,
                        sentences_done: n_updates,
                        avg_loss: if loss_n > 0 {
                            loss_sum / loss_n as f64
                        } else {
                            0.0
                        },
                    });
                }
            }

            progress(TrainerProgress {
                epoch,
                sentences_done: n_updates,
                avg_loss: if loss_n > 0 {
                    loss_sum / loss_n as f64
                } else {
                    0.0
                },
            });
        }

        if self.config.average {
            transition.average();
            emission.average();
        }

        Ok(())
    }
}

/// `rand::Rng` requires `Sized`; `UpdateRule::apply` is generic over `Rng`
/// so it can't take `&mut dyn RngCore` directly. This bridges a trait
/// object back into a concrete, `Sized` `Rng` implementation.
struct RngAdapter<'a>(&'a mut dyn RngCore);

impl<'a> RngCore for RngAdapter<'a> {
    fn next_u32(&mut self) -> u32 {
        self.0.next_u32()
    }
    fn next_u64(&mut self) -> u64 {
        self.0.next_u64()
    }
    fn fill_bytes(&mut self, dst: &mut [u8]) {
        self.0.fill_bytes(dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::Token;
    use rand::SeedableRng;

    fn two_label_sequence(gold: u32) -> Sequence {
        let mut tok = Token::new(vec![(0, 1.0)]);
        tok.gold_label = Some(gold);
        Sequence::new(vec![tok])
    }

    #[test]
    fn training_on_a_learnable_example_reduces_loss() {
        let train = vec![two_label_sequence(0), two_label_sequence(0), two_label_sequence(1)];
        let mut transition = WeightVector::new(4, 4, true);
        let mut emission = WeightVector::new(2, 1, true);

        let trainer = Trainer::new(
            TrainerConfig {
                n_labels: 2,
                passes: 5,
                average: false,
                ..Default::default()
            },
            UpdateRule::Plain,
        );

        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        let mut last_loss = 1.0;
        trainer
            .run(
                &train,
                &mut transition,
                &mut emission,
                &mut rng,
                Arc::new(AtomicBool::new(false)),
                |p| last_loss = p.avg_loss,
            )
            .unwrap();

        assert!(last_loss <= 1.0);
        assert_ne!(emission.get(0, 0), 0.0);
    }

    #[test]
    fn cancellation_flag_stops_training_between_sequences() {
        let train = vec![two_label_sequence(0); 10];
        let mut transition = WeightVector::new(4, 4, false);
        let mut emission = WeightVector::new(2, 1, false);
        let trainer = Trainer::new(
            TrainerConfig {
                n_labels: 2,
                passes: 1,
                average: false,
                ..Default::default()
            },
            UpdateRule::Plain,
        );
        let cancel = Arc::new(AtomicBool::new(true));
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        trainer
            .run(&train, &mut transition, &mut emission, &mut rng, cancel, |_| {})
            .unwrap();
        assert_eq!(emission.get(0, 0), 0.0);
    }

    #[test]
    fn one_pass_at_eta_one_tenth_moves_weights_by_exactly_eta() {
        // A single mistaken token (gold=1, decoder ties to label 0 on zero
        // weights) should move its two touched cells by exactly +-eta,
        // matching the spec's worked update-magnitude example.
        let mut seq = two_label_sequence(1);
        seq.tokens[0].features = vec![(0, 1.0)];
        let train = vec![seq];

        let mut transition = WeightVector::new(4, 4, false);
        let mut emission = WeightVector::new(2, 1, false);

        let trainer = Trainer::new(
            TrainerConfig {
                n_labels: 2,
                passes: 1,
                average: false,
                eta: 0.1,
            },
            UpdateRule::Plain,
        );

        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        trainer
            .run(&train, &mut transition, &mut emission, &mut rng, Arc::new(AtomicBool::new(false)), |_| {})
            .unwrap();

        assert!((emission.get(1, 0) - 0.1).abs() < 1e-9);
        assert!((emission.get(0, 0) - (-0.1)).abs() < 1e-9);

        let decoder = Decoder::new(2, &transition, &emission);
        let mut replay = Sequence::new(vec![Token::new(vec![(0, 1.0)])]);
        decoder.decode(&mut replay).unwrap();
        assert_eq!(replay.tokens[0].pred_label, Some(1));
    }
}
