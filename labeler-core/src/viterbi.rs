//! O(T*K^2) Viterbi decoding over the transition/emission weight tables.

use crate::error::{Error, Result};
use crate::sequence::Sequence;
use crate::weights::WeightVector;

/// Decodes sequences against a fixed pair of weight tables. `transition`
/// must be `(n_labels + 2) x (n_labels + 2)` (the two extra rows/columns
/// are the reserved START and STOP positions, in that order, both at index
/// `n_labels` and `n_labels + 1`); `emission` must be `n_labels x n_feats`.
pub struct Decoder<'a> {
    pub n_labels: usize,
    pub transition: &'a WeightVector,
    pub emission: &'a WeightVector,
}

impl<'a> Decoder<'a> {
    pub fn new(n_labels: usize, transition: &'a WeightVector, emission: &'a WeightVector) -> Self {
        Decoder {
            n_labels,
            transition,
            emission,
        }
    }

    fn start(&self) -> usize {
        self.n_labels
    }

    fn stop(&self) -> usize {
        self.n_labels + 1
    }

    fn emission_score(&self, features: &[(u32, f64)], label: usize) -> f64 {
        let mut score = 0.0;
        for &(idx, val) in features {
            score += val * self.emission.get(label, idx as usize);
        }
        score
    }

    /// Decodes `seq` in place, writing `pred_label` on every token and
    /// returning the total path score. Ties among equally-scoring labels
    /// (or predecessors) resolve to the lowest index.
    pub fn decode(&self, seq: &mut Sequence) -> Result<f64> {
        let n = seq.len();
        if n == 0 {
            return Err(Error::EmptySequence);
        }
        let k = self.n_labels;

        let mut trellis = vec![vec![f64::NEG_INFINITY; k]; n];
        let mut backptr = vec![vec![0usize; k]; n];

        for l in 0..k {
            trellis[0][l] =
                self.transition.get(self.start(), l) + self.emission_score(&seq.tokens[0].features, l);
        }

        for t in 1..n {
            let feats = &seq.tokens[t].features;
            for l in 0..k {
                let emission = self.emission_score(feats, l);
                let (mut best_prev, mut best_score) = (0usize, f64::NEG_INFINITY);
                for prev in 0..k {
                    let score = trellis[t - 1][prev] + self.transition.get(prev, l);
                    if score > best_score {
                        best_score = score;
                        best_prev = prev;
                    }
                }
                trellis[t][l] = best_score + emission;
                backptr[t][l] = best_prev;
            }
        }

        let (mut best_last, mut best_total) = (0usize, f64::NEG_INFINITY);
        for l in 0..k {
            let score = trellis[n - 1][l] + self.transition.get(l, self.stop());
            if score > best_total {
                best_total = score;
                best_last = l;
            }
        }

        let mut path = vec![0usize; n];
        path[n - 1] = best_last;
        for t in (0..n - 1).rev() {
            path[t] = backptr[t + 1][path[t + 1]];
        }

        for (t, label) in path.into_iter().enumerate() {
            seq.tokens[t].pred_label = Some(label as u32);
            seq.tokens[t].decoded_score = Some(trellis[t][label]);
        }

        Ok(best_total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::Token;

    fn decode_with(
        n_labels: usize,
        transition: &WeightVector,
        emission: &WeightVector,
        features: Vec<Vec<(u32, f64)>>,
    ) -> Sequence {
        let mut seq = Sequence::new(features.into_iter().map(Token::new).collect());
        Decoder::new(n_labels, transition, emission)
            .decode(&mut seq)
            .unwrap();
        seq
    }

    #[test]
    fn all_zero_weights_tie_break_to_lowest_label_index() {
        let transition = WeightVector::new(5, 5, false);
        let emission = WeightVector::new(3, 1, false);
        let seq = decode_with(
            3,
            &transition,
            &emission,
            vec![vec![(0, 1.0)], vec![(0, 1.0)]],
        );
        assert_eq!(seq.tokens[0].pred_label, Some(0));
        assert_eq!(seq.tokens[1].pred_label, Some(0));
    }

    #[test]
    fn decoder_prefers_the_higher_scoring_label() {
        let transition = WeightVector::new(4, 4, false);
        let mut emission = WeightVector::new(2, 1, false);
        emission.update(1, 0, 5.0).unwrap();
        let seq = decode_with(2, &transition, &emission, vec![vec![(0, 1.0)]]);
        assert_eq!(seq.tokens[0].pred_label, Some(1));
    }

    #[test]
    fn decoded_score_matches_the_winning_trellis_cell() {
        let transition = WeightVector::new(4, 4, false);
        let mut emission = WeightVector::new(2, 1, false);
        emission.update(1, 0, 5.0).unwrap();
        let seq = decode_with(2, &transition, &emission, vec![vec![(0, 1.0)]]);
        assert_eq!(seq.tokens[0].decoded_score, Some(5.0));
    }

    #[test]
    fn single_token_sequence_decodes() {
        let transition = WeightVector::new(4, 4, false);
        let emission = WeightVector::new(2, 1, false);
        let seq = decode_with(2, &transition, &emission, vec![vec![(0, 1.0)]]);
        assert_eq!(seq.len(), 1);
        assert!(seq.tokens[0].pred_label.is_some());
    }

    #[test]
    fn empty_sequence_is_rejected() {
        let transition = WeightVector::new(4, 4, false);
        let emission = WeightVector::new(2, 1, false);
        let mut seq = Sequence::new(vec![]);
        let err = Decoder::new(2, &transition, &emission).decode(&mut seq);
        assert!(err.is_err());
    }

    #[test]
    fn decoding_is_idempotent() {
        let transition = WeightVector::new(4, 4, false);
        let mut emission = WeightVector::new(3, 2, false);
        emission.update(2, 1, 3.0).unwrap();
        let mut seq = Sequence::new(vec![Token::new(vec![(1, 1.0)]), Token::new(vec![(0, 1.0)])]);
        let decoder = Decoder::new(3, &transition, &emission);
        let first = decoder.decode(&mut seq).unwrap();
        let second = decoder.decode(&mut seq).unwrap();
        assert_eq!(first, second);
    }
}
