//! The token/sequence records the decoder and trainer operate over.

/// A single labeled (or to-be-labeled) position in a sequence.
#[derive(Debug, Clone)]
pub struct Token {
    /// External id printed back out in the predictions file, if the input
    /// line carried one (`'id` token in the VW format).
    pub id: Option<String>,
    /// Sparse feature vector: `(feature_index, value)` pairs. Duplicate
    /// indices are additive, matching VW semantics.
    pub features: Vec<(u32, f64)>,
    /// Gold label index, or `None` when unlabeled (a pure test-time token).
    pub gold_label: Option<u32>,
    /// Cost-sensitive label costs, `(label_index, cost)`, in input order.
    /// Empty when the line carried no cost-sensitive annotation.
    pub label_costs: Vec<(u32, f64)>,
    /// Per-token importance weight; `1.0` when the input didn't specify one.
    pub importance_weight: f64,
    /// Filled in by the decoder.
    pub pred_label: Option<u32>,
    /// The Viterbi trellis score of `pred_label` at this position, i.e. the
    /// best partial path score ending in that label. Filled in by the
    /// decoder alongside `pred_label`.
    pub decoded_score: Option<f64>,
}

impl Token {
    pub fn new(features: Vec<(u32, f64)>) -> Self {
        Token {
            id: None,
            features,
            gold_label: None,
            label_costs: Vec::new(),
            importance_weight: 1.0,
            pred_label: None,
            decoded_score: None,
        }
    }
}

/// An ordered run of tokens decoded and trained on as a unit.
#[derive(Debug, Clone, Default)]
pub struct Sequence {
    pub tokens: Vec<Token>,
    /// Position in the source file, for diagnostics only.
    pub name: Option<String>,
}

impl Sequence {
    pub fn new(tokens: Vec<Token>) -> Self {
        Sequence { tokens, name: None }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Fraction of tokens whose predicted label matches the gold label.
    /// Tokens without a gold label are excluded from both numerator and
    /// denominator.
    pub fn accuracy(&self) -> Option<f64> {
        let mut correct = 0usize;
        let mut total = 0usize;
        for tok in &self.tokens {
            if let Some(gold) = tok.gold_label {
                total += 1;
                if tok.pred_label == Some(gold) {
                    correct += 1;
                }
            }
        }
        if total == 0 {
            None
        } else {
            Some(correct as f64 / total as f64)
        }
    }
}
