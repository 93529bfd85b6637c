mod cli;
mod confusion;
mod input;
mod labels;
mod logging;
mod output;

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::panic;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use rand::SeedableRng;
use rayon::prelude::*;

use labeler_core::{Decoder, FeatureMap, Trainer, TrainerConfig, UpdateRule};

use cli::Args;
use input::{read_vw_seq, ReadOptions};
use labels::LabelTable;
use output::Settings;

fn main() -> Result<()> {
    install_panic_hook();
    logging::init();

    let args = Args::parse();
    if let Err(err) = run(args) {
        tracing::error!("{err:#}");
        std::process::exit(1);
    }
    Ok(())
}

fn install_panic_hook() {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        tracing::error!("panic: {info}");
        default_hook(info);
        std::process::exit(2);
    }));
}

fn run(args: Args) -> Result<()> {
    if args.train.is_none() && args.test.is_none() {
        anyhow::bail!("must specify either --train or --test");
    }
    tracing::info!(?args, "tagger started");

    let mut feat_map = match args.hash_bits {
        Some(bits) => FeatureMap::hashing(bits),
        None => FeatureMap::interning(),
    };

    let mut labels = match &args.labels {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading labels file {}", path.display()))?;
            LabelTable::from_fixed(text.lines().map(|s| s.trim().to_string()).collect())
        }
        None => LabelTable::new(),
    };

    let mut loaded = None;
    if let Some(initial) = &args.initial_model {
        let model = output::load_model(initial)
            .with_context(|| format!("loading initial model from {}", initial.display()))?;
        labels = LabelTable::from_fixed(model.labels.clone());
        if let Some(names) = &model.feature_names {
            let mut interning = feature_map::interning_from_names(names);
            interning.freeze();
            feat_map = FeatureMap::Interning(interning);
        }
        loaded = Some(model);
    }

    let read_opts = ReadOptions {
        ignore: args.ignore.clone(),
        quadratic: args.quadratic.clone(),
        require_labels: false,
        audit: args.audit,
    };

    let mut train_opts = read_opts.clone();
    train_opts.require_labels = true;

    let train = match &args.train {
        Some(path) => {
            let file =
                BufReader::new(File::open(path).with_context(|| format!("opening {}", path.display()))?);
            let seqs = read_vw_seq(file, &mut feat_map, &mut labels, &train_opts)?;
            tracing::info!(sentences = seqs.len(), labels = labels.len(), "training data loaded");

            if args.cost_sensitive && !seqs.iter().any(|s| s.tokens.iter().any(|t| !t.label_costs.is_empty())) {
                anyhow::bail!("--cost-sensitive requested but no training token carries label costs");
            }

            Some(seqs)
        }
        None => None,
    };

    // Prevents new features/labels from being introduced once reading the
    // test set: a test-time label absent from the training model is a
    // semantic error (spec §7), not a silent addition to the label space.
    feat_map.freeze();
    if args.train.is_some() || args.initial_model.is_some() || args.labels.is_some() {
        labels.freeze();
    }

    let test = match &args.test {
        Some(path) => {
            let file =
                BufReader::new(File::open(path).with_context(|| format!("opening {}", path.display()))?);
            let seqs = read_vw_seq(file, &mut feat_map, &mut labels, &read_opts)
                .context("labels in test set not present in the training model")?;
            tracing::info!(sentences = seqs.len(), "test data loaded");
            Some(seqs)
        }
        None => None,
    };

    let n_labels = labels.len();
    anyhow::ensure!(n_labels > 0, "no labels found in training or test data");

    let (mut transition, mut emission) = match loaded {
        Some(model) => {
            let expected_transition = (n_labels + 2, n_labels + 2);
            if model.transition.dims() != expected_transition {
                return Err(labeler_core::Error::DimensionMismatch {
                    expected: expected_transition,
                    found: model.transition.dims(),
                }
                .into());
            }
            let expected_emission = (n_labels, feat_map.n_feats());
            if model.emission.dims() != expected_emission {
                return Err(labeler_core::Error::DimensionMismatch {
                    expected: expected_emission,
                    found: model.emission.dims(),
                }
                .into());
            }
            (model.transition, model.emission)
        }
        None => (
            labeler_core::WeightVector::new(n_labels + 2, n_labels + 2, args.ada_grad),
            labeler_core::WeightVector::new(n_labels, feat_map.n_feats(), args.ada_grad),
        ),
    };
    tracing::info!(
        transition_dims = ?transition.dims(),
        emission_dims = ?emission.dims(),
        "weight vector sizes"
    );

    let update_rule = if let Some(path) = &args.confusion_scaling {
        let matrix = confusion::load_confusion_matrix(path, &labels)?;
        tracing::info!("confusion scaling matrix loaded for {} labels", n_labels);
        UpdateRule::ConfusionScaled(matrix)
    } else if args.cost_sensitive {
        UpdateRule::CostSensitiveSampled
    } else {
        UpdateRule::Plain
    };

    let mut rng = rand::rngs::StdRng::seed_from_u64(0xC0FFEE);

    if let Some(train) = &train {
        let mut trainer = Trainer::new(
            TrainerConfig {
                n_labels,
                passes: args.passes,
                average: args.average,
                ..Default::default()
            },
            update_rule,
        );
        if args.drop_out {
            trainer.corrupter = Some(Box::new(labeler_core::corruption::BinomialCorruption::new(0.1)));
        }

        let cancel = Arc::new(AtomicBool::new(false));
        trainer.run(train, &mut transition, &mut emission, &mut rng, cancel, |p| {
            tracing::info!(epoch = p.epoch, sentences = p.sentences_done, loss = p.avg_loss, "training progress");
        })?;
    }

    let mut accuracy = None;
    if let Some(mut test) = test {
        // Weight vectors are read-only for the remainder of this block (no
        // averaging happens after training finishes above), so decoding each
        // test sequence is safe to parallelize across sentences.
        let decoder = Decoder::new(n_labels, &transition, &emission);
        test.par_iter_mut()
            .map(|seq| decoder.decode(seq))
            .collect::<labeler_core::Result<Vec<_>>>()?;

        let total: f64 = test.iter().filter_map(|s| s.accuracy()).sum();
        let count = test.iter().filter(|s| s.accuracy().is_some()).count().max(1);
        accuracy = Some(total / count as f64);
        tracing::info!(accuracy = accuracy, "test accuracy");

        if let Some(pred_path) = &args.predictions {
            let out = BufWriter::new(File::create(pred_path)?);
            output::write_predictions(out, &test, &labels)?;
        }

        if let Some(append_path) = &args.append_test {
            let mut file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(append_path)?;
            let record = serde_json::json!({
                "accuracy": accuracy,
                "name": args.name,
            });
            use std::io::Write as _;
            writeln!(file, "{record}")?;
        }
    }

    if let Some(final_model) = &args.final_model {
        let feature_names = match &feat_map {
            FeatureMap::Interning(_) => Some(feature_map::names_of(&feat_map)),
            FeatureMap::Hashing(_) => None,
        };
        let settings = Settings {
            train: args.train.as_ref().map(|p| p.display().to_string()),
            test: args.test.as_ref().map(|p| p.display().to_string()),
            hash_bits: args.hash_bits,
            passes: args.passes,
            average: args.average,
            ada_grad: args.ada_grad,
            cost_sensitive: args.cost_sensitive,
            drop_out: args.drop_out,
            ignore: args.ignore.clone(),
            quadratic: args.quadratic.clone(),
        };
        output::save_model(
            final_model,
            &transition,
            &emission,
            &labels,
            &settings,
            feature_names.as_deref(),
        )?;
        tracing::info!(path = %final_model.display(), "model saved");
    }

    Ok(())
}

/// Thin helpers for reaching into `FeatureMap::Interning`'s private fields
/// from the orchestrator without widening their visibility crate-wide.
mod feature_map {
    use labeler_core::FeatureMap;

    pub fn names_of(map: &FeatureMap) -> Vec<Vec<u8>> {
        match map {
            FeatureMap::Interning(i) => (0..).map_while(|idx| i.name_of(idx).map(|n| n.to_vec())).collect(),
            FeatureMap::Hashing(_) => Vec::new(),
        }
    }

    pub fn interning_from_names(names: &[Vec<u8>]) -> labeler_core::feature_map::InterningFeatMap {
        let mut map = labeler_core::feature_map::InterningFeatMap::new();
        for name in names {
            map.get_or_insert(name);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loading_a_model_with_mismatched_emission_dims_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let model_dir = dir.path().join("model");

        // Saved as if trained at --hash-bits 2 (n_feats = 4).
        let transition = labeler_core::WeightVector::new(4, 4, false);
        let emission = labeler_core::WeightVector::new(2, 4, false);
        let mut labels = LabelTable::new();
        labels.get_or_insert("A");
        labels.get_or_insert("B");
        let settings = Settings {
            train: None,
            test: None,
            hash_bits: Some(2),
            passes: 5,
            average: true,
            ada_grad: true,
            cost_sensitive: false,
            drop_out: false,
            ignore: vec![],
            quadratic: vec![],
        };
        output::save_model(&model_dir, &transition, &emission, &labels, &settings, None).unwrap();

        let test_path = dir.path().join("test.vw");
        std::fs::write(&test_path, "A |1 a\n").unwrap();

        let args = Args {
            test: Some(test_path),
            initial_model: Some(model_dir),
            // Resuming under a different --hash-bits than the model was
            // trained with: the emission table's column count no longer
            // matches the feature map's addressable space.
            hash_bits: Some(3),
            ..Args::default()
        };

        let err = run(args).unwrap_err();
        assert!(err.to_string().contains("dimensions"), "unexpected error: {err}");
    }
}
