//! Predictions file writer and the persisted model directory layout.

use std::io::Write;
use std::path::Path;

use labeler_core::{Sequence, WeightVector};
use serde::{Deserialize, Serialize};

use crate::labels::LabelTable;

/// Writes `id<TAB>gold<TAB>pred` lines, one sequence's tokens per block,
/// blank line between sequences — matching the original tool's predictions
/// file format exactly.
pub fn write_predictions(
    mut out: impl Write,
    sequences: &[Sequence],
    labels: &LabelTable,
) -> anyhow::Result<()> {
    for (i, seq) in sequences.iter().enumerate() {
        if i > 0 {
            writeln!(out)?;
        }
        for (j, tok) in seq.tokens.iter().enumerate() {
            let id = tok
                .id
                .clone()
                .unwrap_or_else(|| j.to_string());
            let gold = tok
                .gold_label
                .and_then(|l| labels.name_of(l))
                .unwrap_or("?");
            let pred = tok
                .pred_label
                .and_then(|l| labels.name_of(l))
                .unwrap_or("?");
            writeln!(out, "{id}\t{gold}\t{pred}")?;
        }
    }
    Ok(())
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Settings {
    pub train: Option<String>,
    pub test: Option<String>,
    pub hash_bits: Option<u32>,
    pub passes: usize,
    pub average: bool,
    pub ada_grad: bool,
    pub cost_sensitive: bool,
    pub drop_out: bool,
    pub ignore: Vec<String>,
    pub quadratic: Vec<String>,
}

/// Persists transition/emission weights, labels, and settings in the
/// directory layout documented by the external interface contract.
/// `transition.npz`/`emission.npz` keep their historical filenames even
/// though the bytes underneath are bincode, not a NumPy archive.
pub fn save_model(
    dir: &Path,
    transition: &WeightVector,
    emission: &WeightVector,
    labels: &LabelTable,
    settings: &Settings,
    feature_names: Option<&[Vec<u8>]>,
) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir)?;
    transition.save(&dir.join("transition.npz"))?;
    emission.save(&dir.join("emission.npz"))?;

    let labels_json = serde_json::to_vec(labels.names())?;
    std::fs::write(dir.join("labels.json"), labels_json)?;

    let settings_json = serde_json::to_vec_pretty(settings)?;
    std::fs::write(dir.join("settings.json"), settings_json)?;

    if let Some(names) = feature_names {
        let bytes = bincode::serialize(names)?;
        std::fs::write(dir.join("feature_map.bin"), bytes)?;
    }
    Ok(())
}

pub struct LoadedModel {
    pub transition: WeightVector,
    pub emission: WeightVector,
    pub labels: Vec<String>,
    pub feature_names: Option<Vec<Vec<u8>>>,
}

pub fn load_model(dir: &Path) -> anyhow::Result<LoadedModel> {
    let transition = WeightVector::load(&dir.join("transition.npz"))?;
    let emission = WeightVector::load(&dir.join("emission.npz"))?;
    let labels_json = std::fs::read(dir.join("labels.json"))?;
    let labels: Vec<String> = serde_json::from_slice(&labels_json)?;

    let feature_map_path = dir.join("feature_map.bin");
    let feature_names = if feature_map_path.exists() {
        let bytes = std::fs::read(&feature_map_path)?;
        Some(bincode::deserialize(&bytes)?)
    } else {
        None
    };

    Ok(LoadedModel {
        transition,
        emission,
        labels,
        feature_names,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use labeler_core::Token;

    #[test]
    fn predictions_are_tab_separated_with_blank_line_between_sequences() {
        let mut labels = LabelTable::new();
        let a = labels.get_or_insert("A").unwrap();
        let b = labels.get_or_insert("B").unwrap();

        let mut tok1 = Token::new(vec![]);
        tok1.id = Some("1".into());
        tok1.gold_label = Some(a);
        tok1.pred_label = Some(a);
        let seq1 = Sequence::new(vec![tok1]);

        let mut tok2 = Token::new(vec![]);
        tok2.id = Some("2".into());
        tok2.gold_label = Some(b);
        tok2.pred_label = Some(a);
        let seq2 = Sequence::new(vec![tok2]);

        let mut buf = Vec::new();
        write_predictions(&mut buf, &[seq1, seq2], &labels).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "1\tA\tA\n\n2\tB\tA\n");
    }

    #[test]
    fn model_round_trips_through_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let transition = WeightVector::new(4, 4, false);
        let emission = WeightVector::new(2, 8, false);
        let mut labels = LabelTable::new();
        labels.get_or_insert("A");
        labels.get_or_insert("B");
        let settings = Settings {
            train: Some("train.vw".into()),
            test: None,
            hash_bits: Some(3),
            passes: 5,
            average: true,
            ada_grad: true,
            cost_sensitive: false,
            drop_out: false,
            ignore: vec![],
            quadratic: vec![],
        };

        save_model(dir.path(), &transition, &emission, &labels, &settings, None).unwrap();
        let loaded = load_model(dir.path()).unwrap();
        assert_eq!(loaded.labels, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(loaded.transition.dims(), transition.dims());
    }
}
