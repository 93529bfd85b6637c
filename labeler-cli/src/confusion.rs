//! Loads the `--confusion-scaling` CSV: a square matrix of label x label
//! scaling factors, first column and header row are label names.

use std::path::Path;

use crate::labels::LabelTable;

pub fn load_confusion_matrix(path: &Path, labels: &LabelTable) -> anyhow::Result<Vec<Vec<f64>>> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_path(path)?;
    let header = reader.headers()?.clone();
    let column_labels: Vec<String> = header.iter().skip(1).map(|s| s.to_string()).collect();

    let mut by_row: std::collections::HashMap<String, std::collections::HashMap<String, f64>> =
        std::collections::HashMap::new();

    for record in reader.records() {
        let record = record?;
        let row_label = record.get(0).unwrap_or_default().to_string();
        let mut row = std::collections::HashMap::new();
        for (col_label, value) in column_labels.iter().zip(record.iter().skip(1)) {
            row.insert(col_label.clone(), value.parse::<f64>().unwrap_or(1.0));
        }
        by_row.insert(row_label, row);
    }

    anyhow::ensure!(
        column_labels.iter().collect::<std::collections::HashSet<_>>()
            == by_row.keys().collect::<std::collections::HashSet<_>>(),
        "confusion scaling matrix should be square and have identical row and column names"
    );

    let n = labels.len();
    let mut matrix = vec![vec![1.0; n]; n];
    for (gold_idx, gold_name) in labels.names().iter().enumerate() {
        if let Some(row) = by_row.get(gold_name) {
            for (pred_idx, pred_name) in labels.names().iter().enumerate() {
                if let Some(&val) = row.get(pred_name) {
                    matrix[gold_idx][pred_idx] = val;
                }
            }
        }
    }
    Ok(matrix)
}
