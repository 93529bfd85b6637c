//! A small growable label interning table, separate from the feature map
//! since labels are few and always kept as readable strings end to end.

use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct LabelTable {
    index: HashMap<String, u32>,
    names: Vec<String>,
    frozen: bool,
}

impl LabelTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the table from a fixed list (the `--labels` file), freezing it
    /// immediately: unseen labels encountered afterward are a semantic
    /// error, not silently appended.
    pub fn from_fixed(names: Vec<String>) -> Self {
        let mut table = LabelTable::new();
        for name in names {
            table.get_or_insert(&name);
        }
        table.frozen = true;
        table
    }

    /// Stops the table from accepting new labels: an unseen label name
    /// afterward is a semantic error (spec: "labels in test set not present
    /// in training model"), not a silent append.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn get_or_insert(&mut self, name: &str) -> Option<u32> {
        if let Some(&idx) = self.index.get(name) {
            return Some(idx);
        }
        if self.frozen {
            return None;
        }
        let idx = self.names.len() as u32;
        self.names.push(name.to_string());
        self.index.insert(name.to_string(), idx);
        Some(idx)
    }

    pub fn get(&self, name: &str) -> Option<u32> {
        self.index.get(name).copied()
    }

    pub fn name_of(&self, idx: u32) -> Option<&str> {
        self.names.get(idx as usize).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_table_rejects_unseen_labels() {
        let mut table = LabelTable::from_fixed(vec!["A".into(), "B".into()]);
        assert_eq!(table.get_or_insert("A"), Some(0));
        assert_eq!(table.get_or_insert("never-seen"), None);
    }

    #[test]
    fn freeze_rejects_labels_seen_only_afterward() {
        let mut table = LabelTable::new();
        table.get_or_insert("A");
        table.freeze();
        assert_eq!(table.get_or_insert("A"), Some(0));
        assert_eq!(table.get_or_insert("B"), None);
    }

    #[test]
    fn growable_table_assigns_indices_in_first_seen_order() {
        let mut table = LabelTable::new();
        assert_eq!(table.get_or_insert("B"), Some(0));
        assert_eq!(table.get_or_insert("A"), Some(1));
        assert_eq!(table.get_or_insert("B"), Some(0));
    }
}
