//! Reads the VW-like line-oriented labeled-sequence format.
//!
//! One line per token, blank line between sequences:
//!
//! ```text
//! ['id] label[:cost][,label:cost...] [importance] |ns[:scale] feat[:val] ... |ns2 ...
//! ```
//!
//! Namespace names are single tokens immediately after `|`; every feature
//! under a namespace is keyed as `"<ns>^<name>"` before reaching the
//! feature map, matching the format the tests in the original project
//! assert against.

use std::io::BufRead;

use labeler_core::{FeatureMap, Sequence, Token};

use crate::labels::LabelTable;

#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    pub ignore: Vec<String>,
    pub quadratic: Vec<String>,
    pub require_labels: bool,
    pub audit: bool,
}

struct Namespace {
    name: String,
    scale: f64,
    features: Vec<(String, f64)>,
}

/// Parses every sequence out of `reader`, growing `feat_map` and `labels`
/// as it goes (unless they're frozen).
pub fn read_vw_seq(
    reader: impl BufRead,
    feat_map: &mut FeatureMap,
    labels: &mut LabelTable,
    opts: &ReadOptions,
) -> anyhow::Result<Vec<Sequence>> {
    let mut sequences = Vec::new();
    let mut current_tokens = Vec::new();

    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim_end();
        if trimmed.is_empty() {
            if !current_tokens.is_empty() {
                sequences.push(Sequence::new(std::mem::take(&mut current_tokens)));
            }
            continue;
        }
        let token = parse_line(trimmed, feat_map, labels, opts)?;
        if opts.audit {
            println!("{trimmed} => {token:?}");
        }
        current_tokens.push(token);
    }
    if !current_tokens.is_empty() {
        sequences.push(Sequence::new(current_tokens));
    }

    Ok(sequences)
}

fn parse_line(
    line: &str,
    feat_map: &mut FeatureMap,
    labels: &mut LabelTable,
    opts: &ReadOptions,
) -> anyhow::Result<Token> {
    let (head, ns_part) = match line.split_once('|') {
        Some((h, rest)) => (h.trim(), Some(rest)),
        None => (line.trim(), None),
    };

    let mut id = None;
    let mut label_spec = None;
    let mut importance = 1.0f64;

    for word in head.split_whitespace() {
        if let Some(stripped) = word.strip_prefix('\'') {
            id = Some(stripped.to_string());
        } else if label_spec.is_none() {
            label_spec = Some(word);
        } else if let Ok(v) = word.parse::<f64>() {
            importance = v;
        }
    }

    let mut gold_label = None;
    let mut label_costs = Vec::new();
    if let Some(spec) = label_spec {
        for part in spec.split(',') {
            let (name, cost) = match part.split_once(':') {
                Some((n, c)) => (n, c.parse::<f64>().unwrap_or(0.0)),
                None => (part, 0.0),
            };
            let idx = labels
                .get_or_insert(name)
                .ok_or_else(|| anyhow::anyhow!("unknown label '{name}' under a frozen label set"))?;
            label_costs.push((idx, cost));
        }
        if let Some(&(first_idx, first_cost)) = label_costs.first() {
            if first_cost == 0.0 && label_costs.len() == 1 {
                gold_label = Some(first_idx);
                label_costs.clear();
            }
        }
    } else if opts.require_labels {
        return Err(anyhow::anyhow!("line has no label: {line}"));
    }

    let mut features: Vec<(u32, f64)> = Vec::new();
    if let Some(ns_part) = ns_part {
        let namespaces = parse_namespaces(&format!("|{ns_part}"));
        let expanded = expand_quadratic(&namespaces, &opts.quadratic);
        for ns in namespaces.iter().chain(expanded.iter()) {
            if opts.ignore.iter().any(|prefix| ns.name.starts_with(prefix.as_str())) {
                continue;
            }
            for (name, val) in &ns.features {
                let key = format!("{}^{}", ns.name, name);
                if let Some(idx) = feat_map.get_or_insert(key.as_bytes()) {
                    features.push((idx, val * ns.scale));
                }
            }
        }
    }

    let mut token = Token::new(merge_duplicate_indices(features));
    token.id = id;
    token.gold_label = gold_label;
    token.label_costs = label_costs;
    token.importance_weight = importance;
    Ok(token)
}

fn parse_namespaces(text: &str) -> Vec<Namespace> {
    let mut namespaces = Vec::new();
    for chunk in text.split('|').skip(1) {
        let mut words = chunk.split_whitespace();
        let Some(header) = words.next() else { continue };
        let (name, scale) = match header.split_once(':') {
            Some((n, s)) => (n.to_string(), s.parse::<f64>().unwrap_or(1.0)),
            None => (header.to_string(), 1.0),
        };
        let mut features = Vec::new();
        for word in words {
            let (fname, val) = match word.split_once(':') {
                Some((n, v)) => (n.to_string(), v.parse::<f64>().unwrap_or(1.0)),
                None => (word.to_string(), 1.0),
            };
            features.push((fname, val));
        }
        namespaces.push(Namespace { name, scale, features });
    }
    namespaces
}

/// Builds cross-product namespaces for every pair requested by
/// `--quadratic`, where `:` means "all namespaces".
fn expand_quadratic(namespaces: &[Namespace], quadratic: &[String]) -> Vec<Namespace> {
    if quadratic.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::new();
    for pair in quadratic.iter() {
        let chars: Vec<char> = pair.chars().collect();
        if chars.len() != 2 {
            continue;
        }
        let matches = |ns: &Namespace, selector: char| selector == ':' || ns.name.starts_with(selector);

        for a in namespaces.iter().filter(|ns| matches(ns, chars[0])) {
            for b in namespaces.iter().filter(|ns| matches(ns, chars[1])) {
                let mut features = Vec::new();
                for (fa, va) in &a.features {
                    for (fb, vb) in &b.features {
                        features.push((format!("{fa}*{fb}"), va * vb));
                    }
                }
                out.push(Namespace {
                    name: format!("{}*{}", a.name, b.name),
                    scale: 1.0,
                    features,
                });
            }
        }
    }
    out
}

fn merge_duplicate_indices(mut features: Vec<(u32, f64)>) -> Vec<(u32, f64)> {
    features.sort_by_key(|&(idx, _)| idx);
    let mut merged: Vec<(u32, f64)> = Vec::with_capacity(features.len());
    for (idx, val) in features {
        if let Some(last) = merged.last_mut() {
            if last.0 == idx {
                last.1 += val;
                continue;
            }
        }
        merged.push((idx, val));
    }
    merged
}
