//! Event-count lists and their application to an existing weight table.
//!
//! A count list holds one `dataset_id:count` pair per line, e.g. the output of
//! `getweights sum` piped through `tr '\t' ':'`.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use gw_core::{Error, Result, WeightTable};

/// Parse `did:count` lines; blank lines and `#` comments are skipped.
pub fn parse_counts(text: &str) -> Result<BTreeMap<String, f64>> {
    let mut counts = BTreeMap::new();
    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (did, count) = line.split_once(':').ok_or_else(|| {
            Error::Validation(format!("line {}: expected did:count, got '{line}'", i + 1))
        })?;
        let count: f64 = count.trim().parse().map_err(|e| {
            Error::Validation(format!("line {}: bad count '{}': {e}", i + 1, count.trim()))
        })?;
        counts.insert(did.trim().to_string(), count);
    }
    Ok(counts)
}

/// Read a count list file.
pub fn read_counts(path: &Path) -> Result<BTreeMap<String, f64>> {
    parse_counts(&fs::read_to_string(path)?)
}

/// Overwrite `num events` of every record from `counts`; records missing from
/// the list get 0. Returns the dataset ids that were missing.
pub fn apply_counts(table: &mut WeightTable, counts: &BTreeMap<String, f64>) -> Vec<String> {
    let mut missing = Vec::new();
    for (did, record) in table.iter_mut() {
        match counts.get(did) {
            Some(&n) => record.num_events = n,
            None => {
                tracing::warn!(dataset_id = %did, "no count listed, setting num events to 0");
                record.num_events = 0.0;
                missing.push(did.clone());
            }
        }
    }
    for did in counts.keys().filter(|did| !table.contains(did)) {
        tracing::debug!(dataset_id = %did, "count listed for a dataset not in the table");
    }
    missing
}

#[cfg(test)]
mod tests {
    use super::*;
    use gw_core::WeightRecord;

    #[test]
    fn parses_pairs_and_skips_noise() {
        let counts = parse_counts("# sums\n410000:4200\n\n361106 : 1.5e6\n").unwrap();
        assert_eq!(counts.len(), 2);
        assert_eq!(counts["410000"], 4200.0);
        assert_eq!(counts["361106"], 1.5e6);
    }

    #[test]
    fn malformed_lines_name_the_line() {
        let err = parse_counts("410000:1\n361106\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
        assert!(parse_counts("410000:many").is_err());
    }

    #[test]
    fn missing_ids_are_zeroed() {
        let mut table = WeightTable::new();
        table.upsert("410000", WeightRecord::new(1.0, vec![], Default::default()));
        table.upsert("361106", WeightRecord::new(2.0, vec![], Default::default()));
        let counts = parse_counts("410000:4200\n999999:5").unwrap();

        let missing = apply_counts(&mut table, &counts);
        assert_eq!(missing, vec!["361106".to_string()]);
        assert_eq!(table.get("410000").unwrap().num_events, 4200.0);
        assert_eq!(table.get("361106").unwrap().num_events, 0.0);
        assert!(!table.contains("999999"));
    }
}
