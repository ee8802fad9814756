//! Read-only projections over a [`Snapshot`]: name search and the quantity
//! series behind the summary chart.

use serde::Serialize;

use crate::snapshot::{InventoryItem, Snapshot};

/// Labels and values for a bar chart, index-aligned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub values: Vec<u32>,
}

impl ChartSeries {
    /// Sum of all quantities.
    pub fn total(&self) -> u64 {
        self.values.iter().map(|&v| u64::from(v)).sum()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Items whose name contains `term`, ignoring case, in snapshot order.
///
/// An empty term matches everything.
pub fn filter<'a>(snapshot: &'a Snapshot, term: &str) -> Vec<&'a InventoryItem> {
    if term.is_empty() {
        return snapshot.iter().collect();
    }
    let needle = term.to_lowercase();
    snapshot
        .iter()
        .filter(|item| item.name.to_lowercase().contains(&needle))
        .collect()
}

pub fn to_series(snapshot: &Snapshot) -> ChartSeries {
    let (labels, values) = snapshot
        .iter()
        .map(|item| (capitalize_first(&item.name), item.quantity))
        .unzip();
    ChartSeries { labels, values }
}

/// Upper-cases the first character; everything else is left alone.
pub fn capitalize_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(items: &[(&str, u32)]) -> Snapshot {
        Snapshot::new(
            1,
            items.iter().map(|(name, quantity)| InventoryItem {
                name: name.to_string(),
                quantity: *quantity,
                description: String::new(),
            }),
        )
    }

    fn names(items: Vec<&InventoryItem>) -> Vec<&str> {
        items.into_iter().map(|i| i.name.as_str()).collect()
    }

    #[test]
    fn empty_term_returns_everything_in_order() {
        let snap = snapshot(&[("pear", 1), ("Apple", 2), ("fig", 3)]);
        assert_eq!(names(filter(&snap, "")), vec!["pear", "Apple", "fig"]);
    }

    #[test]
    fn filter_is_case_insensitive_substring() {
        let snap = snapshot(&[("Green Apple", 1), ("pear", 2), ("PINEAPPLE", 3)]);
        assert_eq!(names(filter(&snap, "aPPle")), vec!["Green Apple", "PINEAPPLE"]);
        assert_eq!(names(filter(&snap, "EA")), vec!["pear", "PINEAPPLE"]);
    }

    #[test]
    fn filter_without_match_is_empty() {
        let snap = snapshot(&[("pear", 2)]);
        assert!(filter(&snap, "kiwi").is_empty());
    }

    #[test]
    fn series_is_index_aligned() {
        let snap = snapshot(&[("pear", 4), ("apple", 1), ("1kg flour", 2)]);

        let series = to_series(&snap);
        assert_eq!(series.labels, vec!["Pear", "Apple", "1kg flour"]);
        assert_eq!(series.values, vec![4, 1, 2]);
        assert_eq!(series.labels.len(), series.values.len());
        assert_eq!(series.total(), 7);
    }

    #[test]
    fn series_of_empty_snapshot() {
        let series = to_series(&Snapshot::default());
        assert!(series.is_empty());
        assert_eq!(series.total(), 0);
    }

    #[test]
    fn capitalize_handles_edge_cases() {
        assert_eq!(capitalize_first(""), "");
        assert_eq!(capitalize_first("a"), "A");
        assert_eq!(capitalize_first("Already"), "Already");
        assert_eq!(capitalize_first("éclair"), "Éclair");
        assert_eq!(capitalize_first("_tag"), "_tag");
        assert_eq!(capitalize_first("mIXED"), "MIXED");
    }
}
