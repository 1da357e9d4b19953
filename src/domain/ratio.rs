use serde::{Deserialize, Serialize};

/// Rounded whole-number percentage of `part` in `total`.
/// A zero total yields 0 for every part.
pub fn percentage(part: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    ((part as f64 * 100.0) / total as f64).round() as u32
}

/// One slice of a partitioned count set, e.g. a status on a dashboard chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionShare {
    pub label: String,
    pub count: u64,
    pub percentage: u32,
}

/// Percentages for every partition of a count set, in input order.
pub fn partition_shares<S: AsRef<str>>(counts: &[(S, u64)]) -> Vec<PartitionShare> {
    // Saturates instead of wrapping on absurdly large counts
    let total = counts
        .iter()
        .fold(0u64, |total, (_, count)| total.saturating_add(*count));

    counts
        .iter()
        .map(|(label, count)| PartitionShare {
            label: label.as_ref().to_string(),
            count: *count,
            percentage: percentage(*count, total),
        })
        .collect()
}
