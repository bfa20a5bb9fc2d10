use serde::{Deserialize, Serialize};

/// One step of an active rollout plan for an image type.
///
/// A plan is an ordered list of entries. Percentages are integers in [1,100]
/// and need not sum to 100; the unallocated remainder selects nothing and
/// leaves the flow to the active-version fallback.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RampupEntry {
    /// Target version this entry ramps flows onto.
    pub version: String,

    /// Share of the [1,100] bucket space this entry owns.
    pub percentage: u32,
}

/// Returns the plan in canonical consumption order: a stable ascending sort
/// by percentage. Bucket ranges are assigned over the sorted list.
pub fn normalized_plan(entries: &[RampupEntry]) -> Vec<RampupEntry> {
    let mut sorted = entries.to_vec();
    sorted.sort_by_key(|e| e.percentage);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(version: &str, percentage: u32) -> RampupEntry {
        RampupEntry {
            version: version.to_string(),
            percentage,
        }
    }

    #[test]
    fn normalization_sorts_ascending_and_is_stable() {
        let plan = vec![entry("c", 60), entry("a", 10), entry("b", 30)];
        let sorted = normalized_plan(&plan);
        assert_eq!(sorted, vec![entry("a", 10), entry("b", 30), entry("c", 60)]);

        // ties keep their given order
        let tied = vec![entry("x", 50), entry("y", 50)];
        assert_eq!(normalized_plan(&tied), tied);
    }
}
