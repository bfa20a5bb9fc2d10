use sha2::{Digest, Sha256};

/// Derives the deterministic rollout bucket for a flow.
///
/// The same flow name must always map to the same bucket; rollout
/// consistency depends on it. Implementations must be stable across
/// processes and releases.
pub trait FlowBucketer: Send + Sync {
    /// Bucket in [1, 100] for the given flow name.
    fn bucket_for(&self, flow_name: &str) -> u32;
}

/// Default bucketer: SHA-256 of the flow name, first 8 bytes interpreted
/// big-endian, mapped onto [1, 100].
///
/// std's `DefaultHasher` is explicitly not stable across releases and must
/// not be used here.
#[derive(Debug, Clone, Copy, Default)]
pub struct DigestBucketer;

impl FlowBucketer for DigestBucketer {
    fn bucket_for(&self, flow_name: &str) -> u32 {
        let digest = Sha256::digest(flow_name.as_bytes());
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[..8]);
        (u64::from_be_bytes(prefix) % 100) as u32 + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_is_stable_and_in_range() {
        let bucketer = DigestBucketer;
        for name in ["daily-report", "Spark-ETL", "x", ""] {
            let first = bucketer.bucket_for(name);
            assert_eq!(first, bucketer.bucket_for(name));
            assert!((1..=100).contains(&first));
        }
    }

    #[test]
    fn distinct_names_spread_across_buckets() {
        let bucketer = DigestBucketer;
        let buckets: std::collections::HashSet<u32> = (0..200)
            .map(|i| bucketer.bucket_for(&format!("flow-{i}")))
            .collect();
        assert!(buckets.len() > 50);
    }
}
