//! Percentile/latency aggregation over a run's samples. p95/p99 are only
//! reported once the sample count reaches 20; below that they stay null
//! rather than reporting a misleadingly precise percentile off a handful of
//! points.

use crate::domain::LatencyStats;

const PERCENTILE_MIN_SAMPLES: usize = 20;

pub struct Aggregate {
    pub total: i64,
    pub success: i64,
    pub failed: i64,
    pub latency: LatencyStats,
}

/// `samples` are per-request latencies in milliseconds, one per completed
/// request regardless of success/failure; `successes` marks which indices
/// succeeded.
pub fn aggregate(samples: &[i64], successes: &[bool]) -> Aggregate {
    debug_assert_eq!(samples.len(), successes.len());

    let total = samples.len() as i64;
    let success = successes.iter().filter(|s| **s).count() as i64;
    let failed = total - success;

    let mut positive: Vec<i64> = samples.iter().copied().filter(|&v| v > 0).collect();
    positive.sort_unstable();

    let latency = if positive.is_empty() {
        LatencyStats::default()
    } else {
        let sum: i64 = positive.iter().sum();
        let avg = sum / positive.len() as i64;
        let min = positive[0];
        let max = positive[positive.len() - 1];
        let (p95, p99) = if positive.len() >= PERCENTILE_MIN_SAMPLES {
            let p95_idx = ((positive.len() as f64) * 0.95).floor() as usize;
            let p99_idx = ((positive.len() as f64) * 0.99).floor() as usize;
            (
                Some(positive[p95_idx.min(positive.len() - 1)]),
                Some(positive[p99_idx.min(positive.len() - 1)]),
            )
        } else {
            (None, None)
        };
        LatencyStats {
            avg_ms: Some(avg),
            min_ms: Some(min),
            max_ms: Some(max),
            p95_ms: p95,
            p99_ms: p99,
        }
    };

    Aggregate {
        total,
        success,
        failed,
        latency,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentiles_are_null_below_twenty_samples() {
        let samples: Vec<i64> = (1..=19).collect();
        let successes = vec![true; 19];
        let agg = aggregate(&samples, &successes);
        assert!(agg.latency.p95_ms.is_none());
        assert!(agg.latency.p99_ms.is_none());
        assert_eq!(agg.latency.min_ms, Some(1));
        assert_eq!(agg.latency.max_ms, Some(19));
    }

    #[test]
    fn percentiles_populate_at_twenty_samples() {
        let samples: Vec<i64> = (1..=20).collect();
        let successes = vec![true; 20];
        let agg = aggregate(&samples, &successes);
        assert!(agg.latency.p95_ms.is_some());
        assert!(agg.latency.p99_ms.is_some());
    }

    #[test]
    fn failed_count_reflects_success_flags() {
        let samples = vec![10, 20, 30];
        let successes = vec![true, false, true];
        let agg = aggregate(&samples, &successes);
        assert_eq!(agg.total, 3);
        assert_eq!(agg.success, 2);
        assert_eq!(agg.failed, 1);
    }

    #[test]
    fn avg_uses_integer_division() {
        let samples = vec![1, 2];
        let successes = vec![true, true];
        let agg = aggregate(&samples, &successes);
        assert_eq!(agg.latency.avg_ms, Some(1));
    }
}
