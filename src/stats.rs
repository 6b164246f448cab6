use crate::types::{
    Assessment, ErrorAnalysis, ErrorFrequency, GroupStats, LatencyBucket, Observation,
    PerformanceInsights, ResponseTimeDistribution, Summary, TimeBucket, TimeSeriesAnalysis, Trend,
    TrendAnalysis,
};
use std::collections::BTreeMap;

/// Percentiles reported in every summary, with their map keys.
pub const PERCENTILES: [(&str, f64); 6] = [
    ("p50", 50.0),
    ("p75", 75.0),
    ("p90", 90.0),
    ("p95", 95.0),
    ("p99", 99.0),
    ("p99.9", 99.9),
];

const COMMON_ERROR_LIMIT: usize = 5;
const TIME_BUCKET_SECONDS: f64 = 60.0;
const TREND_THRESHOLD: f64 = 0.1;
const DEGRADED_RESPONSE_TIME: f64 = 2.0;
const OUTLIER_RESPONSE_TIME: f64 = 5.0;

/// Reduces a run's observations to its summary.
///
/// Pure: the same observations always produce the same summary. Empty input
/// yields zero counters and empty collections.
pub fn summarize(observations: &[Observation]) -> Summary {
    if observations.is_empty() {
        return Summary::default();
    }

    let total = observations.len();
    let successful = observations.iter().filter(|o| o.success).count();
    let failed = total - successful;
    let success_rate = successful as f64 / total as f64;

    let times = response_times(observations);
    let latency = LatencyStats::from_samples(&times);
    let duration = test_duration(observations);
    let throughput = if duration > 0.0 {
        total as f64 / duration
    } else {
        0.0
    };

    let mut percentiles = percentiles(&times);
    for value in percentiles.values_mut() {
        *value = round4(*value);
    }

    Summary {
        total_requests: total,
        successful_requests: successful,
        failed_requests: failed,
        success_rate: round4(success_rate),
        avg_response_time: round4(latency.avg),
        min_response_time: round4(latency.min),
        max_response_time: round4(latency.max),
        throughput: round4(throughput),
        errors: distinct_errors(observations),
        percentiles,
        response_time_distribution: distribution(&times),
        error_analysis: analyze_errors(observations),
        performance_insights: generate_insights(&times, success_rate, throughput),
        target_breakdown: breakdown(observations, Observation::target_key),
        user_breakdown: breakdown(observations, |o| o.user_id),
        time_series_analysis: analyze_time_series(observations),
        test_duration: duration,
        requests_per_second: round4(throughput),
    }
}

/// Linear-interpolated percentile of an ascending slice, `p` in `[0, 100]`.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let last = sorted.len() - 1;
    let rank = (p / 100.0) * last as f64;
    let floor = rank.floor() as usize;
    let ceil = (floor + 1).min(last);
    let weight = rank - floor as f64;
    sorted[floor] + (sorted[ceil] - sorted[floor]) * weight
}

pub fn percentiles(response_times: &[f64]) -> BTreeMap<String, f64> {
    if response_times.is_empty() {
        return BTreeMap::new();
    }
    let mut sorted = response_times.to_vec();
    sorted.sort_by(f64::total_cmp);
    PERCENTILES
        .iter()
        .map(|(name, p)| (name.to_string(), percentile(&sorted, *p)))
        .collect()
}

pub fn distribution(response_times: &[f64]) -> ResponseTimeDistribution {
    if response_times.is_empty() {
        return ResponseTimeDistribution::default();
    }

    let mut buckets: BTreeMap<LatencyBucket, usize> =
        LatencyBucket::ALL.iter().map(|bucket| (*bucket, 0)).collect();
    for rt in response_times {
        *buckets
            .entry(LatencyBucket::for_response_time(*rt))
            .or_insert(0) += 1;
    }

    let total = response_times.len();
    let percentages = buckets
        .iter()
        .map(|(bucket, count)| (*bucket, *count as f64 / total as f64 * 100.0))
        .collect();

    ResponseTimeDistribution {
        buckets,
        percentages,
        total_requests: total,
    }
}

pub fn analyze_errors(observations: &[Observation]) -> ErrorAnalysis {
    let failed: Vec<&Observation> = observations.iter().filter(|o| !o.success).collect();
    if failed.is_empty() {
        return ErrorAnalysis::default();
    }

    let mut error_types = BTreeMap::new();
    let mut status_codes = BTreeMap::new();
    // Keeps first-seen order so ties in `common_errors` are stable.
    let mut seen: Vec<(String, usize)> = Vec::new();

    for observation in &failed {
        let error = observation.error.as_deref().unwrap_or("Unknown");
        *error_types.entry(error.to_string()).or_insert(0) += 1;
        match seen.iter_mut().find(|(text, _)| text == error) {
            Some((_, count)) => *count += 1,
            None => seen.push((error.to_string(), 1)),
        }

        let status = observation
            .status_code()
            .map(|code| code.to_string())
            .unwrap_or_else(|| "Unknown".to_string());
        *status_codes.entry(status).or_insert(0) += 1;
    }

    seen.sort_by(|a, b| b.1.cmp(&a.1));
    let common_errors = seen
        .into_iter()
        .take(COMMON_ERROR_LIMIT)
        .map(|(error, count)| ErrorFrequency { error, count })
        .collect();

    ErrorAnalysis {
        error_count: failed.len(),
        error_types,
        status_codes,
        common_errors,
        error_rate: failed.len() as f64 / observations.len() as f64,
    }
}

pub fn assess(success_rate: f64, avg_response_time: f64, throughput: f64) -> Assessment {
    if success_rate >= 0.99 && avg_response_time < 0.5 && throughput > 10.0 {
        Assessment::Excellent
    } else if success_rate >= 0.95 && avg_response_time < 1.0 && throughput > 5.0 {
        Assessment::Good
    } else if success_rate >= 0.90 && avg_response_time < 2.0 {
        Assessment::Acceptable
    } else {
        Assessment::Poor
    }
}

pub fn generate_insights(
    response_times: &[f64],
    success_rate: f64,
    throughput: f64,
) -> PerformanceInsights {
    let mut insights = PerformanceInsights::default();
    if response_times.is_empty() {
        return insights;
    }

    let latency = LatencyStats::from_samples(response_times);
    let avg = latency.avg;
    let max = latency.max;
    insights.overall_assessment = Some(assess(success_rate, avg, throughput));

    if success_rate >= 0.95 {
        insights.strengths.push(format!(
            "High reliability ({:.1}% success rate)",
            success_rate * 100.0
        ));
    }
    if avg < 0.5 {
        insights
            .strengths
            .push(format!("Fast response times ({:.3}s average)", avg));
    }
    if throughput > 10.0 {
        insights
            .strengths
            .push(format!("High throughput ({:.1} req/s)", throughput));
    }

    if success_rate < 0.95 {
        insights.concerns.push(format!(
            "Low reliability ({:.1}% success rate)",
            success_rate * 100.0
        ));
        insights
            .recommendations
            .push("Investigate and fix error patterns".to_string());
    }
    if avg > 1.0 {
        insights
            .concerns
            .push(format!("Slow response times ({:.3}s average)", avg));
        insights
            .recommendations
            .push("Optimize response times through caching or database tuning".to_string());
    }
    if max > OUTLIER_RESPONSE_TIME {
        insights
            .concerns
            .push(format!("Very slow outliers detected ({:.3}s max)", max));
        insights
            .recommendations
            .push("Investigate slow response outliers".to_string());
    }
    if throughput < 5.0 {
        insights
            .concerns
            .push(format!("Low throughput ({:.1} req/s)", throughput));
        insights
            .recommendations
            .push("Consider horizontal scaling or performance optimization".to_string());
    }

    insights
}

/// Groups observations by `key` and computes the top-level counters per group.
pub fn breakdown<K, F>(observations: &[Observation], key: F) -> BTreeMap<K, GroupStats>
where
    K: Ord,
    F: Fn(&Observation) -> K,
{
    let mut groups: BTreeMap<K, Vec<&Observation>> = BTreeMap::new();
    for observation in observations {
        groups.entry(key(observation)).or_default().push(observation);
    }

    groups
        .into_iter()
        .map(|(key, members)| (key, group_stats(&members)))
        .collect()
}

fn group_stats(members: &[&Observation]) -> GroupStats {
    let total = members.len();
    let successful = members.iter().filter(|o| o.success).count();
    let times: Vec<f64> = members
        .iter()
        .map(|o| o.response_time)
        .filter(|rt| *rt > 0.0)
        .collect();
    let latency = LatencyStats::from_samples(&times);

    GroupStats {
        total_requests: total,
        successful_requests: successful,
        failed_requests: total - successful,
        success_rate: if times.is_empty() {
            0.0
        } else {
            successful as f64 / total as f64
        },
        avg_response_time: latency.avg,
        min_response_time: latency.min,
        max_response_time: latency.max,
        errors: members
            .iter()
            .filter(|o| !o.success)
            .filter_map(|o| o.error.clone())
            .collect(),
    }
}

pub fn analyze_time_series(observations: &[Observation]) -> TimeSeriesAnalysis {
    #[derive(Default)]
    struct Accumulator {
        requests: usize,
        successful: usize,
        response_time_sum: f64,
        response_time_count: usize,
    }

    let mut minutes: BTreeMap<i64, Accumulator> = BTreeMap::new();
    for observation in observations {
        let minute = (observation.timestamp / TIME_BUCKET_SECONDS).floor() as i64
            * TIME_BUCKET_SECONDS as i64;
        let bucket = minutes.entry(minute).or_default();
        bucket.requests += 1;
        if observation.success {
            bucket.successful += 1;
        }
        if observation.response_time > 0.0 {
            bucket.response_time_sum += observation.response_time;
            bucket.response_time_count += 1;
        }
    }

    let buckets: Vec<TimeBucket> = minutes
        .into_iter()
        .map(|(timestamp, acc)| TimeBucket {
            timestamp,
            requests: acc.requests,
            success_rate: acc.successful as f64 / acc.requests as f64,
            avg_response_time: if acc.response_time_count > 0 {
                acc.response_time_sum / acc.response_time_count as f64
            } else {
                0.0
            },
        })
        .collect();

    let trend = analyze_trend(&buckets);
    TimeSeriesAnalysis { buckets, trend }
}

pub fn analyze_trend(buckets: &[TimeBucket]) -> TrendAnalysis {
    if buckets.is_empty() {
        return TrendAnalysis::default();
    }

    let response_times: Vec<f64> = buckets.iter().map(|b| b.avg_response_time).collect();
    let success_rates: Vec<f64> = buckets.iter().map(|b| b.success_rate).collect();

    let max = response_times.iter().copied().fold(f64::MIN, f64::max);
    let min = response_times.iter().copied().fold(f64::MAX, f64::min);
    let stability_score = if max > 0.0 {
        1.0 - (max - min) / max
    } else {
        1.0
    };

    TrendAnalysis {
        response_time_trend: trend(&response_times),
        success_rate_trend: trend(&success_rates),
        performance_degradation: response_times
            .iter()
            .any(|rt| *rt > DEGRADED_RESPONSE_TIME),
        stability_score,
    }
}

/// Compares the mean of the second half of `values` with the first half.
pub fn trend(values: &[f64]) -> Trend {
    if values.len() < 2 {
        return Trend::Stable;
    }
    let (first, second) = values.split_at(values.len() / 2);
    let first_avg = mean(first);
    let second_avg = mean(second);
    let change = if first_avg > 0.0 {
        (second_avg - first_avg) / first_avg
    } else {
        0.0
    };

    if change > TREND_THRESHOLD {
        Trend::Increasing
    } else if change < -TREND_THRESHOLD {
        Trend::Decreasing
    } else {
        Trend::Stable
    }
}

struct LatencyStats {
    avg: f64,
    min: f64,
    max: f64,
}

impl LatencyStats {
    fn from_samples(samples: &[f64]) -> Self {
        if samples.is_empty() {
            return Self {
                avg: 0.0,
                min: 0.0,
                max: 0.0,
            };
        }
        Self {
            avg: mean(samples),
            min: samples.iter().copied().fold(f64::MAX, f64::min),
            max: samples.iter().copied().fold(f64::MIN, f64::max),
        }
    }
}

/// Response times that were actually measured (non-zero).
fn response_times(observations: &[Observation]) -> Vec<f64> {
    observations
        .iter()
        .map(|o| o.response_time)
        .filter(|rt| *rt > 0.0)
        .collect()
}

fn test_duration(observations: &[Observation]) -> f64 {
    let first = observations
        .iter()
        .map(|o| o.timestamp)
        .fold(f64::MAX, f64::min);
    let last = observations
        .iter()
        .map(|o| o.timestamp)
        .fold(f64::MIN, f64::max);
    (last - first).max(0.0)
}

fn distinct_errors(observations: &[Observation]) -> Vec<String> {
    let mut errors: Vec<String> = Vec::new();
    for error in observations
        .iter()
        .filter(|o| !o.success)
        .filter_map(|o| o.error.as_ref())
    {
        if !errors.contains(error) {
            errors.push(error.clone());
        }
    }
    errors
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
