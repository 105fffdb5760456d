use crate::models::{MetricKind, SeriesPoint};
use crate::sources::EnabledSet;
use crate::store::Entity;
use chrono::NaiveTime;

pub fn enabled_total(entity: &Entity, metric: MetricKind, enabled: &impl EnabledSet) -> u64 {
    entity
        .counts(metric)
        .by_source()
        .iter()
        .filter(|(source, _)| enabled.is_enabled(source))
        .fold(0u64, |sum, (_, count)| sum.saturating_add(*count))
}

pub fn enabled_time_series(entity: &Entity, metric: MetricKind, enabled: &impl EnabledSet) -> Vec<SeriesPoint> {
    entity
        .counts(metric)
        .by_date()
        .iter()
        .filter_map(|(date, bucket)| {
            let count = bucket
                .iter()
                .filter(|(source, _)| enabled.is_enabled(source))
                .fold(0u64, |sum, (_, count)| sum.saturating_add(*count));
            (count > 0).then(|| SeriesPoint {
                date: *date,
                timestamp_ms: date.and_time(NaiveTime::MIN).and_utc().timestamp_millis(),
                count,
            })
        })
        .collect()
}
