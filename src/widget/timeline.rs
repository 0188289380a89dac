use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::forecast::format::{icon_key, snapshot_time_label, temperature_label, UNKNOWN_ICON};
use crate::forecast::ForecastPipeline;
use crate::weather::WeatherSnapshot;

const NO_CITY: &str = "No City";
const NOT_AVAILABLE: &str = "N/A";
const ERROR_TEMPERATURE: &str = "Error";
const WARNING_ICON: &str = "warning";

/// One widget display snapshot, shown until the next entry's date
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TimelineEntry {
    /// Unix timestamp the entry becomes current
    pub date: i64,
    pub city_name: String,
    pub temperature: String,
    pub icon: String,
    pub hour: String,
}

/// What the host scheduler should do once the entries run out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RefreshPolicy {
    AtEnd,
    Never,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Timeline {
    pub entries: Vec<TimelineEntry>,
    pub policy: RefreshPolicy,
    /// Date of the last entry when the policy is `at_end`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_at: Option<i64>,
}

impl Timeline {
    fn at_end(entries: Vec<TimelineEntry>) -> Self {
        let refresh_at = entries.last().map(|e| e.date);
        Self {
            entries,
            policy: RefreshPolicy::AtEnd,
            refresh_at,
        }
    }

    fn single(entry: TimelineEntry) -> Self {
        Self {
            entries: vec![entry],
            policy: RefreshPolicy::Never,
            refresh_at: None,
        }
    }
}

/// Builds widget timelines by running the forecast pipeline on a fresh
/// controller for every request
pub struct WidgetTimelineProvider {
    pipeline: ForecastPipeline,
    max_entries: usize,
}

impl WidgetTimelineProvider {
    pub fn new(pipeline: ForecastPipeline, max_entries: usize) -> Self {
        Self {
            pipeline,
            max_entries,
        }
    }

    /// Static entry for widget galleries and previews
    pub fn placeholder(city_name: Option<&str>) -> TimelineEntry {
        let city_name = city_name
            .filter(|c| !c.trim().is_empty())
            .unwrap_or("Sample City");

        TimelineEntry {
            date: Utc::now().timestamp(),
            city_name: city_name.to_string(),
            temperature: "20°C".to_string(),
            icon: "sun".to_string(),
            hour: "2 PM".to_string(),
        }
    }

    pub async fn timeline(&self, city_name: &str) -> Timeline {
        if city_name.trim().is_empty() {
            return Timeline::single(TimelineEntry {
                date: Utc::now().timestamp(),
                city_name: NO_CITY.to_string(),
                temperature: NOT_AVAILABLE.to_string(),
                icon: UNKNOWN_ICON.to_string(),
                hour: NOT_AVAILABLE.to_string(),
            });
        }

        let controller = self.pipeline.controller();
        let entries = match controller.submit_query(city_name).await {
            Ok(snapshot) => self.entries(city_name, &snapshot),
            Err(e) => {
                tracing::warn!(city = %city_name, error = %e, "Widget timeline degraded");
                Vec::new()
            }
        };

        if entries.is_empty() {
            return Timeline::single(Self::error_entry(city_name));
        }

        tracing::debug!(city = %city_name, entries = entries.len(), "Widget timeline built");
        Timeline::at_end(entries)
    }

    fn entries(&self, city_name: &str, snapshot: &WeatherSnapshot) -> Vec<TimelineEntry> {
        snapshot
            .upcoming_hours(self.max_entries)
            .iter()
            .map(|hour| TimelineEntry {
                date: hour.dt,
                city_name: city_name.to_string(),
                temperature: temperature_label(hour.temp),
                icon: hour
                    .primary_condition()
                    .map_or(UNKNOWN_ICON, |c| icon_key(&c.icon))
                    .to_string(),
                hour: snapshot_time_label(snapshot, hour.dt),
            })
            .collect()
    }

    fn error_entry(city_name: &str) -> TimelineEntry {
        TimelineEntry {
            date: Utc::now().timestamp(),
            city_name: city_name.to_string(),
            temperature: ERROR_TEMPERATURE.to_string(),
            icon: WARNING_ICON.to_string(),
            hour: NOT_AVAILABLE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sessions::test_support::pipeline;

    #[tokio::test]
    async fn test_success_yields_up_to_seven_entries() {
        let provider = WidgetTimelineProvider::new(pipeline(None, 48), 7);
        let timeline = provider.timeline("Toronto").await;

        assert_eq!(timeline.policy, RefreshPolicy::AtEnd);
        assert_eq!(timeline.entries.len(), 7);
        assert!(timeline.entries.windows(2).all(|w| w[0].date < w[1].date));
        assert_eq!(timeline.refresh_at, Some(timeline.entries[6].date));

        let first = &timeline.entries[0];
        assert_eq!(first.city_name, "Toronto");
        assert_eq!(first.temperature, "21°C");
        assert_eq!(first.icon, "partly-cloudy-day");
    }

    #[tokio::test]
    async fn test_short_hourly_section_yields_fewer_entries() {
        let provider = WidgetTimelineProvider::new(pipeline(None, 3), 7);
        let timeline = provider.timeline("Toronto").await;

        assert_eq!(timeline.policy, RefreshPolicy::AtEnd);
        assert_eq!(timeline.entries.len(), 3);
    }

    #[tokio::test]
    async fn test_failure_yields_single_error_entry() {
        let provider = WidgetTimelineProvider::new(pipeline(Some(401), 48), 7);
        let timeline = provider.timeline("Toronto").await;

        assert_eq!(timeline.policy, RefreshPolicy::Never);
        assert_eq!(timeline.entries.len(), 1);
        assert_eq!(timeline.entries[0].temperature, "Error");
        assert_eq!(timeline.entries[0].icon, "warning");
        assert_eq!(timeline.entries[0].city_name, "Toronto");
        assert!(timeline.refresh_at.is_none());
    }

    #[tokio::test]
    async fn test_unknown_city_yields_error_entry() {
        let provider = WidgetTimelineProvider::new(pipeline(None, 48), 7);
        let timeline = provider.timeline("Zzzzzxxqq").await;

        assert_eq!(timeline.policy, RefreshPolicy::Never);
        assert_eq!(timeline.entries[0].city_name, "Zzzzzxxqq");
    }

    #[tokio::test]
    async fn test_missing_hourly_section_is_an_error_entry() {
        let provider = WidgetTimelineProvider::new(pipeline(None, 0), 7);
        let timeline = provider.timeline("Toronto").await;

        assert_eq!(timeline.policy, RefreshPolicy::Never);
        assert_eq!(timeline.entries[0].temperature, "Error");
    }

    #[tokio::test]
    async fn test_blank_city_yields_no_city_entry() {
        let provider = WidgetTimelineProvider::new(pipeline(None, 48), 7);
        let timeline = provider.timeline("  ").await;

        assert_eq!(timeline.policy, RefreshPolicy::Never);
        assert_eq!(timeline.entries[0].city_name, "No City");
        assert_eq!(timeline.entries[0].temperature, "N/A");
    }

    #[test]
    fn test_placeholder() {
        let entry = WidgetTimelineProvider::placeholder(None);
        assert_eq!(entry.city_name, "Sample City");
        assert_eq!(entry.temperature, "20°C");
        assert_eq!(entry.icon, "sun");
        assert_eq!(entry.hour, "2 PM");

        let entry = WidgetTimelineProvider::placeholder(Some("Oslo"));
        assert_eq!(entry.city_name, "Oslo");
        assert_eq!(WidgetTimelineProvider::placeholder(Some(" ")).city_name, "Sample City");
    }

    #[test]
    fn test_policy_serialization() {
        assert_eq!(serde_json::to_value(RefreshPolicy::AtEnd).unwrap(), "at_end");
        assert_eq!(serde_json::to_value(RefreshPolicy::Never).unwrap(), "never");
    }
}
