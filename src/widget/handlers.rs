use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use super::{Timeline, TimelineEntry, WidgetTimelineProvider};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct TimelineQuery {
    /// City name, falls back to the configured default city
    pub city: Option<String>,
}

/// Hourly widget timeline
///
/// GET /api/v1/widget/timeline?city=Toronto
///
/// Always 200: failures degrade to a single error entry.
pub async fn get_timeline(
    State(state): State<AppState>,
    Query(query): Query<TimelineQuery>,
) -> Json<Timeline> {
    let city = query
        .city
        .unwrap_or_else(|| state.config.default_city.clone());
    Json(state.widget.timeline(&city).await)
}

/// Preview entry, labelled with the city when one is given
///
/// GET /api/v1/widget/placeholder?city=Oslo
pub async fn get_placeholder(Query(query): Query<TimelineQuery>) -> Json<TimelineEntry> {
    Json(WidgetTimelineProvider::placeholder(query.city.as_deref()))
}
