pub mod handlers;
mod timeline;

pub use timeline::{RefreshPolicy, Timeline, TimelineEntry, WidgetTimelineProvider};
