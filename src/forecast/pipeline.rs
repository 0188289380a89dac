use std::collections::BTreeSet;
use std::sync::Arc;

use super::state::ForecastController;
use crate::geocoding::Geocoder;
use crate::weather::{ForecastSection, WeatherSource};

/// Shared collaborators from which independent controllers are built.
///
/// Each UI session and each widget refresh gets its own controller, so no
/// view-state is ever shared between them.
#[derive(Clone)]
pub struct ForecastPipeline {
    geocoder: Arc<dyn Geocoder>,
    weather: Arc<dyn WeatherSource>,
    excluded_sections: BTreeSet<ForecastSection>,
}

impl ForecastPipeline {
    pub fn new(
        geocoder: Arc<dyn Geocoder>,
        weather: Arc<dyn WeatherSource>,
        excluded_sections: BTreeSet<ForecastSection>,
    ) -> Self {
        Self {
            geocoder,
            weather,
            excluded_sections,
        }
    }

    pub fn controller(&self) -> ForecastController {
        ForecastController::new(
            Arc::clone(&self.geocoder),
            Arc::clone(&self.weather),
            self.excluded_sections.clone(),
        )
    }
}
