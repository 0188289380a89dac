use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::error::ErrorResponse;
use crate::forecast::handlers::SessionCreated;
use crate::forecast::models::{
    AlertCard, CityQueryRequest, CoordinatesRequest, CurrentCard, HourlyCard, ViewStateResponse,
};
use crate::forecast::Phase;
use crate::widget::{RefreshPolicy, Timeline, TimelineEntry};

/// OpenAPI documentation for the Hourcast API
///
/// Schema documentation only. Path annotations can be added to handlers
/// as needed.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Hourcast API",
        version = "1.0.0",
        description = "City weather lookup on top of the OpenWeatherMap One Call API, with per-session view-state and an hourly widget timeline.",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    tags(
        (name = "sessions", description = "Forecast view-state sessions"),
        (name = "widget", description = "Hourly widget timeline")
    ),
    components(
        schemas(
            ErrorResponse,
            SessionCreated,
            CityQueryRequest,
            CoordinatesRequest,
            Phase,
            ViewStateResponse,
            CurrentCard,
            HourlyCard,
            AlertCard,
            Timeline,
            TimelineEntry,
            RefreshPolicy,
        )
    )
)]
pub struct ApiDoc;

/// Create the Swagger UI router
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())
}
