mod client;
pub mod models;

pub use client::{FetchError, WeatherClient, WeatherSource};
pub use models::{
    Alert, Coordinate, ForecastSection, HourlyPoint, WeatherQuery, WeatherSnapshot,
};
