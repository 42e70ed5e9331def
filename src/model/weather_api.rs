//! HTTP client for the city autocomplete and current-weather endpoints

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use reqwest::Client;
use serde::Deserialize;

use crate::config::AppConfig;
use crate::error::TransportError;

/// Remote source of city suggestions for a partial name.
#[async_trait]
pub trait CityLookup: Send + Sync {
    async fn autocomplete(&self, query: &str) -> Result<Vec<String>, TransportError>;
}

/// Remote source of current conditions for a city.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn current_weather(&self, city: &str) -> Result<CityWeather, TransportError>;
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct MainReadings {
    pub temp: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub pressure: i64,
    pub humidity: i64,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Condition {
    pub id: i64,
    pub main: String,
    pub description: String,
    pub icon: String,
}

/// Body of the current-weather endpoint.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct CityWeatherResponse {
    pub main: MainReadings,
    pub name: String,
    pub weather: Vec<Condition>,
}

/// Current conditions as shown on the detail screen.
#[derive(Clone, Debug, PartialEq)]
pub struct CityWeather {
    pub city: String,
    pub temp: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub pressure: i64,
    pub humidity: i64,
    pub description: String,
    pub icon: String,
    pub fetched_at: DateTime<Local>,
}

impl CityWeather {
    pub fn from_response(response: CityWeatherResponse) -> Self {
        let condition = response.weather.into_iter().next();
        Self {
            city: response.name,
            temp: response.main.temp,
            feels_like: response.main.feels_like,
            temp_min: response.main.temp_min,
            temp_max: response.main.temp_max,
            pressure: response.main.pressure,
            humidity: response.main.humidity,
            description: condition
                .as_ref()
                .map(|c| c.description.clone())
                .unwrap_or_default(),
            icon: condition.map(|c| c.icon).unwrap_or_default(),
            fetched_at: Local::now(),
        }
    }
}

/// Shared HTTP client for both endpoints. Cheap to clone.
#[derive(Clone)]
pub struct WeatherApi {
    client: Client,
    autocomplete_url: String,
    weather_url: String,
    api_key: String,
}

impl WeatherApi {
    pub fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            autocomplete_url: config.autocomplete_url.clone(),
            weather_url: config.weather_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    async fn get_json<R: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<R, TransportError> {
        let response = self.client.get(url).query(query).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                code: status.as_u16(),
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| TransportError::Decode(e.to_string()))
    }
}

#[async_trait]
impl CityLookup for WeatherApi {
    async fn autocomplete(&self, query: &str) -> Result<Vec<String>, TransportError> {
        crate::log_request!("autocomplete", query);
        let result = self
            .get_json::<Vec<String>>(&self.autocomplete_url, &[("q", query)])
            .await;
        crate::log_request_result!("autocomplete", result);
        result
    }
}

#[async_trait]
impl WeatherSource for WeatherApi {
    async fn current_weather(&self, city: &str) -> Result<CityWeather, TransportError> {
        crate::log_request!("current_weather", city);
        let result = self
            .get_json::<CityWeatherResponse>(
                &self.weather_url,
                &[("q", city), ("units", "metric"), ("appid", self.api_key.as_str())],
            )
            .await
            .map(CityWeather::from_response);
        crate::log_request_result!("current_weather", result);
        result
    }
}
