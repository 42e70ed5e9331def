//! Current weather for a favourite

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::TransportError;
use crate::model::{CityWeather, FavoriteCity, Notice, WeatherSource};

#[derive(Clone, Debug, PartialEq)]
pub enum DetailState {
    Idle,
    Loading,
    Loaded(CityWeather),
    Failed(TransportError),
}

struct FetchResult {
    generation: u64,
    result: Result<CityWeather, TransportError>,
}

pub struct DetailController {
    weather: Arc<dyn WeatherSource>,
    city: Option<FavoriteCity>,
    state: DetailState,
    generation: u64,
    task: Option<JoinHandle<()>>,
    tx: mpsc::UnboundedSender<FetchResult>,
    rx: mpsc::UnboundedReceiver<FetchResult>,
}

impl DetailController {
    pub fn new(weather: Arc<dyn WeatherSource>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            weather,
            city: None,
            state: DetailState::Idle,
            generation: 0,
            task: None,
            tx,
            rx,
        }
    }

    pub fn city(&self) -> Option<&FavoriteCity> {
        self.city.as_ref()
    }

    pub fn state(&self) -> &DetailState {
        &self.state
    }

    /// Show `city` and start fetching its weather.
    pub fn open(&mut self, city: FavoriteCity) {
        self.city = Some(city);
        self.refresh();
    }

    pub fn refresh(&mut self) {
        let Some(city) = self.city.clone() else {
            return;
        };
        self.abort();

        let generation = self.generation;
        let weather = self.weather.clone();
        let tx = self.tx.clone();
        tracing::debug!(city = %city.name, generation, "Fetching current weather");
        self.task = Some(tokio::spawn(async move {
            let result = weather.current_weather(&city.name).await;
            let _ = tx.send(FetchResult { generation, result });
        }));
        self.state = DetailState::Loading;
    }

    /// Leave the screen; a fetch still running is dropped.
    pub fn close(&mut self) {
        self.abort();
        self.city = None;
        self.state = DetailState::Idle;
    }

    fn abort(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.generation += 1;
    }

    /// Apply a finished fetch. Returns the notice to show when it failed.
    pub fn poll(&mut self) -> Option<Notice> {
        let mut notice = None;
        while let Ok(FetchResult { generation, result }) = self.rx.try_recv() {
            if generation != self.generation {
                continue;
            }
            self.task = None;
            match result {
                Ok(weather) => {
                    tracing::info!(city = %weather.city, temp = weather.temp, "Weather loaded");
                    self.state = DetailState::Loaded(weather);
                }
                Err(error) => {
                    let city = self
                        .city
                        .as_ref()
                        .map(|city| city.name.clone())
                        .unwrap_or_default();
                    tracing::warn!(city = %city, error = %error, "Weather fetch failed");
                    notice = Some(if error.is_offline() {
                        Notice::Offline
                    } else {
                        Notice::ForecastUnavailable { city }
                    });
                    self.state = DetailState::Failed(error);
                }
            }
        }
        notice
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::Local;

    use super::*;

    struct FakeWeather;

    #[async_trait]
    impl WeatherSource for FakeWeather {
        async fn current_weather(&self, city: &str) -> Result<CityWeather, TransportError> {
            tokio::time::sleep(Duration::from_millis(100)).await;
            match city {
                "Nowhere" => Err(TransportError::Status { code: 404 }),
                "Offline" => Err(TransportError::Unreachable("connection refused".into())),
                _ => Ok(CityWeather {
                    city: city.to_string(),
                    temp: 18.5,
                    feels_like: 17.0,
                    temp_min: 15.0,
                    temp_max: 21.0,
                    pressure: 1012,
                    humidity: 60,
                    description: "light rain".into(),
                    icon: "10d".into(),
                    fetched_at: Local::now(),
                }),
            }
        }
    }

    fn controller() -> DetailController {
        DetailController::new(Arc::new(FakeWeather))
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn loads_weather_for_city() {
        let mut detail = controller();
        detail.open(FavoriteCity::new("Paris", "France"));
        assert_eq!(detail.state(), &DetailState::Loading);

        settle().await;
        assert_eq!(detail.poll(), None);
        match detail.state() {
            DetailState::Loaded(weather) => {
                assert_eq!(weather.city, "Paris");
                assert_eq!(weather.humidity, 60);
            }
            other => panic!("unexpected state: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failures_map_to_notices() {
        let mut detail = controller();
        detail.open(FavoriteCity::new("Nowhere", ""));
        settle().await;
        assert_eq!(
            detail.poll(),
            Some(Notice::ForecastUnavailable { city: "Nowhere".into() })
        );

        detail.open(FavoriteCity::new("Offline", ""));
        settle().await;
        assert_eq!(detail.poll(), Some(Notice::Offline));
        assert!(matches!(detail.state(), DetailState::Failed(e) if e.is_offline()));
    }

    #[tokio::test(start_paused = true)]
    async fn closing_drops_the_pending_fetch() {
        let mut detail = controller();
        detail.open(FavoriteCity::new("Paris", "France"));
        detail.close();
        settle().await;
        assert_eq!(detail.poll(), None);
        assert_eq!(detail.state(), &DetailState::Idle);
        assert!(detail.city().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn reopening_ignores_the_older_city() {
        let mut detail = controller();
        detail.open(FavoriteCity::new("Paris", "France"));
        detail.open(FavoriteCity::new("Lima", "Peru"));
        settle().await;
        detail.poll();
        assert!(matches!(detail.state(), DetailState::Loaded(w) if w.city == "Lima"));
    }
}
