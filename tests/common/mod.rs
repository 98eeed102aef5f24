//! In-memory stand-ins for the dashboard's external collaborators.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use tabdash::backend::BackendApi;
use tabdash::clock::TimeSource;
use tabdash::http::FetchError;
use tabdash::location::{
    Coordinates, DeviceLocator, GeoError, IpLocation, LocationLookup, ReverseGeocode,
};
use tabdash::search::Navigator;
use tabdash::weather::WeatherSnapshot;
use tabdash::Services;

pub fn snapshot(temp: f64) -> WeatherSnapshot {
    let mut snap = WeatherSnapshot::placeholder();
    snap.main.temp = temp;
    snap
}

#[derive(Default)]
pub struct FakeBackend {
    pub weather_results: Mutex<VecDeque<Result<WeatherSnapshot, FetchError>>>,
    pub weather_calls: Mutex<Vec<Coordinates>>,
    pub ping_delay: Duration,
    pub ping_fails: bool,
    pub speed_delay: Duration,
    pub speed_bytes: usize,
    pub speed_calls: AtomicUsize,
    pub active_speed: AtomicUsize,
    pub max_active_speed: AtomicUsize,
}

impl FakeBackend {
    pub fn push_weather(&self, result: Result<WeatherSnapshot, FetchError>) {
        self.weather_results.lock().unwrap().push_back(result);
    }

    pub fn weather_calls(&self) -> Vec<Coordinates> {
        self.weather_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl BackendApi for FakeBackend {
    async fn weather(&self, coords: Coordinates) -> Result<WeatherSnapshot, FetchError> {
        self.weather_calls.lock().unwrap().push(coords);
        self.weather_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(FetchError::Status(503)))
    }

    async fn ping(&self) -> Result<(), FetchError> {
        tokio::time::sleep(self.ping_delay).await;
        if self.ping_fails {
            Err(FetchError::Status(502))
        } else {
            Ok(())
        }
    }

    async fn speed(&self) -> Result<usize, FetchError> {
        self.speed_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.active_speed.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active_speed.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.speed_delay).await;
        self.active_speed.fetch_sub(1, Ordering::SeqCst);
        Ok(self.speed_bytes)
    }
}

pub enum DeviceBehavior {
    Fix(Coordinates),
    Deny(&'static str),
    Unavailable,
    Hang,
}

pub struct FakeLocator(pub DeviceBehavior);

#[async_trait]
impl DeviceLocator for FakeLocator {
    async fn locate(&self) -> Result<Coordinates, GeoError> {
        match &self.0 {
            DeviceBehavior::Fix(c) => Ok(*c),
            DeviceBehavior::Deny(msg) => Err(GeoError::Denied(msg.to_string())),
            DeviceBehavior::Unavailable => Err(GeoError::Unavailable),
            DeviceBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(GeoError::Unavailable)
            }
        }
    }
}

#[derive(Default)]
pub struct FakeLookup {
    pub reverse: Option<ReverseGeocode>,
    pub ip: Option<IpLocation>,
    pub reverse_calls: AtomicUsize,
    pub ip_calls: AtomicUsize,
}

#[async_trait]
impl LocationLookup for FakeLookup {
    async fn reverse_geocode(&self, _coords: Coordinates) -> Result<ReverseGeocode, FetchError> {
        self.reverse_calls.fetch_add(1, Ordering::SeqCst);
        self.reverse.clone().ok_or(FetchError::Status(500))
    }

    async fn ip_lookup(&self) -> Result<IpLocation, FetchError> {
        self.ip_calls.fetch_add(1, Ordering::SeqCst);
        self.ip.clone().ok_or(FetchError::Status(429))
    }
}

#[derive(Default)]
pub struct RecordingNavigator(pub Mutex<Vec<String>>);

impl Navigator for RecordingNavigator {
    fn navigate(&self, url: &str) -> anyhow::Result<()> {
        self.0.lock().unwrap().push(url.to_string());
        Ok(())
    }
}

/// Fixed wall-clock time that counts how often it is read.
pub struct CountingClock {
    pub at: NaiveDateTime,
    pub reads: AtomicUsize,
}

impl CountingClock {
    pub fn new(h: u32, m: u32) -> Self {
        Self {
            at: NaiveDate::from_ymd_opt(2025, 1, 15)
                .unwrap()
                .and_hms_opt(h, m, 0)
                .unwrap(),
            reads: AtomicUsize::new(0),
        }
    }
}

impl TimeSource for CountingClock {
    fn now(&self) -> NaiveDateTime {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.at
    }
}

pub struct Fakes {
    pub backend: Arc<FakeBackend>,
    pub lookup: Arc<FakeLookup>,
    pub navigator: Arc<RecordingNavigator>,
    pub clock: Arc<CountingClock>,
    pub device: DeviceBehavior,
}

impl Fakes {
    pub fn new(backend: FakeBackend, lookup: FakeLookup, device: DeviceBehavior) -> Self {
        Self {
            backend: Arc::new(backend),
            lookup: Arc::new(lookup),
            navigator: Arc::new(RecordingNavigator::default()),
            clock: Arc::new(CountingClock::new(19, 30)),
            device,
        }
    }

    pub fn services(self) -> (Services, Arc<FakeBackend>, Arc<FakeLookup>, Arc<RecordingNavigator>, Arc<CountingClock>) {
        let services = Services {
            backend: self.backend.clone(),
            locator: Arc::new(FakeLocator(self.device)),
            lookup: self.lookup.clone(),
            navigator: self.navigator.clone(),
            time: self.clock.clone(),
        };
        (services, self.backend, self.lookup, self.navigator, self.clock)
    }
}
