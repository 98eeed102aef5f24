//! Page-level state and the timers that drive it.
//!
//! Four independent tasks write into one [`DashboardState`]: the clock ticker,
//! the one-shot location resolver, the weather poller and the network poller.
//! Each owns a disjoint field, so the mutex is only ever held for a plain
//! assignment and never across an await point.

use std::fmt::Write as _;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{interval, MissedTickBehavior};

use crate::backend::{BackendApi, HttpBackend};
use crate::clock::{ClockState, LocalClock, TimeSource, TIMELINE};
use crate::config::Config;
use crate::location::{
    device_locator, Coordinates, DeviceLocator, HttpLocationLookup, Location, LocationLookup,
    LocationResolver,
};
use crate::logging::{info, obj, v_num, v_str, Domain, ProfileScope};
use crate::network::{NetworkProbe, NetworkState, SPEED_BAR_COUNT};
use crate::search::{BrowserNavigator, Navigation, Navigator, SearchBox};
use crate::weather::{WeatherState, WEEKDAY_LABELS};

const PROGRESS_WIDTH: usize = 32;

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardState {
    pub clock: ClockState,
    pub location: Location,
    pub weather: WeatherState,
    pub network: NetworkState,
    pub search: SearchBox,
}

impl DashboardState {
    pub fn new(cfg: &Config) -> Self {
        Self {
            clock: ClockState::default(),
            location: cfg.fallback_location.clone(),
            weather: WeatherState::default(),
            network: NetworkState::default(),
            search: SearchBox::default(),
        }
    }
}

/// External collaborators the dashboard talks to.
pub struct Services {
    pub backend: Arc<dyn BackendApi>,
    pub locator: Arc<dyn DeviceLocator>,
    pub lookup: Arc<dyn LocationLookup>,
    pub navigator: Arc<dyn Navigator>,
    pub time: Arc<dyn TimeSource>,
}

impl Services {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            backend: Arc::new(HttpBackend::new(cfg)),
            locator: device_locator(cfg),
            lookup: Arc::new(HttpLocationLookup::new(cfg)),
            navigator: Arc::new(BrowserNavigator),
            time: Arc::new(LocalClock),
        }
    }
}

fn lock(state: &Mutex<DashboardState>) -> MutexGuard<'_, DashboardState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct Dashboard {
    config: Config,
    state: Arc<Mutex<DashboardState>>,
    navigator: Arc<dyn Navigator>,
    tasks: Vec<JoinHandle<()>>,
}

impl Dashboard {
    /// Spawns every timer onto the current tokio runtime.
    pub fn start(config: Config, services: Services) -> Self {
        let state = Arc::new(Mutex::new(DashboardState::new(&config)));
        let (coords_tx, coords_rx) = watch::channel(config.fallback_location.coords);
        let resolver = LocationResolver::new(&config, services.locator, services.lookup);

        let mut tasks = vec![
            tokio::spawn(run_clock(state.clone(), services.time, config.clock_tick)),
            tokio::spawn(resolve_location(state.clone(), resolver, coords_tx)),
            tokio::spawn(poll_weather(
                state.clone(),
                services.backend.clone(),
                coords_rx,
                config.weather_every,
            )),
        ];
        if config.show_network {
            let probe = Arc::new(NetworkProbe::new(services.backend, config.speed_payload_bytes));
            tasks.push(tokio::spawn(poll_network(state.clone(), probe, config.network_every)));
        }

        info(
            Domain::System,
            "started",
            obj(&[
                ("backend", v_str(&config.backend_url)),
                ("tasks", v_num(tasks.len() as f64)),
            ]),
        );

        Self {
            config,
            state,
            navigator: services.navigator,
            tasks,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn snapshot(&self) -> DashboardState {
        lock(&self.state).clone()
    }

    pub fn set_query(&self, text: &str) {
        lock(&self.state).search.set(text);
    }

    /// Enter key on the search box. The state lock is released before the
    /// navigator runs.
    pub fn submit(&self) -> Option<Navigation> {
        let submitted = lock(&self.state).search.clone();
        let mut pending = submitted.clone();
        let nav = pending.submit(&self.config.search_engine_url, self.navigator.as_ref())?;
        let mut state = lock(&self.state);
        // keep anything typed while the browser was opening
        if state.search == submitted {
            state.search = pending;
        }
        Some(nav)
    }

    pub fn render(&self) -> String {
        render(&self.snapshot(), &self.config)
    }

    pub fn is_running(&self) -> bool {
        self.tasks.iter().any(|t| !t.is_finished())
    }

    /// Cancels every timer. Safe to call more than once.
    pub fn shutdown(&mut self) {
        if self.tasks.is_empty() {
            return;
        }
        for task in self.tasks.drain(..) {
            task.abort();
        }
        info(Domain::Clock, "ticker_stopped", obj(&[]));
        info(Domain::System, "stopped", obj(&[]));
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn run_clock(state: Arc<Mutex<DashboardState>>, time: Arc<dyn TimeSource>, every: Duration) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info(
        Domain::Clock,
        "ticker_started",
        obj(&[("period_ms", v_num(every.as_millis() as f64))]),
    );
    loop {
        ticker.tick().await;
        let clock = ClockState::at(&time.now());
        lock(&state).clock = clock;
    }
}

async fn resolve_location(
    state: Arc<Mutex<DashboardState>>,
    resolver: LocationResolver,
    coords_tx: watch::Sender<Coordinates>,
) {
    resolver
        .resolve(|location| {
            lock(&state).location = location.clone();
            coords_tx.send_if_modified(|current| {
                if *current == location.coords {
                    false
                } else {
                    *current = location.coords;
                    true
                }
            });
        })
        .await;
}

/// Fetches on start, on every coordinate change and then every `every`.
async fn poll_weather(
    state: Arc<Mutex<DashboardState>>,
    backend: Arc<dyn BackendApi>,
    mut coords: watch::Receiver<Coordinates>,
    every: Duration,
) {
    let mut follow = true;
    loop {
        let current = *coords.borrow_and_update();
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let result = {
                        let _scope = ProfileScope::with_context(
                            "weather_fetch",
                            &[("lat", v_num(current.latitude)), ("lon", v_num(current.longitude))],
                        );
                        backend.weather(current).await
                    };
                    lock(&state).weather.apply(result);
                }
                changed = coords.changed(), if follow => {
                    match changed {
                        Ok(()) => break,
                        // resolver finished and dropped its sender
                        Err(_) => follow = false,
                    }
                }
            }
        }
    }
}

/// Starts a measurement on every tick, like a page interval timer; the
/// probe's in-flight flag turns overlapping ticks into skips.
async fn poll_network(state: Arc<Mutex<DashboardState>>, probe: Arc<NetworkProbe>, every: Duration) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut running = JoinSet::new();
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let probe = probe.clone();
                let state = state.clone();
                running.spawn(async move {
                    probe.poll(|m| lock(&state).network.record(m)).await;
                });
            }
            Some(_) = running.join_next(), if !running.is_empty() => {}
        }
    }
}

fn fmt_temp(t: f64) -> String {
    if t.fract() == 0.0 {
        format!("{:.0} °C", t)
    } else {
        format!("{} °C", t)
    }
}

/// Text rendering of the whole page.
pub fn render(state: &DashboardState, cfg: &Config) -> String {
    let mut out = String::new();
    let clock = &state.clock;

    let _ = writeln!(out, "{}  {}", clock.time, clock.time_of_day.label());
    let _ = writeln!(out, "{} {} {}", clock.day, clock.month_name(), clock.year);

    let strip: Vec<String> = TIMELINE
        .iter()
        .map(|bucket| {
            if clock.is_active(*bucket) {
                format!("[{}]", bucket.label())
            } else {
                bucket.label().to_string()
            }
        })
        .collect();
    let _ = writeln!(out, "{}", strip.join(" "));

    let filled = (usize::from(clock.day_progress) * PROGRESS_WIDTH + 50) / 100;
    let _ = writeln!(
        out,
        "[{}{}] {}%",
        "#".repeat(filled),
        "-".repeat(PROGRESS_WIDTH - filled),
        clock.day_progress
    );
    out.push('\n');

    let weather = state.weather.display();
    let _ = writeln!(
        out,
        "{}  {} {}",
        state.location.city,
        weather.main.state.icon(),
        fmt_temp(weather.main.temp)
    );
    let parts = [
        ("Утро", weather.day.morning),
        ("День", weather.day.day),
        ("Вечер", weather.day.evening),
    ];
    let parts: Vec<String> = parts
        .iter()
        .map(|(label, r)| format!("{} {} {}", label, r.state.icon(), fmt_temp(r.temp)))
        .collect();
    let _ = writeln!(out, "{}", parts.join(" | "));
    let week: Vec<String> = WEEKDAY_LABELS
        .iter()
        .zip(weather.week.days())
        .map(|(label, d)| format!("{} {} {}", label, d.state.icon(), fmt_temp(d.max)))
        .collect();
    let _ = writeln!(out, "{}", week.join(" | "));
    if state.weather.snapshot.is_none() {
        let _ = writeln!(out, "(нет данных о погоде)");
    }

    if cfg.show_network {
        let net = &state.network;
        out.push('\n');
        let _ = writeln!(
            out,
            "Скорость интернета {} мбит/с  Ср. скорость {} мбит/с  Ping {} мс",
            net.throughput_mbps, net.average_mbps, net.latency_ms
        );
        let bars = usize::from(net.speed_bars());
        let _ = writeln!(
            out,
            "[{}{}]",
            "|".repeat(bars),
            ".".repeat(usize::from(SPEED_BAR_COUNT) - bars)
        );
    }

    out.push('\n');
    let _ = write!(out, "> {}", state.search.query);
    out
}
