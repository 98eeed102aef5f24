//! Internet speed and ping gauge.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::time::Instant;

use crate::backend::BackendApi;
use crate::http::FetchError;
use crate::logging::{error, info, obj, v_num, v_str, warn, Domain};

/// Number of segments in the speed gauge; full scale is 100 Mbit/s.
pub const SPEED_BAR_COUNT: u8 = 9;
const GAUGE_FULL_SCALE_MBPS: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NetworkState {
    pub latency_ms: u64,
    pub throughput_mbps: u64,
    pub average_mbps: u64,
}

impl Default for NetworkState {
    fn default() -> Self {
        Self {
            latency_ms: 500,
            throughput_mbps: 23,
            average_mbps: 18,
        }
    }
}

impl NetworkState {
    pub fn record(&mut self, m: &Measurement) {
        self.latency_ms = m.latency_ms;
        self.throughput_mbps = m.throughput_mbps;
        self.average_mbps = running_average(self.average_mbps, m.throughput_mbps);
    }

    pub fn speed_bars(&self) -> u8 {
        speed_bars(self.throughput_mbps)
    }
}

/// Two-term average of the previous average and the newest sample.
pub fn running_average(prev: u64, sample: u64) -> u64 {
    ((prev + sample) as f64 / 2.0).round() as u64
}

pub fn latency_ms(elapsed: Duration) -> u64 {
    (elapsed.as_secs_f64() * 1000.0).round() as u64
}

/// Megabits per second; a zero duration counts as one microsecond.
pub fn throughput_mbps(bytes: usize, elapsed: Duration) -> u64 {
    let secs = elapsed.as_secs_f64().max(1e-6);
    let megabits = bytes as f64 * 8.0 / 1_000_000.0;
    (megabits / secs).round() as u64
}

pub fn speed_bars(throughput_mbps: u64) -> u8 {
    let bars = (throughput_mbps as f64 / GAUGE_FULL_SCALE_MBPS * f64::from(SPEED_BAR_COUNT)).round();
    bars.min(f64::from(SPEED_BAR_COUNT)) as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Measurement {
    pub latency_ms: u64,
    pub throughput_mbps: u64,
    pub bytes: usize,
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("a measurement is already in flight")]
    InFlight,

    #[error("ping failed: {0}")]
    Ping(FetchError),

    #[error("speed test failed: {0}")]
    Speed(FetchError),
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Ping + download probe against the backend. At most one measurement runs
/// at a time; the flag is released even if the measuring task is aborted.
pub struct NetworkProbe {
    backend: Arc<dyn BackendApi>,
    in_flight: AtomicBool,
    fallback_payload: usize,
}

impl NetworkProbe {
    pub fn new(backend: Arc<dyn BackendApi>, fallback_payload: usize) -> Self {
        Self {
            backend,
            in_flight: AtomicBool::new(false),
            fallback_payload,
        }
    }

    pub async fn measure(&self) -> Result<Measurement, ProbeError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(ProbeError::InFlight);
        }
        let _guard = InFlightGuard(&self.in_flight);

        let started = Instant::now();
        self.backend.ping().await.map_err(ProbeError::Ping)?;
        let latency_ms = latency_ms(started.elapsed());

        let started = Instant::now();
        let received = self.backend.speed().await.map_err(ProbeError::Speed)?;
        let elapsed = started.elapsed();
        let bytes = if received == 0 { self.fallback_payload } else { received };

        Ok(Measurement {
            latency_ms,
            throughput_mbps: throughput_mbps(bytes, elapsed),
            bytes,
        })
    }

    /// One poll cycle: measure and hand the result to `apply`, or log and skip it.
    pub async fn poll(&self, apply: impl FnOnce(&Measurement)) {
        match self.measure().await {
            Ok(m) => {
                info(
                    Domain::Network,
                    "measured",
                    obj(&[
                        ("latency_ms", v_num(m.latency_ms as f64)),
                        ("throughput_mbps", v_num(m.throughput_mbps as f64)),
                        ("bytes", v_num(m.bytes as f64)),
                    ]),
                );
                apply(&m);
            }
            Err(ProbeError::InFlight) => {
                warn(Domain::Network, "skipped_overlap", obj(&[]));
            }
            Err(err) => {
                error(Domain::Network, "measure_failed", obj(&[("msg", v_str(&err.to_string()))]));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_average() {
        assert_eq!(running_average(18, 23), 21);
        assert_eq!(running_average(10, 11), 11);
        assert_eq!(running_average(0, 0), 0);
        for v in [1, 7, 40, 250] {
            assert_eq!(running_average(v, v), v);
        }
    }

    #[test]
    fn test_throughput() {
        // 50 KiB in 100 ms = 4.096 Mbit/s
        assert_eq!(throughput_mbps(51_200, Duration::from_millis(100)), 4);
        assert_eq!(throughput_mbps(1_000_000, Duration::from_secs(1)), 8);
        assert_eq!(throughput_mbps(0, Duration::from_secs(1)), 0);
        assert!(throughput_mbps(51_200, Duration::ZERO) > 0);
    }

    #[test]
    fn test_latency_rounding() {
        assert_eq!(latency_ms(Duration::from_micros(12_400)), 12);
        assert_eq!(latency_ms(Duration::from_micros(12_600)), 13);
    }

    #[test]
    fn test_speed_bars_scale() {
        assert_eq!(speed_bars(0), 0);
        assert_eq!(speed_bars(23), 2);
        assert_eq!(speed_bars(50), 5);
        assert_eq!(speed_bars(100), 9);
        assert_eq!(speed_bars(400), 9);
    }

    #[test]
    fn test_record_updates_average() {
        let mut state = NetworkState::default();
        state.record(&Measurement {
            latency_ms: 42,
            throughput_mbps: 30,
            bytes: 51_200,
        });
        assert_eq!(state.latency_ms, 42);
        assert_eq!(state.throughput_mbps, 30);
        assert_eq!(state.average_mbps, 24);
    }
}
