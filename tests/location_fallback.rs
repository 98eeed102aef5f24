//! Device fix → IP geolocation → configured default.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use common::{DeviceBehavior, FakeLocator, FakeLookup};
use tabdash::location::{Coordinates, IpLocation, Location, LocationResolver, ReverseGeocode};
use tabdash::Config;

fn resolver(device: DeviceBehavior, lookup: Arc<FakeLookup>) -> LocationResolver {
    LocationResolver::new(&Config::default(), Arc::new(FakeLocator(device)), lookup)
}

async fn resolve(resolver: &LocationResolver) -> (Location, Vec<Location>) {
    let mut seen = Vec::new();
    let loc = resolver.resolve(|l| seen.push(l.clone())).await;
    (loc, seen)
}

#[tokio::test]
async fn denied_then_ip_success_uses_ip_city() {
    let lookup = Arc::new(FakeLookup {
        ip: Some(IpLocation {
            latitude: Some(55.75),
            longitude: Some(37.61),
            city: Some("Москва".into()),
        }),
        ..Default::default()
    });
    let (loc, _) = resolve(&resolver(DeviceBehavior::Deny("User denied Geolocation"), lookup.clone())).await;

    assert_eq!(loc.city, "Москва");
    assert_eq!(loc.coords, Coordinates::new(55.75, 37.61));
    assert_eq!(lookup.ip_calls.load(Ordering::SeqCst), 1);
    assert_eq!(lookup.reverse_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn denied_then_ip_failure_uses_default() {
    let lookup = Arc::new(FakeLookup::default());
    let (loc, seen) = resolve(&resolver(DeviceBehavior::Deny("blocked"), lookup)).await;

    assert_eq!(loc, Config::default().fallback_location);
    assert_eq!(loc.city, "Белгород");
    assert_eq!(seen, vec![loc]);
}

#[tokio::test]
async fn unavailable_capability_takes_ip_path() {
    let lookup = Arc::new(FakeLookup {
        ip: Some(IpLocation {
            latitude: None,
            longitude: Some(30.0),
            city: None,
        }),
        ..Default::default()
    });
    let (loc, _) = resolve(&resolver(DeviceBehavior::Unavailable, lookup)).await;

    // each missing field falls back on its own
    assert_eq!(loc.coords, Coordinates::new(50.6167, 30.0));
    assert_eq!(loc.city, "Белгород");
}

#[tokio::test]
async fn device_fix_uses_reverse_geocoded_city() {
    let fix = Coordinates::new(51.73, 36.19);
    let lookup = Arc::new(FakeLookup {
        reverse: Some(ReverseGeocode {
            city: None,
            locality: Some("Курск".into()),
        }),
        ..Default::default()
    });
    let (loc, seen) = resolve(&resolver(DeviceBehavior::Fix(fix), lookup.clone())).await;

    assert_eq!(loc, Location::new(fix, "Курск"));
    // coordinates are published before the city is known
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0], Location::new(fix, "Белгород"));
    assert_eq!(lookup.ip_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn reverse_geocode_failure_uses_unknown_city() {
    let fix = Coordinates::new(1.0, 2.0);
    let (loc, _) = resolve(&resolver(DeviceBehavior::Fix(fix), Arc::new(FakeLookup::default()))).await;

    assert_eq!(loc.coords, fix);
    assert_eq!(loc.city, "Неизвестно");
}

#[tokio::test(start_paused = true)]
async fn hanging_device_times_out_into_ip_fallback() {
    let lookup = Arc::new(FakeLookup {
        ip: Some(IpLocation {
            latitude: Some(10.0),
            longitude: Some(20.0),
            city: Some("Лиссабон".into()),
        }),
        ..Default::default()
    });
    let started = tokio::time::Instant::now();
    let (loc, _) = resolve(&resolver(DeviceBehavior::Hang, lookup)).await;

    assert_eq!(loc.city, "Лиссабон");
    assert_eq!(started.elapsed(), Config::default().geolocation_timeout);
}
