//! Connectivity transitions, the lifecycle bus and the persisted theme.

use std::path::PathBuf;

use margingate_dash::connectivity::{Connectivity, ConnectivityTracker};
use margingate_dash::lifecycle::{LifecycleEvent, LifecycleSignals};
use margingate_dash::theme::Theme;

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir()
        .join(format!("margingate-dash-test-{}", std::process::id()))
        .join(name)
}

// ── Test 1: connectivity ──
#[test]
fn test_first_success_is_not_a_restore() {
    let mut t = ConnectivityTracker::new();
    assert_eq!(t.state(), Connectivity::Unknown);
    assert_eq!(t.observe(true), None);
    assert_eq!(t.state(), Connectivity::Online);
    assert_eq!(t.observe(true), None);
    assert_eq!(t.outages(), 0);
}

#[test]
fn test_restore_after_outage() {
    let mut t = ConnectivityTracker::new();
    t.observe(true);
    assert_eq!(t.observe(false), None);
    // Repeated failures are one outage.
    assert_eq!(t.observe(false), None);
    assert_eq!(t.outages(), 1);
    assert_eq!(t.observe(true), Some(LifecycleEvent::ConnectivityRestored));
    assert_eq!(t.observe(true), None);

    t.observe(false);
    assert_eq!(t.observe(true), Some(LifecycleEvent::ConnectivityRestored));
    assert_eq!(t.outages(), 2);
}

#[test]
fn test_offline_at_startup_then_online() {
    let mut t = ConnectivityTracker::new();
    assert_eq!(t.observe(false), None);
    assert_eq!(t.outages(), 1);
    assert_eq!(t.observe(true), Some(LifecycleEvent::ConnectivityRestored));
}

// ── Test 2: lifecycle bus ──
#[test]
fn test_lifecycle_event_names() {
    assert_eq!(LifecycleEvent::parse("Focus"), Some(LifecycleEvent::FocusRegained));
    assert_eq!(LifecycleEvent::parse("connectivity_restored"), Some(LifecycleEvent::ConnectivityRestored));
    assert_eq!(LifecycleEvent::parse("blur"), None);
    assert_eq!(LifecycleEvent::ConnectivityRestored.label(), "online");
}

#[tokio::test]
async fn test_emit_reaches_every_subscriber() {
    let signals = LifecycleSignals::new();
    assert_eq!(signals.emit(LifecycleEvent::FocusRegained), 0);

    let mut a = signals.subscribe();
    let mut b = signals.clone().subscribe();
    assert_eq!(signals.listener_count(), 2);
    assert_eq!(signals.emit(LifecycleEvent::FocusRegained), 2);
    assert_eq!(a.recv().await.unwrap(), LifecycleEvent::FocusRegained);
    assert_eq!(b.recv().await.unwrap(), LifecycleEvent::FocusRegained);

    drop(a);
    assert_eq!(signals.emit(LifecycleEvent::ConnectivityRestored), 1);
}

// ── Test 3: theme preference ──
#[test]
fn test_theme_defaults_and_toggle() {
    assert_eq!(Theme::default(), Theme::Light);
    assert_eq!(Theme::Light.toggled(), Theme::Dark);
    assert_eq!(Theme::Dark.toggled(), Theme::Light);
    assert_eq!(Theme::parse(" dark\n"), Some(Theme::Dark));
    assert_eq!(Theme::parse("solarized"), None);
}

#[test]
fn test_theme_save_and_load() {
    let path = temp_path("nested/theme");
    let _ = std::fs::remove_file(&path);

    assert_eq!(Theme::load(&path), Theme::Light);
    Theme::Dark.save(&path).unwrap();
    assert_eq!(Theme::load(&path), Theme::Dark);
    Theme::Dark.toggled().save(&path).unwrap();
    assert_eq!(Theme::load(&path), Theme::Light);

    std::fs::write(&path, "garbage").unwrap();
    assert_eq!(Theme::load(&path), Theme::Light);

    let _ = std::fs::remove_dir_all(path.parent().and_then(|p| p.parent()).unwrap());
}
