//! Shared integration-test server bootstrap helpers.

#![allow(dead_code)]

use axum_test::TestServer;
use pastelite_core::config::StorageKind;
use pastelite_core::{ManualClock, MemoryBackend, RedbBackend};
use pastelite_server::{create_app, AppState, Config, KeyValueBackend};
use std::sync::Arc;
use tempfile::TempDir;

/// Creation instant shared by the deterministic tests.
pub const T0_MS: i64 = 1_767_225_540_000;

pub struct TestApp {
    pub server: TestServer,
    pub clock: Arc<ManualClock>,
    pub backend: Arc<dyn KeyValueBackend>,
    _temp: Option<TempDir>,
}

pub fn test_config() -> Config {
    Config {
        port: 0,
        storage: StorageKind::Memory,
        max_paste_size: 64 * 1024,
        public_url: None,
        test_mode: true,
        sweep_interval: None,
        ..Config::default()
    }
}

pub fn test_server_for(
    config: Config,
    backend: Arc<dyn KeyValueBackend>,
    clock: Arc<ManualClock>,
) -> TestServer {
    let state = AppState::with_clock(config, backend, clock);
    TestServer::new(create_app(state, false)).expect("server")
}

pub fn setup_memory_app_with(config: Config) -> TestApp {
    let clock = Arc::new(ManualClock::at_millis(T0_MS));
    let backend: Arc<dyn KeyValueBackend> = Arc::new(MemoryBackend::new(clock.clone()));
    TestApp {
        server: test_server_for(config, backend.clone(), clock.clone()),
        clock,
        backend,
        _temp: None,
    }
}

pub fn setup_memory_app() -> TestApp {
    setup_memory_app_with(test_config())
}

pub fn setup_redb_app() -> TestApp {
    let temp_dir = TempDir::new().expect("temp dir");
    let db_path = temp_dir.path().join("db");
    let config = Config {
        storage: StorageKind::Redb,
        db_path: db_path.to_str().expect("db path").to_string(),
        ..test_config()
    };
    let clock = Arc::new(ManualClock::at_millis(T0_MS));
    let backend: Arc<dyn KeyValueBackend> =
        Arc::new(RedbBackend::open(&config.db_path, clock.clone()).expect("open redb"));
    TestApp {
        server: test_server_for(config, backend.clone(), clock.clone()),
        clock,
        backend,
        _temp: Some(temp_dir),
    }
}
