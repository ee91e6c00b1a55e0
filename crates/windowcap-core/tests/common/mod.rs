//! Shared fixtures for core integration tests

#![allow(dead_code)]

#[cfg(target_os = "linux")]
pub mod x11_fixture;

use std::sync::Arc;

use windowcap_core::{
    CaptureEngine, Dispatcher,
    capture::{MockBackend, composite_from_mock},
};

/// Engine over a mock backend; the mock is returned for probing.
pub fn mock_engine(mock: MockBackend) -> (Arc<CaptureEngine>, Arc<MockBackend>) {
    let mock = Arc::new(mock);
    let engine = CaptureEngine::new(Arc::new(composite_from_mock(mock.clone())));
    (Arc::new(engine), mock)
}

/// Running dispatcher over a mock backend.
pub fn mock_dispatcher(mock: MockBackend) -> (Arc<Dispatcher>, Arc<MockBackend>) {
    let (engine, mock) = mock_engine(mock);
    let dispatcher = Dispatcher::start(engine).expect("capture context should start");
    (dispatcher, mock)
}

/// True when an X display is configured.
pub fn x11_available() -> bool {
    std::env::var("DISPLAY").is_ok_and(|d| !d.is_empty())
}
