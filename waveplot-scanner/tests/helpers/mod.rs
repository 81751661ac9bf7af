//! Shared fixtures for waveplot-scanner integration tests
//!
//! Each test binary uses a different subset.
#![allow(dead_code)]

pub mod fake_engine;
pub mod mock_server;
