//! Shared helpers for player integration tests

#![allow(dead_code)]

pub mod mock_transport;
pub mod pcm_fixtures;
