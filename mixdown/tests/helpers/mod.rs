//! Test Helper Utilities
//!
//! Shared utilities for mixdown integration tests

#![allow(dead_code)]

pub mod audio_generator;

#[allow(unused_imports)]
pub use audio_generator::{generate_test_library, generate_test_wav, rms, AudioConfig};

use mixdown::progress::ProgressSink;
use mixdown_common::ProgressEvent;
use std::sync::Mutex;

/// Progress sink that keeps every event for later assertions
#[derive(Default)]
pub struct RecordingSink {
    pub events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ProgressSink for RecordingSink {
    fn on_event(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}
