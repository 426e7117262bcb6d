// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Running trace clock.
//!
//! Packet records carry only a time offset; their absolute time depends on
//! the absolute and relative time records read before them.

use serde::Serialize;

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Clock state rebuilt from time records in file order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunningClock {
    /// Current time in whole seconds since the Unix epoch
    secs: u64,
    /// Milliseconds accumulated from relative time records
    millis: u64,
    /// Value of `millis` already folded into `secs`
    folded_millis: u64,
}

impl RunningClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply an absolute time record.
    pub fn set_absolute(&mut self, secs: u32, millis: u32) {
        self.secs = u64::from(secs);
        self.millis += u64::from(millis);
        self.folded_millis = self.millis;
    }

    /// Apply a relative time record; whole elapsed seconds move the clock.
    pub fn advance_millis(&mut self, millis: u32) {
        self.millis += u64::from(millis);
        let elapsed_secs = (self.millis - self.folded_millis) / 1000;
        self.secs += elapsed_secs;
        self.folded_millis += elapsed_secs * 1000;
    }

    /// Current time in whole seconds.
    pub fn secs(&self) -> u64 {
        self.secs
    }

    /// Current time in nanoseconds.
    pub fn now_ns(&self) -> u64 {
        self.secs.saturating_mul(NANOS_PER_SEC)
    }

    /// Timestamp of a packet whose record carries `micros` of high resolution
    /// relative time.
    pub fn packet_time_ns(&self, micros: u32) -> u64 {
        self.now_ns().saturating_add(u64::from(micros) * 1000)
    }
}

/// Split a nanosecond timestamp into seconds and the sub-second remainder.
pub fn split_ns(ns: u64) -> (i64, u32) {
    let secs = i64::try_from(ns / NANOS_PER_SEC).unwrap_or(i64::MAX);
    (secs, (ns % NANOS_PER_SEC) as u32)
}
