/*
 *  memory.rs
 *
 *  ArtMatrix - the cover, in pixels
 *  (c) 2020-26 Stuart Hunter
 *
 *  Explicit heap reclaim checkpoints around network and pixel work
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */
//! Reclaim checkpoints.
//!
//! The controller runs on boards with very little RAM, so peak heap is kept
//! down by hand: response bodies and artwork grids are dropped before the next
//! allocation-heavy step, and at each checkpoint freed pages are handed back to
//! the OS. Checkpoints are counted so tests can see they happen.

use log::trace;
use std::fs;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone, Default)]
pub struct Checkpoints {
    count: Arc<AtomicUsize>,
}

impl Checkpoints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return freed heap to the OS and log what is left.
    pub fn reclaim(&self, site: &'static str) {
        self.count.fetch_add(1, Ordering::Relaxed);
        trim_heap();
        if log::log_enabled!(log::Level::Trace) {
            match mem_available_kib() {
                Ok(kib) => trace!("reclaim @{}: {} KiB available", site, kib),
                Err(_) => trace!("reclaim @{}", site),
            }
        }
    }

    /// Number of checkpoints passed so far
    pub fn count(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }
}

#[cfg(all(target_os = "linux", target_env = "gnu"))]
fn trim_heap() {
    // SAFETY: malloc_trim only walks the allocator's own free lists.
    unsafe {
        libc::malloc_trim(0);
    }
}

#[cfg(not(all(target_os = "linux", target_env = "gnu")))]
fn trim_heap() {}

/// MemAvailable from /proc/meminfo, in KiB.
pub fn mem_available_kib() -> io::Result<u64> {
    let content = fs::read_to_string("/proc/meminfo")?;
    parse_mem_available(&content)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "MemAvailable not found"))
}

fn parse_mem_available(meminfo: &str) -> Option<u64> {
    meminfo
        .lines()
        .find(|line| line.starts_with("MemAvailable:"))
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|kib| kib.parse::<u64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkpoints_are_counted_across_clones() {
        let checkpoints = Checkpoints::new();
        let shared = checkpoints.clone();
        checkpoints.reclaim("one");
        shared.reclaim("two");
        assert_eq!(checkpoints.count(), 2);
    }

    #[test]
    fn test_parse_mem_available() {
        let sample = "MemTotal:        3884196 kB\nMemFree:          215468 kB\nMemAvailable:    2461340 kB\n";
        assert_eq!(parse_mem_available(sample), Some(2461340));
        assert_eq!(parse_mem_available("MemTotal: 1 kB\n"), None);
    }
}
