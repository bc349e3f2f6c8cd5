#![cfg(feature = "metrics")]

//! Native call latencies and handle counters.

use once_cell::sync::Lazy;
use std::{
    collections::BTreeMap,
    fmt::Write,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Instant,
};

// raw latencies

static TIMES: Lazy<Mutex<Vec<(&'static str, u128)>>> =
    Lazy::new(|| Mutex::new(Vec::new()));

/// Call around a native call: `record("link_program", start)`.
pub fn record(name: &'static str, start: Instant) {
    let dur = start.elapsed().as_micros();
    TIMES.lock().unwrap_or_else(|p| p.into_inner()).push((name, dur));
}

// handle traffic

pub static RETAINS:  AtomicUsize = AtomicUsize::new(0);
pub static RELEASES: AtomicUsize = AtomicUsize::new(0);
pub static ENQUEUES: AtomicUsize = AtomicUsize::new(0);

/// Drains the recorded latencies into a per-call report.
pub fn summary() -> String {
    let mut map: BTreeMap<&str, Vec<u128>> = BTreeMap::new();
    {
        let mut times = TIMES.lock().unwrap_or_else(|p| p.into_inner());
        for (name, us) in times.drain(..) {
            map.entry(name).or_default().push(us);
        }
    }

    let mut out = String::from("── metrics summary ──\n");
    for (name, mut v) in map {
        v.sort_unstable();
        let mean = v.iter().sum::<u128>() / v.len() as u128;
        let p95  = v[((v.len() * 95) / 100).saturating_sub(1)];
        let _ = writeln!(out, "{:<18} n={:<6} mean={:>5} µs   p95={:>5} µs", name, v.len(), mean, p95);
    }

    let _ = writeln!(
        out,
        "retains: {}   releases: {}   enqueues: {}",
        RETAINS.load(Ordering::Relaxed),
        RELEASES.load(Ordering::Relaxed),
        ENQUEUES.load(Ordering::Relaxed),
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_groups_by_call_name() {
        let start = Instant::now();
        record("summary_probe", start);
        record("summary_probe", start);
        let report = summary();
        assert!(report
            .lines()
            .any(|l| l.starts_with("summary_probe") && l.contains("n=2")));
    }
}
