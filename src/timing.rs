//! Timing Module
//!
//! Wraps a call, measures how long it took and logs one event with the
//! outcome. Applied around invoker calls, never inside them.

use std::fmt::Display;
use std::future::Future;
use std::time::Instant;

use tracing::{info, warn};

/// Runs `f` and logs its duration under `name`.
pub fn timed<T, E, F>(name: &str, f: F) -> Result<T, E>
where
    E: Display,
    F: FnOnce() -> Result<T, E>,
{
    let started = Instant::now();
    let result = f();
    log_finished(name, started, &result);
    result
}

/// Awaits `fut` and logs its duration under `name`.
pub async fn timed_async<T, E, Fut>(name: &str, fut: Fut) -> Result<T, E>
where
    E: Display,
    Fut: Future<Output = Result<T, E>>,
{
    let started = Instant::now();
    let result = fut.await;
    log_finished(name, started, &result);
    result
}

fn log_finished<T, E: Display>(name: &str, started: Instant, result: &Result<T, E>) {
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    match result {
        Ok(_) => info!(operation = name, elapsed_ms, status = "ok", "function <{name}> finished"),
        Err(err) => warn!(
            operation = name,
            elapsed_ms,
            status = "error",
            error = %err,
            "function <{name}> failed"
        ),
    }
}
