//! Deadline and panic isolation for pipeline stages.
//!
//! Every middleware, guard and render call runs through [`isolate`], which
//! turns a panic or an expired deadline into a value the caller can apply
//! its own failure policy to.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use tokio::time::Instant;

/// Outcome of an isolated call.
#[derive(Debug)]
pub enum Isolated<T> {
    Completed(T),
    TimedOut,
    Panicked(String),
}

/// Run `fut` until it completes, panics, or `deadline` passes.
pub async fn isolate<F>(deadline: Option<Instant>, fut: F) -> Isolated<F::Output>
where
    F: Future,
{
    let guarded = AssertUnwindSafe(fut).catch_unwind();
    let outcome = match deadline {
        Some(deadline) => match tokio::time::timeout_at(deadline, guarded).await {
            Ok(outcome) => outcome,
            Err(_) => return Isolated::TimedOut,
        },
        None => guarded.await,
    };

    match outcome {
        Ok(value) => Isolated::Completed(value),
        Err(payload) => Isolated::Panicked(panic_message(payload.as_ref())),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}
