//! Watch mode: repeated passes on a fixed interval.
//!
//! The loop checks its [`CancellationToken`] before each pass and while
//! sleeping between passes, never during one. A video that is half way
//! through when the stop is requested still finishes (or fails) normally.

use std::{
    thread,
    time::{Duration, Instant},
};

use crate::{
    backend::MediaBackend,
    batch::{BatchDriver, BatchReport},
    error::SplitError,
    ledger::{Ledger, LedgerBackend},
    progress::CancellationToken,
};

/// Longest single sleep before the token is checked again.
const POLL_SLICE: Duration = Duration::from_millis(200);

/// Run `driver` every `interval` until `token` is cancelled.
///
/// `on_cycle` sees the one-based cycle number and the result of each pass.
/// Non-fatal pass errors (an unreadable input directory, say) are logged and
/// the loop carries on. Returns the number of completed passes.
///
/// # Errors
///
/// - [`SplitError::InvalidInterval`] if `interval` is zero.
/// - Any fatal error from a pass, such as [`SplitError::Ledger`].
pub fn watch<B, L, F>(
    driver: &BatchDriver<B>,
    ledger: &mut Ledger<L>,
    interval: Duration,
    token: &CancellationToken,
    mut on_cycle: F,
) -> Result<u64, SplitError>
where
    B: MediaBackend,
    L: LedgerBackend,
    F: FnMut(u64, &Result<BatchReport, SplitError>),
{
    if interval.is_zero() {
        return Err(SplitError::InvalidInterval);
    }

    let mut cycles = 0;
    while !token.is_cancelled() {
        cycles += 1;
        log::debug!("Watch cycle {cycles} starting");

        let result = driver.run_once(ledger);
        on_cycle(cycles, &result);
        match result {
            Err(error) if error.is_fatal() => return Err(error),
            Err(error) => log::warn!("Watch cycle {cycles} failed: {error}"),
            Ok(_) => {}
        }

        if !sleep_unless_cancelled(interval, token) {
            break;
        }
    }

    log::info!("Watch mode stopped after {cycles} cycle(s)");
    Ok(cycles)
}

/// Sleep for `duration` in short slices. Returns `false` if the token was
/// cancelled before the time was up.
///
/// An interval too long to represent as an [`Instant`] never elapses; only
/// the token ends it.
fn sleep_unless_cancelled(duration: Duration, token: &CancellationToken) -> bool {
    let deadline = Instant::now().checked_add(duration);
    loop {
        if token.is_cancelled() {
            return false;
        }
        let slice = match deadline {
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    return true;
                }
                (deadline - now).min(POLL_SLICE)
            }
            None => POLL_SLICE,
        };
        thread::sleep(slice);
    }
}
