use crate::error::Result;
use crate::tracker::ResourceTracker;

/// Route SIGINT and SIGTERM through `tracker`'s teardown.
///
/// Must be called from the main thread before any other thread is spawned:
/// the signals are blocked here and every later thread inherits that mask,
/// so only the dedicated waiter thread ever receives them. After teardown the
/// default disposition is restored and the signal is re-raised so the
/// process exits with the conventional status.
#[cfg(unix)]
pub fn install_signal_hooks(tracker: ResourceTracker) -> Result<()> {
    use nix::sys::signal::{SigSet, Signal};

    use crate::error::Error;

    let mut set = SigSet::empty();
    set.add(Signal::SIGINT);
    set.add(Signal::SIGTERM);
    set.thread_block().map_err(|errno| Error::Signal { source: errno.into() })?;

    std::thread::Builder::new()
        .name("coldstore-signals".into())
        .spawn(move || {
            let signal = match set.wait() {
                Ok(signal) => signal,
                Err(errno) => {
                    tracing::error!(%errno, "signal wait failed, interrupt cleanup disabled");
                    return;
                }
            };
            tracing::warn!(signal = signal.as_str(), "interrupted, cleaning up temporary files");
            let report = tracker.teardown();
            if !report.remaining.is_empty() {
                tracing::warn!(remaining = report.remaining.len(), "some temporaries survive until the next sweep");
            }
            restore_and_raise(signal, &set);
        })
        .map_err(|source| Error::Signal { source })?;
    Ok(())
}

#[cfg(unix)]
fn restore_and_raise(signal: nix::sys::signal::Signal, set: &nix::sys::signal::SigSet) {
    use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, raise, sigaction};

    let default = SigAction::new(SigHandler::SigDfl, SaFlags::empty(), SigSet::empty());
    // SAFETY: SIG_DFL installs no handler code.
    let _ = unsafe { sigaction(signal, &default) };
    let _ = set.thread_unblock();
    let _ = raise(signal);
    std::process::exit(128 + signal as i32);
}

#[cfg(not(unix))]
pub fn install_signal_hooks(tracker: ResourceTracker) -> Result<()> {
    let _ = tracker;
    tracing::debug!("signal hooks are not installed on this platform; relying on the exit guard");
    Ok(())
}
