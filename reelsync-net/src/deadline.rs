//! Cancellable, rearmable one-shot deadline.
//!
//! A single watcher thread sleeps until the armed expiry and re-reads it on
//! every wakeup, so re-arming or disarming before the deadline turns the
//! pending expiry into a no-op without any bookkeeping by the caller.

use std::io;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

type Callback = Box<dyn FnMut() + Send>;

#[derive(Default)]
struct TimerState {
    expires_at: Option<Instant>,
    callback: Option<Callback>,
    watching: bool,
    cancelled: bool,
}

#[derive(Default)]
struct Shared {
    state: Mutex<TimerState>,
    wakeup: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, TimerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct DeadlineTimer {
    shared: Arc<Shared>,
}

impl Default for DeadlineTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl DeadlineTimer {
    /// A disarmed timer with no callback.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared::default()),
        }
    }

    /// Expire `duration` from now, replacing any earlier expiry.
    pub fn arm(&self, duration: Duration) {
        let mut state = self.shared.lock();
        if state.cancelled {
            return;
        }
        state.expires_at = Instant::now().checked_add(duration);
        self.shared.wakeup.notify_all();
    }

    /// Never expire until armed again.
    pub fn disarm(&self) {
        self.shared.lock().expires_at = None;
        self.shared.wakeup.notify_all();
    }

    pub fn expires_at(&self) -> Option<Instant> {
        self.shared.lock().expires_at
    }

    /// Run `callback` on the watcher thread each time an armed deadline
    /// passes. A deadline fires once and then stays disarmed.
    ///
    /// The first call starts the watcher; later calls replace the callback.
    pub fn on_expiry<F>(&self, callback: F) -> io::Result<()>
    where
        F: FnMut() + Send + 'static,
    {
        let mut state = self.shared.lock();
        state.callback = Some(Box::new(callback));
        if state.watching || state.cancelled {
            return Ok(());
        }

        let shared = Arc::clone(&self.shared);
        thread::Builder::new()
            .name("deadline".into())
            .spawn(move || watch(shared))?;
        state.watching = true;
        Ok(())
    }

    /// Disarm for good and stop the watcher thread.
    pub fn cancel(&self) {
        {
            let mut state = self.shared.lock();
            state.cancelled = true;
            state.callback = None;
        }
        self.disarm();
    }
}

impl Drop for DeadlineTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn watch(shared: Arc<Shared>) {
    let mut state = shared.lock();
    loop {
        if state.cancelled {
            return;
        }
        match state.expires_at {
            None => {
                state = shared.wakeup.wait(state).unwrap_or_else(PoisonError::into_inner);
            }
            Some(at) => {
                let now = Instant::now();
                if now < at {
                    state = shared
                        .wakeup
                        .wait_timeout(state, at - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0;
                    continue;
                }

                state.expires_at = None;
                let mut callback = state.callback.take();
                drop(state);
                if let Some(f) = callback.as_mut() {
                    f();
                }
                state = shared.lock();
                if state.callback.is_none() && !state.cancelled {
                    state.callback = callback;
                }
            }
        }
    }
}
