use std::sync::{Condvar, Mutex};
use std::time::Duration;

/// A one-shot-per-cycle "has this been signalled" flag with a blocking wait.
///
/// One bit behind a condvar, set at most once between two calls to
/// [`CancelToken::reset`] — a single primitive standing in for a separate
/// event object, mutex, and boolean flag.
pub struct CancelToken {
    state: Mutex<bool>,
    condvar: Condvar,
}

impl CancelToken {
    /// Creates a token in the unset state.
    pub fn new() -> Self {
        CancelToken {
            state: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }

    /// Sets the token. Returns `true` if this call was the one that
    /// transitioned it from unset to set (i.e. the first signal this cycle).
    pub fn signal(&self) -> bool {
        let mut set = self.state.lock().expect("CancelToken mutex poisoned");
        if *set {
            false
        } else {
            *set = true;
            self.condvar.notify_all();
            true
        }
    }

    /// Returns whether the token is currently set.
    pub fn is_signalled(&self) -> bool {
        *self.state.lock().expect("CancelToken mutex poisoned")
    }

    /// Blocks until the token is set.
    pub fn wait(&self) {
        let mut set = self.state.lock().expect("CancelToken mutex poisoned");
        while !*set {
            set = self.condvar.wait(set).expect("CancelToken mutex poisoned");
        }
    }

    /// Blocks until the token is set or `timeout` elapses, returning whether
    /// it was set.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let set = self.state.lock().expect("CancelToken mutex poisoned");
        let (guard, result) = self
            .condvar
            .wait_timeout_while(set, timeout, |set| !*set)
            .expect("CancelToken mutex poisoned");
        let signalled = *guard;
        drop(guard);
        let _ = result;
        signalled
    }

    /// Clears the token so it can be reused for the next cycle.
    pub fn reset(&self) {
        *self.state.lock().expect("CancelToken mutex poisoned") = false;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    /// First signal reports it won the race, later ones don't.
    #[test]
    fn signal_is_reported_once() {
        let token = CancelToken::new();
        assert!(token.signal());
        assert!(!token.signal());
        assert!(token.is_signalled());
    }

    /// reset() allows the token to be signalled again next cycle.
    #[test]
    fn reset_allows_resignalling() {
        let token = CancelToken::new();
        token.signal();
        token.reset();
        assert!(!token.is_signalled());
        assert!(token.signal());
    }

    /// wait() unblocks once another thread signals.
    #[test]
    fn wait_unblocks_on_signal() {
        let token = Arc::new(CancelToken::new());
        let waiter = {
            let token = Arc::clone(&token);
            thread::spawn(move || token.wait())
        };

        thread::sleep(std::time::Duration::from_millis(20));
        token.signal();
        waiter.join().expect("waiter thread panicked");
    }

    /// wait_timeout returns false when nothing signals in time.
    #[test]
    fn wait_timeout_reports_unsignalled() {
        let token = CancelToken::new();
        assert!(!token.wait_timeout(Duration::from_millis(10)));
    }
}
