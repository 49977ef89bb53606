//! Progress reporting boundary.
//!
//! A listener sees zero or more progress lines followed by exactly one
//! terminal call. Calls may arrive on any worker thread; marshalling onto a UI
//! thread is the listener's business.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

use crate::error::Result;

#[cfg_attr(test, mockall::automock)]
pub trait ProgressListener: Send + Sync {
    fn on_progress(&self, line: &str);

    fn on_complete(&self, message: &str);

    fn on_error(&self, message: &str);

    /// Reset hook for the owner of the log view. Never called by muxkit itself.
    fn clear_log(&self) {}
}

/// Listener that discards everything.
pub struct NullListener;

impl ProgressListener for NullListener {
    fn on_progress(&self, _line: &str) {}
    fn on_complete(&self, _message: &str) {}
    fn on_error(&self, _message: &str) {}
}

/// Shared handle that enforces the listener contract for one operation.
///
/// The first `complete` or `error` wins; anything after it is dropped.
/// Every listener call happens under one lock, so a progress line racing a
/// terminal call is either delivered before it or dropped.
#[derive(Clone)]
pub struct Reporter {
    listener: Arc<dyn ProgressListener>,
    finished: Arc<Mutex<bool>>,
}

impl Reporter {
    pub fn new(listener: Arc<dyn ProgressListener>) -> Self {
        Self {
            listener,
            finished: Arc::new(Mutex::new(false)),
        }
    }

    fn state(&self) -> MutexGuard<'_, bool> {
        self.finished.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn progress(&self, line: &str) {
        let finished = self.state();
        if *finished {
            debug!("Dropping progress after terminal notification: {}", line);
            return;
        }
        self.listener.on_progress(line);
    }

    /// Returns `false` if a terminal notification was already delivered.
    pub fn complete(&self, message: &str) -> bool {
        let mut finished = self.state();
        if *finished {
            debug!("Dropping completion after terminal notification: {}", message);
            return false;
        }
        *finished = true;
        self.listener.on_complete(message);
        true
    }

    /// Returns `false` if a terminal notification was already delivered.
    pub fn error(&self, message: &str) -> bool {
        let mut finished = self.state();
        if *finished {
            debug!("Dropping error after terminal notification: {}", message);
            return false;
        }
        *finished = true;
        self.listener.on_error(message);
        true
    }

    /// Deliver the terminal notification matching `result`.
    pub fn finish<T, F>(&self, result: &Result<T>, success_message: F) -> bool
    where
        F: FnOnce(&T) -> String,
    {
        match result {
            Ok(value) => self.complete(&success_message(value)),
            Err(e) => self.error(&e.to_string()),
        }
    }

    pub fn is_finished(&self) -> bool {
        *self.state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MuxkitError;
    use mockall::predicate::eq;

    #[test]
    fn test_first_terminal_call_wins() {
        let mut listener = MockProgressListener::new();
        listener.expect_on_progress().with(eq("working")).times(1).return_const(());
        listener.expect_on_complete().with(eq("done")).times(1).return_const(());
        listener.expect_on_error().never();

        let reporter = Reporter::new(Arc::new(listener));
        reporter.progress("working");
        assert!(reporter.complete("done"));
        assert!(!reporter.error("too late"));
        assert!(!reporter.complete("again"));
        reporter.progress("ignored");
        assert!(reporter.is_finished());
    }

    #[test]
    fn test_finish_routes_errors_to_on_error() {
        let mut listener = MockProgressListener::new();
        listener.expect_on_complete().never();
        listener
            .expect_on_error()
            .withf(|message: &str| message == "No video clips provided to merge.")
            .times(1)
            .return_const(());

        let reporter = Reporter::new(Arc::new(listener));
        let result: Result<()> = Err(MuxkitError::Validation("No video clips provided to merge.".to_string()));
        assert!(reporter.finish(&result, |_| "unused".to_string()));
    }

    #[test]
    fn test_progress_racing_terminal_call_never_follows_it() {
        let listener = Arc::new(OrderListener::default());
        let reporter = Reporter::new(listener.clone());

        let workers: Vec<_> = (0..4)
            .map(|n| {
                let reporter = reporter.clone();
                std::thread::spawn(move || {
                    for i in 0..200 {
                        reporter.progress(&format!("{}:{}", n, i));
                    }
                })
            })
            .collect();
        reporter.complete("done");
        for worker in workers {
            worker.join().unwrap();
        }

        let events = listener.events.lock().unwrap();
        assert_eq!(events.last().map(String::as_str), Some("complete"));
        assert_eq!(events.iter().filter(|e| *e == "complete").count(), 1);
    }

    #[derive(Default)]
    struct OrderListener {
        events: Mutex<Vec<String>>,
    }

    impl ProgressListener for OrderListener {
        fn on_progress(&self, line: &str) {
            self.events.lock().unwrap().push(line.to_string());
        }

        fn on_complete(&self, _message: &str) {
            self.events.lock().unwrap().push("complete".to_string());
        }

        fn on_error(&self, _message: &str) {
            self.events.lock().unwrap().push("error".to_string());
        }
    }

    #[test]
    fn test_clones_share_terminal_state() {
        let mut listener = MockProgressListener::new();
        listener.expect_on_error().times(1).return_const(());
        listener.expect_on_complete().never();

        let reporter = Reporter::new(Arc::new(listener));
        let clone = reporter.clone();
        assert!(clone.error("failed"));
        assert!(!reporter.complete("ok"));
    }
}
