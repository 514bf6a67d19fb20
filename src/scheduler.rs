//! Redirect scheduler
//!
//! Delays navigation after a reply so the user can read it first. At most
//! one redirect is armed at a time; arming a new one replaces the old.
//! Cancellation is explicit: once `cancel` returns, the navigator will not
//! be invoked for the cancelled redirect.

use crate::runtime::Navigator;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

struct ArmedRedirect {
    path: String,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

#[derive(Default)]
pub struct RedirectScheduler {
    armed: Option<ArmedRedirect>,
}

impl RedirectScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a one-shot redirect to `path` after `delay`
    pub fn schedule<N>(&mut self, path: String, delay: Duration, navigator: Arc<N>)
    where
        N: Navigator + ?Sized + 'static,
    {
        if let Some(previous) = self.armed.take() {
            tracing::debug!(path = %previous.path, "Replacing armed redirect");
            previous.cancel.cancel();
        }

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let target = path.clone();

        let task = tokio::spawn(async move {
            tokio::select! {
                biased;

                () = token.cancelled() => {
                    tracing::debug!(path = %target, "Redirect cancelled");
                }

                () = tokio::time::sleep(delay) => {
                    tracing::info!(path = %target, "Redirect timer elapsed, navigating");
                    navigator.navigate_to(&target);
                }
            }
        });

        tracing::debug!(path = %path, delay_ms = %delay.as_millis(), "Redirect armed");
        self.armed = Some(ArmedRedirect { path, cancel, task });
    }

    /// Disarm the pending redirect, if any. Returns true if one was armed.
    pub fn cancel(&mut self) -> bool {
        match self.armed.take() {
            Some(armed) if !armed.task.is_finished() => {
                armed.cancel.cancel();
                tracing::debug!(path = %armed.path, "Redirect disarmed");
                true
            }
            _ => false,
        }
    }

    pub fn armed_path(&self) -> Option<&str> {
        self.armed
            .as_ref()
            .filter(|a| !a.task.is_finished())
            .map(|a| a.path.as_str())
    }
}

impl Drop for RedirectScheduler {
    fn drop(&mut self) {
        if let Some(armed) = self.armed.take() {
            armed.cancel.cancel();
        }
    }
}
