//! Pause, resume and cancel for in-flight downloads

use apx_errors::{DownloadError, Error};
use std::sync::Arc;
use tokio::sync::watch;

/// Run state shared between the caller and active downloaders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchState {
    Running,
    Paused,
    Cancelled,
}

/// Cloneable handle that downloaders observe between files
///
/// Cancellation is sticky: once cancelled, `pause` and `resume` have no
/// effect until [`PatchControl::reset`].
#[derive(Debug, Clone)]
pub struct PatchControl {
    state: Arc<watch::Sender<PatchState>>,
}

impl Default for PatchControl {
    fn default() -> Self {
        Self::new()
    }
}

impl PatchControl {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(PatchState::Running);
        Self {
            state: Arc::new(tx),
        }
    }

    #[must_use]
    pub fn state(&self) -> PatchState {
        *self.state.borrow()
    }

    pub fn pause(&self) {
        self.transition(PatchState::Paused);
    }

    pub fn resume(&self) {
        self.transition(PatchState::Running);
    }

    pub fn cancel(&self) {
        self.state.send_if_modified(|state| {
            if *state == PatchState::Cancelled {
                false
            } else {
                *state = PatchState::Cancelled;
                true
            }
        });
    }

    /// Return to `Running`, clearing a previous cancel
    pub fn reset(&self) {
        self.state.send_replace(PatchState::Running);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.state() == PatchState::Cancelled
    }

    /// Resolve once the state is `Running`
    ///
    /// # Errors
    ///
    /// Returns `DownloadError::Cancelled` if the control is or becomes cancelled.
    pub async fn wait_runnable(&self) -> Result<(), Error> {
        let mut rx = self.state.subscribe();
        let state = *rx
            .wait_for(|state| *state != PatchState::Paused)
            .await
            .map_err(|_| Error::from(DownloadError::Cancelled))?;
        match state {
            PatchState::Cancelled => Err(DownloadError::Cancelled.into()),
            _ => Ok(()),
        }
    }

    /// Resolve once the control is cancelled
    pub async fn cancelled(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives as long as `self`, so this only ends on cancel
        let _ = rx.wait_for(|state| *state == PatchState::Cancelled).await;
    }

    fn transition(&self, next: PatchState) {
        self.state.send_if_modified(|state| {
            if *state == PatchState::Cancelled || *state == next {
                false
            } else {
                *state = next;
                true
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn paused_waits_until_resumed() {
        let control = PatchControl::new();
        control.pause();

        let waiter = {
            let control = control.clone();
            tokio::spawn(async move { control.wait_runnable().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        control.resume();
        assert!(waiter.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn cancel_is_sticky() {
        let control = PatchControl::new();
        control.cancel();
        control.resume();
        assert!(control.is_cancelled());
        assert!(control.wait_runnable().await.is_err());

        control.reset();
        assert!(control.wait_runnable().await.is_ok());
    }

    #[tokio::test]
    async fn cancel_wakes_paused_waiter() {
        let control = PatchControl::new();
        control.pause();
        let waiter = {
            let control = control.clone();
            tokio::spawn(async move { control.wait_runnable().await })
        };
        control.cancel();
        assert!(waiter.await.unwrap().is_err());
    }
}
