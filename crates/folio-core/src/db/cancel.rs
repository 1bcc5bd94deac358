//! Module: db::cancel
//! Responsibility: caller-supplied cancellation and deadlines for engine calls.
//! Does not own: adapter-side cancellation; adapters see dropped futures only.
//! Boundary: every adapter call made by the engine is raced through `CancelToken::run`.

use std::{future::Future, time::Duration};
use thiserror::Error as ThisError;
use tokio::{
    sync::watch,
    time::{Instant, sleep_until},
};

///
/// Cancelled
///
/// The caller withdrew the request or its deadline passed. In-flight work is
/// abandoned; partial results are never returned.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, ThisError)]
pub enum Cancelled {
    #[error("request cancelled by caller")]
    Signal,

    #[error("request deadline exceeded")]
    Deadline,
}

///
/// CancelHandle
///
/// Owning side of a `CancelToken`. Dropping the handle without calling
/// `cancel` leaves the token live forever.
///

#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

///
/// CancelToken
///

#[derive(Clone, Debug)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    /// Create a linked handle/token pair.
    #[must_use]
    pub fn new() -> (CancelHandle, Self) {
        let (tx, rx) = watch::channel(false);

        (CancelHandle { tx }, Self { rx, deadline: None })
    }

    /// Token that is never signalled (deadlines may still apply).
    #[must_use]
    pub fn never() -> Self {
        let (_, token) = Self::new();
        token
    }

    /// Attach a deadline; the earliest of the existing and new deadline wins.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(self.deadline.map_or(deadline, |current| current.min(deadline)));
        self
    }

    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.check().is_err()
    }

    /// Fail fast when the token is already signalled or expired.
    pub fn check(&self) -> Result<(), Cancelled> {
        if *self.rx.borrow() {
            return Err(Cancelled::Signal);
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(Cancelled::Deadline);
        }

        Ok(())
    }

    /// Resolve once the token is signalled or its deadline passes.
    pub async fn cancelled(&self) -> Cancelled {
        let mut rx = self.rx.clone();
        let signal = async move {
            // Sender dropped without cancelling: never resolves.
            if rx.wait_for(|cancelled| *cancelled).await.is_err() {
                std::future::pending::<()>().await;
            }
        };

        match self.deadline {
            Some(deadline) => tokio::select! {
                () = signal => Cancelled::Signal,
                () = sleep_until(deadline) => Cancelled::Deadline,
            },
            None => {
                signal.await;
                Cancelled::Signal
            }
        }
    }

    /// Race `fut` against this token. A cancelled future is dropped.
    pub async fn run<T, E, F>(&self, fut: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: From<Cancelled>,
    {
        self.check()?;

        tokio::select! {
            biased;
            reason = self.cancelled() => Err(reason.into()),
            out = fut => out,
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::never()
    }
}

///
/// TESTS
///
