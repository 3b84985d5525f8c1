//! Per-request cancellation and deadline.

use std::{future::Future, time::Duration};

use anyhow::{Result, anyhow};
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

/// Carries the caller's cancellation signal and optional deadline into every
/// resolver call.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl RequestContext {
    /// A context that never ends unless cancelled through [`Self::token`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound this context to end `timeout` from now. An earlier existing deadline wins.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(existing) if existing <= candidate => existing,
            _ => candidate,
        };
        Self {
            deadline: Some(deadline),
            ..self
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// True once cancelled or past the deadline.
    pub fn is_done(&self) -> bool {
        self.token.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Resolves when the context is cancelled or its deadline elapses.
    pub async fn done(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.token.cancelled() => {}
                    _ = sleep_until(deadline) => {}
                }
            }
            None => self.token.cancelled().await,
        }
    }

    /// Drive `fut` to completion unless the context ends first, in which case `fut`
    /// is dropped and an error is returned.
    pub async fn run<F, T>(&self, what: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if self.is_done() {
            return Err(anyhow!("{what}: context already done"));
        }

        tokio::select! {
            biased;
            _ = self.done() => Err(self.done_error(what)),
            res = fut => res,
        }
    }

    fn done_error(&self, what: &str) -> anyhow::Error {
        if self.token.is_cancelled() {
            anyhow!("{what}: request cancelled")
        } else {
            anyhow!("{what}: deadline exceeded")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn run_returns_result_when_future_finishes_first() {
        let ctx = RequestContext::new().with_timeout(Duration::from_secs(5));
        let value = ctx.run("op", async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn run_aborts_on_deadline() {
        let ctx = RequestContext::new().with_timeout(Duration::from_millis(50));
        let err = ctx
            .run("slow op", async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(())
            })
            .await
            .unwrap_err();

        assert!(err.to_string().contains("deadline exceeded"));
    }

    #[tokio::test]
    async fn run_refuses_to_start_when_cancelled() {
        let ctx = RequestContext::new();
        ctx.cancel();

        let mut started = false;
        let err = ctx
            .run("op", async {
                started = true;
                Ok(())
            })
            .await
            .unwrap_err();

        assert!(!started);
        assert!(err.to_string().contains("already done"));
    }

    #[test]
    fn earlier_deadline_is_kept() {
        let ctx = RequestContext::new().with_timeout(Duration::from_secs(1));
        let first = ctx.deadline().unwrap();
        let ctx = ctx.with_timeout(Duration::from_secs(60));
        assert_eq!(ctx.deadline(), Some(first));
    }
}
