// SPDX-License-Identifier: GPL-3.0-only
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::registry::error::{RegistryError, RegistryResult};

/// Per-call context handed to every registry operation.
///
/// Carries a cancellation token and an optional deadline. Operations call
/// [`OpContext::check`] at entry and at every iteration of multi-step work.
#[derive(Debug, Clone, Default)]
pub struct OpContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl OpContext {
    /// A context that is never cancelled unless `cancel` is called on it
    #[cfg(test)]
    pub fn background() -> Self {
        Self::default()
    }

    /// Derive a context whose token is a child of `parent`
    pub fn child_of(parent: &CancellationToken) -> Self {
        Self {
            token: parent.child_token(),
            deadline: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    #[cfg(test)]
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_done(&self) -> bool {
        self.token.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Operation boundary check
    pub fn check(&self) -> RegistryResult<()> {
        if self.is_done() {
            Err(RegistryError::Canceled)
        } else {
            Ok(())
        }
    }
}
