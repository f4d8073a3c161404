//! Cancellation signals.
//!
//! A signal is any `Future<Output = Cause>` that resolves when the waiting
//! operation should give up. [`never`] never fires, [`Deadline`] fires when
//! its time passes, and [`CancelToken`] fires when someone cancels it.

pub use crate::error::Cause;

use crate::loom::{Arc, AtomicBool, Mutex, Ordering};
use std::future::Future;
use std::pin::Pin;
use std::sync::PoisonError;
use std::task::{Context, Poll, Waker};

/// A signal that never fires.
#[derive(Clone, Copy, Debug, Default)]
pub struct Never;

pub fn never() -> Never {
    Never
}

impl Future for Never {
    type Output = Cause;

    fn poll(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Cause> {
        Poll::Pending
    }
}

#[cfg(feature = "time")]
pub use self::deadline::{deadline, timeout, Deadline};

#[cfg(feature = "time")]
mod deadline {
    use super::Cause;
    use std::future::Future;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use std::time::{Duration, Instant};
    use tokio::time::{self, Sleep};

    /// Fires with [`Cause::DeadlineExceeded`]. Needs a tokio runtime with the
    /// time driver enabled.
    #[derive(Debug)]
    pub struct Deadline {
        sleep: Pin<Box<Sleep>>,
    }

    pub fn deadline(at: Instant) -> Deadline {
        Deadline {
            sleep: Box::pin(time::sleep_until(time::Instant::from_std(at))),
        }
    }

    pub fn timeout(after: Duration) -> Deadline {
        Deadline {
            sleep: Box::pin(time::sleep(after)),
        }
    }

    impl Deadline {
        pub fn deadline(&self) -> Instant {
            self.sleep.deadline().into_std()
        }
    }

    impl Future for Deadline {
        type Output = Cause;

        fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Cause> {
            self.sleep
                .as_mut()
                .poll(cx)
                .map(|()| Cause::DeadlineExceeded)
        }
    }
}

struct TokenState {
    canceled: AtomicBool,
    waiters: Mutex<Vec<Waker>>,
}

/// An explicit cancellation trigger.
///
/// Clones share the same state, so one `cancel` fires every signal made
/// from any clone.
#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<TokenState>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(TokenState {
                canceled: AtomicBool::new(false),
                waiters: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn cancel(&self) {
        if self.inner.canceled.swap(true, Ordering::AcqRel) {
            return;
        }

        let waiters = std::mem::take(
            &mut *self
                .inner
                .waiters
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for waker in waiters {
            waker.wake();
        }
    }

    pub fn is_canceled(&self) -> bool {
        self.inner.canceled.load(Ordering::Acquire)
    }

    /// A signal that fires with [`Cause::Canceled`] once `cancel` is called.
    pub fn canceled(&self) -> WaitCanceled {
        WaitCanceled {
            inner: self.inner.clone(),
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("canceled", &self.is_canceled())
            .finish()
    }
}

pub struct WaitCanceled {
    inner: Arc<TokenState>,
}

impl Future for WaitCanceled {
    type Output = Cause;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Cause> {
        if self.inner.canceled.load(Ordering::Acquire) {
            return Poll::Ready(Cause::Canceled);
        }

        let mut waiters = self
            .inner
            .waiters
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        // `cancel` drains the list under the lock after setting the flag, so
        // checking again here cannot miss it.
        if self.inner.canceled.load(Ordering::Acquire) {
            return Poll::Ready(Cause::Canceled);
        }
        if !waiters.iter().any(|w| w.will_wake(cx.waker())) {
            waiters.push(cx.waker().clone());
        }
        Poll::Pending
    }
}
