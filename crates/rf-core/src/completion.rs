//! One-shot completion handles
//!
//! Every time-spanning operation hands its caller a [`Completion`] and keeps the
//! matching [`Resolver`] inside its state machine. `Resolver::resolve` consumes
//! the resolver, so a second resolution cannot be written. Dropping an
//! unresolved resolver marks the completion abandoned, which wakes every waiter
//! with [`RfError::Abandoned`] instead of leaving it pending forever.
//!
//! Completions are polled from the frame loop (`try_result`, `is_resolved`) or
//! awaited as a [`Future`] from any executor.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

use parking_lot::Mutex;

use crate::error::{RfError, RfResult};

enum Slot<T> {
    Pending,
    Ready(T),
    Abandoned,
}

struct Shared<T> {
    slot: Slot<T>,
    wakers: Vec<Waker>,
}

impl<T> Shared<T> {
    fn settle(&mut self, slot: Slot<T>) -> Vec<Waker> {
        if matches!(self.slot, Slot::Pending) {
            self.slot = slot;
        }
        std::mem::take(&mut self.wakers)
    }
}

/// Create a linked resolver/completion pair
pub fn completion<T>() -> (Resolver<T>, Completion<T>) {
    let shared = Arc::new(Mutex::new(Shared {
        slot: Slot::Pending,
        wakers: Vec::new(),
    }));
    (
        Resolver {
            shared: Some(shared.clone()),
        },
        Completion { shared },
    )
}

/// Read side of a one-shot completion
pub struct Completion<T> {
    shared: Arc<Mutex<Shared<T>>>,
}

impl<T> Completion<T> {
    /// Already-resolved completion (degenerate and synchronous paths)
    pub fn ready(value: T) -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared {
                slot: Slot::Ready(value),
                wakers: Vec::new(),
            })),
        }
    }

    /// True once resolved or abandoned
    pub fn is_resolved(&self) -> bool {
        !matches!(self.shared.lock().slot, Slot::Pending)
    }

    pub fn is_pending(&self) -> bool {
        !self.is_resolved()
    }

    /// True if the resolver was dropped without resolving
    pub fn is_abandoned(&self) -> bool {
        matches!(self.shared.lock().slot, Slot::Abandoned)
    }

    /// Check whether two handles observe the same completion
    pub fn same_as(&self, other: &Completion<T>) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl<T: Clone> Completion<T> {
    /// Resolved value, if any
    pub fn peek(&self) -> Option<T> {
        match &self.shared.lock().slot {
            Slot::Ready(value) => Some(value.clone()),
            _ => None,
        }
    }

    /// `None` while pending, otherwise the final result
    pub fn try_result(&self) -> Option<RfResult<T>> {
        match &self.shared.lock().slot {
            Slot::Pending => None,
            Slot::Ready(value) => Some(Ok(value.clone())),
            Slot::Abandoned => Some(Err(RfError::Abandoned)),
        }
    }
}

impl<T> Clone for Completion<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T> fmt::Debug for Completion<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.shared.lock().slot {
            Slot::Pending => "pending",
            Slot::Ready(_) => "ready",
            Slot::Abandoned => "abandoned",
        };
        f.debug_struct("Completion").field("state", &state).finish()
    }
}

impl<T: Clone> Future for Completion<T> {
    type Output = RfResult<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut shared = self.shared.lock();
        match &shared.slot {
            Slot::Ready(value) => Poll::Ready(Ok(value.clone())),
            Slot::Abandoned => Poll::Ready(Err(RfError::Abandoned)),
            Slot::Pending => {
                if !shared.wakers.iter().any(|w| w.will_wake(cx.waker())) {
                    shared.wakers.push(cx.waker().clone());
                }
                Poll::Pending
            }
        }
    }
}

/// Write side of a one-shot completion, owned by the state machine
pub struct Resolver<T> {
    shared: Option<Arc<Mutex<Shared<T>>>>,
}

impl<T> Resolver<T> {
    /// Resolve the completion and wake all waiters
    pub fn resolve(mut self, value: T) {
        if let Some(shared) = self.shared.take() {
            let wakers = shared.lock().settle(Slot::Ready(value));
            for waker in wakers {
                waker.wake();
            }
        }
    }
}

impl<T> Drop for Resolver<T> {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.take() {
            log::warn!("completion resolver dropped before resolving");
            let wakers = shared.lock().settle(Slot::Abandoned);
            for waker in wakers {
                waker.wake();
            }
        }
    }
}

impl<T> fmt::Debug for Resolver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver").finish_non_exhaustive()
    }
}
