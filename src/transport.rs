//! Rendezvous hand-off between many producers and one consumer.
//!
//! A producer parks its value as an offer together with its waker and waits
//! until the consumer takes it. Taking an offer wakes the producer that made
//! it. Closing never tears the queue down: it sets the latch and wakes every
//! parked producer and the consumer, and each producer pulls its own offer
//! back out with `EndOfStream`.

use crate::error::{Error, SendError, TryRecvError};
use crate::loom::{AtomicBool, Mutex, MutexGuard, Ordering};
use futures_util::ready;
use futures_util::task::AtomicWaker;
use std::collections::VecDeque;
use std::sync::PoisonError;
use std::task::{Context, Poll, Waker};

pub(crate) type OfferId = u64;

struct Offer<T> {
    id: OfferId,
    val: T,
    waker: Option<Waker>,
}

struct Queue<T> {
    offers: VecDeque<Offer<T>>,
    next_id: OfferId,
}

impl<T> Queue<T> {
    fn find_mut(&mut self, id: OfferId) -> Option<&mut Offer<T>> {
        self.offers.iter_mut().find(|offer| offer.id == id)
    }

    fn remove(&mut self, id: OfferId) -> Option<T> {
        let idx = self.offers.iter().position(|offer| offer.id == id)?;
        self.offers.remove(idx).map(|offer| offer.val)
    }
}

pub(crate) struct Transport<T> {
    queue: Mutex<Queue<T>>,
    // registered by the one consumer, woken by any producer and by `close`,
    // possibly at the same time.
    consumer: AtomicWaker,
    closed: AtomicBool,
}

impl<T> Transport<T> {
    pub(crate) fn new() -> Self {
        Self {
            queue: Mutex::new(Queue {
                offers: VecDeque::new(),
                next_id: 0,
            }),
            consumer: AtomicWaker::new(),
            closed: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Queue<T>> {
        // the queue is never left half-updated, so a panic elsewhere does not
        // invalidate it.
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Parks `val` until the consumer takes it. Gives the value back if the
    /// channel is already closed. The producer's waker is set by `poll_offer`.
    pub(crate) fn offer(&self, val: T) -> Result<OfferId, T> {
        let id = {
            let mut queue = self.lock();
            if self.is_closed() {
                return Err(val);
            }
            let id = queue.next_id;
            queue.next_id += 1;
            queue.offers.push_back(Offer {
                id,
                val,
                waker: None,
            });
            id
        };

        self.consumer.wake();
        Ok(id)
    }

    /// Resolves once offer `id` has been taken by the consumer, or with
    /// `EndOfStream` (and the value) if the channel closed first.
    pub(crate) fn poll_offer(
        &self,
        id: OfferId,
        cx: &mut Context<'_>,
    ) -> Poll<Result<(), SendError<T>>> {
        let mut queue = self.lock();

        if self.is_closed() {
            return match queue.remove(id) {
                Some(val) => {
                    tracing::trace!(offer = id, "offer dropped by close");
                    Poll::Ready(Err(SendError {
                        err: Error::EndOfStream,
                        val,
                    }))
                }
                // taken before the close
                None => Poll::Ready(Ok(())),
            };
        }

        match queue.find_mut(id) {
            None => Poll::Ready(Ok(())),
            Some(offer) => {
                let stale = offer
                    .waker
                    .as_ref()
                    .map_or(true, |waker| !waker.will_wake(cx.waker()));
                if stale {
                    offer.waker = Some(cx.waker().clone());
                }
                Poll::Pending
            }
        }
    }

    /// Withdraws offer `id`. `None` means the consumer already took it.
    pub(crate) fn retract(&self, id: OfferId) -> Option<T> {
        self.lock().remove(id)
    }

    pub(crate) fn try_take(&self) -> Result<T, TryRecvError> {
        let offer = {
            let mut queue = self.lock();
            if self.is_closed() {
                return Err(TryRecvError::EndOfStream);
            }
            queue.offers.pop_front()
        };

        match offer {
            Some(offer) => {
                if let Some(waker) = offer.waker {
                    waker.wake();
                }
                Ok(offer.val)
            }
            None => Err(TryRecvError::Empty),
        }
    }

    /// Consumer side only.
    pub(crate) fn poll_take(&self, cx: &mut Context<'_>) -> Poll<Result<T, Error>> {
        if let Poll::Ready(res) = Self::ready_take(self.try_take()) {
            return Poll::Ready(res);
        }

        self.consumer.register(cx.waker());

        // 1. An offer may have been parked between the previous poll and the register.
        //
        // 2. `close` may have woken the old waker before the register, so the
        //    latch has to be checked again or we could sleep forever.
        Self::ready_take(self.try_take())
    }

    fn ready_take(res: Result<T, TryRecvError>) -> Poll<Result<T, Error>> {
        match res {
            Ok(val) => Poll::Ready(Ok(val)),
            Err(TryRecvError::EndOfStream) => Poll::Ready(Err(Error::EndOfStream)),
            Err(TryRecvError::Empty) => Poll::Pending,
        }
    }

    /// Sets the latch. Returns `false` if it was already set.
    pub(crate) fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }

        // taking the lock after the store means every producer either sees the
        // latch on its next poll, or has its waker in the queue for us to wake.
        let wakers: Vec<Waker> = self
            .lock()
            .offers
            .iter()
            .filter_map(|offer| offer.waker.clone())
            .collect();

        tracing::debug!(parked = wakers.len(), "ackable channel closed");

        for waker in wakers {
            waker.wake();
        }
        self.consumer.wake();
        true
    }
}

/// Withdraws a parked offer if the send future goes away before it resolves.
pub(crate) struct Retract<'a, T> {
    transport: &'a Transport<T>,
    id: Option<OfferId>,
}

impl<'a, T> Retract<'a, T> {
    pub(crate) fn new(transport: &'a Transport<T>, id: OfferId) -> Self {
        Self {
            transport,
            id: Some(id),
        }
    }

    pub(crate) fn disarm(&mut self) {
        self.id = None;
    }
}

impl<T> Drop for Retract<'_, T> {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            if self.transport.retract(id).is_some() {
                tracing::trace!(offer = id, "send dropped before hand-off");
            }
        }
    }
}

/// Poll helper for holders of an offer that outlives a single future,
/// like the sink and the byte writer.
pub(crate) fn poll_in_flight<T>(
    transport: &Transport<T>,
    in_flight: &mut Option<OfferId>,
    cx: &mut Context<'_>,
) -> Poll<Result<(), Error>> {
    let id = match *in_flight {
        Some(id) => id,
        None => return Poll::Ready(Ok(())),
    };

    let res = ready!(transport.poll_offer(id, cx));
    *in_flight = None;
    Poll::Ready(res.map_err(SendError::into_error))
}
