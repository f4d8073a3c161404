use crate::error::{Cause, Error, SendError, TryRecvError};
use crate::loom::Arc;
use crate::transport::{Retract, Transport};
use futures_util::future::poll_fn;
use futures_util::{pin_mut, ready};
use std::fmt;
use std::future::Future;
use std::task::{Context, Poll};

/// A multi-producer, single-consumer rendezvous channel whose consumer must
/// acknowledge each value before it can receive the next one.
///
/// The channel itself is the consumer handle: [`recv`](Self::recv),
/// [`try_recv`](Self::try_recv) and [`ack`](Self::ack) take `&mut self`, so
/// there can only ever be one consumer. Producers either borrow the channel
/// or hold a [`Sender`].
///
/// Until it is acked, a received value stays cached and every further
/// receive returns it again without pulling from a producer.
///
/// Dropping the channel closes it.
pub struct AckableChannel<T> {
    inner: Arc<Transport<T>>,
    pending: Option<T>,
}

impl<T> AckableChannel<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Transport::new()),
            pending: None,
        }
    }

    /// Returns a producer handle. Any number of senders may exist.
    pub fn sender(&self) -> Sender<T> {
        Sender {
            inner: self.inner.clone(),
        }
    }

    /// Hands `value` to the consumer, waiting until it takes it.
    ///
    /// Fails with [`Error::EndOfStream`] if the channel is or becomes closed,
    /// and with [`Error::Cancelled`] if `signal` fires first. On failure the
    /// value was not delivered and comes back in the error.
    pub async fn send<S>(&self, signal: S, value: T) -> Result<(), SendError<T>>
    where
        S: Future<Output = Cause>,
    {
        send(&self.inner, signal, value).await
    }

    /// Receives the next value, or the unacknowledged one again.
    ///
    /// With a value pending this returns immediately and `signal` is never
    /// polled.
    pub async fn recv<S>(&mut self, signal: S) -> Result<&T, Error>
    where
        S: Future<Output = Cause>,
    {
        let value = match self.pending.take() {
            Some(value) => value,
            None => {
                let inner = &self.inner;
                pin_mut!(signal);
                poll_fn(|cx| {
                    if let Poll::Ready(res) = inner.poll_take(cx) {
                        return Poll::Ready(res);
                    }
                    signal.as_mut().poll(cx).map(|cause| {
                        tracing::trace!(%cause, "receive cancelled");
                        Err(Error::Cancelled(cause))
                    })
                })
                .await?
            }
        };

        Ok(&*self.pending.insert(value))
    }

    /// Poll form of [`recv`](Self::recv), without a cancellation signal.
    pub fn poll_recv(&mut self, cx: &mut Context<'_>) -> Poll<Result<&T, Error>> {
        let value = match self.pending.take() {
            Some(value) => value,
            None => ready!(self.inner.poll_take(cx))?,
        };

        Poll::Ready(Ok(&*self.pending.insert(value)))
    }

    /// Like [`recv`](Self::recv), but only pairs with a producer that is
    /// already waiting.
    pub fn try_recv(&mut self) -> Result<&T, TryRecvError> {
        let value = match self.pending.take() {
            Some(value) => value,
            None => self.inner.try_take()?,
        };

        Ok(&*self.pending.insert(value))
    }

    /// Acknowledges the pending value, letting the next receive pull a new one.
    ///
    /// # Panics
    ///
    /// Panics if nothing is pending: acking twice, or before receiving, is a
    /// bug in the consumer.
    #[track_caller]
    pub fn ack(&mut self) {
        if self.pending.take().is_none() {
            panic!("unexpected ack");
        }
    }

    /// Whether a received value is waiting to be acked.
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Closes the channel. Idempotent and never fails.
    ///
    /// Every waiting and future send and receive fails with
    /// [`Error::EndOfStream`]. A value that was already received stays
    /// pending and can still be re-read and acked.
    pub fn close(&self) -> Result<(), Error> {
        self.inner.close();
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}

impl<T> Default for AckableChannel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for AckableChannel<T> {
    fn drop(&mut self) {
        // nobody can take a value anymore, so wake the producers now
        // instead of leaving them parked forever.
        self.inner.close();
    }
}

impl<T> fmt::Debug for AckableChannel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AckableChannel")
            .field("pending", &self.has_pending())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// A producer handle for an [`AckableChannel`].
pub struct Sender<T> {
    inner: Arc<Transport<T>>,
}

impl<T> Clone for Sender<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Sender<T> {
    /// See [`AckableChannel::send`].
    pub async fn send<S>(&self, signal: S, value: T) -> Result<(), SendError<T>>
    where
        S: Future<Output = Cause>,
    {
        send(&self.inner, signal, value).await
    }

    /// See [`AckableChannel::close`].
    pub fn close(&self) -> Result<(), Error> {
        self.inner.close();
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    pub(crate) fn transport(&self) -> &Transport<T> {
        &self.inner
    }
}

impl<T> fmt::Debug for Sender<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sender")
            .field("closed", &self.is_closed())
            .finish()
    }
}

async fn send<T, S>(transport: &Transport<T>, signal: S, value: T) -> Result<(), SendError<T>>
where
    S: Future<Output = Cause>,
{
    if transport.is_closed() {
        return Err(SendError {
            err: Error::EndOfStream,
            val: value,
        });
    }

    let id = transport.offer(value).map_err(|val| SendError {
        err: Error::EndOfStream,
        val,
    })?;

    // if this future is dropped while parked, the offer goes with it.
    let mut guard = Retract::new(transport, id);
    pin_mut!(signal);

    poll_fn(|cx| {
        if let Poll::Ready(res) = transport.poll_offer(id, cx) {
            guard.disarm();
            return Poll::Ready(res);
        }

        let cause = ready!(signal.as_mut().poll(cx));
        guard.disarm();

        // the consumer may have taken the value since the poll above, in which
        // case the hand-off won the race.
        Poll::Ready(match transport.retract(id) {
            Some(val) => {
                tracing::trace!(%cause, offer = id, "send cancelled");
                Err(SendError {
                    err: Error::Cancelled(cause),
                    val,
                })
            }
            None => Ok(()),
        })
    })
    .await
}
