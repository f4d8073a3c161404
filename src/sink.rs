use crate::channel::Sender;
use crate::error::Error;
use crate::transport::{poll_in_flight, OfferId};
use futures_sink::Sink;
use std::pin::Pin;
use std::task::{Context, Poll};

/// A [`Sink`] over a [`Sender`].
///
/// `start_send` parks the item, and `poll_flush` resolves once the consumer
/// has taken it, so at most one item is in flight per sink. Closing the sink
/// closes the channel.
pub struct SendSink<T> {
    inner: Option<Sender<T>>,
    in_flight: Option<OfferId>,
}

impl<T> SendSink<T> {
    pub fn new(sender: Sender<T>) -> Self {
        Self {
            inner: Some(sender),
            in_flight: None,
        }
    }

    pub(crate) fn poll_flush_inner(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Error>> {
        match &self.inner {
            Some(sender) => poll_in_flight(sender.transport(), &mut self.in_flight, cx),
            None => Poll::Ready(Err(Error::EndOfStream)),
        }
    }

    pub(crate) fn start_send_inner(&mut self, item: T) -> Result<(), Error> {
        debug_assert!(self.in_flight.is_none(), "start_send without poll_ready");
        let sender = self.inner.as_ref().ok_or(Error::EndOfStream)?;
        let id = sender
            .transport()
            .offer(item)
            .map_err(|_| Error::EndOfStream)?;
        self.in_flight = Some(id);
        Ok(())
    }

    /// Withdraws the in-flight item. `None` if the consumer already took it
    /// or nothing was in flight.
    pub(crate) fn retract_in_flight(&mut self) -> Option<T> {
        let id = self.in_flight.take()?;
        self.inner.as_ref()?.transport().retract(id)
    }

    pub(crate) fn poll_close_inner(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Error>> {
        let flushed = if self.inner.is_some() {
            futures_util::ready!(self.poll_flush_inner(cx))
        } else {
            Ok(())
        };
        if let Some(sender) = self.inner.take() {
            sender.close()?;
        }
        // an item the channel closed under is already gone, closing still succeeded.
        Poll::Ready(match flushed {
            Err(Error::EndOfStream) => Ok(()),
            other => other,
        })
    }
}

impl<T> Drop for SendSink<T> {
    fn drop(&mut self) {
        if let (Some(sender), Some(id)) = (&self.inner, self.in_flight.take()) {
            let _ = sender.transport().retract(id);
        }
    }
}

impl<T> Sink<T> for SendSink<T> {
    type Error = Error;

    fn poll_ready(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        futures_util::ready!(self.poll_flush_inner(cx))?;
        match &self.inner {
            Some(sender) if !sender.is_closed() => Poll::Ready(Ok(())),
            _ => Poll::Ready(Err(Error::EndOfStream)),
        }
    }

    fn start_send(mut self: Pin<&mut Self>, item: T) -> Result<(), Self::Error> {
        self.start_send_inner(item)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.poll_flush_inner(cx)
    }

    fn poll_close(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.poll_close_inner(cx)
    }
}
