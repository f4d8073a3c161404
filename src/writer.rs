use crate::channel::{AckableChannel, Sender};
use crate::sink::SendSink;
use futures_util::io::AsyncWrite;
use futures_util::ready;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Creates a byte channel and a writer feeding it.
pub fn byte_channel() -> (ByteWriter, AckableChannel<Vec<u8>>) {
    let chan = AckableChannel::new();
    (ByteWriter::new(chan.sender()), chan)
}

/// An [`AsyncWrite`] that hands every write to the consumer of an
/// [`AckableChannel<Vec<u8>>`].
///
/// A write completes only once the consumer has taken a copy of the whole
/// buffer, and there is no way to cancel it other than dropping the future.
/// When the channel is closed, before or during a write, the write fails with
/// [`io::ErrorKind::UnexpectedEof`] and reports nothing written.
///
/// Closing the writer closes the channel, so the consumer sees end of stream
/// after the last write.
pub struct ByteWriter {
    sink: SendSink<Vec<u8>>,
    // bytes of the offer still parked for the last write, so a write future
    // dropped mid-flight can be told apart from a repoll of the same buffer.
    in_flight: Option<Vec<u8>>,
}

impl ByteWriter {
    pub fn new(sender: Sender<Vec<u8>>) -> Self {
        Self {
            sink: SendSink::new(sender),
            in_flight: None,
        }
    }

    fn drop_stale(&mut self, buf: &[u8]) {
        if self.in_flight.as_deref().map_or(true, |bytes| bytes == buf) {
            return;
        }

        self.in_flight = None;
        match self.sink.retract_in_flight() {
            Some(bytes) => tracing::trace!(len = bytes.len(), "stale write retracted"),
            None => tracing::trace!("stale write already taken"),
        }
    }
}

impl AsyncWrite for ByteWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        this.drop_stale(buf);

        if this.in_flight.is_none() {
            if buf.is_empty() {
                return Poll::Ready(Ok(0));
            }
            this.sink.start_send_inner(buf.to_vec())?;
            this.in_flight = Some(buf.to_vec());
        }

        let res = ready!(this.sink.poll_flush_inner(cx));
        this.in_flight = None;
        Poll::Ready(res.map(|()| buf.len()).map_err(io::Error::from))
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if this.in_flight.is_none() {
            return Poll::Ready(Ok(()));
        }

        let res = ready!(this.sink.poll_flush_inner(cx));
        this.in_flight = None;
        Poll::Ready(res.map_err(io::Error::from))
    }

    fn poll_close(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let res = ready!(this.sink.poll_close_inner(cx));
        this.in_flight = None;
        Poll::Ready(res.map_err(io::Error::from))
    }
}
