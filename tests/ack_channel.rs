#![cfg(not(loom))]

use ack_chan::signal::{self, CancelToken};
use ack_chan::{AckableChannel, Cause, Error, TryRecvError};
use std::collections::HashSet;
use std::time::{Duration, Instant};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn send_receive_in_order() {
    const N: usize = 1234;

    let mut chan = AckableChannel::new();
    let tx = chan.sender();

    let producer = tokio::spawn(async move {
        for i in 0..N {
            tx.send(signal::never(), i).await.unwrap();
        }
    });

    for i in 0..N {
        let n = *chan.recv(signal::never()).await.unwrap();
        assert_eq!(n, i);
        chan.ack();
    }

    producer.await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn receive_without_ack_returns_same_value() {
    const VALUE: u64 = 1234567;
    const TRIES: usize = 1234;

    let mut chan = AckableChannel::new();
    let tx = chan.sender();

    let producer = tokio::spawn(async move { tx.send(signal::never(), VALUE).await });

    for _ in 0..TRIES {
        assert_eq!(chan.recv(signal::never()).await, Ok(&VALUE));
    }
    producer.await.unwrap().unwrap();

    // nobody else ever sent, so the cached value is all there is.
    assert!(chan.has_pending());
    chan.ack();
    assert_eq!(chan.try_recv(), Err(TryRecvError::Empty));
}

#[tokio::test]
async fn ack_clears_the_cache() {
    let mut chan = AckableChannel::new();
    let tx = chan.sender();

    let producer = tokio::spawn(async move {
        tx.send(signal::never(), 1).await.unwrap();
        tx.send(signal::never(), 2).await.unwrap();
    });

    assert_eq!(chan.recv(signal::never()).await, Ok(&1));
    chan.ack();
    assert_eq!(chan.recv(signal::never()).await, Ok(&2));
    chan.ack();
    producer.await.unwrap();

    let res = chan.recv(signal::timeout(Duration::from_millis(10))).await;
    assert_eq!(res, Err(Error::Cancelled(Cause::DeadlineExceeded)));
}

#[test]
#[should_panic(expected = "unexpected ack")]
fn ack_without_pending_panics() {
    let mut chan = AckableChannel::<i32>::new();
    chan.ack();
}

#[tokio::test]
async fn deadline_cancels_both_sides() {
    const WAIT: Duration = Duration::from_millis(10);

    let mut chan = AckableChannel::<i32>::new();

    let err = chan.send(signal::timeout(WAIT), 0).await.unwrap_err();
    assert_eq!(err.kind(), Error::Cancelled(Cause::DeadlineExceeded));
    assert_eq!(err.into_inner(), 0);

    // the timed out value must not be delivered later.
    let start = Instant::now();
    let res = chan.recv(signal::timeout(WAIT)).await;
    assert_eq!(res, Err(Error::Cancelled(Cause::DeadlineExceeded)));
    assert!(start.elapsed() >= WAIT);
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn explicit_cancel_wakes_blocked_send() {
    let chan = AckableChannel::new();
    let tx = chan.sender();
    let token = CancelToken::new();
    let signal = token.canceled();

    let producer = tokio::spawn(async move { tx.send(signal, "payload").await });

    tokio::time::sleep(Duration::from_millis(10)).await;
    token.cancel();

    let err = producer.await.unwrap().unwrap_err();
    assert_eq!(err.kind(), Error::Cancelled(Cause::Canceled));
    assert_eq!(err.into_inner(), "payload");
}

#[tokio::test]
async fn early_close() {
    let mut chan = AckableChannel::new();
    assert_eq!(chan.close(), Ok(()));
    assert_eq!(chan.close(), Ok(()));

    let err = chan.send(signal::never(), 0).await.unwrap_err();
    assert!(err.is_end_of_stream());
    assert_eq!(chan.recv(signal::never()).await, Err(Error::EndOfStream));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn close_wakes_blocked_receiver() {
    let mut chan = AckableChannel::<i32>::new();
    let tx = chan.sender();

    let consumer = tokio::spawn(async move {
        let res = chan.recv(signal::never()).await.map(|v| *v);
        res
    });

    tokio::time::sleep(Duration::from_millis(10)).await;
    tx.close().unwrap();

    let res = tokio::time::timeout(Duration::from_secs(1), consumer)
        .await
        .expect("receiver must wake on close")
        .unwrap();
    assert_eq!(res, Err(Error::EndOfStream));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn close_wakes_blocked_senders() {
    let chan = AckableChannel::new();

    let producers: Vec<_> = (0..8)
        .map(|i| {
            let tx = chan.sender();
            tokio::spawn(async move { tx.send(signal::never(), i).await })
        })
        .collect();

    tokio::time::sleep(Duration::from_millis(10)).await;
    chan.close().unwrap();

    let mut returned = Vec::new();
    for producer in producers {
        let err = producer.await.unwrap().unwrap_err();
        assert!(err.is_end_of_stream());
        returned.push(err.into_inner());
    }
    returned.sort_unstable();
    assert_eq!(returned, (0..8).collect::<Vec<_>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn many_producers_each_value_once() {
    const N: usize = 200;

    let mut chan = AckableChannel::new();
    let producers: Vec<_> = (0..N)
        .map(|i| {
            let tx = chan.sender();
            tokio::spawn(async move { tx.send(signal::never(), i).await.unwrap() })
        })
        .collect();

    let mut seen = HashSet::new();
    for _ in 0..N {
        let v = *chan.recv(signal::never()).await.unwrap();
        // re-reading before the ack never pulls another producer's value.
        assert_eq!(chan.recv(signal::never()).await, Ok(&v));
        assert!(seen.insert(v), "value {} delivered twice", v);
        chan.ack();
    }

    for producer in producers {
        producer.await.unwrap();
    }
    assert_eq!(seen, (0..N).collect::<HashSet<_>>());
    assert_eq!(chan.try_recv(), Err(TryRecvError::Empty));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn dropped_send_is_never_delivered() {
    let mut chan = AckableChannel::new();

    let res = tokio::time::timeout(Duration::from_millis(10), chan.send(signal::never(), 1)).await;
    assert!(res.is_err());

    let tx = chan.sender();
    let producer = tokio::spawn(async move { tx.send(signal::never(), 2).await });

    assert_eq!(chan.recv(signal::never()).await, Ok(&2));
    chan.ack();
    producer.await.unwrap().unwrap();
}

#[tokio::test]
async fn dropping_consumer_ends_producers() {
    let chan = AckableChannel::new();
    let tx = chan.sender();
    let producer = tokio::spawn(async move { tx.send(signal::never(), 5u8).await });

    tokio::time::sleep(Duration::from_millis(10)).await;
    drop(chan);

    let err = producer.await.unwrap().unwrap_err();
    assert!(err.is_end_of_stream());
}
