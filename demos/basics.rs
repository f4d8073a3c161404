use ack_chan::{signal, AckableChannel};
use std::time::Duration;

#[tokio::main]
async fn main() {
    let mut chan = AckableChannel::new();

    for worker in 0..3 {
        let tx = chan.sender();
        tokio::spawn(async move {
            for i in 0..3 {
                if tx.send(signal::never(), (worker, i)).await.is_err() {
                    println!("channel closed");
                    return;
                }
            }
        });
    }

    let mut failed_once = false;
    for _ in 0..9 {
        let (worker, i) = *chan.recv(signal::timeout(Duration::from_secs(1))).await.unwrap();

        // pretend the first value fails to process, it is still ours to retry.
        if !failed_once {
            failed_once = true;
            let again = chan.recv(signal::never()).await.unwrap();
            println!("retrying {:?}", again);
        }

        println!("got {} from worker {}", i, worker);
        chan.ack();
    }

    chan.close().unwrap();
}
