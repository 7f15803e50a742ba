//! Single-slot rendezvous between the receive loop and the dispatcher.
//!
//! `send` resolves only once the receiving side has taken the item, so at
//! most one event is in transit and the network is not read ahead of the
//! dispatcher.

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("hand-off receiver closed")]
pub struct Closed;

pub struct HandoffSender<T> {
    tx: mpsc::Sender<(T, oneshot::Sender<()>)>,
}

pub struct HandoffReceiver<T> {
    rx: mpsc::Receiver<(T, oneshot::Sender<()>)>,
}

pub fn channel<T>() -> (HandoffSender<T>, HandoffReceiver<T>) {
    let (tx, rx) = mpsc::channel(1);
    (HandoffSender { tx }, HandoffReceiver { rx })
}

impl<T> HandoffSender<T> {
    pub async fn send(&self, item: T) -> Result<(), Closed> {
        let (accept, accepted) = oneshot::channel();
        self.tx.send((item, accept)).await.map_err(|_| Closed)?;
        accepted.await.map_err(|_| Closed)
    }
}

impl<T> HandoffReceiver<T> {
    pub async fn recv(&mut self) -> Option<T> {
        let (item, accept) = self.rx.recv().await?;
        let _ = accept.send(());
        Some(item)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn send_waits_for_receiver() {
        let (tx, mut rx) = channel::<u32>();
        let send = tokio::spawn(async move { tx.send(7).await });

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(!send.is_finished());

        assert_eq!(rx.recv().await, Some(7));
        assert_eq!(send.await.unwrap(), Ok(()));
    }

    #[tokio::test(start_paused = true)]
    async fn second_send_blocks_until_first_is_taken() {
        let (tx, mut rx) = channel::<u32>();
        let delivered = Arc::new(AtomicUsize::new(0));
        let sender = tokio::spawn({
            let delivered = delivered.clone();
            async move {
                tx.send(1).await.unwrap();
                delivered.fetch_add(1, Ordering::SeqCst);
                tx.send(2).await.unwrap();
                delivered.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(delivered.load(Ordering::SeqCst), 0);

        assert_eq!(rx.recv().await, Some(1));
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(delivered.load(Ordering::SeqCst), 1);
        assert!(!sender.is_finished());

        assert_eq!(rx.recv().await, Some(2));
        sender.await.unwrap();
        assert_eq!(delivered.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn dropped_receiver_fails_pending_send() {
        let (tx, rx) = channel::<u32>();
        drop(rx);
        assert_eq!(tx.send(1).await, Err(Closed));
    }
}
