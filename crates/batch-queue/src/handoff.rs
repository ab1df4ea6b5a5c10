//! Rendezvous channel between the aggregation loop and the consumer.
//!
//! tokio has no zero-capacity channel, so every value travels with a oneshot
//! acknowledgement. `send` only resolves once the receiving side has taken the
//! value out of the channel.

use std::task::{Context, Poll};

use tokio::sync::{mpsc, oneshot};

struct Parcel<V> {
    value: V,
    ack: oneshot::Sender<()>,
}

/// The receiving half is gone, the value could not be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Disconnected;

pub(crate) fn channel<V>() -> (HandoffSender<V>, HandoffReceiver<V>) {
    let (tx, rx) = mpsc::channel(1);
    (HandoffSender { tx }, HandoffReceiver { rx })
}

pub(crate) struct HandoffSender<V> {
    tx: mpsc::Sender<Parcel<V>>,
}

impl<V> HandoffSender<V> {
    pub(crate) async fn send(&self, value: V) -> Result<(), Disconnected> {
        let (ack, acked) = oneshot::channel();
        self.tx
            .send(Parcel { value, ack })
            .await
            .map_err(|_| Disconnected)?;
        acked.await.map_err(|_| Disconnected)
    }
}

pub(crate) struct HandoffReceiver<V> {
    rx: mpsc::Receiver<Parcel<V>>,
}

impl<V> HandoffReceiver<V> {
    pub(crate) async fn recv(&mut self) -> Option<V> {
        self.rx.recv().await.map(Parcel::accept)
    }

    pub(crate) fn blocking_recv(&mut self) -> Option<V> {
        self.rx.blocking_recv().map(Parcel::accept)
    }

    pub(crate) fn poll_recv(&mut self, cx: &mut Context<'_>) -> Poll<Option<V>> {
        self.rx.poll_recv(cx).map(|parcel| parcel.map(Parcel::accept))
    }
}

impl<V> Parcel<V> {
    fn accept(self) -> V {
        // The sender may have stopped waiting, the value is ours either way.
        let _ = self.ack.send(());
        self.value
    }
}
