//! Outbound side of a session
//!
//! Board views are latest-wins, so a slow socket only ever sees the newest
//! frame. Every other message is queued and delivered in order.

use tokio::sync::{mpsc, watch};

use crate::protocol::{ServerMessage, SessionView};

/// Create a connected sender/receiver pair
pub fn channel() -> (Outbound, OutboundReceiver) {
    let (views_tx, views_rx) = watch::channel(None);
    let (messages_tx, messages_rx) = mpsc::unbounded_channel();

    (
        Outbound {
            views: views_tx,
            messages: messages_tx,
        },
        OutboundReceiver {
            views: views_rx,
            messages: messages_rx,
            views_open: true,
            messages_open: true,
        },
    )
}

pub struct Outbound {
    views: watch::Sender<Option<SessionView>>,
    messages: mpsc::UnboundedSender<ServerMessage>,
}

impl Outbound {
    /// Replace the pending view; an unsent older one is discarded
    pub fn view(&self, view: SessionView) {
        self.views.send_replace(Some(view));
    }

    /// Queue a message. Returns `false` once the socket side is gone.
    pub fn message(&self, message: ServerMessage) -> bool {
        self.messages.send(message).is_ok()
    }

    /// Queue handle for other producers, such as the wallet bridge
    pub fn messages(&self) -> mpsc::UnboundedSender<ServerMessage> {
        self.messages.clone()
    }
}

pub struct OutboundReceiver {
    views: watch::Receiver<Option<SessionView>>,
    messages: mpsc::UnboundedReceiver<ServerMessage>,
    views_open: bool,
    messages_open: bool,
}

impl OutboundReceiver {
    /// Next message for the socket. Queued messages go ahead of the view.
    /// Returns `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<ServerMessage> {
        loop {
            tokio::select! {
                biased;
                message = self.messages.recv(), if self.messages_open => match message {
                    Some(message) => return Some(message),
                    None => self.messages_open = false,
                },
                changed = self.views.changed(), if self.views_open => {
                    if changed.is_err() {
                        self.views_open = false;
                        continue;
                    }
                    let latest = self.views.borrow_and_update().clone();
                    if let Some(data) = latest {
                        return Some(ServerMessage::State { data });
                    }
                }
                else => return None,
            }
        }
    }

    /// Non-blocking variant of [`recv`](Self::recv)
    #[cfg(test)]
    pub fn try_recv(&mut self) -> Option<ServerMessage> {
        if let Ok(message) = self.messages.try_recv() {
            return Some(message);
        }
        if !self.views.has_changed().unwrap_or(false) {
            return None;
        }
        self.views
            .borrow_and_update()
            .clone()
            .map(|data| ServerMessage::State { data })
    }
}
