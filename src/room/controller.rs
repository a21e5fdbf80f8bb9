use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use super::state::{Lifecycle, SharedRoom};
use super::{ClientId, NewMessage};

/// Single writer for the room. Owns the receiving ends of the intent queues
/// and applies intents one at a time.
pub(crate) struct RoomController {
    pub state: SharedRoom,
    pub lifecycle: Arc<Lifecycle>,
    pub join_rx: mpsc::Receiver<ClientId>,
    pub leave_rx: mpsc::Receiver<ClientId>,
    pub message_rx: mpsc::Receiver<NewMessage>,
    pub shutdown_rx: oneshot::Receiver<()>,
}

impl RoomController {
    /// Handle intents until shutdown, then drain whatever is still counted.
    ///
    /// `select!` picks randomly among ready branches, so no intent kind
    /// starves another; each queue is FIFO on its own.
    pub async fn run(mut self) {
        info!("Chat room loop started");

        loop {
            tokio::select! {
                Some(client_id) = self.join_rx.recv() => self.apply_join(client_id).await,
                Some(client_id) = self.leave_rx.recv() => self.apply_leave(client_id).await,
                Some(message) = self.message_rx.recv() => self.apply_message(message).await,
                // a dropped sender counts as a shutdown request
                _ = &mut self.shutdown_rx => break,
                else => break,
            }
        }

        info!(
            "Chat room loop draining {} outstanding intents",
            self.lifecycle.outstanding()
        );
        self.drain().await;
        // receivers are released when `self` drops here
        info!("Chat room loop stopped");
    }

    /// Keep applying until every counted intent is done. New submissions
    /// are refused by the intake side once shutdown has begun.
    async fn drain(&mut self) {
        loop {
            let idle = self.lifecycle.wait_idle();
            if self.lifecycle.outstanding() == 0 {
                return;
            }
            tokio::select! {
                Some(client_id) = self.join_rx.recv() => self.apply_join(client_id).await,
                Some(client_id) = self.leave_rx.recv() => self.apply_leave(client_id).await,
                Some(message) = self.message_rx.recv() => self.apply_message(message).await,
                // a submitter backed out; re-check the count
                _ = idle => {}
            }
        }
    }

    async fn apply_join(&self, client_id: ClientId) {
        let inserted = self.state.write().await.members.insert(client_id.clone());
        if inserted {
            info!("Client {} has joined the chat", client_id);
        } else {
            debug!("Ignoring duplicate join for client {}", client_id);
        }
        self.lifecycle.finish();
    }

    async fn apply_leave(&self, client_id: ClientId) {
        let removed = self.state.write().await.members.remove(&client_id);
        if removed {
            info!("Client {} has left the chat", client_id);
        } else {
            debug!("Ignoring leave for absent client {}", client_id);
        }
        self.lifecycle.finish();
    }

    async fn apply_message(&self, message: NewMessage) {
        let message = message.stamp(Utc::now());
        debug!(
            "Client {} sent a message ({} bytes)",
            message.sender,
            message.text.len()
        );
        self.state.write().await.log.push(message);
        self.lifecycle.finish();
    }
}
