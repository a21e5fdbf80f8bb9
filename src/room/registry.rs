use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, oneshot, RwLock};
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, info, warn};

use super::controller::RoomController;
use super::state::{Lifecycle, RoomState, SharedRoom};
use super::{Accepted, ClientId, HistoryResponse, IntentKind, NewMessage};
use crate::error::{MurmurError, Result};
use crate::internal_error;
use crate::settings;

/// Handle to the chat room.
///
/// Mutations are queued as intents for a single background loop; a returned
/// `Accepted` means the intent is queued, not that it has been applied. Reads
/// take a snapshot of committed state under a shared lock.
pub struct ClientRegistry {
    settings: settings::RegistrySettings,
    pub(crate) state: SharedRoom,
    lifecycle: Arc<Lifecycle>,
    join_tx: mpsc::Sender<ClientId>,
    leave_tx: mpsc::Sender<ClientId>,
    message_tx: mpsc::Sender<NewMessage>,
    shutdown_tx: Mutex<Option<oneshot::Sender<()>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for ClientRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientRegistry")
            .field("settings", &self.settings)
            .field("outstanding", &self.lifecycle.outstanding())
            .field("closing", &self.lifecycle.is_closing())
            .finish()
    }
}

impl ClientRegistry {
    /// Build the registry and spawn its loop. Must be called from within a
    /// tokio runtime.
    pub fn new(settings: settings::RegistrySettings) -> Self {
        let capacity = settings.intent_queue_capacity.max(1);
        let (join_tx, join_rx) = mpsc::channel(capacity);
        let (leave_tx, leave_rx) = mpsc::channel(capacity);
        let (message_tx, message_rx) = mpsc::channel(capacity);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let state: SharedRoom = Arc::new(RwLock::new(RoomState::default()));
        let lifecycle = Arc::new(Lifecycle::default());

        let controller = RoomController {
            state: state.clone(),
            lifecycle: lifecycle.clone(),
            join_rx,
            leave_rx,
            message_rx,
            shutdown_rx,
        };
        let task = tokio::spawn(controller.run());
        info!(
            "Created chat room with intent queue capacity {}",
            capacity
        );

        Self {
            settings,
            state,
            lifecycle,
            join_tx,
            leave_tx,
            message_tx,
            shutdown_tx: Mutex::new(Some(shutdown_tx)),
            task: Mutex::new(Some(task)),
        }
    }

    async fn is_joined(&self, client_id: &ClientId) -> bool {
        self.state.read().await.members.contains(client_id)
    }

    /// Queue a join. Fails fast if the client is already a member.
    pub async fn request_join(&self, client_id: ClientId) -> Result<Accepted> {
        let ticket = self.lifecycle.begin()?;
        if self.is_joined(&client_id).await {
            debug!("Client {} already exists", client_id);
            return Err(MurmurError::AlreadyMember(client_id));
        }
        self.join_tx
            .send(client_id.clone())
            .await
            .map_err(|_| MurmurError::ShuttingDown)?;
        ticket.hand_off();
        Ok(Accepted {
            client_id,
            intent: IntentKind::Join,
        })
    }

    /// Queue a leave. Fails fast if the client is not a member.
    pub async fn request_leave(&self, client_id: ClientId) -> Result<Accepted> {
        let ticket = self.lifecycle.begin()?;
        if !self.is_joined(&client_id).await {
            debug!("Client {} does not exist", client_id);
            return Err(MurmurError::NotMember(client_id));
        }
        self.leave_tx
            .send(client_id.clone())
            .await
            .map_err(|_| MurmurError::ShuttingDown)?;
        ticket.hand_off();
        Ok(Accepted {
            client_id,
            intent: IntentKind::Leave,
        })
    }

    /// Queue a message. The timestamp is assigned when the loop applies it.
    pub async fn request_message(&self, message: NewMessage) -> Result<Accepted> {
        let ticket = self.lifecycle.begin()?;
        let client_id = message.sender.clone();
        if !self.is_joined(&client_id).await {
            debug!("Client {} does not exist. Message not sent", client_id);
            return Err(MurmurError::NotMember(client_id));
        }
        self.message_tx
            .send(message)
            .await
            .map_err(|_| MurmurError::ShuttingDown)?;
        ticket.hand_off();
        Ok(Accepted {
            client_id,
            intent: IntentKind::Message,
        })
    }

    /// Copy the whole log for a member, giving up after the history timeout
    pub async fn fetch_history(&self, client_id: ClientId) -> Result<HistoryResponse> {
        if self.lifecycle.is_closing() {
            return Err(MurmurError::ShuttingDown);
        }
        let snapshot = async {
            let state = self.state.read().await;
            if !state.members.contains(&client_id) {
                return Err(MurmurError::NotMember(client_id.clone()));
            }
            let messages = state.log.clone();
            drop(state);
            Ok(HistoryResponse::new(client_id.clone(), messages))
        };
        match time::timeout(self.settings.history_timeout, snapshot).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Timeout while retrieving messages for client {}", client_id);
                Err(MurmurError::Timeout(format!(
                    "history for client {}",
                    client_id
                )))
            }
        }
    }

    pub async fn is_member(&self, client_id: &ClientId) -> bool {
        self.is_joined(client_id).await
    }

    pub async fn member_count(&self) -> usize {
        self.state.read().await.members.len()
    }

    pub async fn message_count(&self) -> usize {
        self.state.read().await.log.len()
    }

    /// Intents accepted (or being submitted) but not yet applied
    pub fn outstanding(&self) -> usize {
        self.lifecycle.outstanding()
    }

    /// Resolve once every accepted intent has been applied
    pub async fn wait_idle(&self) {
        self.lifecycle.wait_idle().await
    }

    pub fn is_shutting_down(&self) -> bool {
        self.lifecycle.is_closing()
    }

    /// Stop accepting work, let the loop apply everything already accepted,
    /// and wait for it to exit. Calling it again is harmless.
    pub async fn shutdown(&self) -> Result<()> {
        if !self.lifecycle.close() {
            info!(
                "Shutting down chat room with {} outstanding intents",
                self.lifecycle.outstanding()
            );
        }
        let shutdown_tx = self
            .shutdown_tx
            .lock()
            .map_err(|e| internal_error!("Failed to acquire shutdown lock: {}", e))?
            .take();
        if let Some(tx) = shutdown_tx {
            // the loop may already be gone; nothing to signal then
            let _ = tx.send(());
        }
        let task = self
            .task
            .lock()
            .map_err(|e| internal_error!("Failed to acquire task lock: {}", e))?
            .take();
        if let Some(task) = task {
            task.await
                .map_err(|e| internal_error!("Chat room loop failed: {}", e))?;
        }
        Ok(())
    }
}
