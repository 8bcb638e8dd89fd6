//! The coordination loop.
//!
//! One task owns the [`ClientRegistry`] and the [`Dispatcher`] (and through it
//! the room directory).  Everything else talks to it through a cloneable
//! [`HubHandle`] that feeds two bounded event sources:
//!
//! ```text
//!  ws session ──register──────────────►┐
//!                                      ├─► Hub::run ─► dispatch ─► deliver ─► outboxes
//!  ws session ──inbound / unregister──►┘
//! ```
//!
//! # Ordering
//!
//! Each source is FIFO.  Pending registrations are always taken first, and a
//! session registers before it submits, so its own registration is processed
//! before its first update.
//!
//! Updates and unregistrations share one queue.  A session's last frames are
//! therefore routed before its removal, and a removal is never held back by
//! other clients' traffic.  Events from different sessions interleave in
//! whatever order they reach the loop.
//!
//! # Blocking
//!
//! The loop suspends only while waiting for the next event.  Delivery uses
//! non-blocking sends (see [`crate::application::broadcast`]).
//!
//! # Shutdown
//!
//! [`Hub::run`] returns once every `HubHandle` has been dropped, handing back
//! the final registry and room directory.

use std::sync::Arc;

use collab_core::{RoomDirectory, SequenceCounter, Update};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::application::broadcast::{deliver, Outbox};
use crate::application::dispatch::{Dispatcher, Inbound};
use crate::application::registry::{ClientRegistry, ConnectionId};
use crate::domain::HubConfig;

/// Returned by [`HubHandle`] methods once the loop has stopped.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("coordination loop has stopped")]
pub struct HubClosed;

/// One unit of work for the loop.
pub enum HubEvent {
    Register(ConnectionId, Box<dyn Outbox>),
    Unregister(ConnectionId),
    Inbound(ConnectionId, Update),
}

/// What the loop owned when it stopped.
#[derive(Debug)]
pub struct HubState {
    pub registry: ClientRegistry,
    pub rooms: RoomDirectory,
}

// ── Handle ────────────────────────────────────────────────────────────────────

/// Cloneable sender side of the loop's three event sources.
#[derive(Clone)]
pub struct HubHandle {
    register: mpsc::Sender<(ConnectionId, Box<dyn Outbox>)>,
    events: mpsc::Sender<HubEvent>,
}

impl HubHandle {
    /// Adds a client.  Waits only if the register source is full.
    pub async fn register(
        &self,
        id: ConnectionId,
        outbox: impl Outbox + 'static,
    ) -> Result<(), HubClosed> {
        self.register
            .send((id, Box::new(outbox)))
            .await
            .map_err(|_| HubClosed)
    }

    /// Removes a client.  Unknown ids are ignored by the loop.
    pub async fn unregister(&self, id: ConnectionId) -> Result<(), HubClosed> {
        self.events
            .send(HubEvent::Unregister(id))
            .await
            .map_err(|_| HubClosed)
    }

    /// Submits an update received from client `id`.
    pub async fn submit(&self, id: ConnectionId, update: Update) -> Result<(), HubClosed> {
        self.events
            .send(HubEvent::Inbound(id, update))
            .await
            .map_err(|_| HubClosed)
    }
}

// ── Loop ──────────────────────────────────────────────────────────────────────

/// The coordination loop and the state it owns.
pub struct Hub {
    registry: ClientRegistry,
    dispatcher: Dispatcher,
    register_rx: mpsc::Receiver<(ConnectionId, Box<dyn Outbox>)>,
    events_rx: mpsc::Receiver<HubEvent>,
}

impl Hub {
    /// Creates the loop and its first handle.  Nothing runs until
    /// [`Hub::run`] is awaited.
    pub fn new(config: &HubConfig, edits: Arc<SequenceCounter>) -> (Self, HubHandle) {
        let capacity = config.event_queue.max(1);
        let (register_tx, register_rx) = mpsc::channel(capacity);
        let (events_tx, events_rx) = mpsc::channel(capacity);

        let hub = Self {
            registry: ClientRegistry::new(),
            dispatcher: Dispatcher::new(edits),
            register_rx,
            events_rx,
        };
        let handle = HubHandle {
            register: register_tx,
            events: events_tx,
        };
        (hub, handle)
    }

    pub fn registry(&self) -> &ClientRegistry {
        &self.registry
    }

    pub fn rooms(&self) -> &RoomDirectory {
        self.dispatcher.rooms()
    }

    /// Processes events until every handle is dropped.
    pub async fn run(mut self) -> HubState {
        info!("coordination loop started");
        loop {
            let event = tokio::select! {
                biased;
                Some((id, outbox)) = self.register_rx.recv() => HubEvent::Register(id, outbox),
                Some(event) = self.events_rx.recv() => event,
                else => break,
            };
            self.handle(event);
        }
        info!(
            clients = self.registry.len(),
            rooms = self.dispatcher.rooms().len(),
            "coordination loop stopped"
        );
        HubState {
            registry: self.registry,
            rooms: self.dispatcher.into_rooms(),
        }
    }

    /// Processes one event to completion.
    pub fn handle(&mut self, event: HubEvent) {
        match event {
            HubEvent::Register(id, outbox) => {
                self.registry.register(id, outbox);
                debug!(client = %id, total = self.registry.len(), "registered");
            }
            HubEvent::Unregister(id) => {
                if self.registry.unregister(id) {
                    debug!(client = %id, total = self.registry.len(), "unregistered");
                }
            }
            HubEvent::Inbound(id, update) => self.on_inbound(id, update),
        }
    }

    fn on_inbound(&mut self, id: ConnectionId, update: Update) {
        if !self.registry.contains(id) {
            debug!(client = %id, module = %update.module, "ignoring update from removed client");
            return;
        }
        let inbound = match Inbound::try_from(update) {
            Ok(inbound) => inbound,
            Err(e) => {
                debug!(client = %id, "dropping update: {e}");
                return;
            }
        };

        self.registry.bind(id, inbound.sender(), inbound.room());
        let outbound = self.dispatcher.dispatch(inbound);

        match deliver(&mut self.registry, &outbound) {
            Ok(report) if !report.dropped.is_empty() => {
                warn!(
                    module = %outbound.update().module,
                    dropped = report.dropped.len(),
                    "slow clients removed during broadcast"
                );
            }
            Ok(_) => {}
            Err(e) => error!(module = %outbound.update().module, "broadcast failed: {e}"),
        }
    }
}

/// Spawns the loop on the current tokio runtime.
pub fn spawn_hub(
    config: &HubConfig,
    edits: Arc<SequenceCounter>,
) -> (HubHandle, JoinHandle<HubState>) {
    let (hub, handle) = Hub::new(config, edits);
    (handle, tokio::spawn(hub.run()))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
