//! Room topology manager.
//!
//! Maps logical topics to the set of live sessions subscribed to them and
//! fans published events out to those sessions. Subscriber sets live behind
//! per-topic locks inside a sharded registry, so publishing to one shipment
//! never serializes against unrelated shipments. Delivery is at-most-once
//! per currently connected subscriber: a session whose outbound buffer is
//! full is skipped with a warning, never awaited, and disconnected sessions
//! re-derive state from the record store on reconnect.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use compact_str::CompactString;
use ofd_sdk::objects::notification::NotificationResponse;
use ofd_sdk::objects::shipment::{ShipmentResponse, ShipmentStatus};
use tokio::sync::{Mutex, RwLock, mpsc};
use uuid::Uuid;

/// Outbound buffer per session. Bursts beyond this are dropped for that
/// session rather than blocking delivery to others.
pub const SESSION_EVENT_BUFFER: usize = 64;

/// A logical topic a session can subscribe to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    /// All parties currently interested in one shipment.
    Shipment(Uuid),
    /// Every connected driver awaiting available work.
    DriverPool,
    /// Drivers filtered to a pickup city.
    Region(CompactString),
    /// Direct-to-user channel.
    User(Uuid),
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Topic::Shipment(id) => write!(f, "shipment:{id}"),
            Topic::DriverPool => write!(f, "pool:drivers"),
            Topic::Region(city) => write!(f, "region:{city}"),
            Topic::User(id) => write!(f, "user:{id}"),
        }
    }
}

/// An event published into a room.
#[derive(Debug, Clone)]
pub enum RoomEvent {
    /// A new unclaimed shipment entered the pool.
    PoolListed { shipment: ShipmentResponse },
    /// A shipment left the pool (claimed or cancelled).
    PoolRemoved { shipment_id: Uuid },
    /// A shipment was claimed.
    ShipmentAccepted { shipment: ShipmentResponse },
    /// A shipment changed status.
    StatusChanged {
        shipment: ShipmentResponse,
        old_status: ShipmentStatus,
        new_status: ShipmentStatus,
    },
    /// A notification was created for the user the room belongs to.
    NotificationCreated { notification: NotificationResponse },
}

/// Sender half of a session's outbound event channel.
pub type EventSender = mpsc::Sender<Arc<RoomEvent>>;
/// Receiver half of a session's outbound event channel.
pub type EventReceiver = mpsc::Receiver<Arc<RoomEvent>>;

/// Create the outbound channel for one session.
pub fn session_channel() -> (EventSender, EventReceiver) {
    mpsc::channel(SESSION_EVENT_BUFFER)
}

struct Room {
    subscribers: Mutex<HashMap<Uuid, EventSender>>,
}

struct SessionEntry {
    sender: EventSender,
    topics: HashSet<Topic>,
}

/// The room registry. One instance per process, constructed explicitly and
/// injected into the dispatch coordinator (no module-level singleton).
#[derive(Default)]
pub struct RoomTopologyManager {
    rooms: RwLock<HashMap<Topic, Arc<Room>>>,
    sessions: Mutex<HashMap<Uuid, SessionEntry>>,
}

impl RoomTopologyManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a live session and its outbound channel. Must be called
    /// before the session subscribes to anything.
    pub async fn register_session(&self, session_id: Uuid, sender: EventSender) {
        let mut sessions = self.sessions.lock().await;
        sessions.insert(
            session_id,
            SessionEntry {
                sender,
                topics: HashSet::new(),
            },
        );
    }

    /// Add a session to a topic. Unknown sessions are ignored (the session
    /// disconnected between intent and subscription).
    pub async fn subscribe(&self, session_id: Uuid, topic: Topic) {
        let sender = {
            let mut sessions = self.sessions.lock().await;
            let Some(entry) = sessions.get_mut(&session_id) else {
                tracing::debug!(%session_id, %topic, "subscribe for unregistered session dropped");
                return;
            };
            entry.topics.insert(topic.clone());
            entry.sender.clone()
        };

        // A concurrent unsubscribe can evict an empty room between our
        // lookup and our insert, stranding the membership in an orphaned
        // `Room` that the registry no longer serves. Insert, then confirm
        // the registry still holds the room we joined; retry into the live
        // one otherwise.
        loop {
            let room = {
                let rooms = self.rooms.read().await;
                rooms.get(&topic).cloned()
            };
            let room = match room {
                Some(room) => room,
                None => {
                    let mut rooms = self.rooms.write().await;
                    rooms
                        .entry(topic.clone())
                        .or_insert_with(|| {
                            Arc::new(Room {
                                subscribers: Mutex::new(HashMap::new()),
                            })
                        })
                        .clone()
                }
            };
            room.subscribers.lock().await.insert(session_id, sender.clone());

            let rooms = self.rooms.read().await;
            match rooms.get(&topic) {
                Some(current) if Arc::ptr_eq(current, &room) => return,
                _ => continue,
            }
        }
    }

    /// Remove a session from a topic.
    pub async fn unsubscribe(&self, session_id: Uuid, topic: &Topic) {
        {
            let mut sessions = self.sessions.lock().await;
            if let Some(entry) = sessions.get_mut(&session_id) {
                entry.topics.remove(topic);
            }
        }
        self.remove_from_room(session_id, topic).await;
    }

    /// Drop a session from every topic it joined. Called on disconnect.
    pub async fn disconnect(&self, session_id: Uuid) {
        let topics = {
            let mut sessions = self.sessions.lock().await;
            match sessions.remove(&session_id) {
                Some(entry) => entry.topics,
                None => return,
            }
        };
        for topic in topics {
            self.remove_from_room(session_id, &topic).await;
        }
    }

    /// Publish an event to every current subscriber of a topic.
    ///
    /// Fire-and-forget, at-most-once per connected subscriber. Returns the
    /// number of sessions the event was handed to.
    pub async fn publish(&self, topic: &Topic, event: RoomEvent) -> usize {
        let room = {
            let rooms = self.rooms.read().await;
            rooms.get(topic).cloned()
        };
        let Some(room) = room else {
            return 0;
        };

        let targets: Vec<(Uuid, EventSender)> = {
            let subscribers = room.subscribers.lock().await;
            subscribers.iter().map(|(id, tx)| (*id, tx.clone())).collect()
        };

        let event = Arc::new(event);
        let mut delivered = 0;
        let mut dead = Vec::new();
        for (session_id, sender) in targets {
            match sender.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(%session_id, %topic, "session outbound buffer full, dropping event");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    dead.push(session_id);
                }
            }
        }

        if !dead.is_empty() {
            let mut subscribers = room.subscribers.lock().await;
            for session_id in dead {
                subscribers.remove(&session_id);
            }
        }
        delivered
    }

    async fn remove_from_room(&self, session_id: Uuid, topic: &Topic) {
        let room = {
            let rooms = self.rooms.read().await;
            rooms.get(topic).cloned()
        };
        let Some(room) = room else {
            return;
        };
        let now_empty = {
            let mut subscribers = room.subscribers.lock().await;
            subscribers.remove(&session_id);
            subscribers.is_empty()
        };
        if now_empty {
            let mut rooms = self.rooms.write().await;
            if let Some(room) = rooms.get(topic) {
                if room.subscribers.lock().await.is_empty() {
                    rooms.remove(topic);
                }
            }
        }
    }
}
