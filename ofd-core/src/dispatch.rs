//! The dispatch coordinator.
//!
//! Composition root for the shipment lifecycle: every intent flows through
//! authorize → (claim: arbitrate) → state machine → conditional store commit
//! → ledger append → fan-out → ack. Authorization and state-machine failures
//! short-circuit before any store mutation; ledger and fan-out run only for
//! transitions that durably committed.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use ofd_sdk::objects::ErrorCode;
use ofd_sdk::objects::shipment::CreateShipmentRequest;
use rand::Rng;
use rust_decimal::Decimal;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::arbiter::{self, ClaimResult};
use crate::auth::{self, SessionAuth, ShipmentAction};
use crate::entities::shipments::{Shipment, ShipmentInsert, format_order_number};
use crate::entities::status_history::{StatusHistoryEntry, StatusHistoryInsert};
use crate::entities::{Role, ShipmentStatus};
use crate::fanout::{CommittedTransition, Fanout};
use crate::ledger::Ledger;
use crate::lifecycle::{self, TransitionError};
use crate::rooms::{RoomTopologyManager, Topic};
use crate::store::{RecordStore, StoreError};

/// Transparent retries for store-level failures before surfacing
/// `StoreUnavailable` to the caller.
const STORE_RETRY_ATTEMPTS: u32 = 3;

/// Attempts to win a conditional status commit before giving up on a
/// shipment that keeps changing under us.
const COMMIT_ATTEMPTS: u32 = 2;

/// Everything that can go wrong handling an intent.
///
/// All variants are recoverable at the caller; only `StoreUnavailable` was
/// already retried transparently.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("no valid credential")]
    Unauthorized,
    #[error("forbidden: {0}")]
    Forbidden(&'static str),
    #[error("invalid request: {0}")]
    InvalidRequest(&'static str),
    #[error("shipment not found")]
    NotFound,
    #[error("invalid transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: ShipmentStatus,
        to: ShipmentStatus,
    },
    #[error("shipment is already in terminal status {0:?}")]
    AlreadyTerminal(ShipmentStatus),
    #[error("shipment already claimed")]
    AlreadyClaimed,
    #[error("shipment is already in status {0:?}")]
    NoOp(ShipmentStatus),
    #[error("record store unavailable")]
    StoreUnavailable,
}

impl DispatchError {
    /// Wire error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            DispatchError::Unauthorized => ErrorCode::Unauthorized,
            DispatchError::Forbidden(_) => ErrorCode::Forbidden,
            DispatchError::InvalidRequest(_) => ErrorCode::BadRequest,
            DispatchError::NotFound => ErrorCode::NotFound,
            DispatchError::InvalidTransition { .. } => ErrorCode::InvalidTransition,
            DispatchError::AlreadyTerminal(_) => ErrorCode::AlreadyTerminal,
            DispatchError::AlreadyClaimed => ErrorCode::AlreadyClaimed,
            DispatchError::NoOp(_) => ErrorCode::NoOp,
            DispatchError::StoreUnavailable => ErrorCode::StoreUnavailable,
        }
    }
}

impl From<auth::Denied> for DispatchError {
    fn from(d: auth::Denied) -> Self {
        DispatchError::Forbidden(d.0)
    }
}

impl From<TransitionError> for DispatchError {
    fn from(e: TransitionError) -> Self {
        match e {
            TransitionError::InvalidTransition { from, to } => {
                DispatchError::InvalidTransition { from, to }
            }
            TransitionError::AlreadyTerminal(s) => DispatchError::AlreadyTerminal(s),
            TransitionError::NoOp(s) => DispatchError::NoOp(s),
        }
    }
}

/// An intent received from a connected session.
#[derive(Debug, Clone)]
pub enum Intent {
    CreateShipment(CreateShipmentRequest),
    Subscribe {
        shipment_id: Uuid,
    },
    Claim {
        shipment_id: Uuid,
    },
    UpdateStatus {
        shipment_id: Uuid,
        status: ShipmentStatus,
        note: Option<String>,
        lat: Option<f64>,
        lng: Option<f64>,
    },
    GetShipment {
        shipment_id: Uuid,
    },
    GetHistory {
        shipment_id: Uuid,
    },
}

/// Successful intent result, acknowledged to the originating session.
#[derive(Debug, Clone)]
pub enum IntentOutcome {
    Created(Shipment),
    Subscribed { shipment_id: Uuid },
    Claimed(Shipment),
    Updated(Shipment),
    Shipment(Shipment),
    History {
        shipment_id: Uuid,
        entries: Vec<StatusHistoryEntry>,
    },
}

pub struct Dispatcher {
    store: Arc<dyn RecordStore>,
    rooms: Arc<RoomTopologyManager>,
    ledger: Ledger,
    fanout: Fanout,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn RecordStore>, rooms: Arc<RoomTopologyManager>) -> Self {
        let ledger = Ledger::new(store.clone());
        let fanout = Fanout::new(rooms.clone());
        Self {
            store,
            rooms,
            ledger,
            fanout,
        }
    }

    pub fn rooms(&self) -> &Arc<RoomTopologyManager> {
        &self.rooms
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Handle one intent from one session.
    pub async fn handle(
        &self,
        session: &SessionAuth,
        intent: Intent,
    ) -> Result<IntentOutcome, DispatchError> {
        match intent {
            Intent::CreateShipment(request) => self.create(session, request).await,
            Intent::Subscribe { shipment_id } => self.subscribe(session, shipment_id).await,
            Intent::Claim { shipment_id } => self.claim(session, shipment_id).await,
            Intent::UpdateStatus {
                shipment_id,
                status,
                note,
                lat,
                lng,
            } => {
                self.update_status(session, shipment_id, status, note, lat, lng)
                    .await
            }
            Intent::GetShipment { shipment_id } => {
                let shipment = self.fetch(shipment_id).await?;
                auth::authorize(session, ShipmentAction::Read, Some(&shipment))?;
                Ok(IntentOutcome::Shipment(shipment))
            }
            Intent::GetHistory { shipment_id } => {
                let shipment = self.fetch(shipment_id).await?;
                auth::authorize(session, ShipmentAction::Read, Some(&shipment))?;
                let entries = self
                    .ledger
                    .read(shipment_id)
                    .await
                    .map_err(|_| DispatchError::StoreUnavailable)?;
                Ok(IntentOutcome::History {
                    shipment_id,
                    entries,
                })
            }
        }
    }

    async fn create(
        &self,
        session: &SessionAuth,
        request: CreateShipmentRequest,
    ) -> Result<IntentOutcome, DispatchError> {
        auth::authorize(session, ShipmentAction::Create, None)?;

        if request.price < Decimal::ZERO {
            return Err(DispatchError::InvalidRequest("price must not be negative"));
        }

        let year = OffsetDateTime::now_utc().year();
        let sequence =
            with_store_retry("next_order_sequence", || self.store.next_order_sequence(year))
                .await?;
        let order_number = format_order_number(year, sequence);

        let insert = ShipmentInsert {
            order_number,
            shipper_id: session.subject_id,
            pickup: request.pickup,
            dropoff: request.dropoff,
            weight_kg: request.weight_kg,
            volume_m3: request.volume_m3,
            vehicle_type: request.vehicle_type.into(),
            description: request.description,
            price: request.price,
            currency: request.currency,
            priority: request.priority.into(),
        };
        let shipment =
            with_store_retry("create_shipment", || self.store.create_shipment(insert.clone()))
                .await?;

        tracing::info!(
            shipment_id = %shipment.id,
            order_number = %shipment.order_number,
            shipper_id = %session.subject_id,
            "shipment created"
        );

        self.append_history(&shipment, ShipmentStatus::Unclaimed, session, None, None, None)
            .await;

        // The shipper is implicitly a party to their own shipment.
        self.rooms
            .subscribe(session.session_id, Topic::Shipment(shipment.id))
            .await;

        self.fanout
            .execute(self.store.as_ref(), &shipment, CommittedTransition::Created)
            .await;

        Ok(IntentOutcome::Created(shipment))
    }

    async fn subscribe(
        &self,
        session: &SessionAuth,
        shipment_id: Uuid,
    ) -> Result<IntentOutcome, DispatchError> {
        let shipment = self.fetch(shipment_id).await?;
        auth::authorize(session, ShipmentAction::Subscribe, Some(&shipment))?;

        self.rooms
            .subscribe(session.session_id, Topic::Shipment(shipment_id))
            .await;
        // A driver watching a shipment also follows its pickup city.
        if session.role == Role::Driver {
            self.rooms
                .subscribe(
                    session.session_id,
                    Topic::Region(shipment.pickup_city.clone()),
                )
                .await;
        }

        Ok(IntentOutcome::Subscribed { shipment_id })
    }

    async fn claim(
        &self,
        session: &SessionAuth,
        shipment_id: Uuid,
    ) -> Result<IntentOutcome, DispatchError> {
        auth::authorize(session, ShipmentAction::Claim, None)?;

        let result = with_store_retry("claim", || {
            arbiter::claim(self.store.as_ref(), shipment_id, session.subject_id)
        })
        .await?;

        let shipment = match result {
            ClaimResult::Won(shipment) => shipment,
            ClaimResult::Lost => return Err(DispatchError::AlreadyClaimed),
            ClaimResult::NotFound => return Err(DispatchError::NotFound),
        };

        self.append_history(&shipment, ShipmentStatus::Accepted, session, None, None, None)
            .await;

        self.fanout
            .execute(self.store.as_ref(), &shipment, CommittedTransition::Accepted)
            .await;

        Ok(IntentOutcome::Claimed(shipment))
    }

    async fn update_status(
        &self,
        session: &SessionAuth,
        shipment_id: Uuid,
        requested: ShipmentStatus,
        note: Option<String>,
        lat: Option<f64>,
        lng: Option<f64>,
    ) -> Result<IntentOutcome, DispatchError> {
        let mut shipment = self.fetch(shipment_id).await?;

        // Forbidden dominates transition validity: an unassigned driver is
        // denied even for edges that would otherwise be legal.
        auth::authorize(session, ShipmentAction::UpdateStatus, Some(&shipment))?;

        for attempt in 0.. {
            let actor = auth::actor_for(session, &shipment);
            lifecycle::transition(shipment.status, requested, actor)?;

            let committed = with_store_retry("update_status", || {
                self.store.update_status(
                    shipment_id,
                    shipment.status,
                    requested,
                    OffsetDateTime::now_utc(),
                )
            })
            .await?;

            match committed {
                Some(updated) => {
                    let old = shipment.status;
                    tracing::info!(
                        %shipment_id,
                        order_number = %updated.order_number,
                        from = ?old,
                        to = ?requested,
                        actor_id = %session.subject_id,
                        "shipment status changed"
                    );

                    self.append_history(&updated, requested, session, note, lat, lng)
                        .await;

                    let transition = if requested == ShipmentStatus::Cancelled {
                        CommittedTransition::Cancelled { old }
                    } else {
                        CommittedTransition::Progressed {
                            old,
                            new: requested,
                        }
                    };
                    self.fanout
                        .execute(self.store.as_ref(), &updated, transition)
                        .await;

                    return Ok(IntentOutcome::Updated(updated));
                }
                None if attempt + 1 < COMMIT_ATTEMPTS => {
                    // A concurrent transition won; revalidate against the
                    // fresh state before trying once more.
                    shipment = self.fetch(shipment_id).await?;
                }
                None => {
                    // Revalidate against the fresh state so a transition that
                    // became illegal reports the real reason. If the edge is
                    // still legal we simply kept losing the conditional
                    // commit, which is a store-contention failure, not a
                    // lifecycle one.
                    shipment = self.fetch(shipment_id).await?;
                    let actor = auth::actor_for(session, &shipment);
                    lifecycle::transition(shipment.status, requested, actor)?;
                    return Err(DispatchError::StoreUnavailable);
                }
            }
        }
        Err(DispatchError::StoreUnavailable)
    }

    async fn fetch(&self, shipment_id: Uuid) -> Result<Shipment, DispatchError> {
        with_store_retry("get_shipment", || self.store.shipment(shipment_id))
            .await?
            .ok_or(DispatchError::NotFound)
    }

    /// Best-effort ledger append for a transition that already committed.
    /// A failure here must not retract the ack — the shipment row is durable.
    async fn append_history(
        &self,
        shipment: &Shipment,
        status: ShipmentStatus,
        session: &SessionAuth,
        note: Option<String>,
        lat: Option<f64>,
        lng: Option<f64>,
    ) {
        let insert = StatusHistoryInsert {
            shipment_id: shipment.id,
            status,
            actor_id: session.subject_id,
            note,
            lat,
            lng,
        };
        if let Err(e) = self.ledger.append(insert).await {
            tracing::error!(
                error = %e,
                shipment_id = %shipment.id,
                ?status,
                "failed to append status history"
            );
        }
    }
}

/// Delay before retry `attempt` (0-based): doubling backoff plus jitter.
fn retry_delay(attempt: u32) -> Duration {
    let base = Duration::from_millis(100 * (1u64 << attempt.min(4)));
    let jitter = Duration::from_millis(rand::rng().random_range(0..50));
    base + jitter
}

/// Run a store operation, transparently retrying `StoreUnavailable` a small
/// fixed number of times with backoff. Exhaustion surfaces to the caller.
async fn with_store_retry<T, F, Fut>(op: &'static str, mut f: F) -> Result<T, DispatchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let mut attempt = 0;
    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(StoreError::Unavailable(reason)) => {
                attempt += 1;
                if attempt >= STORE_RETRY_ATTEMPTS {
                    tracing::error!(op, %reason, attempt, "store operation failed, giving up");
                    return Err(DispatchError::StoreUnavailable);
                }
                tracing::warn!(op, %reason, attempt, "store operation failed, retrying");
                tokio::time::sleep(retry_delay(attempt - 1)).await;
            }
        }
    }
}
