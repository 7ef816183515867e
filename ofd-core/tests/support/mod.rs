//! Shared fixtures for coordinator integration tests.

use std::sync::Arc;

use ofd_core::auth::SessionAuth;
use ofd_core::dispatch::Dispatcher;
use ofd_core::entities::Role;
use ofd_core::rooms::RoomTopologyManager;
use ofd_core::store::MemoryRecordStore;
use ofd_sdk::objects::shipment::{CreateShipmentRequest, Priority, RoutePoint, VehicleType};
use rust_decimal::Decimal;
use uuid::Uuid;

pub struct Harness {
    pub dispatcher: Arc<Dispatcher>,
    pub store: Arc<MemoryRecordStore>,
    pub rooms: Arc<RoomTopologyManager>,
}

pub fn harness() -> Harness {
    let store = Arc::new(MemoryRecordStore::new());
    let rooms = Arc::new(RoomTopologyManager::new());
    let dispatcher = Arc::new(Dispatcher::new(store.clone(), rooms.clone()));
    Harness {
        dispatcher,
        store,
        rooms,
    }
}

pub fn session(role: Role) -> SessionAuth {
    SessionAuth {
        session_id: Uuid::new_v4(),
        subject_id: Uuid::new_v4(),
        role,
    }
}

pub fn tashkent_to_samarkand() -> CreateShipmentRequest {
    CreateShipmentRequest {
        pickup: RoutePoint {
            street: "Amir Temur 1".into(),
            city: "Tashkent".into(),
            region: "Tashkent".into(),
            lat: 41.3111,
            lng: 69.2401,
        },
        dropoff: RoutePoint {
            street: "Registan 1".into(),
            city: "Samarkand".into(),
            region: "Samarkand".into(),
            lat: 39.6542,
            lng: 66.9597,
        },
        weight_kg: Decimal::new(1200, 0),
        volume_m3: Decimal::new(8, 0),
        vehicle_type: VehicleType::Tent,
        description: "Textile rolls".into(),
        price: Decimal::new(450, 0),
        currency: "USD".into(),
        priority: Priority::Medium,
    }
}
