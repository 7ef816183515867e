#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]
#![cfg_attr(
    test,
    allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)
)]

pub mod arbiter;
pub mod auth;
pub mod dispatch;
pub mod entities;
pub mod fanout;
pub mod ledger;
pub mod lifecycle;
pub mod rooms;
pub mod store;
