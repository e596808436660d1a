#![doc = include_str!("../README.md")]

mod error;
mod fee_recipient;
pub mod keygen;
pub mod metrics;
pub mod orchestrator;
pub mod store;
mod types;

pub use crate::error::*;
pub use crate::fee_recipient::*;
pub use crate::keygen::{KeyGenerator, RandomKeyGenerator};
pub use crate::metrics::{Metrics, NoopMetrics, TaskOutcome};
pub use crate::orchestrator::{CREATION_ACK, Orchestrator};
pub use crate::store::{Store, StoreError};
pub use crate::types::*;
