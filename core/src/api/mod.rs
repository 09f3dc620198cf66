//! Record service collaborators
//!
//! This module provides:
//! - **FightRecord**: the JSON upload payload assembled at duty end
//! - **ApiClient**: multi-endpoint fetch/upload with first-success-wins
//!   racing, usable as the sequencer's `DutyProvider` and `RecordSink`

mod client;
mod error;
mod payload;

pub use client::ApiClient;
pub use error::ApiError;
pub use payload::{FightProgress, FightRecord, PlayerRecord};

use async_trait::async_trait;

use crate::duty::DutyDescriptor;
use crate::engine::{DutyProvider, RecordSink};

#[async_trait]
impl DutyProvider for ApiClient {
    async fn fetch_duty(&self, zone_id: u32) -> Option<DutyDescriptor> {
        ApiClient::fetch_duty(self, zone_id).await
    }
}

#[async_trait]
impl RecordSink for ApiClient {
    async fn upload_fight(&self, record: FightRecord) -> bool {
        ApiClient::upload_fight(self, &record).await
    }
}
