//! Persistence contracts for linked channels and drafts.
//!
//! Both are keyed by operator id; no operation reads or writes another
//! operator's rows.

use async_trait::async_trait;

use crate::{
    domain::{ButtonLink, ChannelRef, MediaRef, OperatorId, PostDraft},
    Result,
};

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// One linked broadcast channel per operator.
#[async_trait]
pub trait ChannelRegistry: Send + Sync {
    /// Upsert: a later call overwrites the previous link.
    async fn set_channel(&self, operator: OperatorId, channel: &ChannelRef) -> Result<()>;

    async fn get_channel(&self, operator: OperatorId) -> Result<Option<ChannelRef>>;
}

/// Exactly one draft row per operator.
#[async_trait]
pub trait DraftStore: Send + Sync {
    /// Deletes any existing draft of the operator and stores the new one atomically.
    async fn replace_draft(
        &self,
        operator: OperatorId,
        text: &str,
        media: Option<&MediaRef>,
        button: Option<&ButtonLink>,
    ) -> Result<()>;

    async fn get_draft(&self, operator: OperatorId) -> Result<Option<PostDraft>>;
}
