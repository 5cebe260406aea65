//! In-memory store for tests and throwaway runs.

use std::{collections::HashMap, sync::RwLock};

use async_trait::async_trait;

use crate::{
    domain::{ButtonLink, ChannelRef, MediaRef, OperatorId, PostDraft},
    errors::Error,
    store::{ChannelRegistry, DraftStore},
    Result,
};

#[derive(Default)]
pub struct MemoryStore {
    channels: RwLock<HashMap<OperatorId, ChannelRef>>,
    drafts: RwLock<HashMap<OperatorId, PostDraft>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChannelRegistry for MemoryStore {
    async fn set_channel(&self, operator: OperatorId, channel: &ChannelRef) -> Result<()> {
        let mut channels = self
            .channels
            .write()
            .map_err(|e| Error::Storage(e.to_string()))?;
        channels.insert(operator, channel.clone());
        Ok(())
    }

    async fn get_channel(&self, operator: OperatorId) -> Result<Option<ChannelRef>> {
        let channels = self
            .channels
            .read()
            .map_err(|e| Error::Storage(e.to_string()))?;
        Ok(channels.get(&operator).cloned())
    }
}

#[async_trait]
impl DraftStore for MemoryStore {
    async fn replace_draft(
        &self,
        operator: OperatorId,
        text: &str,
        media: Option<&MediaRef>,
        button: Option<&ButtonLink>,
    ) -> Result<()> {
        let draft = PostDraft {
            operator_id: operator,
            text: text.to_string(),
            media: media.cloned(),
            button: button.cloned(),
        };
        let mut drafts = self
            .drafts
            .write()
            .map_err(|e| Error::Storage(e.to_string()))?;
        drafts.insert(operator, draft);
        Ok(())
    }

    async fn get_draft(&self, operator: OperatorId) -> Result<Option<PostDraft>> {
        let drafts = self
            .drafts
            .read()
            .map_err(|e| Error::Storage(e.to_string()))?;
        Ok(drafts.get(&operator).cloned())
    }
}
