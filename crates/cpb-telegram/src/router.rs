use std::{collections::HashMap, sync::Arc};

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use tokio::sync::{Mutex, OwnedMutexGuard};

use cpb_core::{
    audit::AuditLogger,
    config::Config,
    dialogue::Composer,
    domain::OperatorId,
    messaging::{port::MessagingPort, throttled::ThrottledMessenger},
    store::{ChannelRegistry, DraftStore},
};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub composer: Arc<Composer>,
    pub operator_locks: Arc<OperatorLocks>,
}

/// One async mutex per operator: each event runs to completion before the next
/// event of the same operator starts. Different operators never wait on each other.
#[derive(Default)]
pub struct OperatorLocks {
    inner: Mutex<HashMap<OperatorId, Arc<Mutex<()>>>>,
}

impl OperatorLocks {
    pub async fn lock_operator(&self, operator: OperatorId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            map.entry(operator)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    /// Forget the operator's mutex once nobody holds or waits on it.
    /// Call after dropping the guard.
    pub async fn release(&self, operator: OperatorId) {
        let mut map = self.inner.lock().await;
        if map
            .get(&operator)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            map.remove(&operator);
        }
    }

    #[cfg(test)]
    async fn tracked(&self) -> usize {
        self.inner.lock().await.len()
    }
}

pub async fn run_polling<S>(cfg: Arc<Config>, store: Arc<S>) -> anyhow::Result<()>
where
    S: ChannelRegistry + DraftStore + 'static,
{
    let bot = Bot::new(cfg.bot_token.clone());

    match bot.get_me().await {
        Ok(me) => tracing::info!(username = %me.username(), "channel post bot started"),
        Err(e) => tracing::warn!(error = %e, "get_me failed; continuing"),
    }
    tracing::info!(db_path = %cfg.db_path.display(), "using database");

    // Prompt, preview and confirm menu go out back to back; keep them under
    // Telegram's per-chat flood limit. The adapter still retries once on RetryAfter.
    let raw_messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let messenger: Arc<dyn MessagingPort> =
        Arc::new(ThrottledMessenger::new(raw_messenger, cfg.throttle));

    let audit = AuditLogger::new(cfg.audit_log_path.clone(), cfg.audit_log_json);
    let channels: Arc<dyn ChannelRegistry> = store.clone();
    let drafts: Arc<dyn DraftStore> = store;
    let composer = Arc::new(Composer::new(channels, drafts, messenger, audit));

    let state = Arc::new(AppState {
        composer,
        operator_locks: Arc::new(OperatorLocks::default()),
    });

    let handler = dptree::entry()
        .branch(Update::filter_callback_query().endpoint(handlers::handle_callback))
        .branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    tracing::info!("dispatcher stopped");
    Ok(())
}
