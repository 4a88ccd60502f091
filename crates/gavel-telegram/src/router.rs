use std::{collections::HashMap, sync::Arc};

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, warn};

use gavel_core::{
    config::Config, messaging::port::MessagingPort, store::port::RecordStore,
    workflow::BidWorkflow,
};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub messenger: Arc<TelegramMessenger>,
    pub workflow: Arc<BidWorkflow>,
    pub chat_locks: Arc<ChatLocks>,
}

/// One lightweight task runs per inbound update; these locks serialize the
/// workflow steps of a single conversation without coupling different chats.
#[derive(Default)]
pub struct ChatLocks {
    inner: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
}

impl ChatLocks {
    pub async fn lock_chat(&self, chat_id: i64) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            map.entry(chat_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

pub async fn run_polling(cfg: Arc<Config>, store: Arc<dyn RecordStore>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    if let Ok(me) = bot.get_me().await {
        info!("gavel started: @{}", me.username());
    }
    if cfg.admin_chat_id.is_none() {
        warn!("ADMIN_TELEGRAM_ID is not set, admin notifications and /notify are disabled");
    }

    let messenger = Arc::new(TelegramMessenger::new(bot.clone()));
    let messaging_port: Arc<dyn MessagingPort> = messenger.clone();
    let workflow = Arc::new(BidWorkflow::new(cfg.clone(), store, messaging_port));

    let state = Arc::new(AppState {
        cfg,
        messenger,
        workflow,
        chat_locks: Arc::new(ChatLocks::default()),
    });

    let handler = dptree::entry()
        .branch(Update::filter_callback_query().endpoint(handlers::handle_callback))
        .branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build()
        .dispatch()
        .await;

    Ok(())
}
