mod auth;
mod checkout;
mod config;
mod db;
mod gates;
mod identity;
mod optimistic;
mod playback;
mod provider;
mod storage;
mod studio;
mod util;
mod view;

pub mod events;

#[cfg(test)]
mod test_util;

use std::sync::Arc;

use crossbeam::channel::unbounded;
use events::{EventReceiver, EventSender, StudioEvent};

pub use auth::*;
pub use checkout::*;
pub use config::*;
pub use db::*;
pub use gates::*;
pub use identity::*;
pub use optimistic::*;
pub use playback::*;
pub use provider::*;
pub use storage::*;
pub use studio::*;
pub use view::*;

/// The studio, facilitating signup, authentication, and everything students and teachers do.
pub struct Studio {
    context: StudioContext,
    event_receiver: EventReceiver,

    pub database: ArcedDatabase,
    pub auth: Auth,
    pub students: Students,
    pub tracks: Tracks,
    pub lessons: Lessons,
    pub schedule: Schedule,
    pub recitals: Recitals,
    pub teachers: Teachers,
    pub inquiries: Inquiries,
    pub checkout: Checkout,
}

/// A type passed to the various components of the studio, to access collaborators and emit events.
#[derive(Clone)]
pub struct StudioContext {
    pub config: Arc<Config>,
    pub database: ArcedDatabase,
    pub provider: ArcedProvider,
    pub storage: ArcedStorage,
    pub bridge: IdentityBridge,

    event_sender: EventSender,
}

impl StudioContext {
    pub fn emit(&self, event: StudioEvent) {
        // Nobody listening is fine
        let _ = self.event_sender.send(event);
    }
}

impl Studio {
    pub fn new(
        config: Config,
        database: ArcedDatabase,
        provider: ArcedProvider,
        storage: ArcedStorage,
    ) -> Self {
        let (event_sender, event_receiver) = unbounded();

        let context = StudioContext {
            bridge: IdentityBridge::new(config.student_email_domain.clone()),
            config: Arc::new(config),
            database: database.clone(),
            provider,
            storage,
            event_sender,
        };

        Self {
            auth: Auth::new(&context),
            students: Students::new(&context),
            tracks: Tracks::new(&context),
            lessons: Lessons::new(&context),
            schedule: Schedule::new(&context),
            recitals: Recitals::new(&context),
            teachers: Teachers::new(&context),
            inquiries: Inquiries::new(&context),
            checkout: Checkout::new(&context),
            database,
            context,
            event_receiver,
        }
    }

    /// Creates a studio using the built-in password provider over the same database
    pub fn with_password_provider(
        config: Config,
        database: ArcedDatabase,
        storage: ArcedStorage,
    ) -> Self {
        let provider = Arc::new(PasswordProvider::new(
            &database,
            config.session_duration_in_days,
        ));

        Self::new(config, database, provider, storage)
    }

    pub fn provider(&self) -> &ArcedProvider {
        &self.context.provider
    }

    pub fn config(&self) -> &Config {
        &self.context.config
    }

    /// Returns a receiver for studio events
    pub fn events(&self) -> EventReceiver {
        self.event_receiver.clone()
    }
}
