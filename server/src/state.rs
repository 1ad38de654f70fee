use std::sync::Arc;

use uuid::Uuid;

use crate::config::AdminAuth;
use crate::services::credentials::Credentials;
use crate::services::mailer::Mailer;

/// Shared by every handler. Cheap to clone.
#[derive(Clone)]
pub struct AppState<S> {
    pub store: S,
    pub mailer: Mailer,
    pub credentials: Arc<Credentials>,
    /// Sender of admin messages and default creator of events.
    pub system_account: Uuid,
    pub admin_auth: AdminAuth,
}

impl<S> AppState<S> {
    pub fn new(
        store: S,
        mailer: Mailer,
        credentials: Credentials,
        system_account: Uuid,
        admin_auth: AdminAuth,
    ) -> Self {
        Self {
            store,
            mailer,
            credentials: Arc::new(credentials),
            system_account,
            admin_auth,
        }
    }
}
