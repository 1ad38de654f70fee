pub mod accounts;
pub mod credentials;
pub mod events;
pub mod mailer;
pub mod messaging;
pub mod registration;
pub mod verification;
