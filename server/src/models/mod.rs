pub mod account;
pub mod event;
pub mod message;
pub mod registration;

pub use account::{Account, AccountKind};
pub use event::{Event, EventSummary};
pub use message::{Message, MessageType};
pub use registration::{EventRegistration, Registrant, RegistrationStatus, RegistrationWithEvent};

/// A stored enum column held a value this build does not know about.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown variant: {0}")]
pub struct UnknownVariant(pub String);
