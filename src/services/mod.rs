//! Business logic services

pub mod auth;
pub mod authorization;
pub mod invitation;
pub mod lifecycle;
pub mod mailer;
pub mod session;
pub mod token;

pub use auth::AuthService;
pub use invitation::{CreatedEmployee, InvitationService};
pub use lifecycle::{Deactivation, LifecycleService};
pub use mailer::{build_mailer, LogMailer, MailError, MailMessage, Mailer, MemoryMailer, SmtpMailer};
pub use session::{SessionManager, SessionTokens};
pub use token::{decode_id, encode_id, ActivationTokenGenerator};
