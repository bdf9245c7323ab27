//! The fnrelay functions.
//!
//! Each function implements [`fnrelay_core::Function`] and receives its
//! collaborators (token verifier, content store, fleet registry client, mail
//! transport) explicitly, so tests swap in fakes.

pub mod auth;
pub mod fanout;
pub mod fleet;
pub mod health_check;
pub mod mail;
pub mod registry;
pub mod relay;
pub mod send_email;
pub mod update_servers;
pub mod upload_media;

#[cfg(test)]
pub(crate) mod test_support;

pub use auth::{HttpTokenVerifier, TokenVerifier, Verdict};
pub use fanout::{FanOut, FanOutReport, OversizedReject, UploadResult, MAX_FILE_SIZE};
pub use fleet::{FleetApi, HttpFleetApi, ServerRecord};
pub use health_check::HealthCheck;
pub use mail::{MailError, MailTransport, OutgoingMail, SmtpMailer};
pub use registry::{build_registry, FunctionRegistry};
pub use relay::UploadRelay;
pub use send_email::SendEmail;
pub use update_servers::UpdateServers;
pub use upload_media::UploadMedia;
