pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{AuthError, AuthService, Registration};
pub use auth_service_impl::SeaOrmAuthService;

pub mod ids;
pub use ids::{IdKind, IdRegistry};

pub mod mailer;
pub use mailer::{LogMailer, MailError, Mailer, OutgoingMail, SmtpMailer};

pub mod reports;
pub use reports::{ReportCase, ReportCaseError, ReportCases};

pub mod reset_token;
pub use reset_token::ResetTokenSigner;
