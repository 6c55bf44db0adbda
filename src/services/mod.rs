pub mod notifier;
pub use notifier::{EmailMessage, Mailer, Notifier};

pub mod verification;
pub use verification::VerificationService;

pub mod jwt;
pub use jwt::{Claims, JwtService};

pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{AuthError, AuthService, LoginResult, SignupOutcome, UserInfo};
pub use auth_service_impl::SeaOrmAuthService;
