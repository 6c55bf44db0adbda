pub use super::users::Entity as Users;
pub use super::verification_tokens::Entity as VerificationTokens;
