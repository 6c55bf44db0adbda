pub mod prelude;

pub mod users;
pub mod verification_tokens;
