//! Login payloads, token extraction, and the session slot.

mod credentials;
mod session;
mod token;

pub use credentials::Credentials;
pub use session::Session;
pub use token::extract_token;
