//! Authentication primitives.
//!
//! - [`crypto`]: Argon2id password hashing with a server-side pepper
//! - [`token`]: stateless signed access tokens
//! - [`gate`]: role allow-list checks

pub mod crypto;
pub mod gate;
pub mod token;

pub use crypto::{AuthCrypto, AuthCryptoError};
pub use gate::{HasRole, RoleGate};
pub use token::{Claims, IssuedToken, TokenError, TokenIssuer};
