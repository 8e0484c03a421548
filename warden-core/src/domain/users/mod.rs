//! User accounts: the persisted record, its role, and the request and
//! response shapes exchanged with clients.

pub mod requests;
pub mod role;
pub mod user;
pub mod validation;

pub use requests::{
    AdminGreeting, AuthToken, CurrentUser, LoginRequest, PasswordChange,
    RegisterRequest,
};
pub use role::{Role, UnknownRole};
pub use user::{User, UserPatch, UserProfile};
pub use validation::ValidationError;
