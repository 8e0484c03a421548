pub mod middleware;
pub mod role_gate;

pub use middleware::auth_middleware;
pub use role_gate::require_roles;
