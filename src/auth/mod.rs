//! Authentication module
//!
//! Bearer tokens only establish *who* is calling. *What* they may do is
//! decided by the registry's policy gateway.

mod jwt;
mod middleware;

pub use jwt::{create_token, decode_token, Claims, TokenResponse, DEV_TOKEN_EXPIRATION_MINUTES};
pub use middleware::auth_middleware;

use crate::registry::Caller;

impl Claims {
    /// The registry identity carried by this token
    pub fn caller(&self) -> Caller {
        Caller::new(self.sub.clone())
    }
}
