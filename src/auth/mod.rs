mod helpers;
mod middleware;
mod token;

pub use middleware::{AuthError, MaybePrincipal, RequireAdmin, RequirePrincipal};
pub use token::{generate_token, parse_token, token_digest};
