/// Middleware module
///
/// The auth boundary and the allow-list it consults.

mod jwt_middleware;
mod public_routes;

pub use jwt_middleware::AuthBoundary;
pub use public_routes::{Access, PublicRoutes};
