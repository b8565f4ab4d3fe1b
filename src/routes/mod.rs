mod auth;
mod health_check;

pub use auth::{
    exchange, federated_login_success, login, logout, me, refresh, revoke_sessions,
    AuthResponse, LoginRequest, RefreshRequest,
};
pub use health_check::health_check;
