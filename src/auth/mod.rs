/// Authentication module
///
/// Token issuance and verification, the refresh-token whitelist, session
/// rotation and revocation, and the background retention sweep.

mod claims;
pub mod cookie;
mod directory;
mod identity;
mod jwt;
mod password;
mod refresh_token;
mod session;
mod sweeper;

pub use claims::{Claims, Role, TokenKind};
pub use directory::{InMemoryUserDirectory, PgUserDirectory, UserDirectory, UserRecord};
pub use identity::AuthenticatedIdentity;
pub use jwt::{TokenCodec, MIN_SECRET_LENGTH};
pub use password::{hash_password, verify_password, verify_password_without_account};
pub use refresh_token::{InMemoryRefreshStore, PgRefreshStore, RefreshRecord, RefreshStore};
pub use session::{SessionManager, TokenPair};
pub use sweeper::{RetentionSweeper, DEFAULT_RETENTION_DAYS};
