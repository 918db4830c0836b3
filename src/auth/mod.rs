//! Authentication: password hashing, JWT pair issuance, register/login/refresh handlers.

mod handlers;
mod jwt;
mod password;

pub use handlers::{login, refresh, register, LoginRequest, RefreshRequest};
pub use jwt::{Claims, JwtSecret, TokenIssuer, TokenPair, TokenType};
pub use password::{Argon2Hasher, PasswordHasher};
