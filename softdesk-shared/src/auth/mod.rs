//! Authentication and authorization
//!
//! # Modules
//!
//! - [`password`]: Argon2id hashing and strength rules
//! - [`jwt`]: access and refresh token issuance and validation
//! - [`middleware`]: bearer-token authentication against the store
//! - [`authorization`]: the policy engine deciding every access
//!
//! # Example
//!
//! ```no_run
//! use softdesk_shared::auth::password::{hash_password, verify_password};
//! use softdesk_shared::auth::jwt::{create_token, Claims, TokenType};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let hash = hash_password("Str0ng!pass")?;
//! assert!(verify_password("Str0ng!pass", &hash)?);
//!
//! let token = create_token(&Claims::new(1, TokenType::Access), "secret-of-at-least-32-characters")?;
//! # Ok(())
//! # }
//! ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
