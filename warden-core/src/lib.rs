//! # Warden Core
//!
//! Core library for the Warden account service: credential hashing, access
//! token issuance, role gates, and the account operations built on top of
//! them.
//!
//! ## Overview
//!
//! - **Credential hashing**: Argon2id with a random salt and a server-side pepper
//! - **Access tokens**: stateless HS256 JWTs carrying subject id and role
//! - **Role gates**: per-endpoint allow-lists of [`Role`](domain::users::Role)s
//! - **Account operations**: register, login, profile read/update, password change
//! - **Persistence**: a unit-of-work port with PostgreSQL and in-memory adapters
//!
//! ## Feature Flags
//!
//! - `database`: Enables the PostgreSQL adapter (SQLx) and embedded migrations
//! - `pg-tests`: Runs the adapter tests that need a live database
//!
//! ## Examples
//!
//! ```no_run
//! use std::{sync::Arc, time::Duration};
//! use warden_core::{
//!     application::AccountService,
//!     auth::{AuthCrypto, TokenIssuer},
//!     database::InMemoryUserStore,
//!     domain::users::{LoginRequest, RegisterRequest},
//! };
//!
//! async fn register_and_login() -> Result<(), Box<dyn std::error::Error>> {
//!     let accounts = AccountService::new(
//!         Arc::new(InMemoryUserStore::new()),
//!         Arc::new(AuthCrypto::new("pepper")?),
//!         Arc::new(TokenIssuer::new("signing-key", Duration::from_secs(1800))?),
//!     );
//!
//!     accounts
//!         .register(RegisterRequest {
//!             fullname: "Alice".to_string(),
//!             email: "alice@example.com".to_string(),
//!             password: "secure_password".to_string(),
//!             avatar_url: None,
//!             phone: None,
//!             position: None,
//!         })
//!         .await?;
//!
//!     let token = accounts
//!         .login(LoginRequest {
//!             email: "alice@example.com".to_string(),
//!             password: "secure_password".to_string(),
//!         })
//!         .await?;
//!     println!("issued token valid for {}s", token.expires_in);
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

/// Account operations orchestrating hashing, tokens, and persistence
pub mod application;

/// Password hashing, access tokens, and role gates
pub mod auth;

/// Persistence ports and adapters
pub mod database;

/// Domain types
pub mod domain;

/// Error types
pub mod error;

pub use error::{AccountError, Result, StoreError};

#[cfg(feature = "database")]
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
