//! # certmint store
//!
//! Persistence for issuers, templates and certificates behind the
//! [`Store`] trait, with SQLite and in-memory implementations.
//!
//! ## Key Types
//!
//! - [`Store`] - The async trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`InsertResult`] - Result of inserting a certificate
//!
//! ## Usage
//!
//! ```rust,no_run
//! use certmint_core::TemplateDraft;
//! use certmint_store::{SqliteStore, Store};
//!
//! async fn example() -> certmint_store::Result<()> {
//!     let store = SqliteStore::open("certificados.db")?;
//!
//!     let issuer = store.insert_issuer("GruPy-SP").await?;
//!     let draft = TemplateDraft::new("participação", issuer.id, "<p>{{titular}}</p>")
//!         .map_err(|e| certmint_store::StoreError::InvalidData(e.to_string()))?;
//!     let template = store.insert_template(&draft).await?;
//!     println!("stored {}", template.id);
//!     Ok(())
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Unique codes**: A taken code is reported as `CodeCollision`, never
//!   overwritten
//! - **Fields**: Stored as canonical CBOR and re-validated on read

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{InsertResult, Store};
