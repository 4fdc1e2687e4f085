//! Managed-backend client for LabDesk
//!
//! The external backend provides three services behind one base URL:
//! token verification, a generic table API with filter/order/upsert
//! semantics, and object storage. This crate exposes each as an
//! object-safe trait so the server can run against the production
//! [`SupabaseClient`] or an in-memory fake, and ships the production
//! implementation over `reqwest`.

pub mod error;
pub mod store;
pub mod supabase;

pub use error::*;
pub use store::*;
pub use supabase::*;
