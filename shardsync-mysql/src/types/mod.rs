//! Qualified table identities.

mod table;

pub use table::{TableIdentError, TableName};
