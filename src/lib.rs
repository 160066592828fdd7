#![deny(missing_docs)]
//! A single-file, embeddable key/value store.
//!
//! Values are durable through an append-only on-disk log; a
//! [`std::collections`]-free, open-addressed hash index kept in memory maps
//! every live key to the byte offset of its most recent record. `delete` is
//! implemented as a tombstone record rather than an in-place rewrite:
//! nothing already written to the log is ever rewritten or removed.
//!
//! ```no_run
//! use filekv::Store;
//!
//! # fn main() -> filekv::Result<()> {
//! let mut store = Store::create("example.db")?;
//! store.put(b"key", b"value")?;
//! assert_eq!(store.get(b"key")?, Some(b"value".to_vec()));
//! store.close();
//! # Ok(())
//! # }
//! ```

mod error;
mod index;
mod logio;
mod store;

pub use error::{Result, StoreError};
pub use store::Store;
