//! # Rookery Storage
//!
//! Key lookup across every nest a topology table knows about.
//!
//! Each nest answers `storage` requests from its own [`LocalStore`]. A nest
//! looking for a key checks its own store first, then asks the other known
//! nests one at a time in random order, stopping at the first one that has
//! the key.
//!
//! [`LocalStore`]: rookery_core::LocalStore
//!
//! ## Example
//!
//! ```rust,ignore
//! use rookery_node::Network;
//!
//! let network = Network::builder()
//!     .edges([("A", "B"), ("B", "C")])
//!     .store("C", Arc::new(MemoryStore::with_entries([("seeds", "under the log")])))
//!     .build()?;
//! rookery_routing::register(network.registry());
//! rookery_storage::register(network.registry());
//!
//! rookery_routing::start_topology(&network);
//! rookery_routing::wait_for_topology(&network, Duration::from_secs(2)).await?;
//!
//! let found = rookery_storage::find_in_storage(network.nest("A")?, "seeds").await?;
//! ```

mod lookup;

pub use lookup::{StorageHandler, candidates, find_in_storage, register};
