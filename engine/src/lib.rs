//! # Bough Engine
//!
//! Order-independent reconciliation of a bookmark folder tree during a sync
//! session.
//!
//! A remote snapshot of the tree arrives as an unordered stream of records.
//! Children may show up before their folders, folders may name children that
//! never arrive, and both sides may have moved or reordered things since the
//! last sync. This crate keeps the local store in a sane state while records
//! stream in and performs one final merge of child orders once the stream is
//! exhausted.
//!
//! ## Design Principles
//!
//! - **Store behind a trait**: all persistence goes through [`BookmarkStore`]
//! - **Flat bookkeeping**: the session keeps GUID-keyed maps, never an
//!   in-memory object graph; the store is the only place real edges live
//! - **Recoverable by default**: a bad record or a failing folder never
//!   aborts the rest of the session
//! - **Self-healing**: nothing survives a session except the store, so an
//!   abandoned session is simply rebuilt by the next one
//!
//! ## Core Concepts
//!
//! ### Identifier Index
//!
//! [`IdIndex`] maps GUIDs to local row ids and back. It is seeded from the
//! store's folders when a session begins.
//!
//! ### Child Order
//!
//! [`resolve_child_order`] derives a folder's ordering from raw row positions
//! and rewrites those positions only when they are not already a clean
//! `0..N-1` sequence.
//!
//! ### Orphans
//!
//! [`OrphanTracker`] remembers records whose parent folder has not arrived
//! yet. They are parked in the fallback folder and moved once the parent
//! shows up.
//!
//! ### Sessions
//!
//! [`Session`] sequences everything: `begin`, any number of `process` calls,
//! then `store_done`, which finalizes child orders on the tokio blocking pool.
//!
//! ## Quick Start
//!
//! ```rust
//! use bough_engine::{MemoryStore, RemoteRecord, Session, SessionConfig};
//! use std::sync::Arc;
//!
//! let store = Arc::new(MemoryStore::new());
//! let mut session = Session::new(store.clone(), SessionConfig::default());
//! session.begin().unwrap();
//!
//! // The bookmark arrives before its folder.
//! session
//!     .process(RemoteRecord::bookmark("bmk-1", "folder-1").with_title("Rust"))
//!     .unwrap();
//! assert_eq!(session.pending_orphan_count(), 1);
//!
//! session
//!     .process(RemoteRecord::folder("folder-1", "menu", ["bmk-1"]))
//!     .unwrap();
//! assert_eq!(session.pending_orphan_count(), 0);
//!
//! let folder = store.row("folder-1").unwrap();
//! assert_eq!(store.row("bmk-1").unwrap().parent_id, folder.id);
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod finalize;
pub mod index;
pub mod order;
pub mod orphans;
pub mod reconcile;
pub mod record;
pub mod roots;
pub mod session;
pub mod snapshot;
pub mod store;

// Re-export main types at crate root
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::SessionConfig;
pub use error::Error;
pub use finalize::{merge_child_orders, FinalizeHandle, FinishReport, FolderFailure};
pub use index::IdIndex;
pub use order::{order_children, resolve_child_order, ChildOrder, UNORDERED_POSITION};
pub use orphans::{reparent_orphans, OrphanTracker};
pub use reconcile::{reconcile_records, FieldReconciler, LastWriteWins, Rejection};
pub use record::{BookmarkRecord, ChildRow, LocalRow, Placement, RecordKind, RemoteRecord};
pub use roots::{SpecialRoot, SPECIAL_ROOTS, SUPER_ROOT_ID};
pub use session::{ProcessOutcome, Session, SessionState};
pub use snapshot::{StoreSnapshot, SNAPSHOT_FORMAT_VERSION};
pub use store::{BookmarkStore, MemoryStore, RootSeed};

/// Type aliases for clarity
pub type Guid = String;
pub type LocalId = i64;
pub type Position = i64;
pub type Timestamp = i64;
