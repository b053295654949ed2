//! Database layer for the examiner service.
//!
//! Provides SQLite connection pooling (via `r2d2`), WAL-mode initialization
//! and embedded SQL migrations. Candidate history and the operator event log
//! are both created through versioned migrations managed by this crate.
//!
//! # Design decisions
//!
//! - **SQLite with WAL mode**: no external database process. WAL allows
//!   concurrent readers with a single writer; result appends for the same
//!   candidate are serialised by SQLite's write lock plus the busy timeout.
//! - **`r2d2` connection pool**: bounded connection reuse shared by request
//!   handlers and the background session sweeper.
//! - **Embedded migrations**: SQL files are compiled into the binary via
//!   `include_str!`, so the schema cannot drift from the code using it.

mod migrations;
mod pool;

pub use migrations::{run_migrations, MigrationError};
pub use pool::{create_pool, DbPool, DbRuntimeSettings, PoolError};
