//! # Repository Module
//!
//! Database repository implementations for the TilePOS ledger.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  LedgerEngine / caller                                          │
//! │       │                                                         │
//! │       │  db.invoices().get(&id)                                 │
//! │       ▼                                                         │
//! │  Repository  ── SQL ──►  SQLite                                 │
//! │                                                                 │
//! │  Every repository method exists in two forms:                   │
//! │    get(&self, ..)        pool-backed, acquires a connection     │
//! │    get_tx(conn, ..)      runs on a caller-supplied connection,  │
//! │                          used inside engine transactions        │
//! │                                                                 │
//! │  The engine NEVER mixes pool access into an open transaction:   │
//! │  with an in-memory single-connection pool that would deadlock.  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`item::ItemRepository`] - item CRUD
//! - [`lot::LotRepository`] - purchase lot recording and listing
//! - [`invoice::InvoiceRepository`] - invoice headers, sale lines, returns
//! - [`stock::StockRepository`] - derived stock positions (never cached)
//! - [`commission::CommissionRepository`] - commission ledger upsert/status

pub mod commission;
pub mod invoice;
pub mod item;
pub mod lot;
pub mod stock;
