//! # tilepos-db: Database Layer for the TilePOS Ledger Engine
//!
//! SQLite persistence (sqlx, async) plus the [`engine::LedgerEngine`]
//! service that drives every invoice mutation through one transaction
//! ending in a totals recompute and a commission ledger sync.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    TilePOS Ledger Data Flow                     │
//! │                                                                 │
//! │  Caller (CRUD page, report, test)                               │
//! │       │                                                         │
//! │       ▼                                                         │
//! │  ┌───────────────────────────────────────────────────────────┐  │
//! │  │                 tilepos-db (THIS CRATE)                   │  │
//! │  │                                                           │  │
//! │  │   ┌──────────────┐   ┌──────────────┐   ┌─────────────┐   │  │
//! │  │   │ LedgerEngine │──►│ Repositories │   │ Migrations  │   │  │
//! │  │   │ (engine.rs)  │   │ (item, lot,  │   │ (embedded)  │   │  │
//! │  │   │ transactions │   │  invoice,    │   │ 001_init    │   │  │
//! │  │   │ + item locks │   │  stock, ...) │   │             │   │  │
//! │  │   └──────┬───────┘   └──────┬───────┘   └─────────────┘   │  │
//! │  │          │    tilepos-core  │                             │  │
//! │  │          ▼    (pure math)   ▼                             │  │
//! │  └───────────────────────────────────────────────────────────┘  │
//! │       │                                                         │
//! │       ▼                                                         │
//! │  SQLite database (WAL mode)                                     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tilepos_db::{Database, DbConfig, LedgerEngine};
//! use tilepos_core::EngineConfig;
//!
//! let db = Database::new(DbConfig::new("path/to/ledger.db")).await?;
//! let engine = LedgerEngine::new(db, EngineConfig::default());
//!
//! let invoice = engine.create_invoice(new_invoice).await?;
//! let (line, warning) = engine.add_line(&invoice.id, line_input).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod engine;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use engine::{
    LedgerEngine, LineEdit, LineInput, LotUpdate, NewInvoice, NewItem, NewLot, NewReturn,
};
pub use error::{DbError, DbResult, EngineError, EngineResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::commission::CommissionRepository;
pub use repository::invoice::InvoiceRepository;
pub use repository::item::ItemRepository;
pub use repository::lot::LotRepository;
pub use repository::stock::StockRepository;
