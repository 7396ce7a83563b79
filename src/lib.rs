pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod pricesource;
pub mod service;
pub mod sweeper;

pub use config::Config;
pub use db::{init_db, Repository};
pub use domain::{
    BetDirection, BetOutcome, BetStatus, Decimal, OrderStyle, Position, PositionDirection,
    PositionView, Symbol, TimeMs, TradeKind, TradeRecord, UserId,
};
pub use error::{AppError, EngineError};
pub use ledger::BalanceLedger;
pub use pricesource::{HttpPriceSource, MockPriceSource, PriceSource};
pub use service::TradingService;
pub use sweeper::SettlementSweeper;
