//! Position lifecycle: types, pure evaluation, persistence and history

pub mod history;
pub mod lifecycle;
pub mod store;
pub mod types;

pub use history::{trade_metrics, HistoryEvent, HistoryLog, TradeMetrics};
pub use lifecycle::{evaluate, open_position, stop_distance, Evaluation, RiskParams};
pub use store::PositionStore;
pub use types::{Direction, LifecycleEvent, LifecycleEventKind, LifecycleStatus, Position};
