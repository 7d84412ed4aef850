//! # Domain Models
//!
//! Canonical types shared by the normalizer, the consensus aggregator and
//! the result pipeline.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Symbol`] | Validated trading pair / ticker |
//! | [`Timeframe`] | Analysis horizon key (`1h`, `4h`, ...) |
//! | [`Direction`] | `BULLISH`, `BEARISH` or `NEUTRAL` |
//! | [`ScanResult`] | One symbol's normalized outcome |
//! | [`TimeframeSignal`] | Raw per-timeframe score and direction |
//! | [`RiskLevel`] | Backend risk classification |
//! | [`UtcDateTime`] | UTC timestamp |

mod direction;
mod result;
mod symbol;
mod timeframe;
mod timestamp;

pub use direction::Direction;
pub use result::{RiskLevel, ScanResult, TimeframeSignal};
pub use symbol::Symbol;
pub use timeframe::Timeframe;
pub use timestamp::UtcDateTime;
