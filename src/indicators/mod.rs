pub mod atr;
pub mod bollinger;
pub mod rsi;
pub mod sma;

pub use atr::calculate_atr;
pub use bollinger::{calculate_bollinger, BollingerResult};
pub use rsi::calculate_rsi;
pub use sma::calculate_sma;
