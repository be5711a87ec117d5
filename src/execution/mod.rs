// Decision-path state: price history and the position state machine
pub mod position_state;
pub mod price_series;

pub use position_state::{profit_percent, PositionStateMachine, Transition};
pub use price_series::PriceSeries;
