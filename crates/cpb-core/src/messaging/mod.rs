//! Transport-neutral messaging: inbound events, outbound port, keyboards.

pub mod port;
pub mod throttled;
pub mod types;
