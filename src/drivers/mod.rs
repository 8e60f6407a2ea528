//! Input-device drivers: state machines plus the platform glue that feeds
//! them edges and timer ticks.

pub mod button;
pub mod encoder;
