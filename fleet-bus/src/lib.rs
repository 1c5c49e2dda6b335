mod bus;
mod router;
pub mod subjects;

pub use bus::{Bus, NatsBus};
pub use router::{FanOutResult, fan_out_operation};
