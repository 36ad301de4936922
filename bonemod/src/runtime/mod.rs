mod baseline;
mod compose;
mod controller;

pub use baseline::BaselineState;
pub use controller::*;
