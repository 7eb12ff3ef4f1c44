//! Core traits for cycle-accurate NES emulation.
//!
//! Every component steps in whole clock cycles and talks to the rest of the
//! machine through these seams. There is no background work and no hidden
//! state: one call, one cycle, at most one bus transaction.

mod bus;
mod pixel;

pub use bus::{Bus, SimpleBus};
pub use pixel::{NullSink, PixelSink};
