mod bus_interface;
mod bus_real;

pub use bus_interface::*;
pub use bus_real::RealBus;

// Mock implementation, also used by `--dry-run`.
mod bus_mock;
pub use bus_mock::MockBus;
