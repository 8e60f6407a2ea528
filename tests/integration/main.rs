//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a subsystem against the
//! simulated GPIO/timer platform. All tests run on the host with no real
//! hardware required.

mod encoder_tests;
mod sim_gpio;
