//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that drives the full [`AccessService`]
//! loop against mock adapters.  All tests run on the host (x86_64) with no
//! real hardware required.
//!
//! [`AccessService`]: keyguard::app::service::AccessService

mod access_flow_tests;
mod lockout_tests;
mod mock_hw;
mod provisioning_tests;
