//! Shutdown lifecycle
//!
//! Hosts that want a final flush on exit register their atoms with a
//! [`ShutdownFlush`] they own and call it from their own shutdown path.
//! Nothing is registered globally or implicitly.
//!
//! Flushing at shutdown is advisory: a hanging adapter, a killed process or a
//! second signal can all cut it short. Callers needing durability use
//! `set_and_flush` at the point of change.

mod shutdown;

pub use shutdown::{Flushable, ShutdownFlush, ShutdownReport};
