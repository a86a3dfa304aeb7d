//! Lock primitives shared between cooperative threads.
//!
//! [`try_claim`] is the only code that touches a lock word atomically;
//! [`ReentrantLock`] layers ownership and nesting on top of it.

pub mod exclusive;
pub mod lock;

pub use exclusive::try_claim;
pub use lock::{LockState, ReentrantLock};
