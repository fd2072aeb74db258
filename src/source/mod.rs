//! External capabilities the collectors consume
//!
//! Command execution and the wall clock sit behind small traits so collectors
//! can be driven by scripted fakes in tests.

pub mod clock;
pub mod command;

pub use clock::{Clock, FixedClock, SystemClock};
pub use command::{CommandError, CommandOutput, CommandRunner, TokioCommandRunner};
