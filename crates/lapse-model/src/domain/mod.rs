mod delay_status;
pub use delay_status::DelayStatus;

mod delay_task;
pub use delay_task::DelayTask;

mod result_sequence;
pub use result_sequence::ResultSequence;

/// Position of an operation in launch order (0-based).
pub type LaunchIndex = usize;

/// Unit-less delay value.
///
/// The runtime scales it by a configured time unit before sleeping.
pub type Delay = f64;
