//! Task state machine and transition application.

mod machine;
mod transitions;

pub use machine::TaskStatus;
pub use transitions::TransitionEngine;
