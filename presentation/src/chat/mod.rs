//! Interactive and one-shot sessions
//!
//! Both own a [`SessionController`](visualizer_application::SessionController)
//! and apply its stream updates on their own task.

mod one_shot;
mod repl;

pub use one_shot::{OneShot, OneShotError};
pub use repl::ChatRepl;
