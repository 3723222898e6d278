//! # Undertow
//!
//! A small effect algebra for keeping business logic pure.
//!
//! ## Philosophy
//!
//! Logic returns a *description* of work instead of doing it:
//! - **Outcomes** = [`Effect::Success`] and [`Effect::Failure`], computed purely
//! - **Commands** = [`Effect::Command`], an operation that has not run yet,
//!   paired with the continuation that decides what its result means
//!
//! Only the [`Interpreter`] runs operations. Everything before it, including
//! branching on the result of an async call, is plain data that a unit test
//! can inspect and step through without mocks.
//!
//! ## Quick Example
//!
//! ```rust
//! use undertow::{pipeline, run_effect, Effect};
//!
//! fn validate(name: String) -> Effect<String, String> {
//!     if name.is_empty() {
//!         Effect::failure("name is required".to_string())
//!     } else {
//!         Effect::success(name)
//!     }
//! }
//!
//! fn greet(name: String) -> Effect<String, String> {
//!     Effect::command(
//!         "load_title",
//!         || async { Ok::<_, String>("Dr.") },
//!         move |title: &'static str| Effect::success(format!("Hello, {} {}", title, name)),
//!     )
//! }
//!
//! let flow = pipeline![validate, greet];
//!
//! // Pure inspection: no operation has run.
//! assert_eq!(flow.run(String::new()), Effect::failure("name is required".to_string()));
//! assert_eq!(flow.run("Ada".into()).label().map(|l| l.as_str()), Some("load_title"));
//!
//! // The shell runs it.
//! # tokio_test::block_on(async {
//! assert_eq!(run_effect(flow.run("Ada".into())).await, Ok("Hello, Dr. Ada".to_string()));
//! # });
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod effect;
pub mod interpreter;
pub mod pipeline;
pub mod testing;

// Re-exports
pub use effect::{chain, BoxFuture, Command, Effect, Label, ResumeError};
pub use interpreter::{run_effect, run_effect_blocking, Fault, Interpreter, Phase, Trace};
pub use pipeline::Pipeline;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::effect::{chain, Command, Effect, Label, ResumeError};
    pub use crate::interpreter::{
        run_effect, run_effect_blocking, Fault, Interpreter, Phase, Trace,
    };
    pub use crate::pipeline;
    pub use crate::pipeline::Pipeline;
}
