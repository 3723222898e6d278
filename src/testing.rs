//! Testing utilities for code that returns effects.
//!
//! Flows built on [`Effect`](crate::Effect) are tested as data: build the
//! effect, check which command comes next, feed that command a made-up
//! result with [`Effect::resume`](crate::Effect::resume), and repeat. This
//! module adds assertion macros for those checks and a [`CallCounter`] spy for
//! proving that an operation or step was never invoked.
//!
//! # Examples
//!
//! ```rust
//! use undertow::testing::CallCounter;
//! use undertow::{assert_command, assert_failure, assert_success, Effect};
//!
//! fn lookup(counter: &CallCounter, id: u32) -> Effect<String, String> {
//!     let counter = counter.clone();
//!     Effect::command(
//!         "lookup",
//!         move || {
//!             counter.hit();
//!             async move { Ok::<Option<String>, String>(None) }
//!         },
//!         move |found: Option<String>| {
//!             Effect::from_option(found, || format!("no user {}", id))
//!         },
//!     )
//! }
//!
//! let counter = CallCounter::new();
//! let effect = lookup(&counter, 7);
//! assert_command!(effect, "lookup");
//!
//! let missing = lookup(&counter, 7).resume(None::<String>).unwrap();
//! assert_failure!(missing, "no user 7".to_string());
//!
//! let found = lookup(&counter, 7).resume(Some("ada".to_string())).unwrap();
//! assert_success!(found, "ada".to_string());
//!
//! assert_eq!(counter.count(), 0);
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Shared invocation counter for spying on steps and operations.
///
/// Clones share the same count, so a clone can be moved into a closure while
/// the test keeps the original.
///
/// # Example
///
/// ```rust
/// use undertow::testing::CallCounter;
///
/// let counter = CallCounter::new();
/// let double = counter.track(|n: i32| n * 2);
///
/// assert_eq!(double(4), 8);
/// assert_eq!(double(5), 10);
/// assert_eq!(counter.count(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CallCounter {
    calls: Arc<AtomicUsize>,
}

impl CallCounter {
    /// Create a counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one call.
    pub fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    /// Calls recorded so far, across all clones.
    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Wrap `f` so every call is counted.
    pub fn track<A, R, F>(&self, f: F) -> impl Fn(A) -> R + Send + Sync + Clone
    where
        F: Fn(A) -> R + Send + Sync + Clone,
    {
        let counter = self.clone();
        move |arg: A| {
            counter.hit();
            f(arg)
        }
    }
}

/// Assert that an effect is a success, optionally with a given value.
///
/// # Example
///
/// ```rust
/// use undertow::{assert_success, Effect};
///
/// let effect = Effect::<_, String>::success(42);
/// assert_success!(effect);
/// assert_success!(Effect::<_, String>::success(42), 42);
/// ```
#[macro_export]
macro_rules! assert_success {
    ($effect:expr) => {
        match $effect {
            $crate::Effect::Success(_) => {}
            other => {
                panic!("Expected Success, got {:?}", other);
            }
        }
    };
    ($effect:expr, $expected:expr) => {
        match $effect {
            $crate::Effect::Success(value) => {
                assert_eq!(value, $expected);
            }
            other => {
                panic!("Expected Success({:?}), got {:?}", $expected, other);
            }
        }
    };
}

/// Assert that an effect is a failure, optionally with a given error.
///
/// # Example
///
/// ```rust
/// use undertow::{assert_failure, Effect};
///
/// let effect = Effect::<i32, _>::failure("invalid");
/// assert_failure!(effect);
/// assert_failure!(Effect::<i32, _>::failure("invalid"), "invalid");
/// ```
#[macro_export]
macro_rules! assert_failure {
    ($effect:expr) => {
        match $effect {
            $crate::Effect::Failure(_) => {}
            other => {
                panic!("Expected Failure, got {:?}", other);
            }
        }
    };
    ($effect:expr, $expected:expr) => {
        match $effect {
            $crate::Effect::Failure(error) => {
                assert_eq!(error, $expected);
            }
            other => {
                panic!("Expected Failure({:?}), got {:?}", $expected, other);
            }
        }
    };
}

/// Assert that an effect is a pending command with the given label.
///
/// The command's operation is not invoked.
///
/// # Example
///
/// ```rust
/// use undertow::{assert_command, Effect};
///
/// let effect =
///     Effect::<i32, String>::command_sync("load", || Ok::<_, String>(1), Effect::success);
/// assert_command!(effect, "load");
/// ```
#[macro_export]
macro_rules! assert_command {
    ($effect:expr, $label:expr) => {
        match &$effect {
            $crate::Effect::Command(command) => {
                assert_eq!(command.label().as_str(), $label);
            }
            other => {
                panic!("Expected Command({:?}), got {:?}", $label, other);
            }
        }
    };
}

#[cfg(feature = "proptest")]
use proptest::prelude::*;

#[cfg(feature = "proptest")]
impl<T, E> Arbitrary for crate::Effect<T, E>
where
    T: Arbitrary + 'static,
    E: Arbitrary + 'static,
{
    type Parameters = (T::Parameters, E::Parameters);
    type Strategy = BoxedStrategy<Self>;

    /// Generates outcomes only; commands hold closures and cannot be generated.
    fn arbitrary_with(args: Self::Parameters) -> Self::Strategy {
        let (t_params, e_params) = args;
        prop_oneof![
            any_with::<T>(t_params).prop_map(crate::Effect::success),
            any_with::<E>(e_params).prop_map(crate::Effect::failure),
        ]
        .boxed()
    }
}
