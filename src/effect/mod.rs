//! The effect algebra: success, failure, or a deferred command.
//!
//! Business logic returns an [`Effect`] describing what should happen instead
//! of doing it. Pure rules produce [`Effect::Success`] or [`Effect::Failure`]
//! directly; anything that needs I/O produces an [`Effect::Command`], a
//! zero-argument operation together with the continuation that decides what
//! happens with its result. The [`Interpreter`](crate::Interpreter) is the only
//! place operations actually run.
//!
//! # Describing work
//!
//! ```rust
//! use undertow::Effect;
//!
//! fn check_stock(sku: &'static str, wanted: u32) -> Effect<u32, String> {
//!     Effect::command(
//!         "load_stock",
//!         move || async move { Ok::<u32, String>(lookup(sku)) },
//!         move |available: u32| {
//!             if available >= wanted {
//!                 Effect::success(available - wanted)
//!             } else {
//!                 Effect::failure(format!("only {} left", available))
//!             }
//!         },
//!     )
//! }
//! # fn lookup(_: &str) -> u32 { 3 }
//!
//! // Nothing ran yet: the effect is plain data.
//! let effect = check_stock("sku-1", 5);
//! assert!(effect.is_command());
//! assert_eq!(effect.label().map(|l| l.as_str()), Some("load_stock"));
//! ```
//!
//! # Testing branches without I/O
//!
//! ```rust
//! use undertow::Effect;
//! # fn check_stock(wanted: u32) -> Effect<u32, String> {
//! #     Effect::command(
//! #         "load_stock",
//! #         || async { Ok::<u32, String>(0) },
//! #         move |available: u32| {
//! #             if available >= wanted {
//! #                 Effect::success(available - wanted)
//! #             } else {
//! #                 Effect::failure(format!("only {} left", available))
//! #             }
//! #         },
//! #     )
//! # }
//!
//! let low = check_stock(5).resume(3u32).unwrap();
//! assert_eq!(low, Effect::failure("only 3 left".to_string()));
//!
//! let plenty = check_stock(5).resume(8u32).unwrap();
//! assert_eq!(plenty, Effect::success(3));
//! ```

mod command;
pub(crate) mod erased;

use std::fmt;
use std::future::Future;
use std::pin::Pin;

pub use command::{Command, Label, ResumeError};

/// A boxed future that is Send
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A description of work: finished, failed, or waiting on an operation.
///
/// `Effect<T, E>` is a closed sum type:
///
/// * [`Effect::Success`] - the computation finished with a `T`
/// * [`Effect::Failure`] - the computation failed with an `E`; no further
///   step will run
/// * [`Effect::Command`] - an operation has yet to run; its continuation
///   will produce the next `Effect`
///
/// Effects are immutable values. Combinators consume an effect and return a
/// new one; none of them ever invokes a command's operation.
///
/// # Equality
///
/// Outcomes compare structurally. Two commands compare equal when their
/// [`Label`]s match, since continuations cannot be compared.
pub enum Effect<T, E> {
    /// Computation completed with a value.
    Success(T),
    /// Computation failed terminally.
    Failure(E),
    /// A side-effecting operation that has not run yet.
    Command(Command<T, E>),
}

impl<T, E> Effect<T, E> {
    /// Create a successful outcome.
    ///
    /// # Example
    ///
    /// ```rust
    /// use undertow::Effect;
    ///
    /// let effect = Effect::<_, String>::success(42);
    /// assert_eq!(effect.into_outcome(), Some(Ok(42)));
    /// ```
    pub fn success(value: T) -> Self {
        Effect::Success(value)
    }

    /// Create a failed outcome.
    ///
    /// # Example
    ///
    /// ```rust
    /// use undertow::Effect;
    ///
    /// let effect = Effect::<i32, _>::failure("no such user");
    /// assert_eq!(effect.into_outcome(), Some(Err("no such user")));
    /// ```
    pub fn failure(error: E) -> Self {
        Effect::Failure(error)
    }

    /// Lift a `Result` into an outcome.
    pub fn from_result(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Effect::Success(value),
            Err(error) => Effect::Failure(error),
        }
    }

    /// Lift an `Option` into an outcome, building the error only for `None`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use undertow::Effect;
    ///
    /// let found = Effect::from_option(Some(7), || "missing");
    /// assert_eq!(found, Effect::success(7));
    ///
    /// let missing = Effect::<i32, _>::from_option(None, || "missing");
    /// assert_eq!(missing, Effect::failure("missing"));
    /// ```
    pub fn from_option(option: Option<T>, error: impl FnOnce() -> E) -> Self {
        match option {
            Some(value) => Effect::Success(value),
            None => Effect::Failure(error()),
        }
    }

    /// `true` for [`Effect::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, Effect::Success(_))
    }

    /// `true` for [`Effect::Failure`].
    pub fn is_failure(&self) -> bool {
        matches!(self, Effect::Failure(_))
    }

    /// `true` for [`Effect::Command`].
    pub fn is_command(&self) -> bool {
        matches!(self, Effect::Command(_))
    }

    /// The success value, if this is a success.
    pub fn as_success(&self) -> Option<&T> {
        match self {
            Effect::Success(value) => Some(value),
            _ => None,
        }
    }

    /// The error, if this is a failure.
    pub fn as_failure(&self) -> Option<&E> {
        match self {
            Effect::Failure(error) => Some(error),
            _ => None,
        }
    }

    /// Label of the pending operation, if this is a command.
    pub fn label(&self) -> Option<&Label> {
        match self {
            Effect::Command(command) => Some(command.label()),
            _ => None,
        }
    }

    /// The terminal outcome as a `Result`, or `None` while a command is pending.
    pub fn into_outcome(self) -> Option<Result<T, E>> {
        match self {
            Effect::Success(value) => Some(Ok(value)),
            Effect::Failure(error) => Some(Err(error)),
            Effect::Command(_) => None,
        }
    }
}

impl<T, E> Effect<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Describe an asynchronous operation and what to do with its result.
    ///
    /// `operation` takes no arguments: capture whatever it needs with `move`.
    /// It is not called here. An `Err` from the operation is an operational
    /// fault, which the interpreter reports as the final error unchanged.
    ///
    /// # Example
    ///
    /// ```rust
    /// use undertow::{run_effect, Effect};
    ///
    /// # tokio_test::block_on(async {
    /// let effect = Effect::<String, String>::command(
    ///     "fetch_greeting",
    ///     || async { Ok::<_, String>("hello".to_string()) },
    ///     |greeting: String| Effect::success(greeting.to_uppercase()),
    /// );
    ///
    /// assert_eq!(run_effect(effect).await, Ok("HELLO".to_string()));
    /// # });
    /// ```
    pub fn command<R, Op, Fut, K>(label: impl Into<Label>, operation: Op, continuation: K) -> Self
    where
        Op: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
        K: FnOnce(R) -> Effect<T, E> + Send + 'static,
        R: Send + 'static,
    {
        Self::try_command(label, operation, move |result| Ok(continuation(result)))
    }

    /// Like [`Effect::command`], with a continuation that can itself fault.
    ///
    /// An `Err` returned by the continuation is handled exactly like an `Err`
    /// from the operation: the interpreter stops and reports it unchanged.
    ///
    /// # Example
    ///
    /// ```rust
    /// use undertow::{run_effect, Effect};
    ///
    /// # tokio_test::block_on(async {
    /// let effect = Effect::<u16, String>::try_command(
    ///     "read_port",
    ///     || async { Ok::<_, String>("80a".to_string()) },
    ///     |raw: String| {
    ///         let port = raw.parse::<u16>().map_err(|e| e.to_string())?;
    ///         Ok(Effect::success(port))
    ///     },
    /// );
    ///
    /// assert_eq!(
    ///     run_effect(effect).await,
    ///     Err("invalid digit found in string".to_string())
    /// );
    /// # });
    /// ```
    pub fn try_command<R, Op, Fut, K>(
        label: impl Into<Label>,
        operation: Op,
        continuation: K,
    ) -> Self
    where
        Op: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
        K: FnOnce(R) -> Result<Effect<T, E>, E> + Send + 'static,
        R: Send + 'static,
    {
        Effect::Command(Command::deferred(label.into(), operation, continuation))
    }

    /// Describe a synchronous operation and what to do with its result.
    ///
    /// # Example
    ///
    /// ```rust
    /// use undertow::{run_effect_blocking, Effect};
    ///
    /// let effect = Effect::<usize, String>::command_sync(
    ///     "count_args",
    ///     || Ok::<_, String>(vec!["a", "b"]),
    ///     |args: Vec<&'static str>| Effect::success(args.len()),
    /// );
    ///
    /// assert_eq!(run_effect_blocking(effect), Ok(2));
    /// ```
    pub fn command_sync<R, Op, K>(label: impl Into<Label>, operation: Op, continuation: K) -> Self
    where
        Op: FnOnce() -> Result<R, E> + Send + 'static,
        K: FnOnce(R) -> Effect<T, E> + Send + 'static,
        R: Send + 'static,
    {
        Self::command(
            label,
            move || futures::future::ready(operation()),
            continuation,
        )
    }

    /// Sequence this effect with `f`.
    ///
    /// * `Success(v)` becomes `f(v)`
    /// * `Failure(e)` is returned untouched and `f` is dropped uncalled
    /// * a command keeps its label and operation; `f` runs only after the
    ///   original continuation has produced a success
    ///
    /// Nothing is executed by this call.
    ///
    /// # Example
    ///
    /// ```rust
    /// use undertow::Effect;
    ///
    /// let effect = Effect::<_, String>::success(21).and_then(|x| Effect::success(x * 2));
    /// assert_eq!(effect, Effect::success(42));
    ///
    /// let effect = Effect::<i32, _>::failure("stop".to_string())
    ///     .and_then(|x| Effect::success(x * 2));
    /// assert_eq!(effect, Effect::failure("stop".to_string()));
    /// ```
    pub fn and_then<U, F>(self, f: F) -> Effect<U, E>
    where
        U: Send + 'static,
        F: FnOnce(T) -> Effect<U, E> + Send + 'static,
    {
        match self {
            Effect::Success(value) => f(value),
            Effect::Failure(error) => Effect::Failure(error),
            Effect::Command(command) => Effect::Command(command.then(f)),
        }
    }

    /// Transform the success value.
    ///
    /// # Example
    ///
    /// ```rust
    /// use undertow::Effect;
    ///
    /// let effect = Effect::<_, String>::success(21).map(|x| x * 2);
    /// assert_eq!(effect, Effect::success(42));
    /// ```
    pub fn map<U, F>(self, f: F) -> Effect<U, E>
    where
        U: Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        self.and_then(move |value| Effect::Success(f(value)))
    }

    /// Transform the error, wherever it comes from.
    ///
    /// Applies to a failure built by application logic and, for commands, to
    /// operation faults and continuation faults as well as to whatever the
    /// continuation produces.
    ///
    /// # Example
    ///
    /// ```rust
    /// use undertow::{run_effect_blocking, Effect};
    ///
    /// #[derive(Debug, PartialEq)]
    /// enum AppError {
    ///     Store(String),
    /// }
    ///
    /// let effect = Effect::<i32, String>::command_sync(
    ///     "load",
    ///     || Err::<i32, _>("disk full".to_string()),
    ///     Effect::success,
    /// )
    /// .map_err(AppError::Store);
    ///
    /// assert_eq!(
    ///     run_effect_blocking(effect),
    ///     Err(AppError::Store("disk full".to_string()))
    /// );
    /// ```
    pub fn map_err<E2, F>(self, f: F) -> Effect<T, E2>
    where
        E2: Send + 'static,
        F: FnOnce(E) -> E2 + Send + 'static,
    {
        match self {
            Effect::Success(value) => Effect::Success(value),
            Effect::Failure(error) => Effect::Failure(f(error)),
            Effect::Command(command) => Effect::Command(command.map_err(f)),
        }
    }

    /// Fail with `error()` unless the success value satisfies `predicate`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use undertow::Effect;
    ///
    /// let adult = Effect::<_, &str>::success(20).ensure(|age| *age >= 18, || "too young");
    /// assert_eq!(adult, Effect::success(20));
    ///
    /// let minor = Effect::<_, &str>::success(12).ensure(|age| *age >= 18, || "too young");
    /// assert_eq!(minor, Effect::failure("too young"));
    /// ```
    pub fn ensure<P, F>(self, predicate: P, error: F) -> Self
    where
        P: FnOnce(&T) -> bool + Send + 'static,
        F: FnOnce() -> E + Send + 'static,
    {
        self.and_then(move |value| {
            if predicate(&value) {
                Effect::Success(value)
            } else {
                Effect::Failure(error())
            }
        })
    }

    /// Feed `value` to a pending command's continuation without running its
    /// operation. See [`Command::resume`].
    ///
    /// # Errors
    ///
    /// [`ResumeError::NotSuspended`] for an outcome, and
    /// [`ResumeError::TypeMismatch`] when `R` is not the operation's result type.
    pub fn resume<R: Send + 'static>(self, value: R) -> Result<Self, ResumeError> {
        match self {
            Effect::Command(command) => command.resume(value),
            _ => Err(ResumeError::NotSuspended),
        }
    }
}

/// Sequence `effect` with `f`. Free-function form of [`Effect::and_then`].
///
/// # Example
///
/// ```rust
/// use undertow::{chain, Effect};
///
/// let effect = chain(Effect::<_, String>::success(2), |x| Effect::success(x + 1));
/// assert_eq!(effect, Effect::success(3));
/// ```
pub fn chain<T, U, E, F>(effect: Effect<T, E>, f: F) -> Effect<U, E>
where
    T: Send + 'static,
    U: Send + 'static,
    E: Send + 'static,
    F: FnOnce(T) -> Effect<U, E> + Send + 'static,
{
    effect.and_then(f)
}

impl<T, E> From<Result<T, E>> for Effect<T, E> {
    fn from(result: Result<T, E>) -> Self {
        Effect::from_result(result)
    }
}

impl<T: PartialEq, E: PartialEq> PartialEq for Effect<T, E> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Effect::Success(a), Effect::Success(b)) => a == b,
            (Effect::Failure(a), Effect::Failure(b)) => a == b,
            (Effect::Command(a), Effect::Command(b)) => a.label() == b.label(),
            _ => false,
        }
    }
}

impl<T: fmt::Debug, E: fmt::Debug> fmt::Debug for Effect<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::Success(value) => f.debug_tuple("Success").field(value).finish(),
            Effect::Failure(error) => f.debug_tuple("Failure").field(error).finish(),
            Effect::Command(command) => fmt::Debug::fmt(command, f),
        }
    }
}
