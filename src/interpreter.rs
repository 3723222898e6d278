//! Driving effects to a terminal outcome.
//!
//! The [`Interpreter`] is the imperative shell. It takes an [`Effect`] and,
//! while it is a [`Command`], invokes the operation, awaits it, and feeds the
//! result to the continuation. The loop is a trampoline: each step replaces
//! the current effect, so a chain of any length runs in constant stack.
//!
//! Exactly one operation is in flight at a time. The first error, whether
//! the operation's or the continuation's, ends the run and is returned as
//! is.
//!
//! # Example
//!
//! ```rust
//! use undertow::{run_effect, Effect};
//!
//! # tokio_test::block_on(async {
//! let effect = Effect::<u32, String>::command(
//!     "read_a",
//!     || async { Ok::<_, String>(2) },
//!     |a: u32| {
//!         Effect::command(
//!             "read_b",
//!             || async { Ok::<_, String>(40) },
//!             move |b: u32| Effect::success(a + b),
//!         )
//!     },
//! );
//!
//! assert_eq!(run_effect(effect).await, Ok(42));
//! # });
//! ```

use std::fmt;

use crate::effect::{Command, Effect, Label};

/// Which half of a command produced an operational fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Phase {
    /// The operation returned an error.
    Operation,
    /// The continuation returned an error.
    Continuation,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Operation => write!(f, "operation"),
            Phase::Continuation => write!(f, "continuation"),
        }
    }
}

/// Where an operational fault happened. The error itself is returned
/// separately, untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Fault {
    /// Label of the command that faulted.
    pub label: Label,
    /// Whether the operation or the continuation faulted.
    pub phase: Phase,
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of `{}` failed", self.phase, self.label)
    }
}

/// Record of one interpreter run.
///
/// Lists, in order, every command whose operation was invoked, and the
/// [`Fault`] if one ended the run. A domain failure built by application
/// logic is not a fault.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Trace {
    executed: Vec<Label>,
    fault: Option<Fault>,
}

impl Trace {
    /// Labels of the commands that ran, in execution order.
    pub fn executed(&self) -> &[Label] {
        &self.executed
    }

    /// The fault that ended the run, if any.
    pub fn fault(&self) -> Option<&Fault> {
        self.fault.as_ref()
    }

    /// Number of commands that ran.
    pub fn len(&self) -> usize {
        self.executed.len()
    }

    /// `true` if no command ran.
    pub fn is_empty(&self) -> bool {
        self.executed.is_empty()
    }
}

/// Runs effects. Stateless; every call drives its own effect tree.
///
/// Separate effects can be interpreted concurrently by separate calls, each
/// with its own sequential loop.
#[derive(Debug, Clone, Copy, Default)]
pub struct Interpreter;

impl Interpreter {
    /// Create an interpreter.
    pub fn new() -> Self {
        Interpreter
    }

    /// Drive `effect` until it is a success or a failure.
    pub async fn run<T, E>(&self, effect: Effect<T, E>) -> Result<T, E>
    where
        T: Send + 'static,
        E: Send + 'static,
    {
        drive(effect, None).await
    }

    /// Like [`run`](Self::run), also returning the [`Trace`] of the run.
    ///
    /// # Example
    ///
    /// ```rust
    /// use undertow::{Effect, Interpreter, Label, Phase};
    ///
    /// # tokio_test::block_on(async {
    /// let effect = Effect::<i32, String>::command(
    ///     "fetch",
    ///     || async { Err::<i32, _>("timed out".to_string()) },
    ///     Effect::success,
    /// );
    ///
    /// let (result, trace) = Interpreter::new().run_traced(effect).await;
    /// assert_eq!(result, Err("timed out".to_string()));
    /// assert_eq!(trace.executed(), [Label::new("fetch")]);
    /// assert_eq!(trace.fault().map(|f| f.phase), Some(Phase::Operation));
    /// # });
    /// ```
    pub async fn run_traced<T, E>(&self, effect: Effect<T, E>) -> (Result<T, E>, Trace)
    where
        T: Send + 'static,
        E: Send + 'static,
    {
        let mut trace = Trace::default();
        let result = drive(effect, Some(&mut trace)).await;
        (result, trace)
    }

    /// Drive `effect` on the current thread, blocking until it settles.
    ///
    /// Operations that need a specific async runtime (timers, sockets) must
    /// be run with [`run`](Self::run) on that runtime instead.
    pub fn run_blocking<T, E>(&self, effect: Effect<T, E>) -> Result<T, E>
    where
        T: Send + 'static,
        E: Send + 'static,
    {
        futures::executor::block_on(self.run(effect))
    }

    /// Drive `effect` inside `span`.
    #[cfg(feature = "tracing")]
    pub async fn run_instrumented<T, E>(
        &self,
        effect: Effect<T, E>,
        span: tracing::Span,
    ) -> Result<T, E>
    where
        T: Send + 'static,
        E: Send + 'static,
    {
        use tracing::Instrument as _;
        self.run(effect).instrument(span).await
    }
}

/// Drive `effect` to its outcome with a default [`Interpreter`].
pub async fn run_effect<T, E>(effect: Effect<T, E>) -> Result<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    Interpreter::new().run(effect).await
}

/// Blocking form of [`run_effect`].
///
/// # Example
///
/// ```rust
/// use undertow::{run_effect_blocking, Effect};
///
/// let effect = Effect::<i32, String>::command_sync("two", || Ok::<_, String>(2), |n: i32| {
///     Effect::success(n * 21)
/// });
/// assert_eq!(run_effect_blocking(effect), Ok(42));
/// ```
pub fn run_effect_blocking<T, E>(effect: Effect<T, E>) -> Result<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    Interpreter::new().run_blocking(effect)
}

/// Result of advancing one command.
enum Step<T, E> {
    Next(Effect<T, E>),
    Fault(Phase, E),
}

/// Run the operation, then apply the continuation. Both halves share this
/// one failure boundary.
async fn step<T, E>(command: Command<T, E>) -> Step<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    let resume = match command.execute().await {
        Ok(resume) => resume,
        Err(error) => return Step::Fault(Phase::Operation, error),
    };
    match resume() {
        Ok(next) => Step::Next(next),
        Err(error) => Step::Fault(Phase::Continuation, error),
    }
}

async fn drive<T, E>(effect: Effect<T, E>, mut trace: Option<&mut Trace>) -> Result<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    let mut current = effect;
    loop {
        let command = match current {
            Effect::Success(value) => return Ok(value),
            Effect::Failure(error) => return Err(error),
            Effect::Command(command) => command,
        };

        let label = command.label().clone();
        #[cfg(feature = "tracing")]
        tracing::trace!(command = %label, "running deferred command");
        if let Some(trace) = trace.as_deref_mut() {
            trace.executed.push(label.clone());
        }

        current = match step(command).await {
            Step::Next(next) => next,
            Step::Fault(phase, error) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(command = %label, %phase, "deferred command faulted");
                if let Some(trace) = trace.as_deref_mut() {
                    trace.fault = Some(Fault { label, phase });
                }
                return Err(error);
            }
        };
    }
}
