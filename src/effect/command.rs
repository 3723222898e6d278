//! Deferred commands - a side-effecting operation paired with a continuation.
//!
//! A [`Command`] is the only [`Effect`] variant that describes work which has
//! not happened yet. It owns a zero-argument operation and the continuation
//! that consumes the operation's result. Building, chaining or mapping a
//! command never invokes the operation; only the interpreter (or
//! [`Command::resume`], which skips the operation entirely) moves it forward.
//!
//! The operation's result type `R` is erased, so a `Command<T, E>` only
//! mentions the types of the effect it eventually produces.

use std::any::type_name;
use std::borrow::Cow;
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;

use crate::effect::erased::{
    downcast, erase, fail, reveal, settle, AnyBox, Continue, Erased, Head, Link, RawCommand,
};
use crate::effect::{BoxFuture, Effect};

/// Continuation application, delayed until the interpreter is ready for it.
pub(crate) type Resume<T, E> = Box<dyn FnOnce() -> Result<Effect<T, E>, E> + Send>;

/// Typed tag naming the operation a command will run.
///
/// Every command carries a label from the moment it is constructed. Chaining
/// and error mapping keep the label of the underlying operation, so a test can
/// assert which operation runs next without running it.
///
/// # Example
///
/// ```rust
/// use undertow::Label;
///
/// const FIND_USER: Label = Label::new("find_user");
///
/// assert_eq!(FIND_USER, "find_user");
/// assert_eq!(Label::from(String::from("find_user")), FIND_USER);
/// assert_eq!(FIND_USER.to_string(), "find_user");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Label(Cow<'static, str>);

impl Label {
    /// Create a label from a static string.
    pub const fn new(name: &'static str) -> Self {
        Label(Cow::Borrowed(name))
    }

    /// The label as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for Label {
    fn from(name: &'static str) -> Self {
        Label::new(name)
    }
}

impl From<String> for Label {
    fn from(name: String) -> Self {
        Label(Cow::Owned(name))
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for Label {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for Label {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

/// Error returned when a command is resumed by hand with the wrong input.
///
/// Only [`Command::resume`] and [`Effect::resume`] produce this error. The
/// interpreter always feeds an operation's own result to its continuation and
/// never sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumeError {
    /// The supplied value is not the type the operation produces.
    TypeMismatch {
        /// Label of the command that was resumed.
        label: Label,
        /// Result type of the command's operation.
        expected: &'static str,
        /// Type of the value that was supplied.
        found: &'static str,
    },
    /// The effect was already a terminal outcome.
    NotSuspended,
}

impl fmt::Display for ResumeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResumeError::TypeMismatch {
                label,
                expected,
                found,
            } => write!(
                f,
                "command `{}` expects a result of type {}, got {}",
                label, expected, found
            ),
            ResumeError::NotSuspended => {
                write!(f, "effect is a terminal outcome, not a deferred command")
            }
        }
    }
}

impl std::error::Error for ResumeError {}

/// An operation and the continuation that consumes its result.
struct Deferred<Op, K, R> {
    operation: Op,
    continuation: K,
    _result: PhantomData<fn() -> R>,
}

impl<Op, Fut, K, R, T, E> Head for Deferred<Op, K, R>
where
    Op: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<R, E>> + Send + 'static,
    K: FnOnce(R) -> Result<Effect<T, E>, E> + Send + 'static,
    R: Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    fn execute(self: Box<Self>) -> BoxFuture<'static, Result<Continue, AnyBox>> {
        let Deferred {
            operation,
            continuation,
            ..
        } = *self;
        let pending = operation();
        Box::pin(async move {
            match pending.await {
                Ok(result) => Ok(Box::new(move || apply(continuation, result)) as Continue),
                Err(error) => Err(Box::new(error) as AnyBox),
            }
        })
    }

    fn resume_any(
        self: Box<Self>,
        value: AnyBox,
    ) -> Result<Result<Erased, AnyBox>, &'static str> {
        let this = *self;
        match value.downcast::<R>() {
            Ok(result) => Ok(apply(this.continuation, *result)),
            Err(_) => Err(type_name::<R>()),
        }
    }
}

fn apply<K, R, T, E>(continuation: K, result: R) -> Result<Erased, AnyBox>
where
    K: FnOnce(R) -> Result<Effect<T, E>, E>,
    T: Send + 'static,
    E: Send + 'static,
{
    match continuation(result) {
        Ok(effect) => Ok(erase(effect)),
        Err(error) => Err(Box::new(error)),
    }
}

/// A side-effecting operation that has not run yet, plus its continuation.
///
/// Commands are built with [`Effect::command`], [`Effect::try_command`] or
/// [`Effect::command_sync`] and are only ever found inside
/// [`Effect::Command`].
///
/// Steps chained onto a pending command are queued behind its operation
/// rather than nested around it, so chains of any length build, resume and
/// drop in constant stack.
pub struct Command<T, E> {
    raw: RawCommand,
    _types: PhantomData<fn() -> (T, E)>,
}

impl<T, E> Command<T, E> {
    /// Label of the operation this command runs next.
    pub fn label(&self) -> &Label {
        &self.raw.label
    }

    pub(crate) fn from_raw(raw: RawCommand) -> Self {
        Command {
            raw,
            _types: PhantomData,
        }
    }

    pub(crate) fn into_raw(self) -> RawCommand {
        self.raw
    }
}

impl<T, E> Command<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    pub(crate) fn deferred<R, Op, Fut, K>(label: Label, operation: Op, continuation: K) -> Self
    where
        Op: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
        K: FnOnce(R) -> Result<Effect<T, E>, E> + Send + 'static,
        R: Send + 'static,
    {
        Command::from_raw(RawCommand {
            label,
            head: Box::new(Deferred {
                operation,
                continuation,
                _result: PhantomData,
            }),
            links: VecDeque::new(),
        })
    }

    /// Feed `value` to the continuation as if the operation had produced it.
    ///
    /// The operation is never invoked, which makes this the way to walk a
    /// flow step by step in a test. A continuation error becomes
    /// [`Effect::Failure`], exactly as the interpreter would report it.
    ///
    /// # Errors
    ///
    /// [`ResumeError::TypeMismatch`] if `R` is not the operation's result type.
    ///
    /// # Example
    ///
    /// ```rust
    /// use undertow::Effect;
    ///
    /// let effect = Effect::<i32, String>::command(
    ///     "load_count",
    ///     || async { Ok::<_, String>(1) },
    ///     |count: i32| Effect::success(count * 10),
    /// );
    ///
    /// if let Effect::Command(command) = effect {
    ///     assert_eq!(command.resume(4).unwrap(), Effect::success(40));
    /// }
    /// ```
    pub fn resume<R: Send + 'static>(self, value: R) -> Result<Effect<T, E>, ResumeError> {
        let RawCommand { label, head, links } = self.raw;
        match head.resume_any(Box::new(value)) {
            Ok(Ok(erased)) => Ok(reveal(settle(erased, links))),
            Ok(Err(fault)) => Ok(Effect::Failure(downcast(fail(fault, links)))),
            Err(expected) => Err(ResumeError::TypeMismatch {
                label,
                expected,
                found: type_name::<R>(),
            }),
        }
    }

    /// Invoke the operation. The returned future settles with the
    /// continuation, queued steps included but not yet applied, or with the
    /// operation's error after any queued `map_err`.
    pub(crate) fn execute(self) -> BoxFuture<'static, Result<Resume<T, E>, E>> {
        let RawCommand { head, links, .. } = self.raw;
        let pending = head.execute();
        Box::pin(async move {
            match pending.await {
                Ok(resume) => Ok(Box::new(move || match resume() {
                    Ok(erased) => Ok(reveal(settle(erased, links))),
                    Err(fault) => Err(downcast(fail(fault, links))),
                }) as Resume<T, E>),
                Err(fault) => Err(downcast(fail(fault, links))),
            }
        })
    }

    pub(crate) fn then<U, F>(mut self, next: F) -> Command<U, E>
    where
        U: Send + 'static,
        F: FnOnce(T) -> Effect<U, E> + Send + 'static,
    {
        self.raw
            .push(Link::Bind(Box::new(move |value| erase(next(downcast::<T>(value))))));
        Command::from_raw(self.raw)
    }

    pub(crate) fn map_err<E2, F>(mut self, f: F) -> Command<T, E2>
    where
        E2: Send + 'static,
        F: FnOnce(E) -> E2 + Send + 'static,
    {
        self.raw.push(Link::MapErr(Box::new(move |error| {
            Box::new(f(downcast::<E>(error))) as AnyBox
        })));
        Command::from_raw(self.raw)
    }
}

impl<T, E> fmt::Debug for Command<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Command").field(&self.label().as_str()).finish()
    }
}
