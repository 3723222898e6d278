//! Sequential composition of effect-producing steps.
//!
//! A [`Pipeline`] threads a start value through a list of steps, each a
//! function from the previous step's success value to a new [`Effect`]. The
//! steps are joined like [`Effect::and_then`], so a failure stops the
//! pipeline structurally and a command defers every later step until its
//! continuation has run.
//!
//! # Example
//!
//! ```rust
//! use undertow::{pipeline, Effect};
//!
//! fn parse(raw: &'static str) -> Effect<i32, String> {
//!     raw.parse::<i32>().map_err(|_| format!("not a number: {}", raw)).into()
//! }
//!
//! fn non_negative(n: i32) -> Effect<u32, String> {
//!     Effect::from_option(u32::try_from(n).ok(), || format!("negative: {}", n))
//! }
//!
//! let to_count = pipeline![parse, non_negative];
//!
//! assert_eq!(to_count.run("12"), Effect::success(12));
//! assert_eq!(to_count.run("-3"), Effect::failure("negative: -3".to_string()));
//! assert_eq!(to_count.run("x"), Effect::failure("not a number: x".to_string()));
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::effect::erased::{downcast, erase, reveal, AnyBox, Erased, Link};
use crate::effect::Effect;

type ErasedStep = Arc<dyn Fn(AnyBox) -> Erased + Send + Sync>;

/// A reusable, typed chain of steps from `A` to an `Effect<B, E>`.
///
/// Built with [`Pipeline::new`] and [`Pipeline::then`], or with the
/// [`pipeline!`](crate::pipeline!) macro. Running a pipeline only builds an
/// effect; it never performs I/O.
///
/// `run` folds the steps in a loop, so a pipeline of any length runs in
/// constant stack.
pub struct Pipeline<A, B, E> {
    steps: Vec<ErasedStep>,
    _types: PhantomData<fn(A) -> (B, E)>,
}

impl<A, E> Pipeline<A, A, E>
where
    A: Send + 'static,
    E: Send + 'static,
{
    /// An empty pipeline: `run(start)` is `Effect::Success(start)`.
    pub fn new() -> Self {
        Pipeline {
            steps: Vec::new(),
            _types: PhantomData,
        }
    }
}

impl<A, E> Default for Pipeline<A, A, E>
where
    A: Send + 'static,
    E: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<A, B, E> Pipeline<A, B, E>
where
    A: Send + 'static,
    B: Send + 'static,
    E: Send + 'static,
{
    /// Append a step.
    ///
    /// The step receives the unwrapped success value of everything before
    /// it. It may ignore that value and build an unrelated command from
    /// captured state instead.
    ///
    /// # Example
    ///
    /// ```rust
    /// use undertow::{Effect, Pipeline};
    ///
    /// let greeting = Pipeline::<&'static str, _, String>::new()
    ///     .then(|name| Effect::success(name.len()))
    ///     .then(|len| Effect::success(format!("{} letters", len)));
    ///
    /// assert_eq!(greeting.run("ferris"), Effect::success("6 letters".to_string()));
    /// assert_eq!(greeting.len(), 2);
    /// ```
    pub fn then<C, F>(mut self, step: F) -> Pipeline<A, C, E>
    where
        C: Send + 'static,
        F: Fn(B) -> Effect<C, E> + Send + Sync + 'static,
    {
        self.steps
            .push(Arc::new(move |value: AnyBox| erase(step(downcast::<B>(value)))));
        Pipeline {
            steps: self.steps,
            _types: PhantomData,
        }
    }

    /// Build the effect for `start`.
    ///
    /// Starts from `Success(start)` and chains each step in order. A failure
    /// ends the fold; a command takes the remaining steps into its queue.
    pub fn run(&self, start: A) -> Effect<B, E> {
        let mut current = Erased::Success(Box::new(start));
        for step in &self.steps {
            current = match current {
                Erased::Success(value) => step(value),
                Erased::Failure(error) => return Effect::Failure(downcast(error)),
                Erased::Command(mut command) => {
                    let step = Arc::clone(step);
                    command.push(Link::Bind(Box::new(move |value| step(value))));
                    Erased::Command(command)
                }
            };
        }
        reveal(current)
    }

    /// Turn the pipeline into a plain function.
    ///
    /// # Example
    ///
    /// ```rust
    /// use undertow::{pipeline, Effect};
    ///
    /// fn halve(n: u32) -> Effect<u32, &'static str> {
    ///     if n % 2 == 0 { Effect::success(n / 2) } else { Effect::failure("odd") }
    /// }
    ///
    /// let quarter = pipeline![halve, halve].into_fn();
    /// let results: Vec<_> = [8, 6].into_iter().map(quarter).collect();
    /// assert_eq!(results, vec![Effect::success(2), Effect::failure("odd")]);
    /// ```
    pub fn into_fn(self) -> impl Fn(A) -> Effect<B, E> + Send + Sync + Clone {
        move |start: A| self.run(start)
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// `true` when no step has been added.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl<A, B, E> Clone for Pipeline<A, B, E> {
    fn clone(&self) -> Self {
        Pipeline {
            steps: self.steps.clone(),
            _types: PhantomData,
        }
    }
}

impl<A, B, E> fmt::Debug for Pipeline<A, B, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("steps", &self.steps.len())
            .finish()
    }
}

/// Build a [`Pipeline`] from a list of steps.
///
/// `pipeline![s1, s2, s3]` is `Pipeline::new().then(s1).then(s2).then(s3)`.
///
/// ```rust
/// use undertow::{pipeline, Effect};
///
/// fn inc(n: i32) -> Effect<i32, String> {
///     Effect::success(n + 1)
/// }
///
/// assert_eq!(pipeline![inc, inc, inc].run(0), Effect::success(3));
/// ```
#[macro_export]
macro_rules! pipeline {
    ($($step:expr),+ $(,)?) => {
        $crate::Pipeline::new()$(.then($step))+
    };
}
