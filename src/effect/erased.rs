//! Type-erased command representation.
//!
//! A pending command is kept flat: one [`Head`] (the operation and its own
//! continuation) followed by a queue of [`Link`]s added by `and_then` and
//! `map_err`. Chaining pushes onto the queue, and [`settle`] applies the
//! queue in a loop, so neither building nor running a long chain nests
//! closures or futures.
//!
//! Values crossing a link are boxed as [`AnyBox`]. The typed wrappers in
//! `command.rs` and `pipeline.rs` only ever link a step whose input type is
//! the previous step's output type, which is what [`downcast`] relies on.

use std::any::{type_name, Any};
use std::collections::VecDeque;

use crate::effect::{BoxFuture, Effect, Label};

pub(crate) type AnyBox = Box<dyn Any + Send>;

/// Applies the head's continuation to the operation's result.
pub(crate) type Continue = Box<dyn FnOnce() -> Result<Erased, AnyBox> + Send>;

/// An [`Effect`] with its value and error types erased.
pub(crate) enum Erased {
    Success(AnyBox),
    Failure(AnyBox),
    Command(RawCommand),
}

/// One queued step after a command's head.
pub(crate) enum Link {
    /// Runs on a success value; skipped once the chain has failed.
    Bind(Box<dyn FnOnce(AnyBox) -> Erased + Send>),
    /// Runs on an error; skipped while the chain succeeds.
    MapErr(Box<dyn FnOnce(AnyBox) -> AnyBox + Send>),
}

/// The operation at the front of a command, with its result type erased.
pub(crate) trait Head: Send {
    /// Invoke the operation. The returned future settles with the head
    /// continuation, not yet applied, or with the operation's error.
    fn execute(self: Box<Self>) -> BoxFuture<'static, Result<Continue, AnyBox>>;

    /// Apply the head continuation to a caller-supplied result without
    /// invoking the operation. `Err` carries the expected result type name
    /// when `value` has the wrong type.
    fn resume_any(
        self: Box<Self>,
        value: AnyBox,
    ) -> Result<Result<Erased, AnyBox>, &'static str>;
}

pub(crate) struct RawCommand {
    pub(crate) label: Label,
    pub(crate) head: Box<dyn Head>,
    pub(crate) links: VecDeque<Link>,
}

impl RawCommand {
    pub(crate) fn push(&mut self, link: Link) {
        self.links.push_back(link);
    }

    /// Queue `rest` after this command's own links.
    ///
    /// Moves whichever queue is shorter.
    fn extend(&mut self, mut rest: VecDeque<Link>) {
        if self.links.len() <= rest.len() {
            while let Some(link) = self.links.pop_back() {
                rest.push_front(link);
            }
            self.links = rest;
        } else {
            self.links.append(&mut rest);
        }
    }
}

/// Recover a value whose type is fixed by how the chain was linked.
pub(crate) fn downcast<V: 'static>(value: AnyBox) -> V {
    match value.downcast::<V>() {
        Ok(value) => *value,
        Err(_) => unreachable!("linked step received a value that is not {}", type_name::<V>()),
    }
}

pub(crate) fn erase<T, E>(effect: Effect<T, E>) -> Erased
where
    T: Send + 'static,
    E: Send + 'static,
{
    match effect {
        Effect::Success(value) => Erased::Success(Box::new(value)),
        Effect::Failure(error) => Erased::Failure(Box::new(error)),
        Effect::Command(command) => Erased::Command(command.into_raw()),
    }
}

pub(crate) fn reveal<T, E>(erased: Erased) -> Effect<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    match erased {
        Erased::Success(value) => Effect::Success(downcast(value)),
        Erased::Failure(error) => Effect::Failure(downcast(error)),
        Erased::Command(raw) => Effect::Command(crate::effect::Command::from_raw(raw)),
    }
}

/// Run `current` through `links` until the chain settles or suspends on a
/// new command, which then inherits whatever links are left.
pub(crate) fn settle(mut current: Erased, mut links: VecDeque<Link>) -> Erased {
    loop {
        let value = match current {
            Erased::Success(value) => value,
            Erased::Failure(error) => return Erased::Failure(fail(error, links)),
            Erased::Command(mut command) => {
                command.extend(links);
                return Erased::Command(command);
            }
        };
        current = loop {
            match links.pop_front() {
                Some(Link::Bind(f)) => break f(value),
                Some(Link::MapErr(_)) => continue,
                None => return Erased::Success(value),
            }
        };
    }
}

/// Pass an error through every `map_err` left in `links`.
pub(crate) fn fail(mut error: AnyBox, links: VecDeque<Link>) -> AnyBox {
    for link in links {
        if let Link::MapErr(f) = link {
            error = f(error);
        }
    }
    error
}
