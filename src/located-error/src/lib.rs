use std::{fmt::Display, panic::Location};

use anyhow::Context;

pub mod prelude {
    extern crate anyhow;
    pub use anyhow::{anyhow, bail, Context, Result};

    extern crate thiserror;
    pub use thiserror::Error;

    pub use super::{LocatedError, LocatedOption};
    pub use crate::loc;
}

/// Format the location of a `#[track_caller]` caller as `[file:line:col]`
fn caller_tag(caller: &Location) -> String {
    format!("[{}:{}:{}]", caller.file(), caller.line(), caller.column())
}

/// Return early with an `anyhow::Error` built from `$err`, tagged with the location of the macro call.
///
/// # Example
/// ```
/// use located_error::prelude::*;
/// fn check(n: usize) -> Result<usize> {
///     if n < 2 {
///         return loc!("expected at least two groups")
///     }
///     Ok(n)
/// }
/// assert!(check(1).is_err());
/// ```
#[macro_export]
macro_rules! loc {
    ($err:expr) => {
        Err($crate::located_anyhow($err, std::panic::Location::caller()))
    };
}

#[doc(hidden)]
pub fn located_anyhow<C>(context: C, caller: &Location) -> anyhow::Error
where
    C: Display + Send + Sync + 'static,
{
    anyhow::anyhow!("{} {context}", caller_tag(caller))
}

pub trait LocatedError<T, E> {
    /// Wrap the error value with additional context + the location at which it was called.
    fn loc<C>(self, context: C) -> Result<T, anyhow::Error>
    where
        C: Display + Send + Sync + 'static;

    /// Wrap the error value with additional context that is evaluated lazily
    /// only once an error does occur + the location at which it was called.
    fn with_loc<C, F>(self, f: F) -> Result<T, anyhow::Error>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T, E> LocatedError<T, E> for Result<T, E>
where
    E: Display + Send + Sync + 'static,
    Result<T, E>: Context<T, E>,
{
    #[track_caller]
    fn loc<C>(self, context: C) -> Result<T, anyhow::Error>
    where
        C: Display + Send + Sync + 'static
    {
        let caller = Location::caller();
        self.with_context(|| format!("{} {context}", caller_tag(caller)))
    }

    #[track_caller]
    fn with_loc<C, F>(self, f: F) -> Result<T, anyhow::Error>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C
    {
        let caller = Location::caller();
        self.with_context(|| format!("{} {}", caller_tag(caller), f()))
    }
}

pub trait LocatedOption<T> {
    /// Convert `None` into an error carrying `context` + the location at which it was called.
    fn loc<C>(self, context: C) -> Result<T, anyhow::Error>
    where
        C: Display + Send + Sync + 'static;

    /// Same as [`LocatedOption::loc`], but `context` is only evaluated when the value is `None`.
    fn with_loc<C, F>(self, f: F) -> Result<T, anyhow::Error>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T> LocatedOption<T> for Option<T> {
    #[track_caller]
    fn loc<C>(self, context: C) -> Result<T, anyhow::Error>
    where
        C: Display + Send + Sync + 'static
    {
        let caller = Location::caller();
        self.ok_or_else(|| located_anyhow(context, caller))
    }

    #[track_caller]
    fn with_loc<C, F>(self, f: F) -> Result<T, anyhow::Error>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C
    {
        let caller = Location::caller();
        self.ok_or_else(|| located_anyhow(f(), caller))
    }
}

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[derive(Error, Debug)]
    enum MockError {
        #[error("Locus {0} is out of bounds")]
        OutOfBounds(usize),

        #[error("Group {0} does not exist")]
        MissingGroup(usize),
    }

    fn fetch_locus(position: usize) -> Result<usize, MockError> {
        match position < 3 {
            true  => Ok(position),
            false => Err(MockError::OutOfBounds(position)),
        }
    }

    fn read_locus(position: usize) -> Result<usize> {
        fetch_locus(position).with_loc(|| format!("While reading locus n°{position}"))
    }

    fn read_all_loci() -> Result<usize> {
        (0..4).map(read_locus).sum::<Result<usize>>().loc("While summing loci")
    }

    #[test]
    fn ok_values_pass_through() -> Result<()> {
        assert_eq!(read_locus(2)?, 2);
        assert_eq!(Some(4).loc("unused")?, 4);
        Ok(())
    }

    #[test]
    fn error_chain_is_located() {
        let err = read_all_loci().expect_err("Locus n°3 should be out of bounds");
        let chain = err.chain().map(ToString::to_string).collect::<Vec<_>>();
        assert_eq!(chain.len(), 3);
        assert!(chain[0].contains("While summing loci"));
        assert!(chain[1].contains("While reading locus n°3"));
        assert_eq!(chain[2], "Locus 3 is out of bounds");
        for context in &chain[0..2] {
            assert!(context.starts_with(&format!("[{}:", file!())));
        }
    }

    #[test]
    fn missing_option_is_located() {
        let groups: Vec<usize> = vec![1, 2];
        let err = groups.iter().find(|&&g| g == 7)
            .with_loc(|| MockError::MissingGroup(7))
            .expect_err("Group 7 should be missing");
        assert!(err.to_string().ends_with("Group 7 does not exist"));
    }

    #[test]
    fn loc_macro() {
        fn at_least_two(n: usize) -> Result<()> {
            if n < 2 {
                return loc!(MockError::MissingGroup(n))
            }
            Ok(())
        }
        assert!(at_least_two(2).is_ok());
        let err = at_least_two(1).expect_err("a single group should fail");
        assert!(err.to_string().contains(file!()));
    }
}
