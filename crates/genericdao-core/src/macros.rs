//! Propagation helpers for `Outcome`-returning async operations.
//!
//! `Outcome` has four arms, so `?` does not apply. These macros forward the
//! non-`Ok` arms to the caller unchanged.

/// Unwrap an `Outcome`, returning early on `Err`, `Cancelled` or `Panicked`.
#[macro_export]
macro_rules! try_outcome {
    ($expr:expr) => {
        match $expr {
            $crate::Outcome::Ok(value) => value,
            $crate::Outcome::Err(e) => return $crate::Outcome::Err(e),
            $crate::Outcome::Cancelled(r) => return $crate::Outcome::Cancelled(r),
            $crate::Outcome::Panicked(p) => return $crate::Outcome::Panicked(p),
        }
    };
}

/// Unwrap a `Result`, returning `Outcome::Err` on failure.
#[macro_export]
macro_rules! try_result {
    ($expr:expr) => {
        match $expr {
            ::std::result::Result::Ok(value) => value,
            ::std::result::Result::Err(e) => return $crate::Outcome::Err(e.into()),
        }
    };
}
