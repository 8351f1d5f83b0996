//! Fault boundaries.
//!
//! A panic inside a fetch, a parser or a store implementation must not
//! unwind past the step that triggered it. [`guard`] runs a future and turns
//! a panic into [`ReaderError::Panic`] carrying the step label and payload.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;

use crate::{ReaderError, Result};

/// Run `fut`, converting a panic into an error result.
pub async fn guard<T, F>(label: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(ReaderError::Panic(format!(
            "{}: {}",
            label,
            panic_message(payload.as_ref())
        ))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
