//! Ordered API-generation fallback.
//!
//! Each directory operation is expressed as a short list of [`Attempt`]s,
//! one per API generation. An attempt names the HTTP statuses that mean
//! "this generation is not available for this store"; only those statuses
//! move on to the next attempt. Anything else, including transport errors,
//! ends the operation with that error.

use futures::future::BoxFuture;

use super::client::DirectoryError;

/// Commerce-platform API generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiGeneration {
    /// The current resource API.
    Modern,
    /// Its predecessor.
    Legacy,
}

impl ApiGeneration {
    /// Label for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Modern => "modern",
            Self::Legacy => "legacy",
        }
    }
}

impl std::fmt::Display for ApiGeneration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Statuses meaning a lookup route does not exist for this store.
pub const LOOKUP_MISMATCH: &[u16] = &[404, 405, 501];

/// Statuses meaning the modern create shape is not accepted.
pub const CREATE_MISMATCH: &[u16] = &[404, 405, 422, 501];

/// Statuses meaning the precise group update is unsupported or malformed.
pub const GROUP_UPDATE_MISMATCH: &[u16] = &[400, 404, 405, 422, 500, 501];

/// One way of performing an operation.
pub struct Attempt<'a, T> {
    label: &'static str,
    generation: ApiGeneration,
    fall_through_on: &'static [u16],
    call: BoxFuture<'a, Result<T, DirectoryError>>,
}

impl<'a, T> Attempt<'a, T> {
    /// Describe an attempt. `call` is not polled until the attempt runs.
    pub fn new(
        label: &'static str,
        generation: ApiGeneration,
        fall_through_on: &'static [u16],
        call: BoxFuture<'a, Result<T, DirectoryError>>,
    ) -> Self {
        Self {
            label,
            generation,
            fall_through_on,
            call,
        }
    }
}

/// Run attempts in order until one succeeds.
///
/// Returns the generation that answered alongside its value. The last
/// attempt never falls through; its error is returned as-is.
///
/// # Errors
///
/// Returns the first error that is not a mismatch signal, or the last
/// attempt's error.
pub async fn first_success<T>(
    operation: &'static str,
    attempts: Vec<Attempt<'_, T>>,
) -> Result<(ApiGeneration, T), DirectoryError> {
    let mut attempts = attempts.into_iter().peekable();

    while let Some(attempt) = attempts.next() {
        let Attempt {
            label,
            generation,
            fall_through_on,
            call,
        } = attempt;

        match call.await {
            Ok(value) => return Ok((generation, value)),
            Err(err)
                if attempts.peek().is_some()
                    && err
                        .status()
                        .is_some_and(|status| fall_through_on.contains(&status)) =>
            {
                tracing::warn!(
                    operation,
                    attempt = label,
                    generation = %generation,
                    error = %err,
                    "Directory call rejected as API-generation mismatch, falling back"
                );
            }
            Err(err) => return Err(err),
        }
    }

    Err(DirectoryError::Configuration(format!(
        "no attempts configured for {operation}"
    )))
}
