//! Bulk mutation with per-item failure accounting.
//!
//! Delete commands accept several tokens. Each one is resolved and mutated in
//! the order given; a failure on one item is recorded and reported to a
//! [`FailureSink`], and the loop moves on. When the loop ends, a batch with
//! any failure becomes a single [`Error::Batch`] that only carries counts:
//!
//! ```text
//! 1 of 2 routers failed to delete.
//! ```
//!
//! # Example
//!
//! ```rust
//! use osc_dispatch::{BulkMutation, Error};
//!
//! let tokens = ["a", "bad-token"];
//! let mut deleted = Vec::new();
//!
//! let result = BulkMutation::new("router", "routers", "delete").apply(
//!     &tokens,
//!     |token| {
//!         if token == "a" {
//!             Ok(token.to_uppercase())
//!         } else {
//!             Err(Error::NotFound { kind: "router".into(), token: token.into() })
//!         }
//!     },
//!     |handle| {
//!         deleted.push(handle);
//!         Ok(())
//!     },
//! );
//!
//! assert_eq!(deleted, vec!["A".to_string()]);
//! assert_eq!(result.unwrap_err().to_string(), "1 of 2 routers failed to delete.");
//! ```

use std::fmt;

use tracing::error;

use crate::error::{Error, Result};
use crate::resource::ResourceKind;

/// Where in the per-item pipeline a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Resolve,
    Mutate,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Resolve => f.write_str("resolve"),
            Stage::Mutate => f.write_str("mutate"),
        }
    }
}

/// One failed item of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    pub token: String,
    pub stage: Stage,
    pub error: Error,
}

/// Receives failure records as they happen.
pub trait FailureSink {
    /// Called once per failed item, before the next item is processed.
    fn record(&self, noun: &str, verb: &str, failure: &FailureRecord);
}

/// Default sink: logs each failure at `error` level through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl FailureSink for TracingSink {
    fn record(&self, noun: &str, verb: &str, failure: &FailureRecord) {
        error!(
            token = %failure.token,
            stage = %failure.stage,
            "Failed to {} {} with name or ID '{}': {}",
            verb,
            noun,
            failure.token,
            failure.error
        );
    }
}

/// Outcome of a batch: how many items were attempted and which failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    total: usize,
    failures: Vec<FailureRecord>,
    noun_plural: String,
    verb: String,
}

impl BatchOutcome {
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn succeeded(&self) -> usize {
        self.total - self.failures.len()
    }

    /// Failures in the order the tokens were supplied.
    pub fn failures(&self) -> &[FailureRecord] {
        &self.failures
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Converts the outcome into the command result: `Ok` when nothing
    /// failed, otherwise one [`Error::Batch`] with the counts.
    pub fn into_result(self) -> Result<()> {
        if self.failures.is_empty() {
            return Ok(());
        }
        Err(Error::Batch {
            failed: self.failures.len(),
            total: self.total,
            noun: self.noun_plural,
            verb: self.verb,
        })
    }
}

/// Applies one mutation to many tokens, sequentially.
pub struct BulkMutation<'a> {
    noun: &'a str,
    noun_plural: &'a str,
    verb: &'a str,
    sink: &'a dyn FailureSink,
}

impl<'a> BulkMutation<'a> {
    /// A mutation named by its nouns and verb, reporting to [`TracingSink`].
    pub fn new(noun: &'a str, noun_plural: &'a str, verb: &'a str) -> Self {
        Self {
            noun,
            noun_plural,
            verb,
            sink: &TracingSink,
        }
    }

    /// A delete of resources of `kind`.
    pub fn delete(kind: &'a ResourceKind) -> Self {
        Self::new(kind.noun, kind.noun_plural, "delete")
    }

    /// Replaces the failure sink.
    pub fn sink(mut self, sink: &'a dyn FailureSink) -> Self {
        self.sink = sink;
        self
    }

    /// Resolves and mutates every token, collecting failures.
    ///
    /// `mutate` is called once per successfully resolved token, in order.
    pub fn run<T, H, R, M>(&self, tokens: &[T], mut resolve: R, mut mutate: M) -> BatchOutcome
    where
        T: AsRef<str>,
        R: FnMut(&str) -> Result<H>,
        M: FnMut(H) -> Result<()>,
    {
        let mut failures = Vec::new();
        for token in tokens {
            let token = token.as_ref();
            if let Err(failure) = Self::step(token, &mut resolve, &mut mutate) {
                self.sink.record(self.noun, self.verb, &failure);
                failures.push(failure);
            }
        }
        BatchOutcome {
            total: tokens.len(),
            failures,
            noun_plural: self.noun_plural.to_string(),
            verb: self.verb.to_string(),
        }
    }

    /// [`run`](Self::run) followed by [`BatchOutcome::into_result`].
    pub fn apply<T, H, R, M>(&self, tokens: &[T], resolve: R, mutate: M) -> Result<()>
    where
        T: AsRef<str>,
        R: FnMut(&str) -> Result<H>,
        M: FnMut(H) -> Result<()>,
    {
        self.run(tokens, resolve, mutate).into_result()
    }

    fn step<H, R, M>(
        token: &str,
        resolve: &mut R,
        mutate: &mut M,
    ) -> std::result::Result<(), FailureRecord>
    where
        R: FnMut(&str) -> Result<H>,
        M: FnMut(H) -> Result<()>,
    {
        let failure = |stage, error| FailureRecord {
            token: token.to_string(),
            stage,
            error,
        };
        let handle = resolve(token).map_err(|e| failure(Stage::Resolve, e))?;
        mutate(handle).map_err(|e| failure(Stage::Mutate, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Collect(RefCell<Vec<String>>);

    impl FailureSink for Collect {
        fn record(&self, noun: &str, verb: &str, failure: &FailureRecord) {
            self.0.borrow_mut().push(format!(
                "{} {} {} {}",
                verb, noun, failure.token, failure.stage
            ));
        }
    }

    fn not_found(token: &str) -> Error {
        Error::NotFound {
            kind: "aggregate".into(),
            token: token.into(),
        }
    }

    #[test]
    fn test_all_succeed_is_silent() {
        let sink = Collect::default();
        let mut mutated = Vec::new();
        let result = BulkMutation::new("aggregate", "aggregates", "delete")
            .sink(&sink)
            .apply(&["a", "b"], |t| Ok(t.to_string()), |h| {
                mutated.push(h);
                Ok(())
            });
        assert!(result.is_ok());
        assert_eq!(mutated, vec!["a", "b"]);
        assert!(sink.0.borrow().is_empty());
    }

    #[test]
    fn test_resolution_failure_skips_mutation() {
        let sink = Collect::default();
        let mut mutated = Vec::new();
        let outcome = BulkMutation::new("aggregate", "aggregates", "delete")
            .sink(&sink)
            .run(
                &["a", "bad-token"],
                |t| if t == "a" { Ok(t.to_string()) } else { Err(not_found(t)) },
                |h| {
                    mutated.push(h);
                    Ok(())
                },
            );
        assert_eq!(mutated, vec!["a"]);
        assert_eq!(outcome.total(), 2);
        assert_eq!(outcome.failed(), 1);
        assert_eq!(outcome.succeeded(), 1);
        assert_eq!(outcome.failures()[0].stage, Stage::Resolve);
        assert_eq!(*sink.0.borrow(), vec!["delete aggregate bad-token resolve"]);
        assert_eq!(
            outcome.into_result().unwrap_err().to_string(),
            "1 of 2 aggregates failed to delete."
        );
    }

    #[test]
    fn test_mutation_failure_is_recorded_and_loop_continues() {
        let sink = Collect::default();
        let mut seen = Vec::new();
        let outcome = BulkMutation::new("router", "routers", "delete").sink(&sink).run(
            &["r1", "r2", "r3"],
            |t| Ok(t.to_string()),
            |h| {
                seen.push(h.clone());
                if h == "r2" {
                    Err(Error::http(409, "Router r2 still has ports"))
                } else {
                    Ok(())
                }
            },
        );
        assert_eq!(seen, vec!["r1", "r2", "r3"]);
        assert_eq!(outcome.failed(), 1);
        let failure = &outcome.failures()[0];
        assert_eq!(failure.token, "r2");
        assert_eq!(failure.stage, Stage::Mutate);
        assert_eq!(failure.error.status(), Some(409));
    }

    #[test]
    fn test_every_item_fails() {
        let outcome = BulkMutation::new("rule", "rules", "delete")
            .sink(&Collect::default())
            .run(&["x", "y"], |t| Err::<String, _>(not_found(t)), |_| Ok(()));
        assert_eq!(
            outcome.into_result().unwrap_err(),
            Error::Batch {
                failed: 2,
                total: 2,
                noun: "rules".into(),
                verb: "delete".into()
            }
        );
    }

    #[test]
    fn test_empty_batch_succeeds() {
        let tokens: [&str; 0] = [];
        let outcome = BulkMutation::new("rule", "rules", "delete")
            .run(&tokens, |t| Ok(t.to_string()), |_| Ok(()));
        assert_eq!(outcome.total(), 0);
        assert!(outcome.is_success());
    }

    #[test]
    fn test_custom_verb() {
        let outcome = BulkMutation::new("qos spec", "qos specs", "disassociate")
            .sink(&Collect::default())
            .run(
                &["q"],
                |t| Ok(t.to_string()),
                |_| Err(Error::transport("boom")),
            );
        assert_eq!(
            outcome.into_result().unwrap_err().to_string(),
            "1 of 1 qos specs failed to disassociate."
        );
    }
}
