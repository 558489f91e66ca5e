//! Resolution of free text into a structured intent guess.
//!
//! A resolver only guesses; the dispatcher validates whatever comes back
//! against the intent schema before touching the graph. Resolvers report
//! their own failures as [`DomainError::ResolverUnavailable`](crate::DomainError::ResolverUnavailable)
//! and report unintelligible input as an `unknown` intent.

mod keyword;
mod parse;

use async_trait::async_trait;

use crate::error::DomainResult;
use crate::intent::ResolvedIntent;

pub use keyword::KeywordResolver;
pub use parse::parse_structured_output;

/// Trait for turning a raw command into a structured intent guess.
#[async_trait]
pub trait IntentResolver: Send + Sync {
    /// Resolves raw text into an intent guess with a confidence in `0..=1`.
    async fn resolve(&self, text: &str) -> DomainResult<ResolvedIntent>;

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}
