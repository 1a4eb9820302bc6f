//! The generation service seen from the controller.

use async_trait::async_trait;

use super::client::GenError;
use crate::script::{Language, Script};

/// AI-backed script generation and translation.
///
/// Implementations must be stateless from the caller's point of view: the
/// controller may issue several calls concurrently and expects each to resolve
/// independently.
#[async_trait]
pub trait ScriptGenerator: Send + Sync {
    /// Write a new script about `topic` in `language`.
    async fn generate(&self, topic: &str, language: Language) -> Result<Script, GenError>;

    /// Rewrite `script` in `target`.
    async fn translate(&self, script: &Script, target: Language) -> Result<Script, GenError>;
}
