//! Unified Pipeline Stage Trait
//!
//! Every stage of the production pipeline (styling, rendering, critique)
//! implements the same shape: one input type, one output type, one error
//! type. The pipeline driver composes stages explicitly instead of relying
//! on a shared base hierarchy, which keeps each stage independently
//! constructible and mockable in tests.

use async_trait::async_trait;

/// A single pipeline stage: consumes one input, produces one output or fails.
///
/// Stages must be `Send + Sync` so the driver can hold them behind `Arc<dyn>`
/// trait objects. The optional `preflight` hook lets a stage verify its
/// external dependencies (e.g. a CLI tool on `PATH`) before any artifact work
/// begins.
#[async_trait]
pub trait PipelineStage: Send + Sync {
    type Input: Send;
    type Output: Send;
    type Error: std::error::Error + Send + Sync;

    /// Stage name for logging.
    fn name(&self) -> &'static str;

    /// Verify external dependencies. Called once per run, before the first
    /// stage executes. Default: nothing to check.
    async fn preflight(&self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Execute the stage.
    async fn run(&self, input: Self::Input) -> Result<Self::Output, Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    struct Doubler;

    #[async_trait]
    impl PipelineStage for Doubler {
        type Input = u32;
        type Output = u32;
        type Error = CoreError;

        fn name(&self) -> &'static str {
            "doubler"
        }

        async fn run(&self, input: u32) -> Result<u32, CoreError> {
            Ok(input * 2)
        }
    }

    struct NoTool;

    #[async_trait]
    impl PipelineStage for NoTool {
        type Input = ();
        type Output = ();
        type Error = CoreError;

        fn name(&self) -> &'static str {
            "no-tool"
        }

        async fn preflight(&self) -> Result<(), CoreError> {
            Err(CoreError::not_found("potrace"))
        }

        async fn run(&self, _input: ()) -> Result<(), CoreError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_stage_runs() {
        let stage = Doubler;
        assert_eq!(stage.name(), "doubler");
        assert!(stage.preflight().await.is_ok());
        assert_eq!(stage.run(21).await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_preflight_can_fail() {
        let stage = NoTool;
        assert!(stage.preflight().await.is_err());
    }

    #[tokio::test]
    async fn test_stage_as_trait_object() {
        let stage: std::sync::Arc<
            dyn PipelineStage<Input = u32, Output = u32, Error = CoreError>,
        > = std::sync::Arc::new(Doubler);
        assert_eq!(stage.run(5).await.unwrap(), 10);
    }
}
