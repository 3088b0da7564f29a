//! Character generator backed by an external program.
//!
//! Each call spawns the configured command, writes the JSON
//! `GeneratorContext` to its stdin and reads the character's response from
//! its stdout. The child is killed if the call is dropped, which is how the
//! orchestrator's timeout cancels a stuck generator.

use std::process::Stdio;

use async_trait::async_trait;
use parley_core::error::EngineError;
use parley_session::application::generator::CharacterGenerator;
use parley_session::domain::context::GeneratorContext;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// Longest stderr excerpt carried into an error message.
const STDERR_EXCERPT_CHARS: usize = 200;

/// Runs `program args...` once per generated response.
#[derive(Debug, Clone)]
pub struct CommandGenerator {
    program: String,
    args: Vec<String>,
}

impl CommandGenerator {
    /// Builds a generator from a command line split into words.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Configuration` if `command` is empty.
    pub fn new(command: &[String]) -> Result<Self, EngineError> {
        let (program, args) = command.split_first().ok_or_else(|| {
            EngineError::Configuration("generator command must not be empty".to_owned())
        })?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

#[async_trait]
impl CharacterGenerator for CommandGenerator {
    async fn generate(&self, context: &GeneratorContext) -> Result<String, EngineError> {
        let input = serde_json::to_vec(context).map_err(|e| {
            EngineError::Infrastructure(format!("cannot serialize generator context: {e}"))
        })?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                EngineError::GeneratorUnavailable(format!("cannot start '{}': {e}", self.program))
            })?;

        // Stdin is fed while stdout is drained, so a child that writes
        // before it reads cannot block on a full pipe.
        let stdin = child.stdin.take();
        let feed_input = async move {
            if let Some(mut stdin) = stdin {
                // A generator may answer without reading its input.
                if let Err(err) = stdin.write_all(&input).await {
                    debug!(error = %err, "generator closed stdin early");
                }
            }
        };
        let ((), output) = tokio::join!(feed_input, child.wait_with_output());
        let output = output.map_err(|e| {
            EngineError::GeneratorUnavailable(format!("'{}' failed: {e}", self.program))
        })?;
        if !output.status.success() {
            let stderr: String = String::from_utf8_lossy(&output.stderr)
                .trim()
                .chars()
                .take(STDERR_EXCERPT_CHARS)
                .collect();
            warn!(
                session_id = %context.session_id,
                status = %output.status,
                stderr = %stderr,
                "generator exited unsuccessfully"
            );
            return Err(EngineError::GeneratorUnavailable(format!(
                "'{}' exited with {}: {stderr}",
                self.program, output.status
            )));
        }

        let text = String::from_utf8(output.stdout).map_err(|_| {
            EngineError::GeneratorUnavailable(format!("'{}' wrote invalid UTF-8", self.program))
        })?;
        let text = text.trim();
        if text.is_empty() {
            return Err(EngineError::GeneratorUnavailable(format!(
                "'{}' produced no output",
                self.program
            )));
        }
        Ok(text.to_owned())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use parley_session::domain::context::filter_for_character_generator;
    use parley_session::domain::state::SessionState;
    use parley_test_support::fixtures::{SAMPLE_SCENARIO_ID, sample_registry, start_time};
    use uuid::Uuid;

    use super::*;

    fn context() -> GeneratorContext {
        let registry = sample_registry();
        let registered = registry.get(SAMPLE_SCENARIO_ID).unwrap();
        let session = SessionState::create(
            Uuid::new_v4(),
            Arc::clone(&registered.config),
            registered.fingerprint.clone(),
            "blob",
            start_time(),
        )
        .unwrap();
        filter_for_character_generator(&session, "I wave")
    }

    fn shell(script: &str) -> CommandGenerator {
        CommandGenerator::new(&["sh".to_owned(), "-c".to_owned(), script.to_owned()]).unwrap()
    }

    #[tokio::test]
    async fn test_stdout_becomes_the_response() {
        let generator = shell("cat > /dev/null; echo '  It drifts closer.  '");

        let text = generator.generate(&context()).await.unwrap();

        assert_eq!(text, "It drifts closer.");
    }

    #[tokio::test]
    async fn test_context_is_written_to_stdin_as_json() {
        // Arrange
        let generator = CommandGenerator::new(&["cat".to_owned()]).unwrap();
        let context = context();

        // Act
        let echoed = generator.generate(&context).await.unwrap();

        // Assert
        let parsed: GeneratorContext = serde_json::from_str(&echoed).unwrap();
        assert_eq!(parsed, context);
    }

    #[tokio::test]
    async fn test_large_output_written_before_reading_input_does_not_stall() {
        // Arrange: both payloads exceed a pipe buffer.
        let generator = shell("head -c 200000 /dev/zero | tr '\\0' x; cat > /dev/null");
        let mut context = context();
        context.participant_action = "wave ".repeat(40_000);

        // Act
        let result =
            tokio::time::timeout(Duration::from_secs(5), generator.generate(&context)).await;

        // Assert
        let text = result.expect("generator stalled").unwrap();
        assert_eq!(text.len(), 200_000);
        assert!(text.chars().all(|c| c == 'x'));
    }

    #[tokio::test]
    async fn test_failing_command_is_unavailable() {
        let generator = shell("echo 'model offline' >&2; exit 3");

        let result = generator.generate(&context()).await;

        match result {
            Err(EngineError::GeneratorUnavailable(message)) => {
                assert!(message.contains("model offline"));
            }
            other => panic!("expected GeneratorUnavailable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_program_is_unavailable() {
        let generator = CommandGenerator::new(&["parley-no-such-generator".to_owned()]).unwrap();

        let result = generator.generate(&context()).await;

        assert!(matches!(result, Err(EngineError::GeneratorUnavailable(_))));
    }

    #[tokio::test]
    async fn test_empty_output_is_unavailable() {
        let generator = shell("cat > /dev/null");

        let result = generator.generate(&context()).await;

        assert!(matches!(result, Err(EngineError::GeneratorUnavailable(_))));
    }

    #[tokio::test]
    async fn test_dropped_call_does_not_wait_for_the_child() {
        let generator = shell("sleep 5; echo late");

        let result =
            tokio::time::timeout(Duration::from_millis(100), generator.generate(&context())).await;

        assert!(result.is_err());
    }

    #[test]
    fn test_empty_command_is_rejected() {
        assert!(matches!(
            CommandGenerator::new(&[]),
            Err(EngineError::Configuration(_))
        ));
    }
}
