//! Runs generated tests against generated code in a scratch directory.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use autodev_core::{CodeSnippet, TestCase, TestExecutionResult};
use tokio::process::Command;
use tracing::{debug, warn};

/// Map a language name to the file extension used when writing it to disk.
pub fn file_extension(language: &str) -> &'static str {
    match language.to_lowercase().as_str() {
        "python" => "py",
        "javascript" => "js",
        "typescript" => "ts",
        "java" => "java",
        "c" => "c",
        "cpp" | "c++" => "cpp",
        "csharp" | "c#" => "cs",
        "go" => "go",
        "ruby" => "rb",
        "php" => "php",
        "swift" => "swift",
        "kotlin" => "kt",
        "rust" => "rs",
        _ => "txt",
    }
}

struct RunOutput {
    success: bool,
    stdout: String,
    stderr: String,
}

pub struct TestExecutor {
    timeout: Duration,
    python: String,
    node: String,
}

impl Default for TestExecutor {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

impl TestExecutor {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            python: "python".to_string(),
            node: "node".to_string(),
        }
    }

    /// Use a different python interpreter, e.g. `python3`.
    pub fn with_python(mut self, program: impl Into<String>) -> Self {
        self.python = program.into();
        self
    }

    pub fn with_node(mut self, program: impl Into<String>) -> Self {
        self.node = program.into();
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run `test` against the snippets it references. Every failure mode
    /// is reported as a failed result.
    pub async fn execute(&self, test: &TestCase, snippets: &[CodeSnippet]) -> TestExecutionResult {
        let referenced: Vec<&CodeSnippet> = test
            .code_snippet_ids
            .iter()
            .filter_map(|id| snippets.iter().find(|s| &s.id == id))
            .collect();

        let Some(first) = referenced.first() else {
            return TestExecutionResult::failed(
                &test.id,
                "",
                "Could not determine language for test execution",
            );
        };
        let language = first.language.to_lowercase();
        let ext = file_extension(&language);

        let dir = match tempfile::tempdir() {
            Ok(dir) => dir,
            Err(e) => return TestExecutionResult::failed(&test.id, "", format!("Error executing test: {}", e)),
        };

        let test_file = match write_sources(dir.path(), test, &referenced, ext).await {
            Ok(path) => path,
            Err(e) => return TestExecutionResult::failed(&test.id, "", format!("Error executing test: {}", e)),
        };

        let run = match language.as_str() {
            "python" => self.run_python(dir.path(), &test_file).await,
            "javascript" | "typescript" => {
                self.run(Command::new(&self.node).arg(&test_file).current_dir(dir.path()))
                    .await
            }
            _ => {
                return TestExecutionResult::failed(
                    &test.id,
                    "",
                    format!("Unsupported language for direct execution: {}", language),
                )
            }
        };

        match run {
            Ok(Some(output)) if output.success => TestExecutionResult::passed(&test.id, output.stdout),
            Ok(Some(output)) => TestExecutionResult::failed(&test.id, output.stdout, output.stderr),
            Ok(None) => TestExecutionResult::failed(
                &test.id,
                "Test execution timed out",
                format!("Execution took longer than {} seconds", self.timeout.as_secs()),
            ),
            Err(e) => TestExecutionResult::failed(&test.id, "", format!("Error executing test: {}", e)),
        }
    }

    async fn run_python(&self, dir: &Path, test_file: &Path) -> std::io::Result<Option<RunOutput>> {
        let pytest = self
            .run(
                Command::new(&self.python)
                    .args(["-m", "pytest"])
                    .arg(test_file)
                    .arg("-v")
                    .current_dir(dir),
            )
            .await;

        let pytest_missing = match &pytest {
            Err(_) => true,
            Ok(Some(output)) => output.stderr.contains("No module named pytest"),
            Ok(None) => false,
        };
        if !pytest_missing {
            return pytest;
        }

        debug!("pytest unavailable, running {} directly", test_file.display());
        self.run(Command::new(&self.python).arg(test_file).current_dir(dir))
            .await
    }

    /// `Ok(None)` means the timeout elapsed.
    async fn run(&self, command: &mut Command) -> std::io::Result<Option<RunOutput>> {
        command
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(output) => {
                let output = output?;
                Ok(Some(RunOutput {
                    success: output.status.success(),
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                }))
            }
            Err(_) => {
                warn!("Test run exceeded {:?}", self.timeout);
                Ok(None)
            }
        }
    }
}

/// Write every snippet plus the test file into `dir`, returning the test
/// file path.
async fn write_sources(
    dir: &Path,
    test: &TestCase,
    snippets: &[&CodeSnippet],
    ext: &str,
) -> std::io::Result<PathBuf> {
    for snippet in snippets {
        let name = snippet
            .file_path
            .as_deref()
            .and_then(|p| Path::new(p).file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("code_{}.{}", snippet.id, ext));
        tokio::fs::write(dir.join(name), &snippet.code).await?;
    }

    let test_file = dir.join(format!("test_{}.{}", test.id, ext));
    tokio::fs::write(&test_file, &test.test_code).await?;
    Ok(test_file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("Python"), "py");
        assert_eq!(file_extension("c++"), "cpp");
        assert_eq!(file_extension("C#"), "cs");
        assert_eq!(file_extension("kotlin"), "kt");
        assert_eq!(file_extension("cobol"), "txt");
    }

    #[tokio::test]
    async fn test_unknown_snippet() {
        let executor = TestExecutor::default();
        let test = TestCase::new("T1", "t", "assert True").for_snippet("missing");
        let result = executor.execute(&test, &[]).await;
        assert!(!result.passed);
        assert_eq!(
            result.error_message.as_deref(),
            Some("Could not determine language for test execution")
        );
    }

    #[tokio::test]
    async fn test_unsupported_language() {
        let executor = TestExecutor::default();
        let snippet = CodeSnippet::new("C1", "fn main() {}", "rust");
        let test = TestCase::new("T1", "t", "").for_snippet("C1");
        let result = executor.execute(&test, &[snippet]).await;
        assert!(!result.passed);
        assert!(result
            .error_message
            .unwrap()
            .starts_with("Unsupported language for direct execution"));
    }

    #[tokio::test]
    async fn test_write_sources_layout() {
        let dir = tempfile::tempdir().unwrap();
        let a = CodeSnippet::new("A", "x = 1", "python").with_file_path("src/app/calc.py");
        let b = CodeSnippet::new("B", "y = 2", "python");
        let test = TestCase::new("T9", "t", "assert True");

        let path = write_sources(dir.path(), &test, &[&a, &b], "py").await.unwrap();
        assert_eq!(path, dir.path().join("test_T9.py"));
        assert!(dir.path().join("calc.py").exists());
        assert!(dir.path().join("code_B.py").exists());
    }
}
