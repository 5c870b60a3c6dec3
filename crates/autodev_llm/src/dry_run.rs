//! Canned replies used when no model is called.
//!
//! Each reply schema knows how to fabricate a plausible value of itself from
//! the prompt variables, so a whole workflow can run offline.

use autodev_core::{
    CodeReview, CodeSnippet, ExecutionPlan, PlanStep, Priority, Requirement, TaskStatus,
    TechnicalTask, TestCase, TestStatus,
};

use crate::prompt::PromptVars;
use crate::schema::{
    BugFixReply, CodeReply, DocumentationDraft, DocumentationReply, IssuesReply,
    RequirementsReply, TasksReply, TestsReply,
};

/// Identifier used for every fabricated record.
pub const DRY_RUN_ID: &str = "DRYRUN";

/// Program returned for every code generation request in dry-run mode.
pub const DRY_RUN_CODE: &str = r#"def add_numbers(a, b):
    """Add two numbers and return the result."""
    return a + b

# Example usage
if __name__ == "__main__":
    num1 = float(input("Enter first number: "))
    num2 = float(input("Enter second number: "))
    result = add_numbers(num1, num2)
    print(f"The sum of {num1} and {num2} is {result}")"#;

pub trait DryRunDefault: Sized {
    fn dry_run(vars: &PromptVars) -> Self;
}

/// Lowercased `description` variable, or every variable when it is absent.
fn input_text(vars: &PromptVars) -> String {
    match vars.get("description") {
        Some(description) => description.to_lowercase(),
        None => vars
            .values()
            .map(|v| v.to_lowercase())
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

impl DryRunDefault for RequirementsReply {
    fn dry_run(_vars: &PromptVars) -> Self {
        Self {
            requirements: vec![Requirement::new(DRY_RUN_ID, "Dry Run").with_priority(Priority::High)],
        }
    }
}

impl DryRunDefault for TasksReply {
    fn dry_run(vars: &PromptVars) -> Self {
        let text = input_text(vars);
        let description = if text.contains("add") && text.contains("number") {
            "Create a function to add two numbers with user input"
        } else if text.contains("calculator") {
            "Build a calculator with basic arithmetic operations"
        } else {
            "Dry Run"
        };

        let mut task = TechnicalTask::new(DRY_RUN_ID, "Code Generation", description);
        task.requirement_ids = vec![DRY_RUN_ID.to_string()];
        task.priority = Priority::High;
        task.estimated_effort = Some("1h".to_string());
        task.status = TaskStatus::Pending;
        Self { tasks: vec![task] }
    }
}

impl DryRunDefault for CodeReply {
    fn dry_run(_vars: &PromptVars) -> Self {
        let mut snippet = CodeSnippet::new(DRY_RUN_ID, DRY_RUN_CODE, "python").with_file_path("main.py");
        snippet.title = Some("Generated Code".to_string());
        Self {
            code_snippets: vec![snippet],
        }
    }
}

impl DryRunDefault for TestsReply {
    fn dry_run(_vars: &PromptVars) -> Self {
        let mut test = TestCase::new(DRY_RUN_ID, "Dry Run", "assert True");
        test.description = "Dry Run".to_string();
        test.expected_result = DRY_RUN_ID.to_string();
        test.status = TestStatus::Pending;
        Self {
            test_cases: vec![test],
        }
    }
}

impl DryRunDefault for CodeReview {
    fn dry_run(_vars: &PromptVars) -> Self {
        Self {
            review_passed: true,
            issues: Vec::new(),
            suggestions: Vec::new(),
        }
    }
}

impl DryRunDefault for IssuesReply {
    fn dry_run(_vars: &PromptVars) -> Self {
        Self { issues: Vec::new() }
    }
}

impl DryRunDefault for BugFixReply {
    fn dry_run(_vars: &PromptVars) -> Self {
        Self {
            fixed_code: String::new(),
            changes_made: Vec::new(),
            confidence: 0.0,
        }
    }
}

impl DryRunDefault for DocumentationReply {
    fn dry_run(_vars: &PromptVars) -> Self {
        Self {
            documentation: DocumentationDraft {
                id: Some("DOC-DRYRUN".to_string()),
                title: "Dry Run".to_string(),
                content: String::new(),
                code_snippet_ids: None,
                doc_type: None,
            },
        }
    }
}

/// Five-step plan for a generic Python service.
impl DryRunDefault for ExecutionPlan {
    fn dry_run(vars: &PromptVars) -> Self {
        let requirement = vars.get("requirement").cloned().unwrap_or_default();
        let head: String = requirement.chars().take(50).collect();

        let steps = vec![
            PlanStep::new(
                1,
                "Project Structure Setup",
                "Create the basic project structure with proper organization of modules and configuration files.",
            )
            .estimated("30 minutes")
            .creates(&["src/__init__.py", "src/main.py", "config.py", "requirements.txt", "README.md"])
            .functions(&["setup_project_structure", "initialize_config"])
            .complexity("low"),
            PlanStep::new(
                2,
                "Core Logic Implementation",
                "Implement the main business logic and core functionality as specified in requirements.",
            )
            .estimated("2 hours")
            .depends_on(&[1])
            .creates(&["src/core.py", "src/models.py", "src/utils.py"])
            .functions(&["process_request", "validate_input", "handle_business_logic"])
            .complexity("medium"),
            PlanStep::new(
                3,
                "API Interface Development",
                "Create API endpoints with proper validation, error handling, and documentation.",
            )
            .estimated("1.5 hours")
            .depends_on(&[2])
            .creates(&["src/api.py", "src/schemas.py"])
            .modifies(&["src/main.py"])
            .functions(&["create_endpoints", "setup_middleware", "handle_errors"])
            .complexity("medium"),
            PlanStep::new(
                4,
                "Testing Implementation",
                "Create comprehensive unit tests and integration tests with proper fixtures.",
            )
            .estimated("1 hour")
            .depends_on(&[2, 3])
            .creates(&["tests/__init__.py", "tests/test_core.py", "tests/test_api.py"])
            .functions(&["test_core_functionality", "test_api_endpoints", "setup_test_fixtures"])
            .complexity("medium"),
            PlanStep::new(
                5,
                "Documentation and Finalization",
                "Complete documentation, add usage examples, and perform final code review.",
            )
            .estimated("45 minutes")
            .depends_on(&[4])
            .modifies(&["README.md"])
            .creates(&["docs/api.md", "examples/usage.py"])
            .functions(&["generate_docs", "create_examples", "final_validation"])
            .complexity("low"),
        ];

        ExecutionPlan {
            summary: format!("Comprehensive implementation plan for: {}...", head),
            requirement,
            total_estimated_time: "3-5 hours".to_string(),
            architecture_overview: "Modular design with separation of concerns. Clean architecture \
                pattern with distinct layers for presentation, business logic, and data access."
                .to_string(),
            technology_stack: ["Python 3.9+", "FastAPI", "Pydantic", "Pytest", "Black", "Mypy"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            steps,
            risk_assessment: "Low to medium risk project. Main challenges: proper error handling, \
                performance optimization, external dependencies. Mitigation: thorough testing, \
                performance profiling, fallback mechanisms."
                .to_string(),
            success_criteria: [
                "All core functionality implemented and tested",
                "API endpoints respond correctly with proper status codes",
                "Unit test coverage above 85%",
                "Documentation is complete and accurate",
                "Code passes linting and type checking",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            project_structure: [
                "src/",
                "├── __init__.py",
                "├── main.py",
                "├── core.py",
                "├── models.py",
                "├── utils.py",
                "├── api.py",
                "└── schemas.py",
                "tests/",
                "├── __init__.py",
                "├── test_core.py",
                "└── test_api.py",
                "config.py",
                "requirements.txt",
                "README.md",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            testing_strategy: "Comprehensive testing with unit tests for core logic, integration \
                tests for API endpoints, and end-to-end tests for critical workflows. Use pytest \
                with fixtures and mocking."
                .to_string(),
        }
    }
}
