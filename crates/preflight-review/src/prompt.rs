use crate::llm::{ChatMessage, Role};

const SYSTEM_PROMPT: &str = "\
You are Preflight, an expert code reviewer running before a change is shared. \
Your job is to find genuine bugs, security issues, and significant problems in the diff.

Rules:
- Only report issues you are confident about
- Reference line numbers in the new version of the file
- Do not comment on style or formatting unless it causes a bug
- Focus on: bugs, security vulnerabilities, logic errors, resource leaks, error handling

Respond with a JSON array and nothing else. Each element has this shape:
{
  \"file\": \"path/to/file\",
  \"line\": {\"start\": 10, \"end\": 12},
  \"severity\": \"CRITICAL\" | \"HIGH\" | \"MEDIUM\" | \"LOW\" | \"INFO\",
  \"description\": \"What is wrong and why it matters\",
  \"suggestion\": \"How to fix it\",
  \"codeSnippet\": \"Optional excerpt of the offending code\"
}

If you find no issues, return: []";

/// Build the system prompt describing the expected record format.
///
/// # Examples
///
/// ```
/// use preflight_review::prompt::build_system_prompt;
///
/// let prompt = build_system_prompt();
/// assert!(prompt.contains("codeSnippet"));
/// ```
pub fn build_system_prompt() -> String {
    SYSTEM_PROMPT.to_string()
}

/// Build the user prompt containing the change to review.
///
/// # Examples
///
/// ```
/// use preflight_review::prompt::build_review_prompt;
///
/// let prompt = build_review_prompt("+new line");
/// assert!(prompt.contains("<diff>\n+new line\n</diff>"));
/// ```
pub fn build_review_prompt(diff: &str) -> String {
    format!("Analyze the following git diff:\n\n<diff>\n{diff}\n</diff>")
}

/// System and user messages for one review request.
pub fn review_messages(diff: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage {
            role: Role::System,
            content: build_system_prompt(),
        },
        ChatMessage {
            role: Role::User,
            content: build_review_prompt(diff),
        },
    ]
}
