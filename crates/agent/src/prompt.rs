//! Prompt text the tool caller injects into the ledger.

use chrono::NaiveDate;

const BASE_SYSTEM_PROMPT: &str = "\
You are a research assistant with broad knowledge of software engineering. \
You answer the user's task by using tools and reporting what you found.

====

TOOL USE

You can use one tool per message and will receive the result of that tool \
use in the next message. Work step by step: each tool use is informed by the \
result of the previous one.

# Tool Use Guidelines

1. Choose the tool that best fits the current step. Decide whether you need \
more information and which tool gathers it most effectively.
2. Use one tool at a time. Do not assume the outcome of a tool use; base each \
step on the previous result.
3. Do not use the same tool twice for the same purpose.
4. Tasks can be vague. When the user's intent is unclear, use ask_to_user to \
confirm it.
5. Once you have decided on a plan, tell the user with report_to_user.
6. Include the URLs of the sources that support your answer.
7. When using infer_knowledge_by_url, state the background and objective of \
what_to_search clearly and in detail.
8. When the task is finished, call complete with a full summary of the result.
";

/// The built-in system prompt, ending with today's date.
pub fn system_prompt(today: NaiveDate) -> String {
    with_date(BASE_SYSTEM_PROMPT, today)
}

/// Append the date line to a caller-supplied prompt.
pub fn with_date(prompt: &str, today: NaiveDate) -> String {
    format!("{}\nToday is {}.", prompt.trim_end(), today.format("%Y-%m-%d"))
}

/// User turn appended after the model answers without choosing a tool.
pub fn idle_nudge(current_task: &str) -> String {
    format!("No tool was selected. Think about which tool to use for the task: {current_task}")
}

/// Ledger text for a tool that ran.
pub fn tool_output(tool_name: &str, output: &str, current_task: &str) -> String {
    format!(
        "tool used: {tool_name}\n<result>\n{output}\n</result>\nThink about what to do next.\n\nTask: {current_task}"
    )
}

/// Ledger text for a tool that failed or could not be run.
pub fn tool_failure(tool_name: &str, error: &str) -> String {
    format!("tool used: {tool_name}\n<failed>\n{error}\n</failed>")
}
