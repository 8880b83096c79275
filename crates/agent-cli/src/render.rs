//! Terminal Rendering

use agent_core::TranscriptLine;

const BANNER_WIDTH: usize = 60;

/// One transcript line as printed; reasoning gets a blank line above it
pub fn line(line: &TranscriptLine) -> String {
    match line {
        TranscriptLine::Reasoning { .. } => format!("\n{}", line),
        _ => line.to_string(),
    }
}

pub fn final_answer(answer: &str) -> String {
    format!("\n=== Final Answer ===\n{}", answer)
}

pub fn agent_response(text: &str) -> String {
    format!("\nAgent Response:\n{}\n", text)
}

pub fn question_banner(question: &str) -> String {
    let rule = "=".repeat(BANNER_WIDTH);
    format!("\n{rule}\nQuestion: {question}\n{rule}\n")
}

pub fn usage() -> String {
    [
        r#"Usage: sql-agent "<your question about the database>""#,
        r#"Example: sql-agent "Show me the first 5 rows from system.tables""#,
    ]
    .join("\n")
}
