//! Plain-text transcripts for resolved runs.
//!
//! The transcript is the output pane's entire content. The parsed numeric
//! status id picks the shape: 6 and above renders the error transcript
//! (verdict, compiler diagnostics, then whatever made it to stdout), anything
//! below renders the success transcript (stdout, verdict, resource usage).

use codelab_api_types::SubmissionResult;

pub fn render(result: &SubmissionResult) -> String {
    if result.is_error_verdict() {
        return render_error(result);
    }
    render_success(result)
}

/// Synthesized locally when the polling budget elapses with no verdict.
/// Distinct from a judge-reported Time Limit Exceeded: resource usage is
/// zeroed because nothing was measured.
pub fn timed_out() -> String {
    [
        "[Time Limit Exceeded]",
        "",
        "No verdict arrived before the polling budget elapsed.",
        "Time: 0.00s  Memory: 0kb",
    ]
    .join("\n")
}

fn render_success(result: &SubmissionResult) -> String {
    let stdout = result.stdout.as_deref().unwrap_or("(no output)");
    let time = result.time.as_deref().unwrap_or("0.00");
    let memory = result.memory.unwrap_or(0);

    format!(
        "{stdout}\n\n[{status}]\nTime: {time}s  Memory: {memory}kb",
        status = result.status.description(),
    )
}

fn render_error(result: &SubmissionResult) -> String {
    let mut sections = vec![format!("[{}]", result.status.description())];

    if let Some(compile_output) = result.compile_output.as_deref() {
        if !compile_output.trim().is_empty() {
            sections.push(compile_output.trim_end().to_string());
        }
    }
    if let Some(stdout) = result.stdout.as_deref() {
        if !stdout.trim().is_empty() {
            sections.push(stdout.trim_end().to_string());
        }
    }

    sections.join("\n\n")
}
