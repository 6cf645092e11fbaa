// Prompt text for the candidate summary.

/// Separator between retrieved chunks in the context block.
pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// Renders the candidate-matching prompt.
///
/// Braces in the query or in resume text are passed through untouched.
pub fn candidate_prompt(query: &str, context: &str) -> String {
    format!(
        "From the following resume content, identify candidates\n\
         matching these skills: {query}\n\
         \n\
         Resume Content:\n\
         {context}\n"
    )
}
