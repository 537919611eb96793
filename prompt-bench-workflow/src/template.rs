use once_cell::sync::Lazy;
use prompt_bench_core::domain::{Candidate, EvaluationTemplate};
use regex::{Captures, Regex};

pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are an expert evaluator. Provide objective, detailed assessments of LLM outputs.";

/// Built-in judge prompt, used when no template is configured.
pub const DEFAULT_TEMPLATE: &str = r#"Please evaluate the following LLM output.

**Original Prompt:**
{original_prompt}

**Configuration:** {config_name}

**LLM Response:**
{result}

**Evaluation Criteria:** {criteria}

Respond with your evaluation in the following JSON format:

```json
{
  "overall_score": <overall score 0-10>,
  "criteria_scores": {"<criterion>": <score 0-10>},
  "justification": "<why this score>",
  "strengths": ["<what the response does well>"],
  "weaknesses": ["<what could be improved>"]
}
```"#;

pub const DEFAULT_CRITERIA: [&str; 4] = ["accuracy", "relevance", "coherence", "completeness"];

pub fn default_template(model: impl Into<String>) -> EvaluationTemplate {
    let mut template = EvaluationTemplate::new(
        "Default judge",
        DEFAULT_TEMPLATE,
        DEFAULT_CRITERIA.iter().map(|c| c.to_string()).collect(),
        model,
    )
    .with_system_prompt(DEFAULT_SYSTEM_PROMPT);
    template.description = Some("General quality review on four criteria".to_string());
    template
}

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{(original_prompt|config_name|result|criteria)\}").expect("Invalid placeholder regex")
});

/// Fills the placeholders of `template` for one candidate in a single pass,
/// so placeholder-like text inside the candidate's prompt or output is left
/// alone. When the template never mentions `{result}`, the output is
/// appended under a "Response" heading so the judge always sees it.
pub fn render(template: &EvaluationTemplate, candidate: &Candidate) -> String {
    let criteria = if template.criteria.is_empty() {
        "overall quality".to_string()
    } else {
        template.criteria.join(", ")
    };

    let mut has_result = false;
    let mut rendered = PLACEHOLDER
        .replace_all(&template.template, |caps: &Captures<'_>| match &caps[1] {
            "original_prompt" => candidate.rendered_prompt.clone(),
            "config_name" => candidate.config_name.clone(),
            "criteria" => criteria.clone(),
            _ => {
                has_result = true;
                candidate.output.clone()
            }
        })
        .into_owned();

    if !has_result {
        rendered.push_str("\n\n**Response:**\n");
        rendered.push_str(&candidate.output);
    }

    rendered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate() -> Candidate {
        Candidate::new("c1", "summarize", "fast", 1.0, None).with_output("Summarize X", "X is short.")
    }

    #[test]
    fn test_render_substitutes_placeholders() {
        let template = EvaluationTemplate::new(
            "t",
            "Prompt: {original_prompt}\nConfig: {config_name}\nAnswer: {result}\nJudge on {criteria}",
            vec!["accuracy".to_string(), "tone".to_string()],
            "gpt-4o",
        );

        assert_eq!(
            render(&template, &candidate()),
            "Prompt: Summarize X\nConfig: fast\nAnswer: X is short.\nJudge on accuracy, tone"
        );
    }

    #[test]
    fn test_render_appends_missing_result() {
        let template = EvaluationTemplate::new("t", "Rate the answer to: {original_prompt}", vec![], "gpt-4o");
        let rendered = render(&template, &candidate());

        assert!(rendered.starts_with("Rate the answer to: Summarize X"));
        assert!(rendered.ends_with("**Response:**\nX is short."));
    }

    #[test]
    fn test_render_leaves_placeholders_in_candidate_text() {
        let candidate = Candidate::new("c1", "summarize", "fast", 1.0, None)
            .with_output("Explain {config_name} and {result}", "Uses {criteria} literally.");
        let template = EvaluationTemplate::new(
            "t",
            "Prompt: {original_prompt}\nAnswer: {result}",
            vec!["accuracy".to_string()],
            "gpt-4o",
        );

        assert_eq!(
            render(&template, &candidate),
            "Prompt: Explain {config_name} and {result}\nAnswer: Uses {criteria} literally."
        );
    }

    #[test]
    fn test_render_appends_result_when_only_prompt_mentions_it() {
        let candidate =
            Candidate::new("c1", "summarize", "fast", 1.0, None).with_output("Fill in {result}", "Done.");
        let template = EvaluationTemplate::new("t", "Rate: {original_prompt}", vec![], "gpt-4o");

        assert_eq!(
            render(&template, &candidate),
            "Rate: Fill in {result}\n\n**Response:**\nDone."
        );
    }

    #[test]
    fn test_default_template_keeps_json_braces() {
        let rendered = render(&default_template("gpt-4o"), &candidate());
        assert!(rendered.contains("\"overall_score\""));
        assert!(rendered.contains("X is short."));
        assert!(rendered.contains("accuracy, relevance, coherence, completeness"));
    }
}
