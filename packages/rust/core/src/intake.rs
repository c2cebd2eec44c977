//! Intake gate: which questions are answered, and whether chat may start.

use botdemo_shared::{DemoError, IntakeAnswer, IntakeQuestion, IntakeResponses, Result};

/// Whether `question_id` has a non-empty answer.
pub fn is_answered(responses: &IntakeResponses, question_id: &str) -> bool {
    responses
        .get(question_id)
        .is_some_and(IntakeAnswer::is_answered)
}

/// Ids of required questions that are still unanswered, in declared order.
pub fn missing_required(questions: &[IntakeQuestion], responses: &IntakeResponses) -> Vec<String> {
    questions
        .iter()
        .filter(|q| q.required && !is_answered(responses, &q.id))
        .map(|q| q.id.clone())
        .collect()
}

/// The gate consumed by `start_chat`.
pub fn required_answered(questions: &[IntakeQuestion], responses: &IntakeResponses) -> bool {
    questions
        .iter()
        .filter(|q| q.required)
        .all(|q| is_answered(responses, &q.id))
}

/// Number of declared questions with a non-empty answer.
///
/// Answers keyed by unknown ids are not counted.
pub fn answered_count(questions: &[IntakeQuestion], responses: &IntakeResponses) -> usize {
    questions
        .iter()
        .filter(|q| is_answered(responses, &q.id))
        .count()
}

/// Check that `answer` fits `question`'s kind and options.
///
/// Front-ends call this before `update_intake`; the session itself stores
/// whatever it is given.
pub fn validate_answer(question: &IntakeQuestion, answer: &IntakeAnswer) -> Result<()> {
    use botdemo_shared::QuestionKind::*;

    let offered = |value: &str| question.options.iter().any(|o| o == value);

    match (question.kind, answer) {
        (Text | Textarea, IntakeAnswer::Single(_)) => Ok(()),
        (Select, IntakeAnswer::Single(value)) if value.is_empty() || offered(value) => Ok(()),
        (Multiselect, IntakeAnswer::Multi(values)) => {
            match values.iter().find(|v| !offered(v)) {
                Some(bad) => Err(DemoError::validation(format!(
                    "'{bad}' is not an option of '{}'",
                    question.id
                ))),
                None => Ok(()),
            }
        }
        (Select, IntakeAnswer::Single(value)) => Err(DemoError::validation(format!(
            "'{value}' is not an option of '{}'",
            question.id
        ))),
        (Multiselect, IntakeAnswer::Single(_)) => Err(DemoError::validation(format!(
            "'{}' takes a list of options",
            question.id
        ))),
        (_, IntakeAnswer::Multi(_)) => Err(DemoError::validation(format!(
            "'{}' takes a single value",
            question.id
        ))),
    }
}
