//! Prompt templates for answering, synthesis and question generation

use crate::cache::ConversationMessage;
use std::fmt::Write;

/// Prompt for answering one question against one transcript chunk
pub fn answer_prompt(context: &str, history: &[ConversationMessage], question: &str) -> String {
    let mut prompt = String::with_capacity(context.len() + question.len() + 256);

    prompt.push_str(
        "You are answering questions about a video using its transcript. \
         Use only the transcript excerpt and the conversation so far. \
         If the excerpt does not contain the answer, say so briefly.\n\n",
    );

    let _ = write!(prompt, "Context: {}\n\n", context);

    if !history.is_empty() {
        prompt.push_str("Conversation so far:\n");
        for message in history {
            let _ = writeln!(prompt, "{}: {}", message.role, message.content);
        }
        prompt.push('\n');
    }

    let _ = write!(prompt, "Question: {}\n\nAnswer:", question);
    prompt
}

/// Prompt merging per-chunk answers into one
pub fn synthesis_prompt(question: &str, partial_answers: &[String]) -> String {
    let mut prompt = String::from(
        "The following answers were produced from different parts of the same video transcript. \
         Combine them into a single coherent answer to the question. \
         Remove repetition and drop parts that say the information is missing when another part answers it.\n\n",
    );

    let _ = write!(prompt, "Question: {}\n\n", question);

    for (index, answer) in partial_answers.iter().enumerate() {
        let _ = write!(prompt, "Answer from part {}:\n{}\n\n", index + 1, answer.trim());
    }

    prompt.push_str("Combined answer:");
    prompt
}

/// Prompt asking for `limit` questions about the context
pub fn question_generation_prompt(context: &str, limit: usize) -> String {
    format!(
        "Based on the following context, generate {limit} relevant and insightful questions.\n\
         Make sure the questions are diverse and cover different aspects of the content.\n\
         Return one question per line.\n\n\
         Context: {context}\n\n\
         Questions:"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Role;

    #[test]
    fn test_answer_prompt_includes_history_in_order() {
        let history = vec![
            ConversationMessage::new(Role::User, "Who is speaking?"),
            ConversationMessage::new(Role::Assistant, "A chef."),
        ];

        let prompt = answer_prompt("chunk text", &history, "What do they cook?");

        let user = prompt.find("user: Who is speaking?").unwrap();
        let assistant = prompt.find("assistant: A chef.").unwrap();
        let question = prompt.find("Question: What do they cook?").unwrap();
        assert!(prompt.contains("Context: chunk text"));
        assert!(user < assistant && assistant < question);
        assert!(prompt.ends_with("Answer:"));
    }

    #[test]
    fn test_answer_prompt_without_history() {
        let prompt = answer_prompt("ctx", &[], "q?");
        assert!(!prompt.contains("Conversation so far"));
    }

    #[test]
    fn test_synthesis_prompt_numbers_parts() {
        let prompt = synthesis_prompt("q?", &["first".to_string(), " second ".to_string()]);
        assert!(prompt.contains("Answer from part 1:\nfirst"));
        assert!(prompt.contains("Answer from part 2:\nsecond"));
    }

    #[test]
    fn test_question_generation_prompt_mentions_limit() {
        let prompt = question_generation_prompt("ctx", 5);
        assert!(prompt.contains("generate 5 relevant"));
        assert!(prompt.contains("Context: ctx"));
    }
}
