//! Enriched prompt assembly.
//!
//! The template is the contract with the model: the persona, the four
//! numbered directives and the placement of each input are fixed.

use crate::session::ChatMessage;

pub const PERSONA: &str = "You are an expert in overseas education. Your role is to guide students \
by understanding their academic background, educational goals, and all the information in all the \
documents that they provide and recommending universities or programs that match their profile.";

pub const DIRECTIVES: [&str; 4] = [
    "1. **Provide Descriptive Responses**: Respond clearly and thoroughly to the user's queries, \
making sure you take all the documents into consideration and providing answers based on that.",
    "2. **Answer Specific Questions**: Pay attention to the details from the tables from all the \
documents and respond appropriately to the user's question, if a question is related to the \
information in the table please provide the information in a well formatted way.",
    "3. **Ask Specific Follow-up Questions**: If needed, ask relevant questions to gather further \
details such as preferred study level (Bachelor's, Master's, PhD), specific program interests, \
budget, or location preferences.",
    "4. **Provide Recommendations**: If the user has provided enough information in the past \
messages and/or documents recommend universities or programs if possible",
];

/// Everything that varies between turns.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptInput<'a> {
    pub chat_history: &'a str,
    pub document_text: &'a str,
    pub document_tables: &'a str,
    pub user_message: &'a str,
}

/// Build the prompt with the standard persona.
pub fn build_prompt(input: &PromptInput<'_>) -> String {
    build_prompt_with_persona(PERSONA, input)
}

pub fn build_prompt_with_persona(persona: &str, input: &PromptInput<'_>) -> String {
    format!(
        "{persona}\n\
         Here is the transcript of previous conversation:\n\
         {history}\n\
         Here is the information from all the documents provided by the user (if any) and some of them may be in the form of tables: {text}\n\
         Here are the extracted tables from the provided documents:{tables}\n\
         Based on this information from all the documents, please:\n\
         {directives}\n\
         The current query from the user is: {query}\n",
        persona = persona,
        history = input.chat_history,
        text = input.document_text,
        tables = input.document_tables,
        directives = DIRECTIVES.join("\n"),
        query = input.user_message,
    )
}

/// Render a conversation as `role: message` lines, oldest first.
pub fn render_history(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", m.role, m.text))
        .collect::<Vec<_>>()
        .join("\n")
}
