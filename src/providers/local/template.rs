//! Chat templates turning a conversation into a raw model prompt.

use crate::{Message, Role};

/// Prompt format of a model family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptTemplate {
    /// `<|im_start|>role ... <|im_end|>` turns, used by Qwen.
    ChatMl,
    /// `<start_of_turn>user|model ... <end_of_turn>` turns, used by Gemma.
    Gemma,
}

impl PromptTemplate {
    /// Render `messages` followed by an open assistant turn.
    pub fn render(&self, messages: &[Message]) -> String {
        match self {
            PromptTemplate::ChatMl => render_chatml(messages),
            PromptTemplate::Gemma => render_gemma(messages),
        }
    }

    /// Sequences that end the assistant turn.
    pub fn stop_sequences(&self) -> Vec<String> {
        match self {
            PromptTemplate::ChatMl => vec!["<|im_end|>".to_string()],
            PromptTemplate::Gemma => vec!["<end_of_turn>".to_string()],
        }
    }
}

fn render_chatml(messages: &[Message]) -> String {
    let mut prompt = String::new();
    for message in messages {
        prompt.push_str("<|im_start|>");
        prompt.push_str(message.role().as_str());
        prompt.push('\n');
        prompt.push_str(message.content());
        prompt.push_str("<|im_end|>\n");
    }
    prompt.push_str("<|im_start|>assistant\n");
    prompt
}

// Gemma has no system role: system text is prepended to the next user turn.
fn render_gemma(messages: &[Message]) -> String {
    let mut prompt = String::new();
    let mut pending_system: Vec<&str> = Vec::new();

    for message in messages {
        match message.role() {
            Role::System => pending_system.push(message.content()),
            Role::User => {
                let mut text = pending_system.join("\n\n");
                if !text.is_empty() {
                    text.push_str("\n\n");
                }
                text.push_str(message.content());
                push_gemma_turn(&mut prompt, "user", &text);
                pending_system.clear();
            }
            Role::Assistant => push_gemma_turn(&mut prompt, "model", message.content()),
        }
    }

    if !pending_system.is_empty() {
        push_gemma_turn(&mut prompt, "user", &pending_system.join("\n\n"));
    }

    prompt.push_str("<start_of_turn>model\n");
    prompt
}

fn push_gemma_turn(prompt: &mut String, role: &str, text: &str) {
    prompt.push_str("<start_of_turn>");
    prompt.push_str(role);
    prompt.push('\n');
    prompt.push_str(text);
    prompt.push_str("<end_of_turn>\n");
}
