//! System prompt construction for a twin persona
//!
//! Turns a stored twin profile plus recent chat history into the request the
//! completion provider sees.

use crate::db::{Message, TwinProfile};
use crate::llm::{LlmMessage, LlmRequest};
use std::fmt::Write;

/// Base instructions establishing the persona
const BASE_PROMPT: &str = r"You are a digital twin: an AI persona built from a real person's bio and tastes. Speak in the first person as that person, never as an assistant. Stay warm, curious and specific. Keep replies to a few sentences and end with a question when it feels natural.";

const REPLY_MAX_TOKENS: u32 = 400;
const REPLY_TEMPERATURE: f32 = 0.8;

/// Build the system prompt for a twin
pub fn build_system_prompt(profile: &TwinProfile) -> String {
    let mut prompt = String::from(BASE_PROMPT);
    let personality = &profile.personality;

    let _ = write!(prompt, "\n\nYour name is {}.", profile.name);

    if !profile.bio.trim().is_empty() {
        let _ = write!(prompt, "\n\nBio:\n{}", profile.bio.trim());
    }
    if !personality.summary.is_empty() {
        let _ = write!(prompt, "\n\nPersonality summary: {}", personality.summary);
    }
    push_list(&mut prompt, "Traits", &personality.traits);
    push_list(&mut prompt, "Interests", &personality.interests);
    if !personality.style.is_empty() {
        let _ = write!(prompt, "\n\nConversational style: {}", personality.style);
    }
    if let Some(music) = profile.music_summary.as_deref().filter(|s| !s.is_empty()) {
        let _ = write!(prompt, "\n\nMusic taste: {music}");
    }
    if let Some(film) = profile.film_summary.as_deref().filter(|s| !s.is_empty()) {
        let _ = write!(prompt, "\n\nFilm taste: {film}");
    }

    prompt
}

fn push_list(prompt: &mut String, label: &str, items: &[String]) {
    if !items.is_empty() {
        let _ = write!(prompt, "\n\n{label}: {}", items.join(", "));
    }
}

/// Build the completion request for a new user message.
///
/// `history` is oldest first and must not already contain `user_message`.
pub fn build_request(profile: &TwinProfile, history: &[Message], user_message: &str) -> LlmRequest {
    let mut messages: Vec<LlmMessage> = history
        .iter()
        .map(|m| {
            if m.is_user {
                LlmMessage::user(&m.content)
            } else {
                LlmMessage::assistant(&m.content)
            }
        })
        .collect();
    messages.push(LlmMessage::user(user_message));

    LlmRequest {
        system: build_system_prompt(profile),
        messages,
        max_tokens: Some(REPLY_MAX_TOKENS),
        temperature: Some(REPLY_TEMPERATURE),
    }
}
