// SPDX-License-Identifier: MIT OR Apache-2.0

//! Answer composition policy.
//!
//! Ordered policy: no sections -> fixed apology; model configured -> one
//! completion call built from the top sections; model missing or failing ->
//! deterministic template from the top two sections. `compose` never fails.

use tracing::warn;

use crate::answer::model::{CompletionModel, CompletionRequest};
use crate::index::SearchHit;

/// Sections included in the completion prompt.
const PROMPT_SECTION_LIMIT: usize = 3;
/// Per-section content budget inside the prompt.
const PROMPT_CONTENT_CHARS: usize = 800;
/// Sections included in the template answer.
const TEMPLATE_SECTION_LIMIT: usize = 2;
/// Content prefix used when a section has no excerpt.
const TEMPLATE_CONTENT_CHARS: usize = 400;

/// Composes the final answer from ranked sections.
pub struct AnswerComposer {
    model: Option<Box<dyn CompletionModel>>,
    max_tokens: usize,
    temperature: f32,
}

impl AnswerComposer {
    /// `model` is `None` when answering runs without an external model; the
    /// template path then serves every request.
    pub fn new(model: Option<Box<dyn CompletionModel>>, max_tokens: usize, temperature: f32) -> Self {
        Self {
            model,
            max_tokens,
            temperature,
        }
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    /// Produces the answer text for a question.
    ///
    /// Never fails: model errors and empty model output degrade to the
    /// template, and an empty `ranked` list yields the apology. The result
    /// is non-empty whenever `ranked` is non-empty.
    pub fn compose(&self, question: &str, ranked: &[SearchHit], tenant_name: &str) -> String {
        if ranked.is_empty() {
            return apology(tenant_name);
        }

        if let Some(model) = &self.model {
            let prompt = build_prompt(question, ranked, tenant_name);
            let request = CompletionRequest {
                prompt: &prompt,
                max_tokens: self.max_tokens,
                temperature: self.temperature,
            };
            match model.complete(&request) {
                Ok(text) if !text.trim().is_empty() => return text,
                Ok(_) => {
                    warn!("completion model returned empty text; using template answer");
                }
                Err(err) => {
                    warn!(error = %err, "completion model failed; using template answer");
                }
            }
        }

        template_answer(ranked, tenant_name)
    }
}

fn apology(tenant_name: &str) -> String {
    format!(
        "I couldn't find relevant information in the {} handbook for your question. \
         You might want to:\n\n\
         1. Contact the Student Affairs office directly\n\
         2. Check the complete handbook on the university website\n\
         3. Reach out to your academic advisor\n\n\
         Could you try rephrasing your question with different keywords?",
        tenant_name
    )
}

fn build_prompt(question: &str, hits: &[SearchHit], tenant_name: &str) -> String {
    let mut context_parts = Vec::new();
    for (i, hit) in hits.iter().take(PROMPT_SECTION_LIMIT).enumerate() {
        let section = &hit.section;
        context_parts.push(format!(
            "\nSection {}: \"{}\" (Category: {})\nFrom: {} ({})\nContent: {}...\n",
            i + 1,
            section.title,
            section.category,
            section.handbook_title,
            section.academic_year,
            char_prefix(&section.content, PROMPT_CONTENT_CHARS),
        ));
    }
    let context = context_parts.join("\n");

    format!(
        "You are HandBookBot, an AI assistant specifically designed to help {school} students \
         understand their student handbook and university policies.\n\n\
         IMPORTANT INSTRUCTIONS:\n\
         1. Always cite exact sections when referencing policies\n\
         2. Use the format: \"According to the '[EXACT SECTION TITLE]' in the [CATEGORY] section...\"\n\
         3. If information isn't in the provided context, clearly state this limitation\n\
         4. Focus on practical guidance to help students follow university policies\n\
         5. Be encouraging but emphasize the importance of following university policies\n\
         6. Remember this is for {school} - tailor your response appropriately\n\n\
         STUDENT QUESTION: {question}\n\n\
         RELEVANT HANDBOOK SECTIONS FROM {school_upper}:\n\
         {context}\n\n\
         Please provide a helpful, accurate response that:\n\
         - Directly answers the student's question\n\
         - Includes exact citations from the handbook sections provided\n\
         - Offers practical advice to help the student comply with university policies\n\
         - Maintains a supportive, educational tone\n\
         - Is specific to {school}\n\n\
         Response:",
        school = tenant_name,
        question = question,
        school_upper = tenant_name.to_uppercase(),
        context = context,
    )
}

fn template_answer(hits: &[SearchHit], tenant_name: &str) -> String {
    let mut response = format!("Based on the {} Student Handbook:\n\n", tenant_name);

    for hit in hits.iter().take(TEMPLATE_SECTION_LIMIT) {
        let section = &hit.section;
        let policy_text = match section.excerpt.as_deref() {
            Some(excerpt) if !excerpt.trim().is_empty() => excerpt,
            _ => char_prefix(&section.content, TEMPLATE_CONTENT_CHARS),
        };

        response.push_str(&format!("**{}** ({}):\n\n", section.title, section.category));
        response.push_str(&format!("\u{1F4CB} **Official Policy**: {}\n\n", policy_text));
        response.push_str(
            "\u{1F4A1} **What this means**: This policy is designed to maintain academic \
             standards and ensure fairness for all students.\n\n",
        );
    }

    response.push_str(&format!(
        "For specific questions about how this applies to your situation, please contact \
         the {} Student Affairs office for official guidance.",
        tenant_name
    ));
    response
}

/// First `max_chars` characters of `text`, cut on a char boundary.
fn char_prefix(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
