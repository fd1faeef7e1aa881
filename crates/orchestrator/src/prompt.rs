//! System prompt assembly from retrieved support context.

use std::fmt::Write as _;

use supportdesk_config::SupportConfig;

/// Characters of each document body included in the prompt.
pub const DOCUMENT_EXCERPT_CHARS: usize = 3000;

const GUIDELINES: &str = "IMPORTANT GUIDELINES:
1. ONLY answer questions based on the provided context below
2. If the answer is not in the context, politely say you don't have that information and suggest contacting human support
3. Be concise but thorough in your responses
4. Use a friendly, professional tone
5. If asked about topics outside customer support, politely redirect to relevant topics
6. Never make up information that's not in the provided context
7. Format responses clearly with bullet points or numbered lists when appropriate
";

#[derive(Debug, Clone, Default)]
pub struct PromptDocument {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Default)]
pub struct PromptFaq {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, Default)]
pub struct PromptContext {
    pub documents: Vec<PromptDocument>,
    pub faqs: Vec<PromptFaq>,
}

impl PromptContext {
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty() && self.faqs.is_empty()
    }
}

pub fn build_system_prompt(context: &PromptContext, support: &SupportConfig) -> String {
    let mut prompt = format!(
        "You are a helpful customer support AI assistant for {}. Your role is to assist customers with their questions and concerns in a friendly, professional manner.\n\n",
        support.company_name
    );
    prompt.push_str(GUIDELINES);

    if !support.contact_email.is_empty() || !support.contact_phone.is_empty() {
        prompt.push_str("\nCONTACT INFORMATION FOR HUMAN SUPPORT:\n");
        if !support.contact_email.is_empty() {
            let _ = writeln!(prompt, "* Email at {}", support.contact_email.join(" or "));
        }
        if !support.contact_phone.is_empty() {
            let _ = writeln!(prompt, "* Phone at {}", support.contact_phone.join(" or "));
        }
    }

    if !context.documents.is_empty() {
        prompt.push_str("\n--- COMPANY DOCUMENTATION ---\n");
        for (index, document) in context.documents.iter().enumerate() {
            let excerpt: String = document.content.chars().take(DOCUMENT_EXCERPT_CHARS).collect();
            let _ = write!(prompt, "\n[Document {}: {}]\n{}\n", index + 1, document.title, excerpt);
        }
    }

    if !context.faqs.is_empty() {
        prompt.push_str("\n--- FREQUENTLY ASKED QUESTIONS ---\n");
        for (index, faq) in context.faqs.iter().enumerate() {
            let _ = write!(prompt, "\nQ{}: {}\nA: {}\n", index + 1, faq.question, faq.answer);
        }
    }

    if !context.is_empty() {
        prompt.push_str("\n--- END OF CONTEXT ---\n\nNow, please help the customer with their question based ONLY on the information provided above.");
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn support() -> SupportConfig {
        SupportConfig {
            company_name: "Acme".into(),
            contact_email: vec!["help@acme.test".into(), "ops@acme.test".into()],
            contact_phone: vec!["+1 555 0100".into()],
        }
    }

    #[test]
    fn prompt_without_context_has_no_context_sections() {
        let prompt = build_system_prompt(&PromptContext::default(), &support());
        assert!(prompt.starts_with("You are a helpful customer support AI assistant for Acme."));
        assert!(prompt.contains("IMPORTANT GUIDELINES:"));
        assert!(prompt.contains("* Email at help@acme.test or ops@acme.test"));
        assert!(prompt.contains("* Phone at +1 555 0100"));
        assert!(!prompt.contains("--- COMPANY DOCUMENTATION ---"));
        assert!(!prompt.contains("--- END OF CONTEXT ---"));
    }

    #[test]
    fn contact_block_is_omitted_when_unconfigured() {
        let prompt = build_system_prompt(&PromptContext::default(), &SupportConfig::default());
        assert!(prompt.contains("AI Support"));
        assert!(!prompt.contains("CONTACT INFORMATION"));
    }

    #[test]
    fn sections_appear_in_order_and_documents_are_truncated() {
        let context = PromptContext {
            documents: vec![PromptDocument {
                title: "Billing guide".into(),
                content: "x".repeat(DOCUMENT_EXCERPT_CHARS + 500),
            }],
            faqs: vec![
                PromptFaq {
                    question: "How do refunds work?".into(),
                    answer: "Within 30 days.".into(),
                },
                PromptFaq {
                    question: "Do you ship abroad?".into(),
                    answer: "Yes.".into(),
                },
            ],
        };

        let prompt = build_system_prompt(&context, &support());
        let docs = prompt.find("--- COMPANY DOCUMENTATION ---").unwrap();
        let faqs = prompt.find("--- FREQUENTLY ASKED QUESTIONS ---").unwrap();
        let end = prompt.find("--- END OF CONTEXT ---").unwrap();
        assert!(docs < faqs && faqs < end);

        assert!(prompt.contains("[Document 1: Billing guide]"));
        assert!(prompt.contains("Q2: Do you ship abroad?\nA: Yes."));
        assert!(prompt.contains(&"x".repeat(DOCUMENT_EXCERPT_CHARS)));
        assert!(!prompt.contains(&"x".repeat(DOCUMENT_EXCERPT_CHARS + 1)));
        assert!(prompt.ends_with("based ONLY on the information provided above."));
    }
}
