use serde::{Deserialize, Serialize};
use supportdesk_database::search::is_stop_word;
use supportdesk_database::{
    CreateFaqRequest, Faq, FaqAnalytics, FaqFilter, PageRequest, PublicFaq, UpdateFaqRequest, User,
};
use tracing::info;
use utoipa::ToSchema;

use super::error::ServiceError;
use crate::error::FieldError;
use crate::AppState;

pub const DEFAULT_CATEGORY: &str = "General";
const MAX_KEYWORDS: usize = 10;
const MAX_QUESTION_CHARS: usize = 500;
const MAX_ANSWER_CHARS: usize = 5000;
const MAX_CATEGORY_CHARS: usize = 100;

/// FAQ fields accepted on create and in bulk imports.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FaqInput {
    pub question: Option<String>,
    pub answer: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub keywords: Option<Vec<String>>,
    pub alternative_questions: Option<Vec<String>>,
    pub priority: Option<i64>,
    pub is_public: Option<bool>,
}

impl FaqInput {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        check_text(&mut errors, "question", self.question.as_deref(), true, MAX_QUESTION_CHARS);
        check_text(&mut errors, "answer", self.answer.as_deref(), true, MAX_ANSWER_CHARS);
        check_text(&mut errors, "category", self.category.as_deref(), false, MAX_CATEGORY_CHARS);
        if let Some(priority) = self.priority {
            if !(0..=100).contains(&priority) {
                errors.push(FieldError::new("priority", "Priority must be between 0 and 100"));
            }
        }
        errors
    }
}

/// Partial FAQ update. Absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FaqUpdate {
    pub question: Option<String>,
    pub answer: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub keywords: Option<Vec<String>>,
    pub alternative_questions: Option<Vec<String>>,
    pub priority: Option<i64>,
    pub is_active: Option<bool>,
    pub is_public: Option<bool>,
}

impl FaqUpdate {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        check_text(&mut errors, "question", self.question.as_deref(), false, MAX_QUESTION_CHARS);
        check_text(&mut errors, "answer", self.answer.as_deref(), false, MAX_ANSWER_CHARS);
        check_text(&mut errors, "category", self.category.as_deref(), false, MAX_CATEGORY_CHARS);
        errors
    }
}

fn check_text(
    errors: &mut Vec<FieldError>,
    field: &str,
    value: Option<&str>,
    required: bool,
    max: usize,
) {
    let label = capitalise(field);
    match value.map(str::trim) {
        None | Some("") if required => {
            errors.push(FieldError::new(field, format!("{label} is required")))
        }
        Some(value) if value.chars().count() > max => errors.push(FieldError::new(
            field,
            format!("{label} cannot exceed {max} characters"),
        )),
        _ => {}
    }
}

fn capitalise(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportFailure {
    pub question: Option<String>,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportReport {
    pub success: usize,
    pub failed: usize,
    pub errors: Vec<ImportFailure>,
}

/// Lowercased words of `text` without punctuation, stop words or words of
/// two characters or fewer. Only ASCII letters, digits and `_` count as word
/// characters; anything else is stripped. At most ten are kept, in order of appearance.
pub fn extract_keywords(text: &str) -> Vec<String> {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();

    cleaned
        .split_whitespace()
        .filter(|word| word.chars().count() > 2 && !is_stop_word(word))
        .take(MAX_KEYWORDS)
        .map(str::to_string)
        .collect()
}

pub async fn create(state: &AppState, input: FaqInput, user: &User) -> Result<Faq, ServiceError> {
    let errors = input.validate();
    if !errors.is_empty() {
        return Err(ServiceError::Validation(errors));
    }

    let question = input.question.unwrap_or_default();
    let keywords = match input.keywords {
        Some(keywords) if !keywords.is_empty() => keywords,
        _ => extract_keywords(&question),
    };

    let faq = state
        .faqs()
        .create(&CreateFaqRequest {
            answer: input.answer.unwrap_or_default(),
            category: input
                .category
                .filter(|category| !category.trim().is_empty())
                .or_else(|| Some(DEFAULT_CATEGORY.to_string())),
            tags: input.tags.unwrap_or_default(),
            keywords,
            alternative_questions: input.alternative_questions.unwrap_or_default(),
            priority: input.priority.unwrap_or(0),
            is_public: input.is_public.unwrap_or(true),
            created_by: user.id,
            question,
        })
        .await?;

    info!(faq_id = %faq.public_id, user_id = %user.public_id, "faq created");
    Ok(faq)
}

pub async fn list(
    state: &AppState,
    filter: &FaqFilter,
    page: PageRequest,
) -> Result<(Vec<Faq>, i64), ServiceError> {
    Ok(state.faqs().list(filter, page).await?)
}

pub async fn public(state: &AppState, category: Option<&str>) -> Result<Vec<PublicFaq>, ServiceError> {
    Ok(state.faqs().public_list(category).await?)
}

/// Fetch one FAQ. Views are counted when an FAQ is used as chat context,
/// not here.
pub async fn get(state: &AppState, faq_id: &str) -> Result<Faq, ServiceError> {
    find(state, faq_id).await
}

async fn find(state: &AppState, faq_id: &str) -> Result<Faq, ServiceError> {
    state
        .faqs()
        .find_by_public_id(faq_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("FAQ not found"))
}

pub async fn update(
    state: &AppState,
    faq_id: &str,
    update: FaqUpdate,
    user: &User,
) -> Result<Faq, ServiceError> {
    let errors = update.validate();
    if !errors.is_empty() {
        return Err(ServiceError::Validation(errors));
    }

    let faq = find(state, faq_id).await?;
    let keywords = match (&update.question, update.keywords) {
        (_, Some(keywords)) => Some(keywords),
        (Some(question), None) => Some(extract_keywords(question)),
        (None, None) => None,
    };

    let updated = state
        .faqs()
        .update(
            faq.id,
            &UpdateFaqRequest {
                question: update.question,
                answer: update.answer,
                category: update.category,
                tags: update.tags,
                keywords,
                alternative_questions: update.alternative_questions,
                priority: update.priority,
                is_active: update.is_active,
                is_public: update.is_public,
            },
            user.id,
        )
        .await?;

    info!(faq_id = %faq_id, user_id = %user.public_id, "faq updated");
    Ok(updated)
}

pub async fn delete(state: &AppState, faq_id: &str, user: &User) -> Result<(), ServiceError> {
    let faq = find(state, faq_id).await?;
    state.faqs().soft_delete(faq.id).await?;
    info!(faq_id = %faq_id, user_id = %user.public_id, "faq deleted");
    Ok(())
}

pub async fn add_feedback(state: &AppState, faq_id: &str, useful: bool) -> Result<(), ServiceError> {
    let faq = find(state, faq_id).await?;
    state.faqs().add_feedback(faq.id, useful).await?;
    Ok(())
}

pub async fn categories(state: &AppState) -> Result<Vec<String>, ServiceError> {
    Ok(state.faqs().categories().await?)
}

/// Create each FAQ in turn. Failures are collected, not returned.
pub async fn bulk_import(
    state: &AppState,
    faqs: Vec<FaqInput>,
    user: &User,
) -> Result<ImportReport, ServiceError> {
    if faqs.is_empty() {
        return Err(ServiceError::bad_request("Please provide an array of FAQs"));
    }

    let mut report = ImportReport::default();
    for input in faqs {
        let question = input.question.clone();
        match create(state, input, user).await {
            Ok(_) => report.success += 1,
            Err(err) => {
                report.failed += 1;
                report.errors.push(ImportFailure {
                    question,
                    error: failure_message(&err),
                });
            }
        }
    }

    info!(success = report.success, failed = report.failed, "bulk faq import finished");
    Ok(report)
}

fn failure_message(err: &ServiceError) -> String {
    match err {
        ServiceError::Validation(errors) => errors
            .iter()
            .map(|error| error.message.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

pub async fn analytics(state: &AppState) -> Result<FaqAnalytics, ServiceError> {
    Ok(state.faqs().analytics().await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_drop_punctuation_and_stop_words() {
        assert_eq!(
            extract_keywords("How do I reset my password?"),
            vec!["reset", "password"]
        );
        assert_eq!(
            extract_keywords("What's the refund policy for EU orders"),
            vec!["whats", "refund", "policy", "orders"]
        );
    }

    #[test]
    fn keywords_strip_non_ascii_letters() {
        assert_eq!(
            extract_keywords("Café résumé naïve_user über"),
            vec!["caf", "rsum", "nave_user", "ber"]
        );
    }

    #[test]
    fn keywords_are_capped_at_ten() {
        let text = "alpha bravo charlie delta echo foxtrot golf hotel india juliet kilo lima";
        let keywords = extract_keywords(text);
        assert_eq!(keywords.len(), 10);
        assert_eq!(keywords.last().map(String::as_str), Some("juliet"));
    }

    #[test]
    fn input_validation_reports_each_field() {
        let input = FaqInput {
            question: Some("   ".to_string()),
            answer: Some("a".repeat(5001)),
            priority: Some(101),
            ..FaqInput::default()
        };
        let messages: Vec<_> = input.validate().into_iter().map(|e| e.message).collect();
        assert_eq!(
            messages,
            vec![
                "Question is required",
                "Answer cannot exceed 5000 characters",
                "Priority must be between 0 and 100",
            ]
        );
    }

    #[test]
    fn update_validation_allows_missing_fields() {
        assert!(FaqUpdate::default().validate().is_empty());
        let update = FaqUpdate {
            question: Some("q".repeat(501)),
            ..FaqUpdate::default()
        };
        assert_eq!(update.validate().len(), 1);
    }
}
