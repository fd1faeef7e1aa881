//! Sample accounts and FAQs for local development.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use supportdesk_auth::hash_password;
use supportdesk_database::{
    CreateFaqRequest, CreateUserRequest, FaqRepository, User, UserRepository, UserRole,
};
use tracing::info;

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "Admin@123";
pub const USER_EMAIL: &str = "user@example.com";
pub const USER_PASSWORD: &str = "User@123";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub admin_created: bool,
    pub user_created: bool,
    pub faqs_created: usize,
}

struct SampleFaq {
    question: &'static str,
    answer: &'static str,
    category: &'static str,
    keywords: &'static [&'static str],
    priority: i64,
}

const SAMPLE_FAQS: &[SampleFaq] = &[
    SampleFaq {
        question: "What are your business hours?",
        answer: "Our customer support is available 24/7. Our physical offices are open Monday to Friday, 9 AM to 6 PM.",
        category: "General",
        keywords: &["hours", "business", "support", "available", "open"],
        priority: 100,
    },
    SampleFaq {
        question: "How do I reset my password?",
        answer: "To reset your password: 1) Click \"Forgot Password\" on the login page, 2) Enter your email address, 3) Check your email for the reset link, 4) Click the link and create a new password. If you don't receive the email within 5 minutes, check your spam folder.",
        category: "Account",
        keywords: &["password", "reset", "forgot", "login", "account"],
        priority: 95,
    },
    SampleFaq {
        question: "What payment methods do you accept?",
        answer: "We accept all major credit cards (Visa, MasterCard, American Express, Discover), PayPal and bank transfers. For enterprise customers, we also offer invoicing options.",
        category: "Billing",
        keywords: &["payment", "credit card", "paypal", "billing", "invoice"],
        priority: 90,
    },
    SampleFaq {
        question: "How can I cancel my subscription?",
        answer: "You can cancel your subscription anytime by going to Settings > Subscription > Cancel Plan. Your access will continue until the end of your current billing period. No refunds are provided for partial months.",
        category: "Billing",
        keywords: &["cancel", "subscription", "refund", "plan"],
        priority: 85,
    },
    SampleFaq {
        question: "Do you offer refunds?",
        answer: "We offer a 30-day money-back guarantee for new subscriptions. If you're not satisfied within the first 30 days, contact support for a full refund. After 30 days, refunds are evaluated case by case.",
        category: "Billing",
        keywords: &["refund", "money back", "guarantee", "return"],
        priority: 80,
    },
    SampleFaq {
        question: "How do I contact customer support?",
        answer: "You can reach our support team through this chat assistant or by email at support@example.com. Average response time is under 2 hours for email and immediate for chat.",
        category: "General",
        keywords: &["contact", "support", "help", "email", "phone"],
        priority: 100,
    },
    SampleFaq {
        question: "Is my data secure?",
        answer: "Yes. All data is encrypted in transit (TLS 1.3) and at rest (AES-256). We never sell your data to third parties.",
        category: "Security",
        keywords: &["security", "data", "privacy", "encrypted", "gdpr"],
        priority: 90,
    },
    SampleFaq {
        question: "What features are included in the free plan?",
        answer: "The free plan includes up to 100 messages per month, basic AI assistance, email support and one user account. For unlimited messages and advanced features, consider the Pro or Enterprise plans.",
        category: "Plans",
        keywords: &["free", "plan", "features", "pricing", "included"],
        priority: 85,
    },
];

/// Create the sample admin, the sample customer and, when no FAQ exists yet,
/// the sample FAQs. Running it twice changes nothing.
pub async fn seed_database(pool: &SqlitePool) -> Result<SeedReport> {
    let users = UserRepository::new(pool.clone());
    let faqs = FaqRepository::new(pool.clone());
    let mut report = SeedReport::default();

    let (admin, created) = ensure_user(
        &users,
        ADMIN_EMAIL,
        ADMIN_PASSWORD,
        ("Admin", "User"),
        UserRole::Admin,
    )
    .await?;
    report.admin_created = created;

    let (_, created) = ensure_user(
        &users,
        USER_EMAIL,
        USER_PASSWORD,
        ("Test", "User"),
        UserRole::User,
    )
    .await?;
    report.user_created = created;

    if faqs.count_all().await.context("failed to count faqs")? == 0 {
        for sample in SAMPLE_FAQS {
            faqs.create(&CreateFaqRequest {
                question: sample.question.to_string(),
                answer: sample.answer.to_string(),
                category: Some(sample.category.to_string()),
                tags: Vec::new(),
                keywords: sample.keywords.iter().map(|k| k.to_string()).collect(),
                alternative_questions: Vec::new(),
                priority: sample.priority,
                is_public: true,
                created_by: admin.id,
            })
            .await
            .with_context(|| format!("failed to create sample faq {:?}", sample.question))?;
        }
        report.faqs_created = SAMPLE_FAQS.len();
        info!(count = report.faqs_created, "created sample faqs");
    } else {
        info!("faqs already exist, skipping samples");
    }

    Ok(report)
}

async fn ensure_user(
    users: &UserRepository,
    email: &str,
    password: &str,
    (first_name, last_name): (&str, &str),
    role: UserRole,
) -> Result<(User, bool)> {
    if let Some(existing) = users
        .find_by_email(email)
        .await
        .with_context(|| format!("failed to look up {email}"))?
    {
        info!(email = %email, "seed user already exists");
        return Ok((existing, false));
    }

    let password_hash = hash_password(password)
        .map_err(|err| anyhow::anyhow!("failed to hash password for {email}: {err}"))?;
    let user = users
        .create(&CreateUserRequest {
            email: email.to_string(),
            password_hash,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            role,
            is_verified: true,
        })
        .await
        .with_context(|| format!("failed to create seed user {email}"))?;

    info!(email = %email, role = role.as_str(), "seed user created");
    Ok((user, true))
}
