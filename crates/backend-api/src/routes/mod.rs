pub mod admin;
pub mod auth;
pub mod chat;
pub mod documents;
pub mod faqs;
pub mod health;
pub mod users;
