pub mod admin;
pub mod chat;
pub mod document;
pub mod error;
pub mod extract;
pub mod faq;
pub mod user;

pub use error::ServiceError;
