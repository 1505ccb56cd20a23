pub mod mailer;
pub mod templates;

pub use mailer::EmailNotifier;
pub use templates::{EmailContent, EmailTemplates};
