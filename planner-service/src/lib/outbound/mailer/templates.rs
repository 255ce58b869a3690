use handlebars::Handlebars;
use serde::Serialize;

use crate::domain::user::models::WelcomeEmail;
use crate::user::errors::MailerError;

const SUBJECT_TEMPLATE: &str = "welcome_subject";
const BODY_TEMPLATE: &str = "welcome_body";

const SUBJECT: &str = "Finish signing up for Planner, {{username}}";

const BODY: &str = r#"<!DOCTYPE html>
<html>
  <body>
    <p>Hi {{username}},</p>
    <p>Thanks for signing up. Confirm your email address to activate your account:</p>
    <p><a href="{{activation_url}}">{{activation_url}}</a></p>
    <p>The link expires in {{expiry_hours}} hours. If you did not sign up, ignore this email.</p>
  </body>
</html>
"#;

/// Rendered welcome email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
}

#[derive(Serialize)]
struct WelcomeContext<'a> {
    username: &'a str,
    activation_url: &'a str,
    expiry_hours: i64,
}

/// Handlebars renderer for the welcome email, strict about missing fields.
pub struct WelcomeTemplate {
    registry: Handlebars<'static>,
    expiry_hours: i64,
}

impl WelcomeTemplate {
    /// # Errors
    /// * `Template` - A built-in template failed to compile
    pub fn new(expiry_hours: i64) -> Result<Self, MailerError> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        registry
            .register_template_string(SUBJECT_TEMPLATE, SUBJECT)
            .map_err(|e| MailerError::Template(e.to_string()))?;
        registry
            .register_template_string(BODY_TEMPLATE, BODY)
            .map_err(|e| MailerError::Template(e.to_string()))?;

        Ok(Self {
            registry,
            expiry_hours,
        })
    }

    pub fn render(&self, email: &WelcomeEmail) -> Result<RenderedEmail, MailerError> {
        let context = WelcomeContext {
            username: &email.username,
            activation_url: &email.activation_url,
            expiry_hours: self.expiry_hours,
        };

        let subject = self
            .registry
            .render(SUBJECT_TEMPLATE, &context)
            .map_err(|e| MailerError::Template(e.to_string()))?;
        let html = self
            .registry
            .render(BODY_TEMPLATE, &context)
            .map_err(|e| MailerError::Template(e.to_string()))?;

        Ok(RenderedEmail { subject, html })
    }
}
