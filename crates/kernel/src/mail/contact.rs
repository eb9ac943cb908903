//! Contact-form submission and site notifications.

use ammonia::clean_text;
use serde::Deserialize;

use super::mailer::{Email, Mailer};
use super::MailError;
use crate::error::FieldErrors;

/// Contact form as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub project_type: String,
    /// Budget code; see [`budget_range`].
    #[serde(default)]
    pub budget: String,
    #[serde(default)]
    pub message: String,
}

/// Display text for a budget code.
pub fn budget_range(code: &str) -> &'static str {
    match code {
        "small" => "$5,000 - $10,000",
        "medium" => "$10,000 - $25,000",
        "large" => "$25,000 - $50,000",
        "enterprise" => "$50,000+",
        _ => "Not specified",
    }
}

impl ContactForm {
    /// Required-field and address checks. Empty map means valid.
    ///
    /// The budget is never required: unknown codes display as "Not specified".
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        for (field, value) in [
            ("name", &self.name),
            ("email", &self.email),
            ("project_type", &self.project_type),
            ("message", &self.message),
        ] {
            if value.trim().is_empty() {
                errors.insert(
                    field.to_string(),
                    vec!["Please fill in all required fields.".to_string()],
                );
            }
        }

        if !errors.contains_key("email") && self.email.trim().parse::<lettre::Address>().is_err() {
            errors.insert(
                "email".to_string(),
                vec!["Enter a valid email address.".to_string()],
            );
        }

        errors
    }

    pub fn budget_display(&self) -> &'static str {
        budget_range(self.budget.trim())
    }
}

/// Escape text for HTML, keeping line breaks.
fn html_lines(text: &str) -> String {
    text.lines().map(clean_text).collect::<Vec<_>>().join("<br>")
}

/// Notification to the site owner.
pub fn admin_notification(form: &ContactForm, admin_email: &str) -> Email {
    let name = form.name.trim();
    let html = format!(
        "<h2>New contact form submission</h2>\
         <p><strong>Name:</strong> {}</p>\
         <p><strong>Email:</strong> {}</p>\
         <p><strong>Project type:</strong> {}</p>\
         <p><strong>Budget:</strong> {}</p>\
         <p><strong>Message:</strong></p><p>{}</p>",
        clean_text(name),
        clean_text(form.email.trim()),
        clean_text(form.project_type.trim()),
        clean_text(form.budget_display()),
        html_lines(form.message.trim()),
    );
    let text = format!(
        "New contact form submission\n\nName: {name}\nEmail: {}\nProject type: {}\nBudget: {}\n\n{}",
        form.email.trim(),
        form.project_type.trim(),
        form.budget_display(),
        form.message.trim(),
    );

    Email {
        to: admin_email.to_string(),
        subject: format!("New Contact Form Submission from {name}"),
        html,
        text: Some(text),
        reply_to: Some(form.email.trim().to_string()),
    }
}

/// Confirmation sent back to the person who wrote in.
pub fn user_confirmation(form: &ContactForm) -> Email {
    let name = form.name.trim();
    let html = format!(
        "<p>Hi {},</p>\
         <p>Thank you for reaching out. We have received your message and will get back to you soon.</p>",
        clean_text(name)
    );
    let text = format!(
        "Hi {name},\n\nThank you for reaching out. We have received your message and will get back to you soon."
    );

    Email {
        to: form.email.trim().to_string(),
        subject: "Thank you for contacting us!".to_string(),
        html,
        text: Some(text),
        reply_to: None,
    }
}

/// Send both contact emails. Failures propagate.
pub async fn send_contact(
    mailer: &Mailer,
    admin_email: &str,
    form: &ContactForm,
) -> Result<(), MailError> {
    let messages = [admin_notification(form, admin_email), user_confirmation(form)];
    mailer.send_messages(&messages, false).await?;
    Ok(())
}

/// Notice that a comment is awaiting approval.
pub fn comment_notification(
    to: &str,
    post_title: &str,
    commenter: &str,
    body: &str,
) -> Email {
    let text = format!("A new comment by {commenter} is awaiting approval.\n\nComment: {body}");
    let html = format!(
        "<p>A new comment by <strong>{}</strong> is awaiting approval.</p><p>{}</p>",
        clean_text(commenter),
        html_lines(body),
    );

    Email {
        to: to.to_string(),
        subject: format!("New comment on \"{post_title}\""),
        html,
        text: Some(text),
        reply_to: None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn form() -> ContactForm {
        ContactForm {
            name: "Jane Doe".to_string(),
            email: "jane@example.com".to_string(),
            project_type: "Web app".to_string(),
            budget: "medium".to_string(),
            message: "We need a site.\nSoon.".to_string(),
        }
    }

    #[test]
    fn budget_codes() {
        assert_eq!(budget_range("small"), "$5,000 - $10,000");
        assert_eq!(budget_range("medium"), "$10,000 - $25,000");
        assert_eq!(budget_range("large"), "$25,000 - $50,000");
        assert_eq!(budget_range("enterprise"), "$50,000+");
        assert_eq!(budget_range("huge"), "Not specified");
        assert_eq!(budget_range(""), "Not specified");
    }

    #[test]
    fn complete_form_is_valid() {
        assert!(form().validate().is_empty());
    }

    #[test]
    fn missing_fields_reported() {
        let f = ContactForm {
            name: " ".to_string(),
            message: String::new(),
            ..form()
        };
        let errors = f.validate();
        assert!(errors.contains_key("name"));
        assert!(errors.contains_key("message"));
        assert!(!errors.contains_key("budget"));
    }

    #[test]
    fn bad_email_reported() {
        let f = ContactForm {
            email: "nope".to_string(),
            ..form()
        };
        assert!(f.validate().contains_key("email"));
    }

    #[test]
    fn admin_notification_escapes_and_replies_to_sender() {
        let f = ContactForm {
            name: "<b>Eve</b>".to_string(),
            ..form()
        };
        let email = admin_notification(&f, "owner@example.com");
        assert_eq!(email.to, "owner@example.com");
        assert_eq!(email.reply_to.as_deref(), Some("jane@example.com"));
        assert!(!email.html.contains("<b>"));
        assert!(email.html.contains("10,000"));
        assert!(email.html.contains("<br>"));
        assert!(email.subject.ends_with("<b>Eve</b>"));
    }

    #[test]
    fn confirmation_goes_to_sender() {
        let email = user_confirmation(&form());
        assert_eq!(email.to, "jane@example.com");
        assert_eq!(email.subject, "Thank you for contacting us!");
    }

    #[test]
    fn comment_notice_subject() {
        let email = comment_notification("owner@example.com", "Hello", "Bob", "Nice post");
        assert_eq!(email.subject, "New comment on \"Hello\"");
        assert!(email.text.unwrap().contains("Bob is awaiting approval"));
    }
}
