use crate::{Email, MailerError};
use askama::Template;
use serde::{Deserialize, Serialize};

/// Site-level values shared by every outgoing email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateContext {
    pub app_name: String,
    pub app_url: String,
    pub user_name: Option<String>,
}

impl Default for TemplateContext {
    fn default() -> Self {
        Self {
            app_name: "Your App".to_string(),
            app_url: "https://yourapp.com".to_string(),
            user_name: None,
        }
    }
}

#[derive(Template)]
#[template(
    source = r#"
<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Verification code - {{ app_name }}</title>
    <style>
        body { font-family: Arial, sans-serif; line-height: 1.6; color: #3c3c3c; margin: 0; padding: 20px; background-color: #f7f7f7; }
        .container { max-width: 600px; margin: 0 auto; background: white; padding: 30px; border-radius: 8px; }
        .code { font-size: 32px; letter-spacing: 8px; text-align: center; font-family: monospace; background: #f8f9fa; padding: 16px; border-radius: 4px; }
        .footer { margin-top: 30px; padding-top: 20px; border-top: 1px solid #eee; font-size: 12px; color: #666; }
    </style>
</head>
<body>
    <div class="container">
        <h1>{{ app_name }}</h1>

        <p>{% if let Some(name) = user_name %}Hello {{ name }},{% else %}Hello,{% endif %}</p>

        <p>Use the code below to finish signing in. It expires in {{ validity_minutes }} minutes.</p>

        <p class="code">{{ code }}</p>

        <p>If you didn't request this email, you can safely ignore it.</p>

        <div class="footer">
            <p>This email was sent by {{ app_name }}.</p>
        </div>
    </div>
</body>
</html>
"#,
    ext = "html"
)]
pub struct OtpCodeHtmlTemplate {
    pub app_name: String,
    pub user_name: Option<String>,
    pub code: String,
    pub validity_minutes: i64,
}

#[derive(Template)]
#[template(
    source = r#"{% if let Some(name) = user_name %}Hello {{ name }},{% else %}Hello,{% endif %}

Use the code below to finish signing in to {{ app_name }}. It expires in {{ validity_minutes }} minutes.

    {{ code }}

If you didn't request this email, you can safely ignore it.
"#,
    ext = "txt"
)]
pub struct OtpCodeTextTemplate {
    pub app_name: String,
    pub user_name: Option<String>,
    pub code: String,
    pub validity_minutes: i64,
}

/// The one-time password email.
pub struct OtpCodeEmail;

impl OtpCodeEmail {
    pub fn build(
        from: &str,
        to: &str,
        code: &str,
        validity_minutes: i64,
        context: TemplateContext,
    ) -> Result<Email, MailerError> {
        let html = OtpCodeHtmlTemplate {
            app_name: context.app_name.clone(),
            user_name: context.user_name.clone(),
            code: code.to_string(),
            validity_minutes,
        }
        .render()?;

        let text = OtpCodeTextTemplate {
            app_name: context.app_name.clone(),
            user_name: context.user_name,
            code: code.to_string(),
            validity_minutes,
        }
        .render()?;

        Email::builder()
            .from(from)
            .to(to)
            .subject(format!(
                "Your login verification code - {}",
                context.app_name
            ))
            .html_body(html)
            .text_body(text)
            .build()
    }
}
