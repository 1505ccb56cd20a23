use std::collections::BTreeMap;

use tera::{Context, Tera};

use assetflow_core::notify::{NotificationKind, NotifyError};

/// Rendered subject and HTML body for one notification email.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmailContent {
    pub subject: String,
    pub html: String,
}

const REQUEST_SUBMITTED_HTML: &str = r#"<div style="font-family: sans-serif; max-width: 600px; margin: 0 auto;">
  <h2 style="color: #1a1a1a;">New Asset Request Submitted</h2>
  <p>A new request has been submitted and requires your attention.</p>
  <div style="background: #f5f5f5; padding: 16px; border-radius: 8px; margin: 16px 0;">
    <p><strong>Requester:</strong> {{ requester_name }}</p>
    <p><strong>Asset Type:</strong> {{ asset_type_name }}</p>
    <p><strong>Submitted:</strong> {{ created_at }}</p>
  </div>
</div>
"#;

const REQUEST_APPROVED_HTML: &str = r#"<div style="font-family: sans-serif; max-width: 600px; margin: 0 auto;">
  <h2 style="color: #22c55e;">Request Approved</h2>
  <p>Your asset request has been approved.</p>
  <div style="background: #f0fdf4; padding: 16px; border-radius: 8px; margin: 16px 0;">
    <p><strong>Asset Type:</strong> {{ asset_type_name }}</p>
    <p><strong>Approved by:</strong> {{ approver_name }}</p>
    {% if comment %}<p><strong>Comment:</strong> {{ comment }}</p>{% endif %}
  </div>
</div>
"#;

const REQUEST_DENIED_HTML: &str = r#"<div style="font-family: sans-serif; max-width: 600px; margin: 0 auto;">
  <h2 style="color: #ef4444;">Request Denied</h2>
  <p>Your asset request has been denied.</p>
  <div style="background: #fef2f2; padding: 16px; border-radius: 8px; margin: 16px 0;">
    <p><strong>Asset Type:</strong> {{ asset_type_name }}</p>
    <p><strong>Denied by:</strong> {{ approver_name }}</p>
    <p><strong>Reason:</strong> {{ comment }}</p>
  </div>
</div>
"#;

/// Per-event email templates. Template names end in `.html` so Tera's
/// autoescaping applies to interpolated user content.
pub struct EmailTemplates {
    tera: Tera,
}

impl EmailTemplates {
    pub fn new() -> Result<Self, NotifyError> {
        let mut tera = Tera::default();
        tera.add_raw_templates([
            ("request_submitted.html", REQUEST_SUBMITTED_HTML),
            ("request_approved.html", REQUEST_APPROVED_HTML),
            ("request_denied.html", REQUEST_DENIED_HTML),
        ])
        .map_err(|e| NotifyError::Render(e.to_string()))?;

        Ok(Self { tera })
    }

    pub fn render(
        &self,
        kind: NotificationKind,
        data: &BTreeMap<String, String>,
    ) -> Result<EmailContent, NotifyError> {
        let context =
            Context::from_serialize(data).map_err(|e| NotifyError::Render(e.to_string()))?;

        let template = match kind {
            NotificationKind::RequestSubmitted => "request_submitted.html",
            NotificationKind::RequestApproved => "request_approved.html",
            NotificationKind::RequestDenied => "request_denied.html",
        };
        let html = self
            .tera
            .render(template, &context)
            .map_err(|e| NotifyError::Render(e.to_string()))?;

        Ok(EmailContent { subject: subject_for(kind).to_string(), html })
    }
}

fn subject_for(kind: NotificationKind) -> &'static str {
    match kind {
        NotificationKind::RequestSubmitted => "New asset request awaiting review",
        NotificationKind::RequestApproved => "Your asset request was approved",
        NotificationKind::RequestDenied => "Your asset request was denied",
    }
}
