//! Email bodies sent by the service.

use rust_decimal::Decimal;

use super::email::{EmailAttachment, EmailMessage};
use crate::models::{Company, Invoice, User};

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn money(amount: Decimal) -> String {
    format!("€{:.2}", amount)
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>{title}</title></head>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
<div style="max-width: 600px; margin: 0 auto; padding: 20px;">
{body}
</div>
</body>
</html>"#,
        title = escape_html(title),
        body = body
    )
}

fn payment_lines(company: &Company, invoice: &Invoice) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(bank) = &company.bank_name {
        lines.push(format!("Bank: {}", bank));
    }
    if let Some(account) = &company.bank_account {
        lines.push(format!("Account: {}", account));
    }
    if let Some(reference) = &invoice.payment_reference {
        lines.push(format!("Payment reference: {}", reference));
    }
    lines
}

/// Invoice delivery with the PDF attached.
pub fn invoice_email(company: &Company, invoice: &Invoice, to: &str, pdf: Vec<u8>) -> EmailMessage {
    let subject = format!("Invoice {} - {}", invoice.invoice_number, company.name);
    let payment = payment_lines(company, invoice);

    let body_text = format!(
        "Hello,\n\nPlease find attached invoice {number}.\n\nInvoice date: {date}\nDue date: {due}\nAmount due: {total}\n\n{payment}\n\nKind regards,\n{company}\n",
        number = invoice.invoice_number,
        date = invoice.invoice_date,
        due = invoice.due_date,
        total = money(invoice.total),
        payment = payment.join("\n"),
        company = company.name,
    );

    let payment_html: String = payment
        .iter()
        .map(|line| format!("<p>{}</p>", escape_html(line)))
        .collect();
    let body_html = layout(
        &subject,
        &format!(
            "<h2>{company}</h2>\
             <p>Hello,</p>\
             <p>Please find attached invoice <strong>{number}</strong>.</p>\
             <p>Invoice date: {date}<br>Due date: {due}</p>\
             <p style=\"font-size: 22px; font-weight: bold;\">Amount due: {total}</p>\
             {payment_html}\
             <p>Kind regards,<br>{company}</p>",
            company = escape_html(&company.name),
            number = escape_html(&invoice.invoice_number),
            date = invoice.invoice_date,
            due = invoice.due_date,
            total = money(invoice.total),
        ),
    );

    EmailMessage {
        to: to.to_string(),
        subject,
        body_text,
        body_html,
        attachment: Some(EmailAttachment::pdf(
            format!("{}.pdf", invoice.invoice_number),
            pdf,
        )),
    }
}

/// Reminder for an unpaid invoice.
pub fn payment_reminder_email(company: &Company, invoice: &Invoice, to: &str) -> EmailMessage {
    let subject = format!("Reminder: invoice {} - {}", invoice.invoice_number, company.name);
    let payment = payment_lines(company, invoice);

    let body_text = format!(
        "Hello,\n\nThis is a reminder that invoice {number} is unpaid.\nIt was due on {due}.\nAmount due: {total}\n\n{payment}\n\nIf you have already paid, please ignore this message.\n\nKind regards,\n{company}\n",
        number = invoice.invoice_number,
        due = invoice.due_date,
        total = money(invoice.total),
        payment = payment.join("\n"),
        company = company.name,
    );

    let payment_html: String = payment
        .iter()
        .map(|line| format!("<p>{}</p>", escape_html(line)))
        .collect();
    let body_html = layout(
        &subject,
        &format!(
            "<h2>Unpaid invoice reminder</h2>\
             <p>Hello,</p>\
             <p>Invoice <strong>{number}</strong> was due on {due} and is still unpaid.</p>\
             <p style=\"font-size: 22px; font-weight: bold; color: #dc2626;\">Amount due: {total}</p>\
             {payment_html}\
             <p>If you have already paid, please ignore this message.</p>\
             <p>Kind regards,<br>{company}</p>",
            number = escape_html(&invoice.invoice_number),
            due = invoice.due_date,
            total = money(invoice.total),
            company = escape_html(&company.name),
        ),
    );

    EmailMessage {
        to: to.to_string(),
        subject,
        body_text,
        body_html,
        attachment: None,
    }
}

/// Welcome message carrying the email verification link.
pub fn welcome_email(user: &User, verify_url: &str) -> EmailMessage {
    let subject = "Welcome to SąskaitaPro".to_string();
    let body_text = format!(
        "Hello {name},\n\nThanks for signing up. Confirm your email address here:\n{url}\n\nStart by filling in your company details in the settings.\n",
        name = user.first_name,
        url = verify_url,
    );
    let body_html = layout(
        &subject,
        &format!(
            "<h2>Welcome!</h2>\
             <p>Hello {name},</p>\
             <p>Thanks for signing up. Confirm your email address:</p>\
             <p><a href=\"{url}\">Verify email</a></p>\
             <p>Start by filling in your company details in the settings.</p>",
            name = escape_html(&user.first_name),
            url = escape_html(verify_url),
        ),
    );

    EmailMessage {
        to: user.email.clone(),
        subject,
        body_text,
        body_html,
        attachment: None,
    }
}

pub fn password_reset_email(user: &User, reset_url: &str) -> EmailMessage {
    let subject = "Password reset - SąskaitaPro".to_string();
    let body_text = format!(
        "Hello {name},\n\nWe received a request to reset your password. Set a new one here:\n{url}\n\nThe link is valid for one hour. If you did not ask for this, ignore this message.\n",
        name = user.first_name,
        url = reset_url,
    );
    let body_html = layout(
        &subject,
        &format!(
            "<h2>Password reset</h2>\
             <p>Hello {name},</p>\
             <p>We received a request to reset your password.</p>\
             <p><a href=\"{url}\">Set a new password</a></p>\
             <p>The link is valid for one hour. If you did not ask for this, ignore this message.</p>",
            name = escape_html(&user.first_name),
            url = escape_html(reset_url),
        ),
    );

    EmailMessage {
        to: user.email.clone(),
        subject,
        body_text,
        body_html,
        attachment: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(escape_html("<b>A & B</b>"), "&lt;b&gt;A &amp; B&lt;/b&gt;");
    }

    #[test]
    fn formats_money_with_cents() {
        assert_eq!(money(Decimal::new(24200, 2)), "€242.00");
        assert_eq!(money(Decimal::new(5, 0)), "€5.00");
    }
}
