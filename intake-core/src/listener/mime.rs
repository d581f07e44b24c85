//! Splits a raw RFC822 message into the parts the parser (4.C) needs:
//! subject, the plain-text body, the HTML body if present, and the
//! `Content-Language` header.

pub struct MailParts {
    pub subject: String,
    pub text: String,
    pub html: Option<String>,
    pub content_language: Option<String>,
}

pub fn parse_message(raw: &[u8]) -> Result<MailParts, String> {
    let parsed = mailparse::parse_mail(raw).map_err(|err| err.to_string())?;

    let subject = parsed
        .headers
        .get_first_value("Subject")
        .unwrap_or_default();
    let content_language = parsed.headers.get_first_value("Content-Language");

    let mut text = String::new();
    let mut html: Option<String> = None;
    collect_bodies(&parsed, &mut text, &mut html);

    Ok(MailParts {
        subject,
        text,
        html,
        content_language,
    })
}

fn collect_bodies(part: &mailparse::ParsedMail, text: &mut String, html: &mut Option<String>) {
    if part.subparts.is_empty() {
        let mimetype = part.ctype.mimetype.to_lowercase();
        if let Ok(body) = part.get_body() {
            if mimetype.contains("html") {
                html.get_or_insert_with(String::new).push_str(&body);
            } else if mimetype.starts_with("text/") {
                text.push_str(&body);
            }
        }
    } else {
        for subpart in &part.subparts {
            collect_bodies(subpart, text, html);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_subject_and_plain_text() {
        let raw = b"Subject: New task [#77]\r\nContent-Type: text/plain\r\n\r\nHello body text\r\n";
        let parts = parse_message(raw).unwrap();
        assert_eq!(parts.subject, "New task [#77]");
        assert!(parts.text.contains("Hello body text"));
        assert!(parts.html.is_none());
    }
}
