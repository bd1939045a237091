use log::{debug, warn};
use mailparse::{DispositionType, ParsedMail};

use crate::domain::email::EmailRecord;
use crate::mail::decoders::header_text;

/// Splits a raw RFC822 message into records, one per plain-text part that
/// is not an attachment. Every record carries the top-level headers.
///
/// Messages that cannot be parsed, and parts whose payload cannot be
/// decoded, contribute nothing.
pub fn extract_records(raw_rfc822: &[u8]) -> Vec<EmailRecord> {
    let parsed = match mailparse::parse_mail(raw_rfc822) {
        Ok(p) => p,
        Err(e) => {
            warn!("skipping unparseable message: {e}");
            return Vec::new();
        }
    };

    let subject = header_text(&parsed.headers, "Subject");
    let date = header_text(&parsed.headers, "Date");
    let from = header_text(&parsed.headers, "From");
    let to = header_text(&parsed.headers, "To");

    let mut parts = Vec::new();
    walk(&parsed, &mut parts);

    parts
        .into_iter()
        .filter(|p| is_plain_text_body(p))
        .filter_map(|p| match p.get_body() {
            Ok(body) => Some(body),
            Err(e) => {
                debug!("skipping undecodable part of '{subject}': {e}");
                None
            }
        })
        .map(|body| EmailRecord {
            body,
            subject: subject.clone(),
            date: date.clone(),
            from: from.clone(),
            to: to.clone(),
        })
        .collect()
}

/// Depth-first, parent before children.
fn walk<'a>(p: &'a ParsedMail<'a>, out: &mut Vec<&'a ParsedMail<'a>>) {
    out.push(p);
    for sp in &p.subparts {
        walk(sp, out);
    }
}

fn is_plain_text_body(p: &ParsedMail) -> bool {
    p.ctype.mimetype.eq_ignore_ascii_case("text/plain")
        && p.get_content_disposition().disposition != DispositionType::Attachment
}
