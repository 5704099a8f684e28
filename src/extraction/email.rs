//! Email extractors: single RFC 822 messages (eml) and mbox mailboxes.
//!
//! An mbox yields one result per contained message, lazily and in mailbox
//! order. A message that fails to parse surfaces as an `Err` item; messages
//! already yielded stay valid and later messages are still attempted.

use mail_parser::{Address, MessageParser, MimeHeaders};
use tracing::debug;

use crate::error::{DocsieveError, Result};
use crate::extraction::{ContentStream, Extractor};
use crate::types::{DocumentContent, EmailAddress, EmailAttachment, EmailContent, FileMetadata};

pub struct EmlExtractor;

impl Extractor for EmlExtractor {
    fn extract<'a>(&self, data: &'a [u8], path_hint: Option<&str>) -> Result<ContentStream<'a>> {
        let content = parse_message(data, FileMetadata::from_path_hint(path_hint))?;
        Ok(ContentStream::one(DocumentContent::Email(content)))
    }
}

pub struct MboxExtractor;

impl Extractor for MboxExtractor {
    fn extract<'a>(&self, data: &'a [u8], path_hint: Option<&str>) -> Result<ContentStream<'a>> {
        if !data.starts_with(b"From ") {
            return Err(DocsieveError::parsing(
                "mbox does not start with a From separator line",
            ));
        }
        let hint = path_hint.map(str::to_string);
        let stream = MboxMessages { data, pos: 0 }.enumerate().map(move |(i, message)| {
            let mut metadata = FileMetadata::from_path_hint(hint.as_deref());
            metadata.insert_extra("message_index", i + 1);
            parse_message(message, metadata).map(DocumentContent::Email)
        });
        Ok(ContentStream::from_iter(stream))
    }
}

/// Lazy splitter over the messages of an mbox.
///
/// `pos` always sits at the start of a `From ` separator line. The
/// separator itself is not part of the message it introduces.
struct MboxMessages<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Iterator for MboxMessages<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.data.len() {
            return None;
        }
        let rest = &self.data[self.pos..];
        // Skip the "From ..." separator line.
        let body_start = match rest.iter().position(|&b| b == b'\n') {
            Some(nl) => nl + 1,
            None => rest.len(),
        };
        let body = &rest[body_start..];
        let body_end = match find_separator(body) {
            Some(at) => at,
            None => body.len(),
        };
        self.pos += body_start + body_end;
        if body_end < body.len() {
            self.pos += 1; // consume the newline before the next separator
        }
        Some(&body[..body_end])
    }
}

/// Offset of the `\n` that precedes the next `From ` separator line, if any.
fn find_separator(body: &[u8]) -> Option<usize> {
    body.windows(6)
        .position(|w| w == b"\nFrom ")
}

fn parse_message(data: &[u8], metadata: FileMetadata) -> Result<EmailContent> {
    let message = MessageParser::default()
        .parse(data)
        .ok_or_else(|| DocsieveError::parsing("failed to parse RFC 822 message"))?;

    let attachments = message
        .attachments()
        .map(|part| EmailAttachment {
            filename: part.attachment_name().map(str::to_string),
            content_type: part
                .content_type()
                .map(|ct| match ct.subtype() {
                    Some(sub) => format!("{}/{}", ct.ctype(), sub),
                    None => ct.ctype().to_string(),
                })
                .unwrap_or_else(|| "application/octet-stream".to_string()),
            data: Some(part.contents().to_vec()),
        })
        .collect::<Vec<_>>();
    if !attachments.is_empty() {
        debug!(count = attachments.len(), "message carries attachments");
    }

    Ok(EmailContent {
        subject: message.subject().map(str::to_string),
        from: message.from().and_then(first_address),
        to: address_list(message.to()),
        cc: address_list(message.cc()),
        bcc: address_list(message.bcc()),
        date: message.date().map(|d| d.to_rfc3339()),
        message_id: message.message_id().map(str::to_string),
        body_plain: message.body_text(0).map(|b| b.into_owned()),
        body_html: message.body_html(0).map(|b| b.into_owned()),
        attachments,
        metadata,
    })
}

fn first_address(address: &Address<'_>) -> Option<EmailAddress> {
    address.first().and_then(|addr| {
        addr.address().map(|a| EmailAddress {
            name: addr.name().map(str::to_string),
            address: a.to_string(),
        })
    })
}

fn address_list(address: Option<&Address<'_>>) -> Vec<EmailAddress> {
    let Some(address) = address else {
        return Vec::new();
    };
    address
        .iter()
        .filter_map(|addr| {
            addr.address().map(|a| EmailAddress {
                name: addr.name().map(str::to_string),
                address: a.to_string(),
            })
        })
        .collect()
}
