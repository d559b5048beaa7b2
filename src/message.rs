use std::io::Read;

use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::{Address, Message};

use crate::attachment::AttachmentHandle;
use crate::request::SendRequest;
use crate::sender::SendError;

/// Value of the `User-Agent` header stamped on every outgoing message.
pub const USER_AGENT: &str = concat!("mailsend/", env!("CARGO_PKG_VERSION"));

fn parse_mailbox(field: &'static str, value: &str) -> Result<Mailbox, SendError> {
    value.parse().map_err(|source| SendError::InvalidAddress {
        field,
        value: value.to_string(),
        source,
    })
}

/// `Name <address>`; the name is quoted by the builder when it needs to be.
fn sender_mailbox(request: &SendRequest) -> Result<Mailbox, SendError> {
    let address: Address = request
        .from_address
        .parse()
        .map_err(|source| SendError::InvalidAddress {
            field: "from",
            value: request.sender(),
            source,
        })?;
    let name = Some(request.from_display_name.clone()).filter(|name| !name.is_empty());
    Ok(Mailbox::new(name, address))
}

fn body_part(request: &SendRequest) -> SinglePart {
    if request.is_html {
        SinglePart::html(request.body.clone())
    } else {
        SinglePart::plain(request.body.clone())
    }
}

/// Build the outgoing message, reading attachment contents in order.
pub fn build_message<F: Read>(
    request: &SendRequest,
    attachments: &mut [AttachmentHandle<F>],
) -> Result<Message, SendError> {
    let from = sender_mailbox(request)?;
    let to = parse_mailbox("to", &request.to)?;

    let builder = Message::builder()
        .from(from)
        .to(to)
        .subject(request.subject.clone())
        .user_agent(USER_AGENT.to_string());

    if attachments.is_empty() {
        return builder.singlepart(body_part(request)).map_err(SendError::Build);
    }

    let mut mixed = MultiPart::mixed().singlepart(body_part(request));
    for attachment in attachments.iter_mut() {
        let data = attachment
            .read_contents()
            .map_err(|source| SendError::AttachmentUnreadable {
                path: attachment.path().to_string(),
                source,
            })?;
        let content_type = ContentType::parse(attachment.content_type()).map_err(|_| {
            SendError::InvalidContentType(attachment.content_type().to_string())
        })?;

        log::debug!(
            "Attaching {} ({} bytes, {})",
            attachment.filename(),
            data.len(),
            attachment.content_type()
        );
        let part = Attachment::new(attachment.filename().to_string()).body(data, content_type);
        mixed = mixed.singlepart(part);
    }

    builder.multipart(mixed).map_err(SendError::Build)
}
