//! HTML bodies for bot messages. Inputs must already be sanitized.

const HEADER: &str = "<b>New contact form submission</b>";

/// Body of a text-only notification. The message line is left out when empty.
pub fn contact_message(name: &str, email: &str, message: &str) -> String {
    let mut text = format!("{HEADER}\n\n<b>Name:</b> {name}\n<b>Email:</b> {email}");
    if !message.is_empty() {
        text.push_str("\n<b>Message:</b>\n");
        text.push_str(message);
    }
    text
}

/// Caption sent along with an uploaded file. The explanation line is left out when empty.
pub fn file_caption(name: &str, email: &str, explanation: &str) -> String {
    let mut caption = format!("{HEADER}\n\n<b>Name:</b> {name}\n<b>Email:</b> {email}");
    if !explanation.is_empty() {
        caption.push_str("\n<b>Explanation:</b>\n");
        caption.push_str(explanation);
    }
    caption
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contact_message() {
        assert_eq!(
            contact_message("Ada", "ada@example.com", "Hello there"),
            "<b>New contact form submission</b>\n\n<b>Name:</b> Ada\n<b>Email:</b> ada@example.com\n<b>Message:</b>\nHello there"
        );
    }

    #[test]
    fn test_contact_message_without_body() {
        let text = contact_message("Ada", "ada@example.com", "");
        assert!(!text.contains("Message:"));
        assert!(text.ends_with("<b>Email:</b> ada@example.com"));
    }

    #[test]
    fn test_file_caption_with_explanation() {
        let caption = file_caption("Ada", "ada@example.com", "See attached");
        assert!(caption.starts_with("<b>New contact form submission</b>"));
        assert!(caption.ends_with("<b>Explanation:</b>\nSee attached"));
    }

    #[test]
    fn test_file_caption_without_explanation() {
        let caption = file_caption("Ada", "ada@example.com", "");
        assert!(!caption.contains("Explanation"));
        assert!(caption.ends_with("<b>Email:</b> ada@example.com"));
    }
}
