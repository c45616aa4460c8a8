use std::io;

use async_smtp::response::Response;

use crate::error::{Error, ErrorKind};

/// Textual hints that a rejection concerns the recipient mailbox itself
const UNDELIVERABLE_WORDS: &[&str] = &[
    "undeliverable",
    "does not exist",
    "may not exist",
    "user unknown",
    "user not found",
    "invalid address",
    "recipient invalid",
    "recipient rejected",
    "address rejected",
    "no mailbox",
];

/// `452` is shared between storage problems and recipient limits
const FULL_INBOX_WORDS: &[&str] = &["full", "space", "over quota", "insufficient"];

/// Textual heuristics to detect blocklisting on a `550`
const BLOCKLIST_WORDS: &[&str] = &[
    "spamhaus",
    "proofpoint",
    "cloudmark",
    "banned",
    "blacklisted",
    "blocked",
    "block list",
    "denied",
];

/// Blocklisting words checked on replies without a recognised status code
const BASIC_BLOCK_WORDS: &[&str] = &[
    "spamhaus",
    "proofpoint",
    "cloudmark",
    "banned",
    "blocked",
    "denied",
];

/// Map any failure onto its [`ErrorKind`]
pub(crate) fn classify(error: &Error) -> ErrorKind {
    use async_smtp::error::Error as Smtp;
    match error {
        Error::Smtp(Smtp::Transient(response) | Smtp::Permanent(response)) => {
            from_response(response)
        }
        Error::Smtp(Smtp::Timeout(_)) | Error::Timeout => ErrorKind::Timeout,
        Error::Smtp(other) => from_text(&other.to_string()),
        Error::NoMxRecords(_) => ErrorKind::NoMxRecords,
        Error::Resolve(e) if e.is_no_records_found() => ErrorKind::NoMxRecords,
        Error::Resolve(_) => ErrorKind::Resolution,
        Error::Io(e) => from_io(e),
        Error::Socks5(e) => or_connection_failed(from_text(&e.to_string())),
        Error::DialAborted => ErrorKind::ConnectionFailed,
        Error::InvalidAddress(_) | Error::InvalidDomain(_) | Error::InvalidProxy(_) => {
            ErrorKind::Unclassified
        }
    }
}

fn from_response(response: &Response) -> ErrorKind {
    // `Code` renders as its three digits
    let code = response.code.to_string().parse().unwrap_or_default();
    from_reply(code, &response.message.join(" "))
}

/// Classify an SMTP reply by status code and text
pub(crate) fn from_reply(code: u16, text: &str) -> ErrorKind {
    if code <= 400 {
        return ErrorKind::Unclassified;
    }

    if contains_any(text, UNDELIVERABLE_WORDS) {
        return ErrorKind::ServerUnavailable;
    }

    match code {
        421 => ErrorKind::TryAgainLater,
        450 => ErrorKind::MailboxBusy,
        451 => ErrorKind::ExceededMessagingLimits,
        452 if contains_any(text, FULL_INBOX_WORDS) => ErrorKind::FullInbox,
        452 => ErrorKind::TooManyRecipients,
        503 => ErrorKind::NeedMailBeforeRcpt,
        // 550 is "mailbox unavailable", which is mostly undeliverable
        // unless the text points at a blocklist
        550 if contains_any(text, BLOCKLIST_WORDS) => ErrorKind::Blocked,
        550 => ErrorKind::ServerUnavailable,
        551 => ErrorKind::RecipientMoved,
        552 => ErrorKind::FullInbox,
        553 => ErrorKind::NoRelay,
        554 => ErrorKind::NotAllowed,
        _ => from_text(text),
    }
}

/// Fallback for failures that carry no usable status code
pub(crate) fn from_text(text: &str) -> ErrorKind {
    if contains_any(text, BASIC_BLOCK_WORDS) {
        ErrorKind::Blocked
    } else if contains_any(text, &["timeout", "timed out"]) {
        ErrorKind::Timeout
    } else if contains_any(text, &["no such host"]) {
        ErrorKind::NoSuchHost
    } else if contains_any(text, &["unavailable"]) {
        ErrorKind::ServerUnavailable
    } else {
        ErrorKind::Unclassified
    }
}

fn from_io(error: &io::Error) -> ErrorKind {
    use io::ErrorKind::*;
    match error.kind() {
        TimedOut => ErrorKind::Timeout,
        ConnectionRefused | ConnectionReset | ConnectionAborted | NotConnected
        | AddrNotAvailable | BrokenPipe | UnexpectedEof | HostUnreachable
        | NetworkUnreachable => ErrorKind::ConnectionFailed,
        _ => or_connection_failed(from_text(&error.to_string())),
    }
}

fn or_connection_failed(kind: ErrorKind) -> ErrorKind {
    match kind {
        ErrorKind::Unclassified => ErrorKind::ConnectionFailed,
        kind => kind,
    }
}

fn contains_any(text: &str, words: &[&str]) -> bool {
    let text = text.to_lowercase();
    words.iter().any(|word| text.contains(word))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonexistent_mailbox_wins_over_status_code() {
        assert_eq!(
            from_reply(452, "4.2.2 user unknown, mailbox full"),
            ErrorKind::ServerUnavailable
        );
        assert_eq!(
            from_reply(550, "5.1.1 The email account that you tried to reach does not exist"),
            ErrorKind::ServerUnavailable
        );
    }

    #[test]
    fn plain_550_means_unavailable() {
        assert_eq!(from_reply(550, "5.1.1 No such user"), ErrorKind::ServerUnavailable);
    }

    #[test]
    fn blocklisted_550() {
        assert_eq!(
            from_reply(550, "5.7.1 Client host blocked using Spamhaus"),
            ErrorKind::Blocked
        );
        assert_eq!(from_reply(550, "Access DENIED"), ErrorKind::Blocked);
    }

    #[test]
    fn storage_replies() {
        assert_eq!(from_reply(552, "5.2.2 Mailbox quota exceeded"), ErrorKind::FullInbox);
        assert_eq!(from_reply(452, "4.2.2 Mailbox full"), ErrorKind::FullInbox);
        assert_eq!(from_reply(452, "4.5.3 Over Quota"), ErrorKind::FullInbox);
        assert_eq!(
            from_reply(452, "4.5.3 Recipients belong to multiple regions"),
            ErrorKind::TooManyRecipients
        );
    }

    #[test]
    fn status_code_table() {
        assert_eq!(from_reply(421, "Service not available"), ErrorKind::TryAgainLater);
        assert_eq!(from_reply(450, "Mailbox busy"), ErrorKind::MailboxBusy);
        assert_eq!(from_reply(451, "Rate limited"), ErrorKind::ExceededMessagingLimits);
        assert_eq!(from_reply(503, "Bad sequence"), ErrorKind::NeedMailBeforeRcpt);
        assert_eq!(from_reply(551, "User not local"), ErrorKind::RecipientMoved);
        assert_eq!(from_reply(553, "Relaying denied"), ErrorKind::NoRelay);
        assert_eq!(from_reply(554, "Transaction failed"), ErrorKind::NotAllowed);
    }

    #[test]
    fn unknown_codes_fall_back_to_text() {
        assert_eq!(from_reply(535, "Authentication failed"), ErrorKind::Unclassified);
        assert_eq!(from_reply(530, "Your IP is banned"), ErrorKind::Blocked);
        assert_eq!(from_reply(471, "Service unavailable"), ErrorKind::ServerUnavailable);
    }

    #[test]
    fn low_codes_carry_no_signal() {
        assert_eq!(from_reply(250, "user unknown"), ErrorKind::Unclassified);
        assert_eq!(from_reply(400, "blocked"), ErrorKind::Unclassified);
    }

    #[test]
    fn transport_errors() {
        let refused = Error::Io(io::Error::from(io::ErrorKind::ConnectionRefused));
        assert_eq!(classify(&refused), ErrorKind::ConnectionFailed);

        let timed_out = Error::Io(io::Error::from(io::ErrorKind::TimedOut));
        assert_eq!(classify(&timed_out), ErrorKind::Timeout);

        let lookup = Error::Io(io::Error::other("failed to lookup address: no such host"));
        assert_eq!(classify(&lookup), ErrorKind::NoSuchHost);

        assert_eq!(classify(&Error::Timeout), ErrorKind::Timeout);
        assert_eq!(
            classify(&Error::NoMxRecords("example.test".into())),
            ErrorKind::NoMxRecords
        );
    }
}
