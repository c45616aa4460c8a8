use std::{fmt, io};

use hickory_resolver::ResolveError;
use thiserror::Error;

use crate::{SmtpResult, heuristics};

/// Raw failure raised while resolving, dialing or talking to a mail exchanger.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid email address: {0}")]
    InvalidAddress(String),
    #[error("domain IDNA conversion failed for {0}")]
    InvalidDomain(String),
    #[error("invalid proxy URI: {0}")]
    InvalidProxy(String),
    #[error("MX lookup failed: {0}")]
    Resolve(#[from] ResolveError),
    #[error("no MX records found for {0}")]
    NoMxRecords(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("SOCKS5 error: {0}")]
    Socks5(#[from] fast_socks5::SocksError),
    #[error("SMTP error: {0}")]
    Smtp(#[from] async_smtp::error::Error),
    #[error("timeout connecting to mail-exchanger")]
    Timeout,
    #[error("dial task ended without reporting")]
    DialAborted,
}

pub type Result<T = ()> = std::result::Result<T, Error>;

/// Semantic category of a failure, independent of where it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Timeout,
    NoSuchHost,
    /// The canonical "mailbox does not exist" rejection
    ServerUnavailable,
    Blocked,
    TryAgainLater,
    FullInbox,
    TooManyRecipients,
    NoRelay,
    MailboxBusy,
    ExceededMessagingLimits,
    NotAllowed,
    NeedMailBeforeRcpt,
    RecipientMoved,
    NoMxRecords,
    Resolution,
    ConnectionFailed,
    /// No known pattern matched; carries no signal
    Unclassified,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use ErrorKind::*;
        f.write_str(match self {
            Timeout => "The connection to the mail server has timed out",
            NoSuchHost => "Mail server does not exist",
            ServerUnavailable => "Mail server is unavailable",
            Blocked => "Blocked by mail server",
            TryAgainLater => "Try again later",
            FullInbox => "Recipient out of disk space",
            TooManyRecipients => "Too many recipients",
            NoRelay => "Not an open relay",
            MailboxBusy => "Mailbox busy",
            ExceededMessagingLimits => "Messaging limits have been exceeded",
            NotAllowed => "Not allowed",
            NeedMailBeforeRcpt => "Need MAIL before RCPT",
            RecipientMoved => "Recipient has moved",
            NoMxRecords => "No MX records found",
            Resolution => "MX lookup failed",
            ConnectionFailed => "Connection to the mail server failed",
            Unclassified => "Unclassified error",
        })
    }
}

/// An [`Error`] together with its semantic [`ErrorKind`].
#[derive(Debug, Error)]
#[error("{kind}: {source}")]
pub struct SmtpError {
    pub kind: ErrorKind,
    #[source]
    pub source: Error,
}

impl SmtpError {
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl From<Error> for SmtpError {
    fn from(source: Error) -> Self {
        Self {
            kind: heuristics::classify(&source),
            source,
        }
    }
}

/// The orchestrator could not finish; `result` holds whatever was
/// established before `source` stopped it.
#[derive(Debug, Error)]
#[error("SMTP verification incomplete: {source}")]
pub struct Incomplete {
    pub result: SmtpResult,
    #[source]
    pub source: SmtpError,
}
