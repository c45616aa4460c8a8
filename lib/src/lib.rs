//! Probe the mail exchangers of a domain over SMTP, without sending a
//! message, to tell whether an address is deliverable, whether the domain
//! accepts mail for any address (catch-all), whether the mailbox is full and
//! whether the provider disabled it.
//!
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use mxprobe_lib::{Config, Verifier};
//!
//! let verifier = Verifier::new(Config {
//!     smtp_check_enabled: true,
//!     ..Default::default()
//! })?;
//! let result = verifier.check_smtp("example.com", Some("alice")).await?;
//! println!("{result:?}");
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use hickory_resolver::TokioResolver;
use serde::{Deserialize, Serialize};

mod config;
mod dial;
mod error;
mod heuristics;
mod mx;
mod probe;
mod race;

pub use config::Config;
pub use error::{Error, ErrorKind, Incomplete, Result, SmtpError};
pub use mx::LookupMx;

use dial::{DialSettings, Proxy};

/// Outcome of the SMTP probes for one address
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmtpResult {
    /// A session could be established with one of the exchangers
    pub host_exists: bool,
    /// The mailbox is out of storage
    pub full_inbox: bool,
    /// The domain accepts mail for any local part
    pub catch_all: bool,
    /// The server accepted the specific recipient
    pub deliverable: bool,
    /// The provider blocked or disabled the address
    pub disabled: bool,
}

/// Runs SMTP verifications with a fixed [`Config`].
#[derive(Clone)]
pub struct Verifier<R = TokioResolver> {
    config: Arc<Config>,
    dial: DialSettings,
    resolver: R,
}

impl Verifier {
    /// Create a verifier backed by the system DNS configuration
    pub fn new(config: Config) -> Result<Self> {
        Self::with_resolver(config, mx::system_resolver()?)
    }
}

impl<R: LookupMx> Verifier<R> {
    /// Create a verifier resolving mail exchangers through `resolver`
    pub fn with_resolver(config: Config, resolver: R) -> Result<Self> {
        let proxy = config
            .proxy_uri
            .as_deref()
            .map(str::trim)
            .filter(|uri| !uri.is_empty())
            .map(Proxy::parse)
            .transpose()?;

        let dial = DialSettings {
            hello_name: config.hello_name.clone(),
            port: config.port,
            proxy,
            timeout: config.dial_timeout,
        };

        Ok(Self {
            config: Arc::new(config),
            dial,
            resolver,
        })
    }

    /// The configuration this verifier was built with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Verify `address` by splitting it into local part and domain.
    /// The address is expected to be syntactically valid already.
    pub async fn check(&self, address: &str) -> std::result::Result<Option<SmtpResult>, Incomplete> {
        match address.rsplit_once('@') {
            Some((local_part, domain)) if !local_part.is_empty() && !domain.is_empty() => {
                self.check_smtp(domain, Some(local_part)).await
            }
            _ => Err(Incomplete {
                result: SmtpResult::default(),
                source: Error::InvalidAddress(address.into()).into(),
            }),
        }
    }

    /// Perform the SMTP verification of `domain`.
    ///
    /// `username` is used to check the deliverability of a specific address;
    /// it is skipped on catch-all servers where the answer carries no
    /// information. Returns `Ok(None)` when SMTP checking is disabled.
    pub async fn check_smtp(
        &self,
        domain: &str,
        username: Option<&str>,
    ) -> std::result::Result<Option<SmtpResult>, Incomplete> {
        if !self.config.smtp_check_enabled {
            return Ok(None);
        }

        let mut result = SmtpResult::default();

        if let Err(source) = self.check_catch_all(domain, &mut result).await {
            tracing::info!(domain, %source, "catch-all probe failed");
            return Err(Incomplete { result, source });
        }

        let username = username.filter(|name| !name.is_empty());
        let Some(username) = username.filter(|_| !result.catch_all) else {
            tracing::info!(domain, ?result, "SMTP verification finished");
            return Ok(Some(result));
        };

        // Reopen rather than add a second recipient to the same session:
        // some servers (notably Microsoft) then answer with errors such as
        // `452 4.5.3 Recipients belong to multiple regions`
        if let Err(source) = self.check_presence(domain, username, &mut result).await {
            tracing::info!(domain, %source, "deliverability probe failed");
            return Err(Incomplete { result, source });
        }

        tracing::info!(domain, username, ?result, "SMTP verification finished");
        Ok(Some(result))
    }
}
