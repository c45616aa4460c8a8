use std::future::Future;

use async_smtp::{
    EmailAddress,
    commands::{MailCommand, QuitCommand, RcptCommand},
};
use rand::{Rng, distributions::Alphanumeric};
use tokio::time::timeout;

use crate::{
    SmtpResult, Verifier,
    dial::Session,
    error::{Error, ErrorKind, Result, SmtpError},
    mx::{self, LookupMx},
    race,
};

/// Length of the local part used to detect catch-all servers
const RANDOM_LOCAL_PART_LEN: usize = 32;

/// A local part nobody plausibly owns
pub(crate) fn random_local_part() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(RANDOM_LOCAL_PART_LEN)
        .map(char::from)
        .collect()
}

impl<R: LookupMx> Verifier<R> {
    /// Probe `domain` with an address that cannot plausibly exist.
    ///
    /// Marks the domain catch-all unless the server rejects the address as
    /// nonexistent. Rejections only set flags on `ret`; an error is returned
    /// when no session could be established and initialized.
    pub async fn check_catch_all(
        &self,
        domain: &str,
        ret: &mut SmtpResult,
    ) -> std::result::Result<(), SmtpError> {
        let domain = mx::to_ascii(domain)?;
        let mut session = self.open_session(&domain, ret).await?;

        // Default sets catch-all to true
        ret.catch_all = true;

        let address = format!("{}@{domain}", random_local_part());
        if let Err(error) = self.rcpt(&mut session, address).await {
            let error = SmtpError::from(error);
            tracing::debug!(%domain, %error, "random recipient rejected");
            match error.kind {
                ErrorKind::FullInbox => ret.full_inbox = true,
                ErrorKind::NotAllowed | ErrorKind::Blocked => ret.disabled = true,
                // the typical `550 5.1.1` reply: the recipient does not exist
                ErrorKind::ServerUnavailable => ret.catch_all = false,
                _ => {}
            }
        }

        self.release(session).await;
        Ok(())
    }

    /// Probe `username@domain` on a fresh session; `ret.deliverable` is set
    /// when the server accepts the recipient.
    pub async fn check_presence(
        &self,
        domain: &str,
        username: &str,
        ret: &mut SmtpResult,
    ) -> std::result::Result<(), SmtpError> {
        let domain = mx::to_ascii(domain)?;
        let mut session = self.open_session(&domain, ret).await?;

        match self.rcpt(&mut session, format!("{username}@{domain}")).await {
            Ok(()) => ret.deliverable = true,
            Err(error) => tracing::debug!(%domain, %error, "recipient rejected"),
        }

        self.release(session).await;
        Ok(())
    }

    /// Win a race against the exchangers of `ascii_domain`, then declare the
    /// envelope sender. The hello name went out with the handshake's EHLO.
    async fn open_session(
        &self,
        ascii_domain: &str,
        ret: &mut SmtpResult,
    ) -> std::result::Result<Session, SmtpError> {
        let mut session = race::first_session(&self.resolver, ascii_domain, &self.dial).await?;

        // Host exists if we've successfully formed a connection
        ret.host_exists = true;

        let sender = EmailAddress::new(self.config.from_email.clone())
            .map_err(|_| Error::InvalidAddress(self.config.from_email.clone()))?;
        self.bounded(
            session
                .get_mut()
                .command(MailCommand::new(Some(sender), vec![])),
        )
        .await?;

        Ok(session)
    }

    async fn rcpt(&self, session: &mut Session, address: String) -> Result {
        let recipient =
            EmailAddress::new(address.clone()).map_err(|_| Error::InvalidAddress(address))?;
        self.bounded(
            session
                .get_mut()
                .command(RcptCommand::new(recipient, vec![])),
        )
        .await?;
        Ok(())
    }

    /// Say goodbye and drop the connection
    async fn release(&self, mut session: Session) {
        if let Err(error) = self.bounded(session.get_mut().command(QuitCommand)).await {
            tracing::debug!(%error, "QUIT failed, dropping the connection anyway");
        }
    }

    async fn bounded<T>(
        &self,
        command: impl Future<Output = std::result::Result<T, async_smtp::error::Error>>,
    ) -> Result<T> {
        timeout(self.config.command_timeout, command)
            .await
            .map_err(|_| Error::Timeout)?
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_local_part_is_long_and_alphanumeric() {
        let local = random_local_part();
        assert_eq!(local.len(), 32);
        assert!(local.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(local, random_local_part());
    }
}
