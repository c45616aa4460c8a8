use std::{collections::HashSet, future::Future};

use hickory_resolver::TokioResolver;

use crate::error::{Error, Result};

/// Source of mail-exchanger host names for a domain.
///
/// Implemented for the tokio [`hickory_resolver`] resolver; tests plug in
/// fixed host lists.
pub trait LookupMx {
    /// Exchange names for `domain`, most preferred first
    fn lookup_mx(&self, domain: &str) -> impl Future<Output = Result<Vec<String>>> + Send;
}

impl LookupMx for TokioResolver {
    async fn lookup_mx(&self, domain: &str) -> Result<Vec<String>> {
        let mut records: Vec<_> = self
            .mx_lookup(domain)
            .await?
            .iter()
            .map(|mx| (mx.preference(), mx.exchange().to_utf8()))
            .collect();

        records.sort_by_key(|(preference, _)| *preference);

        Ok(records.into_iter().map(|(_, exchange)| exchange).collect())
    }
}

/// Build the system resolver used by [`Verifier::new`](crate::Verifier::new)
pub(crate) fn system_resolver() -> Result<TokioResolver> {
    Ok(TokioResolver::builder_tokio()?.build())
}

/// Convert a (possibly internationalized) domain to its ASCII form
pub(crate) fn to_ascii(domain: &str) -> Result<String> {
    let trimmed = domain.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidDomain(domain.into()));
    }
    idna::domain_to_ascii(trimmed).map_err(|_| Error::InvalidDomain(domain.into()))
}

/// Resolve the racing candidates for `ascii_domain`.
///
/// Fails with [`Error::NoMxRecords`] when nothing usable comes back; resolver
/// failures are passed through untouched.
pub(crate) async fn resolve<R: LookupMx>(resolver: &R, ascii_domain: &str) -> Result<Vec<String>> {
    let hosts = normalize(resolver.lookup_mx(ascii_domain).await?);

    if hosts.is_empty() {
        return Err(Error::NoMxRecords(ascii_domain.into()));
    }

    tracing::debug!(domain = ascii_domain, ?hosts, "resolved mail exchangers");
    Ok(hosts)
}

/// Trim the root dot, lowercase and drop duplicates as well as null MX
/// entries (RFC 7505), keeping the original order
fn normalize(exchanges: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    exchanges
        .into_iter()
        .map(|exchange| exchange.trim_end_matches('.').to_ascii_lowercase())
        .filter(|host| !host.is_empty())
        .filter(|host| seen.insert(host.clone()))
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Resolver answering every lookup with a fixed list
    pub(crate) struct StubResolver(pub Vec<&'static str>);

    impl LookupMx for StubResolver {
        async fn lookup_mx(&self, _domain: &str) -> Result<Vec<String>> {
            Ok(self.0.iter().map(|host| host.to_string()).collect())
        }
    }

    #[test]
    fn normalize_trims_dot_lowercases_and_dedups() {
        let hosts = normalize(vec![
            "MX1.Example.com.".into(),
            "mx2.example.com.".into(),
            "mx1.example.com".into(),
            ".".into(),
        ]);
        assert_eq!(hosts, ["mx1.example.com", "mx2.example.com"]);
    }

    #[test]
    fn to_ascii_handles_idn() {
        assert_eq!(to_ascii("bücher.example").unwrap(), "xn--bcher-kva.example");
        assert_eq!(to_ascii(" Example.COM ").unwrap(), "example.com");
        assert!(matches!(to_ascii(""), Err(Error::InvalidDomain(_))));
    }

    #[tokio::test]
    async fn empty_lookup_is_no_mx_records() {
        let result = resolve(&StubResolver(vec![]), "example.test").await;
        assert!(matches!(result, Err(Error::NoMxRecords(domain)) if domain == "example.test"));
    }

    #[tokio::test]
    async fn null_mx_is_no_mx_records() {
        let result = resolve(&StubResolver(vec!["."]), "example.test").await;
        assert!(matches!(result, Err(Error::NoMxRecords(_))));
    }
}
