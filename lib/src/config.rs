use std::time::Duration;

/// Settings shared by every verification a [`Verifier`](crate::Verifier) runs.
#[derive(Debug, Clone)]
pub struct Config {
    /// Identity announced with `EHLO`
    pub hello_name: String,
    /// Envelope sender announced with `MAIL FROM`
    pub from_email: String,
    /// Optional `socks5://[user[:password]@]host[:port]` endpoint
    pub proxy_uri: Option<String>,
    /// When disabled, no SMTP check is performed and no result is produced
    pub smtp_check_enabled: bool,
    /// Port dialed on every mail exchanger
    pub port: u16,
    /// Bound on establishing a connection and reading the banner of a single host
    pub dial_timeout: Duration,
    /// Bound on each command issued once a session is established
    pub command_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hello_name: "localhost".into(),
            from_email: "user@example.org".into(),
            proxy_uri: None,
            smtp_check_enabled: false,
            port: 25,
            dial_timeout: Duration::from_secs(30),
            command_timeout: Duration::from_secs(10),
        }
    }
}
