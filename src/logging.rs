use std::fmt;
use uuid::Uuid;

/// Sanitized wrapper for email addresses that masks the local part
#[derive(Debug, Clone)]
pub struct SanitizedEmail(String);

impl SanitizedEmail {
    pub fn new(email: impl AsRef<str>) -> Self {
        Self(Self::sanitize(email.as_ref()))
    }

    fn sanitize(email: &str) -> String {
        match email.split_once('@') {
            Some((local, domain)) => {
                let masked_local = match local.chars().next() {
                    Some(first) if local.chars().count() > 2 => format!("{first}***"),
                    _ => "*".repeat(local.chars().count()),
                };
                format!("{masked_local}@{domain}")
            }
            None => "***@***".to_string(),
        }
    }
}

impl fmt::Display for SanitizedEmail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sanitized wrapper for usernames that keeps only the first and last character.
/// Usernames may be e-mail addresses, so they are never logged verbatim.
#[derive(Debug, Clone)]
pub struct SanitizedUsername(String);

impl SanitizedUsername {
    pub fn new(username: impl AsRef<str>) -> Self {
        Self(Self::sanitize(username.as_ref()))
    }

    fn sanitize(username: &str) -> String {
        let mut chars = username.chars();
        let len = username.chars().count();
        match (chars.next(), chars.next_back()) {
            (Some(first), Some(last)) if len > 4 => format!("{first}***{last}"),
            (Some(first), _) if len > 2 => format!("{first}***"),
            _ => "*".repeat(len),
        }
    }
}

impl fmt::Display for SanitizedUsername {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LoggableUuid(pub Uuid);

impl fmt::Display for LoggableUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for LoggableUuid {
    fn from(uuid: Uuid) -> Self {
        LoggableUuid(uuid)
    }
}

/// Sanitized wrapper for IP addresses that masks the host part
#[derive(Debug, Clone)]
pub struct SanitizedIpAddr(String);

impl SanitizedIpAddr {
    pub fn new(ip: impl fmt::Display) -> Self {
        Self(Self::sanitize(&ip.to_string()))
    }

    fn sanitize(ip: &str) -> String {
        if let Some(last_dot) = ip.rfind('.') {
            format!("{}.***", &ip[..last_dot])
        } else if let Some(last_colon) = ip.rfind(':') {
            format!("{}:****", &ip[..last_colon])
        } else {
            "***".to_string()
        }
    }
}

impl fmt::Display for SanitizedIpAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Security event types for structured logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityEvent {
    LoginSuccess,
    LoginFailure,
    Logout,
    RegistrationSuccess,
    RegistrationFailure,
    SessionRejected,
    UnauthorizedAccess,
    ForbiddenAccess,
    RateLimitExceeded,
}

impl SecurityEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityEvent::LoginSuccess => "login_success",
            SecurityEvent::LoginFailure => "login_failure",
            SecurityEvent::Logout => "logout",
            SecurityEvent::RegistrationSuccess => "registration_success",
            SecurityEvent::RegistrationFailure => "registration_failure",
            SecurityEvent::SessionRejected => "session_rejected",
            SecurityEvent::UnauthorizedAccess => "unauthorized_access",
            SecurityEvent::ForbiddenAccess => "forbidden_access",
            SecurityEvent::RateLimitExceeded => "rate_limit_exceeded",
        }
    }

    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            SecurityEvent::LoginFailure
                | SecurityEvent::UnauthorizedAccess
                | SecurityEvent::RateLimitExceeded
        )
    }
}

impl fmt::Display for SecurityEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log a security event with sanitized context
#[macro_export]
macro_rules! log_security_event {
    ($event:expr, $($field:tt)*) => {
        if $event.is_critical() {
            tracing::warn!(
                security_event = %$event,
                event_type = "security",
                $($field)*
            );
        } else {
            tracing::info!(
                security_event = %$event,
                event_type = "security",
                $($field)*
            );
        }
    };
}
