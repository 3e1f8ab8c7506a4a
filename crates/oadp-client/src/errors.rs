//! Short user-facing sentences for failures of the Kubernetes API.

use std::fmt;

/// The failure classes users get to see instead of raw API errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApiFailure {
    NotFound,
    Forbidden,
    Unauthorized,
    Conflict,
    AlreadyExists,
    Timeout,
    ServiceUnavailable,
    ConnectionRefused,
    NoSuchHost,
    Other,
}

impl ApiFailure {
    /// Classifies an API failure by its HTTP status code (if the server
    /// answered at all) and its message.
    pub fn classify(code: Option<u16>, message: &str) -> Self {
        match code {
            Some(404) => return Self::NotFound,
            Some(403) => return Self::Forbidden,
            Some(401) => return Self::Unauthorized,
            Some(409) if message.contains("already exists") => return Self::AlreadyExists,
            Some(409) => return Self::Conflict,
            Some(408 | 504) => return Self::Timeout,
            Some(503) => return Self::ServiceUnavailable,
            _ => {}
        }

        let message = message.to_ascii_lowercase();
        if message.contains("connection refused") {
            Self::ConnectionRefused
        } else if message.contains("no such host") || message.contains("dns error") {
            Self::NoSuchHost
        } else if message.contains("timed out") || message.contains("timeout") {
            Self::Timeout
        } else if message.contains("not found") {
            Self::NotFound
        } else if message.contains("forbidden") {
            Self::Forbidden
        } else if message.contains("unauthorized") {
            Self::Unauthorized
        } else if message.contains("service unavailable") {
            Self::ServiceUnavailable
        } else {
            Self::Other
        }
    }

    /// Classifies a [`kube::Error`], looking at the whole source chain of
    /// transport errors.
    pub fn from_kube(error: &kube::Error) -> Self {
        if let kube::Error::Api(response) = error {
            return Self::classify(Some(response.code), &response.message);
        }

        let mut message = error.to_string();
        let mut source = std::error::Error::source(error);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        Self::classify(None, &message)
    }
}

impl fmt::Display for ApiFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotFound => "the requested resource was not found",
            Self::Forbidden => "permission denied, you are not allowed to perform this operation",
            Self::Unauthorized => "authentication failed, check your kubeconfig credentials",
            Self::Conflict => {
                "the resource was modified concurrently, fetch it again and retry"
            }
            Self::AlreadyExists => "a resource with this name already exists",
            Self::Timeout => "the request to the cluster timed out",
            Self::ServiceUnavailable => "the cluster API is currently unavailable",
            Self::ConnectionRefused => "connection to the cluster was refused, is it reachable?",
            Self::NoSuchHost => "the cluster address could not be resolved",
            Self::Other => "operation failed",
        })
    }
}
