use std::collections::HashSet;
use std::sync::Arc;

use crate::config::AdmissionConfig;
use crate::error::{Error, Result};
use crate::types::Principal;

/// Policy consulted before a brand-new principal is persisted.
///
/// Implementations must not touch the store: callers persist the candidate
/// only after `admit` returns `Ok`.
pub trait AdmissionGate: Send + Sync {
    fn admit(&self, candidate: &Principal) -> Result<()>;
}

/// Admits everyone.
pub struct OpenGate;

impl AdmissionGate for OpenGate {
    fn admit(&self, _candidate: &Principal) -> Result<()> {
        Ok(())
    }
}

/// Ban-list, email domain allow-list and machine account policy.
pub struct PolicyGate {
    banned_logins: HashSet<String>,
    allowed_domains: HashSet<String>,
    allow_machine: bool,
}

impl PolicyGate {
    #[must_use]
    pub fn new(config: &AdmissionConfig) -> Self {
        Self {
            banned_logins: config.banned_logins.iter().map(|l| l.to_lowercase()).collect(),
            allowed_domains: config
                .allowed_email_domains
                .iter()
                .map(|d| d.trim_start_matches('@').to_lowercase())
                .collect(),
            allow_machine: config.allow_machine,
        }
    }
}

impl AdmissionGate for PolicyGate {
    fn admit(&self, candidate: &Principal) -> Result<()> {
        if self.banned_logins.contains(&candidate.login.to_lowercase()) {
            return Err(Error::AdmissionDenied(format!(
                "account {} is banned",
                candidate.login
            )));
        }

        if candidate.machine && !self.allow_machine {
            return Err(Error::AdmissionDenied(
                "machine accounts are not admitted".to_string(),
            ));
        }

        if !self.allowed_domains.is_empty() {
            let domain = candidate
                .email
                .rsplit_once('@')
                .map(|(_, domain)| domain.to_lowercase());
            if !domain.is_some_and(|d| self.allowed_domains.contains(&d)) {
                return Err(Error::AdmissionDenied(format!(
                    "email domain of {} is not allowed",
                    candidate.login
                )));
            }
        }

        Ok(())
    }
}

/// Builds the gate described by `config`.
#[must_use]
pub fn admission_gate(config: &AdmissionConfig) -> Arc<dyn AdmissionGate> {
    if config.is_open() {
        Arc::new(OpenGate)
    } else {
        Arc::new(PolicyGate::new(config))
    }
}
