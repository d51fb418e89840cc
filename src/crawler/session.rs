//! Session and interaction policy
//!
//! Describes how a page should be visited: credentials, interaction steps
//! and readiness conditions. The coordinator never looks inside; the
//! fetcher decides which parts it can honor.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Browser action performed by an interaction step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserAction {
    Click,
    Scroll,
    Wait,
    Type,
    Submit,
}

impl BrowserAction {
    /// Returns true if the action needs a live browser page
    pub fn requires_browser(&self) -> bool {
        !matches!(self, Self::Wait)
    }
}

/// Condition a page must reach before it counts as loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaitCondition {
    #[serde(rename = "networkidle")]
    NetworkIdle,
    #[serde(rename = "load")]
    Load,
    #[serde(rename = "domcontentloaded")]
    DomContentLoaded,
}

/// Credentials for authenticated pages
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
    pub token: Option<String>,
}

/// One step of a scripted page interaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionStep {
    pub action: BrowserAction,
    #[serde(default)]
    pub selector: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    /// Milliseconds
    #[serde(default = "default_step_timeout")]
    pub timeout: Option<u64>,
}

fn default_step_timeout() -> Option<u64> {
    Some(30_000)
}

/// Session/interaction policy attached to a crawl request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionPolicy {
    pub auth_required: bool,
    pub credentials: Option<Credentials>,
    pub interaction_steps: Vec<InteractionStep>,
    pub wait_conditions: Vec<WaitCondition>,
    /// Page timeout in milliseconds
    pub timeout: u64,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            auth_required: false,
            credentials: None,
            interaction_steps: Vec::new(),
            wait_conditions: vec![WaitCondition::NetworkIdle],
            timeout: 30_000,
        }
    }
}

/// How a request should authenticate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authentication {
    Bearer(String),
    Basic {
        username: String,
        password: Option<String>,
    },
}

impl SessionPolicy {
    /// Resolves credentials into an authentication method
    ///
    /// A token takes precedence over username/password. Returns `None`
    /// when authentication is not required or no usable credentials exist.
    pub fn authentication(&self) -> Option<Authentication> {
        if !self.auth_required {
            return None;
        }
        let credentials = self.credentials.as_ref()?;

        if let Some(token) = credentials.token.as_ref().filter(|t| !t.is_empty()) {
            return Some(Authentication::Bearer(token.clone()));
        }

        credentials
            .username
            .as_ref()
            .filter(|u| !u.is_empty())
            .map(|username| Authentication::Basic {
                username: username.clone(),
                password: credentials.password.clone(),
            })
    }

    /// Total time requested by `wait` steps
    pub fn wait_duration(&self) -> Duration {
        self.interaction_steps
            .iter()
            .filter(|step| step.action == BrowserAction::Wait)
            .filter_map(|step| step.timeout)
            .map(Duration::from_millis)
            .sum()
    }

    /// Steps that need a real browser page to run
    pub fn browser_steps(&self) -> impl Iterator<Item = &InteractionStep> {
        self.interaction_steps
            .iter()
            .filter(|step| step.action.requires_browser())
    }
}
