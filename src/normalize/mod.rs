//! 消息规范化：拆分 system 指令并保留对话轮次顺序。
//!
//! Message normalization shared by every provider driver.
//!
//! Providers disagree on where system text goes (inline turn, top-level
//! field, agent prompt), so normalization always separates it first. The
//! joined instruction uses a single space between system messages, in the
//! order they were encountered. User and assistant turns keep their relative
//! order; nothing except system messages (and, under [`RolePolicy::Drop`],
//! unrecognized roles) is removed. Providers that take system turns inline
//! read [`NormalizedRequest::conversation`] instead, where system messages
//! keep their original positions.

mod alias;

pub use alias::{map_provider_name, PROVIDER_ALIASES};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, ErrorContext};
use crate::types::{Message, MessageRole};
use crate::Result;

/// What to do with messages whose role is not `system`, `user` or `assistant`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RolePolicy {
    /// Skip the message; it does not apply to any supported provider.
    #[default]
    Drop,
    /// Fail normalization with a validation error.
    Reject,
}

impl std::str::FromStr for RolePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "drop" => Ok(RolePolicy::Drop),
            "reject" => Ok(RolePolicy::Reject),
            other => Err(Error::configuration_with_context(
                format!("unknown role policy '{}'", other),
                ErrorContext::new()
                    .with_details("expected 'drop' or 'reject'")
                    .with_source("settings"),
            )),
        }
    }
}

/// Messages split into an out-of-band system instruction and chat turns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedRequest {
    pub system: Option<String>,
    /// Only `user` and `assistant` messages, in original order.
    pub turns: Vec<Message>,
    /// Every recognized message, system included, in original order.
    pub conversation: Vec<Message>,
}

impl NormalizedRequest {
    pub fn system_text(&self) -> &str {
        self.system.as_deref().unwrap_or("")
    }

    /// Appends caller-supplied turns (e.g. the live user input) after the
    /// configured ones. System messages among them are folded into the
    /// instruction so the split stays consistent.
    pub fn extend(&mut self, extra: &[Message], policy: RolePolicy) -> Result<()> {
        let more = normalize(extra, policy)?;
        if let Some(text) = more.system {
            self.system = Some(match self.system.take() {
                Some(existing) => format!("{} {}", existing, text),
                None => text,
            });
        }
        self.turns.extend(more.turns);
        self.conversation.extend(more.conversation);
        Ok(())
    }
}

/// Split `messages` into system instruction and chat turns.
pub fn normalize(messages: &[Message], policy: RolePolicy) -> Result<NormalizedRequest> {
    let mut system_parts: Vec<&str> = Vec::new();
    let mut turns = Vec::with_capacity(messages.len());
    let mut conversation = Vec::with_capacity(messages.len());

    for (idx, m) in messages.iter().enumerate() {
        match &m.role {
            MessageRole::System => {
                system_parts.push(&m.content);
                conversation.push(m.clone());
            }
            MessageRole::User | MessageRole::Assistant => {
                turns.push(m.clone());
                conversation.push(m.clone());
            }
            MessageRole::Other(role) => match policy {
                RolePolicy::Drop => {
                    debug!(index = idx, role = %role, "dropping message with unrecognized role");
                }
                RolePolicy::Reject => {
                    return Err(Error::validation_with_context(
                        format!("unrecognized message role '{}'", role),
                        ErrorContext::new()
                            .with_field_path(format!("messages[{}].role", idx))
                            .with_details("expected system, user or assistant")
                            .with_source("normalizer"),
                    ));
                }
            },
        }
    }

    let system = if system_parts.is_empty() {
        None
    } else {
        Some(system_parts.join(" "))
    };

    Ok(NormalizedRequest {
        system,
        turns,
        conversation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_messages_joined_with_single_space() {
        let msgs = vec![
            Message::system("Be terse."),
            Message::user("Hi"),
            Message::system("Answer in English."),
        ];
        let norm = normalize(&msgs, RolePolicy::Drop).unwrap();
        assert_eq!(norm.system.as_deref(), Some("Be terse. Answer in English."));
        assert_eq!(norm.turns, vec![Message::user("Hi")]);
    }

    #[test]
    fn test_no_system_messages_yields_none() {
        let msgs = vec![Message::user("Hi"), Message::assistant("Hello")];
        let norm = normalize(&msgs, RolePolicy::Drop).unwrap();
        assert!(norm.system.is_none());
        assert_eq!(norm.system_text(), "");
        assert_eq!(norm.turns.len(), 2);
    }

    #[test]
    fn test_unrecognized_role_dropped_by_default() {
        let msgs = vec![
            Message::user("Hi"),
            Message::new(MessageRole::Other("tool".into()), "42"),
            Message::assistant("Hello"),
        ];
        let norm = normalize(&msgs, RolePolicy::default()).unwrap();
        assert_eq!(norm.turns, vec![Message::user("Hi"), Message::assistant("Hello")]);
    }

    #[test]
    fn test_unrecognized_role_rejected_when_strict() {
        let msgs = vec![
            Message::user("Hi"),
            Message::new(MessageRole::Other("tool".into()), "42"),
        ];
        let err = normalize(&msgs, RolePolicy::Reject).unwrap_err();
        let ctx = err.context().unwrap();
        assert_eq!(ctx.field_path.as_deref(), Some("messages[1].role"));
    }

    #[test]
    fn test_extend_folds_extra_system_text() {
        let mut norm = normalize(&[Message::system("A.")], RolePolicy::Drop).unwrap();
        norm.extend(&[Message::system("B."), Message::user("Hi")], RolePolicy::Drop)
            .unwrap();
        assert_eq!(norm.system.as_deref(), Some("A. B."));
        assert_eq!(norm.turns, vec![Message::user("Hi")]);
        assert_eq!(
            norm.conversation,
            vec![Message::system("A."), Message::system("B."), Message::user("Hi")]
        );
    }

    #[test]
    fn test_conversation_keeps_system_positions() {
        let msgs = vec![
            Message::user("Q1"),
            Message::system("S"),
            Message::new(MessageRole::Other("tool".into()), "42"),
            Message::user("Q2"),
        ];
        let norm = normalize(&msgs, RolePolicy::Drop).unwrap();
        assert_eq!(norm.system.as_deref(), Some("S"));
        assert_eq!(
            norm.conversation,
            vec![Message::user("Q1"), Message::system("S"), Message::user("Q2")]
        );
    }

    #[test]
    fn test_role_policy_parsing() {
        assert_eq!("Reject".parse::<RolePolicy>().unwrap(), RolePolicy::Reject);
        assert!("lenient".parse::<RolePolicy>().is_err());
    }
}
