//! Role cardinality checks and instruction-role remapping

use serde::Serialize;
use tracing::debug;

use crate::domain::DomainError;
use crate::domain::llm::{MessageList, MessageRole};
use crate::domain::model::CapabilityFlags;

/// An instruction message whose role was changed to fit the target model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoleRewrite {
    pub index: usize,
    pub from: MessageRole,
    pub to: MessageRole,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedMessages {
    pub messages: MessageList,
    pub rewrite: Option<RoleRewrite>,
}

/// Validate the conversation and adapt its instruction message to the model's messaging style.
///
/// Order and count of messages are preserved; only the role of the single
/// system or developer message may change.
pub fn normalize(
    model: &str,
    capabilities: &CapabilityFlags,
    messages: impl Into<MessageList>,
) -> Result<NormalizedMessages, DomainError> {
    let messages = messages.into();
    if messages.is_empty() {
        return Err(DomainError::no_messages(model));
    }

    let system_count = count_role(&messages, MessageRole::System);
    let developer_count = count_role(&messages, MessageRole::Developer);

    if system_count > 1 {
        return Err(DomainError::invalid_message(
            "Only one system message is allowed per conversation",
        ));
    }
    if developer_count > 1 {
        return Err(DomainError::invalid_message(
            "Only one developer message is allowed per conversation",
        ));
    }
    if system_count == 1 && developer_count == 1 {
        return Err(DomainError::invalid_message(
            "System and developer messages are mutually exclusive",
        ));
    }

    let mut messages = messages.into_inner();
    let rewrite = messages
        .iter()
        .position(|m| m.role.is_instruction())
        .and_then(|index| {
            let from = messages[index].role;
            target_role(from, capabilities).map(|to| RoleRewrite { index, from, to })
        });

    if let Some(rewrite) = rewrite {
        messages[rewrite.index].role = rewrite.to;
        debug!(
            model = %model,
            index = rewrite.index,
            from = %rewrite.from,
            to = %rewrite.to,
            "Rewrote instruction message role"
        );
    }

    Ok(NormalizedMessages {
        messages: messages.into(),
        rewrite,
    })
}

fn count_role(messages: &MessageList, role: MessageRole) -> usize {
    messages.iter().filter(|m| m.role == role).count()
}

/// Role an instruction message must take for this model, if it differs from its own
fn target_role(role: MessageRole, capabilities: &CapabilityFlags) -> Option<MessageRole> {
    match role {
        MessageRole::System if capabilities.system_message => None,
        MessageRole::System if capabilities.developer_message => Some(MessageRole::Developer),
        MessageRole::Developer if capabilities.developer_message => None,
        MessageRole::Developer if capabilities.system_message => Some(MessageRole::System),
        MessageRole::System | MessageRole::Developer => Some(MessageRole::User),
        MessageRole::User | MessageRole::Assistant => None,
    }
}
