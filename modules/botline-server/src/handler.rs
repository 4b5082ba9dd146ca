use std::sync::Arc;

use async_trait::async_trait;
use botline_common::{
    EventKind, EventPatch, MessageEntry, NormalizedEvent, ProfileSummary, ScheduledEvent,
};
use botline_dispatch::{EventContext, EventHandler};
use botline_state::{StateError, StateServices};
use line_client::{Messenger, OutboundMessage};
use tracing::{debug, info, warn};

use crate::commands::{self, Command, EVENT_USAGE};
use crate::reply::ReplyGenerator;

pub const UNKNOWN_SENDER: &str =
    "I can't tell who sent that, so I can't create or change events from it.";

pub const GREETING: &str =
    "Hi everyone! Mention me with a message to chat, or type /event to plan something.";

/// Application behaviour for every normalized event.
pub struct BotHandler {
    state: Arc<StateServices>,
    messenger: Arc<dyn Messenger>,
    replies: Arc<dyn ReplyGenerator>,
}

impl BotHandler {
    pub fn new(
        state: Arc<StateServices>,
        messenger: Arc<dyn Messenger>,
        replies: Arc<dyn ReplyGenerator>,
    ) -> Self {
        Self {
            state,
            messenger,
            replies,
        }
    }

    async fn route(&self, event: NormalizedEvent) -> anyhow::Result<()> {
        let conversation_id = event.conversation_id.as_str();

        match &event.kind {
            EventKind::Join => self.on_join(&event).await,
            EventKind::Leave => {
                match self.state.groups.remove_bot(conversation_id).await {
                    Ok(_) => {}
                    Err(e @ (StateError::NotInGroup { .. } | StateError::NotFound { .. })) => {
                        debug!(conversation_id, reason = %e, "Leave for unknown membership");
                    }
                    Err(e) => return Err(e.into()),
                }
                self.state.profiles.invalidate(conversation_id);
                Ok(())
            }
            EventKind::Follow => self.respond(&event, GREETING).await,
            EventKind::MemberJoined { user_ids } => {
                for user_id in user_ids {
                    match self.state.groups.add_member(conversation_id, user_id).await {
                        Ok(_) => {}
                        Err(e @ StateError::AlreadyMember { .. }) => debug!(reason = %e, "Skipping"),
                        Err(e) => return Err(e.into()),
                    }
                }
                Ok(())
            }
            EventKind::MemberLeft { user_ids } => {
                for user_id in user_ids {
                    match self.state.groups.remove_member(conversation_id, user_id).await {
                        Ok(_) => {}
                        Err(e @ (StateError::NotMember { .. } | StateError::NotFound { .. })) => {
                            debug!(reason = %e, "Skipping")
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                Ok(())
            }
            EventKind::Text { text } => match commands::parse(text) {
                Some(command) => self.on_command(&event, command).await,
                None => self.on_chat(&event, text).await,
            },
            EventKind::Unfollow
            | EventKind::Image { .. }
            | EventKind::Sticker { .. }
            | EventKind::Postback { .. } => {
                info!(conversation_id, kind = event.kind.name(), "Event ignored");
                Ok(())
            }
        }
    }

    async fn on_join(&self, event: &NormalizedEvent) -> anyhow::Result<()> {
        let group_id = event.conversation_id.as_str();

        match self.state.groups.add_bot(group_id).await {
            Ok(_) => {}
            Err(e @ StateError::AlreadyInGroup { .. }) => {
                // Redelivered join: state already records it and the group was greeted.
                debug!(group_id, reason = %e, "Duplicate join");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }

        if let Err(e) = self.refresh_profile(group_id).await {
            warn!(group_id, error = %e, "Failed to refresh group profile");
        }

        self.respond(event, GREETING).await
    }

    async fn refresh_profile(&self, group_id: &str) -> anyhow::Result<()> {
        let summary = self.messenger.group_summary(group_id).await?;
        let member_count = match self.messenger.group_member_count(group_id).await {
            Ok(count) => Some(count),
            Err(e) => {
                debug!(group_id, error = %e, "Member count unavailable");
                None
            }
        };

        self.state
            .profiles
            .set(
                group_id,
                ProfileSummary {
                    display_name: summary.group_name,
                    picture_url: summary.picture_url,
                    member_count,
                },
            )
            .await?;
        Ok(())
    }

    async fn on_command(&self, event: &NormalizedEvent, command: Command) -> anyhow::Result<()> {
        let conversation_id = event.conversation_id.as_str();
        let events = &self.state.events;

        // Ownership is checked against the sender, so changes need a known one.
        let sender = event.actor_id.as_deref().filter(|id| !id.is_empty());
        let changes_event = matches!(
            command,
            Command::NewEvent { .. } | Command::EditEvent { .. } | Command::CancelEvent
        );
        let actor_id = match sender {
            Some(id) => id,
            None if changes_event => {
                info!(conversation_id, "Event command without a sender, refusing");
                return self.respond(event, UNKNOWN_SENDER).await;
            }
            None => "",
        };

        let reply = match command {
            Command::NewEvent { title, description } => {
                let scheduled = ScheduledEvent {
                    conversation_id: conversation_id.to_string(),
                    creator_id: actor_id.to_string(),
                    title,
                    description,
                };
                match events.create(&scheduled).await {
                    Ok(_) => format!("Event created: {}", scheduled.title),
                    Err(StateError::Conflict { .. }) => {
                        "There is already an active event here. Cancel it first.".to_string()
                    }
                    Err(e) => user_facing(e)?,
                }
            }
            Command::ShowEvent => match events.get(conversation_id).await {
                Ok(current) => describe(&current),
                Err(e) => user_facing(e)?,
            },
            Command::EditEvent { description } => {
                match events
                    .update(conversation_id, actor_id, EventPatch::description(description))
                    .await
                {
                    Ok(updated) => format!("Event updated.\n{}", describe(&updated)),
                    Err(e) => user_facing(e)?,
                }
            }
            Command::CancelEvent => match events.delete(conversation_id, actor_id).await {
                Ok(cancelled) => format!("Event cancelled: {}", cancelled.title),
                Err(e) => user_facing(e)?,
            },
            Command::ResetHistory => {
                if self.state.history.reset(conversation_id).await? {
                    "Conversation history cleared.".to_string()
                } else {
                    "There is no history to clear.".to_string()
                }
            }
            Command::EventUsage => EVENT_USAGE.to_string(),
        };

        self.respond(event, &reply).await
    }

    async fn on_chat(&self, event: &NormalizedEvent, text: &str) -> anyhow::Result<()> {
        let conversation_id = event.conversation_id.as_str();

        let history = self
            .state
            .history
            .append(conversation_id, MessageEntry::user(text))
            .await?;

        let answer = self.replies.generate(&history.value).await?;
        if answer.trim().is_empty() {
            debug!(conversation_id, "Empty reply, nothing to send");
            return Ok(());
        }

        self.state
            .history
            .append(conversation_id, MessageEntry::assistant(answer.as_str()))
            .await?;

        self.respond(event, &answer).await
    }

    /// Answer through the reply token when there is one, else push. A token
    /// the platform rejects (expired or already used) also falls back to push.
    async fn respond(&self, event: &NormalizedEvent, text: &str) -> anyhow::Result<()> {
        let messages = [OutboundMessage::text(text)];
        if let Some(token) = &event.reply_token {
            match self.messenger.reply(token, &messages).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_rejected_reply_token() => {
                    warn!(
                        conversation_id = %event.conversation_id,
                        error = %e,
                        "Reply token rejected, pushing instead"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }
        self.messenger.push(&event.conversation_id, &messages).await?;
        Ok(())
    }
}

#[async_trait]
impl EventHandler for BotHandler {
    async fn handle(&self, ctx: &EventContext, event: NormalizedEvent) -> anyhow::Result<()> {
        ctx.run(self.route(event)).await?
    }
}

/// Short message for outcomes a user can act on; anything else propagates.
fn user_facing(err: StateError) -> anyhow::Result<String> {
    let text = match err {
        StateError::NotFound { .. } => "There is no active event.",
        StateError::Forbidden { .. } => "Only the creator can change this event.",
        StateError::Conflict { .. } => {
            "Someone else changed the event at the same time. Please try again."
        }
        other => return Err(other.into()),
    };
    Ok(text.to_string())
}

fn describe(event: &ScheduledEvent) -> String {
    if event.description.is_empty() {
        format!("📅 {}", event.title)
    } else {
        format!("📅 {}\n{}", event.title, event.description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_facing_messages() {
        let forbidden = StateError::Forbidden {
            kind: "event",
            id: "C1".into(),
            actor: "U2".into(),
        };
        assert_eq!(
            user_facing(forbidden).unwrap(),
            "Only the creator can change this event."
        );

        let conflict = StateError::Conflict {
            kind: "event",
            id: "C1".into(),
        };
        assert!(user_facing(conflict).unwrap().contains("try again"));

        let other = StateError::NotInGroup {
            group_id: "C1".into(),
        };
        assert!(user_facing(other).is_err());
    }

    #[test]
    fn describe_omits_empty_description() {
        let mut event = ScheduledEvent {
            conversation_id: "C1".into(),
            creator_id: "U1".into(),
            title: "Hike".into(),
            description: String::new(),
        };
        assert_eq!(describe(&event), "📅 Hike");
        event.description = "Saturday".into();
        assert_eq!(describe(&event), "📅 Hike\nSaturday");
    }
}
