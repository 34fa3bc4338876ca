//! Dispatcher schema and handler chain builders

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::Message;
use upsalecore::shop::{Event, Reply, View};

use super::types::{buyer_id, profile_from_user, HandlerDeps, HandlerError};
use crate::telegram::bot::Command;
use crate::telegram::delivery::{deliver, ReplyContext};
use crate::telegram::Bot;

/// Creates the main dispatcher schema for the Telegram bot.
///
/// The shop only talks to buyers in private chats; group updates fall
/// through unhandled.
///
/// # Arguments
/// * `deps` - Handler dependencies (shop service)
///
/// # Returns
/// The complete handler tree for the bot
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    dptree::entry()
        .branch(command_handler(deps.clone()))
        .branch(contact_handler(deps.clone()))
        .branch(text_handler(deps.clone()))
        .branch(callback_handler(deps))
}

/// Routes an event and delivers whatever the shop answered.
///
/// Storage failures only cost the buyer this one event: they are logged and
/// answered with a generic failure message.
async fn route(bot: &Bot, deps: &HandlerDeps, ctx: ReplyContext, event: Event) -> Result<(), HandlerError> {
    let replies = match deps.shop.handle(event).await {
        Ok(replies) => replies,
        Err(e) => {
            log::error!("❌ Failed to handle update from buyer {}: {}", ctx.buyer_id, e);
            vec![Reply::Send(View::Failure)]
        }
    };

    deliver(bot, &deps.shop, &ctx, replies).await?;
    Ok(())
}

fn command_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| msg.chat.is_private())
        .filter_command::<Command>()
        .endpoint(move |bot: Bot, msg: Message, cmd: Command| {
            let deps = deps.clone();
            async move {
                log::info!("🎯 Received command: {:?} from chat {}", cmd, msg.chat.id);

                let Some(profile) = msg.from.as_ref().and_then(profile_from_user) else {
                    return Ok(());
                };
                let ctx = ReplyContext::message(msg.chat.id, profile.id);
                match cmd {
                    Command::Start => route(&bot, &deps, ctx, Event::Start(profile)).await,
                }
            }
        })
}

/// Contact cards shared through the "send number" button.
fn contact_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| msg.chat.is_private() && msg.contact().is_some())
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move {
                let (Some(buyer_id), Some(contact)) = (msg.from.as_ref().and_then(buyer_id), msg.contact()) else {
                    return Ok(());
                };
                let event = Event::Contact {
                    buyer_id,
                    phone_number: contact.phone_number.clone(),
                    owner_id: contact.user_id.and_then(|id| i64::try_from(id.0).ok()),
                };
                route(&bot, &deps, ReplyContext::message(msg.chat.id, buyer_id), event).await
            }
        })
}

/// Menu buttons and checkout answers.
fn text_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| msg.chat.is_private() && msg.text().is_some())
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move {
                let (Some(profile), Some(text)) = (msg.from.as_ref().and_then(profile_from_user), msg.text()) else {
                    return Ok(());
                };
                let ctx = ReplyContext::message(msg.chat.id, profile.id);
                let event = Event::Text {
                    profile,
                    text: text.to_string(),
                };
                route(&bot, &deps, ctx, event).await
            }
        })
}

fn callback_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
        let deps = deps.clone();
        async move {
            let Some(buyer_id) = buyer_id(&q.from) else {
                return Ok(());
            };
            let Some(data) = q.data.clone() else {
                let _ = bot.answer_callback_query(q.id.clone()).await;
                return Ok(());
            };

            // Private chat ids equal the user id
            let chat_id = q.message.as_ref().map(|m| m.chat().id).unwrap_or(ChatId(buyer_id));
            let message_id = q.message.as_ref().map(|m| m.id());
            let ctx = ReplyContext::callback(chat_id, buyer_id, message_id, q.id.clone());

            route(&bot, &deps, ctx, Event::Callback { buyer_id, data }).await
        }
    })
}
