//! Sends router replies to the chat.

use teloxide::prelude::*;
use teloxide::types::{CallbackQueryId, InputFile, MessageId};
use upsalecore::shop::{Reply, View};
use upsalecore::{Shop, SqliteStore};

use crate::telegram::views::{notice_text, render, total_keyboard, Outgoing};
use crate::telegram::Bot;

/// Where the replies to one update go.
#[derive(Debug, Clone)]
pub struct ReplyContext {
    pub chat_id: ChatId,
    pub buyer_id: i64,
    /// Message whose inline button was pressed
    pub current: Option<MessageId>,
    pub callback_id: Option<CallbackQueryId>,
}

impl ReplyContext {
    pub fn message(chat_id: ChatId, buyer_id: i64) -> Self {
        Self {
            chat_id,
            buyer_id,
            current: None,
            callback_id: None,
        }
    }

    pub fn callback(chat_id: ChatId, buyer_id: i64, current: Option<MessageId>, callback_id: CallbackQueryId) -> Self {
        Self {
            chat_id,
            buyer_id,
            current,
            callback_id: Some(callback_id),
        }
    }
}

/// Delivers replies in order. A failed edit or delete is logged and
/// skipped; a failed send aborts the rest. The callback query is answered
/// either way.
pub async fn deliver(bot: &Bot, shop: &Shop<SqliteStore>, ctx: &ReplyContext, replies: Vec<Reply>) -> ResponseResult<()> {
    let mut toast = None;
    let result = apply(bot, shop, ctx, replies, &mut toast).await;

    // Telegram keeps the button spinner until the query is answered
    if let Some(callback_id) = &ctx.callback_id {
        let mut answer = bot.answer_callback_query(callback_id.clone());
        if let Some(text) = toast {
            answer = answer.text(text);
        }
        if let Err(e) = answer.await {
            log::warn!("Failed to answer callback query: {}", e);
        }
    }
    result
}

async fn apply(
    bot: &Bot,
    shop: &Shop<SqliteStore>,
    ctx: &ReplyContext,
    replies: Vec<Reply>,
    toast: &mut Option<String>,
) -> ResponseResult<()> {
    for reply in replies {
        match reply {
            Reply::Send(view) => {
                let is_total = matches!(view, View::CartTotal { .. });
                let sent = send(bot, ctx.chat_id, &render(&view)).await?;
                if is_total {
                    if let Err(e) = shop.remember_total_message(ctx.buyer_id, sent.id.0).await {
                        log::error!("Failed to remember total message for buyer {}: {}", ctx.buyer_id, e);
                    }
                }
            }
            Reply::EditCurrent(view) => {
                let outgoing = render(&view);
                match ctx.current {
                    Some(message_id) => edit(bot, ctx.chat_id, message_id, &outgoing).await,
                    None => {
                        send(bot, ctx.chat_id, &outgoing).await?;
                    }
                }
            }
            Reply::RefreshTotal { message_id, total } => {
                if let Err(e) = bot
                    .edit_message_reply_markup(ctx.chat_id, MessageId(message_id))
                    .reply_markup(total_keyboard(total))
                    .await
                {
                    log::warn!("Failed to refresh total message {}: {}", message_id, e);
                }
            }
            Reply::DeleteCurrent => {
                if let Some(message_id) = ctx.current {
                    if let Err(e) = bot.delete_message(ctx.chat_id, message_id).await {
                        log::warn!("Failed to delete message {}: {}", message_id.0, e);
                    }
                }
            }
            Reply::Toast(notice) => {
                if ctx.callback_id.is_some() {
                    *toast = Some(notice_text(notice));
                } else {
                    bot.send_message(ctx.chat_id, notice_text(notice)).await?;
                }
            }
        }
    }
    Ok(())
}

/// Sends a photo with caption when the view has one; falls back to plain
/// text when the image URL is unusable.
async fn send(bot: &Bot, chat_id: ChatId, outgoing: &Outgoing) -> ResponseResult<Message> {
    if let Some(photo) = &outgoing.photo {
        match url::Url::parse(photo) {
            Ok(url) => {
                let mut request = bot.send_photo(chat_id, InputFile::url(url)).caption(outgoing.text.clone());
                if let Some(markup) = outgoing.markup.clone() {
                    request = request.reply_markup(markup);
                }
                match request.await {
                    Ok(message) => return Ok(message),
                    Err(e) => log::warn!("Failed to send photo {}: {}. Sending text instead", photo, e),
                }
            }
            Err(e) => log::warn!("Invalid product image URL {}: {}", photo, e),
        }
    }

    let mut request = bot.send_message(chat_id, outgoing.text.clone());
    if let Some(markup) = outgoing.markup.clone() {
        request = request.reply_markup(markup);
    }
    request.await
}

/// Edit caption if the view is a photo card, else edit text.
async fn edit(bot: &Bot, chat_id: ChatId, message_id: MessageId, outgoing: &Outgoing) {
    let result = if outgoing.photo.is_some() {
        let mut request = bot
            .edit_message_caption(chat_id, message_id)
            .caption(outgoing.text.clone());
        if let Some(keyboard) = outgoing.inline_keyboard() {
            request = request.reply_markup(keyboard);
        }
        request.await.map(|_| ())
    } else {
        let mut request = bot.edit_message_text(chat_id, message_id, outgoing.text.clone());
        if let Some(keyboard) = outgoing.inline_keyboard() {
            request = request.reply_markup(keyboard);
        }
        request.await.map(|_| ())
    };

    if let Err(e) = result {
        // "message is not modified" lands here when a stale button is pressed
        log::warn!("Failed to edit message {}: {}", message_id.0, e);
    }
}
