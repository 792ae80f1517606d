//! `chunkwise chat ...` commands.

use anyhow::Result;

use crate::chat::{ChatController, ChatView};
use crate::client::{connect, open_store};
use crate::config::Config;
use crate::models::{ChatMessage, ChatModel, ChatRole};

fn controller(config: &Config) -> Result<ChatController> {
    Ok(ChatController::new(connect(config)?, open_store(config)))
}

fn print_message(message: &ChatMessage) {
    let label = match message.role {
        ChatRole::User => "you",
        ChatRole::Assistant => "assistant",
        ChatRole::Developer => "developer",
    };
    println!("[{}]", label);
    println!("{}", message.content);
    println!();
}

pub async fn run_chat_send(
    config: &Config,
    session_id: &str,
    message: &str,
    model: ChatModel,
) -> Result<()> {
    let controller = controller(config)?;
    let mut view = ChatView::open(&controller, session_id, model)?;
    view.input = message.to_string();

    let before = view.messages().len();
    if let Err(e) = view.send(&controller).await {
        eprintln!("Send failed; your message was not added to the transcript.");
        return Err(e.into());
    }
    // Print only what this exchange added.
    for message in view.messages().iter().skip(before) {
        print_message(message);
    }
    Ok(())
}

pub fn run_chat_history(config: &Config, session_id: &str, model: ChatModel) -> Result<()> {
    let controller = controller(config)?;
    let history = controller.get_history(session_id, model)?;
    if history.messages.is_empty() {
        println!("No messages yet for {} ({}).", session_id, model);
        return Ok(());
    }
    for message in &history.messages {
        print_message(message);
    }
    Ok(())
}

pub fn run_chat_delete(config: &Config, session_id: &str, model: ChatModel) -> Result<()> {
    let controller = controller(config)?;
    controller.delete_history(session_id, model)?;
    println!("Chat history for {} ({}) deleted.", session_id, model);
    Ok(())
}
