//! Binding table for the template bot: greetings, interactive cards, a
//! dialog, and the entry points into the scripted conversations.

use std::sync::Arc;

use tracing::debug;

use huddle_core::events::{ChannelContext, ChannelJoinEvent, InteractiveActionEvent, MessageEvent};
use huddle_core::reply::{
    ActionElement, ActionStyle, Attachment, Confirmation, Dialog, Reply, SelectOption,
};
use huddle_core::{Dispatcher, HandlerError, Outcome, Pattern, StateStore};

use crate::scripts;

const GREETING_CONTEXTS: &[ChannelContext] = &[
    ChannelContext::DirectMessage,
    ChannelContext::DirectMention,
    ChannelContext::Mention,
];
const DIRECT_CONTEXTS: &[ChannelContext] =
    &[ChannelContext::DirectMessage, ChannelContext::DirectMention];

pub fn dispatcher(store: Arc<dyn StateStore>) -> Dispatcher {
    Dispatcher::new()
        .hear(
            Pattern::keywords(["hello", "hi", "yo", "greetings", "nihao"]),
            GREETING_CONTEXTS,
            |_: &MessageEvent| Ok(Outcome::reply("Yo!")),
        )
        .hear(Pattern::keyword("another_keyword"), DIRECT_CONTEXTS, |_: &MessageEvent| {
            Ok(Outcome::reply(help_card()))
        })
        .hear(Pattern::keyword("question me"), DIRECT_CONTEXTS, |_: &MessageEvent| {
            Ok(Outcome::StartConversation(scripts::proceed_script()))
        })
        .hear(Pattern::keyword("onboard me"), DIRECT_CONTEXTS, move |event: &MessageEvent| {
            Ok(Outcome::StartConversation(scripts::onboarding_script(
                store.clone(),
                event.user_id.clone(),
            )))
        })
        .hear(Pattern::keyword("interactive"), DIRECT_CONTEXTS, |_: &MessageEvent| {
            Ok(Outcome::reply(interactive_card()))
        })
        .hear(Pattern::keyword("dm me"), GREETING_CONTEXTS, |_: &MessageEvent| {
            Ok(Outcome::StartPrivateConversation(scripts::install_script()))
        })
        .on_action("123", first_round)
        .on_action("456", second_round)
        .on_member_join(|_: &ChannelJoinEvent| {
            Ok(Outcome::reply("Welcome! Say hello to me and I will say hello back."))
        })
        .on_self_join(|_: &ChannelJoinEvent| Ok(Outcome::reply("I'm here!")))
}

fn help_card() -> Reply {
    Reply::default()
        .username("My bot")
        .icon_url("https://example.com/bot-icon.png")
        .attachment(
            Attachment::new()
                .title("How can I help you?")
                .pretext("Here are some things I can do")
                .text("Say `question me` or `interactive` and I will show you what I can do.")
                .color("#7CD197")
                .fallback("How can I help you?"),
        )
}

fn interactive_card() -> Reply {
    Reply::default().attachment(
        Attachment::new()
            .title("Do you want to interact with my buttons?")
            .fallback("Do you want to interact with my buttons?")
            .callback_id("123")
            .action(ActionElement::button("yes", "Yes", "yes").style(ActionStyle::Primary))
            .action(ActionElement::button("no", "No", "no").style(ActionStyle::Danger))
            .action(ActionElement::select(
                "uh",
                "Uhhhh",
                vec![
                    SelectOption::new("Option 1", "option_1"),
                    SelectOption::new("Option 2", "option_2"),
                    SelectOption::new("Option 3", "option_3"),
                ],
            )),
    )
}

fn follow_up_card() -> Reply {
    Reply::default().attachment(
        Attachment::new()
            .title("Some other things to do")
            .fallback("Some other things to do")
            .callback_id("456")
            .action(
                ActionElement::button("yas", "YAS!", "yas")
                    .style(ActionStyle::Primary)
                    .confirm(Confirmation::new(
                        "Are you sure?",
                        "This will do something!",
                        "Yes",
                        "No",
                    )),
            )
            .action(ActionElement::button("naw", "NAW!", "naw").style(ActionStyle::Danger)),
    )
}

fn sample_dialog() -> Dialog {
    Dialog::builder("Title of dialog", "123", "Submit")
        .text("Text", "text", Some("some text"))
        .email("Email", "email", Some("some@email.com"))
        .select(
            "Select",
            "select",
            vec![SelectOption::new("Foo", "foo"), SelectOption::new("Bar", "bar")],
            Some("Select One"),
        )
        .textarea("Textarea", "textarea", Some("some long text"), Some("Put words here"))
        .url("Website", "url", Some("https://example.com"))
        .build()
}

fn first_round(event: &InteractiveActionEvent) -> Result<Outcome, HandlerError> {
    match event.action_name.as_str() {
        "yes" => Ok(Outcome::ReplaceOriginal(follow_up_card())),
        // Posts a new message; the original button card stays in place.
        "no" => Ok(Outcome::reply(Reply::default().attachment(
            Attachment::new()
                .title("You said no... :(")
                .fallback("You said no... :(")
                .callback_id("000"),
        ))),
        "uh" => Ok(Outcome::OpenDialog(sample_dialog())),
        other => {
            debug!(action = %other, "unrecognized action on first card");
            Ok(Outcome::Done)
        }
    }
}

fn second_round(event: &InteractiveActionEvent) -> Result<Outcome, HandlerError> {
    match event.action_name.as_str() {
        "yas" => Ok(Outcome::ReplaceOriginal(Reply::text("Hooray, you clicked YAS!"))),
        "naw" => Ok(Outcome::ReplaceOriginal(Reply::text("Okay, forget it."))),
        other => {
            debug!(action = %other, "unrecognized action on follow-up card");
            Ok(Outcome::Done)
        }
    }
}
