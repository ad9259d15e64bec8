//! Turns an addressed command into a reply and posts it to Slack.

use log::info;

use crate::charts::ChartRunner;
use crate::commands::{Command, classify, help_menu, random_pleasantry};
use crate::comics::ComicClient;
use crate::dialogflow::IntentClient;
use crate::error::Result;
use crate::filter::AddressedCommand;
use crate::slack::SlackApiClient;
use crate::types::{ConversationContext, OutgoingMessage};

pub const TESTING_NOTICE: &str = "(Please note: I am currently under testing) ";

pub struct Dispatcher {
    slack: SlackApiClient,
    comics: ComicClient,
    intents: IntentClient,
    charts: ChartRunner,
    testing: bool,
}

impl Dispatcher {
    pub fn new(
        slack: SlackApiClient,
        comics: ComicClient,
        intents: IntentClient,
        charts: ChartRunner,
        testing: bool,
    ) -> Self {
        Self {
            slack,
            comics,
            intents,
            charts,
            testing,
        }
    }

    /// Handles one command with a single `chat.postMessage` call.
    ///
    /// Returns the conversation context to pass to the next turn.
    pub async fn handle(
        &self,
        command: &AddressedCommand,
        context: Option<ConversationContext>,
    ) -> Result<Option<ConversationContext>> {
        let (pretext, context) = self.compose(command, context).await?;
        let message = OutgoingMessage::with_pretext(&command.channel, pretext);
        self.slack.post_message(&message).await?;
        info!(
            "Replied to {} in channel {}: {}",
            command.speaker.display_name, message.channel, message.pretext
        );
        Ok(context)
    }

    async fn compose(
        &self,
        command: &AddressedCommand,
        context: Option<ConversationContext>,
    ) -> Result<(String, Option<ConversationContext>)> {
        let mut pretext = String::new();
        if self.testing {
            pretext.push_str(TESTING_NOTICE);
        }

        let classified = classify(&command.text);
        info!(
            "Handling {} command from {}",
            classified, command.speaker.display_name
        );

        let context = match classified {
            Command::Help => {
                pretext.push_str(&format!(
                    "{}, {}. ",
                    random_pleasantry(),
                    command.speaker.first_name()
                ));
                pretext.push_str(help_menu());
                context
            }
            Command::Comic => {
                pretext.push_str(&self.comics.random_image_url().await?);
                context
            }
            Command::Report { metric, campaign } => {
                let reply = self
                    .charts
                    .report(&metric, &campaign, &command.channel)
                    .await;
                pretext.push_str(&reply);
                context
            }
            Command::Converse(text) => {
                let session = context.unwrap_or_else(ConversationContext::fresh);
                pretext.push_str(&self.intents.detect_intent(&session, &text).await?);
                Some(session)
            }
        };

        Ok((pretext, context))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;
    use crate::charts::{CHART_FAILURE_REPLY, CHART_SUCCESS_REPLY};
    use crate::config::{ChartConfig, DialogflowConfig};
    use crate::dialogflow::TokenProvider;
    use crate::filter::Speaker;

    fn dispatcher(server: &MockServer, charts: ChartConfig, testing: bool) -> Dispatcher {
        let dialogflow = DialogflowConfig {
            project_id: "coey-agent".to_string(),
            credentials: PathBuf::from("/unused.json"),
            language_code: "en-us".to_string(),
            api_base: server.base_url(),
        };
        Dispatcher::new(
            SlackApiClient::new(&server.base_url(), "xoxb-test", "xapp-test"),
            ComicClient::new(&server.base_url()),
            IntentClient::new(&dialogflow, TokenProvider::fixed("ya29.test")),
            ChartRunner::new(&charts),
            testing,
        )
    }

    fn command(text: &str) -> AddressedCommand {
        AddressedCommand {
            text: text.to_string(),
            channel: "C42".to_string(),
            speaker: Speaker {
                user_id: "U1".to_string(),
                display_name: "Ada Lovelace".to_string(),
            },
        }
    }

    fn failing_charts() -> ChartConfig {
        ChartConfig {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), "exit 1".to_string(), "sh".to_string()],
        }
    }

    #[tokio::test]
    async fn help_greets_speaker_by_first_name() {
        let server = MockServer::start();
        let dispatcher = dispatcher(&server, failing_charts(), false);

        let (pretext, context) = dispatcher
            .compose(&command("<@UBOT> help"), None)
            .await
            .unwrap();
        assert!(pretext.contains(", Ada. "));
        assert!(pretext.ends_with(help_menu()));
        assert!(context.is_none());
    }

    #[tokio::test]
    async fn testing_mode_prefixes_notice() {
        let server = MockServer::start();
        let dispatcher = dispatcher(&server, failing_charts(), true);

        let (pretext, _) = dispatcher.compose(&command("help"), None).await.unwrap();
        assert!(pretext.starts_with(TESTING_NOTICE));
    }

    #[tokio::test]
    async fn comic_reply_embeds_image_with_one_fetch() {
        let server = MockServer::start();
        let comic = server.mock(|when, then| {
            when.method(GET).path("/info.0.json");
            then.status(200)
                .json_body(json!({"num": 2000, "img": "https://imgs.xkcd.com/comics/xkcd_phone_2.png"}));
        });
        let dispatcher = dispatcher(&server, failing_charts(), false);

        let (pretext, _) = dispatcher
            .compose(&command("<@UBOT> xkcd"), None)
            .await
            .unwrap();
        assert_eq!(pretext, "https://imgs.xkcd.com/comics/xkcd_phone_2.png");
        assert_eq!(comic.calls(), 1);
    }

    #[tokio::test]
    async fn report_runs_chart_script_with_campaign_and_channel() {
        let server = MockServer::start();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("args.txt");
        let charts = ChartConfig {
            program: "sh".to_string(),
            args: vec![
                "-c".to_string(),
                format!("echo \"$@\" > '{}'", out.display()),
                "build_graphs".to_string(),
            ],
        };
        let dispatcher = dispatcher(&server, charts, false);

        let (pretext, _) = dispatcher
            .compose(&command("show number of conversions in campaign123"), None)
            .await
            .unwrap();
        assert_eq!(pretext, CHART_SUCCESS_REPLY);
        assert_eq!(
            fs::read_to_string(&out).unwrap().trim(),
            "--ht_id campaign123 --chart_to_build conversions-over-time --slack_channel C42"
        );
    }

    #[tokio::test]
    async fn failed_report_replies_with_apology() {
        let server = MockServer::start();
        let dispatcher = dispatcher(&server, failing_charts(), false);

        let (pretext, _) = dispatcher
            .compose(&command("show number of conversions in campaign123"), None)
            .await
            .unwrap();
        assert_eq!(pretext, CHART_FAILURE_REPLY);
    }

    #[tokio::test]
    async fn conversation_reuses_and_returns_session() {
        let server = MockServer::start();
        let intent = server.mock(|when, then| {
            when.method(POST)
                .path("/v2/projects/coey-agent/agent/sessions/session-7:detectIntent")
                .json_body(json!({
                    "queryInput": {"text": {"text": "how old are you?", "languageCode": "en-us"}}
                }));
            then.status(200)
                .json_body(json!({"queryResult": {"fulfillmentText": "Old enough."}}));
        });
        let dispatcher = dispatcher(&server, failing_charts(), false);

        let context = Some(ConversationContext::from("session-7".to_string()));
        let (pretext, next) = dispatcher
            .compose(&command("how old are you?"), context.clone())
            .await
            .unwrap();
        assert_eq!(pretext, "Old enough.");
        assert_eq!(next, context);
        intent.assert();
    }

    #[tokio::test]
    async fn first_conversation_turn_creates_session() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST);
            then.status(200)
                .json_body(json!({"queryResult": {"fulfillmentText": "Hi!"}}));
        });
        let dispatcher = dispatcher(&server, failing_charts(), false);

        let (_, next) = dispatcher.compose(&command("hello"), None).await.unwrap();
        assert!(next.is_some());
    }

    #[tokio::test]
    async fn handle_posts_single_attachment_to_channel() {
        let server = MockServer::start();
        let post = server.mock(|when, then| {
            when.method(POST)
                .path("/chat.postMessage")
                .json_body(json!({
                    "channel": "C42",
                    "attachments": [{"pretext": CHART_FAILURE_REPLY, "mrkdwn_in": ["pretext"]}]
                }));
            then.status(200).json_body(json!({"ok": true}));
        });
        let dispatcher = dispatcher(&server, failing_charts(), false);

        let context = dispatcher
            .handle(&command("show number of conversions in campaign123"), None)
            .await
            .unwrap();
        assert!(context.is_none());
        assert_eq!(post.calls(), 1);
    }

    #[tokio::test]
    async fn intent_failure_propagates() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST)
                .path("/v2/projects/coey-agent/agent/sessions/s1:detectIntent");
            then.status(500).body("backend error");
        });
        let post = server.mock(|when, then| {
            when.method(POST).path("/chat.postMessage");
            then.status(200).json_body(json!({"ok": true}));
        });
        let dispatcher = dispatcher(&server, failing_charts(), false);

        let context = Some(ConversationContext::from("s1".to_string()));
        assert!(dispatcher.handle(&command("hello"), context).await.is_err());
        assert_eq!(post.calls(), 0);
    }
}
