//! Report charts produced by an external script.
//!
//! The script is spawned directly with an argument list; no shell is involved,
//! so campaign ids and channel names are never interpreted.

use log::{debug, error, info};
use tokio::process::Command;

use crate::commands::chart_name;
use crate::config::ChartConfig;
use crate::error::{BotError, Result};

pub const CHART_SUCCESS_REPLY: &str = "Are those helpful?";
pub const CHART_FAILURE_REPLY: &str =
    "Sorry, I am having trouble finding that campaign ID. Please try again.";

pub struct ChartRunner {
    program: String,
    args: Vec<String>,
}

impl ChartRunner {
    pub fn new(config: &ChartConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
        }
    }

    /// Runs the chart script and turns the outcome into the reply text.
    ///
    /// Failures are logged for the operator and replaced by a fixed apology.
    pub async fn report(&self, metric: &str, campaign: &str, channel: &str) -> String {
        match self.run(metric, campaign, channel).await {
            Ok(()) => CHART_SUCCESS_REPLY.to_string(),
            Err(e) => {
                error!("Chart for campaign '{campaign}' failed: {e}");
                CHART_FAILURE_REPLY.to_string()
            }
        }
    }

    async fn run(&self, metric: &str, campaign: &str, channel: &str) -> Result<()> {
        if metric.trim().is_empty() || campaign.trim().is_empty() {
            return Err(BotError::ChartScript(
                "missing metric or campaign".to_string(),
            ));
        }
        let chart = chart_name(metric);
        debug!(
            "Running {} {:?} for campaign {campaign}, chart {chart}, channel {channel}",
            self.program, self.args
        );

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg("--ht_id")
            .arg(campaign)
            .arg("--chart_to_build")
            .arg(&chart)
            .arg("--slack_channel")
            .arg(channel)
            .output()
            .await
            .map_err(|e| BotError::ChartScript(format!("failed to spawn {}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BotError::ChartScript(format!(
                "exit {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        info!("Chart {chart} for campaign {campaign} sent to {channel}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn runner(program: &str, args: &[&str]) -> ChartRunner {
        ChartRunner::new(&ChartConfig {
            program: program.to_string(),
            args: args.iter().map(|arg| (*arg).to_string()).collect(),
        })
    }

    #[tokio::test]
    async fn passes_campaign_chart_and_channel() {
        let dir = tempfile::tempdir().expect("tempdir");
        let out = dir.path().join("args.txt");
        let script = format!("printf '%s\\n' \"$@\" > '{}'", out.display());
        let runner = runner("sh", &["-c", &script, "build_graphs"]);

        let reply = runner.report("conversions", "campaign123", "C42").await;
        assert_eq!(reply, CHART_SUCCESS_REPLY);

        let args = fs::read_to_string(&out).expect("script wrote args");
        let args: Vec<&str> = args.lines().collect();
        assert_eq!(
            args,
            [
                "--ht_id",
                "campaign123",
                "--chart_to_build",
                "conversions-over-time",
                "--slack_channel",
                "C42"
            ]
        );
    }

    #[tokio::test]
    async fn non_zero_exit_yields_apology() {
        let runner = runner("sh", &["-c", "echo 'no such campaign' >&2; exit 3", "sh"]);
        let reply = runner.report("conversions", "campaign123", "C42").await;
        assert_eq!(reply, CHART_FAILURE_REPLY);
    }

    #[tokio::test]
    async fn missing_program_yields_apology() {
        let runner = runner("/nonexistent/coey-chart-script", &[]);
        let reply = runner.report("conversions", "campaign123", "C42").await;
        assert_eq!(reply, CHART_FAILURE_REPLY);
    }

    #[tokio::test]
    async fn blank_arguments_never_spawn() {
        let runner = runner("/nonexistent/coey-chart-script", &[]);
        let err = runner.run(" ", "campaign123", "C42").await.expect_err("blank");
        assert!(matches!(err, BotError::ChartScript(msg) if msg.contains("missing")));
    }
}
