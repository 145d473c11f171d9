// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use crewplane_core::domain::events::PublishRequest;

use super::{connect, parse_input};

#[derive(Subcommand)]
pub enum EventCommand {
    /// Publish an event to a topic
    Publish {
        #[arg(value_name = "TOPIC")]
        topic: String,

        /// Event type
        #[arg(long = "type", default_value = "notification")]
        event_type: String,

        /// Publisher identity checked against the topic ACL
        #[arg(long)]
        publisher: String,

        /// Event id; reuse it when retrying so the bus drops duplicates
        #[arg(long)]
        id: Option<String>,

        /// Payload (JSON string or @file.json)
        #[arg(short, long)]
        payload: Option<String>,
    },

    /// Print events published on a topic from now on
    Subscribe {
        #[arg(value_name = "TOPIC")]
        topic: String,
    },
}

pub async fn handle_command(command: EventCommand, host: &str, port: u16) -> Result<()> {
    let Some(client) = connect(host, port).await? else {
        return Ok(());
    };

    match command {
        EventCommand::Publish {
            topic,
            event_type,
            publisher,
            id,
            payload,
        } => {
            let request = PublishRequest {
                id: id.unwrap_or_else(|| format!("cli-{}", chrono::Utc::now().timestamp_micros())),
                topic,
                event_type,
                payload: parse_input(payload)?,
                publisher,
            };
            let receipt = client.publish(&request).await?;
            if receipt.delivered {
                println!(
                    "{}",
                    format!(
                        "✓ {} delivered to {} subscriber(s)",
                        receipt.event_id, receipt.subscribers
                    )
                    .green()
                );
            } else {
                println!(
                    "{}",
                    format!("ℹ {} already delivered; duplicate dropped", receipt.event_id).yellow()
                );
            }
            Ok(())
        }
        EventCommand::Subscribe { topic } => {
            println!("Subscribed to {} (Ctrl+C to stop)", topic.bold());
            client
                .stream(&format!("/events/{}", topic), |_, envelope| {
                    println!(
                        "[{}] {} {}",
                        envelope["publisher"].as_str().unwrap_or("?"),
                        envelope["type"].as_str().unwrap_or("?").cyan(),
                        envelope["payload"]
                    );
                })
                .await
        }
    }
}
