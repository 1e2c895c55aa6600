mod config;
mod decode;
mod error;
mod filter;
mod models;
mod notify;
mod pipeline;
mod queue;
mod remediation;
mod storage;

#[cfg(test)]
mod testing;

use tracing::Instrument;
use tracing_subscriber::EnvFilter;

use config::Config;
use pipeline::Handler;
use queue::{QueuedNotification, acknowledge, receive_notification};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_file(true)
        .with_line_number(true)
        .with_level(true)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("Invalid configuration: {}", err);
            std::process::exit(1);
        }
    };
    tracing::info!(
        "Watching {} for {} events, alerts go to {}",
        config.queue_url,
        config.match_rule.event_name,
        config.alert_topic_arn
    );

    let aws_config = aws_config::load_from_env().await;
    let sqs_client = aws_sdk_sqs::Client::new(&aws_config);
    let handler = Handler::new(
        Box::new(storage::create_s3_client(&aws_config, config.use_path_style_buckets)),
        Box::new(aws_sdk_sns::Client::new(&aws_config)),
        Box::new(aws_sdk_iam::Client::new(&aws_config)),
        config.clone(),
    );

    loop {
        let notification_opt = receive_notification(&sqs_client, &config.queue_url)
            .await
            .unwrap_or_else(|err| {
                tracing::error!("Error receiving CloudTrail notification: {}", err);
                None
            });

        if let Some(notification) = notification_opt {
            let span = tracing::info_span!(
                "invocation",
                id = %uuid::Uuid::new_v4(),
                message_id = notification.message_id.as_deref().unwrap_or("-")
            );
            process_notification(&handler, &sqs_client, &config.queue_url, notification)
                .instrument(span)
                .await;
        }

        // Sleep for a while before checking the queue again
        tokio::time::sleep(config.poll_interval).await;
    }
}

async fn process_notification(
    handler: &Handler,
    sqs_client: &aws_sdk_sqs::Client,
    queue_url: &str,
    notification: QueuedNotification,
) {
    let summary = match handler.handle_message(&notification.body).await {
        Ok(summary) => summary,
        Err(err) => {
            // left on the queue so it is redelivered after the visibility timeout
            tracing::error!("Invocation failed: {}", err);
            return;
        }
    };

    tracing::info!(
        "Invocation done: {} records, {} matched, alert sent: {}, {} of {} users deleted",
        summary.records,
        summary.matched,
        summary.alerted,
        summary.deleted(),
        summary.outcomes.len()
    );
    for outcome in summary.outcomes.iter().filter(|outcome| !outcome.is_user_gone()) {
        tracing::warn!("{} is still present", outcome.actor());
    }

    acknowledge(sqs_client, queue_url, &notification)
        .await
        .unwrap_or_else(|err| {
            tracing::error!("Error deleting message: {}", err);
        });
}
