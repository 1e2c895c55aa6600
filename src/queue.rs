use aws_sdk_sqs::Client;

/// One message pulled off the CloudTrail queue.
pub struct QueuedNotification {
    pub body: String,
    pub receipt_handle: String,
    pub message_id: Option<String>,
}

pub async fn receive_notification(
    client: &Client,
    queue_url: &str,
) -> Result<Option<QueuedNotification>, aws_sdk_sqs::Error> {
    let rcv_message_output = client
        .receive_message()
        .queue_url(queue_url)
        .max_number_of_messages(1)
        .send()
        .await?;

    for message in rcv_message_output.messages.unwrap_or_default() {
        let body = match message.body {
            Some(body) => body,
            None => {
                tracing::warn!("Received message with no body, skipping.");
                continue;
            }
        };

        let receipt_handle = match message.receipt_handle {
            Some(handle) => handle,
            None => {
                tracing::warn!("Received message without a receipt handle, skipping.");
                continue;
            }
        };

        return Ok(Some(QueuedNotification {
            body,
            receipt_handle,
            message_id: message.message_id,
        }));
    }

    Ok(None)
}

/// Acknowledges a handled notification so it is not delivered again.
pub async fn acknowledge(
    client: &Client,
    queue_url: &str,
    notification: &QueuedNotification,
) -> Result<(), aws_sdk_sqs::Error> {
    client
        .delete_message()
        .queue_url(queue_url)
        .receipt_handle(&notification.receipt_handle)
        .send()
        .await?;

    tracing::info!(
        "Removed notification {} from {}",
        notification.message_id.as_deref().unwrap_or("-"),
        queue_url
    );
    Ok(())
}
