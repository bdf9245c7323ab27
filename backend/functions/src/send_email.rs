//! `send_email`: single and bulk plain-text mail.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, instrument, warn};

use fnrelay_core::{Function, FunctionError, FunctionResponse, IncomingRequest};

use crate::mail::{MailTransport, OutgoingMail};

pub struct SendEmail {
    transport: Arc<dyn MailTransport>,
}

#[derive(Debug, Default, Serialize)]
struct DeliveryReport {
    sent: usize,
    failed: usize,
    errors: Vec<DeliveryFailure>,
}

#[derive(Debug, Serialize)]
struct DeliveryFailure {
    to: String,
    error: String,
}

fn address(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn text(value: Option<&Value>) -> String {
    value.map(address).unwrap_or_default()
}

/// Expand the accepted request shapes into individual messages.
///
/// - `{"to": [..], "subject", "body"}`: same content to every address
/// - `{"messages": [{"to", "subject", "body"}, ..]}`
/// - `{"to", "subject", "body"}`: one message
fn messages(input: &Value) -> Option<Vec<OutgoingMail>> {
    let input = input.as_object()?;

    if let Some(Value::Array(recipients)) = input.get("to") {
        let subject = text(input.get("subject"));
        let body = text(input.get("body"));
        return Some(
            recipients
                .iter()
                .map(|to| OutgoingMail {
                    to: address(to),
                    subject: subject.clone(),
                    body: body.clone(),
                })
                .collect(),
        );
    }

    if let Some(list) = input.get("messages") {
        return serde_json::from_value(list.clone()).ok();
    }

    match (input.get("to"), input.get("subject"), input.get("body")) {
        (Some(to), Some(subject), Some(body)) => Some(vec![OutgoingMail {
            to: address(to),
            subject: address(subject),
            body: address(body),
        }]),
        _ => None,
    }
}

impl SendEmail {
    pub fn new(transport: Arc<dyn MailTransport>) -> Self {
        Self { transport }
    }

    async fn deliver(&self, messages: Vec<OutgoingMail>) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        for mail in messages {
            match self.transport.send(&mail).await {
                Ok(()) => report.sent += 1,
                Err(e) => {
                    warn!(to = %mail.to, error = %e, "Mail delivery failed");
                    report.failed += 1;
                    report.errors.push(DeliveryFailure {
                        to: mail.to,
                        error: e.to_string(),
                    });
                }
            }
        }
        report
    }
}

#[async_trait]
impl Function for SendEmail {
    fn name(&self) -> &str {
        "send_email"
    }

    #[instrument(skip_all)]
    async fn handle(&self, request: IncomingRequest) -> FunctionResponse {
        let input: Value = match serde_json::from_slice(request.body()) {
            Ok(input) => input,
            Err(e) => return FunctionError::Internal(e.to_string()).into_response(),
        };
        let Some(messages) = messages(&input) else {
            return FunctionError::client("Invalid input").into_response();
        };

        let report = self.deliver(messages).await;
        info!(sent = report.sent, failed = report.failed, "Mail batch finished");
        FunctionResponse::ok_serialized(&report)
    }
}
