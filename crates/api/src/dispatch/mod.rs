mod composer;

pub use composer::{compose_text, ReminderDetails};

use carecall_api_structs::dtos::{RunErrorDTO, RunSummaryDTO};
use carecall_domain::{
    Channel, DispatchOutcome, NotificationAttempt, Reminder, ReminderOccurrence, ID,
};
use carecall_infra::{CarecallContext, Config, OutboundMessage, Recipient};
use std::time::Duration;
use tracing::{error, info, warn};

/// What a single dispatch did with an occurrence
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchReport {
    Sent { provider_message_id: Option<String> },
    Failed { error: String },
    /// The occurrence left `pending` or another path holds the claim on it
    Skipped,
}

/// Age after which a claim that was never settled is expired. Composing
/// and sending are each bounded by the provider timeout.
pub fn stale_claim_age(config: &Config) -> Duration {
    config.provider_timeout * 3
}

/// Delivers one `pending` occurrence over `channel`.
///
/// A `pending` attempt is written before the provider is called. It is the
/// claim on the occurrence, so concurrent passes never send the same
/// occurrence twice. The provider call is bounded by the provider timeout
/// and a timeout counts as a failed send. When the outcome can not be
/// recorded the claim is settled as a failed send. Only storage errors are
/// returned as `Err`.
pub async fn dispatch(
    occurrence: &ReminderOccurrence,
    reminder: &Reminder,
    recipient: &Recipient,
    channel: Channel,
    ctx: &CarecallContext,
) -> anyhow::Result<DispatchReport> {
    let attempt = NotificationAttempt::pending(
        occurrence.id.clone(),
        channel,
        recipient.address.clone(),
        ctx.sys.get_datetime(),
    );
    if !ctx.repos.deliveries.begin_dispatch(&attempt).await? {
        info!(
            "Occurrence {} is no longer pending or is being dispatched elsewhere, skipping",
            occurrence.id
        );
        return Ok(DispatchReport::Skipped);
    }

    let details = ReminderDetails::load(reminder, ctx).await;
    let text = compose_text(reminder, &details, &recipient.profile, channel, ctx).await;
    let message = OutboundMessage {
        occurrence_id: occurrence.id.clone(),
        recipient: recipient.address.clone(),
        text,
        choices: reminder.reminder_type.choices().to_vec(),
    };

    let mut outcome = send(&message, channel, ctx).await;
    let recorded = ctx
        .repos
        .deliveries
        .record_dispatch(&occurrence.id, &attempt.id, &outcome, ctx.sys.get_datetime())
        .await;
    let transitioned = match recorded {
        Ok(transitioned) => transitioned,
        Err(e) => {
            error!(
                "Unable to record the outcome of attempt {} for occurrence {}: {:?}",
                attempt.id, occurrence.id, e
            );
            outcome = DispatchOutcome::Failed {
                error: format!("Unable to record the dispatch outcome: {}", e),
            };
            ctx.repos
                .deliveries
                .record_dispatch(&occurrence.id, &attempt.id, &outcome, ctx.sys.get_datetime())
                .await?
        }
    };
    if !transitioned {
        warn!(
            "Occurrence {} changed status while attempt {} was in flight",
            occurrence.id, attempt.id
        );
    }

    Ok(match outcome {
        DispatchOutcome::Sent {
            provider_message_id,
        } => DispatchReport::Sent {
            provider_message_id,
        },
        DispatchOutcome::Failed { error } => DispatchReport::Failed { error },
    })
}

async fn send(message: &OutboundMessage, channel: Channel, ctx: &CarecallContext) -> DispatchOutcome {
    let adapter = ctx.channels.get(channel);
    match tokio::time::timeout(ctx.config.provider_timeout, adapter.send(message)).await {
        Ok(Ok(provider_message_id)) => DispatchOutcome::Sent {
            provider_message_id,
        },
        Ok(Err(e)) => {
            warn!(
                "Sending occurrence {} over {} failed: {:?}",
                message.occurrence_id, channel, e
            );
            DispatchOutcome::Failed {
                error: e.to_string(),
            }
        }
        Err(_) => {
            warn!(
                "Sending occurrence {} over {} timed out",
                message.occurrence_id, channel
            );
            DispatchOutcome::Failed {
                error: format!(
                    "{} provider did not answer within {:?}",
                    channel, ctx.config.provider_timeout
                ),
            }
        }
    }
}

/// A per item failure of a scheduler or voice pass
#[derive(Debug, Clone, PartialEq)]
pub struct RunError {
    pub reminder_id: Option<ID>,
    pub occurrence_id: Option<ID>,
    pub error: String,
}

/// Counters of one scheduler or voice pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub processed: usize,
    pub successful: usize,
    pub failed: usize,
    pub errors: Vec<RunError>,
}

impl RunSummary {
    pub fn record(&mut self, occurrence_id: &ID, reminder_id: &ID, report: DispatchReport) {
        match report {
            DispatchReport::Sent { .. } => {
                self.processed += 1;
                self.successful += 1;
            }
            DispatchReport::Failed { error } => {
                self.processed += 1;
                self.failed += 1;
                self.errors.push(RunError {
                    reminder_id: Some(reminder_id.clone()),
                    occurrence_id: Some(occurrence_id.clone()),
                    error,
                });
            }
            DispatchReport::Skipped => (),
        }
    }

    pub fn record_error(
        &mut self,
        reminder_id: Option<&ID>,
        occurrence_id: Option<&ID>,
        error: String,
    ) {
        self.processed += 1;
        self.failed += 1;
        self.errors.push(RunError {
            reminder_id: reminder_id.cloned(),
            occurrence_id: occurrence_id.cloned(),
            error,
        });
    }

    pub fn into_dto(self) -> RunSummaryDTO {
        RunSummaryDTO {
            processed: self.processed,
            successful: self.successful,
            failed: self.failed,
            errors: self
                .errors
                .into_iter()
                .map(|e| RunErrorDTO {
                    reminder_id: e.reminder_id,
                    occurrence_id: e.occurrence_id,
                    error: e.error,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_utils::*;
    use carecall_domain::{AttemptStatus, OccurrenceStatus};
    use carecall_infra::{IRecipientResolver, InMemoryChannel};

    async fn pending_occurrence(test: &TestContext, reminder: &Reminder) -> ReminderOccurrence {
        let occurrence = ReminderOccurrence::new(
            reminder.id.clone(),
            reminder.start_date,
            3,
            test.ctx.sys.get_datetime(),
        );
        assert!(test
            .ctx
            .repos
            .occurrences
            .insert_if_absent(&occurrence)
            .await
            .unwrap());
        occurrence
    }

    #[actix_web::main]
    #[test]
    async fn successful_send_moves_occurrence_to_waiting() {
        let test = TestContext::new(at(2024, 1, 1, 9, 0));
        let fixture = insert_medicine_reminder(&test.ctx, at(2024, 1, 1, 9, 0), None).await;
        let occurrence = pending_occurrence(&test, &fixture.reminder).await;
        let recipient = test
            .ctx
            .recipients
            .resolve(&fixture.reminder, Channel::WhatsApp)
            .await
            .unwrap();

        let report = dispatch(
            &occurrence,
            &fixture.reminder,
            &recipient,
            Channel::WhatsApp,
            &test.ctx,
        )
        .await
        .unwrap();
        let provider_message_id = match report {
            DispatchReport::Sent {
                provider_message_id,
            } => provider_message_id,
            other => panic!("Expected a sent report, got {:?}", other),
        };

        let stored = test
            .ctx
            .repos
            .occurrences
            .find(&occurrence.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, OccurrenceStatus::Waiting);
        assert_eq!(stored.provider_message_id, provider_message_id);

        let attempts = test
            .ctx
            .repos
            .attempts
            .find_by_occurrence(&occurrence.id)
            .await
            .unwrap();
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].status, AttemptStatus::Sent);
        assert_eq!(attempts[0].recipient, "+56911111111");

        let sent = test.whatsapp.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].choices, fixture.reminder.reminder_type.choices().to_vec());
    }

    #[actix_web::main]
    #[test]
    async fn failing_channel_moves_occurrence_to_failure() {
        let test = TestContext::with_channels(
            at(2024, 1, 1, 9, 0),
            InMemoryChannel::failing(Channel::WhatsApp, "Kapso API returned status 500"),
            InMemoryChannel::new(Channel::Telegram),
            InMemoryChannel::new(Channel::Voice),
        );
        let fixture = insert_medicine_reminder(&test.ctx, at(2024, 1, 1, 9, 0), None).await;
        let occurrence = pending_occurrence(&test, &fixture.reminder).await;
        let recipient = test
            .ctx
            .recipients
            .resolve(&fixture.reminder, Channel::WhatsApp)
            .await
            .unwrap();

        let report = dispatch(
            &occurrence,
            &fixture.reminder,
            &recipient,
            Channel::WhatsApp,
            &test.ctx,
        )
        .await
        .unwrap();
        assert!(matches!(report, DispatchReport::Failed { .. }));

        let stored = test
            .ctx
            .repos
            .occurrences
            .find(&occurrence.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, OccurrenceStatus::Failure);
        let attempts = test
            .ctx
            .repos
            .attempts
            .find_by_occurrence(&occurrence.id)
            .await
            .unwrap();
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].status, AttemptStatus::Failed);
        assert!(!attempts[0].error_message.clone().unwrap().is_empty());

        let medicine = test
            .ctx
            .repos
            .medicines
            .find(&fixture.medicine.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(medicine.tablets_left, Some(5));
    }

    #[actix_web::main]
    #[test]
    async fn slow_provider_is_a_failed_send() {
        let test = TestContext::with_channels(
            at(2024, 1, 1, 9, 0),
            InMemoryChannel::delayed(Channel::WhatsApp, Duration::from_secs(2)),
            InMemoryChannel::new(Channel::Telegram),
            InMemoryChannel::new(Channel::Voice),
        );
        let fixture = insert_medicine_reminder(&test.ctx, at(2024, 1, 1, 9, 0), None).await;
        let occurrence = pending_occurrence(&test, &fixture.reminder).await;
        let recipient = test
            .ctx
            .recipients
            .resolve(&fixture.reminder, Channel::WhatsApp)
            .await
            .unwrap();

        let report = dispatch(
            &occurrence,
            &fixture.reminder,
            &recipient,
            Channel::WhatsApp,
            &test.ctx,
        )
        .await
        .unwrap();
        match report {
            DispatchReport::Failed { error } => assert!(error.contains("did not answer")),
            other => panic!("Expected a failed report, got {:?}", other),
        }
    }

    #[actix_web::main]
    #[test]
    async fn occurrence_is_dispatched_once() {
        let test = TestContext::new(at(2024, 1, 1, 9, 0));
        let fixture = insert_medicine_reminder(&test.ctx, at(2024, 1, 1, 9, 0), None).await;
        let occurrence = pending_occurrence(&test, &fixture.reminder).await;
        let recipient = test
            .ctx
            .recipients
            .resolve(&fixture.reminder, Channel::Voice)
            .await
            .unwrap();

        let first = dispatch(
            &occurrence,
            &fixture.reminder,
            &recipient,
            Channel::Voice,
            &test.ctx,
        )
        .await
        .unwrap();
        let second = dispatch(
            &occurrence,
            &fixture.reminder,
            &recipient,
            Channel::WhatsApp,
            &test.ctx,
        )
        .await
        .unwrap();
        assert!(matches!(first, DispatchReport::Sent { .. }));
        assert_eq!(second, DispatchReport::Skipped);
        assert_eq!(test.voice.sent().len(), 1);
        assert!(test.whatsapp.sent().is_empty());
    }

    #[actix_web::main]
    #[test]
    async fn unrecorded_outcome_settles_the_claim_as_failed() {
        let mut test = TestContext::new(at(2024, 1, 1, 9, 0));
        test.with_unreliable_deliveries(1, false);
        let fixture = insert_medicine_reminder(&test.ctx, at(2024, 1, 1, 9, 0), None).await;
        let occurrence = pending_occurrence(&test, &fixture.reminder).await;
        let recipient = test
            .ctx
            .recipients
            .resolve(&fixture.reminder, Channel::Voice)
            .await
            .unwrap();

        let report = dispatch(
            &occurrence,
            &fixture.reminder,
            &recipient,
            Channel::Voice,
            &test.ctx,
        )
        .await
        .unwrap();
        match report {
            DispatchReport::Failed { error } => assert!(error.contains("connection reset")),
            other => panic!("Expected a failed report, got {:?}", other),
        }

        let stored = test
            .ctx
            .repos
            .occurrences
            .find(&occurrence.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, OccurrenceStatus::Failure);
        let attempts = test
            .ctx
            .repos
            .attempts
            .find_by_occurrence(&occurrence.id)
            .await
            .unwrap();
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].status, AttemptStatus::Failed);
    }

    #[actix_web::main]
    #[test]
    async fn claim_stays_open_when_no_outcome_can_be_recorded() {
        let mut test = TestContext::new(at(2024, 1, 1, 9, 0));
        test.with_unreliable_deliveries(2, false);
        let fixture = insert_medicine_reminder(&test.ctx, at(2024, 1, 1, 9, 0), None).await;
        let occurrence = pending_occurrence(&test, &fixture.reminder).await;
        let recipient = test
            .ctx
            .recipients
            .resolve(&fixture.reminder, Channel::Voice)
            .await
            .unwrap();

        assert!(dispatch(
            &occurrence,
            &fixture.reminder,
            &recipient,
            Channel::Voice,
            &test.ctx,
        )
        .await
        .is_err());
        let attempts = test
            .ctx
            .repos
            .attempts
            .find_by_occurrence(&occurrence.id)
            .await
            .unwrap();
        assert_eq!(attempts[0].status, AttemptStatus::Pending);
    }

    #[test]
    fn summary_counts_skips_as_nothing() {
        let mut summary = RunSummary::default();
        let id = ID::new();
        summary.record(&id, &id, DispatchReport::Skipped);
        summary.record(
            &id,
            &id,
            DispatchReport::Sent {
                provider_message_id: None,
            },
        );
        summary.record(
            &id,
            &id,
            DispatchReport::Failed {
                error: "boom".into(),
            },
        );
        summary.record_error(Some(&id), None, "no phone".into());
        assert_eq!(summary.processed, 3);
        assert_eq!(summary.successful, 1);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.errors.len(), 2);
    }
}
