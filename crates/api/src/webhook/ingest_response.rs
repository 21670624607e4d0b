use super::inbound::{extract, InboundAnswer, InboundResponse};
use crate::shared::usecase::UseCase;
use carecall_domain::{
    classify_response, AttemptStatus, Channel, NotificationAttempt, OccurrenceStatus,
    ReminderOccurrence, ReminderType, ResponseKind, ID,
};
use carecall_infra::{CarecallContext, ResolutionOutcome, ResponseResolution, StockDecrement};
use serde_json::Value;
use tracing::{info, warn};

/// Applies a recipient's answer, delivered by a provider callback, to the
/// occurrence it belongs to.
#[derive(Debug)]
pub struct IngestResponseUseCase {
    pub channel: Channel,
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IngestResult {
    Resolved {
        occurrence_id: ID,
        resolved_status: OccurrenceStatus,
        tablets_left: Option<i32>,
    },
    /// Late or duplicate callback. Nothing was written.
    NotAwaiting {
        occurrence_id: ID,
        status: OccurrenceStatus,
    },
    /// The callback carries no answer
    Ignored { reason: String },
}

#[derive(Debug, PartialEq)]
pub enum UseCaseError {
    Unparseable(String),
    NoMatchingOccurrence(String),
    UnrecognizedResponse { occurrence_id: ID, response: String },
    StorageError,
}

impl UseCaseError {
    pub fn message(&self) -> String {
        match self {
            Self::Unparseable(reason) => reason.clone(),
            Self::NoMatchingOccurrence(reason) => reason.clone(),
            Self::UnrecognizedResponse { response, .. } => {
                format!("The response '{}' was not understood", response)
            }
            Self::StorageError => "Internal server error".into(),
        }
    }
}

/// Phone numbers arrive with or without the leading `+`
fn recipient_variants(recipient: &str) -> Vec<String> {
    let trimmed = recipient.trim();
    match trimmed.strip_prefix('+') {
        Some(bare) => vec![trimmed.to_string(), bare.to_string()],
        None => vec![trimmed.to_string(), format!("+{}", trimmed)],
    }
}

impl IngestResponseUseCase {
    async fn correlate(
        &self,
        inbound: &InboundResponse,
        ctx: &CarecallContext,
    ) -> Result<(ReminderOccurrence, Option<NotificationAttempt>), UseCaseError> {
        if let Some(provider_message_id) = &inbound.provider_message_id {
            let occurrence = ctx
                .repos
                .occurrences
                .find_by_provider_message_id(provider_message_id)
                .await
                .map_err(|_| UseCaseError::StorageError)?;
            if let Some(occurrence) = occurrence {
                let attempt = ctx
                    .repos
                    .attempts
                    .find_latest_sent_for_occurrence(&occurrence.id)
                    .await
                    .map_err(|_| UseCaseError::StorageError)?;
                return Ok((occurrence, attempt));
            }
            warn!(
                "No occurrence carries provider message id {}, correlating by recipient",
                provider_message_id
            );
        }

        let recipient = inbound.recipient.as_ref().ok_or_else(|| {
            UseCaseError::NoMatchingOccurrence(
                "The payload carries neither a known message id nor a recipient".into(),
            )
        })?;

        let mut in_flight = Vec::new();
        for address in recipient_variants(recipient) {
            in_flight = ctx
                .repos
                .attempts
                .find_sent_for_recipient(self.channel, &address)
                .await
                .map_err(|_| UseCaseError::StorageError)?;
            if !in_flight.is_empty() {
                break;
            }
        }
        if in_flight.len() > 1 {
            warn!(
                "{} reminders are awaiting an answer from {} over {}, the answer is applied to the most recent one",
                in_flight.len(),
                recipient,
                self.channel
            );
        }

        let attempt = in_flight.into_iter().next().ok_or_else(|| {
            UseCaseError::NoMatchingOccurrence(format!(
                "No reminder is awaiting an answer from {}",
                recipient
            ))
        })?;
        let occurrence = ctx
            .repos
            .occurrences
            .find(&attempt.occurrence_id)
            .await
            .map_err(|_| UseCaseError::StorageError)?
            .ok_or_else(|| {
                UseCaseError::NoMatchingOccurrence(format!(
                    "Occurrence {} of attempt {} was not found",
                    attempt.occurrence_id, attempt.id
                ))
            })?;

        Ok((occurrence, Some(attempt)))
    }

    /// Tablets consumed when the answer confirms a medicine reminder
    async fn stock_decrement(
        &self,
        occurrence: &ReminderOccurrence,
        ctx: &CarecallContext,
    ) -> Result<Option<StockDecrement>, UseCaseError> {
        let reminder = match ctx
            .repos
            .reminders
            .find(&occurrence.reminder_id)
            .await
            .map_err(|_| UseCaseError::StorageError)?
        {
            Some(reminder) if reminder.reminder_type == ReminderType::Medicine => reminder,
            _ => return Ok(None),
        };
        let medicine_id = match &reminder.medicine_id {
            Some(medicine_id) => medicine_id,
            None => return Ok(None),
        };

        match ctx
            .repos
            .medicines
            .find(medicine_id)
            .await
            .map_err(|_| UseCaseError::StorageError)?
        {
            Some(medicine) => Ok(Some(StockDecrement {
                medicine_id: medicine.id.clone(),
                tablets: medicine.dose(),
            })),
            None => {
                warn!(
                    "Medicine {} of reminder {} was not found, stock is left untouched",
                    medicine_id, reminder.id
                );
                Ok(None)
            }
        }
    }
}

#[async_trait::async_trait(?Send)]
impl UseCase for IngestResponseUseCase {
    type Response = IngestResult;

    type Errors = UseCaseError;

    const NAME: &'static str = "IngestResponse";

    async fn execute(&mut self, ctx: &CarecallContext) -> Result<Self::Response, Self::Errors> {
        let inbound = extract(self.channel, &self.payload).map_err(UseCaseError::Unparseable)?;
        if let InboundAnswer::Empty { reason } = &inbound.answer {
            info!("Ignoring {} callback: {}", self.channel, reason);
            return Ok(IngestResult::Ignored {
                reason: reason.clone(),
            });
        }

        let (occurrence, attempt) = self.correlate(&inbound, ctx).await?;
        if occurrence.status != OccurrenceStatus::Waiting {
            info!(
                "Late or duplicate {} callback for occurrence {} which is {}",
                self.channel,
                occurrence.id,
                occurrence.status.as_str()
            );
            return Ok(IngestResult::NotAwaiting {
                occurrence_id: occurrence.id,
                status: occurrence.status,
            });
        }

        let (kind, attempt_status, response) = match &inbound.answer {
            InboundAnswer::Reply {
                candidates,
                response,
            } => {
                let kind = candidates
                    .iter()
                    .find_map(|candidate| classify_response(self.channel, candidate))
                    .ok_or_else(|| UseCaseError::UnrecognizedResponse {
                        occurrence_id: occurrence.id.clone(),
                        response: response.clone(),
                    })?;
                (kind, AttemptStatus::Delivered, response.clone())
            }
            InboundAnswer::Unreachable { call_status } => (
                ResponseKind::Negative,
                AttemptStatus::Rejected,
                format!("Call ended: {}", call_status),
            ),
            InboundAnswer::Empty { .. } => unreachable!("empty answers return early"),
        };

        let stock = match kind {
            ResponseKind::Positive => self.stock_decrement(&occurrence, ctx).await?,
            ResponseKind::Negative => None,
        };

        let resolution = ResponseResolution {
            occurrence_id: occurrence.id.clone(),
            attempt_id: attempt.map(|a| a.id),
            resolved_status: kind.resolved_status(),
            attempt_status,
            response,
            at: ctx.sys.get_datetime(),
            stock,
        };

        match ctx
            .repos
            .deliveries
            .resolve_response(&resolution)
            .await
            .map_err(|_| UseCaseError::StorageError)?
        {
            ResolutionOutcome::Applied { tablets_left } => {
                info!(
                    "Occurrence {} resolved as {}",
                    occurrence.id,
                    resolution.resolved_status.as_str()
                );
                Ok(IngestResult::Resolved {
                    occurrence_id: occurrence.id,
                    resolved_status: resolution.resolved_status,
                    tablets_left,
                })
            }
            ResolutionOutcome::AlreadyResolved(status) => {
                info!(
                    "Occurrence {} was resolved concurrently, it is {}",
                    occurrence.id,
                    status.as_str()
                );
                Ok(IngestResult::NotAwaiting {
                    occurrence_id: occurrence.id,
                    status,
                })
            }
            ResolutionOutcome::OccurrenceNotFound => Err(UseCaseError::NoMatchingOccurrence(
                format!("Occurrence {} disappeared", occurrence.id),
            )),
        }
    }
}
