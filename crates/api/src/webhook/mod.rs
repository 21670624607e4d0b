mod inbound;
mod ingest_response;

use crate::shared::usecase::execute;
use actix_web::{web, HttpResponse};
use carecall_api_structs::receive_webhook::{APIResponse, WebhookStatus};
use carecall_domain::Channel;
use carecall_infra::CarecallContext;
use ingest_response::{IngestResponseUseCase, IngestResult, UseCaseError};
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

fn to_api_response(result: Result<IngestResult, UseCaseError>) -> APIResponse {
    match result {
        Ok(IngestResult::Resolved {
            occurrence_id,
            resolved_status,
            ..
        }) => APIResponse {
            status: WebhookStatus::Success,
            occurrence_id: Some(occurrence_id),
            resolved_status: Some(resolved_status),
            message: format!("Occurrence resolved as {}", resolved_status),
        },
        Ok(IngestResult::NotAwaiting {
            occurrence_id,
            status,
        }) => APIResponse {
            status: WebhookStatus::Ignored,
            message: format!(
                "Occurrence {} is {} and no longer awaits an answer",
                occurrence_id, status
            ),
            occurrence_id: Some(occurrence_id),
            resolved_status: None,
        },
        Ok(IngestResult::Ignored { reason }) => APIResponse {
            status: WebhookStatus::Ignored,
            occurrence_id: None,
            resolved_status: None,
            message: reason,
        },
        Err(e) => {
            let occurrence_id = match &e {
                UseCaseError::UnrecognizedResponse { occurrence_id, .. } => {
                    Some(occurrence_id.clone())
                }
                _ => None,
            };
            APIResponse {
                status: WebhookStatus::Error,
                occurrence_id,
                resolved_status: None,
                message: e.message(),
            }
        }
    }
}

/// Providers retry on anything but a 2xx, so every callback is acknowledged
/// and the outcome is reported in the body.
async fn ingest(channel: Channel, payload: Value, ctx: &CarecallContext) -> HttpResponse {
    let usecase = IngestResponseUseCase { channel, payload };
    let res = execute(usecase, ctx).await;
    if let Err(e) = &res {
        warn!("Unable to handle {} webhook: {:?}", channel, e);
    }

    HttpResponse::Ok().json(to_api_response(res))
}

async fn whatsapp_webhook_controller(
    body: web::Json<Value>,
    ctx: web::Data<CarecallContext>,
) -> HttpResponse {
    ingest(Channel::WhatsApp, body.0, &ctx).await
}

async fn telegram_webhook_controller(
    body: web::Json<Value>,
    ctx: web::Data<CarecallContext>,
) -> HttpResponse {
    ingest(Channel::Telegram, body.0, &ctx).await
}

/// Twilio posts its callbacks form encoded
async fn voice_webhook_controller(
    form: web::Form<HashMap<String, String>>,
    ctx: web::Data<CarecallContext>,
) -> HttpResponse {
    let payload = match serde_json::to_value(form.0) {
        Ok(payload) => payload,
        Err(e) => {
            return HttpResponse::Ok().json(APIResponse {
                status: WebhookStatus::Error,
                occurrence_id: None,
                resolved_status: None,
                message: format!("Malformed payload: {}", e),
            })
        }
    };
    ingest(Channel::Voice, payload, &ctx).await
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route(
        "/webhooks/whatsapp",
        web::post().to(whatsapp_webhook_controller),
    );
    cfg.route(
        "/webhooks/telegram",
        web::post().to(telegram_webhook_controller),
    );
    cfg.route("/webhooks/voice", web::post().to(voice_webhook_controller));
}
