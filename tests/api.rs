mod helpers;

use carecall_domain::ReminderType;
use carecall_sdk::{
    APIErrorVariant, AttemptStatus, CreateReminderInput, OccurrenceStatus,
    UpdateReminderScheduleInput, WebhookStatus, ID,
};
use chrono::Duration;
use helpers::setup::{create_medicine_reminder, spawn_app};
use serde_json::json;
use std::collections::HashMap;

#[actix_web::main]
#[test]
async fn test_status_ok() {
    let (_, sdk, _) = spawn_app().await;
    assert!(sdk.status.check_health().await.is_ok());
}

#[actix_web::main]
#[test]
async fn test_create_reminder_validates_links() {
    let (app, sdk, _) = spawn_app().await;
    let res = sdk
        .reminder
        .create(CreateReminderInput {
            reminder_type: ReminderType::Medicine,
            start_date: app.ctx.sys.get_datetime(),
            periodicity: Some(60),
            end_date: None,
            medicine_id: None,
            appointment_id: None,
            elderly_profile_id: None,
        })
        .await;
    assert!(matches!(
        res.unwrap_err().variant,
        APIErrorVariant::BadClientData
    ));

    let res = sdk
        .reminder
        .create(CreateReminderInput {
            reminder_type: ReminderType::Medicine,
            start_date: app.ctx.sys.get_datetime(),
            periodicity: Some(60),
            end_date: None,
            medicine_id: Some(ID::default()),
            appointment_id: None,
            elderly_profile_id: None,
        })
        .await;
    assert!(matches!(res.unwrap_err().variant, APIErrorVariant::NotFound));
}

#[actix_web::main]
#[test]
async fn test_reminder_is_sent_and_confirmed_over_whatsapp() {
    let (app, sdk, _) = spawn_app().await;
    let setup = create_medicine_reminder(&app, &sdk).await;

    let summary = sdk.reminder.check().await.expect("Expected scheduler pass");
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.successful, 1);
    assert_eq!(summary.failed, 0);

    // The same instant is never generated twice
    let summary = sdk.reminder.check().await.expect("Expected scheduler pass");
    assert_eq!(summary.processed, 0);

    let occurrences = sdk
        .reminder
        .occurrences(&setup.reminder.id)
        .await
        .expect("Expected to list occurrences")
        .occurrences;
    assert_eq!(occurrences.len(), 1);
    let occurrence = &occurrences[0];
    assert_eq!(occurrence.status, OccurrenceStatus::Waiting);
    assert_eq!(app.whatsapp.sent().len(), 1);

    let res = sdk
        .webhook
        .whatsapp(json!({
            "message": {
                "from": "56911111111",
                "interactive": {
                    "type": "button_reply",
                    "button_reply": { "id": "taken", "title": "Ya lo tomé" }
                }
            }
        }))
        .await
        .expect("Expected webhook to be acknowledged");
    assert_eq!(res.status, WebhookStatus::Success);
    assert_eq!(res.occurrence_id, Some(occurrence.id.clone()));
    assert_eq!(res.resolved_status, Some(OccurrenceStatus::Success));

    let details = sdk
        .occurrence
        .get(&occurrence.id)
        .await
        .expect("Expected to get occurrence");
    assert_eq!(details.occurrence.status, OccurrenceStatus::Success);
    assert!(details.occurrence.taken_at.is_some());
    assert_eq!(details.attempts.len(), 1);
    assert_eq!(details.attempts[0].status, AttemptStatus::Delivered);

    let medicine = app
        .ctx
        .repos
        .medicines
        .find(&setup.medicine.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(medicine.tablets_left, Some(9));

    // Providers redeliver, a second callback changes nothing
    let res = sdk
        .webhook
        .whatsapp(json!({
            "message": {
                "from": "56911111111",
                "interactive": {
                    "type": "button_reply",
                    "button_reply": { "id": "taken", "title": "Ya lo tomé" }
                }
            }
        }))
        .await
        .expect("Expected webhook to be acknowledged");
    assert_eq!(res.status, WebhookStatus::Error);
    let medicine = app
        .ctx
        .repos
        .medicines
        .find(&setup.medicine.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(medicine.tablets_left, Some(9));
}

#[actix_web::main]
#[test]
async fn test_regenerated_occurrences_wait_for_their_instant() {
    let (app, sdk, _) = spawn_app().await;
    let setup = create_medicine_reminder(&app, &sdk).await;

    // Hourly from a minute ago: the first instant is already due
    let res = sdk
        .reminder
        .update_schedule(
            &setup.reminder.id,
            UpdateReminderScheduleInput {
                start_date: Some(app.ctx.sys.get_datetime() - Duration::minutes(1)),
                periodicity: Some(60),
                ..Default::default()
            },
        )
        .await
        .expect("Expected to update schedule");
    assert!(res.schedule_changed);

    let regenerated = sdk
        .reminder
        .regenerate(&setup.reminder.id)
        .await
        .expect("Expected to regenerate");
    assert_eq!(regenerated.inserted, 30);

    // Only future instants are materialised, the due one comes from the scheduler pass
    let summary = sdk.occurrence.check_calls().await.expect("Expected voice pass");
    assert_eq!(summary.processed, 0);
    let summary = sdk.reminder.check().await.expect("Expected scheduler pass");
    assert_eq!(summary.processed, 0);

    let occurrences = sdk
        .reminder
        .occurrences(&setup.reminder.id)
        .await
        .expect("Expected to list occurrences")
        .occurrences;
    assert_eq!(occurrences.len(), 30);
    assert!(occurrences
        .iter()
        .all(|o| o.status == OccurrenceStatus::Pending));
    assert!(app.voice.sent().is_empty());

    let mut form = HashMap::new();
    form.insert("CallSid".to_string(), "CA-unknown".to_string());
    form.insert("CallStatus".to_string(), "no-answer".to_string());
    let res = sdk
        .webhook
        .voice(form)
        .await
        .expect("Expected webhook to be acknowledged");
    assert_eq!(res.status, WebhookStatus::Error);
}

#[actix_web::main]
#[test]
async fn test_reset_requires_a_failed_occurrence() {
    let (app, sdk, _) = spawn_app().await;
    let setup = create_medicine_reminder(&app, &sdk).await;
    sdk.reminder.check().await.expect("Expected scheduler pass");
    let occurrence = sdk
        .reminder
        .occurrences(&setup.reminder.id)
        .await
        .expect("Expected to list occurrences")
        .occurrences
        .remove(0);

    let res = sdk.occurrence.reset(&occurrence.id, None).await;
    assert!(matches!(res.unwrap_err().variant, APIErrorVariant::Conflict));

    let res = sdk.occurrence.reset(&ID::default(), None).await;
    assert!(matches!(res.unwrap_err().variant, APIErrorVariant::NotFound));
}

#[actix_web::main]
#[test]
async fn test_unknown_webhook_sender_is_acknowledged() {
    let (_, sdk, _) = spawn_app().await;
    let res = sdk
        .webhook
        .telegram(json!({
            "callback_query": {
                "data": "taken",
                "message": { "message_id": 1, "chat": { "id": 99 } }
            }
        }))
        .await
        .expect("Expected webhook to be acknowledged");
    assert_eq!(res.status, WebhookStatus::Error);
    assert!(res.occurrence_id.is_none());
}
