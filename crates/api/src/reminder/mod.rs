mod create_reminder;
mod get_reminder_occurrences;
mod process_due_reminders;
mod regenerate_occurrences;
mod update_reminder_schedule;

use actix_web::web;
use create_reminder::create_reminder_controller;
use get_reminder_occurrences::get_reminder_occurrences_controller;
use process_due_reminders::check_reminders_controller;
use regenerate_occurrences::regenerate_occurrences_controller;
use update_reminder_schedule::update_reminder_schedule_controller;

pub(crate) use process_due_reminders::ProcessDueRemindersUseCase;
pub(crate) use regenerate_occurrences::RegenerateOccurrencesUseCase;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/reminders", web::post().to(create_reminder_controller));
    // Registered before the `{reminder_id}` routes
    cfg.route(
        "/reminders/check",
        web::post().to(check_reminders_controller),
    );
    cfg.route(
        "/reminders/{reminderId}/schedule",
        web::put().to(update_reminder_schedule_controller),
    );
    cfg.route(
        "/reminders/{reminderId}/regenerate",
        web::post().to(regenerate_occurrences_controller),
    );
    cfg.route(
        "/reminders/{reminderId}/occurrences",
        web::get().to(get_reminder_occurrences_controller),
    );
}
