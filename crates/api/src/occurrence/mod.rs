mod get_occurrence;
mod process_pending_calls;
mod reset_occurrence;

use actix_web::web;
use get_occurrence::get_occurrence_controller;
use process_pending_calls::check_calls_controller;
use reset_occurrence::reset_occurrence_controller;

pub(crate) use process_pending_calls::ProcessPendingCallsUseCase;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route(
        "/occurrences/calls/check",
        web::post().to(check_calls_controller),
    );
    cfg.route(
        "/occurrences/{occurrenceId}",
        web::get().to(get_occurrence_controller),
    );
    cfg.route(
        "/occurrences/{occurrenceId}/reset",
        web::post().to(reset_occurrence_controller),
    );
}
