use crate::{APIResponse, BaseClient};
use carecall_api_structs::*;
use carecall_domain::ID;
use reqwest::StatusCode;
use std::sync::Arc;

#[derive(Clone)]
pub struct OccurrenceClient {
    base: Arc<BaseClient>,
}

impl OccurrenceClient {
    pub(crate) fn new(base: Arc<BaseClient>) -> Self {
        Self { base }
    }

    pub async fn get(&self, occurrence_id: &ID) -> APIResponse<get_occurrence::APIResponse> {
        self.base
            .get(format!("occurrences/{}", occurrence_id), StatusCode::OK)
            .await
    }

    pub async fn reset(
        &self,
        occurrence_id: &ID,
        notes: Option<String>,
    ) -> APIResponse<reset_occurrence::APIResponse> {
        let body = reset_occurrence::RequestBody { notes };
        self.base
            .post(
                body,
                format!("occurrences/{}/reset", occurrence_id),
                StatusCode::OK,
            )
            .await
    }

    /// Runs one voice sweep
    pub async fn check_calls(&self) -> APIResponse<check_calls::APIResponse> {
        self.base
            .post((), "occurrences/calls/check".into(), StatusCode::OK)
            .await
    }
}
