use axum::{extract::State, Json};
use serde::Serialize;
use service_core::error::AppError;
use validator::Validate;

use crate::models::LoginEvent;
use crate::services::{CommandRecorder, DecisionOutcome, LoginCommand};
use crate::AppState;

/// Decision summary plus the actions the identity provider runtime must apply.
#[derive(Debug, Serialize)]
pub struct HookResponse {
    #[serde(flatten)]
    pub outcome: DecisionOutcome,
    pub commands: Vec<LoginCommand>,
}

pub async fn post_login(
    State(state): State<AppState>,
    Json(event): Json<LoginEvent>,
) -> Result<Json<HookResponse>, AppError> {
    event.validate()?;

    let mut recorder = CommandRecorder::default();
    let outcome = state
        .orchestrator
        .on_post_login(&event, &mut recorder)
        .await?;

    Ok(Json(HookResponse {
        outcome,
        commands: recorder.into_commands(),
    }))
}
