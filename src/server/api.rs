use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::battle::{BattleStatus, NewBattle, Question, TeamEntry};
use crate::engine::{EngineError, RaidEngine};
use crate::lesson::{extract_questions, LessonBlock};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBattleRequest {
    #[serde(default)]
    pub boss_id: String,
    #[serde(default)]
    pub questions: Vec<Question>,
    /// Lesson blocks to draw extra questions from; appended after `questions`.
    #[serde(default)]
    pub lesson: Vec<LessonBlock>,
    #[serde(default)]
    pub teams: Vec<TeamEntry>,
    pub avg_team_size: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRequest {
    pub team_id: String,
    pub answer_index: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbilityRequest {
    pub team_id: String,
    pub ability_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EndRequest {
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationIssue {
    pub field: &'static str,
    pub messages: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationErrorResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub errors: Vec<ValidationIssue>,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid request body: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid battle request")]
    Validation(ValidationErrorResponse),
    #[error("{0}")]
    BadRequest(String),
    #[error("Battle '{0}' not found")]
    NotFound(String),
    #[error(transparent)]
    Engine(EngineError),
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::NotFound(id) => Self::NotFound(id),
            EngineError::EmptyQuestionPool
            | EngineError::NoTeams
            | EngineError::DuplicateTeam(_)
            | EngineError::NotTerminal(_) => {
                Self::BadRequest(err.to_string())
            }
            other => Self::Engine(other),
        }
    }
}

pub fn health_payload() -> Result<String, ApiError> {
    Ok(serde_json::to_string_pretty(&serde_json::json!({
        "status": "ok",
        "service": "bossraid-api",
        "version": env!("CARGO_PKG_VERSION")
    }))?)
}

pub fn catalog_payload(engine: &RaidEngine) -> Result<String, ApiError> {
    Ok(serde_json::to_string_pretty(engine.catalog())?)
}

pub fn battles_list_payload(engine: &RaidEngine) -> Result<String, ApiError> {
    let battles = engine.list_battles()?;
    Ok(serde_json::to_string_pretty(&serde_json::json!({ "battles": battles }))?)
}

pub fn battle_get_payload(engine: &RaidEngine, id: &str) -> Result<String, ApiError> {
    let battle = engine
        .get_battle(id)?
        .ok_or_else(|| ApiError::NotFound(id.to_string()))?;
    Ok(serde_json::to_string_pretty(&battle)?)
}

pub fn battle_delete_payload(engine: &RaidEngine, id: &str) -> Result<String, ApiError> {
    if !engine.delete_battle(id)? {
        return Err(ApiError::NotFound(id.to_string()));
    }
    Ok(serde_json::to_string_pretty(&serde_json::json!({
        "status": "ok",
        "deleted": id
    }))?)
}

pub fn battle_create_payload(engine: &RaidEngine, body: &str) -> Result<String, ApiError> {
    let request: CreateBattleRequest = serde_json::from_str(body)?;
    let new_battle = validate_create_request(request).map_err(ApiError::Validation)?;
    let battle = engine.create_battle(new_battle)?;
    Ok(serde_json::to_string_pretty(&battle)?)
}

pub fn answer_payload(engine: &RaidEngine, id: &str, body: &str) -> Result<String, ApiError> {
    let request: AnswerRequest = serde_json::from_str(body)?;
    let result = engine.submit_answer(id, &request.team_id, request.answer_index)?;
    Ok(serde_json::to_string_pretty(&serde_json::json!({ "result": result }))?)
}

pub fn ability_payload(engine: &RaidEngine, id: &str, body: &str) -> Result<String, ApiError> {
    let request: AbilityRequest = serde_json::from_str(body)?;
    let outcome = engine.use_ability(id, &request.team_id, &request.ability_id)?;
    Ok(serde_json::to_string_pretty(&outcome)?)
}

pub fn end_payload(engine: &RaidEngine, id: &str, body: &str) -> Result<String, ApiError> {
    let request: EndRequest = serde_json::from_str(body)?;
    let status = BattleStatus::parse(&request.status)
        .ok_or_else(|| ApiError::BadRequest(format!("unknown status '{}'", request.status)))?;
    let battle = engine.end_battle(id, status)?;
    Ok(serde_json::to_string_pretty(&battle)?)
}

/// Check a create request field by field, collecting every problem before rejecting it.
pub fn validate_create_request(
    request: CreateBattleRequest,
) -> Result<NewBattle, ValidationErrorResponse> {
    let mut errors = Vec::new();

    let mut questions = request.questions;
    questions.extend(extract_questions(&request.lesson));
    let mut question_messages = Vec::new();
    if questions.is_empty() {
        question_messages.push("at least one question is required".to_string());
    }
    for (i, question) in questions.iter().enumerate() {
        if question.options.is_empty() {
            question_messages.push(format!("question {i} has no options"));
        } else if question.correct_index >= question.options.len() {
            question_messages.push(format!(
                "question {i} correctIndex {} is out of range (options={})",
                question.correct_index,
                question.options.len()
            ));
        }
    }
    if !question_messages.is_empty() {
        errors.push(ValidationIssue {
            field: "questions",
            messages: question_messages,
        });
    }

    let mut team_messages = Vec::new();
    if request.teams.is_empty() {
        team_messages.push("at least one team is required".to_string());
    }
    let mut seen = HashSet::new();
    for team in &request.teams {
        if team.id.trim().is_empty() {
            team_messages.push("team id must not be empty".to_string());
        } else if !seen.insert(team.id.as_str()) {
            team_messages.push(format!("duplicate team id '{}'", team.id));
        }
    }
    if !team_messages.is_empty() {
        errors.push(ValidationIssue {
            field: "teams",
            messages: team_messages,
        });
    }

    if request.avg_team_size == Some(0) {
        errors.push(ValidationIssue {
            field: "avgTeamSize",
            messages: vec!["avgTeamSize must be at least 1".to_string()],
        });
    }

    if !errors.is_empty() {
        return Err(ValidationErrorResponse {
            status: "error",
            message: "Validation failed",
            errors,
        });
    }

    Ok(NewBattle {
        boss_id: request.boss_id,
        questions,
        teams: request.teams,
        avg_team_size: request.avg_team_size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(raw: &str) -> CreateBattleRequest {
        serde_json::from_str(raw).expect("request")
    }

    #[test]
    fn collects_all_validation_issues() {
        let err = validate_create_request(request(
            r#"{"bossId": "dragon",
                "questions": [{"prompt": "q", "options": ["a"], "correctIndex": 3}],
                "teams": [{"id": "a", "name": "A"}, {"id": "a", "name": "A again"}],
                "avgTeamSize": 0}"#,
        ))
        .expect_err("invalid");
        let fields: Vec<_> = err.errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["questions", "teams", "avgTeamSize"]);
        assert!(err.errors[1].messages[0].contains("duplicate team id 'a'"));
    }

    #[test]
    fn lesson_blocks_supply_questions() {
        let battle = validate_create_request(request(
            r#"{"bossId": "kraken",
                "lesson": [{"type": "paragraph", "text": "read"},
                           {"type": "multipleChoice", "prompt": "1+1", "options": ["2", "3"], "correctIndex": 0}],
                "teams": [{"id": "a", "name": "A"}]}"#,
        ))
        .expect("valid");
        assert_eq!(battle.questions.len(), 1);
        assert_eq!(battle.questions[0].prompt, "1+1");
    }
}
