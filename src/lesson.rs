//! Lesson content adapter: turns lesson blocks into battle questions.

use serde::{Deserialize, Serialize};

use crate::battle::Question;
use crate::combat::Difficulty;

/// One block of authored lesson content, as delivered by the lesson service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LessonBlock {
    Heading {
        text: String,
    },
    Paragraph {
        text: String,
    },
    Image {
        url: String,
        #[serde(default)]
        caption: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    MultipleChoice {
        prompt: String,
        options: Vec<String>,
        correct_index: usize,
        #[serde(default)]
        explanation: Option<String>,
        #[serde(default)]
        difficulty: Option<String>,
        #[serde(default)]
        source: Option<String>,
    },
    FreeText {
        prompt: String,
    },
}

/// Collect every usable multiple-choice block as a [`Question`], in lesson order.
pub fn extract_questions(blocks: &[LessonBlock]) -> Vec<Question> {
    blocks.iter().filter_map(to_question).collect()
}

fn to_question(block: &LessonBlock) -> Option<Question> {
    let LessonBlock::MultipleChoice {
        prompt,
        options,
        correct_index,
        explanation,
        difficulty,
        source,
    } = block
    else {
        return None;
    };
    if options.is_empty() || *correct_index >= options.len() {
        tracing::debug!(prompt = %prompt, "skipping malformed multiple-choice block");
        return None;
    }
    Some(Question {
        prompt: prompt.clone(),
        options: options.clone(),
        correct_index: *correct_index,
        explanation: explanation.clone().unwrap_or_default(),
        difficulty: difficulty.as_deref().and_then(Difficulty::parse),
        source: source.clone(),
    })
}
