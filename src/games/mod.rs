//! Mini-games played inside an established pairing.
//!
//! Quizzes live in a [`GameRegistry`] keyed by the unordered pair of player
//! ids. The registry subscribes to pairing events and discards a session's
//! quiz once the pairing is dissolved.

pub mod content;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::core::hooks::PairingListener;
use crate::models::UserId;
use content::{QuizQuestion, DARES, QUESTION_BANK, TRUTHS};

#[derive(Debug, Error)]
pub enum GameError {
    #[error("User {0} has no chat partner")]
    NotPaired(UserId),

    #[error("A quiz is already running for this chat")]
    QuizAlreadyRunning,

    #[error("No quiz is running for this chat")]
    NoActiveQuiz,

    #[error("Answering too fast, wait {0} seconds between answers")]
    Throttled(u64),
}

/// Unordered pair of player ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionKey(UserId, UserId);

impl SessionKey {
    pub fn new(a: UserId, b: UserId) -> Self {
        if a <= b {
            Self(a, b)
        } else {
            Self(b, a)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptKind {
    Truth,
    Dare,
}

/// Draw a random truth or dare prompt
pub fn truth_or_dare(kind: PromptKind) -> &'static str {
    let pool = match kind {
        PromptKind::Truth => TRUTHS,
        PromptKind::Dare => DARES,
    };
    pool[rand::thread_rng().gen_range(0..pool.len())]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
    pub number: usize,
    pub total: usize,
    pub question: String,
    pub options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum QuizResult {
    Winner {
        winner: UserId,
        #[serde(rename = "winnerScore")]
        winner_score: u32,
        loser: UserId,
        #[serde(rename = "loserScore")]
        loser_score: u32,
    },
    Draw {
        score: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum QuizProgress {
    Next { question: QuestionView },
    Finished { result: QuizResult },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOutcome {
    pub correct: bool,
    pub score: u32,
    pub progress: QuizProgress,
}

#[derive(Debug)]
struct QuizState {
    questions: Vec<&'static QuizQuestion>,
    current: usize,
    scores: [(UserId, u32); 2],
}

impl QuizState {
    fn view(&self) -> QuestionView {
        let question = self.questions[self.current];
        QuestionView {
            number: self.current + 1,
            total: self.questions.len(),
            question: question.prompt.to_string(),
            options: question.options.iter().map(|o| o.to_string()).collect(),
        }
    }

    fn score_mut(&mut self, user_id: UserId) -> &mut u32 {
        let index = if self.scores[0].0 == user_id { 0 } else { 1 };
        &mut self.scores[index].1
    }

    fn result(&self) -> QuizResult {
        let [(a, a_score), (b, b_score)] = self.scores;
        if a_score == b_score {
            return QuizResult::Draw { score: a_score };
        }

        let ((winner, winner_score), (loser, loser_score)) = if a_score > b_score {
            ((a, a_score), (b, b_score))
        } else {
            ((b, b_score), (a, a_score))
        };
        QuizResult::Winner {
            winner,
            winner_score,
            loser,
            loser_score,
        }
    }
}

/// Running quizzes, one per pairing session
pub struct GameRegistry {
    sessions: Mutex<HashMap<SessionKey, QuizState>>,
    throttle: Option<moka::future::Cache<UserId, ()>>,
    cooldown_secs: u64,
}

impl GameRegistry {
    /// `answer_cooldown_secs` of 0 disables answer throttling
    pub fn new(answer_cooldown_secs: u64) -> Self {
        let throttle = (answer_cooldown_secs > 0).then(|| {
            moka::future::CacheBuilder::new(100_000)
                .time_to_live(Duration::from_secs(answer_cooldown_secs))
                .build()
        });

        Self {
            sessions: Mutex::new(HashMap::new()),
            throttle,
            cooldown_secs: answer_cooldown_secs,
        }
    }

    /// Start a quiz for the pair and return its first question
    pub async fn start_quiz(
        &self,
        user_id: UserId,
        partner_id: UserId,
    ) -> Result<QuestionView, GameError> {
        let key = SessionKey::new(user_id, partner_id);
        let mut sessions = self.sessions.lock().await;
        if sessions.contains_key(&key) {
            return Err(GameError::QuizAlreadyRunning);
        }

        let mut questions: Vec<&'static QuizQuestion> = QUESTION_BANK.iter().collect();
        questions.shuffle(&mut rand::thread_rng());

        let state = QuizState {
            questions,
            current: 0,
            scores: [(user_id, 0), (partner_id, 0)],
        };
        let first = state.view();
        sessions.insert(key, state);

        tracing::info!("Quiz started for users {} and {}", user_id, partner_id);
        Ok(first)
    }

    /// Answer the current question.
    ///
    /// Either player's answer advances the quiz. The last answer ends it and
    /// removes the session.
    pub async fn answer(
        &self,
        user_id: UserId,
        partner_id: UserId,
        text: &str,
    ) -> Result<AnswerOutcome, GameError> {
        let key = SessionKey::new(user_id, partner_id);
        let mut sessions = self.sessions.lock().await;
        let state = sessions.get_mut(&key).ok_or(GameError::NoActiveQuiz)?;

        if let Some(throttle) = &self.throttle {
            if !throttle.entry(user_id).or_insert(()).await.is_fresh() {
                return Err(GameError::Throttled(self.cooldown_secs));
            }
        }

        let expected = state.questions[state.current].answer;
        let correct = text.trim().to_lowercase().contains(expected);
        let score = {
            let score = state.score_mut(user_id);
            if correct {
                *score += 1;
            }
            *score
        };

        state.current += 1;
        if state.current < state.questions.len() {
            return Ok(AnswerOutcome {
                correct,
                score,
                progress: QuizProgress::Next {
                    question: state.view(),
                },
            });
        }

        let result = state.result();
        sessions.remove(&key);
        tracing::info!("Quiz finished for users {} and {}: {:?}", user_id, partner_id, result);

        Ok(AnswerOutcome {
            correct,
            score,
            progress: QuizProgress::Finished { result },
        })
    }

    pub async fn has_quiz(&self, a: UserId, b: UserId) -> bool {
        self.sessions.lock().await.contains_key(&SessionKey::new(a, b))
    }
}

#[async_trait]
impl PairingListener for GameRegistry {
    async fn on_pairing_established(&self, a: UserId, b: UserId) {
        tracing::debug!("Games available for users {} and {}", a, b);
    }

    async fn on_pairing_dissolved(&self, a: UserId, b: UserId) {
        if self.sessions.lock().await.remove(&SessionKey::new(a, b)).is_some() {
            tracing::info!("Discarded quiz of users {} and {}", a, b);
        }
    }
}
