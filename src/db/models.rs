use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Fewest options a poll can be created with.
pub const MIN_OPTIONS: usize = 2;
/// Most options a poll can be created with.
pub const MAX_OPTIONS: usize = 6;

/// A poll as returned by the API.
///
/// Serialized as `{id, question, options: [{text, votes}], createdAt}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Poll {
    /// Hex-encoded store identifier.
    pub id: String,
    pub question: String,
    /// Fixed at creation. An option's position is its vote target.
    pub options: Vec<PollOption>,
    pub created_at: DateTime<Utc>,
}

/// One candidate answer within a poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollOption {
    pub text: String,
    /// Only ever incremented.
    #[serde(default)]
    pub votes: u32,
}

/// A poll as stored in the `polls` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollDocument {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub question: String,
    pub options: Vec<PollOption>,
    #[serde(rename = "createdAt")]
    pub created_at: bson::DateTime,
}

impl From<PollDocument> for Poll {
    fn from(doc: PollDocument) -> Self {
        Self {
            id: doc.id.to_hex(),
            question: doc.question,
            options: doc.options,
            created_at: doc.created_at.to_chrono(),
        }
    }
}

/// Validated input for creating a poll.
///
/// Can only be built through [`NewPoll::parse`], so every value handed to
/// the store already satisfies the creation invariants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPoll {
    question: String,
    options: Vec<String>,
}

impl NewPoll {
    /// Trim the question and options, drop empty options, and check bounds.
    pub fn parse<S: AsRef<str>>(question: &str, options: &[S]) -> Result<Self, AppError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(invalid_poll_data());
        }

        let options: Vec<String> = options
            .iter()
            .map(|o| o.as_ref().trim())
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect();

        if !(MIN_OPTIONS..=MAX_OPTIONS).contains(&options.len()) {
            return Err(invalid_poll_data());
        }

        Ok(Self {
            question: question.to_string(),
            options,
        })
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// Build the stored document with zeroed counters.
    pub fn into_document(self, created_at: bson::DateTime) -> PollDocument {
        PollDocument {
            id: ObjectId::new(),
            question: self.question,
            options: self
                .options
                .into_iter()
                .map(|text| PollOption { text, votes: 0 })
                .collect(),
            created_at,
        }
    }
}

fn invalid_poll_data() -> AppError {
    AppError::BadRequest("Invalid poll data".into())
}

/// Request payload for `POST /polls`.
///
/// Fields are optional so that a missing field is reported as
/// "Invalid poll data" instead of a deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreatePollRequest {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub options: Option<Vec<String>>,
}

/// Request payload for `PUT /polls/{id}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoteRequest {
    #[serde(rename = "optionIndex", default)]
    pub option_index: Option<i64>,
}

/// Response from a successful vote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteResponse {
    pub message: String,
    pub poll: Poll,
}

/// Chart-ready tally of a poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResults {
    pub id: String,
    pub question: String,
    pub total_votes: u64,
    pub options: Vec<OptionResult>,
}

/// One slice of the results chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionResult {
    pub text: String,
    pub votes: u32,
    /// Percentage of all votes in the poll, 0 when nobody has voted.
    pub share: f64,
}

impl From<&Poll> for PollResults {
    fn from(poll: &Poll) -> Self {
        let total_votes: u64 = poll.options.iter().map(|o| u64::from(o.votes)).sum();
        let options = poll
            .options
            .iter()
            .map(|o| OptionResult {
                text: o.text.clone(),
                votes: o.votes,
                share: if total_votes == 0 {
                    0.0
                } else {
                    f64::from(o.votes) * 100.0 / total_votes as f64
                },
            })
            .collect();

        Self {
            id: poll.id.clone(),
            question: poll.question.clone(),
            total_votes,
            options,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims_and_drops_empty_options() {
        let poll = NewPoll::parse("  Coffee or tea?  ", &["  Coffee ", "", "   ", "Tea"]).unwrap();
        assert_eq!(poll.question(), "Coffee or tea?");
        assert_eq!(poll.options(), &["Coffee".to_string(), "Tea".to_string()]);
    }

    #[test]
    fn test_parse_rejects_empty_question() {
        let err = NewPoll::parse("   ", &["a", "b"]).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(msg) if msg == "Invalid poll data"));
    }

    #[test]
    fn test_parse_rejects_too_few_options_after_trim() {
        let err = NewPoll::parse("Q?", &["only", "  "]).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn test_parse_option_bounds() {
        let six = ["1", "2", "3", "4", "5", "6"];
        assert!(NewPoll::parse("Q?", &six).is_ok());

        let seven = ["1", "2", "3", "4", "5", "6", "7"];
        assert!(NewPoll::parse("Q?", &seven).is_err());
    }

    #[test]
    fn test_into_document_zeroes_votes_and_keeps_order() {
        let poll = NewPoll::parse("Pick", &["c", "a", "b"]).unwrap();
        let doc = poll.into_document(bson::DateTime::now());
        let texts: Vec<&str> = doc.options.iter().map(|o| o.text.as_str()).collect();
        assert_eq!(texts, vec!["c", "a", "b"]);
        assert!(doc.options.iter().all(|o| o.votes == 0));
    }

    #[test]
    fn test_poll_json_shape() {
        let created = bson::DateTime::from_millis(1_700_000_000_000);
        let doc = NewPoll::parse("Q?", &["a", "b"]).unwrap().into_document(created);
        let id = doc.id.to_hex();
        let json = serde_json::to_value(Poll::from(doc)).unwrap();

        assert_eq!(json["id"], id);
        assert_eq!(json["question"], "Q?");
        assert_eq!(json["options"][0]["text"], "a");
        assert_eq!(json["options"][0]["votes"], 0);
        assert!(json["createdAt"].is_string());
    }

    #[test]
    fn test_results_shares() {
        let poll = Poll {
            id: "abc".into(),
            question: "Q?".into(),
            options: vec![
                PollOption { text: "a".into(), votes: 3 },
                PollOption { text: "b".into(), votes: 1 },
            ],
            created_at: Utc::now(),
        };
        let results = PollResults::from(&poll);
        assert_eq!(results.total_votes, 4);
        assert_eq!(results.options[0].share, 75.0);
        assert_eq!(results.options[1].share, 25.0);
    }

    #[test]
    fn test_results_without_votes() {
        let poll = Poll {
            id: "abc".into(),
            question: "Q?".into(),
            options: vec![
                PollOption { text: "a".into(), votes: 0 },
                PollOption { text: "b".into(), votes: 0 },
            ],
            created_at: Utc::now(),
        };
        let results = PollResults::from(&poll);
        assert_eq!(results.total_votes, 0);
        assert!(results.options.iter().all(|o| o.share == 0.0));
    }
}
