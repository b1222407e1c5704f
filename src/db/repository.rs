use async_trait::async_trait;

use crate::db::models::{NewPoll, Poll, PollDocument};
use crate::error::AppError;

/// Repository trait for poll operations.
///
/// This trait allows mocking the database layer in tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PollRepository: Send + Sync {
    /// Persist a new poll with zeroed counters and return the stored poll.
    async fn insert(&self, poll: NewPoll) -> Result<Poll, AppError>;

    /// List all polls, newest first.
    async fn list_newest_first(&self) -> Result<Vec<Poll>, AppError>;

    /// Find a poll by its identifier.
    ///
    /// Returns `None` when the identifier is unknown or malformed.
    async fn find_by_id(&self, id: &str) -> Result<Option<Poll>, AppError>;

    /// Atomically add one vote to the option at `option_index`.
    ///
    /// Fails with `NotFound` if the poll does not exist and with
    /// `BadRequest` if the index is past the last option. Neither failure
    /// mutates the poll.
    async fn increment_vote(&self, id: &str, option_index: usize) -> Result<Poll, AppError>;
}

/// MongoDB implementation of the PollRepository.
pub struct MongoPollRepository {
    collection: mongodb::Collection<PollDocument>,
}

impl MongoPollRepository {
    pub fn new(db: &mongodb::Database) -> Self {
        Self {
            collection: db.collection("polls"),
        }
    }

    /// Create the `createdAt` index used by the newest-first listing.
    pub async fn ensure_indexes(&self) -> Result<(), AppError> {
        use mongodb::bson::doc;
        use mongodb::IndexModel;

        let index = IndexModel::builder().keys(doc! { "createdAt": -1 }).build();

        self.collection
            .create_index(index)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }
}

fn parse_object_id(id: &str) -> Option<mongodb::bson::oid::ObjectId> {
    mongodb::bson::oid::ObjectId::parse_str(id).ok()
}

fn poll_not_found() -> AppError {
    AppError::NotFound("Poll not found".into())
}

#[async_trait]
impl PollRepository for MongoPollRepository {
    async fn insert(&self, poll: NewPoll) -> Result<Poll, AppError> {
        // BSON dates carry milliseconds, so the returned poll matches what a later read sees.
        let doc = poll.into_document(bson::DateTime::now());

        self.collection
            .insert_one(&doc)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(Poll::from(doc))
    }

    async fn list_newest_first(&self) -> Result<Vec<Poll>, AppError> {
        use mongodb::bson::doc;
        use mongodb::options::FindOptions;

        let options = FindOptions::builder()
            .sort(doc! { "createdAt": -1, "_id": -1 })
            .build();

        let mut cursor = self
            .collection
            .find(doc! {})
            .with_options(options)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut polls = Vec::new();
        use futures::TryStreamExt;
        while let Some(doc) = cursor
            .try_next()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
        {
            polls.push(Poll::from(doc));
        }

        Ok(polls)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Poll>, AppError> {
        use mongodb::bson::doc;

        let Some(oid) = parse_object_id(id) else {
            return Ok(None);
        };

        let doc = self
            .collection
            .find_one(doc! { "_id": oid })
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(doc.map(Poll::from))
    }

    async fn increment_vote(&self, id: &str, option_index: usize) -> Result<Poll, AppError> {
        use mongodb::bson::{doc, Document};
        use mongodb::options::{FindOneAndUpdateOptions, ReturnDocument};

        let oid = parse_object_id(id).ok_or_else(poll_not_found)?;

        // Matching on the element's existence keeps the bounds check and the
        // increment in one server-side operation.
        let field = format!("options.{option_index}");
        let mut filter = doc! { "_id": oid };
        filter.insert(field.as_str(), doc! { "$exists": true });

        let mut inc = Document::new();
        inc.insert(format!("{field}.votes"), 1);
        let update = doc! { "$inc": inc };

        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        let updated = self
            .collection
            .find_one_and_update(filter, update)
            .with_options(options)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if let Some(doc) = updated {
            return Ok(Poll::from(doc));
        }

        let exists = self
            .collection
            .count_documents(doc! { "_id": oid })
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            > 0;

        if exists {
            Err(AppError::BadRequest("Invalid option index".into()))
        } else {
            Err(poll_not_found())
        }
    }
}
