//! Tag repository.

use std::collections::HashMap;
use std::sync::Arc;

use crate::entities::{MemeTag, Tag, meme_tag, tag};
use memehub_common::{AppError, AppResult, IdGenerator};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult, JoinType, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, Set, sea_query::OnConflict,
};

#[derive(Debug, FromQueryResult)]
struct MemeTagNameRow {
    meme_id: String,
    name: String,
}

/// Tag repository for database operations.
#[derive(Clone)]
pub struct TagRepository {
    db: Arc<DatabaseConnection>,
}

impl TagRepository {
    /// Create a new tag repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a tag by its (normalized) name.
    pub async fn find_by_name(&self, name: &str) -> AppResult<Option<tag::Model>> {
        Tag::find()
            .filter(tag::Column::Name.eq(name))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// All tags, alphabetically.
    pub async fn find_all(&self) -> AppResult<Vec<tag::Model>> {
        Tag::find()
            .order_by_asc(tag::Column::Name)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Make sure a tag row exists for every name and return them all.
    ///
    /// Names already present are left alone, so concurrent uploads sharing a
    /// new tag both end up pointing at the same row.
    pub async fn upsert_many(&self, names: &[String]) -> AppResult<Vec<tag::Model>> {
        if names.is_empty() {
            return Ok(vec![]);
        }

        let id_gen = IdGenerator::new();
        let now = chrono::Utc::now();
        let models = names.iter().map(|name| tag::ActiveModel {
            id: Set(id_gen.generate()),
            name: Set(name.clone()),
            created_at: Set(now.into()),
        });

        Tag::insert_many(models)
            .on_conflict(OnConflict::column(tag::Column::Name).do_nothing().to_owned())
            .exec_without_returning(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Tag::find()
            .filter(tag::Column::Name.is_in(names.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Link a meme to tags.
    pub async fn attach(&self, meme_id: &str, tag_ids: &[String]) -> AppResult<()> {
        if tag_ids.is_empty() {
            return Ok(());
        }

        let id_gen = IdGenerator::new();
        let links = tag_ids.iter().map(|tag_id| meme_tag::ActiveModel {
            id: Set(id_gen.generate()),
            meme_id: Set(meme_id.to_string()),
            tag_id: Set(tag_id.clone()),
        });

        MemeTag::insert_many(links)
            .on_conflict(
                OnConflict::columns([meme_tag::Column::MemeId, meme_tag::Column::TagId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Tag names for a batch of memes, sorted per meme.
    pub async fn names_for_memes(
        &self,
        meme_ids: &[String],
    ) -> AppResult<HashMap<String, Vec<String>>> {
        if meme_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = MemeTag::find()
            .select_only()
            .column(meme_tag::Column::MemeId)
            .column(tag::Column::Name)
            .join(JoinType::InnerJoin, meme_tag::Relation::Tag.def())
            .filter(meme_tag::Column::MemeId.is_in(meme_ids.to_vec()))
            .order_by_asc(tag::Column::Name)
            .into_model::<MemeTagNameRow>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut names: HashMap<String, Vec<String>> = HashMap::new();
        for row in rows {
            names.entry(row.meme_id).or_default().push(row.name);
        }
        Ok(names)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Value};
    use std::collections::BTreeMap;

    fn name_row(meme_id: &str, name: &str) -> BTreeMap<&'static str, Value> {
        maplit::btreemap! {
            "meme_id" => Value::String(Some(Box::new(meme_id.to_string()))),
            "name" => Value::String(Some(Box::new(name.to_string()))),
        }
    }

    #[tokio::test]
    async fn test_upsert_many_returns_existing_and_new() {
        let now = Utc::now();
        let tags = vec![
            tag::Model {
                id: "t1".to_string(),
                name: "cats".to_string(),
                created_at: now.into(),
            },
            tag::Model {
                id: "t2".to_string(),
                name: "dogs".to_string(),
                created_at: now.into(),
            },
        ];

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .append_query_results([tags])
                .into_connection(),
        );

        let repo = TagRepository::new(db);
        let result = repo
            .upsert_many(&["cats".to_string(), "dogs".to_string()])
            .await
            .unwrap();

        assert_eq!(result.len(), 2);
    }

    #[tokio::test]
    async fn test_names_for_memes_groups_by_meme() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![
                    name_row("m1", "cats"),
                    name_row("m2", "dogs"),
                    name_row("m1", "funny"),
                ]])
                .into_connection(),
        );

        let repo = TagRepository::new(db);
        let names = repo
            .names_for_memes(&["m1".to_string(), "m2".to_string()])
            .await
            .unwrap();

        assert_eq!(names["m1"], vec!["cats", "funny"]);
        assert_eq!(names["m2"], vec!["dogs"]);
    }

    #[tokio::test]
    async fn test_attach_without_tags_is_noop() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let repo = TagRepository::new(db);
        assert!(repo.attach("m1", &[]).await.is_ok());
    }
}
