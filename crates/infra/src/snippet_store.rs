//! Code snippet CRUD.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use tracing::{info, instrument};

use switchboard_core::{DomainError, SnippetId, format_timestamp, parse_timestamp, require_non_blank};

use crate::db::Database;
use crate::error::{StoreError, StoreResult, map_sqlx_error};

pub const DEFAULT_LANGUAGE: &str = "Python";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snippet {
    pub id: SnippetId,
    pub title: String,
    pub description: String,
    pub code: String,
    pub language: String,
    pub tags: Vec<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Editable fields of a snippet.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SnippetDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub code: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

struct ValidDraft {
    title: String,
    description: String,
    code: String,
    language: String,
    tags: String,
}

impl SnippetDraft {
    fn validate(&self) -> StoreResult<ValidDraft> {
        let title = require_non_blank("title", &self.title)?.to_string();
        if self.code.trim().is_empty() {
            return Err(DomainError::validation("code cannot be empty").into());
        }
        let language = self
            .language
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(DEFAULT_LANGUAGE)
            .to_string();
        let tags: Vec<&str> = self
            .tags
            .iter()
            .flat_map(|t| t.split(','))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect();
        Ok(ValidDraft {
            title,
            description: self.description.trim().to_string(),
            code: self.code.clone(),
            language,
            tags: tags.join(","),
        })
    }
}

#[derive(Debug, Clone)]
pub struct SnippetStore {
    db: Database,
}

impl SnippetStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    #[instrument(skip(self, draft), err)]
    pub async fn create(&self, author: &str, draft: SnippetDraft) -> StoreResult<Snippet> {
        let valid = draft.validate()?;
        let id = SnippetId::new();
        let now = format_timestamp(Utc::now());

        sqlx::query(
            r#"
            INSERT INTO code_snippets
                (id, title, description, code, language, tags, created_by, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(&valid.title)
        .bind(&valid.description)
        .bind(&valid.code)
        .bind(&valid.language)
        .bind(&valid.tags)
        .bind(author)
        .bind(&now)
        .bind(&now)
        .execute(self.db.pool())
        .await
        .map_err(|e| map_sqlx_error("create_snippet", e))?;

        info!(snippet_id = %id, "snippet created");
        self.get(id)
            .await?
            .ok_or_else(|| StoreError::Persistence("created snippet vanished".to_string()))
    }

    pub async fn get(&self, id: SnippetId) -> StoreResult<Option<Snippet>> {
        let row = sqlx::query(
            r#"
            SELECT id, title, description, code, language, tags, created_by, created_at, updated_at
            FROM code_snippets
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(self.db.pool())
        .await
        .map_err(|e| map_sqlx_error("get_snippet", e))?;

        row.as_ref().map(snippet_from_row).transpose()
    }

    /// Newest first; `search` matches title, description or tags.
    pub async fn list(&self, search: Option<&str>) -> StoreResult<Vec<Snippet>> {
        let needle = search.map(str::trim).unwrap_or("");
        let rows = sqlx::query(
            r#"
            SELECT id, title, description, code, language, tags, created_by, created_at, updated_at
            FROM code_snippets
            WHERE ?1 = ''
               OR instr(lower(title), lower(?1)) > 0
               OR instr(lower(description), lower(?1)) > 0
               OR instr(lower(tags), lower(?1)) > 0
            ORDER BY updated_at DESC, id DESC
            "#,
        )
        .bind(needle)
        .fetch_all(self.db.pool())
        .await
        .map_err(|e| map_sqlx_error("list_snippets", e))?;

        rows.iter().map(snippet_from_row).collect()
    }

    #[instrument(skip(self, draft), err)]
    pub async fn update(&self, id: SnippetId, draft: SnippetDraft) -> StoreResult<Snippet> {
        let valid = draft.validate()?;
        let updated = sqlx::query(
            r#"
            UPDATE code_snippets
            SET title = ?, description = ?, code = ?, language = ?, tags = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&valid.title)
        .bind(&valid.description)
        .bind(&valid.code)
        .bind(&valid.language)
        .bind(&valid.tags)
        .bind(format_timestamp(Utc::now()))
        .bind(id.to_string())
        .execute(self.db.pool())
        .await
        .map_err(|e| map_sqlx_error("update_snippet", e))?;

        if updated.rows_affected() == 0 {
            return Err(DomainError::not_found().into());
        }
        self.get(id).await?.ok_or_else(|| DomainError::not_found().into())
    }

    /// Returns `false` when no such snippet exists.
    #[instrument(skip(self), err)]
    pub async fn delete(&self, id: SnippetId) -> StoreResult<bool> {
        let deleted = sqlx::query("DELETE FROM code_snippets WHERE id = ?")
            .bind(id.to_string())
            .execute(self.db.pool())
            .await
            .map_err(|e| map_sqlx_error("delete_snippet", e))?
            .rows_affected();
        Ok(deleted > 0)
    }
}

fn snippet_from_row(row: &SqliteRow) -> StoreResult<Snippet> {
    let map = |e| map_sqlx_error("snippet_from_row", e);
    let id: String = row.try_get("id").map_err(map)?;
    let tags: String = row.try_get("tags").map_err(map)?;
    let created_at: String = row.try_get("created_at").map_err(map)?;
    let updated_at: String = row.try_get("updated_at").map_err(map)?;
    let corrupt = |e: DomainError| StoreError::Persistence(format!("corrupt snippet row: {e}"));

    Ok(Snippet {
        id: id.parse::<SnippetId>().map_err(corrupt)?,
        title: row.try_get("title").map_err(map)?,
        description: row.try_get("description").map_err(map)?,
        code: row.try_get("code").map_err(map)?,
        language: row.try_get("language").map_err(map)?,
        tags: tags
            .split(',')
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect(),
        created_by: row.try_get("created_by").map_err(map)?,
        created_at: parse_timestamp(&created_at).map_err(corrupt)?,
        updated_at: parse_timestamp(&updated_at).map_err(corrupt)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CredentialStore;

    async fn store() -> SnippetStore {
        let db = Database::in_memory().await.unwrap();
        CredentialStore::new(db.clone()).register("alice", "pass").await.unwrap();
        SnippetStore::new(db)
    }

    fn draft(title: &str, code: &str, tags: &[&str]) -> SnippetDraft {
        SnippetDraft {
            title: title.to_string(),
            description: format!("{title} description"),
            code: code.to_string(),
            language: None,
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn create_defaults_language_and_normalizes_tags() {
        let store = store().await;
        let snippet = store
            .create("alice", draft(" Hello ", "print('hi')", &["intro, basics", " ", "io"]))
            .await
            .unwrap();

        assert_eq!(snippet.title, "Hello");
        assert_eq!(snippet.language, DEFAULT_LANGUAGE);
        assert_eq!(snippet.tags, vec!["intro", "basics", "io"]);
        assert_eq!(snippet.created_by, "alice");
        assert_eq!(snippet.created_at, snippet.updated_at);
        assert_eq!(store.get(snippet.id).await.unwrap(), Some(snippet));
    }

    #[tokio::test]
    async fn title_and_code_are_required() {
        let store = store().await;
        for bad in [draft("", "x", &[]), draft("t", "  \n", &[])] {
            assert!(matches!(
                store.create("alice", bad).await,
                Err(StoreError::Domain(DomainError::Validation(_)))
            ));
        }
    }

    #[tokio::test]
    async fn search_matches_title_description_and_tags() {
        let store = store().await;
        store.create("alice", draft("Parse JSON", "json.loads(s)", &["io"])).await.unwrap();
        store.create("alice", draft("Sort list", "sorted(xs)", &["collections"])).await.unwrap();

        let by_title = store.list(Some("json")).await.unwrap();
        assert_eq!(by_title.len(), 1);
        assert_eq!(by_title[0].title, "Parse JSON");

        let by_tag = store.list(Some("COLLECT")).await.unwrap();
        assert_eq!(by_tag[0].title, "Sort list");

        assert_eq!(store.list(Some("description")).await.unwrap().len(), 2);
        assert_eq!(store.list(None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn update_refreshes_timestamp_and_lists_newest_first() {
        let store = store().await;
        let first = store.create("alice", draft("First", "1", &[])).await.unwrap();
        store.create("alice", draft("Second", "2", &[])).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        let mut edit = draft("First, edited", "1 + 1", &[]);
        edit.language = Some("Rust".to_string());
        let updated = store.update(first.id, edit).await.unwrap();

        assert_eq!(updated.language, "Rust");
        assert!(updated.updated_at >= first.updated_at);
        assert_eq!(updated.created_at, first.created_at);
        assert_eq!(store.list(None).await.unwrap()[0].title, "First, edited");

        assert!(matches!(
            store.update(SnippetId::new(), draft("x", "y", &[])).await,
            Err(StoreError::Domain(DomainError::NotFound))
        ));
    }

    #[tokio::test]
    async fn delete_reports_whether_anything_was_removed() {
        let store = store().await;
        let snippet = store.create("alice", draft("Temp", "pass", &[])).await.unwrap();
        assert!(store.delete(snippet.id).await.unwrap());
        assert!(!store.delete(snippet.id).await.unwrap());
        assert_eq!(store.get(snippet.id).await.unwrap(), None);
    }
}
