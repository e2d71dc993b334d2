//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the SQLite database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use legal_analyzer_core::domain::{
    ChatMessage, ChatRole, Document, Favorite, NewDocument, SessionId, StoredAnalysis, Task,
    TaskQuery,
};
use legal_analyzer_core::ports::{DatabaseService, PortError, PortResult};
use serde_json::Value;
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: SqlitePool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct DocumentRecord {
    id: Uuid,
    text: String,
    file_name: String,
    file_type: String,
    created_at: DateTime<Utc>,
}
impl DocumentRecord {
    fn to_domain(self) -> Document {
        Document {
            id: self.id,
            text: self.text,
            file_name: self.file_name,
            file_type: self.file_type,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct AnalysisRecord {
    id: Uuid,
    document_id: Uuid,
    json: String,
    created_at: DateTime<Utc>,
}
impl AnalysisRecord {
    fn to_domain(self) -> PortResult<StoredAnalysis> {
        let json = serde_json::from_str(&self.json).map_err(|e| {
            PortError::Unexpected(format!("Stored analysis {} is not JSON: {}", self.id, e))
        })?;
        Ok(StoredAnalysis {
            id: self.id,
            document_id: self.document_id,
            json,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct ChatMessageRecord {
    id: Uuid,
    document_id: Uuid,
    role: String,
    content: String,
    created_at: DateTime<Utc>,
}
impl ChatMessageRecord {
    fn to_domain(self) -> PortResult<ChatMessage> {
        let role = self.role.parse::<ChatRole>().map_err(PortError::Unexpected)?;
        Ok(ChatMessage {
            id: self.id,
            document_id: self.document_id,
            role,
            content: self.content,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct FavoriteRecord {
    id: Uuid,
    query: String,
    created_at: DateTime<Utc>,
}
impl FavoriteRecord {
    fn to_domain(self) -> Favorite {
        Favorite {
            id: self.id,
            query: self.query,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct TaskRecord {
    name: String,
    slug: String,
    description: Option<String>,
    completed: bool,
    due_date: Option<DateTime<Utc>>,
}
impl TaskRecord {
    fn to_domain(self) -> Task {
        Task {
            name: self.name,
            slug: self.slug,
            description: self.description,
            completed: self.completed,
            due_date: self.due_date,
        }
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_document(
        &self,
        session: SessionId,
        document: NewDocument,
    ) -> PortResult<Document> {
        let record = sqlx::query_as::<_, DocumentRecord>(
            "INSERT INTO documents (id, session_id, text, file_name, file_type, created_at) \
             VALUES (?, ?, ?, ?, ?, ?) \
             RETURNING id, text, file_name, file_type, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(session.as_uuid())
        .bind(document.text)
        .bind(document.file_name)
        .bind(document.file_type)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn get_document(&self, session: SessionId, document_id: Uuid) -> PortResult<Document> {
        let record = sqlx::query_as::<_, DocumentRecord>(
            "SELECT id, text, file_name, file_type, created_at FROM documents \
             WHERE id = ? AND session_id = ?",
        )
        .bind(document_id)
        .bind(session.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("Document {} not found", document_id)))?;
        Ok(record.to_domain())
    }

    async fn save_analysis(
        &self,
        session: SessionId,
        document_id: Uuid,
        json: Value,
    ) -> PortResult<StoredAnalysis> {
        // The document must exist within the same session.
        self.get_document(session, document_id).await?;

        let record = sqlx::query_as::<_, AnalysisRecord>(
            "INSERT INTO analyses (id, session_id, document_id, json, created_at) \
             VALUES (?, ?, ?, ?, ?) \
             RETURNING id, document_id, json, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(session.as_uuid())
        .bind(document_id)
        .bind(json.to_string())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        record.to_domain()
    }

    async fn latest_analysis(
        &self,
        session: SessionId,
        document_id: Uuid,
    ) -> PortResult<StoredAnalysis> {
        let record = sqlx::query_as::<_, AnalysisRecord>(
            "SELECT id, document_id, json, created_at FROM analyses \
             WHERE document_id = ? AND session_id = ? \
             ORDER BY created_at DESC, rowid DESC LIMIT 1",
        )
        .bind(document_id)
        .bind(session.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| {
            PortError::NotFound(format!("No analysis for document {}", document_id))
        })?;
        record.to_domain()
    }

    async fn append_chat_message(
        &self,
        session: SessionId,
        document_id: Uuid,
        role: ChatRole,
        content: &str,
    ) -> PortResult<ChatMessage> {
        self.get_document(session, document_id).await?;

        let record = sqlx::query_as::<_, ChatMessageRecord>(
            "INSERT INTO chat_messages (id, session_id, document_id, role, content, created_at) \
             VALUES (?, ?, ?, ?, ?, ?) \
             RETURNING id, document_id, role, content, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(session.as_uuid())
        .bind(document_id)
        .bind(role.as_str())
        .bind(content)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        record.to_domain()
    }

    async fn chat_messages(
        &self,
        session: SessionId,
        document_id: Uuid,
    ) -> PortResult<Vec<ChatMessage>> {
        let records = sqlx::query_as::<_, ChatMessageRecord>(
            "SELECT id, document_id, role, content, created_at FROM chat_messages \
             WHERE document_id = ? AND session_id = ? ORDER BY rowid ASC",
        )
        .bind(document_id)
        .bind(session.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn save_favorite(&self, session: SessionId, query: &str) -> PortResult<Favorite> {
        let record = sqlx::query_as::<_, FavoriteRecord>(
            "INSERT INTO favorites (id, session_id, query, created_at) VALUES (?, ?, ?, ?) \
             RETURNING id, query, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(session.as_uuid())
        .bind(query)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn favorites(&self, session: SessionId) -> PortResult<Vec<Favorite>> {
        let records = sqlx::query_as::<_, FavoriteRecord>(
            "SELECT id, query, created_at FROM favorites WHERE session_id = ? \
             ORDER BY created_at DESC, rowid DESC",
        )
        .bind(session.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn list_tasks(&self, query: TaskQuery) -> PortResult<Vec<Task>> {
        let mut sql =
            String::from("SELECT name, slug, description, completed, due_date FROM tasks");
        if query.completed.is_some() {
            sql.push_str(" WHERE completed = ?");
        }
        sql.push_str(" ORDER BY created_at DESC, rowid DESC LIMIT ? OFFSET ?");

        let mut statement = sqlx::query_as::<_, TaskRecord>(&sql);
        if let Some(completed) = query.completed {
            statement = statement.bind(completed);
        }
        let records = statement
            .bind(i64::from(TaskQuery::PAGE_SIZE))
            .bind(i64::from(query.offset()))
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn create_task(&self, task: Task) -> PortResult<Task> {
        let record = sqlx::query_as::<_, TaskRecord>(
            "INSERT INTO tasks (slug, name, description, completed, due_date, created_at) \
             VALUES (?, ?, ?, ?, ?, ?) \
             RETURNING name, slug, description, completed, due_date",
        )
        .bind(&task.slug)
        .bind(&task.name)
        .bind(&task.description)
        .bind(task.completed)
        .bind(task.due_date)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                PortError::Conflict(format!("Task '{}' already exists", task.slug))
            }
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }

    async fn get_task(&self, slug: &str) -> PortResult<Task> {
        let record = sqlx::query_as::<_, TaskRecord>(
            "SELECT name, slug, description, completed, due_date FROM tasks WHERE slug = ?",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("Task '{}' not found", slug)))?;
        Ok(record.to_domain())
    }

    async fn delete_task(&self, slug: &str) -> PortResult<Task> {
        let task = self.get_task(slug).await?;
        sqlx::query("DELETE FROM tasks WHERE slug = ?")
            .bind(slug)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(task)
    }
}
