//! SQLite-backed channel registry and draft store.

use std::path::Path;

use async_trait::async_trait;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

use crate::{
    domain::{ButtonLink, ChannelRef, MediaKind, MediaRef, OperatorId, PostDraft},
    errors::Error,
    store::{ChannelRegistry, DraftStore},
    Result,
};

pub struct SqliteStore {
    pool: SqlitePool,
}

type DraftRow = (
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
);

impl SqliteStore {
    /// Open (creating if needed) the database file and ensure the schema exists.
    pub async fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    Error::Storage(format!("failed to create {}: {e}", parent.display()))
                })?;
            }
        }

        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Private in-memory database (tests).
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                user_id INTEGER PRIMARY KEY,
                channel_id TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS posts (
                user_id INTEGER,
                text TEXT,
                media TEXT,
                button_text TEXT,
                button_url TEXT,
                media_kind TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Databases created before media kinds were tracked lack the column.
        let columns: Vec<(String,)> = sqlx::query_as("SELECT name FROM pragma_table_info('posts')")
            .fetch_all(&self.pool)
            .await?;
        if !columns.iter().any(|(name,)| name == "media_kind") {
            sqlx::query("ALTER TABLE posts ADD COLUMN media_kind TEXT")
                .execute(&self.pool)
                .await?;
        }

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_posts_user ON posts(user_id)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl ChannelRegistry for SqliteStore {
    async fn set_channel(&self, operator: OperatorId, channel: &ChannelRef) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (user_id, channel_id)
            VALUES (?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                channel_id = excluded.channel_id
            "#,
        )
        .bind(operator.0)
        .bind(channel.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_channel(&self, operator: OperatorId) -> Result<Option<ChannelRef>> {
        let row: Option<(Option<String>,)> =
            sqlx::query_as("SELECT channel_id FROM users WHERE user_id = ?")
                .bind(operator.0)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row
            .and_then(|(channel,)| channel)
            .and_then(|raw| ChannelRef::parse(&raw).ok()))
    }
}

#[async_trait]
impl DraftStore for SqliteStore {
    async fn replace_draft(
        &self,
        operator: OperatorId,
        text: &str,
        media: Option<&MediaRef>,
        button: Option<&ButtonLink>,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM posts WHERE user_id = ?")
            .bind(operator.0)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO posts (user_id, text, media, media_kind, button_text, button_url)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(operator.0)
        .bind(text)
        .bind(media.map(|m| m.file_id.as_str()))
        .bind(media.map(|m| m.kind.as_str()))
        .bind(button.map(|b| b.label.as_str()))
        .bind(button.map(|b| b.target.as_str()))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn get_draft(&self, operator: OperatorId) -> Result<Option<PostDraft>> {
        let row: Option<DraftRow> = sqlx::query_as(
            r#"
            SELECT COALESCE(text, ''), media, media_kind, button_text, button_url
            FROM posts
            WHERE user_id = ?
            ORDER BY rowid DESC
            LIMIT 1
            "#,
        )
        .bind(operator.0)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(text, media, media_kind, button_text, button_url)| {
            PostDraft {
                operator_id: operator,
                text,
                media: media.filter(|m| !m.is_empty()).map(|file_id| MediaRef {
                    kind: MediaKind::from_db(media_kind.as_deref()),
                    file_id,
                }),
                button: ButtonLink::from_parts(button_text, button_url),
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn button(label: &str, target: &str) -> ButtonLink {
        ButtonLink {
            label: label.to_string(),
            target: target.to_string(),
        }
    }

    #[tokio::test]
    async fn channel_link_is_upserted() {
        let store = SqliteStore::in_memory().await.unwrap();
        let op = OperatorId(42);

        store
            .set_channel(op, &ChannelRef::parse("@old").unwrap())
            .await
            .unwrap();
        store
            .set_channel(op, &ChannelRef::parse("@mychannel").unwrap())
            .await
            .unwrap();

        let channel = store.get_channel(op).await.unwrap().unwrap();
        assert_eq!(channel.as_str(), "@mychannel");

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn replace_draft_keeps_a_single_row() {
        let store = SqliteStore::in_memory().await.unwrap();
        let op = OperatorId(42);

        store
            .replace_draft(
                op,
                "first",
                Some(&MediaRef::video("vid-1")),
                Some(&button("Buy", "https://example.com")),
            )
            .await
            .unwrap();
        store.replace_draft(op, "second", None, None).await.unwrap();

        let draft = store.get_draft(op).await.unwrap().unwrap();
        assert_eq!(draft.text, "second");
        assert_eq!(draft.media, None);
        assert_eq!(draft.button, None);

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM posts WHERE user_id = ?")
            .bind(op.0)
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn media_kind_and_button_are_read_back() {
        let store = SqliteStore::in_memory().await.unwrap();
        let op = OperatorId(1);
        store
            .replace_draft(
                op,
                "<b>Hello</b>",
                Some(&MediaRef::video("vid-1")),
                Some(&button("Buy", "https://example.com")),
            )
            .await
            .unwrap();

        let draft = store.get_draft(op).await.unwrap().unwrap();
        assert_eq!(draft.media, Some(MediaRef::video("vid-1")));
        assert_eq!(draft.button, Some(button("Buy", "https://example.com")));
    }

    #[tokio::test]
    async fn reads_are_idempotent() {
        let store = SqliteStore::in_memory().await.unwrap();
        let op = OperatorId(3);
        store
            .set_channel(op, &ChannelRef::parse("@c").unwrap())
            .await
            .unwrap();
        store.replace_draft(op, "x", None, None).await.unwrap();

        assert_eq!(
            store.get_channel(op).await.unwrap(),
            store.get_channel(op).await.unwrap()
        );
        assert_eq!(
            store.get_draft(op).await.unwrap(),
            store.get_draft(op).await.unwrap()
        );
    }

    #[tokio::test]
    async fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("bot.db");
        let op = OperatorId(9);

        {
            let store = SqliteStore::open(&path).await.unwrap();
            store
                .set_channel(op, &ChannelRef::parse("@persisted").unwrap())
                .await
                .unwrap();
            store
                .replace_draft(op, "kept", Some(&MediaRef::photo("p")), None)
                .await
                .unwrap();
            store.pool.close().await;
        }

        let store = SqliteStore::open(&path).await.unwrap();
        assert_eq!(
            store.get_channel(op).await.unwrap().unwrap().as_str(),
            "@persisted"
        );
        let draft = store.get_draft(op).await.unwrap().unwrap();
        assert_eq!(draft.text, "kept");
        assert_eq!(draft.media, Some(MediaRef::photo("p")));
    }

    #[tokio::test]
    async fn upgrades_legacy_posts_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.db");
        let url = format!("sqlite:{}?mode=rwc", path.display());
        {
            let pool = SqlitePoolOptions::new().connect(&url).await.unwrap();
            sqlx::query(
                "CREATE TABLE posts (user_id INTEGER, text TEXT, media TEXT, button_text TEXT, button_url TEXT)",
            )
            .execute(&pool)
            .await
            .unwrap();
            sqlx::query("INSERT INTO posts (user_id, text, media) VALUES (5, 'old', 'file-1')")
                .execute(&pool)
                .await
                .unwrap();
            pool.close().await;
        }

        let store = SqliteStore::open(&path).await.unwrap();
        let draft = store.get_draft(OperatorId(5)).await.unwrap().unwrap();
        assert_eq!(draft.text, "old");
        assert_eq!(draft.media, Some(MediaRef::photo("file-1")));
        assert_eq!(draft.button, None);
    }
}
