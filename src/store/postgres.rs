use anyhow::{anyhow, Context, Result};
use sqlx::{postgres::PgRow, Connection, PgPool, Row};
use tracing::{info_span, Instrument, Span};

use super::{
    CreateUserOutcome, NewUser, ProfileUpdate, SessionRecord, SessionStore, StoredSession, User,
    UserInfo, UserStore,
};
use crate::BoxFuture;

const USER_COLUMNS: &str = r"
    SELECT u.id, u.email, u.nickname, u.slug, u.password,
           i.phone, COALESCE(i.phone_status, 0::smallint) AS phone_status,
           i.motoo, i.introduction
    FROM users u
    LEFT JOIN user_info i ON i.user_id = u.id";

/// Postgres-backed [`UserStore`] and [`SessionStore`].
#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_user(&self, filter: &str, bind: UserFilter<'_>) -> Result<Option<User>> {
        let query = format!("{USER_COLUMNS} {filter}");
        let span = db_span("SELECT", &query);
        let statement = sqlx::query(&query);
        let statement = match bind {
            UserFilter::Id(id) => statement.bind(id),
            UserFilter::Text(value) => statement.bind(value),
        };
        let row = statement
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup user")?;

        Ok(row.as_ref().map(user_from_row))
    }
}

enum UserFilter<'a> {
    Id(i64),
    Text(&'a str),
}

fn db_span(operation: &str, statement: &str) -> Span {
    info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

fn user_from_row(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        email: row.get("email"),
        nickname: row.get("nickname"),
        slug: row.get("slug"),
        password: row.get("password"),
        info: UserInfo {
            phone: row.get("phone"),
            phone_status: row.get("phone_status"),
            motoo: row.get("motoo"),
            introduction: row.get("introduction"),
        },
    }
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

impl UserStore for PgStore {
    fn find_user_by_id(&self, id: i64) -> BoxFuture<'_, Result<Option<User>>> {
        Box::pin(self.fetch_user("WHERE u.id = $1", UserFilter::Id(id)))
    }

    fn find_user_by_slug<'a>(&'a self, slug: &'a str) -> BoxFuture<'a, Result<Option<User>>> {
        Box::pin(self.fetch_user("WHERE u.slug = $1", UserFilter::Text(slug)))
    }

    fn find_user_by_email<'a>(&'a self, email: &'a str) -> BoxFuture<'a, Result<Option<User>>> {
        Box::pin(self.fetch_user("WHERE u.email = $1", UserFilter::Text(email)))
    }

    fn find_user_by_openid<'a>(
        &'a self,
        openid: &'a str,
    ) -> BoxFuture<'a, Result<Option<User>>> {
        Box::pin(self.fetch_user(
            "JOIN user_openids o ON o.user_id = u.id WHERE o.openid = $1",
            UserFilter::Text(openid),
        ))
    }

    fn create_user<'a>(&'a self, user: &'a NewUser) -> BoxFuture<'a, Result<CreateUserOutcome>> {
        Box::pin(async move {
            // One statement so a user never exists without its info row.
            let query = r"
                WITH new_user AS (
                    INSERT INTO users (email, nickname, password)
                    VALUES ($1, $2, $3)
                    ON CONFLICT (email) DO NOTHING
                    RETURNING id
                )
                INSERT INTO user_info (user_id)
                SELECT id FROM new_user
                RETURNING user_id
            ";
            let row = sqlx::query(query)
                .bind(&user.email)
                .bind(&user.nickname)
                .bind(&user.password_hash)
                .fetch_optional(&self.pool)
                .instrument(db_span("INSERT", query))
                .await;

            match row {
                Ok(Some(row)) => Ok(CreateUserOutcome::Created(row.get("user_id"))),
                Ok(None) => Ok(CreateUserOutcome::EmailTaken),
                Err(err) if is_unique_violation(&err) => Ok(CreateUserOutcome::EmailTaken),
                Err(err) => Err(err).context("failed to insert user"),
            }
        })
    }

    fn update_profile<'a>(
        &'a self,
        id: i64,
        update: &'a ProfileUpdate,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let query = r"
                WITH updated AS (
                    UPDATE users
                    SET nickname = $2, slug = COALESCE($3, slug)
                    WHERE id = $1
                    RETURNING id
                )
                INSERT INTO user_info (user_id, phone, phone_status, motoo, introduction)
                SELECT id, $4, $5, $6, $7 FROM updated
                ON CONFLICT (user_id) DO UPDATE
                SET phone = EXCLUDED.phone,
                    phone_status = EXCLUDED.phone_status,
                    motoo = EXCLUDED.motoo,
                    introduction = EXCLUDED.introduction
            ";
            let result = sqlx::query(query)
                .bind(id)
                .bind(&update.nickname)
                .bind(update.slug.as_deref())
                .bind(update.info.phone.as_deref())
                .bind(update.info.phone_status)
                .bind(update.info.motoo.as_deref())
                .bind(update.info.introduction.as_deref())
                .execute(&self.pool)
                .instrument(db_span("UPDATE", query))
                .await;

            match result {
                Ok(done) if done.rows_affected() == 0 => Err(anyhow!("User {id} not found")),
                Ok(_) => Ok(()),
                Err(err) if is_unique_violation(&err) => Err(anyhow!(
                    "The slug \"{}\" is already taken",
                    update.slug.as_deref().unwrap_or_default()
                )),
                Err(err) => Err(err).context("failed to update profile"),
            }
        })
    }

    fn set_password<'a>(&'a self, id: i64, password_hash: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let query = "UPDATE users SET password = $2 WHERE id = $1";
            let done = sqlx::query(query)
                .bind(id)
                .bind(password_hash)
                .execute(&self.pool)
                .instrument(db_span("UPDATE", query))
                .await
                .context("failed to update password")?;

            if done.rows_affected() == 0 {
                return Err(anyhow!("User {id} not found"));
            }
            Ok(())
        })
    }

    fn link_openid<'a>(&'a self, openid: &'a str, user_id: i64) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let query = r"
                INSERT INTO user_openids (openid, user_id)
                VALUES ($1, $2)
                ON CONFLICT (openid) DO UPDATE SET user_id = EXCLUDED.user_id
            ";
            sqlx::query(query)
                .bind(openid)
                .bind(user_id)
                .execute(&self.pool)
                .instrument(db_span("INSERT", query))
                .await
                .context("failed to link openid")?;
            Ok(())
        })
    }

    fn ping(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let acquire_span = info_span!(
                "db.acquire",
                db.system = "postgresql",
                db.operation = "ACQUIRE"
            );
            let mut conn = self
                .pool
                .acquire()
                .instrument(acquire_span)
                .await
                .context("failed to acquire database connection")?;

            let ping_span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
            conn.ping()
                .instrument(ping_span)
                .await
                .context("failed to ping database")
        })
    }
}

impl SessionStore for PgStore {
    fn load_session<'a>(
        &'a self,
        token_hash: &'a [u8],
    ) -> BoxFuture<'a, Result<Option<StoredSession>>> {
        Box::pin(async move {
            let query = r"
                SELECT user_id, remember, data,
                       EXTRACT(EPOCH FROM (expires_at - NOW()))::bigint AS expires_in
                FROM sessions
                WHERE token_hash = $1 AND expires_at > NOW()
            ";
            let row = sqlx::query(query)
                .bind(token_hash)
                .fetch_optional(&self.pool)
                .instrument(db_span("SELECT", query))
                .await
                .context("failed to lookup session")?;

            Ok(row.map(|row| StoredSession {
                record: SessionRecord {
                    user_id: row.get("user_id"),
                    remember: row.get("remember"),
                    data: row.get("data"),
                },
                expires_in: row.get("expires_in"),
            }))
        })
    }

    fn save_session<'a>(
        &'a self,
        token_hash: &'a [u8],
        record: &'a SessionRecord,
        ttl_seconds: i64,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let query = r"
                INSERT INTO sessions (token_hash, user_id, remember, data, expires_at)
                VALUES ($1, $2, $3, $4, NOW() + ($5::bigint * INTERVAL '1 second'))
                ON CONFLICT (token_hash) DO UPDATE
                SET user_id = EXCLUDED.user_id,
                    remember = EXCLUDED.remember,
                    data = EXCLUDED.data,
                    expires_at = EXCLUDED.expires_at
            ";
            sqlx::query(query)
                .bind(token_hash)
                .bind(record.user_id)
                .bind(record.remember)
                .bind(&record.data)
                .bind(ttl_seconds)
                .execute(&self.pool)
                .instrument(db_span("INSERT", query))
                .await
                .context("failed to save session")?;
            Ok(())
        })
    }

    fn touch_session<'a>(&'a self, token_hash: &'a [u8], ttl_seconds: i64) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let query = r"
                UPDATE sessions
                SET expires_at = NOW() + ($2::bigint * INTERVAL '1 second')
                WHERE token_hash = $1
            ";
            sqlx::query(query)
                .bind(token_hash)
                .bind(ttl_seconds)
                .execute(&self.pool)
                .instrument(db_span("UPDATE", query))
                .await
                .context("failed to extend session")?;
            Ok(())
        })
    }

    fn delete_session<'a>(&'a self, token_hash: &'a [u8]) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let query = "DELETE FROM sessions WHERE token_hash = $1";
            sqlx::query(query)
                .bind(token_hash)
                .execute(&self.pool)
                .instrument(db_span("DELETE", query))
                .await
                .context("failed to delete session")?;
            Ok(())
        })
    }

    fn purge_expired_sessions(&self) -> BoxFuture<'_, Result<u64>> {
        Box::pin(async move {
            let query = "DELETE FROM sessions WHERE expires_at <= NOW()";
            let done = sqlx::query(query)
                .execute(&self.pool)
                .instrument(db_span("DELETE", query))
                .await
                .context("failed to purge expired sessions")?;
            Ok(done.rows_affected())
        })
    }
}
