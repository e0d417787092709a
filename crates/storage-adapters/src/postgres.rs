//! # PgStore
//!
//! PostgreSQL implementation of the repository ports. Rows are mapped by hand
//! with `try_get`; enum columns are stored as their lowercase names and parsed
//! back through the domain `FromStr` impls.

use async_trait::async_trait;
use domains::{
    Ad, AdChanges, AdFilter, AdId, AdRepository, AppError, Condition, NewAd, NewProposal, Page,
    PageRequest, Proposal, ProposalFilter, ProposalId, ProposalRepository, ProposalStatus, Result,
    User, UserId, UserRecord, UserRepository,
};
use sqlx::error::{DatabaseError, ErrorKind};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, QueryBuilder, Row};

const AD_COLUMNS: &str =
    "id, user_id, title, description, image_url, category, condition, created_at";
const PROPOSAL_COLUMNS: &str = "id, ad_sender_id, ad_receiver_id, comment, status, created_at";

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(|e| AppError::internal(format!("database connection failed: {e}")))?;
        Ok(Self::new(pool))
    }

    /// Applies the embedded migrations; already-applied ones are skipped.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::internal(format!("migration failed: {e}")))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn map_sqlx(error: sqlx::Error) -> AppError {
    match error.as_database_error().map(DatabaseError::kind) {
        Some(ErrorKind::UniqueViolation) => AppError::Conflict("record already exists".into()),
        Some(ErrorKind::ForeignKeyViolation) => {
            AppError::NotFound("Ad".into(), "referenced record".into())
        }
        _ => {
            tracing::error!(error = %error, "database query failed");
            AppError::internal("database error")
        }
    }
}

fn decode_err(e: impl std::error::Error + Send + Sync + 'static) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(e))
}

fn ad_from_row(row: &PgRow) -> sqlx::Result<Ad> {
    Ok(Ad {
        id: AdId(row.try_get("id")?),
        user_id: UserId(row.try_get("user_id")?),
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        image_url: row.try_get("image_url")?,
        category: row.try_get("category")?,
        condition: row
            .try_get::<String, _>("condition")?
            .parse::<Condition>()
            .map_err(decode_err)?,
        created_at: row.try_get("created_at")?,
    })
}

fn proposal_from_row(row: &PgRow) -> sqlx::Result<Proposal> {
    Ok(Proposal {
        id: ProposalId(row.try_get("id")?),
        ad_sender_id: AdId(row.try_get("ad_sender_id")?),
        ad_receiver_id: AdId(row.try_get("ad_receiver_id")?),
        comment: row.try_get("comment")?,
        status: row
            .try_get::<String, _>("status")?
            .parse::<ProposalStatus>()
            .map_err(decode_err)?,
        created_at: row.try_get("created_at")?,
    })
}

fn user_from_row(row: &PgRow) -> sqlx::Result<User> {
    Ok(User {
        id: UserId(row.try_get("id")?),
        username: row.try_get("username")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Escapes LIKE metacharacters so user input only ever matches literally.
fn like_pattern(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn push_ad_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &AdFilter) {
    qb.push(" WHERE TRUE");
    if let Some(category) = &filter.category {
        qb.push(" AND category = ").push_bind(category.clone());
    }
    if let Some(condition) = filter.condition {
        qb.push(" AND condition = ").push_bind(condition.as_str());
    }
    if let Some(search) = &filter.search {
        let pattern = like_pattern(search);
        qb.push(" AND (title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

#[async_trait]
impl AdRepository for PgStore {
    async fn insert(&self, owner: UserId, ad: NewAd) -> Result<Ad> {
        let sql = format!(
            "INSERT INTO ads (user_id, title, description, image_url, category, condition) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {AD_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(owner.0)
            .bind(ad.title)
            .bind(ad.description)
            .bind(ad.image_url)
            .bind(ad.category)
            .bind(ad.condition.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx)?;
        ad_from_row(&row).map_err(map_sqlx)
    }

    async fn find(&self, id: AdId) -> Result<Option<Ad>> {
        let sql = format!("SELECT {AD_COLUMNS} FROM ads WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;
        row.as_ref().map(ad_from_row).transpose().map_err(map_sqlx)
    }

    async fn list(&self, filter: &AdFilter, page: PageRequest) -> Result<Page<Ad>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM ads");
        push_ad_filter(&mut count, filter);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx)?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {AD_COLUMNS} FROM ads"));
        push_ad_filter(&mut select, filter);
        select
            .push(" ORDER BY created_at, id LIMIT ")
            .push_bind(i64::try_from(page.limit()).unwrap_or(i64::MAX))
            .push(" OFFSET ")
            .push_bind(i64::try_from(page.offset()).unwrap_or(i64::MAX));
        let rows = select
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?;
        let items = rows
            .iter()
            .map(ad_from_row)
            .collect::<sqlx::Result<Vec<_>>>()
            .map_err(map_sqlx)?;

        Ok(Page {
            items,
            total: u64::try_from(total).unwrap_or_default(),
            request: page,
        })
    }

    async fn update(&self, id: AdId, changes: AdChanges) -> Result<Option<Ad>> {
        let (touch_image, image_url) = match changes.image_url {
            Some(value) => (true, value),
            None => (false, None),
        };
        let sql = format!(
            "UPDATE ads SET \
               title = COALESCE($2, title), \
               description = COALESCE($3, description), \
               image_url = CASE WHEN $4 THEN $5 ELSE image_url END, \
               category = COALESCE($6, category), \
               condition = COALESCE($7, condition) \
             WHERE id = $1 RETURNING {AD_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id.0)
            .bind(changes.title)
            .bind(changes.description)
            .bind(touch_image)
            .bind(image_url)
            .bind(changes.category)
            .bind(changes.condition.map(Condition::as_str))
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;
        row.as_ref().map(ad_from_row).transpose().map_err(map_sqlx)
    }

    async fn delete(&self, id: AdId) -> Result<bool> {
        // Dependent proposals go with the ad through ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM ads WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ProposalRepository for PgStore {
    async fn insert(&self, proposal: NewProposal) -> Result<Proposal> {
        let sql = format!(
            "INSERT INTO exchange_proposals (ad_sender_id, ad_receiver_id, comment) \
             VALUES ($1, $2, $3) RETURNING {PROPOSAL_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(proposal.ad_sender_id.0)
            .bind(proposal.ad_receiver_id.0)
            .bind(proposal.comment)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx)?;
        proposal_from_row(&row).map_err(map_sqlx)
    }

    async fn find(&self, id: ProposalId) -> Result<Option<Proposal>> {
        let sql = format!("SELECT {PROPOSAL_COLUMNS} FROM exchange_proposals WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;
        row.as_ref().map(proposal_from_row).transpose().map_err(map_sqlx)
    }

    async fn list_for_participant(
        &self,
        user: UserId,
        filter: &ProposalFilter,
    ) -> Result<Vec<Proposal>> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT p.id, p.ad_sender_id, p.ad_receiver_id, p.comment, p.status, p.created_at \
             FROM exchange_proposals p \
             JOIN ads s ON s.id = p.ad_sender_id \
             JOIN ads r ON r.id = p.ad_receiver_id \
             WHERE (s.user_id = ",
        );
        qb.push_bind(user.0)
            .push(" OR r.user_id = ")
            .push_bind(user.0)
            .push(")");
        if let Some(sender) = filter.ad_sender_id {
            qb.push(" AND p.ad_sender_id = ").push_bind(sender.0);
        }
        if let Some(receiver) = filter.ad_receiver_id {
            qb.push(" AND p.ad_receiver_id = ").push_bind(receiver.0);
        }
        if let Some(status) = filter.status {
            qb.push(" AND p.status = ").push_bind(status.as_str());
        }
        qb.push(" ORDER BY p.created_at, p.id");

        let rows = qb.build().fetch_all(&self.pool).await.map_err(map_sqlx)?;
        rows.iter()
            .map(proposal_from_row)
            .collect::<sqlx::Result<Vec<_>>>()
            .map_err(map_sqlx)
    }

    async fn update_status(
        &self,
        id: ProposalId,
        status: ProposalStatus,
    ) -> Result<Option<Proposal>> {
        let sql = format!(
            "UPDATE exchange_proposals SET status = $2 WHERE id = $1 RETURNING {PROPOSAL_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id.0)
            .bind(status.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;
        row.as_ref().map(proposal_from_row).transpose().map_err(map_sqlx)
    }

    async fn delete(&self, id: ProposalId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM exchange_proposals WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn insert(&self, username: &str, password_hash: &str) -> Result<User> {
        let row = sqlx::query(
            "INSERT INTO users (username, password_hash) VALUES ($1, $2) \
             RETURNING id, username, created_at",
        )
        .bind(username)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match map_sqlx(e) {
            AppError::Conflict(_) => {
                AppError::Conflict(format!("username {username} is already taken"))
            }
            other => other,
        })?;
        user_from_row(&row).map_err(map_sqlx)
    }

    async fn find(&self, id: UserId) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id, username, created_at FROM users WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;
        row.as_ref().map(user_from_row).transpose().map_err(map_sqlx)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>> {
        let row = sqlx::query(
            "SELECT id, username, created_at, password_hash FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;
        let Some(row) = row else {
            return Ok(None);
        };
        let record = user_from_row(&row)
            .and_then(|user| {
                Ok(UserRecord {
                    user,
                    password_hash: row.try_get("password_hash")?,
                })
            })
            .map_err(map_sqlx)?;
        Ok(Some(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("bike"), "%bike%");
        assert_eq!(like_pattern("100%_off\\"), "%100\\%\\_off\\\\%");
    }

    #[test]
    fn test_filter_sql_only_includes_present_fields() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM ads");
        push_ad_filter(&mut qb, &AdFilter::default());
        assert_eq!(qb.sql(), "SELECT COUNT(*) FROM ads WHERE TRUE");

        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM ads");
        push_ad_filter(
            &mut qb,
            &AdFilter {
                category: Some("Спорт".into()),
                condition: Some(Condition::Used),
                search: Some("велосипед".into()),
            },
        );
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM ads WHERE TRUE AND category = $1 AND condition = $2 \
             AND (title ILIKE $3 OR description ILIKE $4)"
        );
    }
}
