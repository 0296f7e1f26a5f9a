use async_trait::async_trait;
use common::{PropertyId, UserId};
use domain::{Booking, BookingParts, BookingStatus, Currency, Money};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    BookingId, BookingQuery, Result, StoreError, Version,
    store::{BookingStore, ExpectedState},
};

const COLUMNS: &str = "id, property_id, buyer_id, seller_id, status, amount_minor, currency, visit_date, message, transaction_id, payment_id, payment_signature, created_at, updated_at, last_modified_by, version";

/// Name of the partial unique index guarding active bookings.
const ONE_ACTIVE_INDEX: &str = "bookings_one_active_per_visit";

/// PostgreSQL-backed booking store implementation.
#[derive(Clone)]
pub struct PostgresBookingStore {
    pool: PgPool,
}

impl PostgresBookingStore {
    /// Creates a new PostgreSQL booking store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_booking(row: PgRow) -> Result<Booking> {
        let status: String = row.try_get("status")?;
        let status = status.parse::<BookingStatus>().map_err(StoreError::Decode)?;
        let currency: String = row.try_get("currency")?;
        let currency = Currency::new(&currency).map_err(|e| StoreError::Decode(e.to_string()))?;

        Ok(Booking::from(BookingParts {
            id: BookingId::from_uuid(row.try_get::<Uuid, _>("id")?),
            property_id: PropertyId::from_uuid(row.try_get::<Uuid, _>("property_id")?),
            buyer_id: UserId::from_uuid(row.try_get::<Uuid, _>("buyer_id")?),
            seller_id: UserId::from_uuid(row.try_get::<Uuid, _>("seller_id")?),
            status,
            amount: Money::from_minor(row.try_get("amount_minor")?),
            currency,
            visit_date: row.try_get("visit_date")?,
            message: row.try_get("message")?,
            transaction_id: row.try_get("transaction_id")?,
            payment_id: row.try_get("payment_id")?,
            payment_signature: row.try_get("payment_signature")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            last_modified_by: row
                .try_get::<Option<Uuid>, _>("last_modified_by")?
                .map(UserId::from_uuid),
            version: Version::new(row.try_get("version")?),
        }))
    }
}

#[async_trait]
impl BookingStore for PostgresBookingStore {
    async fn insert(&self, booking: &Booking) -> Result<Booking> {
        let version = Version::first();

        sqlx::query(
            r#"
            INSERT INTO bookings (id, property_id, buyer_id, seller_id, status, amount_minor, currency, visit_date,
                                  message, transaction_id, payment_id, payment_signature, created_at, updated_at,
                                  last_modified_by, version)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(booking.id().as_uuid())
        .bind(booking.property_id().as_uuid())
        .bind(booking.buyer_id().as_uuid())
        .bind(booking.seller_id().as_uuid())
        .bind(booking.status().as_str())
        .bind(booking.amount().minor())
        .bind(booking.currency().as_str())
        .bind(booking.visit_date())
        .bind(booking.message())
        .bind(booking.transaction_id())
        .bind(booking.payment_id())
        .bind(booking.payment_signature())
        .bind(booking.created_at())
        .bind(booking.updated_at())
        .bind(booking.last_modified_by().map(|id| id.as_uuid()))
        .bind(version.as_i64())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e {
                if db_err.constraint() == Some(ONE_ACTIVE_INDEX) {
                    return StoreError::DuplicateActive {
                        buyer_id: booking.buyer_id(),
                        property_id: booking.property_id(),
                        visit_date: booking.visit_date(),
                    };
                }
                if db_err.is_unique_violation() {
                    return StoreError::AlreadyExists(booking.id());
                }
            }
            StoreError::Database(e)
        })?;

        tracing::debug!(booking_id = %booking.id(), "booking inserted");

        let mut stored = booking.clone();
        stored.set_version(version);
        Ok(stored)
    }

    async fn get(&self, id: BookingId) -> Result<Option<Booking>> {
        let sql = format!("SELECT {COLUMNS} FROM bookings WHERE id = $1");
        let row: Option<PgRow> = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_booking).transpose()
    }

    async fn compare_and_swap(
        &self,
        expected: ExpectedState,
        booking: &Booking,
    ) -> Result<Booking> {
        let sql = format!(
            r#"
            UPDATE bookings
            SET status = $4, payment_id = $5, payment_signature = $6, updated_at = $7,
                last_modified_by = $8, version = version + 1
            WHERE id = $1 AND status = $2 AND version = $3
            RETURNING {COLUMNS}
            "#
        );
        let row: Option<PgRow> = sqlx::query(&sql)
            .bind(booking.id().as_uuid())
            .bind(expected.status.as_str())
            .bind(expected.version.as_i64())
            .bind(booking.status().as_str())
            .bind(booking.payment_id())
            .bind(booking.payment_signature())
            .bind(booking.updated_at())
            .bind(booking.last_modified_by().map(|id| id.as_uuid()))
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = row {
            return Self::row_to_booking(row);
        }

        // Nothing matched: either the row is gone or someone else moved it.
        let current = self
            .get(booking.id())
            .await?
            .ok_or(StoreError::NotFound(booking.id()))?;

        tracing::debug!(
            booking_id = %booking.id(),
            expected_version = %expected.version,
            actual_version = %current.version(),
            "compare-and-swap lost"
        );

        Err(StoreError::Conflict {
            booking_id: booking.id(),
            expected_status: expected.status,
            expected_version: expected.version,
            actual_status: current.status(),
            actual_version: current.version(),
        })
    }

    async fn query(&self, query: BookingQuery) -> Result<Vec<Booking>> {
        let mut sql = format!("SELECT {COLUMNS} FROM bookings WHERE 1=1");
        let mut param_count = 0;

        // Build dynamic query
        if query.buyer_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND buyer_id = ${param_count}"));
        }
        if query.seller_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND seller_id = ${param_count}"));
        }
        if query.property_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND property_id = ${param_count}"));
        }
        if query.status.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND status = ${param_count}"));
        }
        if query.active_only {
            sql.push_str(" AND status NOT IN ('CANCELLED', 'REJECTED')");
        }

        sql.push_str(" ORDER BY created_at DESC, id DESC");

        if query.limit.is_some() {
            param_count += 1;
            sql.push_str(&format!(" LIMIT ${param_count}"));
        }
        if query.offset.is_some() {
            param_count += 1;
            sql.push_str(&format!(" OFFSET ${param_count}"));
        }

        let mut sqlx_query = sqlx::query(&sql);

        if let Some(id) = query.buyer_id {
            sqlx_query = sqlx_query.bind(id.as_uuid());
        }
        if let Some(id) = query.seller_id {
            sqlx_query = sqlx_query.bind(id.as_uuid());
        }
        if let Some(id) = query.property_id {
            sqlx_query = sqlx_query.bind(id.as_uuid());
        }
        if let Some(status) = query.status {
            sqlx_query = sqlx_query.bind(status.as_str());
        }
        if let Some(limit) = query.limit {
            sqlx_query = sqlx_query.bind(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        if let Some(offset) = query.offset {
            sqlx_query = sqlx_query.bind(i64::try_from(offset).unwrap_or(i64::MAX));
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_booking).collect()
    }
}
