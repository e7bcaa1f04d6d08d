use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::time::Duration;
use uuid::Uuid;

use crate::models::{
    Candidate, Coordinates, Gender, GenderPreference, Pairing, Preferences, ProfileField,
    QueueEntry, User, UserId, UserStatus,
};
use crate::services::store::{ProfileStore, StoreError};

const PROFILE_COLUMNS: &str = r#"
    user_id, gender, age, location, latitude, longitude, status, partner_id,
    pref_gender, pref_age_min, pref_age_max, radius_km
"#;

/// PostgreSQL-backed profile store
///
/// Holds the three matchmaking tables (`profiles`, `match_queue`, `pairings`).
/// Multi-row transitions lock the affected profile rows with
/// `SELECT ... FOR UPDATE` inside a transaction, ordered by user id.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new store from a connection string and run migrations
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        // Run migrations on startup
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a new store from settings
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
        idle_timeout_secs: Option<u64>,
    ) -> Result<Self, StoreError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            Duration::from_secs(acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }

    /// Lock the given profile rows and return their statuses, ordered by user id
    async fn lock_profiles(
        tx: &mut Transaction<'_, Postgres>,
        ids: &[UserId],
    ) -> Result<Vec<(UserId, UserStatus)>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT user_id, status
            FROM profiles
            WHERE user_id = ANY($1)
            ORDER BY user_id
            FOR UPDATE
            "#,
        )
        .bind(ids)
        .fetch_all(&mut **tx)
        .await?;

        rows.iter()
            .map(|row| -> Result<(UserId, UserStatus), StoreError> {
                Ok((row.try_get("user_id")?, row.try_get("status")?))
            })
            .collect()
    }

    async fn fetch_pairing(
        tx: &mut Transaction<'_, Postgres>,
        user_id: UserId,
        for_update: bool,
    ) -> Result<Option<Pairing>, StoreError> {
        let query = format!(
            "SELECT user_id, partner_id, session_id, paired_at FROM pairings WHERE user_id = $1{}",
            if for_update { " FOR UPDATE" } else { "" }
        );

        let row = sqlx::query(&query)
            .bind(user_id)
            .fetch_optional(&mut **tx)
            .await?;

        row.as_ref().map(pairing_from_row).transpose()
    }
}

/// Reconcile the pairing read before the profile locks with the row read under them
fn confirm_pairing(read: &Pairing, locked: Option<Pairing>) -> Result<Option<Pairing>, StoreError> {
    match locked {
        None => Ok(None),
        Some(pairing) if pairing.partner_id == read.partner_id => Ok(Some(pairing)),
        Some(pairing) => Err(StoreError::Conflict(format!(
            "user {} was re-paired with {} during dissolve",
            pairing.user_id, pairing.partner_id
        ))),
    }
}

fn age_from_db(value: i16) -> Result<u8, StoreError> {
    u8::try_from(value).map_err(|_| StoreError::InvalidData(format!("age out of range: {}", value)))
}

fn radius_from_db(value: i32) -> Result<u16, StoreError> {
    u16::try_from(value)
        .map_err(|_| StoreError::InvalidData(format!("radius out of range: {}", value)))
}

fn coordinates_from_row(row: &PgRow) -> Result<Option<Coordinates>, StoreError> {
    let latitude: Option<f64> = row.try_get("latitude")?;
    let longitude: Option<f64> = row.try_get("longitude")?;
    Ok(latitude
        .zip(longitude)
        .map(|(lat, lon)| Coordinates::new(lat, lon)))
}

fn preferences_from_row(row: &PgRow) -> Result<Preferences, StoreError> {
    Ok(Preferences {
        gender: row.try_get::<GenderPreference, _>("pref_gender")?,
        min_age: age_from_db(row.try_get("pref_age_min")?)?,
        max_age: age_from_db(row.try_get("pref_age_max")?)?,
        radius_km: radius_from_db(row.try_get("radius_km")?)?,
    })
}

fn user_from_row(row: &PgRow) -> Result<User, StoreError> {
    let age: Option<i16> = row.try_get("age")?;
    Ok(User {
        user_id: row.try_get("user_id")?,
        gender: row.try_get::<Gender, _>("gender")?,
        age: age.map(age_from_db).transpose()?,
        location: row.try_get("location")?,
        coordinates: coordinates_from_row(row)?,
        status: row.try_get::<UserStatus, _>("status")?,
        partner_id: row.try_get("partner_id")?,
        preferences: preferences_from_row(row)?,
    })
}

fn queue_entry_from_row(row: &PgRow) -> Result<QueueEntry, StoreError> {
    Ok(QueueEntry {
        user_id: row.try_get("user_id")?,
        gender: row.try_get::<Gender, _>("gender")?,
        age: age_from_db(row.try_get("age")?)?,
        enqueued_at: row.try_get("enqueued_at")?,
    })
}

fn pairing_from_row(row: &PgRow) -> Result<Pairing, StoreError> {
    Ok(Pairing {
        user_id: row.try_get("user_id")?,
        partner_id: row.try_get("partner_id")?,
        session_id: row.try_get("session_id")?,
        paired_at: row.try_get("paired_at")?,
    })
}

#[async_trait]
impl ProfileStore for PostgresStore {
    async fn get_profile(&self, user_id: UserId) -> Result<Option<User>, StoreError> {
        let query = format!("SELECT {} FROM profiles WHERE user_id = $1", PROFILE_COLUMNS);

        let row = sqlx::query(&query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn create_default_profile(
        &self,
        user_id: UserId,
        preferences: Preferences,
    ) -> Result<User, StoreError> {
        let query = r#"
            INSERT INTO profiles (user_id, status, pref_gender, pref_age_min, pref_age_max, radius_km)
            VALUES ($1, 'idle', $2, $3, $4, $5)
            ON CONFLICT (user_id) DO NOTHING
        "#;

        let result = sqlx::query(query)
            .bind(user_id)
            .bind(preferences.gender)
            .bind(i16::from(preferences.min_age))
            .bind(i16::from(preferences.max_age))
            .bind(i32::from(preferences.radius_km))
            .execute(&self.pool)
            .await?;

        if result.rows_affected() > 0 {
            tracing::debug!("Created default profile for user {}", user_id);
        }

        self.get_profile(user_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("Profile not found for user {}", user_id)))
    }

    async fn upsert_profile_field(
        &self,
        user_id: UserId,
        field: ProfileField,
    ) -> Result<(), StoreError> {
        // One fixed statement per field; no column name ever comes from input
        let statement = match &field {
            ProfileField::Gender(_) => "UPDATE profiles SET gender = $2, updated_at = NOW() WHERE user_id = $1",
            ProfileField::Age(_) => "UPDATE profiles SET age = $2, updated_at = NOW() WHERE user_id = $1",
            ProfileField::Location(_) => "UPDATE profiles SET location = $2, updated_at = NOW() WHERE user_id = $1",
            ProfileField::Coordinates(_) => "UPDATE profiles SET latitude = $2, longitude = $3, updated_at = NOW() WHERE user_id = $1",
            ProfileField::PrefGender(_) => "UPDATE profiles SET pref_gender = $2, updated_at = NOW() WHERE user_id = $1",
            ProfileField::PrefAgeMin(_) => "UPDATE profiles SET pref_age_min = $2, updated_at = NOW() WHERE user_id = $1",
            ProfileField::PrefAgeMax(_) => "UPDATE profiles SET pref_age_max = $2, updated_at = NOW() WHERE user_id = $1",
            ProfileField::RadiusKm(_) => "UPDATE profiles SET radius_km = $2, updated_at = NOW() WHERE user_id = $1",
        };

        let query = sqlx::query(statement).bind(user_id);
        let query = match &field {
            ProfileField::Gender(gender) => query.bind(*gender),
            ProfileField::Age(age) => query.bind(i16::from(*age)),
            ProfileField::Location(city) => query.bind(city.clone()),
            ProfileField::Coordinates(coords) => query
                .bind(coords.map(|c| c.latitude))
                .bind(coords.map(|c| c.longitude)),
            ProfileField::PrefGender(pref) => query.bind(*pref),
            ProfileField::PrefAgeMin(age) => query.bind(i16::from(*age)),
            ProfileField::PrefAgeMax(age) => query.bind(i16::from(*age)),
            ProfileField::RadiusKm(radius) => query.bind(i32::from(*radius)),
        };

        let result = query.execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!(
                "Profile not found for user {}",
                user_id
            )));
        }

        tracing::debug!("Updated {} for user {}", field.name(), user_id);
        Ok(())
    }

    async fn insert_queue_entry(&self, entry: &QueueEntry) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let locked = Self::lock_profiles(&mut tx, &[entry.user_id]).await?;
        match locked.first() {
            None => {
                return Err(StoreError::NotFound(format!(
                    "Profile not found for user {}",
                    entry.user_id
                )))
            }
            Some((_, UserStatus::Chatting)) => {
                return Err(StoreError::Conflict(format!(
                    "user {} is chatting and cannot be queued",
                    entry.user_id
                )))
            }
            Some(_) => {}
        }

        // Delete + insert gives the replaced entry a fresh sequence number
        sqlx::query("DELETE FROM match_queue WHERE user_id = $1")
            .bind(entry.user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO match_queue (user_id, gender, age, enqueued_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(entry.user_id)
        .bind(entry.gender)
        .bind(i16::from(entry.age))
        .bind(entry.enqueued_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE profiles SET status = 'searching', updated_at = NOW() WHERE user_id = $1")
            .bind(entry.user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn remove_queue_entry(&self, user_id: UserId) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;
        Self::lock_profiles(&mut tx, &[user_id]).await?;

        let result = sqlx::query("DELETE FROM match_queue WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query("UPDATE profiles SET status = 'idle', updated_at = NOW() WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn is_queued(&self, user_id: UserId) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT 1 FROM match_queue WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn queued_in_city(
        &self,
        city: &str,
        exclude: UserId,
    ) -> Result<Vec<Candidate>, StoreError> {
        let query = r#"
            SELECT q.user_id, u.location, u.latitude, u.longitude, u.gender, u.age,
                   u.pref_gender, u.pref_age_min, u.pref_age_max, u.radius_km
            FROM match_queue q
            JOIN profiles u ON q.user_id = u.user_id
            WHERE u.location = $1 AND q.user_id <> $2 AND u.age IS NOT NULL
            ORDER BY q.seq
        "#;

        let rows = sqlx::query(query)
            .bind(city)
            .bind(exclude)
            .fetch_all(&self.pool)
            .await?;

        let candidates = rows
            .iter()
            .map(|row| -> Result<Candidate, StoreError> {
                Ok(Candidate {
                    user_id: row.try_get("user_id")?,
                    location: row.try_get("location")?,
                    coordinates: coordinates_from_row(row)?,
                    gender: row.try_get::<Gender, _>("gender")?,
                    age: age_from_db(row.try_get("age")?)?,
                    preferences: preferences_from_row(row)?,
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        tracing::debug!("{} queued candidates in {}", candidates.len(), city);
        Ok(candidates)
    }

    async fn queue_entries(&self) -> Result<Vec<QueueEntry>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT user_id, gender, age, enqueued_at
            FROM match_queue
            ORDER BY seq
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(queue_entry_from_row).collect()
    }

    async fn insert_pairing(
        &self,
        a: UserId,
        b: UserId,
        session_id: Uuid,
        paired_at: DateTime<Utc>,
    ) -> Result<Pairing, StoreError> {
        if a == b {
            return Err(StoreError::Conflict(format!("user {} cannot pair with itself", a)));
        }

        let mut tx = self.pool.begin().await?;

        let locked = Self::lock_profiles(&mut tx, &[a, b]).await?;
        for user_id in [a, b] {
            match locked.iter().find(|(id, _)| *id == user_id) {
                Some((_, UserStatus::Searching)) => {}
                Some((_, status)) => {
                    return Err(StoreError::Conflict(format!(
                        "user {} is {:?}, expected searching",
                        user_id, status
                    )))
                }
                None => {
                    return Err(StoreError::Conflict(format!("user {} does not exist", user_id)))
                }
            }
        }

        let pairing = Pairing {
            user_id: a,
            partner_id: b,
            session_id,
            paired_at,
        };

        for link in [pairing, pairing.reciprocal()] {
            sqlx::query(
                r#"
                INSERT INTO pairings (user_id, partner_id, session_id, paired_at)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(link.user_id)
            .bind(link.partner_id)
            .bind(link.session_id)
            .bind(link.paired_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                    StoreError::Conflict(format!("user {} is already paired", link.user_id))
                }
                other => StoreError::SqlxError(other),
            })?;

            sqlx::query(
                r#"
                UPDATE profiles
                SET status = 'chatting', partner_id = $2, updated_at = NOW()
                WHERE user_id = $1
                "#,
            )
            .bind(link.user_id)
            .bind(link.partner_id)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("DELETE FROM match_queue WHERE user_id = ANY($1)")
            .bind(&[a, b][..])
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(pairing)
    }

    async fn remove_pairing(&self, user_id: UserId) -> Result<Option<Pairing>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let Some(read) = Self::fetch_pairing(&mut tx, user_id, false).await? else {
            tx.rollback().await?;
            return Ok(None);
        };

        // Profiles are locked before pairing rows, matching insert_pairing
        let ids = [read.user_id, read.partner_id];
        Self::lock_profiles(&mut tx, &ids).await?;

        let locked = Self::fetch_pairing(&mut tx, user_id, true).await?;
        let Some(pairing) = confirm_pairing(&read, locked)? else {
            tx.rollback().await?;
            return Ok(None);
        };

        sqlx::query("DELETE FROM pairings WHERE user_id = ANY($1)")
            .bind(&ids[..])
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            UPDATE profiles
            SET status = 'idle', partner_id = NULL, updated_at = NOW()
            WHERE user_id = ANY($1)
            "#,
        )
        .bind(&ids[..])
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM match_queue WHERE user_id = ANY($1)")
            .bind(&ids[..])
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(pairing))
    }

    async fn find_pairing(&self, user_id: UserId) -> Result<Option<Pairing>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT user_id, partner_id, session_id, paired_at
            FROM pairings
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(pairing_from_row).transpose()
    }

    async fn count_pairings(&self) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pairings")
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(count / 2).unwrap_or(0))
    }

    /// Health check for the database connection
    async fn health_check(&self) -> Result<bool, StoreError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}
