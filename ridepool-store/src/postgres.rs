use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;
use uuid::Uuid;

use ridepool_core::booking::{Booking, BookingStatus};
use ridepool_core::repository::{BookingRepository, RideRepository, UserRepository};
use ridepool_core::ride::Ride;
use ridepool_core::user::User;
use ridepool_core::{Error, Result};

/// Postgres-backed store. The seat counter is mutated only through the
/// guarded UPDATE, so the database evaluates the conditional write
/// atomically relative to all other writers.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(url)
            .await
            .map_err(db_err)?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| Error::Store(e.to_string()))?;
        info!("connected to postgres and ran migrations");
        Ok(Self { pool })
    }
}

fn db_err(e: sqlx::Error) -> Error {
    Error::Store(e.to_string())
}

#[derive(sqlx::FromRow)]
struct RideRow {
    id: Uuid,
    start_location: String,
    destination: String,
    departure_time: DateTime<Utc>,
    available_seats: i32,
    driver_username: String,
    created_at: DateTime<Utc>,
}

impl From<RideRow> for Ride {
    fn from(r: RideRow) -> Self {
        Ride {
            id: r.id,
            start_location: r.start_location,
            destination: r.destination,
            departure_time: r.departure_time,
            available_seats: r.available_seats,
            driver_username: r.driver_username,
            created_at: r.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    ride_id: Uuid,
    passenger_username: String,
    status: String,
    reminder_sent: bool,
    booked_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = Error;

    fn try_from(r: BookingRow) -> Result<Booking> {
        let status = BookingStatus::parse(&r.status)
            .ok_or_else(|| Error::Store(format!("unknown booking status {:?}", r.status)))?;
        Ok(Booking {
            id: r.id,
            ride_id: r.ride_id,
            passenger_username: r.passenger_username,
            status,
            reminder_sent: r.reminder_sent,
            booked_at: r.booked_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    phone_number: String,
    password_hash: String,
    roles: Vec<String>,
    enabled: bool,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        User {
            id: r.id,
            username: r.username,
            email: r.email,
            phone_number: r.phone_number,
            password_hash: r.password_hash,
            roles: r.roles,
            enabled: r.enabled,
            created_at: r.created_at,
        }
    }
}

#[async_trait]
impl RideRepository for PgStore {
    async fn create_ride(&self, ride: &Ride) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO rides (id, start_location, destination, departure_time, available_seats, driver_username, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(ride.id)
        .bind(&ride.start_location)
        .bind(&ride.destination)
        .bind(ride.departure_time)
        .bind(ride.available_seats)
        .bind(&ride.driver_username)
        .bind(ride.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn get_ride(&self, id: Uuid) -> Result<Option<Ride>> {
        let row: Option<RideRow> = sqlx::query_as("SELECT * FROM rides WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.map(Ride::from))
    }

    async fn search_rides(&self, start: &str, destination: &str) -> Result<Vec<Ride>> {
        let rows: Vec<RideRow> = sqlx::query_as(
            r#"
            SELECT * FROM rides
            WHERE start_location ILIKE '%' || $1 || '%'
              AND destination ILIKE '%' || $2 || '%'
            ORDER BY departure_time
            "#,
        )
        .bind(start)
        .bind(destination)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(rows.into_iter().map(Ride::from).collect())
    }

    async fn list_rides_by_driver(&self, driver_username: &str) -> Result<Vec<Ride>> {
        let rows: Vec<RideRow> =
            sqlx::query_as("SELECT * FROM rides WHERE driver_username = $1 ORDER BY departure_time")
                .bind(driver_username)
                .fetch_all(&self.pool)
                .await
                .map_err(db_err)?;
        Ok(rows.into_iter().map(Ride::from).collect())
    }

    async fn count_active_rides(&self, driver_username: &str, after: DateTime<Utc>) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM rides WHERE driver_username = $1 AND departure_time > $2",
        )
        .bind(driver_username)
        .bind(after)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(count as u64)
    }

    async fn try_decrement_seats(&self, id: Uuid) -> Result<bool> {
        // The single authoritative step: a conditional single-row update
        // the database evaluates atomically. One seat left, N callers,
        // exactly one affected row.
        let result = sqlx::query(
            "UPDATE rides SET available_seats = available_seats - 1 WHERE id = $1 AND available_seats > 0",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(result.rows_affected() == 1)
    }

    async fn increment_seats(&self, id: Uuid) -> Result<()> {
        let result =
            sqlx::query("UPDATE rides SET available_seats = available_seats + 1 WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("ride {id}")));
        }
        Ok(())
    }

    async fn list_all_rides(&self) -> Result<Vec<Ride>> {
        let rows: Vec<RideRow> = sqlx::query_as("SELECT * FROM rides ORDER BY departure_time")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(Ride::from).collect())
    }

    async fn count_rides(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rides")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(count as u64)
    }

    async fn delete_ride(&self, id: Uuid) -> Result<bool> {
        // Bookings cascade via the foreign key.
        let result = sqlx::query("DELETE FROM rides WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl BookingRepository for PgStore {
    async fn create_booking(&self, booking: &Booking) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO bookings (id, ride_id, passenger_username, status, reminder_sent, booked_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(booking.id)
        .bind(booking.ride_id)
        .bind(&booking.passenger_username)
        .bind(booking.status.as_str())
        .bind(booking.reminder_sent)
        .bind(booking.booked_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>> {
        let row: Option<BookingRow> = sqlx::query_as("SELECT * FROM bookings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.map(Booking::try_from).transpose()
    }

    async fn list_bookings_by_passenger(&self, passenger_username: &str) -> Result<Vec<Booking>> {
        let rows: Vec<BookingRow> = sqlx::query_as(
            "SELECT * FROM bookings WHERE passenger_username = $1 ORDER BY booked_at",
        )
        .bind(passenger_username)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(Booking::try_from).collect()
    }

    async fn has_active_booking(&self, ride_id: Uuid, passenger_username: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM bookings
            WHERE ride_id = $1 AND passenger_username = $2 AND status <> 'CANCELLED'
            "#,
        )
        .bind(ride_id)
        .bind(passenger_username)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(count > 0)
    }

    async fn cancel_if_confirmed(&self, id: Uuid) -> Result<bool> {
        // Guarded update, same shape as the seat decrement: the WHERE
        // clause is the atomicity mechanism.
        let result = sqlx::query(
            "UPDATE bookings SET status = 'CANCELLED' WHERE id = $1 AND status = 'CONFIRMED'",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(result.rows_affected() == 1)
    }

    async fn mark_reminder_sent(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("UPDATE bookings SET reminder_sent = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("booking {id}")));
        }
        Ok(())
    }

    async fn list_active_bookings(&self) -> Result<Vec<Booking>> {
        let rows: Vec<BookingRow> =
            sqlx::query_as("SELECT * FROM bookings WHERE status <> 'CANCELLED'")
                .fetch_all(&self.pool)
                .await
                .map_err(db_err)?;
        rows.into_iter().map(Booking::try_from).collect()
    }

    async fn count_bookings(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bookings")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(count as u64)
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn create_user(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, phone_number, password_hash, roles, enabled, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.phone_number)
        .bind(&user.password_hash)
        .bind(&user.roles)
        .bind(user.enabled)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.map(User::from))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.map(User::from))
    }

    async fn username_exists(&self, username: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = $1")
            .bind(username)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(count > 0)
    }

    async fn email_exists(&self, email: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = $1")
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(count > 0)
    }

    async fn set_enabled(&self, id: Uuid, enabled: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET enabled = $1 WHERE id = $2")
            .bind(enabled)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected() == 1)
    }

    async fn count_users(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(count as u64)
    }
}
