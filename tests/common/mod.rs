//! Shared setup for the database-backed tests.
//!
//! Needs a PostgreSQL instance reachable through `DATABASE_URL`. Tests do not
//! truncate anything; every fixture gets a unique suffix instead so they can
//! run side by side.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{Duration, NaiveDate, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool};

use fobms_server::{
    config::LendingConfig,
    models::{book::BookInput, offer::OfferInput, user::{AuthContext, Role}},
    repository::Repository,
    services::Services,
};

static COUNTER: AtomicU32 = AtomicU32::new(0);

pub struct TestApp {
    pub pool: PgPool,
    pub services: Services,
}

pub async fn setup() -> TestApp {
    dotenvy::dotenv().ok();
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("Failed to connect to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let services = Services::new(Repository::new(pool.clone()), LendingConfig::default());
    TestApp { pool, services }
}

/// Short suffix unique to this process and call
pub fn unique(prefix: &str) -> String {
    let n = COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("{}{}{}", prefix, std::process::id() % 100_000, n)
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub fn librarian() -> AuthContext {
    AuthContext::new(0, Role::Librarian)
}

pub fn admin() -> AuthContext {
    AuthContext::new(0, Role::Admin)
}

impl TestApp {
    pub async fn insert_user(&self, role: Role) -> AuthContext {
        let name = unique("user");
        let id: i32 = sqlx::query_scalar(
            "INSERT INTO users (name, email, role) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&name)
        .bind(format!("{}@example.org", name))
        .bind(role.as_str())
        .fetch_one(&self.pool)
        .await
        .expect("insert user");

        AuthContext::new(id, role)
    }

    pub async fn create_book(&self, category: &str, quantity: i32) -> i32 {
        self.create_titled_book(&unique("Book "), "Test Author", category, quantity)
            .await
    }

    pub async fn create_titled_book(
        &self,
        title: &str,
        author: &str,
        category: &str,
        quantity: i32,
    ) -> i32 {
        let input = BookInput {
            title: Some(title.to_string()),
            author: Some(author.to_string()),
            isbn: Some("978-0-00-0000".to_string()),
            category: Some(category.to_string()),
            quantity: Some(quantity),
        };
        self.services
            .catalog
            .create_book(&librarian(), input)
            .await
            .expect("create book")
    }

    pub async fn available(&self, book_id: i32) -> i32 {
        self.services
            .catalog
            .get_book(book_id)
            .await
            .expect("get book")
            .available
    }

    /// Open loan whose due date has already passed
    pub async fn insert_overdue_loan(&self, user_id: i32, book_id: i32) -> i32 {
        self.insert_loan(
            user_id,
            book_id,
            today() - Duration::days(30),
            today() - Duration::days(16),
            None,
        )
        .await
    }

    /// Borrowing with chosen dates, written straight to the table. An open
    /// loan takes a copy off the shelf like a real borrow does.
    pub async fn insert_loan(
        &self,
        user_id: i32,
        book_id: i32,
        borrow_date: NaiveDate,
        due_date: NaiveDate,
        return_date: Option<NaiveDate>,
    ) -> i32 {
        let mut tx = self.pool.begin().await.expect("begin");
        let id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO borrowings (user_id, book_id, borrow_date, due_date, return_date)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .bind(borrow_date)
        .bind(due_date)
        .bind(return_date)
        .fetch_one(&mut *tx)
        .await
        .expect("insert loan");

        if return_date.is_none() {
            sqlx::query("UPDATE books SET available = available - 1 WHERE id = $1")
                .bind(book_id)
                .execute(&mut *tx)
                .await
                .expect("take copy off the shelf");
        }

        tx.commit().await.expect("commit");
        id
    }
}

/// Offer running from today for thirty days
pub fn offer_input(code: &str, usage_limit: Option<i32>, category: Option<&str>) -> OfferInput {
    OfferInput {
        title: Some(format!("Offer {}", code)),
        description: Some("Test offer".to_string()),
        discount_percent: Some(20),
        coupon_code: Some(code.to_string()),
        usage_limit,
        min_books: Some(1),
        category_restriction: category.map(str::to_string),
        start_date: Some(today()),
        end_date: Some(today() + Duration::days(30)),
        is_active: true,
    }
}
