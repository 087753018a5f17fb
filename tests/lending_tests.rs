//! Lending and catalog tests against a live database

mod common;

use chrono::Duration;
use fobms_server::{
    error::AppError,
    models::{
        book::BookQuery,
        borrowing::{BorrowBook, BorrowingDetails, BorrowingQuery, BorrowingStateFilter, BorrowingStatus},
        user::Role,
    },
};

use common::{librarian, setup, today, unique};

fn borrow(user_id: i32, book_id: i32) -> BorrowBook {
    BorrowBook {
        user_id,
        book_id,
        coupon_code: None,
    }
}

/// Ids of the listed borrowings that are in `ids`, in listing order
fn listed(rows: &[BorrowingDetails], ids: &[i32]) -> Vec<i32> {
    rows.iter().map(|b| b.id).filter(|id| ids.contains(id)).collect()
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_overdue_borrower_is_refused() {
    let app = setup().await;
    let book = app.create_book("Fiction", 3).await;
    let other_book = app.create_book("Fiction", 1).await;

    let first = app.insert_user(Role::Member).await;
    let second = app.insert_user(Role::Member).await;
    let late = app.insert_user(Role::Member).await;

    app.services.lending.borrow_book(&first, borrow(first.user_id, book)).await.unwrap();
    app.services.lending.borrow_book(&second, borrow(second.user_id, book)).await.unwrap();
    assert_eq!(app.available(book).await, 1);

    app.insert_overdue_loan(late.user_id, other_book).await;

    let result = app.services.lending.borrow_book(&late, borrow(late.user_id, book)).await;
    assert!(matches!(result, Err(AppError::HasOverdue)));
    assert_eq!(app.available(book).await, 1);
}

#[tokio::test]
#[ignore]
async fn test_borrow_and_return_restore_availability() {
    let app = setup().await;
    let book = app.create_book("Science", 1).await;
    let member = app.insert_user(Role::Member).await;

    let receipt = app
        .services
        .lending
        .borrow_book(&member, borrow(member.user_id, book))
        .await
        .unwrap();
    assert_eq!(receipt.due_date, common::today() + chrono::Duration::days(14));
    assert_eq!(app.available(book).await, 0);

    // last copy is out
    let someone = app.insert_user(Role::Member).await;
    let result = app.services.lending.borrow_book(&someone, borrow(someone.user_id, book)).await;
    assert!(matches!(result, Err(AppError::Unavailable)));

    app.services.lending.return_book(&member, receipt.borrowing_id).await.unwrap();
    assert_eq!(app.available(book).await, 1);

    let again = app.services.lending.return_book(&member, receipt.borrowing_id).await;
    assert!(matches!(again, Err(AppError::NotFound(_))));

    let history = app
        .services
        .lending
        .get_user_borrowings(&member, member.user_id)
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, BorrowingStatus::Returned);
    assert_eq!(history[0].return_date, Some(common::today()));
}

#[tokio::test]
#[ignore]
async fn test_same_book_cannot_be_borrowed_twice() {
    let app = setup().await;
    let book = app.create_book("History", 2).await;
    let member = app.insert_user(Role::Member).await;

    app.services.lending.borrow_book(&member, borrow(member.user_id, book)).await.unwrap();
    let result = app.services.lending.borrow_book(&member, borrow(member.user_id, book)).await;

    assert!(matches!(result, Err(AppError::DuplicateBorrow)));
    assert_eq!(app.available(book).await, 1);
}

#[tokio::test]
#[ignore]
async fn test_book_on_loan_cannot_be_deleted() {
    let app = setup().await;
    let book = app.create_book("Poetry", 1).await;
    let member = app.insert_user(Role::Member).await;

    let receipt = app
        .services
        .lending
        .borrow_book(&member, borrow(member.user_id, book))
        .await
        .unwrap();

    let result = app.services.catalog.delete_book(&librarian(), book).await;
    assert!(matches!(result, Err(AppError::InUse(_))));

    app.services.lending.return_book(&member, receipt.borrowing_id).await.unwrap();
    app.services.catalog.delete_book(&librarian(), book).await.unwrap();

    let gone = app.services.catalog.get_book(book).await;
    assert!(matches!(gone, Err(AppError::NotFound(_))));

    // history survives the catalog entry
    let history = app
        .services
        .lending
        .get_user_borrowings(&member, member.user_id)
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].book_id, None);
}

#[tokio::test]
#[ignore]
async fn test_quantity_edit_keeps_loans() {
    let app = setup().await;
    let book = app.create_book("Travel", 3).await;
    let member = app.insert_user(Role::Member).await;
    app.services.lending.borrow_book(&member, borrow(member.user_id, book)).await.unwrap();

    let current = app.services.catalog.get_book(book).await.unwrap();
    let mut input = fobms_server::models::book::BookInput {
        title: Some(current.title.clone()),
        author: Some(current.author.clone()),
        isbn: Some(current.isbn.clone()),
        category: Some(current.category.clone()),
        quantity: Some(5),
    };
    app.services.catalog.update_book(&librarian(), book, input.clone()).await.unwrap();
    assert_eq!(app.available(book).await, 4);

    input.quantity = Some(0);
    let result = app.services.catalog.update_book(&librarian(), book, input).await;
    assert!(matches!(result, Err(AppError::Validation(_))));
    assert_eq!(app.available(book).await, 4);
}

#[tokio::test]
#[ignore]
async fn test_overdue_listing() {
    let app = setup().await;
    let book = app.create_book("Art", 1).await;
    let member = app.insert_user(Role::Member).await;
    app.insert_overdue_loan(member.user_id, book).await;

    let overdue = app.services.lending.get_overdue_borrowings(&librarian()).await.unwrap();
    let mine = overdue
        .iter()
        .find(|b| b.user_id == member.user_id)
        .expect("overdue loan listed");
    assert_eq!(mine.status, BorrowingStatus::Overdue);
    assert!(mine.user_name.is_some());

    let query = BorrowingQuery {
        status: None,
        overdue: Some(true),
    };
    let filtered = app.services.lending.get_all_borrowings(&librarian(), &query).await.unwrap();
    assert!(filtered.iter().all(|b| b.status == BorrowingStatus::Overdue));

    let denied = app.services.lending.get_overdue_borrowings(&member).await;
    assert!(matches!(denied, Err(AppError::Authorization(_))));
}

#[tokio::test]
#[ignore]
async fn test_listings_are_most_recent_first() {
    let app = setup().await;
    let member = app.insert_user(Role::Member).await;
    let first = app.create_book("Drama", 1).await;
    let second = app.create_book("Drama", 1).await;
    let third = app.create_book("Drama", 1).await;

    let returned = app
        .insert_loan(
            member.user_id,
            first,
            today() - Duration::days(20),
            today() - Duration::days(6),
            Some(today() - Duration::days(10)),
        )
        .await;
    let recent = app
        .insert_loan(
            member.user_id,
            second,
            today() - Duration::days(2),
            today() + Duration::days(12),
            None,
        )
        .await;
    let older = app
        .insert_loan(
            member.user_id,
            third,
            today() - Duration::days(9),
            today() + Duration::days(5),
            None,
        )
        .await;
    let ids = [returned, recent, older];

    let history = app
        .services
        .lending
        .get_user_borrowings(&member, member.user_id)
        .await
        .unwrap();
    assert_eq!(listed(&history, &ids), vec![recent, older, returned]);
    assert_eq!(app.available(first).await, 1);
    assert_eq!(app.available(second).await, 0);

    let all = app
        .services
        .lending
        .get_all_borrowings(&librarian(), &BorrowingQuery::default())
        .await
        .unwrap();
    assert_eq!(listed(&all, &ids), vec![recent, older, returned]);

    let active = BorrowingQuery {
        status: Some(BorrowingStateFilter::Active),
        overdue: None,
    };
    let open = app.services.lending.get_all_borrowings(&librarian(), &active).await.unwrap();
    assert_eq!(listed(&open, &ids), vec![recent, older]);
    assert!(open.iter().all(|b| b.return_date.is_none()));

    let closed = BorrowingQuery {
        status: Some(BorrowingStateFilter::Returned),
        overdue: None,
    };
    let done = app.services.lending.get_all_borrowings(&librarian(), &closed).await.unwrap();
    assert_eq!(listed(&done, &ids), vec![returned]);
    assert!(done.iter().all(|b| b.return_date.is_some()));
}

#[tokio::test]
#[ignore]
async fn test_overdue_listing_soonest_due_first() {
    let app = setup().await;
    let book = app.create_book("Law", 2).await;
    let slightly = app.insert_user(Role::Member).await;
    let badly = app.insert_user(Role::Member).await;

    let late = app
        .insert_loan(
            slightly.user_id,
            book,
            today() - Duration::days(17),
            today() - Duration::days(3),
            None,
        )
        .await;
    let later = app
        .insert_loan(
            badly.user_id,
            book,
            today() - Duration::days(24),
            today() - Duration::days(10),
            None,
        )
        .await;

    let overdue = app.services.lending.get_overdue_borrowings(&librarian()).await.unwrap();
    assert_eq!(listed(&overdue, &[late, later]), vec![later, late]);
    assert!(overdue.windows(2).all(|w| w[0].due_date <= w[1].due_date));
}

#[tokio::test]
#[ignore]
async fn test_borrow_for_unknown_user() {
    let app = setup().await;
    let book = app.create_book("Music", 1).await;

    let result = app.services.lending.borrow_book(&librarian(), borrow(i32::MAX, book)).await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert_eq!(app.available(book).await, 1);
}

#[tokio::test]
#[ignore]
async fn test_catalog_filters() {
    let app = setup().await;
    let tag = unique("Shelf");
    let category = unique("Cat");
    let other_category = format!("{}x", category);

    let zeta = app
        .create_titled_book(&format!("{} Zeta", tag), &format!("Ann {} Lee", tag), &category, 1)
        .await;
    let alpha = app
        .create_titled_book(&format!("{} Alpha", tag), &format!("Bob {} Lee", tag), &category, 1)
        .await;
    let mid = app
        .create_titled_book(&format!("{} Mid", tag), &format!("Ann {} Lee", tag), &other_category, 1)
        .await;

    let search = |query: BookQuery| {
        let catalog = app.services.catalog.clone();
        async move {
            catalog
                .search_books(&query)
                .await
                .unwrap()
                .into_iter()
                .map(|b| b.id)
                .collect::<Vec<_>>()
        }
    };

    let by_title = search(BookQuery {
        title: Some(format!("{} ", tag.to_lowercase())),
        ..Default::default()
    })
    .await;
    assert_eq!(by_title, vec![alpha, mid, zeta]);

    let by_author = search(BookQuery {
        author: Some(format!("ann {} ", tag.to_lowercase())),
        ..Default::default()
    })
    .await;
    assert_eq!(by_author, vec![mid, zeta]);

    let by_category = search(BookQuery {
        category: Some(category.clone()),
        ..Default::default()
    })
    .await;
    assert_eq!(by_category, vec![alpha, zeta]);

    let member = app.insert_user(Role::Member).await;
    app.services.lending.borrow_book(&member, borrow(member.user_id, alpha)).await.unwrap();

    let on_shelf = search(BookQuery {
        title: Some(format!("{} ", tag)),
        available: Some(true),
        ..Default::default()
    })
    .await;
    assert_eq!(on_shelf, vec![mid, zeta]);
}

#[tokio::test]
#[ignore]
async fn test_racing_borrowers_share_one_copy() {
    let app = setup().await;
    let book = app.create_book("Rare", 1).await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let member = app.insert_user(Role::Member).await;
        let lending = app.services.lending.clone();
        handles.push(tokio::spawn(async move {
            lending.borrow_book(&member, borrow(member.user_id, book)).await
        }));
    }

    let mut lent = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => lent += 1,
            Err(err) => assert!(matches!(err, AppError::Unavailable), "unexpected error: {}", err),
        }
    }

    assert_eq!(lent, 1);
    assert_eq!(app.available(book).await, 0);
}
