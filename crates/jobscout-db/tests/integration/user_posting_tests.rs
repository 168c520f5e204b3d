use jobscout_core::models::{RemoteLabel, USER_SUBMITTED_SOURCE};
use jobscout_core::traits::{JobPostingStore, UserPostingFilter};
use jobscout_db::{Database, UserPostingRepository};

use crate::integration::common::{insert_posting, setup_test_db};

#[tokio::test]
#[ignore = "requires Docker"]
async fn returns_only_active_user_submitted_newest_first() {
    let (pool, _container) = setup_test_db().await;
    let older = insert_posting(
        &pool,
        "Barista",
        "Cafe Uno",
        "Lisbon",
        "user_submitted",
        "active",
        5,
    )
    .await;
    let newer = insert_posting(
        &pool,
        "Chef",
        "Bistro",
        "Porto",
        "user_submitted",
        "active",
        1,
    )
    .await;
    insert_posting(&pool, "Closed Role", "Cafe Uno", "Lisbon", "user_submitted", "closed", 0).await;
    insert_posting(&pool, "Imported", "Feed", "Lisbon", "import", "active", 0).await;

    let repo = UserPostingRepository::new(pool);
    let jobs = repo
        .find_user_submitted(&UserPostingFilter::default())
        .await
        .unwrap();

    let ids: Vec<_> = jobs.iter().map(|j| j.id.clone()).collect();
    assert_eq!(ids, vec![format!("user-{newer}"), format!("user-{older}")]);
    assert!(jobs.iter().all(|j| j.source.name == USER_SUBMITTED_SOURCE));
    assert_eq!(jobs[0].remote, RemoteLabel::Hybrid);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn filters_by_query_and_location_case_insensitively() {
    let (pool, _container) = setup_test_db().await;
    insert_posting(
        &pool,
        "Rust Engineer",
        "Ferrous",
        "Berlin",
        "user_submitted",
        "active",
        2,
    )
    .await;
    insert_posting(
        &pool,
        "Office Manager",
        "RUSTIC Foods",
        "Munich",
        "user_submitted",
        "active",
        1,
    )
    .await;
    insert_posting(&pool, "Designer", "Pixel", "Berlin", "user_submitted", "active", 0).await;

    let repo = UserPostingRepository::new(pool);

    let by_query = repo
        .find_user_submitted(&UserPostingFilter {
            query: Some("rust".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(by_query.len(), 2);

    let both = repo
        .find_user_submitted(&UserPostingFilter {
            query: Some("rust".into()),
            location: Some("berlin".into()),
            limit: 10,
        })
        .await
        .unwrap();
    assert_eq!(both.len(), 1);
    assert_eq!(both[0].company, "Ferrous");
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn respects_limit_and_reports_health() {
    let (pool, _container) = setup_test_db().await;
    for i in 0..5 {
        insert_posting(
            &pool,
            &format!("Role {i}"),
            "Co",
            "Remote",
            "user_submitted",
            "active",
            i,
        )
        .await;
    }

    let db = Database::from_pool(pool);
    db.health_check().await.unwrap();

    let store: Box<dyn JobPostingStore> = Box::new(db.posting_repo());
    let jobs = store
        .find_user_submitted(&UserPostingFilter {
            limit: 3,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(jobs.len(), 3);
    assert_eq!(jobs[0].title, "Role 0");
    assert!(store.health_check().await.is_ok());
}
