//! PostgreSQL adapter tests.
//!
//! Each test creates its own database; run with a server on `DATABASE_URL`
//! (default `localhost:5433`) and `cargo test -- --ignored`.

mod common;

use auth::InvitationToken;
use chrono::Duration;
use chrono::Utc;
use common::TestDb;
use planner_service::domain::user::models::Credential;
use planner_service::domain::user::models::EmailAddress;
use planner_service::domain::user::models::Invitation;
use planner_service::domain::user::models::PersonName;
use planner_service::domain::user::models::User;
use planner_service::domain::user::models::UserId;
use planner_service::domain::user::models::Username;
use planner_service::domain::user::ports::FollowerRepository;
use planner_service::domain::user::ports::UserRepository;
use planner_service::repositories::follower::PostgresFollowerRepository;
use planner_service::repositories::user::PostgresUserRepository;
use planner_service::user::errors::UserError;

fn new_user(username: &str, email: &str) -> User {
    User {
        id: UserId::new(),
        username: Username::new(username.to_string()).unwrap(),
        email: EmailAddress::new(email.to_string()).unwrap(),
        first_name: PersonName::new("A".to_string()).unwrap(),
        last_name: PersonName::new("L".to_string()).unwrap(),
        bio: String::new(),
        credential: Credential::from_stored_hash("$argon2id$v=19$m=8,t=1,p=1$c2FsdA$aGFzaA".to_string()),
        is_active: false,
        created_at: Utc::now(),
    }
}

fn invitation_for(user: &User, token: &InvitationToken, ttl: Duration) -> Invitation {
    Invitation {
        digest: token.digest(),
        user_id: user.id,
        expires_at: Utc::now() + ttl,
    }
}

async fn count(db: &TestDb, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(&db.pool)
        .await
        .unwrap()
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_create_and_activate() {
    let db = TestDb::new().await;
    let repository = PostgresUserRepository::new(db.pool.clone());

    let user = new_user("alice", "a@x.com");
    let token = InvitationToken::generate();
    repository
        .create_and_invite(user.clone(), invitation_for(&user, &token, Duration::hours(72)))
        .await
        .unwrap();

    assert!(repository.find_active_by_id(&user.id).await.unwrap().is_none());

    let activated = repository.activate(&token.digest(), Utc::now()).await.unwrap();
    assert_eq!(activated, user.id);
    assert_eq!(count(&db, "user_invitations").await, 0);

    let found = repository.find_active_by_email("a@x.com").await.unwrap().unwrap();
    assert_eq!(found.id, user.id);
    assert!(found.is_active);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_duplicate_username_and_email() {
    let db = TestDb::new().await;
    let repository = PostgresUserRepository::new(db.pool.clone());

    let first = new_user("alice", "a@x.com");
    repository
        .create_and_invite(
            first.clone(),
            invitation_for(&first, &InvitationToken::generate(), Duration::hours(1)),
        )
        .await
        .unwrap();

    let same_name = new_user("alice", "b@x.com");
    let result = repository
        .create_and_invite(
            same_name.clone(),
            invitation_for(&same_name, &InvitationToken::generate(), Duration::hours(1)),
        )
        .await;
    assert!(matches!(result, Err(UserError::UsernameAlreadyExists(_))));

    let same_email = new_user("bob", "a@x.com");
    let result = repository
        .create_and_invite(
            same_email.clone(),
            invitation_for(&same_email, &InvitationToken::generate(), Duration::hours(1)),
        )
        .await;
    assert!(matches!(result, Err(UserError::EmailAlreadyExists(_))));

    assert_eq!(count(&db, "users").await, 1);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_failed_invitation_insert_rolls_back_user() {
    let db = TestDb::new().await;
    let repository = PostgresUserRepository::new(db.pool.clone());
    let token = InvitationToken::generate();

    let first = new_user("alice", "a@x.com");
    repository
        .create_and_invite(first.clone(), invitation_for(&first, &token, Duration::hours(1)))
        .await
        .unwrap();

    // Reusing the digest makes the second insert of the unit fail.
    let second = new_user("bob", "b@x.com");
    let result = repository
        .create_and_invite(second.clone(), invitation_for(&second, &token, Duration::hours(1)))
        .await;

    assert!(matches!(result, Err(UserError::DatabaseError(_))));
    assert_eq!(count(&db, "users").await, 1);
    assert!(repository
        .find_active_by_email("b@x.com")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_expired_invitation_is_not_found_and_mutates_nothing() {
    let db = TestDb::new().await;
    let repository = PostgresUserRepository::new(db.pool.clone());

    let user = new_user("alice", "a@x.com");
    let token = InvitationToken::generate();
    repository
        .create_and_invite(user.clone(), invitation_for(&user, &token, Duration::seconds(-1)))
        .await
        .unwrap();

    let result = repository.activate(&token.digest(), Utc::now()).await;
    assert!(matches!(result, Err(UserError::InvitationNotFound)));

    let unknown = InvitationToken::generate();
    let result = repository.activate(&unknown.digest(), Utc::now()).await;
    assert!(matches!(result, Err(UserError::InvitationNotFound)));

    let active: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE is_active")
        .fetch_one(&db.pool)
        .await
        .unwrap();
    assert_eq!(active, 0);
    assert_eq!(count(&db, "user_invitations").await, 1);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_delete_removes_invitations() {
    let db = TestDb::new().await;
    let repository = PostgresUserRepository::new(db.pool.clone());

    let user = new_user("alice", "a@x.com");
    repository
        .create_and_invite(
            user.clone(),
            invitation_for(&user, &InvitationToken::generate(), Duration::hours(1)),
        )
        .await
        .unwrap();

    repository.delete(&user.id).await.unwrap();
    assert_eq!(count(&db, "users").await, 0);
    assert_eq!(count(&db, "user_invitations").await, 0);

    let result = repository.delete(&user.id).await;
    assert!(matches!(result, Err(UserError::NotFound(_))));
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_follow_constraints() {
    let db = TestDb::new().await;
    let users = PostgresUserRepository::new(db.pool.clone());
    let followers = PostgresFollowerRepository::new(db.pool.clone());

    let alice = new_user("alice", "a@x.com");
    let bob = new_user("bob", "b@x.com");
    for user in [&alice, &bob] {
        users
            .create_and_invite(
                user.clone(),
                invitation_for(user, &InvitationToken::generate(), Duration::hours(1)),
            )
            .await
            .unwrap();
    }

    followers.follow(&bob.id, &alice.id).await.unwrap();
    assert!(matches!(
        followers.follow(&bob.id, &alice.id).await,
        Err(UserError::AlreadyFollowing(_))
    ));
    assert!(matches!(
        followers.follow(&UserId::new(), &alice.id).await,
        Err(UserError::NotFound(_))
    ));

    followers.unfollow(&bob.id, &alice.id).await.unwrap();
    followers.unfollow(&bob.id, &alice.id).await.unwrap();
    assert_eq!(count(&db, "followers").await, 0);
}
