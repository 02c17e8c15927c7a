use chrono::{Duration, TimeZone, Utc};
use techinder::db::{AcceptOutcome, HashParams, Store, UserWriteError, check_password, hash_password};
use techinder::models::{LocationChange, NewProject, NewUser, ProjectPatch, User, UserPatch};
use techinder::services::{IdKind, IdRegistry};

fn cheap_hash() -> HashParams {
    HashParams {
        memory_cost_kib: 1024,
        time_cost: 1,
        parallelism: 1,
    }
}

async fn test_store() -> Store {
    let path = std::env::temp_dir().join(format!("techinder-test-{}.db", uuid::Uuid::new_v4()));
    let url = format!("sqlite:{}", path.display());
    Store::with_pool_options(&url, 5, 1, cheap_hash())
        .await
        .expect("Failed to open test database")
}

async fn add_user(store: &Store, username: &str) -> User {
    store
        .create_user(
            NewUser {
                userid: format!("UID_{username}"),
                username: username.to_string(),
                email: format!("{username}@example.com"),
            },
            UserPatch {
                password: Some("secret".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap()
}

async fn add_project(store: &Store, projectid: &str, author: &User, minutes: i64) -> String {
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
    store
        .create_project(NewProject {
            projectid: projectid.to_string(),
            userid: author.userid.clone(),
            name: format!("{projectid} by {}", author.username),
            fields: "rust".to_string(),
            details: ProjectPatch::default(),
            timestamp: Some(base + Duration::minutes(minutes)),
        })
        .await
        .unwrap()
        .projectid
}

#[test]
fn test_password_hashing() {
    let hash = hash_password("cat", cheap_hash()).unwrap();
    assert_ne!(hash, "cat");
    assert!(check_password(&hash, "cat"));
    assert!(!check_password(&hash, "dog"));
}

#[tokio::test]
async fn test_follow_and_unfollow() {
    let store = test_store().await;
    let john = add_user(&store, "john").await;
    let susan = add_user(&store, "susan").await;

    assert!(!store.is_following(&john.userid, &susan.userid).await.unwrap());
    assert_eq!(store.followed_count(&john.userid).await.unwrap(), 0);

    assert!(store.follow(&john.userid, &susan.userid).await.unwrap());
    assert!(!store.follow(&john.userid, &susan.userid).await.unwrap());
    assert!(store.is_following(&john.userid, &susan.userid).await.unwrap());
    assert_eq!(store.followed_count(&john.userid).await.unwrap(), 1);
    assert_eq!(store.followers_count(&susan.userid).await.unwrap(), 1);

    let followers = store.followers(&susan.userid).await.unwrap();
    assert_eq!(followers.len(), 1);
    assert_eq!(followers[0].username, "john");

    assert!(store.unfollow(&john.userid, &susan.userid).await.unwrap());
    assert!(!store.unfollow(&john.userid, &susan.userid).await.unwrap());
    assert!(!store.is_following(&john.userid, &susan.userid).await.unwrap());
    assert_eq!(store.followers_count(&susan.userid).await.unwrap(), 0);
}

#[tokio::test]
async fn test_followed_projects() {
    let store = test_store().await;
    let john = add_user(&store, "john").await;
    let susan = add_user(&store, "susan").await;
    let mary = add_user(&store, "mary").await;
    let david = add_user(&store, "david").await;

    let p1 = add_project(&store, "PID_1", &john, 1).await;
    let p2 = add_project(&store, "PID_2", &susan, 4).await;
    let p3 = add_project(&store, "PID_3", &mary, 3).await;
    let p4 = add_project(&store, "PID_4", &david, 2).await;

    store.follow(&john.userid, &susan.userid).await.unwrap();
    store.follow(&john.userid, &david.userid).await.unwrap();
    store.follow(&susan.userid, &mary.userid).await.unwrap();
    store.follow(&mary.userid, &david.userid).await.unwrap();

    let ids = |projects: Vec<techinder::models::Project>| {
        projects.into_iter().map(|p| p.projectid).collect::<Vec<_>>()
    };

    assert_eq!(
        ids(store.followed_projects(&john.userid).await.unwrap()),
        vec![p2.clone(), p4.clone(), p1]
    );
    assert_eq!(
        ids(store.followed_projects(&susan.userid).await.unwrap()),
        vec![p2, p3.clone()]
    );
    assert_eq!(
        ids(store.followed_projects(&mary.userid).await.unwrap()),
        vec![p3, p4.clone()]
    );
    assert_eq!(
        ids(store.followed_projects(&david.userid).await.unwrap()),
        vec![p4]
    );

    let page = store.followed_projects_page(&john.userid, 1, 2).await.unwrap();
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.total_items, 3);
    assert!(page.has_next());
}

#[tokio::test]
async fn test_duplicate_user_rejected() {
    let store = test_store().await;
    add_user(&store, "john").await;

    let result = store
        .create_user(
            NewUser {
                userid: "UID_other".to_string(),
                username: "john".to_string(),
                email: "other@example.com".to_string(),
            },
            UserPatch::default(),
        )
        .await;
    assert!(matches!(result, Err(UserWriteError::DuplicateUsername)));

    let result = store
        .create_user(
            NewUser {
                userid: "UID_other".to_string(),
                username: "other".to_string(),
                email: "john@example.com".to_string(),
            },
            UserPatch::default(),
        )
        .await;
    assert!(matches!(result, Err(UserWriteError::DuplicateEmail)));

    assert_eq!(store.user_count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_verify_password() {
    let store = test_store().await;
    add_user(&store, "john").await;

    assert!(store.verify_user_password("john", "secret").await.unwrap().is_some());
    assert!(store.verify_user_password("john", "wrong").await.unwrap().is_none());
    assert!(store.verify_user_password("nobody", "secret").await.unwrap().is_none());
}

#[tokio::test]
async fn test_id_registry() {
    let store = test_store().await;
    let ids = IdRegistry::new(store.clone());

    let first = ids.issue(IdKind::User).await.unwrap();
    let second = ids.issue(IdKind::User).await.unwrap();
    assert!(first.starts_with("UID_"));
    assert_ne!(first, second);

    let channel = ids.sample(IdKind::Channel).await.unwrap();
    assert!(channel.starts_with("CID_"));
    assert!(ids.record(&channel).await.unwrap());
    assert!(!ids.record(&channel).await.unwrap());
    assert!(ids.record("no-separator").await.is_err());
}

#[tokio::test]
async fn test_accept_application() {
    let store = test_store().await;
    let john = add_user(&store, "john").await;
    let susan = add_user(&store, "susan").await;
    let projectid = add_project(&store, "PID_1", &john, 0).await;

    store
        .apply_to_project("AID_1", &susan.userid, &projectid, Some("Let me in"))
        .await
        .unwrap();
    assert!(store.has_applied(&susan.userid, &projectid).await.unwrap());
    assert!(!store.is_member(&susan.userid, &projectid).await.unwrap());

    assert_eq!(
        store.accept_application("AID_1").await.unwrap(),
        AcceptOutcome::Accepted
    );
    assert_eq!(
        store.accept_application("AID_1").await.unwrap(),
        AcceptOutcome::AlreadyAccepted
    );
    assert_eq!(
        store.accept_application("AID_missing").await.unwrap(),
        AcceptOutcome::NotFound
    );
    assert!(store.is_member(&susan.userid, &projectid).await.unwrap());

    let project = store.get_project(&projectid).await.unwrap().unwrap();
    assert_eq!(project.members, Some(1));
    assert_eq!(project.member_names(), vec!["susan".to_string()]);
}

#[tokio::test]
async fn test_likes_toggle() {
    let store = test_store().await;
    let john = add_user(&store, "john").await;
    let susan = add_user(&store, "susan").await;
    let projectid = add_project(&store, "PID_1", &john, 0).await;

    assert_eq!(store.flip_like(&john.userid, &projectid).await.unwrap(), None);
    assert!(store.insert_like("LID_1", &john.userid, &projectid).await.unwrap());
    assert!(!store.insert_like("LID_2", &john.userid, &projectid).await.unwrap());
    assert_eq!(store.like_count(&projectid).await.unwrap(), 1);

    assert_eq!(
        store.flip_like(&john.userid, &projectid).await.unwrap(),
        Some(false)
    );
    assert_eq!(store.like_count(&projectid).await.unwrap(), 0);
    assert_eq!(
        store.flip_like(&john.userid, &projectid).await.unwrap(),
        Some(true)
    );
    assert_eq!(store.like_count(&projectid).await.unwrap(), 1);

    assert_eq!(store.flip_like(&susan.userid, &projectid).await.unwrap(), None);
}

#[tokio::test]
async fn test_user_likes_and_locations_are_related() {
    use sea_orm::{EntityTrait, ModelTrait};
    use techinder::entities::{likes, location, user};

    let store = test_store().await;
    let john = store
        .create_user(
            NewUser {
                userid: "UID_john".to_string(),
                username: "john".to_string(),
                email: "john@example.com".to_string(),
            },
            UserPatch {
                location: Some(LocationChange::Create {
                    locationid: "GID_1".to_string(),
                    lat_long: None,
                }),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let projectid = add_project(&store, "PID_1", &john, 0).await;
    store.insert_like("LID_1", &john.userid, &projectid).await.unwrap();

    let row = user::Entity::find_by_id(john.userid.clone())
        .one(&store.conn)
        .await
        .unwrap()
        .unwrap();
    let liked = row.find_related(likes::Entity).all(&store.conn).await.unwrap();
    assert_eq!(liked.len(), 1);
    assert_eq!(liked[0].projectid, projectid);
    let locations = row.find_related(location::Entity).all(&store.conn).await.unwrap();
    assert_eq!(locations.len(), 1);
    assert_eq!(locations[0].locationid, "GID_1");

    let (_, owner) = likes::Entity::find_by_id("LID_1".to_string())
        .find_also_related(user::Entity)
        .one(&store.conn)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(owner.unwrap().username, "john");
}

#[tokio::test]
async fn test_duplicate_application_rejected() {
    let store = test_store().await;
    let john = add_user(&store, "john").await;
    let susan = add_user(&store, "susan").await;
    let projectid = add_project(&store, "PID_1", &john, 0).await;

    assert!(
        store
            .apply_to_project("AID_1", &susan.userid, &projectid, None)
            .await
            .unwrap()
    );
    assert!(
        !store
            .apply_to_project("AID_2", &susan.userid, &projectid, Some("again"))
            .await
            .unwrap()
    );
    assert!(store.get_application("AID_2").await.unwrap().is_none());
    assert_eq!(store.applications_for_project(&projectid).await.unwrap().len(), 1);

    store.accept_application("AID_1").await.unwrap();
    let project = store.get_project(&projectid).await.unwrap().unwrap();
    assert_eq!(project.members, Some(1));
}

#[tokio::test]
async fn test_huge_page_is_clamped() {
    let store = test_store().await;
    let john = add_user(&store, "john").await;
    for i in 0..3 {
        add_project(&store, &format!("PID_{i}"), &john, i).await;
    }

    let page = store.explore_page(u64::MAX, 2).await.unwrap();
    assert_eq!(page.page, 2);
    assert_eq!(page.items.len(), 1);
    assert!(!page.has_next());
    assert!(page.has_prev());

    let page = store
        .followed_projects_page(&john.userid, u64::MAX, 2)
        .await
        .unwrap();
    assert_eq!(page.page, 2);

    store
        .post_message("MSG_1", &john.userid, "CID_a", "only")
        .await
        .unwrap();
    let page = store.channel_messages("CID_a", u64::MAX, 10).await.unwrap();
    assert_eq!(page.page, 1);
    assert_eq!(page.items.len(), 1);

    let page = store.channel_messages("CID_empty", u64::MAX, 10).await.unwrap();
    assert_eq!(page.page, 1);
    assert!(page.items.is_empty());
}

#[tokio::test]
async fn test_user_and_location_written_together() {
    let store = test_store().await;
    let john = store
        .create_user(
            NewUser {
                userid: "UID_john".to_string(),
                username: "john".to_string(),
                email: "john@example.com".to_string(),
            },
            UserPatch {
                location: Some(LocationChange::Create {
                    locationid: "GID_1".to_string(),
                    lat_long: Some("51.5,-0.1".to_string()),
                }),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(john.locationid.as_deref(), Some("GID_1"));
    let location = store.get_location("GID_1").await.unwrap().unwrap();
    assert_eq!(location.lat_long.as_deref(), Some("51.5,-0.1"));
    assert_eq!(location.userid, john.userid);

    let susan = add_user(&store, "susan").await;
    let result = store
        .update_user(
            &susan.userid,
            UserPatch {
                username: Some("susan2".to_string()),
                location: Some(LocationChange::Create {
                    locationid: "GID_1".to_string(),
                    lat_long: Some("0,0".to_string()),
                }),
                ..Default::default()
            },
        )
        .await;
    assert!(result.is_err());

    let susan = store.get_user(&susan.userid).await.unwrap().unwrap();
    assert_eq!(susan.username, "susan");
    assert_eq!(susan.locationid, None);
    let location = store.get_location("GID_1").await.unwrap().unwrap();
    assert_eq!(location.lat_long.as_deref(), Some("51.5,-0.1"));

    store
        .update_user(
            &john.userid,
            UserPatch {
                location: Some(LocationChange::Update {
                    locationid: "GID_1".to_string(),
                    lat_long: "48.8,2.3".to_string(),
                }),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let location = store.get_location("GID_1").await.unwrap().unwrap();
    assert_eq!(location.lat_long.as_deref(), Some("48.8,2.3"));
}

#[tokio::test]
async fn test_channel_messages_in_order() {
    let store = test_store().await;
    let john = add_user(&store, "john").await;

    store
        .post_message("MSG_1", &john.userid, "CID_a", "first")
        .await
        .unwrap();
    store
        .post_message("MSG_2", &john.userid, "CID_a", "second")
        .await
        .unwrap();
    store
        .post_message("MSG_3", &john.userid, "CID_b", "elsewhere")
        .await
        .unwrap();

    let page = store.channel_messages("CID_a", 1, 10).await.unwrap();
    assert_eq!(page.total_items, 2);
    let contents: Vec<_> = page.items.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["first", "second"]);
    assert_eq!(page.items[0].username, "john");
}

#[tokio::test]
async fn test_misconduct_reports() {
    let store = test_store().await;
    let john = add_user(&store, "john").await;
    let susan = add_user(&store, "susan").await;

    let report = store
        .report_misconduct("MID_1", &john.userid, &susan.userid, "Spam", Some("ads"))
        .await
        .unwrap();
    assert_eq!(report.cause, "Spam");
    assert_eq!(store.reports_against_count(&susan.userid).await.unwrap(), 1);
    assert_eq!(store.reports_by(&john.userid).await.unwrap().len(), 1);
}
