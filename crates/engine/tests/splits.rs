use chrono::NaiveDate;
use sea_orm::{Database, DatabaseConnection};
use uuid::Uuid;

use engine::{
    Counterparty, Engine, EngineError, MoneyCents, SequentialIds, Split, SplitDirection,
    SplitKind, SplitMode, SplitRequest, TransactionFilter,
};
use migration::MigratorTrait;

async fn fresh_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    db
}

async fn engine_with_db() -> Engine {
    Engine::builder()
        .database(fresh_db().await)
        .ids(SequentialIds::default())
        .build()
}

fn settlement_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 8, 7).unwrap()
}

fn request(creator: &str, total_cents: i64, counterparties: Vec<Counterparty>) -> SplitRequest {
    SplitRequest {
        creator_user_id: creator.to_string(),
        creator_name: "Alice".to_string(),
        title: "Dinner".to_string(),
        total: MoneyCents::new(total_cents),
        date: settlement_date(),
        description: None,
        direction: SplitDirection::CounterpartiesOweCreator,
        mode: SplitMode::Even,
        counterparties,
        expense_category: None,
    }
}

fn party(name: &str, user_id: &str) -> Counterparty {
    Counterparty {
        name: name.to_string(),
        user_id: user_id.to_string(),
        share: None,
    }
}

fn bare_split(title: &str, cents: i64) -> Split {
    Split {
        id: String::new(),
        group_id: "legacy".to_string(),
        user_id: String::new(),
        title: title.to_string(),
        amount: MoneyCents::new(cents),
        kind: SplitKind::Owed,
        counterparty_name: "Bob".to_string(),
        counterparty_id: "USR-BOB".to_string(),
        date: settlement_date(),
        description: None,
        is_mirrored: false,
    }
}

#[tokio::test]
async fn even_settlement_writes_primary_and_mirror() {
    let engine = engine_with_db().await;
    let alice = engine.register("alice", "pw").await.unwrap();
    let bob = engine.register("bob", "pw").await.unwrap();

    let outcome = engine
        .create_split(request(&alice.user_id, 10_00, vec![party("Bob", &bob.user_id)]))
        .await
        .unwrap();

    // Two participants: Bob's share is the first 5.00, Alice keeps the rest.
    assert_eq!(outcome.splits.len(), 1);
    assert_eq!(outcome.splits[0].amount, MoneyCents::new(5_00));
    assert_eq!(outcome.mirrored, 1);

    let alice_splits = engine.owed_splits(&alice.user_id).await.unwrap();
    assert_eq!(alice_splits.len(), 1);
    let primary = &alice_splits[0];
    assert_eq!(primary.kind, SplitKind::Owed);
    assert_eq!(primary.counterparty_id, bob.user_id);
    assert!(!primary.is_mirrored);

    let bob_splits = engine.list_splits(&bob.user_id).await.unwrap();
    assert_eq!(bob_splits.len(), 1);
    let mirror = &bob_splits[0];
    assert_eq!(mirror.kind, SplitKind::Owe);
    assert_eq!(mirror.counterparty_id, alice.user_id);
    assert_eq!(mirror.counterparty_name, "Alice");
    assert_eq!(mirror.group_id, primary.group_id);
    assert_eq!(mirror.amount, primary.amount);
    assert!(mirror.is_mirrored);
}

#[tokio::test]
async fn creator_share_is_never_persisted() {
    let engine = engine_with_db().await;
    let alice = engine.register("alice", "pw").await.unwrap();
    let bob = engine.register("bob", "pw").await.unwrap();
    let carol = engine.register("carol", "pw").await.unwrap();
    let dave = engine.register("dave", "pw").await.unwrap();

    // 10.01 over four participants: 2.51 + 2.50 + 2.50, creator keeps 2.50.
    let outcome = engine
        .create_split(request(
            &alice.user_id,
            10_01,
            vec![
                party("Bob", &bob.user_id),
                party("Carol", &carol.user_id),
                party("Dave", &dave.user_id),
            ],
        ))
        .await
        .unwrap();

    let amounts: Vec<i64> = outcome.splits.iter().map(|s| s.amount.cents()).collect();
    assert_eq!(amounts, vec![251, 250, 250]);
    assert_eq!(engine.owed_splits(&alice.user_id).await.unwrap().len(), 3);
}

#[tokio::test]
async fn unknown_counterparty_fails_before_any_write() {
    let engine = engine_with_db().await;
    let alice = engine.register("alice", "pw").await.unwrap();
    let bob = engine.register("bob", "pw").await.unwrap();

    let err = engine
        .create_split(request(
            &alice.user_id,
            10_00,
            vec![party("Bob", &bob.user_id), party("Ghost", "USR-GHOST")],
        ))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::UnknownCounterparty("USR-GHOST".to_string()));

    assert!(engine.list_splits(&alice.user_id).await.unwrap().is_empty());
    assert!(engine.list_splits(&bob.user_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn direction_selects_polarity() {
    let engine = engine_with_db().await;
    let alice = engine.register("alice", "pw").await.unwrap();
    let bob = engine.register("bob", "pw").await.unwrap();

    let mut req = request(&alice.user_id, 8_00, vec![party("Bob", &bob.user_id)]);
    req.direction = SplitDirection::CreatorOwesCounterparties;
    engine.create_split(req).await.unwrap();

    let alice_splits = engine.owe_splits(&alice.user_id).await.unwrap();
    assert_eq!(alice_splits.len(), 1);
    assert_eq!(alice_splits[0].kind, SplitKind::Owe);

    let bob_splits = engine.owed_splits(&bob.user_id).await.unwrap();
    assert_eq!(bob_splits.len(), 1);
    assert_eq!(bob_splits[0].kind, SplitKind::Owed);
}

#[tokio::test]
async fn manual_shares_must_sum_to_total_within_a_cent() {
    let engine = engine_with_db().await;
    let alice = engine.register("alice", "pw").await.unwrap();
    let bob = engine.register("bob", "pw").await.unwrap();

    // 4.99 + 4.99 = 9.98, two cents short of 10.00: rejected, nothing stored.
    let mut short = request(&alice.user_id, 10_00, vec![party("Bob", &bob.user_id)]);
    short.counterparties[0].share = Some(MoneyCents::new(4_99));
    short.mode = SplitMode::Manual {
        creator_share: MoneyCents::new(4_99),
    };
    let err = engine.create_split(short).await.unwrap_err();
    assert!(matches!(err, EngineError::AmountMismatch(_)));
    assert!(engine.list_splits(&alice.user_id).await.unwrap().is_empty());
    assert!(engine.list_splits(&bob.user_id).await.unwrap().is_empty());

    // One cent off is inside the input-rounding tolerance.
    let mut close = request(&alice.user_id, 10_00, vec![party("Bob", &bob.user_id)]);
    close.counterparties[0].share = Some(MoneyCents::new(6_00));
    close.mode = SplitMode::Manual {
        creator_share: MoneyCents::new(3_99),
    };
    let outcome = engine.create_split(close).await.unwrap();
    assert_eq!(outcome.splits[0].amount, MoneyCents::new(6_00));
}

#[tokio::test]
async fn linked_expense_is_recorded_only_when_creator_paid() {
    let engine = engine_with_db().await;
    let alice = engine.register("alice", "pw").await.unwrap();
    let bob = engine.register("bob", "pw").await.unwrap();

    let mut req = request(&alice.user_id, 30_00, vec![party("Bob", &bob.user_id)]);
    req.expense_category = Some("food".to_string());
    let outcome = engine.create_split(req).await.unwrap();

    let expense = outcome.expense.unwrap();
    assert_eq!(expense.amount, MoneyCents::new(30_00));
    assert_eq!(expense.split_group_id.as_deref(), Some(outcome.group_id.as_str()));

    let entries = engine
        .list_transactions(&alice.user_id, &TransactionFilter::default())
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].description.as_deref(), Some("Split with 1 person"));

    // When the creator owes, no money left their pocket: no expense.
    let mut owing = request(&alice.user_id, 12_00, vec![party("Bob", &bob.user_id)]);
    owing.direction = SplitDirection::CreatorOwesCounterparties;
    owing.expense_category = Some("food".to_string());
    let outcome = engine.create_split(owing).await.unwrap();
    assert!(outcome.expense.is_none());
}

#[tokio::test]
async fn replace_splits_is_exact_and_atomic() {
    let engine = engine_with_db().await;

    engine.replace_splits("USR-A", vec![]).await.unwrap();
    assert!(engine.list_splits("USR-A").await.unwrap().is_empty());

    let replaced = engine
        .replace_splits(
            "USR-A",
            vec![
                bare_split("Dinner", 12_00),
                bare_split("Taxi", 8_50),
                bare_split("Hotel", 120_00),
            ],
        )
        .await
        .unwrap();
    assert_eq!(replaced.len(), 3);
    // Entries without an id got one assigned.
    assert!(replaced.iter().all(|split| !split.id.is_empty()));
    assert_eq!(engine.list_splits("USR-A").await.unwrap().len(), 3);

    // Replacing again never leaves duplicates behind.
    engine
        .replace_splits("USR-A", vec![bare_split("Dinner", 12_00)])
        .await
        .unwrap();
    assert_eq!(engine.list_splits("USR-A").await.unwrap().len(), 1);
}

#[tokio::test]
async fn replace_splits_rolls_back_on_bad_entry() {
    let engine = engine_with_db().await;
    engine
        .replace_splits("USR-A", vec![bare_split("Dinner", 12_00)])
        .await
        .unwrap();

    let err = engine
        .replace_splits(
            "USR-A",
            vec![bare_split("Taxi", 8_50), bare_split("Negative", -1)],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    // The failed replacement left the previous state intact.
    let kept = engine.list_splits("USR-A").await.unwrap();
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].title, "Dinner");
}

#[tokio::test]
async fn delete_split_is_lenient_about_missing_rows_only() {
    let engine = engine_with_db().await;
    let replaced = engine
        .replace_splits("USR-A", vec![bare_split("Dinner", 12_00)])
        .await
        .unwrap();

    // Already-gone rows are fine; a prior partial operation may have
    // removed them.
    engine.delete_split("USR-A", "no-such-id").await.unwrap();

    // Foreign-owned rows are still protected.
    let err = engine
        .delete_split("USR-B", &replaced[0].id)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFoundOrForbidden(_)));
    assert_eq!(engine.list_splits("USR-A").await.unwrap().len(), 1);

    engine.delete_split("USR-A", &replaced[0].id).await.unwrap();
    assert!(engine.list_splits("USR-A").await.unwrap().is_empty());
}

#[tokio::test]
async fn owe_limit_is_advisory_and_strict() {
    let engine = engine_with_db().await;

    engine
        .replace_splits("USR-A", vec![bare_split("Dinner", 10_00)])
        .await
        .unwrap();

    // No limit configured: never over, whatever is outstanding.
    assert!(!engine.is_over_owe_limit("USR-A").await.unwrap());

    engine
        .set_owe_limit("USR-A", Some(MoneyCents::new(10_00)))
        .await
        .unwrap();
    // Equal to the limit is not over it.
    assert!(!engine.is_over_owe_limit("USR-A").await.unwrap());

    engine
        .replace_splits(
            "USR-A",
            vec![bare_split("Dinner", 10_00), bare_split("Taxi", 1)],
        )
        .await
        .unwrap();
    assert!(engine.is_over_owe_limit("USR-A").await.unwrap());
    assert_eq!(
        engine.total_owed("USR-A").await.unwrap(),
        MoneyCents::new(10_01)
    );
}

#[tokio::test]
async fn settlements_refresh_the_fallback_mirror() {
    let snapshot_path =
        std::env::temp_dir().join(format!("splitbook_splits_{}.json", Uuid::new_v4()));
    let cache = engine::FallbackCache::new(snapshot_path);
    let db = fresh_db().await;
    let engine = Engine::builder()
        .database(db)
        .ids(SequentialIds::default())
        .fallback(cache.clone())
        .build();

    let alice = engine.register("alice", "pw").await.unwrap();
    let bob = engine.register("bob", "pw").await.unwrap();
    engine
        .create_split(request(&alice.user_id, 10_00, vec![party("Bob", &bob.user_id)]))
        .await
        .unwrap();

    let mirrored = cache.load_splits(&alice.user_id).unwrap();
    assert_eq!(mirrored.len(), 1);
    assert_eq!(mirrored[0].kind, SplitKind::Owed);
}
