//! Hammers one SKU's ledger row from many tasks and checks that the reservation invariants hold.
use log::*;
use souk_checkout_engine::{
    test_utils::{
        prepare_env::{prepare_test_env, random_db_path},
        seed::seed_product,
    },
    traits::{CheckoutError, InventoryManagement},
    SqliteDatabase,
};
use souk_common::Fils;
use tokio::runtime::Runtime;

const SKU: &str = "BURST-CHOC";
const INITIAL_STOCK: i64 = 50;
const TASKS: usize = 8;
const OPS_PER_TASK: usize = 25;
const QTY: i64 = 3;

#[test]
fn concurrent_reserve_release_commit_never_oversells() {
    let sys = Runtime::new().unwrap();
    sys.block_on(async move {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 10).await.expect("Error creating database");
        seed_product(&db, SKU, "Burst Pralines", Fils::from_aed(10), INITIAL_STOCK).await;

        info!("🚀️ Spawning {TASKS} tasks x {OPS_PER_TASK} reserve/settle cycles on one SKU");
        let mut handles = Vec::with_capacity(TASKS);
        for task in 0..TASKS {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                let mut commits = 0i64;
                let mut releases = 0i64;
                let mut rejections = 0i64;
                for op in 0..OPS_PER_TASK {
                    match db.reserve_stock(SKU, QTY).await {
                        Ok(level) => {
                            assert!(level.reserved_quantity >= 0, "reserved went negative");
                            assert!(
                                level.reserved_quantity <= level.quantity_in_stock,
                                "reserved {} exceeded on-hand {}",
                                level.reserved_quantity,
                                level.quantity_in_stock
                            );
                            // Settle the reservation either way; alternate deterministically
                            if (task + op) % 2 == 0 {
                                db.commit_stock(SKU, QTY).await.expect("commit should succeed");
                                commits += 1;
                            } else {
                                db.release_stock(SKU, QTY).await.expect("release should succeed");
                                releases += 1;
                            }
                        },
                        Err(CheckoutError::InsufficientStock { .. }) | Err(CheckoutError::OutOfStock { .. }) => {
                            rejections += 1;
                        },
                        Err(e) => panic!("Unexpected error during burst: {e}"),
                    }
                }
                (commits, releases, rejections)
            }));
        }

        let mut total_commits = 0i64;
        let mut total_releases = 0i64;
        let mut total_rejections = 0i64;
        for handle in handles {
            let (commits, releases, rejections) = handle.await.expect("task panicked");
            total_commits += commits;
            total_releases += releases;
            total_rejections += rejections;
        }
        info!("🚀️ Burst complete: {total_commits} commits, {total_releases} releases, {total_rejections} rejections");

        let level = db.fetch_stock_level(SKU).await.expect("ledger query").expect("ledger row");
        // Every successful reservation was settled, so nothing is left reserved, and the on-hand
        // count dropped by exactly the committed quantity.
        assert_eq!(level.reserved_quantity, 0);
        assert_eq!(level.quantity_in_stock, INITIAL_STOCK - total_commits * QTY);
        assert!(level.quantity_in_stock >= 0);
    });
    info!("🚀️ test complete");
}

#[test]
fn double_release_floors_at_zero() {
    let sys = Runtime::new().unwrap();
    sys.block_on(async move {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
        seed_product(&db, "FLOOR-CHOC", "Floor Pralines", Fils::from_aed(10), 5).await;

        db.reserve_stock("FLOOR-CHOC", 2).await.expect("reserve");
        db.release_stock("FLOOR-CHOC", 2).await.expect("release");
        // A second release of the same reservation must not drive the counter negative
        let level = db.release_stock("FLOOR-CHOC", 2).await.expect("double release is defensive");
        assert_eq!(level.reserved_quantity, 0);
        assert_eq!(level.quantity_in_stock, 5);
    });
}

#[test]
fn reservation_is_rejected_once_availability_is_exhausted() {
    let sys = Runtime::new().unwrap();
    sys.block_on(async move {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
        seed_product(&db, "EDGE-CHOC", "Edge Pralines", Fils::from_aed(10), 4).await;

        db.reserve_stock("EDGE-CHOC", 3).await.expect("3 of 4 fits");
        let err = db.reserve_stock("EDGE-CHOC", 2).await.expect_err("only 1 left");
        assert!(matches!(err, CheckoutError::InsufficientStock { available: 1, .. }));
        // The failed attempt must not have moved the counters
        let level = db.fetch_stock_level("EDGE-CHOC").await.expect("query").expect("row");
        assert_eq!(level.reserved_quantity, 3);
        assert_eq!(level.quantity_in_stock, 4);
    });
}
