//! Storage balancing over real directories with fixed free-space readings.

mod common;

use std::sync::Arc;

use common::{FakeProvider, TestEnv};
use mediarr::domain::{MediaKind, TitleId};

fn provider() -> FakeProvider {
    FakeProvider::default()
        .with("Big Show", 1, "Big Show", MediaKind::Show, &[(1, 10)])
        .with("Small Show", 2, "Small Show", MediaKind::Show, &[(1, 10)])
}

#[tokio::test]
async fn test_smallest_title_moves_to_emptier_volume() {
    let env = TestEnv::new(2);
    env.space.set(&env.roots[0], 100);
    env.space.set(&env.roots[1], 90);
    let state = env.state(Arc::new(provider())).await;

    let big = state.catalog.add("Big Show", MediaKind::Show).await.unwrap().into_title();
    let small = state.catalog.add("Small Show", MediaKind::Show).await.unwrap().into_title();
    assert!(big.path.starts_with(&env.roots[0]));
    assert!(small.path.starts_with(&env.roots[0]));
    env.drop_file(&big.path.join("Season 01"), "a.mkv", 20);
    env.drop_file(&small.path.join("Season 01"), "b.mkv", 15);
    // vol0 fills up; its smallest title moves onto the roomier vol1.
    env.space.set(&env.roots[0], 50);
    env.space.set(&env.roots[1], 100);

    let summary = state.balancer.run(MediaKind::Show).await.unwrap();
    assert_eq!(summary.moved, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.bytes_moved, 15);

    let moved = state
        .catalog
        .get(MediaKind::Show, TitleId::new(2))
        .await
        .unwrap();
    assert_eq!(moved.path, env.roots[1].join("Small Show"));
    assert!(moved.path.join("Season 01").join("b.mkv").is_file());
    assert_eq!(moved.season("01").unwrap().path, moved.path.join("Season 01"));

    let stayed = state
        .catalog
        .get(MediaKind::Show, TitleId::new(1))
        .await
        .unwrap();
    assert_eq!(stayed.path, big.path);
}

#[tokio::test]
async fn test_single_root_is_left_alone() {
    let env = TestEnv::new(1);
    let state = env.state(Arc::new(provider())).await;
    state.catalog.add("Big Show", MediaKind::Show).await.unwrap();

    let summary = state.balancer.run(MediaKind::Show).await.unwrap();
    assert_eq!(summary.planned, 0);
}

#[tokio::test]
async fn test_titles_on_roomiest_volume_stay_put() {
    let env = TestEnv::new(2);
    env.space.set(&env.roots[0], 100);
    env.space.set(&env.roots[1], 50);
    let state = env.state(Arc::new(provider())).await;

    let big = state.catalog.add("Big Show", MediaKind::Show).await.unwrap().into_title();
    let small = state.catalog.add("Small Show", MediaKind::Show).await.unwrap().into_title();
    env.drop_file(&big.path.join("Season 01"), "a.mkv", 20);
    env.drop_file(&small.path.join("Season 01"), "b.mkv", 15);

    let summary = state.balancer.run(MediaKind::Show).await.unwrap();
    assert_eq!(summary.planned, 0);
    assert!(big.path.is_dir());
    assert!(small.path.is_dir());
}
