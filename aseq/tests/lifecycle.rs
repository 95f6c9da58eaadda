use std::time::Duration;

use aseq::{CancellationToken, Error, Sequence};

mod common;

use common::Instrumented;

#[tokio::test]
async fn test_exhaustion_disposes_once() {
    let cancel = CancellationToken::new();
    let source = Instrumented::new(vec![1, 2, 3]);
    let counters = source.counters();
    let sequence = source.sequence().filter(|x| *x != 2).map(|x| x * 10);
    let mut enumerator = sequence.enumerator(cancel);
    let mut seen = Vec::new();
    while enumerator.move_next().await.unwrap() {
        seen.push(*enumerator.current().unwrap());
    }
    assert_eq!(seen, vec![10, 30]);
    for _ in 0..3 {
        enumerator.dispose().await.unwrap();
    }
    assert_eq!(counters.opened(), 1);
    assert_eq!(counters.disposed(), 1);
}

#[tokio::test]
async fn test_early_exit_disposes_upstream() {
    let cancel = CancellationToken::new();
    let source = Instrumented::new(vec![1, 2, 3, 4]);
    let counters = source.counters();
    let sequence = source.sequence();
    assert_eq!(sequence.map(|x| x + 1).first(&cancel).await.unwrap(), 2);
    assert_eq!(sequence.take(2).to_vec(&cancel).await.unwrap(), vec![1, 2]);
    assert!(sequence.contains(&2, &cancel).await.unwrap());
    assert_eq!(counters.opened(), 3);
    assert_eq!(counters.disposed(), 3);
}

#[tokio::test]
async fn test_take_releases_upstream_when_reached() {
    let cancel = CancellationToken::new();
    let source = Instrumented::new(vec![1, 2, 3, 4]);
    let counters = source.counters();
    let mut enumerator = source.sequence().take(2).enumerator(cancel);
    assert!(enumerator.move_next().await.unwrap());
    assert!(enumerator.move_next().await.unwrap());
    // the limit is reached: the upstream is gone before anyone asks for more
    assert_eq!(counters.disposed(), 1);
    assert_eq!(counters.pulled(), 2);
    assert!(!enumerator.move_next().await.unwrap());
    assert_eq!(counters.pulled(), 2);
}

#[tokio::test]
async fn test_upstream_failure_propagates_and_disposes() {
    let cancel = CancellationToken::new();
    let source = Instrumented::new(vec![1, 2, 3]).fail_at(1);
    let counters = source.counters();
    let sequence = source.sequence().map(|x| x * 2).distinct();
    let error = sequence.to_vec(&cancel).await.unwrap_err();
    insta::assert_snapshot!(error.to_string(), @"source failed: failed at 1");
    assert_eq!(counters.disposed(), 1);
}

#[tokio::test]
async fn test_callback_failure_disposes_every_layer() {
    let cancel = CancellationToken::new();
    let left = Instrumented::new(vec![1, 2]);
    let right = Instrumented::new(vec![3, 4]);
    let (left_counters, right_counters) = (left.counters(), right.counters());
    let sequence = left
        .sequence()
        .concat(&right.sequence())
        .try_map(|x| {
            if x == 4 {
                anyhow::bail!("four is right out");
            }
            Ok(x)
        });
    let mut enumerator = sequence.enumerator(cancel);
    for _ in 0..3 {
        assert!(enumerator.move_next().await.unwrap());
    }
    assert!(matches!(enumerator.move_next().await, Err(Error::Callback(_))));
    assert_eq!(left_counters.disposed(), 1);
    assert_eq!(right_counters.disposed(), 1);
    // no resumable faulted state
    assert!(!enumerator.move_next().await.unwrap());
    assert_eq!(right_counters.pulled(), 2);
}

#[tokio::test]
async fn test_failed_release_still_releases_the_other_side() {
    let cancel = CancellationToken::new();
    let first = Instrumented::new(vec![1, 2, 3]).fail_on_dispose();
    let second = Instrumented::new(vec![2]);
    let (first_counters, second_counters) = (first.counters(), second.counters());
    let except = first.sequence().except(&second.sequence());
    let error = except.first(&cancel).await.unwrap_err();
    insta::assert_snapshot!(error.to_string(), @"source failed: dispose failed");
    assert_eq!(first_counters.disposed(), 1);
    assert_eq!(second_counters.disposed(), 1);
}

#[tokio::test]
async fn test_failed_release_on_exhaustion_stops_concat() {
    let cancel = CancellationToken::new();
    let left = Instrumented::new(vec![1, 2]).fail_on_dispose();
    let right = Instrumented::new(vec![3]);
    let (left_counters, right_counters) = (left.counters(), right.counters());
    let sequence = left.sequence().concat(&right.sequence());
    let error = sequence.to_vec(&cancel).await.unwrap_err();
    assert_eq!(error.to_string(), "source failed: dispose failed");
    assert_eq!(left_counters.disposed(), 1);
    // nothing is acquired after the failure
    assert_eq!(right_counters.opened(), 0);
}

#[tokio::test]
async fn test_original_failure_wins_over_failed_release() {
    let cancel = CancellationToken::new();
    let left = Instrumented::new(vec![1, 2]).fail_on_dispose();
    let right = Instrumented::new(vec![3]);
    let (left_counters, right_counters) = (left.counters(), right.counters());
    let sequence = left.sequence().concat(&right.sequence()).try_map(|x| {
        if x == 2 {
            anyhow::bail!("two is not allowed");
        }
        Ok(x)
    });
    let mut enumerator = sequence.enumerator(cancel);
    assert!(enumerator.move_next().await.unwrap());
    let error = enumerator.move_next().await.unwrap_err();
    assert!(matches!(error, Error::Callback(_)));
    assert_eq!(error.to_string(), "callback failed: two is not allowed");
    assert_eq!(left_counters.disposed(), 1);
    assert_eq!(right_counters.opened(), 0);
    assert!(!enumerator.move_next().await.unwrap());
}

#[tokio::test]
async fn test_cancel_before_first_pull_acquires_nothing() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let source = Instrumented::new(vec![1, 2, 3]);
    let counters = source.counters();
    let sequence = source.sequence().filter(|_| true).reverse();
    let mut enumerator = sequence.enumerator(cancel);
    assert!(enumerator.move_next().await.unwrap_err().is_cancelled());
    assert_eq!(counters.opened(), 0);
    assert_eq!(counters.pulled(), 0);
}

#[tokio::test]
async fn test_cancel_mid_traversal_releases_everything() {
    let cancel = CancellationToken::new();
    let source = Instrumented::new(vec![1, 2, 3, 4]);
    let counters = source.counters();
    let sequence = source.sequence().skip(1).map(|x| x * 2);
    let mut enumerator = sequence.enumerator(cancel.clone());
    assert!(enumerator.move_next().await.unwrap());
    assert_eq!(*enumerator.current().unwrap(), 4);
    cancel.cancel();
    assert!(enumerator.move_next().await.unwrap_err().is_cancelled());
    assert_eq!(counters.disposed(), 1);
    assert!(!enumerator.move_next().await.unwrap());
}

#[tokio::test]
async fn test_cancel_interrupts_a_suspended_pull() {
    let cancel = CancellationToken::new();
    let source = Instrumented::new(vec![1, 2, 3]).stall_at(1);
    let counters = source.counters();
    let sequence = source.sequence().filter(|_| true);
    let mut enumerator = sequence.enumerator(cancel.clone());
    assert!(enumerator.move_next().await.unwrap());
    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        canceller.cancel();
    });
    assert!(enumerator.move_next().await.unwrap_err().is_cancelled());
    assert_eq!(counters.disposed(), 1);
}

#[tokio::test]
async fn test_abandoned_pull_counts_as_cancellation() {
    let cancel = CancellationToken::new();
    let source = Instrumented::new(vec![1, 2, 3]).stall_at(0);
    let counters = source.counters();
    let mut enumerator = source.sequence().enumerator(cancel);
    let abandoned = tokio::time::timeout(Duration::from_millis(10), enumerator.move_next()).await;
    assert!(abandoned.is_err());
    assert!(enumerator.move_next().await.unwrap_err().is_cancelled());
    assert_eq!(counters.disposed(), 1);
    assert!(!enumerator.move_next().await.unwrap());
}

#[tokio::test]
async fn test_re_enumeration_is_independent() {
    let cancel = CancellationToken::new();
    let source = Instrumented::new(vec![5, 6, 7]);
    let counters = source.counters();
    let sequence = source.sequence().map(|x| x - 5).distinct();
    let mut first = sequence.enumerator(cancel.clone());
    let mut second = sequence.enumerator(cancel.clone());
    assert!(first.move_next().await.unwrap());
    assert!(first.move_next().await.unwrap());
    assert!(second.move_next().await.unwrap());
    assert_eq!(*first.current().unwrap(), 1);
    assert_eq!(*second.current().unwrap(), 0);
    first.dispose().await.unwrap();
    second.dispose().await.unwrap();
    assert_eq!(counters.opened(), 2);
    assert_eq!(counters.disposed(), 2);
    assert_eq!(
        sequence.to_vec(&cancel).await.unwrap(),
        sequence.to_vec(&cancel).await.unwrap()
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_traversals() {
    let cancel = CancellationToken::new();
    let sequence = Sequence::range(0, 100)
        .unwrap()
        .map_await(|x| async move {
            tokio::task::yield_now().await;
            Ok(x * 2)
        })
        .filter(|x| x % 3 == 0);
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let sequence = sequence.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { sequence.to_vec(&cancel).await })
        })
        .collect();
    let expected: Vec<i64> = (0..100).map(|x| x * 2).filter(|x| x % 3 == 0).collect();
    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), expected);
    }
}
