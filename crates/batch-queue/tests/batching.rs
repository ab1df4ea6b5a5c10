use std::time::Duration;

use batch_queue::{create_batcher, BatcherConfig, Culling};
use futures::StreamExt;
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn test_full_batch_is_emitted_before_timeout() {
    let mut batcher = create_batcher(10, Culling::None, Duration::from_secs(2)).unwrap();
    let mut batches = batcher.batches().unwrap();
    let started = Instant::now();

    for i in 0..10 {
        batcher.add(i).await.unwrap();
    }

    let batch = batches.recv().await.unwrap();
    assert_eq!(batch, (0..10).collect::<Vec<_>>());
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn test_overflowing_item_is_flushed_after_timeout() {
    let mut batcher = create_batcher(10, Culling::None, Duration::from_secs(2)).unwrap();
    let mut batches = batcher.batches().unwrap();

    for i in 0..10 {
        batcher.add(i).await.unwrap();
    }
    assert_eq!(batches.recv().await.unwrap().len(), 10);

    let started = Instant::now();
    for i in 0..11 {
        batcher.add(i).await.unwrap();
    }

    assert_eq!(batches.recv().await.unwrap(), (0..10).collect::<Vec<_>>());
    assert!(started.elapsed() < Duration::from_secs(2));

    assert_eq!(batches.recv().await.unwrap(), vec![10]);
    assert!(started.elapsed() >= Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn test_partial_batch_is_flushed_after_timeout() {
    let mut batcher = create_batcher(10, Culling::None, Duration::from_millis(500)).unwrap();
    let mut batches = batcher.batches().unwrap();
    let started = Instant::now();

    for i in 0..3 {
        batcher.add(i).await.unwrap();
    }

    assert_eq!(batches.recv().await.unwrap(), vec![0, 1, 2]);
    assert!(started.elapsed() >= Duration::from_millis(500));
}

#[tokio::test(start_paused = true)]
async fn test_timer_restarts_for_every_batch() {
    let mut batcher = create_batcher(10, Culling::None, Duration::from_secs(1)).unwrap();
    let mut batches = batcher.batches().unwrap();

    batcher.add("a").await.unwrap();
    assert_eq!(batches.recv().await.unwrap(), vec!["a"]);

    // Idle time between batches must not shorten the next window.
    tokio::time::sleep(Duration::from_secs(5)).await;

    let started = Instant::now();
    batcher.add("b").await.unwrap();
    tokio::time::sleep(Duration::from_millis(900)).await;
    batcher.add("c").await.unwrap();

    assert_eq!(batches.recv().await.unwrap(), vec!["b", "c"]);
    assert!(started.elapsed() >= Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn test_add_waits_while_intake_is_full() {
    let mut batcher = create_batcher(2, Culling::None, Duration::from_secs(1)).unwrap();
    let mut batches = batcher.batches().unwrap();
    let sender = batcher.sender();

    // One batch waits for the consumer, the intake queue holds another two.
    for i in 0..4 {
        batcher.add(i).await.unwrap();
        tokio::task::yield_now().await;
    }

    let blocked = tokio::spawn(async move { sender.add(4).await });
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(!blocked.is_finished());

    assert_eq!(batches.recv().await.unwrap(), vec![0, 1]);
    blocked.await.unwrap().unwrap();

    assert_eq!(batches.recv().await.unwrap(), vec![2, 3]);
    assert_eq!(batches.recv().await.unwrap(), vec![4]);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_producers_share_one_batch() {
    let mut batcher = create_batcher(10, Culling::None, Duration::from_secs(2)).unwrap();
    let mut batches = batcher.batches().unwrap();

    let producers = (0..2)
        .map(|producer| {
            let sender = batcher.sender();
            tokio::spawn(async move {
                for seq in 0..5 {
                    sender.add((producer, seq)).await.unwrap();
                }
            })
        })
        .collect::<Vec<_>>();

    let started = Instant::now();
    let batch = batches.recv().await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(batch.len(), 10);

    for producer in 0..2 {
        let seqs = batch
            .iter()
            .filter(|(p, _)| *p == producer)
            .map(|(_, seq)| *seq)
            .collect::<Vec<_>>();
        assert_eq!(seqs, vec![0, 1, 2, 3, 4]);
    }

    for producer in producers {
        producer.await.unwrap();
    }
}

#[tokio::test(start_paused = true)]
async fn test_single_producer_order_is_preserved() {
    let mut batcher = create_batcher(10, Culling::None, Duration::from_millis(100)).unwrap();
    let batches = batcher.batches().unwrap();
    let sender = batcher.sender();

    let producer = tokio::spawn(async move {
        for i in 0..25 {
            sender.add(i).await.unwrap();
        }
    });

    let received = batches.take(3).collect::<Vec<_>>().await;
    producer.await.unwrap();

    assert_eq!(
        received.iter().map(Vec::len).collect::<Vec<_>>(),
        vec![10, 10, 5]
    );
    assert_eq!(received.concat(), (0..25).collect::<Vec<_>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_batches_are_bounded_and_nothing_is_lost() {
    let config = BatcherConfig::builder()
        .with_max_batch_size(7)
        .with_flush_timeout(Duration::from_millis(5))
        .build();
    let mut batcher = batch_queue::Batcher::new(config).unwrap();
    let mut batches = batcher.batches().unwrap();

    let consumer = tokio::spawn(async move {
        let mut received = Vec::new();
        while let Some(batch) = batches.recv().await {
            assert!(!batch.is_empty());
            assert!(batch.len() <= 7);
            received.extend(batch);
        }
        received
    });

    let producers = (0..4u64)
        .map(|producer| {
            let sender = batcher.sender();
            tokio::spawn(async move {
                for seq in 0..250u64 {
                    sender.add(producer * 1_000 + seq).await.unwrap();
                    if seq % 50 == 0 {
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            })
        })
        .collect::<Vec<_>>();

    for producer in producers {
        producer.await.unwrap();
    }
    batcher.shutdown().await.unwrap();

    let mut received = consumer.await.unwrap();
    received.sort_unstable();
    let mut expected = (0..4u64)
        .flat_map(|producer| (0..250u64).map(move |seq| producer * 1_000 + seq))
        .collect::<Vec<_>>();
    expected.sort_unstable();
    assert_eq!(received, expected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_blocking_producer_and_consumer() {
    let mut batcher = create_batcher(5, Culling::None, Duration::from_secs(1)).unwrap();
    let mut batches = batcher.batches().unwrap();
    let sender = batcher.sender();

    let producer = std::thread::spawn(move || {
        for i in 0..10 {
            sender.blocking_add(i).unwrap();
        }
    });
    let consumer = std::thread::spawn(move || {
        let first = batches.blocking_recv().unwrap();
        let second = batches.blocking_recv().unwrap();
        (first, second)
    });

    producer.join().unwrap();
    let (first, second) = consumer.join().unwrap();
    assert_eq!(first, vec![0, 1, 2, 3, 4]);
    assert_eq!(second, vec![5, 6, 7, 8, 9]);
}

#[tokio::test(start_paused = true)]
async fn test_reserved_culling_policies_keep_every_item() {
    for culling in [Culling::First, Culling::Last] {
        let mut batcher = create_batcher(3, culling, Duration::from_millis(100)).unwrap();
        let mut batches = batcher.batches().unwrap();

        for i in 0..4 {
            batcher.add(i).await.unwrap();
        }

        assert_eq!(batches.recv().await.unwrap(), vec![0, 1, 2]);
        assert_eq!(batches.recv().await.unwrap(), vec![3]);
    }
}
