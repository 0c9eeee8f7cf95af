mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::Recorder;
use pullvisor::memory::{MemoryMessage, MemoryQueue};
use pullvisor::{
    Consumer, ConsumerConfig, HandlerError, HandlerFn, HandlerRef, Message, StopCause, Subscribe,
};
use tokio::time;

fn consumer(queue: &MemoryQueue, handler: HandlerRef<MemoryMessage>) -> Consumer<MemoryQueue> {
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(Recorder::default())];
    Consumer::builder(queue.clone(), common::target(), handler)
        .with_config(ConsumerConfig {
            workers: 1,
            fetch_timeout: Duration::from_secs(1),
            ..ConsumerConfig::default()
        })
        .with_subscribers(subs)
        .build()
}

#[tokio::test(start_paused = true)]
async fn test_failed_message_is_redelivered_to_next_consumer() {
    let queue = MemoryQueue::with_ack_wait("TEST-STREAM", Duration::from_secs(5));
    for i in 1..=5 {
        queue.publish(format!("m{i}")).await;
    }

    let failing: HandlerRef<MemoryMessage> = HandlerFn::arc("first-attempt-fails", |m: &MemoryMessage| {
        let (sequence, delivered) = (m.sequence(), m.delivered());
        async move {
            if sequence == 3 && delivered == 1 {
                return Err(HandlerError::new("transient"));
            }
            Ok(())
        }
    });
    let mut first = consumer(&queue, failing);
    first.start().await.unwrap();
    time::timeout(Duration::from_secs(5), first.cancelled())
        .await
        .expect("handler error stops the first consumer");
    first.close().await;

    assert!(first.cause().is_some_and(StopCause::is_failure));
    assert!(!queue.acked().await.contains(&3));

    let seen = Arc::new(Mutex::new(Vec::new()));
    let recording: HandlerRef<MemoryMessage> = {
        let seen = seen.clone();
        HandlerFn::arc("record", move |m: &MemoryMessage| {
            seen.lock().unwrap().push((m.sequence(), m.delivered()));
            async { Ok::<_, HandlerError>(()) }
        })
    };
    let mut second = consumer(&queue, recording);
    second.start().await.unwrap();
    time::sleep(Duration::from_secs(30)).await;
    second.close().await;

    let mut acked = queue.acked().await;
    acked.sort_unstable();
    assert_eq!(acked, vec![1, 2, 3, 4, 5]);
    assert!(seen.lock().unwrap().contains(&(3, 2)), "message 3 came back with delivered=2");
    assert_eq!(queue.pending().await, 0);
    assert_eq!(queue.in_flight().await, 0);
}
