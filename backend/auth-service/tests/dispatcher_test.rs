/// Event dispatcher fan-out and isolation
use async_trait::async_trait;
use auth_service::events::{EventDispatcher, EventHandler, EventType, IdentityEvent};
use auth_service::{Result, ServiceError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct Counting {
    hits: AtomicUsize,
}

impl Counting {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            hits: AtomicUsize::new(0),
        })
    }

    fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventHandler for Counting {
    fn name(&self) -> &'static str {
        "counting"
    }

    async fn handle(&self, _event: &IdentityEvent) -> Result<()> {
        self.hits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct Failing;

#[async_trait]
impl EventHandler for Failing {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn handle(&self, _event: &IdentityEvent) -> Result<()> {
        Err(ServiceError::Email("smtp down".to_string()))
    }
}

struct Panicking;

#[async_trait]
impl EventHandler for Panicking {
    fn name(&self) -> &'static str {
        "panicking"
    }

    async fn handle(&self, _event: &IdentityEvent) -> Result<()> {
        panic!("handler bug");
    }
}

struct Slow {
    done: AtomicUsize,
}

#[async_trait]
impl EventHandler for Slow {
    fn name(&self) -> &'static str {
        "slow"
    }

    async fn handle(&self, _event: &IdentityEvent) -> Result<()> {
        tokio::time::sleep(Duration::from_millis(200)).await;
        self.done.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn registered() -> IdentityEvent {
    IdentityEvent::UserRegistered {
        email: "a@b.com".to_string(),
        needs_verification: true,
    }
}

#[tokio::test]
async fn test_every_handler_runs_despite_failures() {
    let dispatcher = EventDispatcher::new();
    let first = Counting::new();
    let second = Counting::new();

    dispatcher.register(EventType::UserRegistered, first.clone());
    dispatcher.register(EventType::UserRegistered, Arc::new(Failing));
    dispatcher.register(EventType::UserRegistered, Arc::new(Panicking));
    dispatcher.register(EventType::UserRegistered, second.clone());
    assert_eq!(dispatcher.handler_count(EventType::UserRegistered), 4);

    assert!(dispatcher.dispatch(registered()).is_ok());
    dispatcher.wait_idle().await;

    assert_eq!(first.hits(), 1);
    assert_eq!(second.hits(), 1);
    assert_eq!(dispatcher.in_flight(), 0);
}

#[tokio::test]
async fn test_dispatch_returns_before_handlers_finish() {
    let dispatcher = EventDispatcher::new();
    let slow = Arc::new(Slow {
        done: AtomicUsize::new(0),
    });
    dispatcher.register(EventType::UserRegistered, slow.clone());

    dispatcher.dispatch(registered()).unwrap();
    assert_eq!(slow.done.load(Ordering::SeqCst), 0);
    assert_eq!(dispatcher.in_flight(), 1);

    dispatcher.wait_idle().await;
    assert_eq!(slow.done.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_handlers_outlive_cancelled_publisher() {
    let dispatcher = Arc::new(EventDispatcher::new());
    let slow = Arc::new(Slow {
        done: AtomicUsize::new(0),
    });
    dispatcher.register(EventType::UserRegistered, slow.clone());

    // The publishing request is dropped right after dispatching.
    let publisher = {
        let dispatcher = dispatcher.clone();
        tokio::spawn(async move {
            dispatcher.dispatch(registered()).unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
        })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    publisher.abort();

    dispatcher.wait_idle().await;
    assert_eq!(slow.done.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_register_and_dispatch() {
    let dispatcher = Arc::new(EventDispatcher::new());
    let counter = Counting::new();

    let mut tasks = Vec::new();
    for i in 0..10 {
        let dispatcher = dispatcher.clone();
        let counter = counter.clone();
        tasks.push(tokio::spawn(async move {
            if i % 2 == 0 {
                dispatcher.register(EventType::UserRegistered, counter);
            } else {
                dispatcher.dispatch(registered()).unwrap();
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }
    dispatcher.wait_idle().await;

    assert_eq!(dispatcher.handler_count(EventType::UserRegistered), 5);
    assert!(counter.hits() <= 25);
}
