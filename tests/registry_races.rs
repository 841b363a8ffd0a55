use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Barrier,
};
use std::thread;
use std::time::Duration;

use thread_actors::{
    Actor, ActorContext, ActorExt, Address, Message, Runtime, SendError, SpawnError,
};

struct StopOnMessage;

impl Actor for StopOnMessage {
    fn hear(&mut self, _msg: Message, ctx: &mut ActorContext<Self>) {
        ctx.exit();
    }
}

#[test]
fn concurrent_starts_of_one_address_admit_exactly_one() {
    const CONTENDERS: usize = 8;
    let runtime = Runtime::init();
    let barrier = Arc::new(Barrier::new(CONTENDERS));

    let results: Vec<_> = (0..CONTENDERS)
        .map(|_| {
            let runtime = runtime.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                runtime.try_start(StopOnMessage.at(77))
            })
        })
        .collect::<Vec<_>>()
        .into_iter()
        .map(|contender| contender.join().unwrap())
        .collect();

    let mut winners = Vec::new();
    for result in results {
        match result {
            Ok(handle) => winners.push(handle),
            Err(err) => assert_eq!(err, SpawnError::DuplicateAddress(Address::new(77))),
        }
    }
    assert_eq!(winners.len(), 1);
    assert_eq!(runtime.len(), 1);

    runtime.post(77, Message::new(1));
    for handle in winners {
        handle.join().unwrap();
    }
    assert!(runtime.is_empty());
}

struct Tracked(Arc<AtomicUsize>);

impl Drop for Tracked {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

struct Quitter {
    remaining: u32,
    heard: Arc<AtomicUsize>,
}

impl Actor for Quitter {
    fn hear(&mut self, _msg: Message, ctx: &mut ActorContext<Self>) {
        self.heard.fetch_add(1, Ordering::SeqCst);
        self.remaining -= 1;
        if self.remaining == 0 {
            ctx.exit();
        }
    }
}

#[test]
fn senders_racing_an_exit_never_lose_or_duplicate_messages() {
    const ROUNDS: u64 = 20;
    const SENDERS: usize = 4;
    const QUOTA: u32 = 200;

    let runtime = Runtime::init();
    for round in 1..=ROUNDS {
        let created = Arc::new(AtomicUsize::new(0));
        let dropped = Arc::new(AtomicUsize::new(0));
        let accepted = Arc::new(AtomicUsize::new(0));
        let heard = Arc::new(AtomicUsize::new(0));

        let target = runtime.start(
            Quitter {
                remaining: QUOTA,
                heard: heard.clone(),
            }
            .at(round),
        );

        let senders: Vec<_> = (0..SENDERS)
            .map(|_| {
                let runtime = runtime.clone();
                let created = created.clone();
                let dropped = dropped.clone();
                let accepted = accepted.clone();
                thread::spawn(move || loop {
                    created.fetch_add(1, Ordering::SeqCst);
                    let msg = Message::boxed(1, Tracked(dropped.clone()));
                    match runtime.try_post(round, msg) {
                        Ok(()) => {
                            accepted.fetch_add(1, Ordering::SeqCst);
                        }
                        Err(SendError::NoSuchActor(_)) => break,
                        Err(err) => panic!("unexpected send error: {err}"),
                    }
                })
            })
            .collect();

        for sender in senders {
            sender.join().unwrap();
        }
        target.join().unwrap();

        assert_eq!(heard.load(Ordering::SeqCst), QUOTA as usize);
        assert!(accepted.load(Ordering::SeqCst) >= QUOTA as usize);
        // Handled, drained at exit, or rejected: each message is freed once.
        assert_eq!(
            dropped.load(Ordering::SeqCst),
            created.load(Ordering::SeqCst)
        );
    }
    assert!(runtime.is_empty());
}

struct Blink;

impl Actor for Blink {
    fn listen(&mut self, _ctx: &mut ActorContext<Self>) {}
}

#[test]
fn lookups_survive_address_churn() {
    let runtime = Runtime::init();
    let stop = Arc::new(AtomicBool::new(false));

    let prober = {
        let runtime = runtime.clone();
        let stop = stop.clone();
        thread::spawn(move || {
            let mut delivered = 0u64;
            while !stop.load(Ordering::SeqCst) {
                if runtime.try_post(3, Message::scalar(1, delivered)).is_ok() {
                    delivered += 1;
                }
                let _ = runtime.exists(3);
            }
            delivered
        })
    };

    for _ in 0..200 {
        runtime.start(Blink.at(3)).join().unwrap();
    }
    stop.store(true, Ordering::SeqCst);
    prober.join().unwrap();

    assert!(runtime.wait_quiescent_timeout(Duration::from_secs(5)));
}
