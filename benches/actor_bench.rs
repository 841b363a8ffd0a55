use criterion::{criterion_group, criterion_main, Criterion};
use thread_actors::{Actor, ActorContext, ActorExt, Mailbox, Message, Runtime};

const COUNT: u32 = 1;

struct CountingActor {
    remaining: u64,
}

impl Actor for CountingActor {
    fn hear(&mut self, _msg: Message, ctx: &mut ActorContext<Self>) {
        self.remaining -= 1;
        if self.remaining == 0 {
            ctx.exit();
        }
    }
}

fn spawn_many(runtime: &Runtime, total: u64) {
    for address in 1..=total {
        runtime.start(CountingActor { remaining: 1 }.at(address));
    }
    for address in 1..=total {
        runtime.post(address, Message::new(COUNT));
    }
    runtime.wait_quiescent();
}

fn flood(runtime: &Runtime, messages: u64) {
    let handle = runtime.start(
        CountingActor {
            remaining: messages,
        }
        .at(1),
    );
    for seq in 0..messages {
        runtime.post(1, Message::scalar(COUNT, seq));
    }
    handle.join().expect("join");
}

fn criterion_benchmarks(c: &mut Criterion) {
    let runtime = Runtime::init();

    c.bench_function("spawn_actors_100", |b| {
        b.iter(|| spawn_many(&runtime, 100));
    });

    c.bench_function("flood_100k", |b| {
        b.iter(|| flood(&runtime, 100_000));
    });

    c.bench_function("mailbox_push_pop_1k", |b| {
        let mailbox = Mailbox::new();
        b.iter(|| {
            for seq in 0..1_000 {
                mailbox.push(Message::scalar(COUNT, seq));
            }
            // SAFETY: the benchmark thread is the only consumer.
            while unsafe { mailbox.pop() }.is_some() {}
        });
    });
}

criterion_group!(benches, criterion_benchmarks);
criterion_main!(benches);
