//! Ten actors pass one token around a ring a hundred times, then exit.
//!
//! Run with `cargo run --example ring`; set `RUST_LOG=debug` to watch actors
//! start and exit.

use thread_actors::{Actor, ActorContext, ActorExt, Message, Runtime};
use tracing_subscriber::EnvFilter;

const RING: u32 = 1;
const FIRST: u64 = 1;
const LAST: u64 = 10;
const LAPS: u32 = 100;

#[derive(Default)]
struct Ring {
    count: u32,
}

impl Actor for Ring {
    fn hear(&mut self, msg: Message, ctx: &mut ActorContext<Self>) {
        let next = if ctx.address().get() == LAST {
            FIRST
        } else {
            ctx.address().get() + 1
        };

        if self.count == 0 && next > FIRST {
            ctx.start(Ring::default().at(next));
        }

        self.count += 1;
        if self.count < LAPS || next != FIRST {
            ctx.say(next, msg);
        }
        if self.count == LAPS {
            ctx.exit();
        }
    }

    fn on_exit(&mut self, ctx: &mut ActorContext<Self>) {
        println!("R{}: {}", ctx.address(), self.count);
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let runtime = Runtime::init();
    let first = runtime.alloc_default::<Ring>().with_address(FIRST);
    first.push(Message::new(RING));
    runtime.start(first);

    runtime.wait_quiescent();
    println!("ring finished");
}
