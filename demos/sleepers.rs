//! Five hundred actors sleep on empty inboxes until a waker messages each.
//!
//! If idle actors spun, this would burn every core; if a wakeup were lost,
//! it would hang.

use std::time::Duration;

use thread_actors::{Actor, ActorContext, ActorExt, Message, Runtime, RuntimeConfig};

const SLEEPERS: u64 = 500;

struct Sleeper;

impl Actor for Sleeper {
    fn hear(&mut self, _msg: Message, ctx: &mut ActorContext<Self>) {
        ctx.exit();
    }
}

struct Waker;

impl Actor for Waker {
    fn listen(&mut self, ctx: &mut ActorContext<Self>) {
        ctx.wait(Some(Duration::from_micros(100)));
        for address in 1..=SLEEPERS {
            ctx.say(address, Message::new(1));
        }
    }
}

fn main() {
    let runtime = Runtime::new(RuntimeConfig::default().with_stack_size(256 * 1024));

    println!("creating sleepers");
    for address in 1..=SLEEPERS {
        runtime.start(Sleeper.at(address));
    }

    println!("creating waker");
    runtime.start(Waker.at(SLEEPERS + 2));

    runtime.wait_quiescent();
    println!("all sleepers woke");
}
