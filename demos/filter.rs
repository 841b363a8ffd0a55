//! One actor with a filter that admits only BAZ until BAZ arrives.
//!
//! Expected output: baz, foo, bar.

use thread_actors::{Actor, ActorContext, Filter, Message, Runtime};

const FOO: u32 = 1;
const BAR: u32 = 2;
const BAZ: u32 = 3;

struct Picky;

impl Actor for Picky {
    fn hear(&mut self, msg: Message, ctx: &mut ActorContext<Self>) {
        match msg.kind() {
            FOO => println!("A: seen foo"),
            BAR => {
                println!("A: seen bar");
                ctx.exit();
            }
            BAZ => {
                println!("A: seen baz");
                ctx.set_filter(None);
            }
            other => println!("A: unexpected kind {other}"),
        }
    }
}

fn main() {
    let runtime = Runtime::init();
    let actor = runtime
        .alloc(Picky)
        .with_address(1)
        .with_filter(Filter::kind(BAZ));

    for kind in [FOO, BAR, BAZ] {
        actor.push(Message::new(kind));
    }
    println!("M: pushed messages");

    let handle = runtime.start(actor);
    handle.join().expect("actor thread panicked");
    println!("M: joined A");
}
