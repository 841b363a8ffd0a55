use crossbeam_channel::{unbounded, Sender};
use thread_actors::{Actor, ActorContext, Filter, Message, Runtime};

const FOO: u32 = 1;
const BAR: u32 = 2;
const BAZ: u32 = 3;

struct Picky {
    seen: Sender<u32>,
}

impl Actor for Picky {
    fn hear(&mut self, msg: Message, ctx: &mut ActorContext<Self>) {
        let _ = self.seen.send(msg.kind());
        match msg.kind() {
            BAZ => ctx.set_filter(None),
            BAR => ctx.exit(),
            _ => {}
        }
    }
}

fn run_picky(inbox: &[u32]) -> Vec<u32> {
    let runtime = Runtime::init();
    let (seen_tx, seen_rx) = unbounded();
    let actor = runtime
        .alloc(Picky { seen: seen_tx })
        .with_address(1)
        .with_filter(Filter::kind(BAZ));
    for kind in inbox {
        actor.push(Message::new(*kind));
    }

    runtime.start(actor).join().unwrap();
    assert!(runtime.is_empty());
    seen_rx.try_iter().collect()
}

#[test]
fn filtered_message_jumps_the_queue() {
    assert_eq!(run_picky(&[FOO, BAR, BAZ]), vec![BAZ, FOO, BAR]);
}

#[test]
fn buffered_messages_return_behind_the_live_inbox() {
    // FOO is spliced back behind BAR, and BAR ends the actor first.
    assert_eq!(run_picky(&[FOO, BAZ, BAR]), vec![BAZ, BAR]);
}

struct InOrder {
    next: u64,
    last: u64,
    seen: Sender<u64>,
}

fn in_order() -> Filter<InOrder> {
    Filter::new(|state: &InOrder, msg: &Message| msg.as_scalar() == Some(state.next))
}

impl Actor for InOrder {
    fn hear(&mut self, msg: Message, ctx: &mut ActorContext<Self>) {
        let seq = msg.as_scalar().unwrap_or_default();
        let _ = self.seen.send(seq);
        if seq == self.last {
            ctx.exit();
            return;
        }
        self.next = seq + 1;
        // Re-installing the filter gives the buffered messages another look.
        ctx.set_filter(Some(in_order()));
    }
}

#[test]
fn filter_can_restore_sequence_order_using_actor_state() {
    let runtime = Runtime::init();
    let (seen_tx, seen_rx) = unbounded();
    let actor = runtime
        .alloc(InOrder {
            next: 0,
            last: 4,
            seen: seen_tx,
        })
        .with_address(9)
        .with_filter(in_order());
    for seq in [3, 1, 4, 2, 0] {
        actor.push(Message::scalar(1, seq));
    }

    runtime.start(actor).join().unwrap();
    assert_eq!(seen_rx.try_iter().collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);
}
