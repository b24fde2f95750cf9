//! Chaos tests for a chat session over a faulty link.
//!
//! proptest generates a fault plan; each plan runs on a fresh paused tokio
//! runtime, so virtual time makes the whole session deterministic. The
//! session invariants are checked after every step, and the session must
//! heal once the faults stop.

use std::time::Duration;

use proptest::prelude::*;
use unichat_chat::{ChatConfig, ChatEvent, Runtime, Step};
use unichat_core::{BackoffPolicy, ConnectionState, TransportConfig};
use unichat_harness::{InvariantRegistry, SessionObserver, SimEnv, SimLink, SimPeer, sim_link};
use unichat_proto::{ConversationId, Frame, MessageId, Payload, payloads::DeliveryReceipt};

type TestRuntime = Runtime<SimLink, SimEnv>;

#[derive(Debug, Clone)]
enum Fault {
    Send,
    DropLink,
    CloseLink,
    RefuseOpens(u32),
    FailSend,
    Ack(usize),
    Reconnect,
    Wait(u64),
}

fn fault_strategy() -> impl Strategy<Value = Fault> {
    prop_oneof![
        4 => Just(Fault::Send),
        1 => Just(Fault::DropLink),
        1 => Just(Fault::CloseLink),
        1 => (1..4u32).prop_map(Fault::RefuseOpens),
        1 => Just(Fault::FailSend),
        2 => (0..8usize).prop_map(Fault::Ack),
        1 => Just(Fault::Reconnect),
        2 => (0u64..3000).prop_map(Fault::Wait),
    ]
}

fn policy() -> TransportConfig {
    TransportConfig {
        backoff: BackoffPolicy {
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
            max_attempts: 6,
        },
    }
}

fn conv() -> ConversationId {
    "c1".into()
}

fn block_on<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .expect("paused runtime")
        .block_on(future)
}

async fn run_for(runtime: &mut TestRuntime, duration: Duration) -> Vec<ChatEvent> {
    let mut events = Vec::new();
    let mut timer = Box::pin(tokio::time::sleep(duration));
    loop {
        match runtime.poll_with(timer.as_mut()).await {
            Step::Chat(event) => events.push(event),
            Step::External(()) => return events,
        }
    }
}

fn ack(issued: &[MessageId], n: usize) -> Option<Frame> {
    let client_id = issued.get(n % issued.len().max(1))?;
    Some(Frame::new(
        Payload::MessageDelivered(DeliveryReceipt {
            message_id: MessageId::new(format!("srv-{n}")),
            conversation_id: conv(),
            client_message_id: Some(client_id.clone()),
        }),
        1,
    ))
}

async fn run_plan(seed: u64, plan: Vec<Fault>) -> Result<(), TestCaseError> {
    let (link, peer): (SimLink, SimPeer) = sim_link();
    let mut runtime =
        Runtime::new(link, SimEnv::with_seed(seed), "alice", policy(), ChatConfig::default());
    let registry = InvariantRegistry::standard();
    let mut observer = SessionObserver::new();
    let mut issued = Vec::new();
    let mut failed_sends = 0;

    runtime.connect().await.map_err(|e| TestCaseError::fail(e.to_string()))?;
    runtime.open_conversation(&conv()).await;

    for (step, fault) in plan.iter().enumerate() {
        match fault {
            Fault::Send => {
                let id = runtime
                    .send_message(&conv(), format!("message {step}"))
                    .await
                    .map_err(|e| TestCaseError::fail(e.to_string()))?;
                observer.issued(id.clone());
                issued.push(id);
            },
            Fault::DropLink => peer.drop_link(),
            Fault::CloseLink => peer.close_link(),
            Fault::RefuseOpens(n) => peer.refuse_next(*n),
            Fault::FailSend => {
                peer.fail_next_sends(1);
                failed_sends += 1;
            },
            Fault::Ack(n) => {
                if let Some(frame) = ack(&issued, *n) {
                    peer.push(&frame);
                }
            },
            Fault::Reconnect => {
                runtime.reconnect().await.ok();
            },
            Fault::Wait(ms) => {
                run_for(&mut runtime, Duration::from_millis(*ms)).await;
            },
        }

        run_for(&mut runtime, Duration::from_millis(50)).await;
        let snapshot = observer.snapshot(&runtime, &peer);
        if let Err(violations) = registry.check_all(&snapshot) {
            return Err(TestCaseError::fail(format!("step {step} ({fault:?}): {violations:?}")));
        }
    }

    // Faults stop; an exhausted session needs one manual reconnect
    peer.refuse_next(0);
    peer.fail_next_sends(0);
    run_for(&mut runtime, Duration::from_secs(10)).await;
    if runtime.transport().state() != ConnectionState::Open {
        runtime.reconnect().await.map_err(|e| TestCaseError::fail(e.to_string()))?;
        run_for(&mut runtime, Duration::from_secs(1)).await;
    }

    let snapshot = observer.snapshot(&runtime, &peer);
    if let Err(violations) = registry.check_all(&snapshot) {
        return Err(TestCaseError::fail(format!("after healing: {violations:?}")));
    }
    prop_assert_eq!(snapshot.connection, ConnectionState::Open);
    prop_assert_eq!(snapshot.queued, 0);

    // Only frames hit by a failed write are lost
    let lost = issued.iter().filter(|id| !snapshot.transmitted.contains(id)).count();
    prop_assert!(lost <= failed_sends, "{} lost with {} failed writes", lost, failed_sends);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_session_survives_link_chaos(
        seed in any::<u64>(),
        plan in prop::collection::vec(fault_strategy(), 1..30),
    ) {
        block_on(run_plan(seed, plan))?;
    }
}

#[test]
fn dropped_link_loses_nothing() {
    let plan = vec![Fault::Send, Fault::Send, Fault::DropLink, Fault::Send, Fault::Wait(500)];
    block_on(run_plan(1, plan)).expect("clean session");
}
