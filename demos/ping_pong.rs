//! Ping-Pong Example
//!
//! Two hosts bounce a packet over a link with a fixed propagation delay.
//! The sender arms a retransmission timer for every ping; pongs that come
//! back in time cancel it. Every fifth pong is "lost", so the timer fires
//! and the ping is sent again.
//!
//! The simulation showcases:
//! - Reentrant scheduling from callbacks
//! - A `Timer` with `CancelOnSchedule`
//! - Configuration from a YAML/JSON file (optional first argument)
//! - Statistics collection
//!
//! Run with: `cargo run --example ping_pong [config.yaml]`

use std::sync::Arc;

use chronon::{
    milli_seconds, DestroyPolicy, SchedulePolicy, SimConfig, SimConfigBuilder, Simulator,
    StatsCollector, Time, Timer,
};
use parking_lot::Mutex;

// ============================================================================
// Model Configuration
// ============================================================================

const LINK_DELAY_MS: i64 = 20;
const RETRANSMIT_TIMEOUT_MS: i64 = 100;
const PINGS: u32 = 20;
const LOSS_EVERY: u32 = 5;

#[derive(Default)]
struct HostState {
    next_seq: u32,
    sent: u32,
    received: u32,
    lost: u32,
    retransmits: u32,
    rtts: Vec<Time>,
    sent_at: Option<Time>,
}

struct Sender {
    state: Mutex<HostState>,
    timer: Mutex<Timer>,
}

fn link_delay() -> Time {
    milli_seconds(LINK_DELAY_MS)
}

/// Puts ping `seq` on the link and arms the retransmission timer.
fn send_ping(sender: &Arc<Sender>, sim: &mut Simulator, seq: u32, retransmit: bool) {
    {
        let mut state = sender.state.lock();
        state.sent += 1;
        if retransmit {
            state.retransmits += 1;
        } else {
            state.sent_at = Some(sim.now());
        }
    }
    sender
        .timer
        .lock()
        .schedule(sim)
        .expect("retransmission timer");

    let s = sender.clone();
    sim.schedule_after(link_delay(), move |sim| receive_ping(&s, sim, seq))
        .expect("ping delivery");
}

/// The far host answers every ping, but drops every `LOSS_EVERY`-th answer.
fn receive_ping(sender: &Arc<Sender>, sim: &mut Simulator, seq: u32) {
    let drop_reply = {
        let mut state = sender.state.lock();
        let drop_reply = (seq + 1) % LOSS_EVERY == 0 && state.lost < seq + 1;
        if drop_reply {
            state.lost = seq + 1;
        }
        drop_reply
    };
    if drop_reply {
        return;
    }
    let s = sender.clone();
    sim.schedule_after(link_delay(), move |sim| receive_pong(&s, sim, seq))
        .expect("pong delivery");
}

fn receive_pong(sender: &Arc<Sender>, sim: &mut Simulator, seq: u32) {
    let next = {
        let mut state = sender.state.lock();
        if seq + 1 != state.next_seq {
            return;
        }
        sender.timer.lock().cancel();
        state.received += 1;
        if let Some(sent_at) = state.sent_at.take() {
            state.rtts.push(sim.now() - sent_at);
        }
        if state.next_seq < PINGS {
            state.next_seq += 1;
            Some(state.next_seq - 1)
        } else {
            None
        }
    };
    if let Some(seq) = next {
        send_ping(sender, sim, seq, false);
    }
}

fn load_config() -> Result<SimConfig, Box<dyn std::error::Error>> {
    match std::env::args().nth(1) {
        Some(path) => Ok(SimConfig::from_file(path)?),
        None => Ok(SimConfigBuilder::new()
            .name("ping-pong")
            .collect_stats(true)
            .build()?),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    chronon::init_logging(&config.simulation.log_level);

    let mut sim = Simulator::from_config(&config)?;

    let sender = Arc::new(Sender {
        state: Mutex::new(HostState::default()),
        timer: Mutex::new(Timer::with_policies(
            SchedulePolicy::CancelOnSchedule,
            DestroyPolicy::CancelOnDestroy,
        )),
    });
    {
        let weak = Arc::downgrade(&sender);
        let mut timer = sender.timer.lock();
        timer.set_delay(milli_seconds(RETRANSMIT_TIMEOUT_MS));
        timer.set_function(move |sim| {
            if let Some(sender) = weak.upgrade() {
                let seq = sender.state.lock().next_seq - 1;
                send_ping(&sender, sim, seq, true);
            }
        });
    }

    let s = sender.clone();
    sim.schedule_now(move |sim| {
        s.state.lock().next_seq = 1;
        send_ping(&s, sim, 0, false);
    })?;

    let mut collector = StatsCollector::new();
    collector.set_name(config.simulation.name.clone());
    collector.start();
    sim.run()?;
    collector.stop(&sim);

    let state = sender.state.lock();
    let mean_rtt = if state.rtts.is_empty() {
        0.0
    } else {
        state.rtts.iter().map(|t| t.get_seconds()).sum::<f64>() / state.rtts.len() as f64
    };

    println!("=== Ping-Pong ===");
    println!("Finished at:    {:.3} s", sim.now().get_seconds());
    println!("Pings sent:     {}", state.sent);
    println!("Pongs received: {}", state.received);
    println!("Retransmits:    {}", state.retransmits);
    println!("Mean RTT:       {:.1} ms", mean_rtt * 1000.0);
    println!();

    if config.simulation.collect_stats {
        println!("{}", collector.stats().summary());
    }
    Ok(())
}
