//! Mock platform replaying half-cycles against a virtual microsecond clock.
#![allow(dead_code, unreachable_pub)]

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use myrtio_phase_control::{
    ArmMode, Control, Error, GateDriver, Instant, PhaseTimer, PinId, Scheduler, SyncEdge,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Assert { at: u32, pin: PinId },
    Release { at: u32, pin: PinId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arm {
    Restart(u32),
    Rearm(u32),
}

#[derive(Debug)]
pub struct Bench {
    pub now: u32,
    pub edge_at: u32,
    pub expiry: Option<u32>,
    pub tick_ceiling: u32,
    pub arms: Vec<Arm>,
    pub events: Vec<Event>,
    pub levels: BTreeMap<PinId, bool>,
    pub outputs: Vec<PinId>,
    pub sync_enabled: bool,
    pub sync_pull_up: Option<bool>,
    pub timer_ready: bool,
}

impl Default for Bench {
    fn default() -> Self {
        Self {
            now: 0,
            edge_at: 0,
            expiry: None,
            tick_ceiling: u32::MAX,
            arms: Vec::new(),
            events: Vec::new(),
            levels: BTreeMap::new(),
            outputs: Vec::new(),
            sync_enabled: false,
            sync_pull_up: None,
            timer_ready: false,
        }
    }
}

impl Bench {
    pub fn is_high(&self, pin: PinId) -> bool {
        self.levels.get(&pin).copied().unwrap_or(false)
    }

    /// First assertion time of `pin` at or after `since`.
    pub fn asserted_at(&self, pin: PinId, since: u32) -> Option<u32> {
        self.events.iter().find_map(|event| match *event {
            Event::Assert { at, pin: p } if p == pin && at >= since => Some(at),
            _ => None,
        })
    }

    /// First release time of `pin` strictly after `since`.
    pub fn released_after(&self, pin: PinId, since: u32) -> Option<u32> {
        self.events.iter().find_map(|event| match *event {
            Event::Release { at, pin: p } if p == pin && at > since => Some(at),
            _ => None,
        })
    }

    pub fn clear_log(&mut self) {
        self.events.clear();
        self.arms.clear();
    }
}

pub type Shared = Rc<RefCell<Bench>>;

pub fn bench() -> Shared {
    Rc::new(RefCell::new(Bench::default()))
}

fn to_ticks(bench: &Shared, micros: u32) -> Result<u32, Error> {
    if micros > bench.borrow().tick_ceiling {
        return Err(Error::TimerOutOfRange);
    }
    Ok(micros)
}

fn restart(bench: &Shared, ticks: u32) {
    let mut b = bench.borrow_mut();
    b.edge_at = b.now;
    b.expiry = Some(b.now + ticks);
    b.arms.push(Arm::Restart(ticks));
}

/// Timer re-armed relative to the call.
pub struct RelativeTimer(pub Shared);

impl PhaseTimer for RelativeTimer {
    const MODE: ArmMode = ArmMode::Relative;

    fn init(&mut self) {
        self.0.borrow_mut().timer_ready = true;
    }

    fn micros_to_ticks(&self, micros: u32) -> Result<u32, Error> {
        to_ticks(&self.0, micros)
    }

    fn restart(&mut self, ticks: u32) {
        restart(&self.0, ticks);
    }

    fn rearm(&mut self, ticks: u32) {
        let mut b = self.0.borrow_mut();
        b.expiry = Some(b.now + ticks);
        b.arms.push(Arm::Rearm(ticks));
    }

    fn stop(&mut self) {
        self.0.borrow_mut().expiry = None;
    }

    fn spin(&mut self, micros: u16) {
        self.0.borrow_mut().now += u32::from(micros);
    }
}

/// Timer re-armed relative to the last restart.
pub struct AbsoluteTimer(pub Shared);

impl PhaseTimer for AbsoluteTimer {
    const MODE: ArmMode = ArmMode::Absolute;

    fn init(&mut self) {
        self.0.borrow_mut().timer_ready = true;
    }

    fn micros_to_ticks(&self, micros: u32) -> Result<u32, Error> {
        to_ticks(&self.0, micros)
    }

    fn restart(&mut self, ticks: u32) {
        restart(&self.0, ticks);
    }

    fn rearm(&mut self, ticks: u32) {
        let mut b = self.0.borrow_mut();
        b.expiry = Some(b.edge_at + ticks);
        b.arms.push(Arm::Rearm(ticks));
    }

    fn stop(&mut self) {
        self.0.borrow_mut().expiry = None;
    }

    fn spin(&mut self, micros: u16) {
        self.0.borrow_mut().now += u32::from(micros);
    }
}

pub struct MockGates(pub Shared);

impl GateDriver for MockGates {
    fn configure_output(&mut self, pin: PinId) {
        self.0.borrow_mut().outputs.push(pin);
    }

    fn assert_gate(&mut self, pin: PinId) {
        let mut b = self.0.borrow_mut();
        let at = b.now;
        b.levels.insert(pin, true);
        b.events.push(Event::Assert { at, pin });
    }

    fn release_gate(&mut self, pin: PinId) {
        let mut b = self.0.borrow_mut();
        let at = b.now;
        b.levels.insert(pin, false);
        b.events.push(Event::Release { at, pin });
    }

    fn configure_sync(&mut self, pull_up: bool) {
        self.0.borrow_mut().sync_pull_up = Some(pull_up);
    }

    fn enable_sync(&mut self, _edge: SyncEdge) {
        self.0.borrow_mut().sync_enabled = true;
    }

    fn disable_sync(&mut self) {
        self.0.borrow_mut().sync_enabled = false;
    }
}

pub type RelScheduler<const N: usize> = Scheduler<RelativeTimer, MockGates, N>;
pub type AbsScheduler<const N: usize> = Scheduler<AbsoluteTimer, MockGates, N>;
pub type RelControl<'a, const N: usize> = Control<'a, RelativeTimer, MockGates, N>;

/// Deliver a zero-cross edge at `start` (if the edge interrupt is attached)
/// and every timer expiry before the next edge.
pub fn half_cycle<T: PhaseTimer, const N: usize>(
    scheduler: &Scheduler<T, MockGates, N>,
    bench: &Shared,
    start: u32,
) {
    let attached = {
        let mut b = bench.borrow_mut();
        b.now = start;
        b.sync_enabled
    };
    if attached {
        scheduler.on_zero_cross(Instant::from_micros(u64::from(start)));
    }

    let end = start + u32::from(scheduler.semi_period());
    loop {
        let due = {
            let mut b = bench.borrow_mut();
            match b.expiry {
                Some(at) if at < end => {
                    b.expiry = None;
                    b.now = at;
                    true
                }
                _ => false,
            }
        };
        if !due {
            break;
        }
        scheduler.on_timer();
    }
}

/// Run `count` consecutive half-cycles starting at `start`.
pub fn run<T: PhaseTimer, const N: usize>(
    scheduler: &Scheduler<T, MockGates, N>,
    bench: &Shared,
    start: u32,
    count: u32,
) -> u32 {
    let semi = u32::from(scheduler.semi_period());
    for i in 0..count {
        half_cycle(scheduler, bench, start + i * semi);
    }
    start + count * semi
}
