//! Callback-order verification for producer/consumer graphs.
//!
//! Both nodes carry completion callbacks that write into a shared
//! [`EventLog`]. Each callback also checks an order-sensitive flag: the
//! producer must not find the consumer already done, and the consumer must
//! find the producer done. A violation on any run is a hard failure.
use crate::adapter::{verify_graph, with_scope};
use crate::engine::{CallbackAction, NodeCallback, VisionEngine};
use crate::error::{OracleError, OracleResult};
use crate::generator::Geometry;
use crate::harness::RoiScenario;
use crate::image::{Image, PixelFormat};
use crate::rng::TestRng;
use log::debug;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Producer,
    Consumer,
}

#[derive(Debug, Default)]
struct LogState {
    events: Vec<Role>,
    producer_done: bool,
    consumer_done: bool,
    violated: bool,
}

/// Ordered record of callback invocations, shared with the callbacks.
#[derive(Clone, Debug, Default)]
pub struct EventLog {
    inner: Arc<Mutex<LogState>>,
}

impl EventLog {
    fn lock(&self) -> MutexGuard<'_, LogState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clear events and flags before a run.
    pub fn reset(&self) {
        *self.lock() = LogState::default();
    }

    pub fn record(&self, role: Role) {
        let mut state = self.lock();
        state.events.push(role);
        match role {
            Role::Producer => {
                state.producer_done = true;
                if state.consumer_done {
                    state.violated = true;
                }
            }
            Role::Consumer => {
                state.consumer_done = true;
                if !state.producer_done {
                    state.violated = true;
                }
            }
        }
    }

    pub fn events(&self) -> Vec<Role> {
        self.lock().events.clone()
    }

    /// True when both callbacks ran and neither saw the wrong order.
    pub fn in_order(&self) -> bool {
        let state = self.lock();
        state.producer_done && state.consumer_done && !state.violated
    }

    /// Completion callback recording `role`.
    pub fn callback(&self, role: Role) -> NodeCallback {
        let log = self.clone();
        Box::new(move |_node| {
            log.record(role);
            CallbackAction::Continue
        })
    }
}

/// Order in which nodes are added to the graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertionOrder {
    /// Producer first.
    Forward,
    /// Consumer first.
    Reverse,
}

impl InsertionOrder {
    pub const ALL: [InsertionOrder; 2] = [Self::Forward, Self::Reverse];
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackOrderReport {
    pub order: InsertionOrder,
    pub runs: usize,
    /// Callback sequence observed on each run.
    pub events: Vec<Vec<Role>>,
}

/// Runs the Box3x3 → IntegralImage graph repeatedly and checks callback order.
#[derive(Clone, Copy, Debug)]
pub struct CallbackOrderVerifier {
    pub scenario: RoiScenario,
    pub runs: usize,
}

impl CallbackOrderVerifier {
    /// The producer writes the whole 128×128 intermediate; the consumer reads
    /// its {10,10,118,118} window.
    pub fn new(runs: usize) -> Self {
        let defaults = RoiScenario::default();
        Self {
            scenario: RoiScenario {
                source: defaults.backing,
                ..defaults
            },
            runs,
        }
    }

    pub fn verify<E: VisionEngine + ?Sized>(
        &self,
        engine: &mut E,
        order: InsertionOrder,
        seed: u64,
    ) -> OracleResult<CallbackOrderReport> {
        let source = random_source(self.scenario.source, seed)?;
        with_scope(engine, |scope| {
            let g = self
                .scenario
                .build(scope, &source, true, order == InsertionOrder::Reverse)?;
            let log = EventLog::default();
            let engine = scope.engine();
            for (node, role) in [(g.producer, Role::Producer), (g.consumer, Role::Consumer)] {
                let status = engine.assign_node_callback(node, log.callback(role));
                if !status.is_success() {
                    return Err(OracleError::execution(format!("assign {role:?} callback"), status));
                }
            }
            verify_graph(engine, g.graph, "callback-order")?;

            let mut report = CallbackOrderReport {
                order,
                runs: 0,
                events: Vec::with_capacity(self.runs),
            };
            for run in 0..self.runs {
                log.reset();
                let status = engine.process_graph(g.graph);
                if !status.is_success() {
                    return Err(OracleError::execution(format!("process run {run}"), status));
                }
                let events = log.events();
                if !log.in_order() {
                    return Err(OracleError::CallbackOrder {
                        run,
                        detail: format!("{order:?} insertion observed {events:?}"),
                    });
                }
                report.events.push(events);
                report.runs += 1;
            }
            debug!(
                "CallbackOrderVerifier::verify {order:?}: {} run(s) in order",
                report.runs
            );
            Ok(report)
        })
    }
}

fn random_source(geometry: Geometry, seed: u64) -> OracleResult<Image> {
    let mut rng = TestRng::new(seed);
    let mut data = vec![0u8; geometry.pixel_count()];
    rng.fill_range(&mut data, 0..256);
    Image::from_packed(geometry.width, geometry.height, PixelFormat::U8, data)
}
