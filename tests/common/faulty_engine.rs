use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use vision_conformance::engine::{
    CallbackAction, GraphHandle, ImageHandle, NodeCallback, NodeHandle, ObjectType, Operation,
    ScalarHandle, ScalarValue, Status, VisionEngine,
};
use vision_conformance::image::{BorderPolicy, Image, PixelFormat, Rect};
use vision_conformance::SoftwareEngine;

/// Defect injected on top of a correct engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fault {
    /// Image read-back returns the centre pixel off by 2.
    CorruptReadback,
    /// Image release reports success but keeps the handle and object.
    LeakImages,
    /// Callbacks fire in reverse completion order.
    ReverseCallbacks,
    /// F32 scalars read back 1.0 too high.
    SkewScalars,
    /// Every graph fails verification.
    RejectGraphs,
    /// Immediate calls ignore the context border and use REPLICATE.
    IgnoreImmediateBorder,
    /// Every new graph also allocates an internal scalar that is never freed.
    HiddenObject,
}

pub struct FaultyEngine {
    inner: SoftwareEngine,
    fault: Fault,
    completed: Arc<Mutex<Vec<NodeHandle>>>,
    callbacks: HashMap<NodeHandle, NodeCallback>,
}

impl FaultyEngine {
    pub fn new(fault: Fault) -> Self {
        Self {
            inner: SoftwareEngine::new(),
            fault,
            completed: Arc::new(Mutex::new(Vec::new())),
            callbacks: HashMap::new(),
        }
    }
}

impl VisionEngine for FaultyEngine {
    fn name(&self) -> &str {
        "faulty"
    }

    fn object_type(&self, raw: u64) -> Option<ObjectType> {
        self.inner.object_type(raw)
    }

    fn live_objects(&self) -> usize {
        self.inner.live_objects()
    }

    fn last_error(&self) -> Option<String> {
        self.inner.last_error()
    }

    fn create_image(&mut self, width: usize, height: usize, format: PixelFormat) -> ImageHandle {
        self.inner.create_image(width, height, format)
    }

    fn create_image_from_host(&mut self, host: &Image) -> ImageHandle {
        self.inner.create_image_from_host(host)
    }

    fn create_image_from_roi(&mut self, parent: ImageHandle, rect: Rect) -> ImageHandle {
        self.inner.create_image_from_roi(parent, rect)
    }

    fn copy_image_to_host(&self, image: ImageHandle) -> Result<Image, Status> {
        let host = self.inner.copy_image_to_host(image)?;
        if self.fault == Fault::CorruptReadback {
            let (x, y) = (host.width() / 2, host.height() / 2);
            let v = host.at(x, y).map_err(|_| Status::Failure)?;
            let corrupted = if v >= 2 { v - 2 } else { v + 2 };
            host.set(x, y, corrupted).map_err(|_| Status::Failure)?;
        }
        Ok(host)
    }

    fn release_image(&mut self, image: &mut ImageHandle) -> Status {
        if self.fault == Fault::LeakImages {
            return Status::Success;
        }
        self.inner.release_image(image)
    }

    fn create_scalar(&mut self, initial: ScalarValue) -> ScalarHandle {
        self.inner.create_scalar(initial)
    }

    fn read_scalar(&self, scalar: ScalarHandle) -> Result<ScalarValue, Status> {
        let value = self.inner.read_scalar(scalar)?;
        Ok(match (self.fault, value) {
            (Fault::SkewScalars, ScalarValue::F32(v)) => ScalarValue::F32(v + 1.0),
            _ => value,
        })
    }

    fn release_scalar(&mut self, scalar: &mut ScalarHandle) -> Status {
        self.inner.release_scalar(scalar)
    }

    fn set_immediate_border(&mut self, border: BorderPolicy) -> Status {
        let border = match self.fault {
            Fault::IgnoreImmediateBorder => BorderPolicy::Replicate,
            _ => border,
        };
        self.inner.set_immediate_border(border)
    }

    fn immediate_border(&self) -> BorderPolicy {
        self.inner.immediate_border()
    }

    fn run_immediate(&mut self, op: Operation) -> Status {
        self.inner.run_immediate(op)
    }

    fn create_graph(&mut self) -> GraphHandle {
        if self.fault == Fault::HiddenObject {
            let _ = self.inner.create_scalar(ScalarValue::F32(0.0));
        }
        self.inner.create_graph()
    }

    fn add_node(&mut self, graph: GraphHandle, op: Operation) -> NodeHandle {
        self.inner.add_node(graph, op)
    }

    fn set_node_border(&mut self, node: NodeHandle, border: BorderPolicy) -> Status {
        self.inner.set_node_border(node, border)
    }

    fn assign_node_callback(&mut self, node: NodeHandle, callback: NodeCallback) -> Status {
        if self.fault != Fault::ReverseCallbacks {
            return self.inner.assign_node_callback(node, callback);
        }
        self.callbacks.insert(node, callback);
        let completed = Arc::clone(&self.completed);
        self.inner.assign_node_callback(
            node,
            Box::new(move |n| {
                completed.lock().unwrap().push(n);
                CallbackAction::Continue
            }),
        )
    }

    fn verify_graph(&mut self, graph: GraphHandle) -> Status {
        if self.fault == Fault::RejectGraphs {
            return Status::InvalidGraph;
        }
        self.inner.verify_graph(graph)
    }

    fn process_graph(&mut self, graph: GraphHandle) -> Status {
        let status = self.inner.process_graph(graph);
        if self.fault == Fault::ReverseCallbacks {
            let done: Vec<NodeHandle> = self.completed.lock().unwrap().drain(..).collect();
            for node in done.into_iter().rev() {
                if let Some(cb) = self.callbacks.get_mut(&node) {
                    cb(node);
                }
            }
        }
        status
    }

    fn release_node(&mut self, node: &mut NodeHandle) -> Status {
        if let Some(raw) = node.raw() {
            self.callbacks.remove(&NodeHandle::from_raw(raw));
        }
        self.inner.release_node(node)
    }

    fn release_graph(&mut self, graph: &mut GraphHandle) -> Status {
        self.inner.release_graph(graph)
    }
}
