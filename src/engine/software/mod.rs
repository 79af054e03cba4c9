//! In-process reference engine implementing [`VisionEngine`].
//!
//! Objects live in one handle table keyed by id. Images are [`Image`]
//! handles from the oracle's image model, so ROI images share their
//! parent's buffer exactly as a device implementation would. Nodes hold
//! their own references to bound data, which keeps a graph runnable after
//! the caller releases its image handles.
mod graph;
mod ops;

use self::graph::{validate, Binding, GraphState, NodeState, SharedScalar};
use super::{
    GraphHandle, ImageHandle, NodeCallback, NodeHandle, ObjectType, Operation, ScalarHandle,
    ScalarValue, Status, VisionEngine,
};
use crate::image::{BorderPolicy, Image, PixelFormat, Rect};
use log::{debug, warn};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

enum Object {
    Image(Image),
    Scalar(SharedScalar),
    Graph(GraphState),
    Node { graph: u64, index: usize },
}

impl Object {
    fn object_type(&self) -> ObjectType {
        match self {
            Self::Image(_) => ObjectType::Image,
            Self::Scalar(_) => ObjectType::Scalar,
            Self::Graph(_) => ObjectType::Graph,
            Self::Node { .. } => ObjectType::Node,
        }
    }
}

/// Single-context software implementation of the engine API.
pub struct SoftwareEngine {
    objects: BTreeMap<u64, Object>,
    next_id: u64,
    immediate_border: BorderPolicy,
    last_error: Option<String>,
}

impl Default for SoftwareEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftwareEngine {
    pub fn new() -> Self {
        Self {
            objects: BTreeMap::new(),
            next_id: 1,
            immediate_border: BorderPolicy::Undefined,
            last_error: None,
        }
    }

    fn insert(&mut self, object: Object) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.objects.insert(id, object);
        id
    }

    fn fail(&mut self, status: Status, detail: String) -> Status {
        warn!("SoftwareEngine: {detail} ({status})");
        self.last_error = Some(detail);
        status
    }

    fn image(&self, handle: ImageHandle) -> Option<&Image> {
        match self.objects.get(&handle.raw()?) {
            Some(Object::Image(img)) => Some(img),
            _ => None,
        }
    }

    fn scalar(&self, handle: ScalarHandle) -> Option<&SharedScalar> {
        match self.objects.get(&handle.raw()?) {
            Some(Object::Scalar(s)) => Some(s),
            _ => None,
        }
    }

    fn graph_mut(&mut self, handle: GraphHandle) -> Option<&mut GraphState> {
        match self.objects.get_mut(&handle.raw()?) {
            Some(Object::Graph(g)) => Some(g),
            _ => None,
        }
    }

    fn node_mut(&mut self, handle: NodeHandle) -> Option<&mut NodeState> {
        let (graph, index) = match self.objects.get(&handle.raw()?) {
            Some(Object::Node { graph, index }) => (*graph, *index),
            _ => return None,
        };
        match self.objects.get_mut(&graph) {
            Some(Object::Graph(g)) => {
                g.invalidate();
                g.nodes.get_mut(index)
            }
            _ => None,
        }
    }

    /// Resolve an operation's handles into engine-held references.
    fn bind(&self, op: &Operation) -> Option<Binding> {
        let input = self.image(op.input())?.clone();
        match *op {
            Operation::MeanStdDev { mean, stddev, .. } => Some(Binding::MeanStdDev {
                input,
                mean: Arc::clone(self.scalar(mean)?),
                stddev: Arc::clone(self.scalar(stddev)?),
            }),
            _ => {
                let output = self.image(op.image_output()?)?.clone();
                Some(Binding::ImageToImage { input, output })
            }
        }
    }

    fn release<K>(
        &mut self,
        handle: &mut super::Handle<K>,
        expected: ObjectType,
    ) -> Status {
        let Some(id) = handle.raw() else {
            return Status::InvalidReference;
        };
        match self.objects.get(&id).map(Object::object_type) {
            Some(t) if t == expected => {
                self.objects.remove(&id);
                handle.take();
                Status::Success
            }
            _ => self.fail(
                Status::InvalidReference,
                format!("release of unknown {expected:?} #{id}"),
            ),
        }
    }
}

impl VisionEngine for SoftwareEngine {
    fn name(&self) -> &str {
        "software"
    }

    fn object_type(&self, raw: u64) -> Option<ObjectType> {
        self.objects.get(&raw).map(Object::object_type)
    }

    fn live_objects(&self) -> usize {
        self.objects.len()
    }

    fn last_error(&self) -> Option<String> {
        self.last_error.clone()
    }

    fn collect_garbage(&mut self) {
        debug!(
            "SoftwareEngine::collect_garbage live objects {}",
            self.objects.len()
        );
    }

    fn create_image(&mut self, width: usize, height: usize, format: PixelFormat) -> ImageHandle {
        match Image::allocate(width, height, format) {
            Ok(img) => ImageHandle::from_raw(self.insert(Object::Image(img))),
            Err(e) => {
                self.fail(Status::InvalidDimension, e.to_string());
                ImageHandle::NULL
            }
        }
    }

    fn create_image_from_host(&mut self, host: &Image) -> ImageHandle {
        match host.deep_copy() {
            Ok(img) => ImageHandle::from_raw(self.insert(Object::Image(img))),
            Err(e) => {
                self.fail(Status::InvalidParameters, e.to_string());
                ImageHandle::NULL
            }
        }
    }

    fn create_image_from_roi(&mut self, parent: ImageHandle, rect: Rect) -> ImageHandle {
        let Some(parent_img) = self.image(parent) else {
            self.fail(
                Status::InvalidReference,
                format!("ROI parent {parent:?} is not an image"),
            );
            return ImageHandle::NULL;
        };
        match parent_img.view_roi(rect) {
            Ok(view) => ImageHandle::from_raw(self.insert(Object::Image(view))),
            Err(e) => {
                self.fail(Status::InvalidParameters, e.to_string());
                ImageHandle::NULL
            }
        }
    }

    fn copy_image_to_host(&self, image: ImageHandle) -> Result<Image, Status> {
        self.image(image)
            .ok_or(Status::InvalidReference)?
            .deep_copy()
            .map_err(|_| Status::Failure)
    }

    fn release_image(&mut self, image: &mut ImageHandle) -> Status {
        self.release(image, ObjectType::Image)
    }

    fn create_scalar(&mut self, initial: ScalarValue) -> ScalarHandle {
        ScalarHandle::from_raw(self.insert(Object::Scalar(Arc::new(Mutex::new(initial)))))
    }

    fn read_scalar(&self, scalar: ScalarHandle) -> Result<ScalarValue, Status> {
        let s = self.scalar(scalar).ok_or(Status::InvalidReference)?;
        Ok(*s.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn release_scalar(&mut self, scalar: &mut ScalarHandle) -> Status {
        self.release(scalar, ObjectType::Scalar)
    }

    fn set_immediate_border(&mut self, border: BorderPolicy) -> Status {
        self.immediate_border = border;
        Status::Success
    }

    fn immediate_border(&self) -> BorderPolicy {
        self.immediate_border
    }

    fn run_immediate(&mut self, op: Operation) -> Status {
        let kind = op.kind();
        let Some(binding) = self.bind(&op) else {
            return self.fail(
                Status::InvalidReference,
                format!("{} immediate call has an invalid parameter", kind.name()),
            );
        };
        if let Err((status, detail)) = validate(kind, &binding) {
            return self.fail(status, detail);
        }
        graph::execute(kind, &binding, self.immediate_border)
    }

    fn create_graph(&mut self) -> GraphHandle {
        GraphHandle::from_raw(self.insert(Object::Graph(GraphState::default())))
    }

    fn add_node(&mut self, graph: GraphHandle, op: Operation) -> NodeHandle {
        let kind = op.kind();
        let Some(binding) = self.bind(&op) else {
            self.fail(
                Status::InvalidReference,
                format!("{} node has an invalid parameter", kind.name()),
            );
            return NodeHandle::NULL;
        };
        let Some(graph_id) = graph.raw() else {
            return NodeHandle::NULL;
        };
        let id = self.next_id;
        let node = NodeHandle::from_raw(id);
        let Some(g) = self.graph_mut(graph) else {
            self.fail(
                Status::InvalidReference,
                format!("{graph:?} is not a graph"),
            );
            return NodeHandle::NULL;
        };
        g.invalidate();
        g.nodes.push(NodeState {
            kind,
            binding,
            border: BorderPolicy::Undefined,
            callback: None,
            handle: node,
        });
        let index = g.nodes.len() - 1;
        let inserted = self.insert(Object::Node {
            graph: graph_id,
            index,
        });
        debug_assert_eq!(inserted, id);
        node
    }

    fn set_node_border(&mut self, node: NodeHandle, border: BorderPolicy) -> Status {
        match self.node_mut(node) {
            Some(n) => {
                n.border = border;
                Status::Success
            }
            None => self.fail(Status::InvalidReference, format!("{node:?} is not a node")),
        }
    }

    fn assign_node_callback(&mut self, node: NodeHandle, callback: NodeCallback) -> Status {
        match self.node_mut(node) {
            Some(n) => {
                n.callback = Some(callback);
                Status::Success
            }
            None => self.fail(Status::InvalidReference, format!("{node:?} is not a node")),
        }
    }

    fn verify_graph(&mut self, graph: GraphHandle) -> Status {
        let Some(g) = self.graph_mut(graph) else {
            return self.fail(
                Status::InvalidReference,
                format!("{graph:?} is not a graph"),
            );
        };
        match g.verify() {
            Ok(()) => Status::Success,
            Err((status, detail)) => self.fail(status, detail),
        }
    }

    fn process_graph(&mut self, graph: GraphHandle) -> Status {
        let Some(g) = self.graph_mut(graph) else {
            return self.fail(
                Status::InvalidReference,
                format!("{graph:?} is not a graph"),
            );
        };
        if g.schedule.is_none() {
            if let Err((status, detail)) = g.verify() {
                return self.fail(status, detail);
            }
        }
        g.process()
    }

    fn release_node(&mut self, node: &mut NodeHandle) -> Status {
        self.release(node, ObjectType::Node)
    }

    fn release_graph(&mut self, graph: &mut GraphHandle) -> Status {
        self.release(graph, ObjectType::Graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::CallbackAction;

    #[test]
    fn release_nulls_the_handle_and_rejects_reuse() {
        let mut engine = SoftwareEngine::new();
        let mut img = engine.create_image(8, 8, PixelFormat::U8);
        let stale = img;
        assert_eq!(engine.object_type(img.raw().unwrap()), Some(ObjectType::Image));
        assert_eq!(engine.release_image(&mut img), Status::Success);
        assert!(img.is_null());
        let mut stale = stale;
        assert_eq!(engine.release_image(&mut stale), Status::InvalidReference);
        assert_eq!(engine.live_objects(), 0);
    }

    #[test]
    fn roi_images_share_the_parent_buffer() {
        let mut engine = SoftwareEngine::new();
        let parent = engine.create_image(16, 16, PixelFormat::U8);
        let roi = engine.create_image_from_roi(parent, Rect::new(4, 4, 12, 12));
        assert!(!roi.is_null());
        assert!(engine
            .create_image_from_roi(parent, Rect::new(4, 4, 17, 12))
            .is_null());
        let (p, r) = (engine.image(parent).unwrap(), engine.image(roi).unwrap());
        assert!(p.aliases(r));
    }

    #[test]
    fn verify_rejects_mismatched_output() {
        let mut engine = SoftwareEngine::new();
        let src = engine.create_image(8, 8, PixelFormat::U8);
        let dst = engine.create_image(8, 9, PixelFormat::U8);
        let graph = engine.create_graph();
        let node = engine.add_node(graph, Operation::Erode3x3 { input: src, output: dst });
        assert!(!node.is_null());
        assert_eq!(engine.verify_graph(graph), Status::InvalidDimension);
        assert!(engine.last_error().unwrap().contains("does not match"));
    }

    #[test]
    fn verify_rejects_two_writers() {
        let mut engine = SoftwareEngine::new();
        let src = engine.create_image(8, 8, PixelFormat::U8);
        let dst = engine.create_image(8, 8, PixelFormat::U8);
        let graph = engine.create_graph();
        engine.add_node(graph, Operation::Erode3x3 { input: src, output: dst });
        engine.add_node(graph, Operation::Box3x3 { input: src, output: dst });
        assert_eq!(engine.verify_graph(graph), Status::MultipleWriters);
    }

    #[test]
    fn consumer_added_first_still_runs_second() {
        let mut engine = SoftwareEngine::new();
        let src = engine.create_image(8, 8, PixelFormat::U8);
        let mid = engine.create_image(8, 8, PixelFormat::U8);
        let dst = engine.create_image(8, 8, PixelFormat::U32);
        let graph = engine.create_graph();
        let consumer = engine.add_node(graph, Operation::IntegralImage { input: mid, output: dst });
        let producer = engine.add_node(graph, Operation::Box3x3 { input: src, output: mid });
        let log = Arc::new(Mutex::new(Vec::new()));
        for (node, tag) in [(producer, "producer"), (consumer, "consumer")] {
            let log = Arc::clone(&log);
            let cb: NodeCallback = Box::new(move |_| {
                log.lock().unwrap().push(tag);
                CallbackAction::Continue
            });
            assert_eq!(engine.assign_node_callback(node, cb), Status::Success);
        }
        assert_eq!(engine.verify_graph(graph), Status::Success);
        assert_eq!(engine.process_graph(graph), Status::Success);
        assert_eq!(*log.lock().unwrap(), vec!["producer", "consumer"]);
    }

    #[test]
    fn abandon_stops_processing() {
        let mut engine = SoftwareEngine::new();
        let src = engine.create_image(4, 4, PixelFormat::U8);
        let dst = engine.create_image(4, 4, PixelFormat::U8);
        let graph = engine.create_graph();
        let node = engine.add_node(graph, Operation::EqualizeHist { input: src, output: dst });
        engine.assign_node_callback(node, Box::new(|_| CallbackAction::Abandon));
        assert_eq!(engine.process_graph(graph), Status::GraphAbandoned);
    }

    #[test]
    fn in_place_immediate_call_is_rejected() {
        let mut engine = SoftwareEngine::new();
        let img = engine.create_image(4, 4, PixelFormat::U8);
        assert_eq!(
            engine.run_immediate(Operation::Erode3x3 { input: img, output: img }),
            Status::InvalidParameters
        );
    }
}
