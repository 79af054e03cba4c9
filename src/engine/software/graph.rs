//! Graph state for the software engine: bound nodes, verification and
//! dependency scheduling.
use super::ops;
use crate::engine::{CallbackAction, NodeCallback, NodeHandle, OperationKind, ScalarValue, Status};
use crate::image::{BorderPolicy, Image, PixelFormat};
use log::debug;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

pub(super) type SharedScalar = Arc<Mutex<ScalarValue>>;

/// Engine-internal references held by a node; they keep the data alive
/// after the caller releases its own handles.
#[derive(Clone, Debug)]
pub(super) enum Binding {
    ImageToImage { input: Image, output: Image },
    MeanStdDev {
        input: Image,
        mean: SharedScalar,
        stddev: SharedScalar,
    },
}

impl Binding {
    fn input(&self) -> &Image {
        match self {
            Self::ImageToImage { input, .. } | Self::MeanStdDev { input, .. } => input,
        }
    }

    fn output(&self) -> Option<&Image> {
        match self {
            Self::ImageToImage { output, .. } => Some(output),
            Self::MeanStdDev { .. } => None,
        }
    }
}

pub(super) struct NodeState {
    pub kind: OperationKind,
    pub binding: Binding,
    pub border: BorderPolicy,
    pub callback: Option<NodeCallback>,
    pub handle: NodeHandle,
}

/// Check one node's parameters in isolation.
pub(super) fn validate(kind: OperationKind, binding: &Binding) -> Result<(), (Status, String)> {
    let input = binding.input();
    if input.format() != PixelFormat::U8 {
        return Err((
            Status::InvalidFormat,
            format!("{} input must be U8, got {:?}", kind.name(), input.format()),
        ));
    }
    match binding {
        Binding::ImageToImage { input, output } => {
            let expected = kind.output_format().ok_or_else(|| {
                (
                    Status::InvalidParameters,
                    format!("{} has no image output", kind.name()),
                )
            })?;
            if output.format() != expected {
                return Err((
                    Status::InvalidFormat,
                    format!(
                        "{} output must be {expected:?}, got {:?}",
                        kind.name(),
                        output.format()
                    ),
                ));
            }
            if (output.width(), output.height()) != (input.width(), input.height()) {
                return Err((
                    Status::InvalidDimension,
                    format!(
                        "{} output {}x{} does not match input {}x{}",
                        kind.name(),
                        output.width(),
                        output.height(),
                        input.width(),
                        input.height()
                    ),
                ));
            }
            if input.aliases(output) {
                return Err((
                    Status::InvalidParameters,
                    format!("{} input and output overlap", kind.name()),
                ));
            }
        }
        Binding::MeanStdDev { mean, stddev, .. } => {
            for (name, s) in [("mean", mean), ("stddev", stddev)] {
                let value = *s.lock().unwrap_or_else(PoisonError::into_inner);
                if value.as_f32().is_none() {
                    return Err((
                        Status::InvalidFormat,
                        format!("MeanStdDev {name} scalar must be F32"),
                    ));
                }
            }
        }
    }
    Ok(())
}

/// Execute one node against its bindings.
pub(super) fn execute(kind: OperationKind, binding: &Binding, border: BorderPolicy) -> Status {
    let input = binding.input();
    let (w, h) = (input.width(), input.height());
    let src = input.to_packed();
    match binding {
        Binding::ImageToImage { output, .. } => {
            let result = match kind {
                OperationKind::EqualizeHist => {
                    Image::from_packed(w, h, PixelFormat::U8, ops::equalize_hist(&src)).ok()
                }
                OperationKind::Erode3x3 => {
                    Image::from_packed(w, h, PixelFormat::U8, ops::erode3x3(&src, w, h, border))
                        .ok()
                }
                OperationKind::Box3x3 => {
                    Image::from_packed(w, h, PixelFormat::U8, ops::box3x3(&src, w, h, border)).ok()
                }
                OperationKind::IntegralImage => {
                    ops::u32_plane(w, h, &ops::integral_image(&src, w, h))
                }
                OperationKind::MeanStdDev => None,
            };
            match result {
                Some(img) if output.copy_from(&img).is_ok() => Status::Success,
                _ => Status::Failure,
            }
        }
        Binding::MeanStdDev { mean, stddev, .. } => {
            let (m, s) = ops::mean_stddev(&src, w);
            *mean.lock().unwrap_or_else(PoisonError::into_inner) = ScalarValue::F32(m);
            *stddev.lock().unwrap_or_else(PoisonError::into_inner) = ScalarValue::F32(s);
            Status::Success
        }
    }
}

#[derive(Default)]
pub(super) struct GraphState {
    pub nodes: Vec<NodeState>,
    /// Execution order computed by the last successful verification.
    pub schedule: Option<Vec<usize>>,
}

impl GraphState {
    pub fn invalidate(&mut self) {
        self.schedule = None;
    }

    /// Validate all nodes and derive a dependency-respecting order.
    pub fn verify(&mut self) -> Result<(), (Status, String)> {
        self.schedule = None;
        if self.nodes.is_empty() {
            return Err((Status::InvalidGraph, "graph has no nodes".to_string()));
        }
        for node in &self.nodes {
            validate(node.kind, &node.binding)?;
        }

        let n = self.nodes.len();
        for i in 0..n {
            for j in (i + 1)..n {
                if let (Some(a), Some(b)) =
                    (self.nodes[i].binding.output(), self.nodes[j].binding.output())
                {
                    if a.aliases(b) {
                        return Err((
                            Status::MultipleWriters,
                            format!(
                                "nodes {i} ({}) and {j} ({}) write overlapping images",
                                self.nodes[i].kind.name(),
                                self.nodes[j].kind.name()
                            ),
                        ));
                    }
                }
            }
        }

        // producer -> consumer edges through (possibly aliased) images
        let mut consumers: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut pending = vec![0usize; n];
        for (p, producer) in self.nodes.iter().enumerate() {
            let Some(out) = producer.binding.output() else {
                continue;
            };
            for (c, consumer) in self.nodes.iter().enumerate() {
                if c != p && consumer.binding.input().aliases(out) {
                    consumers[p].push(c);
                    pending[c] += 1;
                }
            }
        }

        let mut ready: VecDeque<usize> = (0..n).filter(|&i| pending[i] == 0).collect();
        let mut order = Vec::with_capacity(n);
        while let Some(i) = ready.pop_front() {
            order.push(i);
            for &c in &consumers[i] {
                pending[c] -= 1;
                if pending[c] == 0 {
                    ready.push_back(c);
                }
            }
        }
        if order.len() != n {
            return Err((
                Status::InvalidGraph,
                "graph contains a dependency cycle".to_string(),
            ));
        }
        debug!("SoftwareEngine::verify_graph schedule {order:?}");
        self.schedule = Some(order);
        Ok(())
    }

    /// Run every node in schedule order, firing callbacks after each one.
    pub fn process(&mut self) -> Status {
        let Some(order) = self.schedule.clone() else {
            return Status::InvalidGraph;
        };
        for i in order {
            let node = &mut self.nodes[i];
            let status = execute(node.kind, &node.binding, node.border);
            if !status.is_success() {
                debug!(
                    "SoftwareEngine::process_graph node {i} ({}) failed: {status}",
                    node.kind.name()
                );
                return status;
            }
            if let Some(cb) = node.callback.as_mut() {
                if cb(node.handle) == CallbackAction::Abandon {
                    return Status::GraphAbandoned;
                }
            }
        }
        Status::Success
    }
}
