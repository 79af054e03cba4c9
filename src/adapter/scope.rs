use crate::engine::{
    GraphHandle, Handle, HandleKind, ImageHandle, NodeHandle, Operation, ScalarHandle,
    ScalarValue, Status, VisionEngine,
};
use crate::error::{OracleError, OracleResult};
use crate::image::{Image, PixelFormat, Rect};
use log::{debug, warn};

/// Owner of every handle created during one test case or iteration.
///
/// Handles are released in dependency order (nodes, graphs, scalars,
/// images). [`HandleScope::release_all`] checks that each handle came back
/// null and that the engine no longer knows its id; dropping a scope with
/// live handles releases them and logs a warning instead.
pub struct HandleScope<'e, E: VisionEngine + ?Sized> {
    engine: &'e mut E,
    images: Vec<ImageHandle>,
    scalars: Vec<ScalarHandle>,
    graphs: Vec<GraphHandle>,
    nodes: Vec<NodeHandle>,
}

impl<'e, E: VisionEngine + ?Sized> HandleScope<'e, E> {
    pub fn new(engine: &'e mut E) -> Self {
        Self {
            engine,
            images: Vec::new(),
            scalars: Vec::new(),
            graphs: Vec::new(),
            nodes: Vec::new(),
        }
    }

    pub fn engine(&mut self) -> &mut E {
        &mut *self.engine
    }

    /// Number of handles still owned by the scope.
    pub fn live(&self) -> usize {
        self.images.len() + self.scalars.len() + self.graphs.len() + self.nodes.len()
    }

    /// Fail with `Setup` unless `handle` is non-null and carries its type tag.
    pub fn check<K: HandleKind>(&self, site: &str, handle: Handle<K>) -> OracleResult<Handle<K>> {
        let Some(raw) = handle.raw() else {
            let reason = self
                .engine
                .last_error()
                .map(|e| format!(" ({e})"))
                .unwrap_or_default();
            return Err(OracleError::setup(
                site,
                format!("engine returned a null {:?} handle{reason}", K::TYPE),
            ));
        };
        match self.engine.object_type(raw) {
            Some(t) if t == K::TYPE => Ok(handle),
            other => Err(OracleError::setup(
                site,
                format!("{handle:?} has type tag {other:?}"),
            )),
        }
    }

    pub fn image(
        &mut self,
        site: &str,
        width: usize,
        height: usize,
        format: PixelFormat,
    ) -> OracleResult<ImageHandle> {
        let handle = self.engine.create_image(width, height, format);
        self.track_image(site, handle)
    }

    pub fn image_from_host(&mut self, site: &str, host: &Image) -> OracleResult<ImageHandle> {
        let handle = self.engine.create_image_from_host(host);
        self.track_image(site, handle)
    }

    pub fn image_from_roi(
        &mut self,
        site: &str,
        parent: ImageHandle,
        rect: Rect,
    ) -> OracleResult<ImageHandle> {
        let handle = self.engine.create_image_from_roi(parent, rect);
        self.track_image(site, handle)
    }

    fn track_image(&mut self, site: &str, handle: ImageHandle) -> OracleResult<ImageHandle> {
        let handle = self.check(site, handle)?;
        self.images.push(handle);
        Ok(handle)
    }

    pub fn scalar(&mut self, site: &str, initial: ScalarValue) -> OracleResult<ScalarHandle> {
        let handle = self.engine.create_scalar(initial);
        let handle = self.check(site, handle)?;
        self.scalars.push(handle);
        Ok(handle)
    }

    pub fn graph(&mut self, site: &str) -> OracleResult<GraphHandle> {
        let handle = self.engine.create_graph();
        let handle = self.check(site, handle)?;
        self.graphs.push(handle);
        Ok(handle)
    }

    pub fn node(
        &mut self,
        site: &str,
        graph: GraphHandle,
        op: Operation,
    ) -> OracleResult<NodeHandle> {
        let handle = self.engine.add_node(graph, op);
        let handle = self.check(site, handle)?;
        self.nodes.push(handle);
        Ok(handle)
    }

    /// Copy an image out of the engine.
    pub fn read_image(&self, site: &str, image: ImageHandle) -> OracleResult<Image> {
        self.engine
            .copy_image_to_host(image)
            .map_err(|status| OracleError::execution(site, status))
    }

    pub fn read_f32(&self, site: &str, scalar: ScalarHandle) -> OracleResult<f32> {
        let value = self
            .engine
            .read_scalar(scalar)
            .map_err(|status| OracleError::execution(site, status))?;
        value.as_f32().ok_or_else(|| {
            OracleError::setup(site, format!("{scalar:?} holds {value:?}, expected F32"))
        })
    }

    /// Release everything and check that no handle survived.
    pub fn release_all(&mut self) -> OracleResult<()> {
        let engine = &mut *self.engine;
        let mut result = Ok(());
        for mut h in self.nodes.drain(..) {
            let r = release_checked(engine, &mut h, |e, h| e.release_node(h));
            result = result.and(r);
        }
        for mut h in self.graphs.drain(..) {
            let r = release_checked(engine, &mut h, |e, h| e.release_graph(h));
            result = result.and(r);
        }
        for mut h in self.scalars.drain(..) {
            let r = release_checked(engine, &mut h, |e, h| e.release_scalar(h));
            result = result.and(r);
        }
        for mut h in self.images.drain(..) {
            let r = release_checked(engine, &mut h, |e, h| e.release_image(h));
            result = result.and(r);
        }
        result
    }
}

fn release_checked<E, K, F>(engine: &mut E, handle: &mut Handle<K>, release: F) -> OracleResult<()>
where
    E: VisionEngine + ?Sized,
    K: HandleKind,
    F: FnOnce(&mut E, &mut Handle<K>) -> Status,
{
    let Some(raw) = handle.raw() else {
        return Ok(());
    };
    let site = format!("release {:?}#{raw}", K::TYPE);
    let status = release(&mut *engine, &mut *handle);
    if !handle.is_null() || engine.object_type(raw).is_some() {
        debug!("HandleScope::release_all {site} left a live object ({status})");
        return Err(OracleError::ResourceLeak {
            site,
            kind: K::TYPE,
        });
    }
    if !status.is_success() {
        return Err(OracleError::execution(site, status));
    }
    Ok(())
}

/// Run `body` inside a fresh scope and release its handles on every exit
/// path. A body error takes precedence over a release error.
pub fn with_scope<E, T, F>(engine: &mut E, body: F) -> OracleResult<T>
where
    E: VisionEngine + ?Sized,
    F: FnOnce(&mut HandleScope<'_, E>) -> OracleResult<T>,
{
    let mut scope = HandleScope::new(engine);
    let result = body(&mut scope);
    let released = scope.release_all();
    let value = result?;
    released?;
    Ok(value)
}

impl<E: VisionEngine + ?Sized> Drop for HandleScope<'_, E> {
    fn drop(&mut self) {
        let live = self.live();
        if live == 0 {
            return;
        }
        warn!("HandleScope dropped with {live} live handle(s); releasing");
        if let Err(err) = self.release_all() {
            warn!("HandleScope::drop: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::software::SoftwareEngine;

    #[test]
    fn release_all_leaves_no_live_objects() {
        let mut engine = SoftwareEngine::new();
        {
            let mut scope = HandleScope::new(&mut engine);
            let src = scope.image("src", 16, 16, PixelFormat::U8).unwrap();
            let dst = scope.image("dst", 16, 16, PixelFormat::U8).unwrap();
            let graph = scope.graph("graph").unwrap();
            scope
                .node("node", graph, Operation::Erode3x3 { input: src, output: dst })
                .unwrap();
            assert_eq!(scope.live(), 4);
            scope.release_all().unwrap();
            assert_eq!(scope.live(), 0);
        }
        assert_eq!(engine.live_objects(), 0);
    }

    #[test]
    fn null_handle_is_a_setup_failure_citing_the_site() {
        let mut engine = SoftwareEngine::new();
        let mut scope = HandleScope::new(&mut engine);
        let err = scope.image("eqhist input", 0, 4, PixelFormat::U8).unwrap_err();
        assert!(matches!(err, OracleError::Setup { ref site, .. } if site == "eqhist input"));
    }

    #[test]
    fn drop_releases_leftovers() {
        let mut engine = SoftwareEngine::new();
        {
            let mut scope = HandleScope::new(&mut engine);
            scope.scalar("mean", ScalarValue::F32(0.0)).unwrap();
        }
        assert_eq!(engine.live_objects(), 0);
    }
}
