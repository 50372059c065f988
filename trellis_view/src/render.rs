// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rendering contexts: buffered draw scheduling and layout recording.
//!
//! A render pass never draws. Views push their rectangles and marks into a
//! [`ViewRenderingContext`]; the deferred context buffers everything and its
//! [`DeferredViewRenderingContext::flush`] replays the buffer grouped by mark
//! so per-mark setup happens once per frame and viewport switches only when
//! the rectangle actually changes.

extern crate alloc;

use alloc::sync::Arc;
use alloc::vec::Vec;

use hashbrown::HashMap;
use smallvec::SmallVec;
use trellis_core::Rect;

use crate::mark::{Mark, MarkId, RenderingOptions};
use crate::view::ViewId;

/// The receiver of a render traversal.
pub trait ViewRenderingContext {
    /// Enters a view occupying the given rectangle.
    ///
    /// The rectangle stays current for nested marks until the matching
    /// [`Self::pop_view`].
    fn push_view(&mut self, view: ViewId, coords: Rect);

    /// Leaves the most recently pushed view.
    fn pop_view(&mut self, view: ViewId);

    /// Requests a draw of `mark` inside the current rectangle.
    fn render_mark(&mut self, mark: &Arc<dyn Mark>, options: &RenderingOptions);
}

struct DrawRequest {
    mark: Arc<dyn Mark>,
    coords: Rect,
    options: RenderingOptions,
}

/// A context that buffers draw requests for a batched flush.
#[derive(Default)]
pub struct DeferredViewRenderingContext {
    stack: SmallVec<[Rect; 16]>,
    requests: Vec<DrawRequest>,
}

impl DeferredViewRenderingContext {
    /// An empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of buffered requests.
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    /// Whether nothing has been buffered.
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Replays the buffered requests and clears the buffer.
    ///
    /// Requests are grouped by mark identity, groups ordered by the mark's
    /// first appearance. Each group gets one [`Mark::prepare_render`], then
    /// its requests in buffered order with [`Mark::set_viewport`] emitted
    /// only when the rectangle differs from the previous request's. The
    /// replay order is a pure function of the buffer, so identical passes
    /// layer identically.
    pub fn flush(&mut self) {
        let mut group_index: HashMap<MarkId, usize> = HashMap::new();
        let mut groups: Vec<Vec<usize>> = Vec::new();
        for (index, request) in self.requests.iter().enumerate() {
            let id = request.mark.id();
            match group_index.get(&id) {
                Some(&slot) => groups[slot].push(index),
                None => {
                    group_index.insert(id, groups.len());
                    groups.push(alloc::vec![index]);
                }
            }
        }
        for group in groups {
            let first = &self.requests[group[0]];
            first.mark.prepare_render();
            let mut viewport: Option<Rect> = None;
            for index in group {
                let request = &self.requests[index];
                if viewport != Some(request.coords) {
                    request.mark.set_viewport(request.coords);
                    viewport = Some(request.coords);
                }
                request.mark.draw(&request.options);
            }
        }
        self.requests.clear();
    }
}

impl core::fmt::Debug for DeferredViewRenderingContext {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DeferredViewRenderingContext")
            .field("stack_depth", &self.stack.len())
            .field("requests", &self.requests.len())
            .finish_non_exhaustive()
    }
}

impl ViewRenderingContext for DeferredViewRenderingContext {
    fn push_view(&mut self, _view: ViewId, coords: Rect) {
        self.stack.push(coords);
    }

    fn pop_view(&mut self, _view: ViewId) {
        self.stack.pop();
    }

    fn render_mark(&mut self, mark: &Arc<dyn Mark>, options: &RenderingOptions) {
        let coords = self
            .stack
            .last()
            .copied()
            .unwrap_or(Rect::new(0.0, 0.0, 0.0, 0.0));
        self.requests.push(DrawRequest {
            mark: Arc::clone(mark),
            coords,
            options: options.clone(),
        });
    }
}

/// A context that records each view's final rectangle and visit order.
///
/// Used for hit testing and layout assertions; marks are ignored.
#[derive(Debug, Default)]
pub struct LayoutRecorder {
    coords: HashMap<ViewId, Rect>,
    order: Vec<ViewId>,
}

impl LayoutRecorder {
    /// An empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// The rectangle the view was rendered into, if it was visited.
    ///
    /// A view visited more than once (facet and sample replicas) keeps its
    /// last rectangle.
    pub fn coords(&self, view: ViewId) -> Option<Rect> {
        self.coords.get(&view).copied()
    }

    /// Visited views in traversal order, repeats included.
    pub fn order(&self) -> &[ViewId] {
        &self.order
    }
}

impl ViewRenderingContext for LayoutRecorder {
    fn push_view(&mut self, view: ViewId, coords: Rect) {
        self.coords.insert(view, coords);
        self.order.push(view);
    }

    fn pop_view(&mut self, _view: ViewId) {}

    fn render_mark(&mut self, _mark: &Arc<dyn Mark>, _options: &RenderingOptions) {}
}

/// A context that fans every call out to several others, letting one render
/// pass feed both the deferred scheduler and a layout recorder.
pub struct CompositeViewRenderingContext<'a> {
    contexts: Vec<&'a mut dyn ViewRenderingContext>,
}

impl<'a> CompositeViewRenderingContext<'a> {
    /// A composite over the given contexts.
    pub fn new(contexts: Vec<&'a mut dyn ViewRenderingContext>) -> Self {
        Self { contexts }
    }
}

impl core::fmt::Debug for CompositeViewRenderingContext<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CompositeViewRenderingContext")
            .field("contexts", &self.contexts.len())
            .finish_non_exhaustive()
    }
}

impl ViewRenderingContext for CompositeViewRenderingContext<'_> {
    fn push_view(&mut self, view: ViewId, coords: Rect) {
        for context in &mut self.contexts {
            context.push_view(view, coords);
        }
    }

    fn pop_view(&mut self, view: ViewId) {
        for context in &mut self.contexts {
            context.pop_view(view);
        }
    }

    fn render_mark(&mut self, mark: &Arc<dyn Mark>, options: &RenderingOptions) {
        for context in &mut self.contexts {
            context.render_mark(mark, options);
        }
    }
}
