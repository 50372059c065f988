// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Test fixtures shared across modules: inert and recording marks.

extern crate alloc;

use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::RefCell;

use trellis_core::{Datum, Rect, Scalar};

use crate::mark::{Mark, MarkId, RenderingOptions};

/// A datum with the given numeric fields.
pub(crate) fn record(fields: &[(&str, f64)]) -> Datum {
    let mut datum = Datum::new();
    for (key, value) in fields {
        datum.insert((*key).into(), Scalar::Number(*value));
    }
    datum
}

/// A mark that ignores every call.
#[derive(Debug)]
pub(crate) struct NullMark {
    id: MarkId,
}

impl NullMark {
    pub(crate) fn new(raw: u64) -> Self {
        Self {
            id: MarkId::from_raw(raw),
        }
    }
}

impl Mark for NullMark {
    fn id(&self) -> MarkId {
        self.id
    }

    fn prepare_render(&self) {}

    fn set_viewport(&self, _coords: Rect) {}

    fn draw(&self, _options: &RenderingOptions) {}
}

/// One observed mark call.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum MarkEvent {
    Prepare(MarkId),
    Viewport(MarkId, Rect),
    Draw(MarkId, Option<String>),
}

/// A log shared between recording marks and the test body.
pub(crate) type EventLog = Rc<RefCell<Vec<MarkEvent>>>;

/// A mark that appends every call to a shared log.
#[derive(Debug)]
pub(crate) struct RecordingMark {
    id: MarkId,
    log: EventLog,
}

impl RecordingMark {
    pub(crate) fn new(raw: u64, log: EventLog) -> Self {
        Self {
            id: MarkId::from_raw(raw),
            log,
        }
    }
}

impl Mark for RecordingMark {
    fn id(&self) -> MarkId {
        self.id
    }

    fn prepare_render(&self) {
        self.log.borrow_mut().push(MarkEvent::Prepare(self.id));
    }

    fn set_viewport(&self, coords: Rect) {
        self.log
            .borrow_mut()
            .push(MarkEvent::Viewport(self.id, coords));
    }

    fn draw(&self, options: &RenderingOptions) {
        self.log
            .borrow_mut()
            .push(MarkEvent::Draw(self.id, options.facet_id.clone()));
    }
}
