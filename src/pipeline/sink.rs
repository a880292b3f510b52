//! Page delivery and progress accounting shared by every renderer.
//!
//! Renderers hand each finished page (or the reason it was skipped) to a
//! [`PageSink`]. The sink forwards pages to whoever is collecting them (a
//! `Vec` for [`crate::convert`], an mpsc channel for [`crate::stream`]),
//! fires the progress callback, and counts what happened for the stats.

use crate::error::PageError;
use crate::output::DocumentPage;
use crate::progress::ProgressCallback;
use tracing::{debug, warn};

pub struct PageSink<'a> {
    deliver: Box<dyn FnMut(DocumentPage) -> bool + Send + 'a>,
    progress: Option<ProgressCallback>,
    total: usize,
    attempted: usize,
    produced: usize,
    errors: Vec<PageError>,
    closed: bool,
}

impl<'a> PageSink<'a> {
    /// `deliver` returns `false` once the receiver has gone away; the sink
    /// then reports [`PageSink::is_closed`] so renderers can stop early.
    pub fn new(
        progress: Option<ProgressCallback>,
        deliver: impl FnMut(DocumentPage) -> bool + Send + 'a,
    ) -> Self {
        Self {
            deliver: Box::new(deliver),
            progress,
            total: 0,
            attempted: 0,
            produced: 0,
            errors: Vec::new(),
            closed: false,
        }
    }

    /// Collect pages into `pages`.
    pub fn collecting(progress: Option<ProgressCallback>, pages: &'a mut Vec<DocumentPage>) -> Self {
        Self::new(progress, move |page| {
            pages.push(page);
            true
        })
    }

    /// Announce how many pages will be attempted.
    pub fn start(&mut self, total: usize) {
        self.total = total;
        if let Some(cb) = &self.progress {
            cb.on_conversion_start(total);
        }
    }

    /// A page rendered and encoded successfully.
    pub fn page(&mut self, page: DocumentPage) {
        self.attempted += 1;
        self.produced += 1;
        let index = page.index;
        debug!("Page {} ready ({}x{})", index, page.width, page.height);
        if !self.closed && !(self.deliver)(page) {
            debug!("Page receiver dropped; remaining pages will not be delivered");
            self.closed = true;
        }
        if let Some(cb) = &self.progress {
            cb.on_page_complete(index, self.total, self.fraction());
        }
    }

    /// A page was skipped; conversion continues.
    pub fn skip(&mut self, error: PageError) {
        self.attempted += 1;
        warn!("{}", error);
        if let Some(cb) = &self.progress {
            cb.on_page_skipped(error.page(), self.total, &error.to_string());
        }
        self.errors.push(error);
    }

    /// Fire the completion event and hand back the counters.
    pub fn finish(self) -> SinkSummary {
        if let Some(cb) = &self.progress {
            cb.on_conversion_complete(self.total, self.produced);
        }
        SinkSummary {
            total: self.total,
            produced: self.produced,
            errors: self.errors,
        }
    }

    /// Completed (produced or skipped) over total.
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            1.0
        } else {
            self.attempted as f32 / self.total as f32
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

/// What a sink saw over one conversion.
#[derive(Debug, Clone, Default)]
pub struct SinkSummary {
    pub total: usize,
    pub produced: usize,
    pub errors: Vec<PageError>,
}
