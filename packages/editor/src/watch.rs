//! # Structural Change Watch
//!
//! Explicit post-mutation hooks for code paths that insert nodes.
//!
//! ## Design
//!
//! Every mutator that adds nodes to the tree (template instantiation, AI
//! replacement, list conversion, pasted markup, history restore) reports an
//! [`InsertionEvent`] to the [`StructuralWatch`], which fans it out to its
//! observers:
//!
//! - [`TagInsertedNodes`]: tags new subtrees so they are addressable
//! - [`PageCounter`]: recounts the pages among the root's direct children
//!
//! Observers are idempotent: an event for already-tagged nodes changes
//! nothing. While the watch is suspended (history restore), events are
//! dropped and counted instead of delivered.
//!
//! ```rust,ignore
//! let mut watch = StructuralWatch::with_defaults(page_selector);
//! body.children.push(new_page);
//! let report = watch.notify(
//!     &InsertionEvent::Inserted { parent: vec![], index: n, count: 1 },
//!     &mut body,
//!     &mut tagger,
//! );
//! ```

use crate::identity::IdentityTagger;
use folio_dom::{Element, NodePath, Selector};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// What was inserted, and where
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InsertionEvent {
    /// `count` children were inserted under `parent` starting at `index`
    Inserted {
        parent: NodePath,
        index: usize,
        count: usize,
    },

    /// All children of `parent` were replaced
    ChildrenReplaced { parent: NodePath },

    /// The whole root container was rebuilt
    DocumentReplaced,
}

impl InsertionEvent {
    /// Whether the event touches the root's direct children
    pub fn touches_root(&self) -> bool {
        match self {
            InsertionEvent::Inserted { parent, .. } => parent.is_empty(),
            InsertionEvent::ChildrenReplaced { parent } => parent.is_empty(),
            InsertionEvent::DocumentReplaced => true,
        }
    }
}

/// Mutable state handed to observers
pub struct WatchContext<'a> {
    pub body: &'a mut Element,
    pub tagger: &'a mut IdentityTagger,
    pub report: WatchReport,
}

/// Summary of what observers did for one event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchReport {
    /// Identities assigned
    pub tagged: usize,
    /// Page count, when it was recomputed
    pub page_count: Option<usize>,
    /// The watch was suspended and the event was dropped
    pub dropped: bool,
}

/// Subscriber to insertion events
pub trait InsertionObserver: std::fmt::Debug {
    fn observe(&mut self, event: &InsertionEvent, cx: &mut WatchContext<'_>);
}

/// Tags every element of an inserted subtree that lacks a valid identity
#[derive(Debug, Default)]
pub struct TagInsertedNodes;

impl InsertionObserver for TagInsertedNodes {
    fn observe(&mut self, event: &InsertionEvent, cx: &mut WatchContext<'_>) {
        match event {
            InsertionEvent::Inserted {
                parent,
                index,
                count,
            } => {
                for i in *index..index + count {
                    let mut path = parent.clone();
                    path.push(i);
                    cx.report.tagged += cx.tagger.tag_inserted(cx.body, &path);
                }
            }
            InsertionEvent::ChildrenReplaced { parent } => {
                let child_count = cx
                    .body
                    .element_at(parent)
                    .map(|el| el.children.len())
                    .unwrap_or(0);
                for i in 0..child_count {
                    let mut path = parent.clone();
                    path.push(i);
                    cx.report.tagged += cx.tagger.tag_inserted(cx.body, &path);
                }
            }
            InsertionEvent::DocumentReplaced => {
                cx.report.tagged += cx.tagger.tag_all(cx.body);
            }
        }
    }
}

/// Counts direct children of the root matching the page selector
#[derive(Debug)]
pub struct PageCounter {
    selector: Option<Selector>,
}

impl PageCounter {
    pub fn new(selector: Option<Selector>) -> Self {
        Self { selector }
    }

    pub fn count(&self, body: &Element) -> usize {
        let Some(selector) = &self.selector else {
            return 0;
        };
        (0..body.children.len())
            .filter(|i| body.children[*i].is_element() && selector.matches_at(body, &[*i]))
            .count()
    }
}

impl InsertionObserver for PageCounter {
    fn observe(&mut self, event: &InsertionEvent, cx: &mut WatchContext<'_>) {
        if event.touches_root() {
            cx.report.page_count = Some(self.count(cx.body));
        }
    }
}

/// Fans insertion events out to observers
#[derive(Debug, Default)]
pub struct StructuralWatch {
    observers: Vec<Box<dyn InsertionObserver>>,
    suspended: bool,
    dropped: usize,
}

impl StructuralWatch {
    /// Watch with no observers
    pub fn new() -> Self {
        Self::default()
    }

    /// Watch with the built-in tagging and page-count observers
    pub fn with_defaults(page_selector: Option<Selector>) -> Self {
        let mut watch = Self::new();
        watch.add_observer(Box::new(TagInsertedNodes));
        watch.add_observer(Box::new(PageCounter::new(page_selector)));
        watch
    }

    pub fn add_observer(&mut self, observer: Box<dyn InsertionObserver>) {
        self.observers.push(observer);
    }

    pub fn suspend(&mut self) {
        self.suspended = true;
    }

    pub fn resume(&mut self) {
        self.suspended = false;
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// Events dropped while suspended
    pub fn dropped_events(&self) -> usize {
        self.dropped
    }

    pub fn notify(
        &mut self,
        event: &InsertionEvent,
        body: &mut Element,
        tagger: &mut IdentityTagger,
    ) -> WatchReport {
        if self.suspended {
            self.dropped += 1;
            debug!(?event, "Structural watch suspended, dropping event");
            return WatchReport {
                dropped: true,
                ..WatchReport::default()
            };
        }

        let mut cx = WatchContext {
            body,
            tagger,
            report: WatchReport::default(),
        };
        for observer in &mut self.observers {
            observer.observe(event, &mut cx);
        }
        if cx.report.tagged > 0 {
            debug!(tagged = cx.report.tagged, "Tagged inserted nodes");
        }
        cx.report
    }
}
