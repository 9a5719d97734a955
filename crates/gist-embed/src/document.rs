//! In-memory host document.
//!
//! [`HtmlDocument`] stands in for the host's document tree when there is no
//! real editor around: the CLI renders Markdown into it, and tests use it to
//! observe what the pipeline inserted and how the height channel resized it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::dom::{Detached, Element, OutputLocation, SurfaceHost};

#[derive(Debug)]
struct OutputState {
    attached: AtomicBool,
    elements: Mutex<Vec<Element>>,
}

/// A host document owning any number of output locations.
///
/// Output locations stay part of the document until they are detached,
/// even after every [`HtmlOutput`] handle is dropped.
#[derive(Debug, Default)]
pub struct HtmlDocument {
    outputs: Mutex<Vec<Arc<OutputState>>>,
}

impl HtmlDocument {
    /// Create an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new, attached output location in this document.
    pub fn create_output(&self) -> HtmlOutput {
        let state = Arc::new(OutputState {
            attached: AtomicBool::new(true),
            elements: Mutex::new(Vec::new()),
        });
        self.outputs.lock().unwrap().push(Arc::clone(&state));
        HtmlOutput { state }
    }

    /// Output locations that are still attached.
    fn live_outputs(&self) -> Vec<Arc<OutputState>> {
        let mut outputs = self.outputs.lock().unwrap();
        outputs.retain(|state| state.attached.load(Ordering::Acquire));
        outputs.clone()
    }
}

impl SurfaceHost for HtmlDocument {
    fn set_surface_height(&self, surface_id: &str, height: u32) -> bool {
        for output in self.live_outputs() {
            let mut elements = output.elements.lock().unwrap();
            if let Some(element) = elements.iter_mut().find(|e| e.id() == Some(surface_id)) {
                element.set_attr("height", height.to_string());
                return true;
            }
        }
        false
    }
}

/// One output location of an [`HtmlDocument`].
///
/// Clones share the same location.
#[derive(Clone, Debug)]
pub struct HtmlOutput {
    state: Arc<OutputState>,
}

impl HtmlOutput {
    /// Remove this location from the document, destroying its content.
    pub fn detach(&self) {
        self.state.attached.store(false, Ordering::Release);
        self.state.elements.lock().unwrap().clear();
    }

    /// Snapshot of the inserted elements, in insertion order.
    pub fn elements(&self) -> Vec<Element> {
        self.state.elements.lock().unwrap().clone()
    }

    /// Serialize the inserted elements to HTML.
    pub fn to_html(&self) -> String {
        self.state
            .elements
            .lock()
            .unwrap()
            .iter()
            .map(Element::to_html)
            .collect()
    }
}

impl OutputLocation for HtmlOutput {
    fn is_attached(&self) -> bool {
        self.state.attached.load(Ordering::Acquire)
    }

    fn append(&self, element: Element) -> Result<(), Detached> {
        let mut elements = self.state.elements.lock().unwrap();
        // Checked under the lock so a concurrent detach cannot slip in between.
        if !self.is_attached() {
            return Err(Detached);
        }
        elements.push(element);
        Ok(())
    }
}
