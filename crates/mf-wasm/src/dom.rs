//! `PageDriver` over the live document.

use mf_core::{Candidate, CandidateId, InsertedNode, PageDriver, PageProfile};
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlElement};

pub struct DomPage<'p> {
    document: Document,
    profile: &'p PageProfile,
    /// Elements of the current scan, indexed by candidate id.
    elements: Vec<HtmlElement>,
}

impl<'p> DomPage<'p> {
    pub fn new(document: Document, profile: &'p PageProfile) -> Self {
        Self {
            document,
            profile,
            elements: Vec::new(),
        }
    }

    fn indicator(&self) -> Option<Element> {
        let selector = format!(".{}", self.profile.indicator_class);
        self.document.query_selector(&selector).ok().flatten()
    }

    fn create_indicator(&self) -> Option<Element> {
        let body = self.document.body()?;
        let indicator = self.document.create_element("div").ok()?;
        let class = &self.profile.indicator_class;
        indicator.set_class_name(class);
        indicator.set_inner_html(&format!(
            "<span class=\"{class}-icon\">&#128269;</span><span class=\"{class}-text\">Filters active</span>"
        ));
        body.append_child(&indicator).ok()?;
        log::debug!("Adding filter indicator");
        Some(indicator)
    }
}

impl PageDriver for DomPage<'_> {
    fn enumerate_candidates(&mut self) -> Vec<Candidate> {
        self.elements.clear();

        let list = match self.document.query_selector_all(&self.profile.candidate_selector()) {
            Ok(list) => list,
            Err(_) => {
                log::warn!("Candidate selector rejected by the document");
                return Vec::new();
            }
        };

        let mut candidates = Vec::with_capacity(list.length() as usize);
        for i in 0..list.length() {
            let Some(node) = list.item(i) else { continue };
            let Ok(element) = node.dyn_into::<HtmlElement>() else { continue };

            let title = element
                .query_selector(&self.profile.title_selector)
                .ok()
                .flatten()
                .and_then(|t| t.text_content());
            let text = element.text_content().unwrap_or_default();

            candidates.push(Candidate::new(self.elements.len() as CandidateId, title, &text));
            self.elements.push(element);
        }
        candidates
    }

    fn set_visibility(&mut self, id: CandidateId, visible: bool) {
        let Some(element) = self.elements.get(id as usize) else { return };
        let style = element.style();
        let result = if visible {
            style.remove_property("display").map(|_| ())
        } else {
            style.set_property("display", "none")
        };
        if result.is_err() {
            log::warn!("Failed to set visibility on market card #{}", id);
        }
    }

    fn show_indicator(&mut self, hidden_count: usize) {
        let Some(indicator) = self.indicator().or_else(|| self.create_indicator()) else { return };
        let selector = format!(".{}-text", self.profile.indicator_class);
        if let Ok(Some(text)) = indicator.query_selector(&selector) {
            text.set_text_content(Some(&PageProfile::indicator_text(hidden_count)));
        }
    }

    fn remove_indicator(&mut self) {
        if let Some(indicator) = self.indicator() {
            indicator.remove();
        }
    }
}

/// Summarize an added DOM node for the watcher.
pub fn inserted_node(node: &wasm_bindgen::JsValue, profile: &PageProfile) -> InsertedNode {
    let Some(element) = node.dyn_ref::<Element>() else {
        return InsertedNode::default();
    };

    let list = element.class_list();
    let classes = (0..list.length()).filter_map(|i| list.item(i)).collect::<Vec<_>>();
    let contains_candidate = element
        .query_selector(&profile.candidate_selector())
        .ok()
        .flatten()
        .is_some();

    InsertedNode {
        is_element: true,
        classes,
        contains_candidate,
    }
}
