//! # Identity Tagger
//!
//! Assigns and repairs the `data-editor-id` identity of every element under
//! the root container.
//!
//! Identities look like `element-{unix millis}-{sequence}-{random hex}`. The
//! sequence is monotonic per tagger, so two identities from the same tagger
//! never collide; the timestamp and random part keep identities from
//! different sessions apart.
//!
//! The root container itself is never tagged.

use chrono::Utc;
use folio_dom::{Element, Node};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{HashMap, HashSet};

/// Generates fresh identities and applies them to trees
#[derive(Debug)]
pub struct IdentityTagger {
    sequence: u64,
    rng: StdRng,
}

impl IdentityTagger {
    pub fn new() -> Self {
        Self {
            sequence: 0,
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic random component, for tests
    pub fn with_seed(seed: u64) -> Self {
        Self {
            sequence: 0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn fresh(&mut self) -> String {
        let seq = self.sequence;
        self.sequence += 1;
        format!(
            "element-{}-{}-{:08x}",
            Utc::now().timestamp_millis(),
            seq,
            self.rng.gen::<u32>()
        )
    }

    /// Give `el` a fresh identity, replacing any existing one
    pub fn tag_one(&mut self, el: &mut Element) -> String {
        let id = self.fresh();
        el.set_identity(id.clone());
        id
    }

    /// Tag every untagged descendant of `root` and repair duplicates
    ///
    /// Later occurrences (document order) of a repeated identity receive
    /// fresh values. Returns the number of identities assigned.
    pub fn tag_all(&mut self, root: &mut Element) -> usize {
        let mut seen = HashSet::new();
        let mut assigned = 0;
        root.for_each_descendant_mut(|el| {
            let keep = el
                .identity()
                .map(|id| seen.insert(id.to_string()))
                .unwrap_or(false);
            if !keep {
                let id = self.fresh();
                seen.insert(id.clone());
                el.set_identity(id);
                assigned += 1;
            }
        });
        assigned
    }

    /// Tag the freshly inserted subtree at `path`
    ///
    /// Identities that collide with elements outside the subtree are treated
    /// as missing. A missing path is a no-op; the empty path tags everything.
    pub fn tag_inserted(&mut self, root: &mut Element, path: &[usize]) -> usize {
        if path.is_empty() {
            return self.tag_all(root);
        }
        if root.element_at(path).is_none() {
            return 0;
        }

        let mut taken = HashSet::new();
        root.for_each_descendant(|el, el_path| {
            if !el_path.starts_with(path) {
                if let Some(id) = el.identity() {
                    taken.insert(id.to_string());
                }
            }
        });

        let Some(subtree) = root.element_at_mut(path) else {
            return 0;
        };
        let mut assigned = 0;
        let mut visit = |el: &mut Element| {
            let keep = el
                .identity()
                .map(|id| taken.insert(id.to_string()))
                .unwrap_or(false);
            if !keep {
                let id = self.fresh();
                taken.insert(id.clone());
                el.set_identity(id);
                assigned += 1;
            }
        };
        visit(&mut *subtree);
        subtree.for_each_descendant_mut(visit);
        assigned
    }

    /// Give every element of the subtree a fresh identity
    ///
    /// Returns the old → new mapping for elements that carried an identity.
    pub fn retag_subtree(&mut self, el: &mut Element) -> HashMap<String, String> {
        let mut mapping = HashMap::new();
        let mut visit = |el: &mut Element| {
            let old = el.identity().map(str::to_string);
            let new = self.fresh();
            el.set_identity(new.clone());
            if let Some(old) = old {
                mapping.insert(old, new);
            }
        };
        visit(&mut *el);
        el.for_each_descendant_mut(visit);
        mapping
    }

    /// Retag every element among a list of detached nodes
    pub fn retag_nodes(&mut self, nodes: &mut [Node]) -> HashMap<String, String> {
        let mut mapping = HashMap::new();
        for node in nodes {
            if let Node::Element(el) = node {
                mapping.extend(self.retag_subtree(el));
            }
        }
        mapping
    }
}

impl Default for IdentityTagger {
    fn default() -> Self {
        Self::new()
    }
}

/// Identities appearing on more than one element under `root`
pub fn duplicate_identities(root: &Element) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut duplicates = Vec::new();
    root.for_each_descendant(|el, _| {
        if let Some(id) = el.identity() {
            if !seen.insert(id) && !duplicates.iter().any(|d: &String| d == id) {
                duplicates.push(id.to_string());
            }
        }
    });
    duplicates
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_dom::parse_fragment;

    fn body(markup: &str) -> Element {
        let mut body = Element::new("body");
        body.children = parse_fragment(markup);
        body
    }

    #[test]
    fn test_fresh_identity_format() {
        let mut tagger = IdentityTagger::with_seed(7);
        let id = tagger.fresh();
        let parts: Vec<&str> = id.split('-').collect();
        assert_eq!(parts[0], "element");
        assert_eq!(parts[2], "0");
        assert_eq!(parts[3].len(), 8);
        assert_ne!(tagger.fresh(), id);
    }

    #[test]
    fn test_tag_all_skips_root_and_tags_descendants() {
        let mut root = body("<div><p>a</p><p>b</p></div>");
        let mut tagger = IdentityTagger::new();
        assert_eq!(tagger.tag_all(&mut root), 3);
        assert!(root.identity().is_none());
        assert_eq!(root.identities().len(), 3);
    }

    #[test]
    fn test_tag_all_is_idempotent() {
        let mut root = body("<div><p>a</p></div>");
        let mut tagger = IdentityTagger::new();
        tagger.tag_all(&mut root);
        let before = root.identities();
        assert_eq!(tagger.tag_all(&mut root), 0);
        assert_eq!(root.identities(), before);
    }

    #[test]
    fn test_tag_all_repairs_duplicates() {
        let mut root = body(r#"<p data-editor-id="x">a</p><p data-editor-id="x">b</p>"#);
        let mut tagger = IdentityTagger::new();
        assert_eq!(tagger.tag_all(&mut root), 1);
        assert_eq!(root.element_at(&[0]).unwrap().identity(), Some("x"));
        assert_ne!(root.element_at(&[1]).unwrap().identity(), Some("x"));
        assert!(duplicate_identities(&root).is_empty());
    }

    #[test]
    fn test_tag_inserted_repairs_collisions_with_outside() {
        let mut root = body(r#"<p data-editor-id="keep">a</p><div data-editor-id="keep"><b>x</b></div>"#);
        let mut tagger = IdentityTagger::new();
        assert_eq!(tagger.tag_inserted(&mut root, &[1]), 2);
        assert_eq!(root.element_at(&[0]).unwrap().identity(), Some("keep"));
        assert_ne!(root.element_at(&[1]).unwrap().identity(), Some("keep"));
        assert!(duplicate_identities(&root).is_empty());
    }

    #[test]
    fn test_tag_inserted_missing_path_is_noop() {
        let mut root = body("<p>a</p>");
        let mut tagger = IdentityTagger::new();
        assert_eq!(tagger.tag_inserted(&mut root, &[4, 2]), 0);
        assert!(root.identities().is_empty());
    }

    #[test]
    fn test_retag_subtree_maps_old_to_new() {
        let mut root = body(r#"<div data-editor-id="a"><span data-editor-id="b">x</span><i>y</i></div>"#);
        let mut tagger = IdentityTagger::new();
        let div = root.element_at_mut(&[0]).unwrap();
        let mapping = tagger.retag_subtree(div);
        assert_eq!(mapping.len(), 2);
        let new_b = &mapping["b"];
        assert_eq!(root.find(new_b).unwrap().text_content(), "x");
        assert!(root.find("a").is_none());
        assert_eq!(root.identities().len(), 3);
    }
}
