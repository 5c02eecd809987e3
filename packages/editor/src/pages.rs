//! # Pages
//!
//! Page-level structure helpers: locating pages with the configured page
//! selector, building blank pages, renumbering, and moving elements between
//! pages or among their siblings.
//!
//! These functions only touch the tree. The session wraps each of them with
//! the structural watch and a history capture.

use crate::config::PageNumberPattern;
use folio_dom::{parse_fragment, Element, Node, NodePath, Selector};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageDirection {
    Prev,
    Next,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveDirection {
    Up,
    Down,
}

/// Where a page-to-page move lands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageTarget {
    Existing(NodePath),
    /// Past the last page; a new page has to be added first
    PastEnd,
    /// Before the first page, or the element is not inside a page
    None,
}

/// All pages in document order
pub fn page_paths(body: &Element, pages: &Selector) -> Vec<NodePath> {
    pages.query_all(body)
}

/// Write each page's number into its page-number element
///
/// Returns how many number elements were updated.
pub fn renumber_pages(
    body: &mut Element,
    pages: &Selector,
    number: &Selector,
    pattern: &PageNumberPattern,
) -> usize {
    let mut updated = 0;
    for (i, page) in page_paths(body, pages).into_iter().enumerate() {
        let Some(target) = number.query_within(body, &page).into_iter().next() else {
            continue;
        };
        if let Some(el) = body.element_at_mut(&target) {
            el.set_text_content(pattern.format(i + 1));
            updated += 1;
        }
    }
    updated
}

/// Parse the blank-page markup and empty every element matching one of the
/// content-removal selectors
pub fn new_page_element(template: &str, content_removal: &[Selector]) -> Option<Element> {
    let mut page = parse_fragment(template).into_iter().find_map(|node| match node {
        Node::Element(el) => Some(el),
        _ => None,
    })?;

    let mut wrapper = Element::new("body");
    wrapper.children.push(Node::Element(page));
    for selector in content_removal {
        for path in selector.query_all(&wrapper) {
            if let Some(el) = wrapper.element_at_mut(&path) {
                el.children.clear();
            }
        }
    }
    page = match wrapper.children.pop() {
        Some(Node::Element(el)) => el,
        _ => return None,
    };
    Some(page)
}

/// Nearest ancestor-or-self of `path` that is a page
pub fn enclosing_page(body: &Element, pages: &Selector, path: &[usize]) -> Option<NodePath> {
    (1..=path.len())
        .rev()
        .map(|depth| &path[..depth])
        .find(|candidate| pages.matches_at(body, candidate))
        .map(<[usize]>::to_vec)
}

/// The page before or after the one enclosing `path`
pub fn neighbour_page(body: &Element, pages: &Selector, path: &[usize], direction: PageDirection) -> PageTarget {
    let Some(current) = enclosing_page(body, pages, path) else {
        return PageTarget::None;
    };
    let all = page_paths(body, pages);
    let Some(index) = all.iter().position(|p| *p == current) else {
        return PageTarget::None;
    };
    match direction {
        PageDirection::Prev if index == 0 => PageTarget::None,
        PageDirection::Prev => PageTarget::Existing(all[index - 1].clone()),
        PageDirection::Next => match all.get(index + 1) {
            Some(next) => PageTarget::Existing(next.clone()),
            None => PageTarget::PastEnd,
        },
    }
}

/// Swap the element at `path` with its previous or next element sibling
///
/// Returns the element's new path, or `None` when there is nothing to swap
/// with.
pub fn move_among_siblings(body: &mut Element, path: &[usize], direction: MoveDirection) -> Option<NodePath> {
    let (index, parent_path) = path.split_last()?;
    let index = *index;
    let parent = body.element_at_mut(parent_path)?;
    if !parent.children.get(index)?.is_element() {
        return None;
    }

    let destination = match direction {
        MoveDirection::Up => (0..index).rev().find(|i| parent.children[*i].is_element())?,
        MoveDirection::Down => (index + 1..parent.children.len()).find(|i| parent.children[*i].is_element())?,
    };
    let node = parent.children.remove(index);
    parent.children.insert(destination, node);

    let mut moved = parent_path.to_vec();
    moved.push(destination);
    Some(moved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NumberSystem;

    fn body(markup: &str) -> Element {
        let mut body = Element::new("body");
        body.children = parse_fragment(markup);
        body
    }

    fn sel(text: &str) -> Selector {
        Selector::parse(text).unwrap()
    }

    const PAGES: &str = concat!(
        r#"<div class="page"><p class="num"></p><p>a</p></div>"#,
        "<hr>",
        r#"<div class="page"><p class="num"></p><p>b</p></div>"#,
    );

    #[test]
    fn test_renumber_with_pattern() {
        let mut body = body(PAGES);
        let pattern = PageNumberPattern {
            prefix: "Page ".into(),
            suffix: "".into(),
            number_system: NumberSystem::Western,
        };
        let updated = renumber_pages(&mut body, &sel(".page"), &sel(".num"), &pattern);
        assert_eq!(updated, 2);
        assert_eq!(body.element_at(&[0, 0]).unwrap().text_content(), "Page 1");
        assert_eq!(body.element_at(&[2, 0]).unwrap().text_content(), "Page 2");
    }

    #[test]
    fn test_new_page_clears_removal_targets() {
        let page = new_page_element(
            r#"<div class="page"><p class="num">1</p><main class="content"><p>old</p></main></div>"#,
            &[sel(".content")],
        )
        .unwrap();
        assert_eq!(
            page.outer_html(),
            r#"<div class="page"><p class="num">1</p><main class="content"></main></div>"#
        );
        assert!(new_page_element("just text", &[]).is_none());
    }

    #[test]
    fn test_neighbour_pages() {
        let body = body(PAGES);
        let pages = sel(".page");
        assert_eq!(
            neighbour_page(&body, &pages, &[0, 1], PageDirection::Next),
            PageTarget::Existing(vec![2])
        );
        assert_eq!(
            neighbour_page(&body, &pages, &[2, 1], PageDirection::Prev),
            PageTarget::Existing(vec![0])
        );
        assert_eq!(neighbour_page(&body, &pages, &[2, 1], PageDirection::Next), PageTarget::PastEnd);
        assert_eq!(neighbour_page(&body, &pages, &[0, 1], PageDirection::Prev), PageTarget::None);
        assert_eq!(neighbour_page(&body, &pages, &[1], PageDirection::Next), PageTarget::None);
    }

    #[test]
    fn test_move_among_siblings_skips_text() {
        let mut body = body("<p>1</p> text <p>2</p><p>3</p>");
        assert_eq!(move_among_siblings(&mut body, &[2], MoveDirection::Up), Some(vec![0]));
        assert_eq!(body.inner_html(), "<p>2</p><p>1</p> text <p>3</p>");

        assert_eq!(move_among_siblings(&mut body, &[1], MoveDirection::Down), Some(vec![3]));
        assert_eq!(body.inner_html(), "<p>2</p> text <p>3</p><p>1</p>");

        assert_eq!(move_among_siblings(&mut body, &[3], MoveDirection::Down), None);
        assert_eq!(move_among_siblings(&mut body, &[0], MoveDirection::Up), None);
    }
}
