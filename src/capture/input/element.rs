//! Element descriptors for click targets

use crate::capture::input::types::{ElementDescriptor, ElementInfo, UNKNOWN_ELEMENT};
use crate::capture::signal::ElementNode;

pub const DEFAULT_SELECTOR_MAX_DEPTH: usize = 3;
pub const DEFAULT_IDENTIFIER_TEXT_LIMIT: usize = 20;

/// Describe the click target at the head of `path`.
///
/// The identifier is the best available of `#id`, the joined class list, the
/// trimmed text content (first `text_limit` characters) and the tag name.
pub fn describe_element(path: &[ElementNode], max_depth: usize, text_limit: usize) -> ElementInfo {
    let Some(target) = path.first().filter(|node| is_element(node)) else {
        return ElementInfo::unknown();
    };

    let tag = target.tag_name.to_lowercase();

    let id = target
        .id
        .as_deref()
        .filter(|id| !id.is_empty())
        .map(|id| format!("#{}", id))
        .unwrap_or_default();

    let classes: String = target
        .class_list
        .iter()
        .filter(|c| !c.is_empty())
        .map(|c| format!(".{}", c))
        .collect();

    let text: String = target
        .text_content
        .as_deref()
        .map(|t| t.trim().chars().take(text_limit).collect())
        .unwrap_or_default();

    let identifier = [id, classes, text]
        .into_iter()
        .find(|candidate| !candidate.is_empty())
        .unwrap_or_else(|| tag.clone());

    ElementInfo::Element(ElementDescriptor {
        tag,
        identifier,
        full_selector: full_selector(path, max_depth),
    })
}

/// CSS-like selector from the target upward, at most `max_depth` levels,
/// stopping at the document body.
pub fn full_selector(path: &[ElementNode], max_depth: usize) -> String {
    if !path.first().map(is_element).unwrap_or(false) {
        return UNKNOWN_ELEMENT.to_string();
    }

    let mut parts: Vec<String> = path
        .iter()
        .take_while(|node| is_element(node) && !node.is_root_container())
        .take(max_depth)
        .map(node_selector)
        .collect();

    parts.reverse();
    parts.join(" > ")
}

fn node_selector(node: &ElementNode) -> String {
    let mut selector = node.tag_name.to_lowercase();

    match node.id.as_deref().filter(|id| !id.is_empty()) {
        Some(id) => {
            selector.push('#');
            selector.push_str(id);
        }
        None => {
            let classes: Vec<&str> = node
                .class_list
                .iter()
                .map(String::as_str)
                .filter(|c| !c.is_empty())
                .collect();
            if !classes.is_empty() {
                selector.push('.');
                selector.push_str(&classes.join("."));
            }
        }
    }

    selector
}

fn is_element(node: &ElementNode) -> bool {
    !node.tag_name.trim().is_empty()
}
