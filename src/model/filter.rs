// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Subtree filtering (RFC 6241 §6), element-name oriented.
//!
//! A filter element with no children selects the whole matching subtree.
//! A leaf with text acts as a key-equality predicate on the enclosing
//! list entry. Besides XML fragments, a filter may carry a `select`
//! attribute with a narrow path form — `/a/b[name='x']/c` — supporting a
//! single key-equality predicate per segment; it is expanded into the
//! same fragment representation before matching.

use thiserror::Error;

use crate::proto::xml::XmlElement;

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("bad filter path: {0}")]
    BadPath(String),
}

/// Applies a `<filter>` element to a data tree. `data` is the element
/// whose children are candidate top-level containers (for configuration
/// data this is `<configuration>`). Returns a pruned copy of `data`;
/// when nothing matches, the copy has no children.
pub fn apply_filter(data: &XmlElement, filter: &XmlElement) -> Result<XmlElement, FilterError> {
    let mut fragments: Vec<XmlElement> = filter.children.clone();
    if let Some(path) = filter.attr("select") {
        fragments.push(path_to_fragment(path)?);
    }

    let mut out = XmlElement::new(data.name.clone());
    out.namespace = data.namespace.clone();
    if fragments.is_empty() {
        // An empty filter selects nothing, per the subtree-filtering rules.
        return Ok(out);
    }

    for fragment in &fragments {
        // The fragment may either name the data root itself (e.g.
        // <configuration>) or start directly at a top-level container.
        if fragment.name == data.name {
            let matched = select_children(data, fragment);
            merge_children(&mut out, matched);
        } else {
            for child in data.children_named(&fragment.name) {
                if let Some(matched) = match_element(child, fragment) {
                    merge_children(&mut out, vec![matched]);
                }
            }
        }
    }

    Ok(out)
}

fn merge_children(out: &mut XmlElement, matched: Vec<XmlElement>) {
    for el in matched {
        if !out.children.contains(&el) {
            out.children.push(el);
        }
    }
}

/// Matches one data element against one filter element. Returns the
/// pruned copy when the element passes.
fn match_element(data: &XmlElement, filter: &XmlElement) -> Option<XmlElement> {
    // Content-match leaves act as predicates on this element.
    let predicates: Vec<&XmlElement> = filter
        .children
        .iter()
        .filter(|c| c.children.is_empty() && !c.trimmed_text().is_empty())
        .collect();
    let containment: Vec<&XmlElement> = filter
        .children
        .iter()
        .filter(|c| !c.children.is_empty() || c.trimmed_text().is_empty())
        .collect();

    for predicate in &predicates {
        let matches = data
            .children_named(&predicate.name)
            .any(|c| c.trimmed_text() == predicate.trimmed_text());
        if !matches {
            return None;
        }
    }

    if filter.children.is_empty() {
        // Selection node: the whole subtree passes.
        return Some(data.clone());
    }

    if containment.is_empty() {
        // Only predicates: the whole matching entry passes.
        return Some(data.clone());
    }

    let mut out = XmlElement::new(data.name.clone());
    out.namespace = data.namespace.clone();
    // Key leaves named by predicates are retained in the output so list
    // entries stay identifiable.
    for predicate in &predicates {
        if let Some(key) = data.children_named(&predicate.name).next() {
            out.children.push(key.clone());
        }
    }
    let mut any = false;
    for cont in &containment {
        // An empty leaf in the filter selects that child subtree.
        if cont.children.is_empty() {
            for child in data.children_named(&cont.name) {
                out.children.push(child.clone());
                any = true;
            }
        } else {
            for child in data.children_named(&cont.name) {
                if let Some(matched) = match_element(child, cont) {
                    out.children.push(matched);
                    any = true;
                }
            }
        }
    }
    if !any && predicates.is_empty() {
        return None;
    }
    Some(out)
}

fn select_children(data: &XmlElement, filter: &XmlElement) -> Vec<XmlElement> {
    if filter.children.is_empty() {
        return data.children.clone();
    }
    let mut out = Vec::new();
    for f_child in &filter.children {
        for d_child in data.children_named(&f_child.name) {
            if let Some(matched) = match_element(d_child, f_child) {
                out.push(matched);
            }
        }
    }
    out
}

/// Expands a `/a/b[name='x']/c` path into a nested filter fragment.
fn path_to_fragment(path: &str) -> Result<XmlElement, FilterError> {
    let trimmed = path.trim().trim_start_matches('/');
    if trimmed.is_empty() {
        return Err(FilterError::BadPath(path.to_string()));
    }

    let mut segments = Vec::new();
    for raw_segment in split_segments(trimmed) {
        let (name, predicate) = parse_segment(&raw_segment)
            .ok_or_else(|| FilterError::BadPath(path.to_string()))?;
        segments.push((name, predicate));
    }

    let mut fragment: Option<XmlElement> = None;
    for (name, predicate) in segments.into_iter().rev() {
        let mut el = XmlElement::new(name);
        if let Some((key, value)) = predicate {
            let mut key_el = XmlElement::new(key);
            key_el.text = value;
            el.children.push(key_el);
        }
        if let Some(inner) = fragment.take() {
            el.children.push(inner);
        }
        fragment = Some(el);
    }
    fragment.ok_or_else(|| FilterError::BadPath(path.to_string()))
}

/// Splits a path on `/`, except inside a `[...]` predicate, so keys like
/// `ge-0/0/0` survive.
fn split_segments(path: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    for c in path.chars() {
        match c {
            '[' => {
                depth += 1;
                current.push(c);
            },
            ']' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            },
            '/' if depth == 0 => {
                segments.push(std::mem::take(&mut current));
            },
            c => current.push(c),
        }
    }
    segments.push(current);
    segments
}

/// Parses one path segment of the form `name` or `name[key='value']`.
/// At most one predicate per segment is accepted.
fn parse_segment(segment: &str) -> Option<(String, Option<(String, String)>)> {
    let segment = segment.trim();
    if segment.is_empty() {
        return None;
    }
    match segment.split_once('[') {
        None => {
            if segment.contains(']') {
                return None;
            }
            Some((segment.to_string(), None))
        },
        Some((name, rest)) => {
            let predicate = rest.strip_suffix(']')?;
            if predicate.contains('[') {
                return None;
            }
            let (key, value) = predicate.split_once('=')?;
            let value = value.trim();
            let value = value
                .strip_prefix('\'')
                .and_then(|v| v.strip_suffix('\''))
                .or_else(|| {
                    value.strip_prefix('"').and_then(|v| v.strip_suffix('"'))
                })?;
            Some((
                name.trim().to_string(),
                Some((key.trim().to_string(), value.to_string())),
            ))
        },
    }
}
