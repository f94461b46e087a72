// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Guarded XML reading on top of `quick-xml`.
//!
//! Every inbound NETCONF document goes through [`parse_guarded`], which
//! rejects DOCTYPE declarations, caps document size, nesting depth,
//! element count and per-element attribute count, and resolves namespace
//! prefixes into plain URIs. The result is an owned [`XmlElement`] tree
//! that the envelope codecs and handlers traverse without touching the
//! parser again.

use std::collections::HashMap;

use quick_xml::{Reader, events::Event};
use thiserror::Error;

use crate::{
    cfg::config::XmlConfig,
    proto::error::RpcError,
};

#[derive(Debug, Error)]
pub enum XmlGuardError {
    #[error("document exceeds {cap} bytes")]
    DocTooLarge { cap: usize },
    #[error("DOCTYPE declarations are forbidden")]
    DoctypeForbidden,
    #[error("element depth exceeds {cap}")]
    TooDeep { cap: usize },
    #[error("element count exceeds {cap}")]
    TooManyElements { cap: usize },
    #[error("element {element} carries more than {cap} attributes")]
    TooManyAttributes { cap: usize, element: String },
    #[error("malformed XML: {0}")]
    Malformed(String),
}

impl XmlGuardError {
    /// Every guard failure surfaces to the peer as `malformed-message`.
    pub fn to_rpc_error(&self) -> RpcError {
        let err = RpcError::malformed_message(self.to_string());
        match self {
            XmlGuardError::DoctypeForbidden => err.with_bad_element("DOCTYPE"),
            _ => err,
        }
    }
}

/// One parsed element: local name, resolved namespace URI (empty when the
/// element is in no namespace), attributes as written (minus xmlns
/// declarations), child elements and concatenated text content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    pub namespace: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<XmlElement>,
    pub text: String,
}

impl XmlElement {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Trimmed text content of a child leaf, if the child exists.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(|c| c.text.trim())
    }

    pub fn has_element_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn trimmed_text(&self) -> &str {
        self.text.trim()
    }
}

struct Frame {
    element: XmlElement,
    ns_declared: Vec<(String, Option<String>)>,
}

struct NsScope {
    /// prefix -> uri; the empty prefix is the default namespace.
    bindings: HashMap<String, String>,
}

impl NsScope {
    fn new() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }

    fn resolve(&self, prefix: &str) -> String {
        self.bindings.get(prefix).cloned().unwrap_or_default()
    }

    /// Applies declarations and returns the previous values for undo.
    fn push(&mut self, decls: &[(String, String)]) -> Vec<(String, Option<String>)> {
        let mut saved = Vec::with_capacity(decls.len());
        for (prefix, uri) in decls {
            saved.push((prefix.clone(), self.bindings.get(prefix).cloned()));
            self.bindings.insert(prefix.clone(), uri.clone());
        }
        saved
    }

    fn pop(&mut self, saved: Vec<(String, Option<String>)>) {
        for (prefix, old) in saved.into_iter().rev() {
            match old {
                Some(uri) => {
                    self.bindings.insert(prefix, uri);
                },
                None => {
                    self.bindings.remove(&prefix);
                },
            }
        }
    }
}

/// Parses a complete XML document under the configured guard limits and
/// returns its root element.
pub fn parse_guarded(doc: &[u8], limits: &XmlConfig) -> Result<XmlElement, XmlGuardError> {
    if doc.len() > limits.max_document_bytes {
        return Err(XmlGuardError::DocTooLarge {
            cap: limits.max_document_bytes,
        });
    }

    let mut reader = Reader::from_reader(doc);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();
    let mut scope = NsScope::new();
    let mut root: Option<XmlElement> = None;
    let mut element_count = 0usize;

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| XmlGuardError::Malformed(e.to_string()))?;
        match event {
            Event::DocType(_) => return Err(XmlGuardError::DoctypeForbidden),
            Event::Start(ref start) => {
                if root.is_some() && stack.is_empty() {
                    return Err(XmlGuardError::Malformed(
                        "content after document root".to_string(),
                    ));
                }
                if stack.len() + 1 > limits.max_depth {
                    return Err(XmlGuardError::TooDeep {
                        cap: limits.max_depth,
                    });
                }
                element_count += 1;
                if element_count > limits.max_elements {
                    return Err(XmlGuardError::TooManyElements {
                        cap: limits.max_elements,
                    });
                }
                let frame = open_element(start, limits, &mut scope)?;
                stack.push(frame);
            },
            Event::Empty(ref start) => {
                if root.is_some() && stack.is_empty() {
                    return Err(XmlGuardError::Malformed(
                        "content after document root".to_string(),
                    ));
                }
                if stack.len() + 1 > limits.max_depth {
                    return Err(XmlGuardError::TooDeep {
                        cap: limits.max_depth,
                    });
                }
                element_count += 1;
                if element_count > limits.max_elements {
                    return Err(XmlGuardError::TooManyElements {
                        cap: limits.max_elements,
                    });
                }
                let frame = open_element(start, limits, &mut scope)?;
                scope.pop(frame.ns_declared);
                attach(&mut stack, &mut root, frame.element)?;
            },
            Event::End(_) => {
                let frame = stack.pop().ok_or_else(|| {
                    XmlGuardError::Malformed("unbalanced end tag".to_string())
                })?;
                scope.pop(frame.ns_declared);
                attach(&mut stack, &mut root, frame.element)?;
            },
            Event::Text(ref t) => {
                let text = t
                    .unescape()
                    .map_err(|e| XmlGuardError::Malformed(e.to_string()))?;
                if let Some(frame) = stack.last_mut() {
                    frame.element.text.push_str(&text);
                } else if !text.trim().is_empty() {
                    return Err(XmlGuardError::Malformed(
                        "text outside document root".to_string(),
                    ));
                }
            },
            Event::CData(ref c) => {
                let bytes: &[u8] = c;
                let text = std::str::from_utf8(bytes)
                    .map_err(|e| XmlGuardError::Malformed(e.to_string()))?;
                if let Some(frame) = stack.last_mut() {
                    frame.element.text.push_str(text);
                }
            },
            Event::Decl(_) | Event::Comment(_) | Event::PI(_) => {},
            Event::Eof => break,
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(XmlGuardError::Malformed("truncated document".to_string()));
    }
    root.ok_or_else(|| XmlGuardError::Malformed("empty document".to_string()))
}

fn attach(
    stack: &mut [Frame],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<(), XmlGuardError> {
    match stack.last_mut() {
        Some(parent) => {
            parent.element.children.push(element);
            Ok(())
        },
        None => {
            if root.is_some() {
                return Err(XmlGuardError::Malformed(
                    "multiple document roots".to_string(),
                ));
            }
            *root = Some(element);
            Ok(())
        },
    }
}

fn open_element(
    start: &quick_xml::events::BytesStart<'_>,
    limits: &XmlConfig,
    scope: &mut NsScope,
) -> Result<Frame, XmlGuardError> {
    let raw_name = String::from_utf8_lossy(start.name().as_ref()).into_owned();

    let mut attr_count = 0usize;
    let mut ns_decls: Vec<(String, String)> = Vec::new();
    let mut attrs: Vec<(String, String)> = Vec::new();

    for attr in start.attributes() {
        let attr = attr.map_err(|e| XmlGuardError::Malformed(e.to_string()))?;
        attr_count += 1;
        if attr_count > limits.max_attributes {
            return Err(XmlGuardError::TooManyAttributes {
                cap: limits.max_attributes,
                element: raw_name.clone(),
            });
        }
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| XmlGuardError::Malformed(e.to_string()))?
            .into_owned();
        if key == "xmlns" {
            ns_decls.push((String::new(), value));
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            ns_decls.push((prefix.to_string(), value));
        } else {
            attrs.push((key, value));
        }
    }

    let saved = scope.push(&ns_decls);

    let (prefix, local) = match raw_name.split_once(':') {
        Some((p, l)) => (p.to_string(), l.to_string()),
        None => (String::new(), raw_name),
    };
    let namespace = scope.resolve(&prefix);

    Ok(Frame {
        element: XmlElement {
            name: local,
            namespace,
            attrs,
            children: Vec::new(),
            text: String::new(),
        },
        ns_declared: saved,
    })
}
