// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Conversion between the typed configuration tree and its XML view, the
//! `<configuration>` element exchanged in get-config/edit-config bodies.
//!
//! Inbound conversion is schema-strict: an element outside the allowlist
//! rejects the whole document with `unknown-element`, missing list keys
//! with `missing-element`, bad scalars with `invalid-value`.

use quick_xml::escape::escape;
use thiserror::Error;

use crate::{
    model::tree::{
        Bgp, ConfigTree, Interface, Ospf, OspfInterface, StaticRoute, Unit,
    },
    proto::{error::RpcError, xml::XmlElement},
};

#[derive(Debug, Error)]
pub enum ViewError {
    #[error("unknown element: {0}")]
    UnknownElement(String),
    #[error("missing key element {key} under {parent}")]
    MissingKey { parent: &'static str, key: &'static str },
    #[error("bad value {value:?} for {what}")]
    BadValue { what: &'static str, value: String },
}

impl ViewError {
    pub fn to_rpc_error(&self) -> RpcError {
        match self {
            ViewError::UnknownElement(name) => RpcError::unknown_element(name.clone()),
            ViewError::MissingKey { key, .. } => RpcError::missing_element(*key),
            ViewError::BadValue { .. } => RpcError::invalid_value(self.to_string()),
        }
    }
}

/// Builds the `<configuration>` element for the given tree.
pub fn tree_to_element(tree: &ConfigTree) -> XmlElement {
    let mut root = XmlElement::new("configuration");

    if let Some(host_name) = &tree.system.host_name {
        let mut system = XmlElement::new("system");
        system.children.push(leaf("host-name", host_name));
        root.children.push(system);
    }

    if !tree.interfaces.is_empty() {
        let mut interfaces = XmlElement::new("interfaces");
        for (name, interface) in &tree.interfaces {
            interfaces.children.push(interface_to_element(name, interface));
        }
        root.children.push(interfaces);
    }

    let ro = &tree.routing_options;
    if ro.router_id.is_some() || ro.autonomous_system.is_some() || !ro.static_routes.is_empty()
    {
        let mut routing = XmlElement::new("routing-options");
        if let Some(router_id) = &ro.router_id {
            routing.children.push(leaf("router-id", router_id));
        }
        if let Some(asn) = ro.autonomous_system {
            routing.children.push(leaf("autonomous-system", &asn.to_string()));
        }
        if !ro.static_routes.is_empty() {
            let mut static_el = XmlElement::new("static");
            for route in &ro.static_routes {
                static_el.children.push(route_to_element(route));
            }
            routing.children.push(static_el);
        }
        root.children.push(routing);
    }

    if tree.protocols.bgp.is_some() || tree.protocols.ospf.is_some() {
        let mut protocols = XmlElement::new("protocols");
        if let Some(bgp) = &tree.protocols.bgp {
            protocols.children.push(bgp_to_element(bgp));
        }
        if let Some(ospf) = &tree.protocols.ospf {
            protocols.children.push(ospf_to_element(ospf));
        }
        root.children.push(protocols);
    }

    root
}

fn leaf(name: &str, value: &str) -> XmlElement {
    let mut el = XmlElement::new(name);
    el.text = value.to_string();
    el
}

fn interface_to_element(name: &str, interface: &Interface) -> XmlElement {
    let mut el = XmlElement::new("interface");
    el.children.push(leaf("name", name));
    if let Some(description) = &interface.description {
        el.children.push(leaf("description", description));
    }
    for (unit_no, unit) in &interface.units {
        let mut unit_el = XmlElement::new("unit");
        unit_el.children.push(leaf("name", &unit_no.to_string()));
        if !unit.families.is_empty() {
            let mut family_el = XmlElement::new("family");
            for (family, fam) in &unit.families {
                let mut fam_el = XmlElement::new(family);
                for addr in &fam.addresses {
                    let mut addr_el = XmlElement::new("address");
                    addr_el.children.push(leaf("name", addr));
                    fam_el.children.push(addr_el);
                }
                family_el.children.push(fam_el);
            }
            unit_el.children.push(family_el);
        }
        el.children.push(unit_el);
    }
    el
}

fn route_to_element(route: &StaticRoute) -> XmlElement {
    let mut el = XmlElement::new("route");
    el.children.push(leaf("name", &route.prefix));
    el.children.push(leaf("next-hop", &route.next_hop));
    if let Some(distance) = route.distance {
        el.children.push(leaf("distance", &distance.to_string()));
    }
    el
}

fn bgp_to_element(bgp: &Bgp) -> XmlElement {
    let mut el = XmlElement::new("bgp");
    for (name, group) in &bgp.groups {
        let mut group_el = XmlElement::new("group");
        group_el.children.push(leaf("name", name));
        if let Some(group_type) = &group.group_type {
            group_el.children.push(leaf("type", group_type));
        }
        if let Some(import) = &group.import {
            group_el.children.push(leaf("import", import));
        }
        if let Some(export) = &group.export {
            group_el.children.push(leaf("export", export));
        }
        for (peer, neighbor) in &group.neighbors {
            let mut neighbor_el = XmlElement::new("neighbor");
            neighbor_el.children.push(leaf("name", peer));
            if let Some(peer_as) = neighbor.peer_as {
                neighbor_el.children.push(leaf("peer-as", &peer_as.to_string()));
            }
            if let Some(description) = &neighbor.description {
                neighbor_el.children.push(leaf("description", description));
            }
            group_el.children.push(neighbor_el);
        }
        el.children.push(group_el);
    }
    el
}

fn ospf_to_element(ospf: &Ospf) -> XmlElement {
    let mut el = XmlElement::new("ospf");
    if let Some(router_id) = &ospf.router_id {
        el.children.push(leaf("router-id", router_id));
    }
    for (name, area) in &ospf.areas {
        let mut area_el = XmlElement::new("area");
        area_el.children.push(leaf("name", name));
        for iface in &area.interfaces {
            let mut iface_el = XmlElement::new("interface");
            iface_el.children.push(leaf("name", &iface.name));
            if let Some(metric) = iface.metric {
                iface_el.children.push(leaf("metric", &metric.to_string()));
            }
            area_el.children.push(iface_el);
        }
        el.children.push(area_el);
    }
    el
}

/// Renders an element tree as a compact XML string.
pub fn render_element(el: &XmlElement) -> String {
    let mut out = String::new();
    render_into(&mut out, el);
    out
}

fn render_into(out: &mut String, el: &XmlElement) {
    out.push('<');
    out.push_str(&el.name);
    for (key, value) in &el.attrs {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(&escape(value));
        out.push('"');
    }
    let text = el.trimmed_text();
    if el.children.is_empty() && text.is_empty() {
        out.push_str("/>");
        return;
    }
    out.push('>');
    out.push_str(&escape(text));
    for child in &el.children {
        render_into(out, child);
    }
    out.push_str("</");
    out.push_str(&el.name);
    out.push('>');
}

/// Parses a `<configuration>` element back into the typed tree.
pub fn tree_from_element(root: &XmlElement) -> Result<ConfigTree, ViewError> {
    if root.name != "configuration" {
        return Err(ViewError::UnknownElement(root.name.clone()));
    }
    let mut tree = ConfigTree::default();
    for child in &root.children {
        match child.name.as_str() {
            "system" => parse_system(&mut tree, child)?,
            "interfaces" => parse_interfaces(&mut tree, child)?,
            "routing-options" => parse_routing_options(&mut tree, child)?,
            "protocols" => parse_protocols(&mut tree, child)?,
            other => return Err(ViewError::UnknownElement(other.to_string())),
        }
    }
    Ok(tree)
}

fn parse_system(tree: &mut ConfigTree, el: &XmlElement) -> Result<(), ViewError> {
    for child in &el.children {
        match child.name.as_str() {
            "host-name" => {
                tree.system.host_name = Some(child.trimmed_text().to_string());
            },
            other => return Err(ViewError::UnknownElement(other.to_string())),
        }
    }
    Ok(())
}

fn parse_interfaces(tree: &mut ConfigTree, el: &XmlElement) -> Result<(), ViewError> {
    for child in &el.children {
        if child.name != "interface" {
            return Err(ViewError::UnknownElement(child.name.clone()));
        }
        let name = key_of(child, "interface")?;
        let mut interface = Interface::default();
        for field in &child.children {
            match field.name.as_str() {
                "name" => {},
                "description" => {
                    interface.description = Some(field.trimmed_text().to_string());
                },
                "unit" => {
                    let (unit_no, unit) = parse_unit(field)?;
                    interface.units.insert(unit_no, unit);
                },
                other => return Err(ViewError::UnknownElement(other.to_string())),
            }
        }
        merge_interface(tree, name, interface);
    }
    Ok(())
}

fn merge_interface(tree: &mut ConfigTree, name: String, interface: Interface) {
    let entry = tree.interfaces.entry(name).or_default();
    if interface.description.is_some() {
        entry.description = interface.description;
    }
    for (unit_no, unit) in interface.units {
        entry.units.insert(unit_no, unit);
    }
}

fn parse_unit(el: &XmlElement) -> Result<(u32, Unit), ViewError> {
    let raw = key_of(el, "unit")?;
    let unit_no: u32 = raw.parse().map_err(|_| ViewError::BadValue {
        what: "unit number",
        value: raw,
    })?;
    let mut unit = Unit::default();
    for field in &el.children {
        match field.name.as_str() {
            "name" => {},
            "family" => {
                for fam_el in &field.children {
                    match fam_el.name.as_str() {
                        "inet" | "inet6" => {
                            let fam = unit
                                .families
                                .entry(fam_el.name.clone())
                                .or_default();
                            for addr_el in &fam_el.children {
                                if addr_el.name != "address" {
                                    return Err(ViewError::UnknownElement(
                                        addr_el.name.clone(),
                                    ));
                                }
                                let addr = key_of(addr_el, "address")?;
                                if !fam.addresses.contains(&addr) {
                                    fam.addresses.push(addr);
                                }
                            }
                        },
                        other => {
                            return Err(ViewError::UnknownElement(other.to_string()));
                        },
                    }
                }
            },
            other => return Err(ViewError::UnknownElement(other.to_string())),
        }
    }
    Ok((unit_no, unit))
}

fn parse_routing_options(tree: &mut ConfigTree, el: &XmlElement) -> Result<(), ViewError> {
    for child in &el.children {
        match child.name.as_str() {
            "router-id" => {
                tree.routing_options.router_id = Some(child.trimmed_text().to_string());
            },
            "autonomous-system" => {
                let raw = child.trimmed_text();
                let asn: u32 = raw.parse().map_err(|_| ViewError::BadValue {
                    what: "autonomous-system",
                    value: raw.to_string(),
                })?;
                tree.routing_options.autonomous_system = Some(asn);
            },
            "static" => {
                for route_el in &child.children {
                    if route_el.name != "route" {
                        return Err(ViewError::UnknownElement(route_el.name.clone()));
                    }
                    tree.routing_options
                        .static_routes
                        .push(parse_route(route_el)?);
                }
            },
            other => return Err(ViewError::UnknownElement(other.to_string())),
        }
    }
    Ok(())
}

fn parse_route(el: &XmlElement) -> Result<StaticRoute, ViewError> {
    let prefix = key_of(el, "route")?;
    let mut route = StaticRoute {
        prefix,
        ..StaticRoute::default()
    };
    for field in &el.children {
        match field.name.as_str() {
            "name" => {},
            "next-hop" => route.next_hop = field.trimmed_text().to_string(),
            "distance" => {
                let raw = field.trimmed_text();
                let distance: u16 = raw.parse().map_err(|_| ViewError::BadValue {
                    what: "distance",
                    value: raw.to_string(),
                })?;
                route.distance = Some(distance);
            },
            other => return Err(ViewError::UnknownElement(other.to_string())),
        }
    }
    Ok(route)
}

fn parse_protocols(tree: &mut ConfigTree, el: &XmlElement) -> Result<(), ViewError> {
    for child in &el.children {
        match child.name.as_str() {
            "bgp" => parse_bgp(tree, child)?,
            "ospf" => parse_ospf(tree, child)?,
            other => return Err(ViewError::UnknownElement(other.to_string())),
        }
    }
    Ok(())
}

fn parse_bgp(tree: &mut ConfigTree, el: &XmlElement) -> Result<(), ViewError> {
    let bgp = tree.protocols.bgp.get_or_insert_default();
    for group_el in &el.children {
        if group_el.name != "group" {
            return Err(ViewError::UnknownElement(group_el.name.clone()));
        }
        let name = key_of(group_el, "group")?;
        let group = bgp.groups.entry(name).or_default();
        for field in &group_el.children {
            match field.name.as_str() {
                "name" => {},
                "type" => group.group_type = Some(field.trimmed_text().to_string()),
                "import" => group.import = Some(field.trimmed_text().to_string()),
                "export" => group.export = Some(field.trimmed_text().to_string()),
                "neighbor" => {
                    let peer = key_of(field, "neighbor")?;
                    let neighbor = group
                        .neighbors
                        .entry(peer)
                        .or_default();
                    for n_field in &field.children {
                        match n_field.name.as_str() {
                            "name" => {},
                            "peer-as" => {
                                let raw = n_field.trimmed_text();
                                let peer_as: u32 =
                                    raw.parse().map_err(|_| ViewError::BadValue {
                                        what: "peer-as",
                                        value: raw.to_string(),
                                    })?;
                                neighbor.peer_as = Some(peer_as);
                            },
                            "description" => {
                                neighbor.description =
                                    Some(n_field.trimmed_text().to_string());
                            },
                            other => {
                                return Err(ViewError::UnknownElement(other.to_string()));
                            },
                        }
                    }
                },
                other => return Err(ViewError::UnknownElement(other.to_string())),
            }
        }
    }
    Ok(())
}

fn parse_ospf(tree: &mut ConfigTree, el: &XmlElement) -> Result<(), ViewError> {
    let ospf = tree.protocols.ospf.get_or_insert_default();
    for child in &el.children {
        match child.name.as_str() {
            "router-id" => ospf.router_id = Some(child.trimmed_text().to_string()),
            "area" => {
                let name = key_of(child, "area")?;
                let area = ospf.areas.entry(name).or_default();
                for field in &child.children {
                    match field.name.as_str() {
                        "name" => {},
                        "interface" => {
                            let iface_name = key_of(field, "interface")?;
                            let mut metric = None;
                            for i_field in &field.children {
                                match i_field.name.as_str() {
                                    "name" => {},
                                    "metric" => {
                                        let raw = i_field.trimmed_text();
                                        metric = Some(raw.parse().map_err(|_| {
                                            ViewError::BadValue {
                                                what: "metric",
                                                value: raw.to_string(),
                                            }
                                        })?);
                                    },
                                    other => {
                                        return Err(ViewError::UnknownElement(
                                            other.to_string(),
                                        ));
                                    },
                                }
                            }
                            match area
                                .interfaces
                                .iter_mut()
                                .find(|i| i.name == iface_name)
                            {
                                Some(existing) => {
                                    if metric.is_some() {
                                        existing.metric = metric;
                                    }
                                },
                                None => area.interfaces.push(OspfInterface {
                                    name: iface_name,
                                    metric,
                                }),
                            }
                        },
                        other => return Err(ViewError::UnknownElement(other.to_string())),
                    }
                }
            },
            other => return Err(ViewError::UnknownElement(other.to_string())),
        }
    }
    Ok(())
}

fn key_of(el: &XmlElement, parent: &'static str) -> Result<String, ViewError> {
    el.child_text("name")
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .ok_or(ViewError::MissingKey {
            parent,
            key: "name",
        })
}
