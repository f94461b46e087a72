// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The typed configuration tree and its merge/validation semantics.
//!
//! Keyed collections use `BTreeMap` so every serialisation of the tree is
//! deterministic; ordered sequences (addresses, static routes, OSPF
//! interfaces) keep insertion order.

use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigTree {
    pub system: System,
    pub interfaces: BTreeMap<String, Interface>,
    pub routing_options: RoutingOptions,
    pub protocols: Protocols,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct System {
    pub host_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Interface {
    pub description: Option<String>,
    pub units: BTreeMap<u32, Unit>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Unit {
    /// family name ("inet" / "inet6") -> ordered addresses.
    pub families: BTreeMap<String, Family>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Family {
    pub addresses: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutingOptions {
    pub router_id: Option<String>,
    pub autonomous_system: Option<u32>,
    pub static_routes: Vec<StaticRoute>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticRoute {
    pub prefix: String,
    pub next_hop: String,
    pub distance: Option<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Protocols {
    pub bgp: Option<Bgp>,
    pub ospf: Option<Ospf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bgp {
    pub groups: BTreeMap<String, BgpGroup>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BgpGroup {
    pub group_type: Option<String>,
    pub import: Option<String>,
    pub export: Option<String>,
    pub neighbors: BTreeMap<String, BgpNeighbor>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BgpNeighbor {
    pub peer_as: Option<u32>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ospf {
    pub router_id: Option<String>,
    pub areas: BTreeMap<String, OspfArea>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OspfArea {
    pub interfaces: Vec<OspfInterface>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OspfInterface {
    pub name: String,
    pub metric: Option<u32>,
}

impl ConfigTree {
    /// Merges `incoming` into `self` with edit-config merge semantics:
    /// scalars in the edit overwrite, keyed collections are union-merged,
    /// address lists are appended with duplicate suppression, route lists
    /// are appended.
    pub fn merge(&mut self, incoming: &ConfigTree) {
        if incoming.system.host_name.is_some() {
            self.system.host_name = incoming.system.host_name.clone();
        }

        for (name, incoming_if) in &incoming.interfaces {
            let existing = self.interfaces.entry(name.clone()).or_default();
            if incoming_if.description.is_some() {
                existing.description = incoming_if.description.clone();
            }
            for (unit_no, incoming_unit) in &incoming_if.units {
                let unit = existing.units.entry(*unit_no).or_default();
                for (family, incoming_family) in &incoming_unit.families {
                    let fam = unit.families.entry(family.clone()).or_default();
                    for addr in &incoming_family.addresses {
                        if !fam.addresses.contains(addr) {
                            fam.addresses.push(addr.clone());
                        }
                    }
                }
            }
        }

        if incoming.routing_options.router_id.is_some() {
            self.routing_options.router_id = incoming.routing_options.router_id.clone();
        }
        if incoming.routing_options.autonomous_system.is_some() {
            self.routing_options.autonomous_system =
                incoming.routing_options.autonomous_system;
        }
        self.routing_options
            .static_routes
            .extend(incoming.routing_options.static_routes.iter().cloned());

        if let Some(incoming_bgp) = &incoming.protocols.bgp {
            let bgp = self.protocols.bgp.get_or_insert_default();
            for (name, incoming_group) in &incoming_bgp.groups {
                let group = bgp.groups.entry(name.clone()).or_default();
                if incoming_group.group_type.is_some() {
                    group.group_type = incoming_group.group_type.clone();
                }
                if incoming_group.import.is_some() {
                    group.import = incoming_group.import.clone();
                }
                if incoming_group.export.is_some() {
                    group.export = incoming_group.export.clone();
                }
                for (peer, incoming_neighbor) in &incoming_group.neighbors {
                    let neighbor = group.neighbors.entry(peer.clone()).or_default();
                    if incoming_neighbor.peer_as.is_some() {
                        neighbor.peer_as = incoming_neighbor.peer_as;
                    }
                    if incoming_neighbor.description.is_some() {
                        neighbor.description = incoming_neighbor.description.clone();
                    }
                }
            }
        }

        if let Some(incoming_ospf) = &incoming.protocols.ospf {
            let ospf = self.protocols.ospf.get_or_insert_default();
            if incoming_ospf.router_id.is_some() {
                ospf.router_id = incoming_ospf.router_id.clone();
            }
            for (name, incoming_area) in &incoming_ospf.areas {
                let area = ospf.areas.entry(name.clone()).or_default();
                for incoming_iface in &incoming_area.interfaces {
                    match area
                        .interfaces
                        .iter_mut()
                        .find(|i| i.name == incoming_iface.name)
                    {
                        Some(existing_iface) => {
                            if incoming_iface.metric.is_some() {
                                existing_iface.metric = incoming_iface.metric;
                            }
                        },
                        None => area.interfaces.push(incoming_iface.clone()),
                    }
                }
            }
        }
    }

    /// Structural and range validation. Returns the full list of issues
    /// so a validate RPC reports everything at once.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        for (name, interface) in &self.interfaces {
            if name.is_empty() {
                issues.push("interface with empty name".to_string());
            }
            for (unit_no, unit) in &interface.units {
                for (family, fam) in &unit.families {
                    for addr in &fam.addresses {
                        if addr.is_empty() {
                            issues.push(format!(
                                "interface {name} unit {unit_no} family {family}: empty address"
                            ));
                        }
                    }
                }
            }
        }

        if let Some(asn) = self.routing_options.autonomous_system
            && asn == 0
        {
            issues.push("autonomous-system must be non-zero".to_string());
        }
        for route in &self.routing_options.static_routes {
            if route.prefix.is_empty() {
                issues.push("static route with empty prefix".to_string());
            }
            if route.next_hop.is_empty() {
                issues.push(format!(
                    "static route {}: empty next-hop",
                    route.prefix
                ));
            }
            if let Some(distance) = route.distance
                && !(1..=255).contains(&distance)
            {
                issues.push(format!(
                    "static route {}: distance {} out of range 1..255",
                    route.prefix, distance
                ));
            }
        }

        if let Some(bgp) = &self.protocols.bgp {
            for (name, group) in &bgp.groups {
                if name.is_empty() {
                    issues.push("bgp group with empty name".to_string());
                }
                for (peer, neighbor) in &group.neighbors {
                    if peer.is_empty() {
                        issues.push(format!("bgp group {name}: neighbor with empty address"));
                    }
                    if let Some(peer_as) = neighbor.peer_as
                        && peer_as == 0
                    {
                        issues.push(format!(
                            "bgp group {name} neighbor {peer}: peer-as must be non-zero"
                        ));
                    }
                }
            }
        }

        if let Some(ospf) = &self.protocols.ospf {
            for (name, area) in &ospf.areas {
                if name.is_empty() {
                    issues.push("ospf area with empty name".to_string());
                }
                for iface in &area.interfaces {
                    if iface.name.is_empty() {
                        issues.push(format!("ospf area {name}: interface with empty name"));
                    }
                }
            }
        }

        issues
    }

    pub fn is_empty(&self) -> bool {
        *self == ConfigTree::default()
    }
}
