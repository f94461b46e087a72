// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use netconf_server_rs::model::tree::{ConfigTree, StaticRoute};

fn tree_with_hostname(name: &str) -> ConfigTree {
    let mut tree = ConfigTree::default();
    tree.system.host_name = Some(name.to_string());
    tree
}

#[test]
fn scalar_overwrites_scalar() {
    let mut base = tree_with_hostname("old");
    base.merge(&tree_with_hostname("new"));
    assert_eq!(base.system.host_name.as_deref(), Some("new"));
}

#[test]
fn absent_scalar_leaves_existing_value() {
    let mut base = tree_with_hostname("keep");
    base.merge(&ConfigTree::default());
    assert_eq!(base.system.host_name.as_deref(), Some("keep"));
}

#[test]
fn keyed_maps_are_union_merged() {
    let mut base = ConfigTree::default();
    base.interfaces.entry("ge-0/0/0".to_string()).or_default().description =
        Some("first".to_string());

    let mut edit = ConfigTree::default();
    edit.interfaces.entry("ge-0/0/1".to_string()).or_default().description =
        Some("second".to_string());

    base.merge(&edit);
    assert_eq!(base.interfaces.len(), 2);
    assert_eq!(
        base.interfaces["ge-0/0/0"].description.as_deref(),
        Some("first")
    );
    assert_eq!(
        base.interfaces["ge-0/0/1"].description.as_deref(),
        Some("second")
    );
}

#[test]
fn addresses_append_with_duplicate_suppression() {
    let mut base = ConfigTree::default();
    base.interfaces
        .entry("ge-0/0/0".to_string())
        .or_default()
        .units
        .entry(0)
        .or_default()
        .families
        .entry("inet".to_string())
        .or_default()
        .addresses
        .extend(["10.0.0.1/24".to_string(), "10.0.0.2/24".to_string()]);

    let mut edit = ConfigTree::default();
    edit.interfaces
        .entry("ge-0/0/0".to_string())
        .or_default()
        .units
        .entry(0)
        .or_default()
        .families
        .entry("inet".to_string())
        .or_default()
        .addresses
        .extend(["10.0.0.2/24".to_string(), "10.0.0.3/24".to_string()]);

    base.merge(&edit);
    let addrs = &base.interfaces["ge-0/0/0"].units[&0].families["inet"].addresses;
    assert_eq!(
        addrs,
        &vec![
            "10.0.0.1/24".to_string(),
            "10.0.0.2/24".to_string(),
            "10.0.0.3/24".to_string()
        ]
    );
}

#[test]
fn routes_are_appended() {
    let route = |prefix: &str| StaticRoute {
        prefix: prefix.to_string(),
        next_hop: "10.0.0.254".to_string(),
        distance: None,
    };
    let mut base = ConfigTree::default();
    base.routing_options.static_routes.push(route("0.0.0.0/0"));

    let mut edit = ConfigTree::default();
    edit.routing_options.static_routes.push(route("0.0.0.0/0"));
    edit.routing_options.static_routes.push(route("10.0.0.0/8"));

    base.merge(&edit);
    assert_eq!(base.routing_options.static_routes.len(), 3);
}

#[test]
fn bgp_group_fields_overwrite_and_neighbors_union() {
    let mut base = ConfigTree::default();
    {
        let bgp = base.protocols.bgp.get_or_insert_with(Default::default);
        let group = bgp.groups.entry("peers".to_string()).or_default();
        group.group_type = Some("internal".to_string());
        group.neighbors.entry("10.0.0.2".to_string()).or_default();
    }

    let mut edit = ConfigTree::default();
    {
        let bgp = edit.protocols.bgp.get_or_insert_with(Default::default);
        let group = bgp.groups.entry("peers".to_string()).or_default();
        group.group_type = Some("external".to_string());
        let neighbor = group.neighbors.entry("10.0.0.3".to_string()).or_default();
        neighbor.peer_as = Some(65001);
    }

    base.merge(&edit);
    let group = &base.protocols.bgp.as_ref().expect("bgp").groups["peers"];
    assert_eq!(group.group_type.as_deref(), Some("external"));
    assert_eq!(group.neighbors.len(), 2);
    assert_eq!(group.neighbors["10.0.0.3"].peer_as, Some(65001));
}

#[test]
fn ospf_interfaces_merge_by_name() {
    use netconf_server_rs::model::tree::OspfInterface;

    let mut base = ConfigTree::default();
    {
        let ospf = base.protocols.ospf.get_or_insert_with(Default::default);
        ospf.areas
            .entry("0.0.0.0".to_string())
            .or_default()
            .interfaces
            .push(OspfInterface {
                name: "ge-0/0/0".to_string(),
                metric: None,
            });
    }

    let mut edit = ConfigTree::default();
    {
        let ospf = edit.protocols.ospf.get_or_insert_with(Default::default);
        let area = ospf.areas.entry("0.0.0.0".to_string()).or_default();
        area.interfaces.push(OspfInterface {
            name: "ge-0/0/0".to_string(),
            metric: Some(20),
        });
        area.interfaces.push(OspfInterface {
            name: "ge-0/0/1".to_string(),
            metric: None,
        });
    }

    base.merge(&edit);
    let area = &base.protocols.ospf.as_ref().expect("ospf").areas["0.0.0.0"];
    assert_eq!(area.interfaces.len(), 2);
    assert_eq!(area.interfaces[0].metric, Some(20));
}
