// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Line-oriented `set` text form of the configuration tree.
//!
//! One path-valued statement per line, e.g.
//!
//! ```text
//! set system host-name r1
//! set interfaces ge-0/0/0 unit 0 family inet address 10.0.0.1/24
//! set routing-options static route 0.0.0.0/0 next-hop 10.0.0.254
//! ```
//!
//! Values containing whitespace or quotes are double-quoted with
//! backslash escaping. The codec is deterministic and round-trip stable:
//! `parse(serialise(t))` is semantically equal to `t`.

use std::fmt::Write;

use thiserror::Error;

use crate::model::tree::{
    Bgp, ConfigTree, OspfInterface, StaticRoute,
};

#[derive(Debug, Error)]
pub enum TextError {
    #[error("line {line}: unknown statement: {stmt}")]
    UnknownStatement { line: usize, stmt: String },
    #[error("line {line}: truncated statement")]
    Truncated { line: usize },
    #[error("line {line}: bad value {value:?} for {what}")]
    BadValue {
        line: usize,
        what: &'static str,
        value: String,
    },
    #[error("line {line}: unterminated quote")]
    UnterminatedQuote { line: usize },
}

/// Serialises the tree into its canonical text form. Containers that
/// carry no leaves are still emitted as bare path lines so the text form
/// loses nothing.
pub fn serialize(tree: &ConfigTree) -> String {
    let mut out = String::new();

    if let Some(host_name) = &tree.system.host_name {
        let _ = writeln!(out, "set system host-name {}", quote(host_name));
    }

    for (name, interface) in &tree.interfaces {
        let mut emitted = false;
        if let Some(description) = &interface.description {
            let _ = writeln!(
                out,
                "set interfaces {} description {}",
                quote(name),
                quote(description)
            );
            emitted = true;
        }
        for (unit_no, unit) in &interface.units {
            let mut unit_emitted = false;
            for (family, fam) in &unit.families {
                if fam.addresses.is_empty() {
                    let _ = writeln!(
                        out,
                        "set interfaces {} unit {} family {}",
                        quote(name),
                        unit_no,
                        family
                    );
                    unit_emitted = true;
                }
                for addr in &fam.addresses {
                    let _ = writeln!(
                        out,
                        "set interfaces {} unit {} family {} address {}",
                        quote(name),
                        unit_no,
                        family,
                        quote(addr)
                    );
                    unit_emitted = true;
                }
            }
            if !unit_emitted {
                let _ = writeln!(out, "set interfaces {} unit {}", quote(name), unit_no);
            }
            emitted = true;
        }
        if !emitted {
            let _ = writeln!(out, "set interfaces {}", quote(name));
        }
    }

    if let Some(router_id) = &tree.routing_options.router_id {
        let _ = writeln!(out, "set routing-options router-id {}", quote(router_id));
    }
    if let Some(asn) = tree.routing_options.autonomous_system {
        let _ = writeln!(out, "set routing-options autonomous-system {asn}");
    }
    for route in &tree.routing_options.static_routes {
        let mut line = format!(
            "set routing-options static route {} next-hop {}",
            quote(&route.prefix),
            quote(&route.next_hop)
        );
        if let Some(distance) = route.distance {
            let _ = write!(line, " distance {distance}");
        }
        let _ = writeln!(out, "{line}");
    }

    if let Some(bgp) = &tree.protocols.bgp {
        serialize_bgp(&mut out, bgp);
    }

    if let Some(ospf) = &tree.protocols.ospf {
        if let Some(router_id) = &ospf.router_id {
            let _ = writeln!(out, "set protocols ospf router-id {}", quote(router_id));
        }
        for (area, area_cfg) in &ospf.areas {
            if area_cfg.interfaces.is_empty() {
                let _ = writeln!(out, "set protocols ospf area {}", quote(area));
            }
            for iface in &area_cfg.interfaces {
                match iface.metric {
                    Some(metric) => {
                        let _ = writeln!(
                            out,
                            "set protocols ospf area {} interface {} metric {}",
                            quote(area),
                            quote(&iface.name),
                            metric
                        );
                    },
                    None => {
                        let _ = writeln!(
                            out,
                            "set protocols ospf area {} interface {}",
                            quote(area),
                            quote(&iface.name)
                        );
                    },
                }
            }
        }
    }

    out
}

fn serialize_bgp(out: &mut String, bgp: &Bgp) {
    for (group, group_cfg) in &bgp.groups {
        let mut emitted = false;
        if let Some(group_type) = &group_cfg.group_type {
            let _ = writeln!(
                out,
                "set protocols bgp group {} type {}",
                quote(group),
                quote(group_type)
            );
            emitted = true;
        }
        if let Some(import) = &group_cfg.import {
            let _ = writeln!(
                out,
                "set protocols bgp group {} import {}",
                quote(group),
                quote(import)
            );
            emitted = true;
        }
        if let Some(export) = &group_cfg.export {
            let _ = writeln!(
                out,
                "set protocols bgp group {} export {}",
                quote(group),
                quote(export)
            );
            emitted = true;
        }
        for (peer, neighbor) in &group_cfg.neighbors {
            let mut neighbor_emitted = false;
            if let Some(peer_as) = neighbor.peer_as {
                let _ = writeln!(
                    out,
                    "set protocols bgp group {} neighbor {} peer-as {}",
                    quote(group),
                    quote(peer),
                    peer_as
                );
                neighbor_emitted = true;
            }
            if let Some(description) = &neighbor.description {
                let _ = writeln!(
                    out,
                    "set protocols bgp group {} neighbor {} description {}",
                    quote(group),
                    quote(peer),
                    quote(description)
                );
                neighbor_emitted = true;
            }
            if !neighbor_emitted {
                let _ = writeln!(
                    out,
                    "set protocols bgp group {} neighbor {}",
                    quote(group),
                    quote(peer)
                );
            }
            emitted = true;
        }
        if !emitted {
            let _ = writeln!(out, "set protocols bgp group {}", quote(group));
        }
    }
}

/// Parses the text form back into a tree.
pub fn parse(text: &str) -> Result<ConfigTree, TextError> {
    let mut tree = ConfigTree::default();

    for (idx, raw_line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let tokens = tokenize(line, line_no)?;
        apply_line(&mut tree, &tokens, line_no)?;
    }

    Ok(tree)
}

fn apply_line(tree: &mut ConfigTree, tokens: &[String], line: usize) -> Result<(), TextError> {
    let mut it = tokens.iter().map(String::as_str);
    if it.next() != Some("set") {
        return Err(TextError::UnknownStatement {
            line,
            stmt: tokens.first().cloned().unwrap_or_default(),
        });
    }

    let rest: Vec<&str> = it.collect();
    match rest.split_first() {
        Some((&"system", args)) => apply_system(tree, args, line),
        Some((&"interfaces", args)) => apply_interfaces(tree, args, line),
        Some((&"routing-options", args)) => apply_routing_options(tree, args, line),
        Some((&"protocols", args)) => apply_protocols(tree, args, line),
        Some((other, _)) => Err(TextError::UnknownStatement {
            line,
            stmt: (*other).to_string(),
        }),
        None => Err(TextError::Truncated { line }),
    }
}

fn apply_system(tree: &mut ConfigTree, args: &[&str], line: usize) -> Result<(), TextError> {
    match args {
        ["host-name", value] => {
            tree.system.host_name = Some((*value).to_string());
            Ok(())
        },
        [] => Err(TextError::Truncated { line }),
        [other, ..] => Err(TextError::UnknownStatement {
            line,
            stmt: (*other).to_string(),
        }),
    }
}

fn apply_interfaces(
    tree: &mut ConfigTree,
    args: &[&str],
    line: usize,
) -> Result<(), TextError> {
    let (name, rest) = args.split_first().ok_or(TextError::Truncated { line })?;
    let interface = tree.interfaces.entry((*name).to_string()).or_default();
    match rest {
        [] => Ok(()),
        ["description", value] => {
            interface.description = Some((*value).to_string());
            Ok(())
        },
        ["unit", unit_no, unit_rest @ ..] => {
            let unit_no: u32 = unit_no.parse().map_err(|_| TextError::BadValue {
                line,
                what: "unit number",
                value: (*unit_no).to_string(),
            })?;
            let unit = interface.units.entry(unit_no).or_default();
            match unit_rest {
                [] => Ok(()),
                ["family", family, family_rest @ ..] => {
                    if *family != "inet" && *family != "inet6" {
                        return Err(TextError::BadValue {
                            line,
                            what: "address family",
                            value: (*family).to_string(),
                        });
                    }
                    let fam = unit.families.entry((*family).to_string()).or_default();
                    match family_rest {
                        [] => Ok(()),
                        ["address", addr] => {
                            let addr = (*addr).to_string();
                            if !fam.addresses.contains(&addr) {
                                fam.addresses.push(addr);
                            }
                            Ok(())
                        },
                        [other, ..] => Err(TextError::UnknownStatement {
                            line,
                            stmt: (*other).to_string(),
                        }),
                    }
                },
                [other, ..] => Err(TextError::UnknownStatement {
                    line,
                    stmt: (*other).to_string(),
                }),
            }
        },
        [other, ..] => Err(TextError::UnknownStatement {
            line,
            stmt: (*other).to_string(),
        }),
    }
}

fn apply_routing_options(
    tree: &mut ConfigTree,
    args: &[&str],
    line: usize,
) -> Result<(), TextError> {
    match args {
        ["router-id", value] => {
            tree.routing_options.router_id = Some((*value).to_string());
            Ok(())
        },
        ["autonomous-system", value] => {
            let asn: u32 = value.parse().map_err(|_| TextError::BadValue {
                line,
                what: "autonomous-system",
                value: (*value).to_string(),
            })?;
            tree.routing_options.autonomous_system = Some(asn);
            Ok(())
        },
        ["static", "route", prefix, "next-hop", next_hop, route_rest @ ..] => {
            let distance = match route_rest {
                [] => None,
                ["distance", value] => {
                    Some(value.parse().map_err(|_| TextError::BadValue {
                        line,
                        what: "distance",
                        value: (*value).to_string(),
                    })?)
                },
                [other, ..] => {
                    return Err(TextError::UnknownStatement {
                        line,
                        stmt: (*other).to_string(),
                    });
                },
            };
            tree.routing_options.static_routes.push(StaticRoute {
                prefix: (*prefix).to_string(),
                next_hop: (*next_hop).to_string(),
                distance,
            });
            Ok(())
        },
        [] => Err(TextError::Truncated { line }),
        [other, ..] => Err(TextError::UnknownStatement {
            line,
            stmt: (*other).to_string(),
        }),
    }
}

fn apply_protocols(
    tree: &mut ConfigTree,
    args: &[&str],
    line: usize,
) -> Result<(), TextError> {
    match args.split_first() {
        Some((&"bgp", bgp_args)) => apply_bgp(tree, bgp_args, line),
        Some((&"ospf", ospf_args)) => apply_ospf(tree, ospf_args, line),
        Some((other, _)) => Err(TextError::UnknownStatement {
            line,
            stmt: (*other).to_string(),
        }),
        None => Err(TextError::Truncated { line }),
    }
}

fn apply_bgp(tree: &mut ConfigTree, args: &[&str], line: usize) -> Result<(), TextError> {
    let bgp = tree.protocols.bgp.get_or_insert_default();
    match args {
        ["group", group, group_rest @ ..] => {
            let group = bgp.groups.entry((*group).to_string()).or_default();
            match group_rest {
                [] => Ok(()),
                ["type", value] => {
                    group.group_type = Some((*value).to_string());
                    Ok(())
                },
                ["import", value] => {
                    group.import = Some((*value).to_string());
                    Ok(())
                },
                ["export", value] => {
                    group.export = Some((*value).to_string());
                    Ok(())
                },
                ["neighbor", peer, neighbor_rest @ ..] => {
                    let neighbor =
                        group.neighbors.entry((*peer).to_string()).or_default();
                    match neighbor_rest {
                        [] => Ok(()),
                        ["peer-as", value] => {
                            let peer_as: u32 =
                                value.parse().map_err(|_| TextError::BadValue {
                                    line,
                                    what: "peer-as",
                                    value: (*value).to_string(),
                                })?;
                            neighbor.peer_as = Some(peer_as);
                            Ok(())
                        },
                        ["description", value] => {
                            neighbor.description = Some((*value).to_string());
                            Ok(())
                        },
                        [other, ..] => Err(TextError::UnknownStatement {
                            line,
                            stmt: (*other).to_string(),
                        }),
                    }
                },
                [other, ..] => Err(TextError::UnknownStatement {
                    line,
                    stmt: (*other).to_string(),
                }),
            }
        },
        [] => Err(TextError::Truncated { line }),
        [other, ..] => Err(TextError::UnknownStatement {
            line,
            stmt: (*other).to_string(),
        }),
    }
}

fn apply_ospf(tree: &mut ConfigTree, args: &[&str], line: usize) -> Result<(), TextError> {
    let ospf = tree
        .protocols
        .ospf
        .get_or_insert_default();
    match args {
        ["router-id", value] => {
            ospf.router_id = Some((*value).to_string());
            Ok(())
        },
        ["area", area, area_rest @ ..] => {
            let area = ospf.areas.entry((*area).to_string()).or_default();
            match area_rest {
                [] => Ok(()),
                ["interface", name, iface_rest @ ..] => {
                    let metric = match iface_rest {
                        [] => None,
                        ["metric", value] => {
                            Some(value.parse().map_err(|_| TextError::BadValue {
                                line,
                                what: "metric",
                                value: (*value).to_string(),
                            })?)
                        },
                        [other, ..] => {
                            return Err(TextError::UnknownStatement {
                                line,
                                stmt: (*other).to_string(),
                            });
                        },
                    };
                    match area.interfaces.iter_mut().find(|i| i.name == **name) {
                        Some(existing) => {
                            if metric.is_some() {
                                existing.metric = metric;
                            }
                        },
                        None => area.interfaces.push(OspfInterface {
                            name: (*name).to_string(),
                            metric,
                        }),
                    }
                    Ok(())
                },
                [other, ..] => Err(TextError::UnknownStatement {
                    line,
                    stmt: (*other).to_string(),
                }),
            }
        },
        [] => Err(TextError::Truncated { line }),
        [other, ..] => Err(TextError::UnknownStatement {
            line,
            stmt: (*other).to_string(),
        }),
    }
}

/// Quotes a value when it contains whitespace, quotes or backslashes;
/// internal quotes and backslashes are escaped.
fn quote(value: &str) -> String {
    let needs_quoting = value.is_empty()
        || value
            .chars()
            .any(|c| c.is_whitespace() || c == '"' || c == '\\');
    if !needs_quoting {
        return value.to_string();
    }
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Splits a line into tokens, honouring double quotes and backslash
/// escapes inside them.
fn tokenize(line: &str, line_no: usize) -> Result<Vec<String>, TextError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                loop {
                    match chars.next() {
                        Some('\\') => match chars.next() {
                            Some(escaped) => current.push(escaped),
                            None => {
                                return Err(TextError::UnterminatedQuote { line: line_no });
                            },
                        },
                        Some('"') => break,
                        Some(inner) => current.push(inner),
                        None => {
                            return Err(TextError::UnterminatedQuote { line: line_no });
                        },
                    }
                }
                // Quoted segment may legally be an empty token.
                if chars.peek().is_none_or(|n| n.is_whitespace()) {
                    tokens.push(std::mem::take(&mut current));
                }
            },
            c if c.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            },
            c => {
                current.push(c);
                if chars.peek().is_none() {
                    tokens.push(std::mem::take(&mut current));
                }
            },
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }

    Ok(tokens)
}
