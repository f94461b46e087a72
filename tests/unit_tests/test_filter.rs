// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use netconf_server_rs::{
    cfg::config::XmlConfig,
    model::{filter::apply_filter, text, xml_view},
    proto::xml::{XmlElement, parse_guarded},
};

fn sample_config() -> XmlElement {
    let text = "set system host-name r1\n\
                set interfaces ge-0/0/0 description core\n\
                set interfaces ge-0/0/0 unit 0 family inet address 10.0.0.1/24\n\
                set interfaces ge-0/0/1 description edge\n\
                set routing-options router-id 1.1.1.1\n";
    let tree = text::parse(text).expect("sample parses");
    xml_view::tree_to_element(&tree)
}

fn filter_of(doc: &str) -> XmlElement {
    parse_guarded(doc.as_bytes(), &XmlConfig::default()).expect("filter parses")
}

#[test]
fn empty_filter_selects_nothing() {
    let out = apply_filter(&sample_config(), &filter_of("<filter/>")).expect("apply");
    assert!(out.children.is_empty());
}

#[test]
fn top_level_container_selection() {
    let out = apply_filter(&sample_config(), &filter_of("<filter><system/></filter>"))
        .expect("apply");
    assert_eq!(out.children.len(), 1);
    assert_eq!(out.children[0].name, "system");
    assert_eq!(out.children[0].child_text("host-name"), Some("r1"));
}

#[test]
fn filter_may_name_the_configuration_root() {
    let out = apply_filter(
        &sample_config(),
        &filter_of("<filter><configuration><routing-options/></configuration></filter>"),
    )
    .expect("apply");
    assert_eq!(out.children.len(), 1);
    assert_eq!(out.children[0].name, "routing-options");
}

#[test]
fn key_predicate_selects_one_list_entry() {
    let filter = filter_of(
        "<filter><interfaces><interface><name>ge-0/0/0</name></interface></interfaces></filter>",
    );
    let out = apply_filter(&sample_config(), &filter).expect("apply");
    let interfaces = out.child("interfaces").expect("interfaces");
    assert_eq!(interfaces.children.len(), 1);
    let interface = &interfaces.children[0];
    assert_eq!(interface.child_text("name"), Some("ge-0/0/0"));
    assert_eq!(interface.child_text("description"), Some("core"));
}

#[test]
fn key_predicate_with_subselection_keeps_key_leaf() {
    let filter = filter_of(
        "<filter><interfaces><interface><name>ge-0/0/0</name><description/></interface>\
         </interfaces></filter>",
    );
    let out = apply_filter(&sample_config(), &filter).expect("apply");
    let interface = &out.child("interfaces").expect("interfaces").children[0];
    assert_eq!(interface.child_text("name"), Some("ge-0/0/0"));
    assert_eq!(interface.child_text("description"), Some("core"));
    assert!(interface.child("unit").is_none());
}

#[test]
fn non_matching_predicate_prunes_entry() {
    let filter = filter_of(
        "<filter><interfaces><interface><name>xe-9/9/9</name></interface></interfaces></filter>",
    );
    let out = apply_filter(&sample_config(), &filter).expect("apply");
    assert!(out.children.is_empty(), "{out:?}");
}

#[test]
fn select_path_form_with_key_predicate() {
    let filter = filter_of(
        "<filter select=\"/configuration/interfaces/interface[name='ge-0/0/0']\"/>",
    );
    let out = apply_filter(&sample_config(), &filter).expect("apply");
    let interfaces = out.child("interfaces").expect("interfaces");
    assert_eq!(interfaces.children.len(), 1);
    assert_eq!(interfaces.children[0].child_text("name"), Some("ge-0/0/0"));
}

#[test]
fn select_path_rejects_double_predicate() {
    let filter = filter_of("<filter select=\"/a[b='c'][d='e']/f\"/>");
    assert!(apply_filter(&sample_config(), &filter).is_err());
}

#[test]
fn multiple_fragments_union() {
    let filter = filter_of("<filter><system/><routing-options/></filter>");
    let out = apply_filter(&sample_config(), &filter).expect("apply");
    assert_eq!(out.children.len(), 2);
}
