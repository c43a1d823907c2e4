//! End-to-end tests of the set engine through the public API.
//!
//! No network, no filesystem: tokens go in, canonical sets come out.

use cidrfold::{
    coalesce, normalize, resolve, AddressRange, CoalesceOptions, LogicalSet, MergeMode, Rejected,
    SetBuilder, Side,
};

fn set(items: &[&str]) -> LogicalSet {
    items
        .iter()
        .map(|s| s.parse::<AddressRange>().unwrap())
        .collect()
}

#[test]
fn test_crawler_feed_scenario() {
    let mut builder = SetBuilder::new(CoalesceOptions::default());
    let stats = builder.add_source(
        Side::Allow,
        "googlebot",
        ["8.8.8.0/24", "8.8.8.0/24", "bad-token", "8.8.9.0/24"],
    );
    builder.add_source(Side::Deny, "blocklist", Vec::<String>::new());

    assert_eq!(stats.tokens, 4);
    assert_eq!(stats.accepted, 3);
    assert_eq!(stats.rejected, 1);

    let output = builder.build();
    assert_eq!(output.allow.to_cidr_strings(), vec!["8.8.8.0/23"]);
    assert!(output.deny.is_empty());
    assert_eq!(output.report.removed, 0);
    assert_eq!(output.report.allow.unique, 2);
    assert_eq!(output.report.allow.output, 1);
    assert_eq!(output.report.allow.rejections.get("malformed_address"), Some(&1));
}

#[test]
fn test_normalize_canonical_form() {
    assert_eq!(normalize("10.0.0.5/24"), normalize("10.0.0.0/24"));
    assert_eq!(normalize("  10.0.0.5/24  # office").unwrap().to_string(), "10.0.0.0/24");
    assert_eq!(normalize("1.2.3.4").unwrap().prefix_len(), 32);
}

#[test]
fn test_normalize_rejections() {
    assert!(matches!(
        normalize("10.0.0.256/24"),
        Err(Rejected::MalformedAddress(_))
    ));
    assert!(matches!(
        normalize("not-an-ip"),
        Err(Rejected::MalformedAddress(_))
    ));
    assert_eq!(
        normalize("10.0.0.0/33"),
        Err(Rejected::PrefixOutOfRange(33))
    );
    assert_eq!(normalize("   "), Err(Rejected::Empty));
    assert_eq!(normalize("; SBL123"), Err(Rejected::CommentOnly));
    assert!(matches!(
        normalize("2001:db8::/32"),
        Err(Rejected::UnsupportedFamily(_))
    ));
}

#[test]
fn test_coalesce_examples() {
    let options = CoalesceOptions::default();

    let merged = coalesce(&set(&["10.0.0.0/25", "10.0.0.128/25"]), &options);
    assert_eq!(merged.ranges.to_cidr_strings(), vec!["10.0.0.0/24"]);
    assert_eq!(merged.input_count, 2);
    assert_eq!(merged.output_count, 1);

    let absorbed = coalesce(&set(&["10.0.0.0/16", "10.0.5.0/24"]), &options);
    assert_eq!(absorbed.ranges.to_cidr_strings(), vec!["10.0.0.0/16"]);

    let everything = coalesce(&set(&["0.0.0.0/0", "10.0.0.0/8", "192.0.2.1"]), &options);
    assert_eq!(everything.ranges.to_cidr_strings(), vec!["0.0.0.0/0"]);

    assert!(coalesce(&LogicalSet::new(), &options).ranges.is_empty());
}

#[test]
fn test_fixed_point_vs_single_pass() {
    let quarters = set(&[
        "10.0.0.0/26",
        "10.0.0.64/26",
        "10.0.0.128/26",
        "10.0.0.192/26",
    ]);

    let full = coalesce(&quarters, &CoalesceOptions::default());
    assert_eq!(full.ranges.to_cidr_strings(), vec!["10.0.0.0/24"]);

    let single = coalesce(
        &quarters,
        &CoalesceOptions {
            merge_mode: MergeMode::SinglePass,
            ..Default::default()
        },
    );
    assert_eq!(
        single.ranges.to_cidr_strings(),
        vec!["10.0.0.0/25", "10.0.0.128/25"]
    );
}

#[test]
fn test_min_merge_prefix_threshold() {
    let halves = set(&["8.0.0.0/7", "10.0.0.0/7"]);

    let kept = coalesce(&halves, &CoalesceOptions::default());
    assert_eq!(kept.ranges.len(), 2);

    let merged = coalesce(
        &halves,
        &CoalesceOptions {
            min_merge_prefix: 0,
            ..Default::default()
        },
    );
    assert_eq!(merged.ranges.to_cidr_strings(), vec!["8.0.0.0/6"]);
}

#[test]
fn test_resolve_containment_removal() {
    let allow = set(&["10.0.0.0/24"]);
    let deny = set(&["10.0.0.5/32", "10.0.1.5/32"]);

    let resolution = resolve(&deny, &allow);
    assert_eq!(resolution.deny.to_cidr_strings(), vec!["10.0.1.5/32"]);
    assert_eq!(resolution.removed, 1);
    assert_eq!(resolution.unresolved_overlaps, 0);
}

#[test]
fn test_resolve_leaves_broader_deny() {
    let allow = set(&["10.0.0.0/24"]);
    let deny = set(&["10.0.0.0/8"]);

    let resolution = resolve(&deny, &allow);
    assert_eq!(resolution.deny, deny);
    assert_eq!(resolution.removed, 0);
    assert_eq!(resolution.unresolved_overlaps, 1);
}

#[test]
fn test_resolve_with_empty_allow_is_noop() {
    let deny = set(&["10.0.0.0/8", "192.0.2.0/24"]);
    let resolution = resolve(&deny, &LogicalSet::new());
    assert_eq!(resolution.deny, deny);
    assert_eq!(resolution.removed, 0);
}

#[test]
fn test_output_sorted_and_rendered() {
    let mut builder = SetBuilder::default();
    builder.add_source(
        Side::Deny,
        "mixed",
        ["192.0.2.0/24", "10.0.0.0/8", "10.1.0.0/16", "172.16.0.0/12"],
    );
    let output = builder.build();

    assert_eq!(
        output.deny.render(),
        "10.0.0.0/8\n172.16.0.0/12\n192.0.2.0/24\n"
    );
    assert_eq!(LogicalSet::new().render(), "");
}

#[test]
fn test_failed_source_contributes_nothing() {
    let mut builder = SetBuilder::default();
    builder.add_source(Side::Allow, "unreachable", Vec::<String>::new());
    builder.add_source(Side::Deny, "blocklist", ["203.0.113.0/24"]);

    let output = builder.build();
    assert!(output.allow.is_empty());
    assert_eq!(output.deny.to_cidr_strings(), vec!["203.0.113.0/24"]);
    assert_eq!(output.report.sources.len(), 2);
    assert_eq!(output.report.sources[0].tokens, 0);
}
