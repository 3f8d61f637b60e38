use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use super::page::selector;

/// Attributes whose changes are compared between snapshots.
const WATCHED_ATTRIBUTES: &[&str] = &["class", "data-episode", "data-season", "src", "style"];

/// Attribute changes that always warrant a fresh extraction.
const RELEVANT_ATTRIBUTES: &[&str] = &["class", "src", "data-episode", "data-season"];

const RELEVANT_ADDED_CLASSES: &[&str] = &["episode", "series", "video", "player"];

static CLICK_REGION: LazyLock<Selector> = LazyLock::new(|| {
    selector(".episode, .series, [data-episode], .video-player, .player, .btn-series")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AddedNode {
    pub(crate) classes: Vec<String>,
    pub(crate) has_episode_attr: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum MutationRecord {
    Attributes {
        attribute: String,
        target_classes: Vec<String>,
        target_has_episode_attr: bool,
    },
    ChildList {
        added: Vec<AddedNode>,
    },
}

impl MutationRecord {
    pub(crate) fn is_relevant(&self) -> bool {
        match self {
            Self::Attributes {
                attribute,
                target_classes,
                target_has_episode_attr,
            } => {
                RELEVANT_ATTRIBUTES.contains(&attribute.as_str())
                    || target_classes.iter().any(|class| class == "active")
                    || *target_has_episode_attr
            }
            Self::ChildList { added } => added.iter().any(|node| {
                node.has_episode_attr
                    || node
                        .classes
                        .iter()
                        .any(|class| RELEVANT_ADDED_CLASSES.contains(&class.as_str()))
            }),
        }
    }
}

/// True when the click landed inside an episode list or the player.
pub(crate) fn is_relevant_click_target(target: ElementRef<'_>) -> bool {
    std::iter::once(target)
        .chain(target.ancestors().filter_map(ElementRef::wrap))
        .any(|element| CLICK_REGION.matches(&element))
}

struct NodeState {
    key: String,
    parent: Option<String>,
    classes: Vec<String>,
    has_episode_attr: bool,
    watched: Vec<Option<String>>,
}

impl NodeState {
    fn added_node(&self) -> AddedNode {
        AddedNode {
            classes: self.classes.clone(),
            has_episode_attr: self.has_episode_attr,
        }
    }
}

/// Mutation records that would turn `before` into `after`. Elements are
/// matched by `id` when they have one and by tag-indexed path otherwise.
/// Only the roots of inserted subtrees are reported as added.
pub(crate) fn diff_snapshots(before: &Html, after: &Html) -> Vec<MutationRecord> {
    let old = snapshot(before);
    let new = snapshot(after);
    let old_by_key: std::collections::HashMap<&str, &NodeState> =
        old.iter().map(|node| (node.key.as_str(), node)).collect();
    let new_keys: HashSet<&str> = new
        .iter()
        .filter(|node| !old_by_key.contains_key(node.key.as_str()))
        .map(|node| node.key.as_str())
        .collect();

    let mut records = Vec::new();
    let mut added = Vec::new();
    for node in &new {
        let Some(previous) = old_by_key.get(node.key.as_str()) else {
            let parent_is_new = node
                .parent
                .as_deref()
                .is_some_and(|parent| new_keys.contains(parent));
            if !parent_is_new {
                added.push(node.added_node());
            }
            continue;
        };
        for (idx, name) in WATCHED_ATTRIBUTES.iter().enumerate() {
            if previous.watched[idx] != node.watched[idx] {
                records.push(MutationRecord::Attributes {
                    attribute: (*name).to_string(),
                    target_classes: node.classes.clone(),
                    target_has_episode_attr: node.has_episode_attr,
                });
            }
        }
    }
    if !added.is_empty() {
        records.push(MutationRecord::ChildList { added });
    }
    records
}

fn snapshot(document: &Html) -> Vec<NodeState> {
    let mut nodes = Vec::new();
    let root = document.root_element();
    let key = element_key(root, None, 0);
    visit(root, key, None, &mut nodes);
    nodes
}

fn visit(element: ElementRef<'_>, key: String, parent: Option<String>, out: &mut Vec<NodeState>) {
    let value = element.value();
    out.push(NodeState {
        key: key.clone(),
        parent,
        classes: value.classes().map(str::to_string).collect(),
        has_episode_attr: value.attr("data-episode").is_some(),
        watched: WATCHED_ATTRIBUTES
            .iter()
            .map(|name| value.attr(name).map(str::to_string))
            .collect(),
    });

    let mut seen_tags: Vec<(&str, usize)> = Vec::new();
    for child in element.children().filter_map(ElementRef::wrap) {
        let tag = child.value().name();
        let index = match seen_tags.iter_mut().find(|(name, _)| *name == tag) {
            Some((_, count)) => {
                *count += 1;
                *count - 1
            }
            None => {
                seen_tags.push((tag, 1));
                0
            }
        };
        let child_key = element_key(child, Some(&key), index);
        visit(child, child_key, Some(key.clone()), out);
    }
}

fn element_key(element: ElementRef<'_>, parent: Option<&str>, index: usize) -> String {
    let value = element.value();
    if let Some(id) = value.id() {
        return format!("#{id}");
    }
    match parent {
        Some(parent) => format!("{parent}>{}[{index}]", value.name()),
        None => value.name().to_string(),
    }
}
