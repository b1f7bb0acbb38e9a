use std::collections::HashSet;

use serde::Serialize;

use crate::system::SystemPage;

/// A named item and its 1-based display position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuSlot {
    pub name: String,
    pub position: i64,
}

impl MenuSlot {
    pub fn new(name: impl Into<String>, position: i64) -> Self {
        Self {
            name: name.into(),
            position,
        }
    }
}

/// Put `items` into their effective order: names listed in `requested` first
/// (in request order), then everything else in its prior `(position, name)`
/// order. Requested names that are not in `items` are ignored.
fn requested_first<'a, S: AsRef<str>>(items: &[&'a MenuSlot], requested: &[S]) -> Vec<&'a MenuSlot> {
    let mut prior: Vec<&'a MenuSlot> = items.to_vec();
    prior.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.name.cmp(&b.name)));

    let mut taken: HashSet<&str> = HashSet::with_capacity(prior.len());
    let mut ordered = Vec::with_capacity(prior.len());

    for name in requested {
        let name = name.as_ref();
        if taken.contains(name) {
            continue;
        }
        if let Some(&slot) = prior.iter().find(|slot| slot.name == name) {
            taken.insert(slot.name.as_str());
            ordered.push(slot);
        }
    }
    for slot in prior {
        if !taken.contains(slot.name.as_str()) {
            ordered.push(slot);
        }
    }
    ordered
}

/// Compute the settled menu order for a page set.
///
/// Mutable pages receive `1..=M` (requested names first, the rest in their
/// previous relative order); system pages receive `M+1..=N` in the fixed
/// [`SystemPage`] order regardless of where they were or whether the request
/// mentioned them. Passing an empty request simply re-densifies.
pub fn settle_menu_order<S: AsRef<str>>(current: &[MenuSlot], requested: &[S]) -> Vec<MenuSlot> {
    let (system, mutable): (Vec<&MenuSlot>, Vec<&MenuSlot>) = current
        .iter()
        .partition(|slot| SystemPage::from_name(&slot.name).is_some());

    let mut pinned: Vec<(SystemPage, &MenuSlot)> = system
        .into_iter()
        .filter_map(|slot| SystemPage::from_name(&slot.name).map(|page| (page, slot)))
        .collect();
    pinned.sort_by_key(|(page, _)| page.pin_rank());

    requested_first(&mutable, requested)
        .into_iter()
        .chain(pinned.into_iter().map(|(_, slot)| slot))
        .zip(1_i64..)
        .map(|(slot, position)| MenuSlot::new(slot.name.clone(), position))
        .collect()
}

/// Dense `1..=N` renumbering without pinning (used for icons).
pub fn renumber_dense<S: AsRef<str>>(current: &[MenuSlot], requested: &[S]) -> Vec<MenuSlot> {
    let all: Vec<&MenuSlot> = current.iter().collect();
    requested_first(&all, requested)
        .into_iter()
        .zip(1_i64..)
        .map(|(slot, position)| MenuSlot::new(slot.name.clone(), position))
        .collect()
}
