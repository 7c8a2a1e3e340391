//! Choice hierarchy: flat candidates → one ring of leaves and branches.
//!
//! Cards sharing a 2-character kimariji prefix collapse into a branch whose
//! children disambiguate them; everything else stays a leaf. Grouping is a
//! pure function of the candidate list, so a replayed trial rebuilds the same
//! tree; on-screen order is randomized later by the layout engine, never here.

use super::MenuItem;
use crate::catalog::Card;
use hashbrown::HashMap;

/// Grouping key: first two characters, or the whole string when length 1.
///
/// A card whose entire kimariji equals a longer sibling's prefix lands in the
/// same group and becomes an ordinary leaf child of that branch.
pub fn prefix_key(kimariji: &str) -> String {
    kimariji.chars().take(2).collect()
}

fn leaf(card: &Card) -> MenuItem {
    MenuItem::Leaf {
        card_id: card.id,
        label: card.kimariji.clone(),
    }
}

/// Group candidates (all sharing one initial) into menu items.
///
/// Group order follows first appearance of each prefix in `candidates`; with
/// a lexicographically sorted input this is deterministic, which the seeded
/// shuffle downstream depends on.
pub fn group_candidates(candidates: &[Card]) -> Vec<MenuItem> {
    let mut slot: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<&Card>)> = Vec::new();

    for card in candidates {
        let key = prefix_key(&card.kimariji);
        match slot.get(&key) {
            Some(&i) => groups[i].1.push(card),
            None => {
                slot.insert(key.clone(), groups.len());
                groups.push((key, vec![card]));
            }
        }
    }

    groups
        .into_iter()
        .map(|(label, mut cards)| {
            cards.sort_by(|a, b| a.kimariji.cmp(&b.kimariji));
            if cards.len() == 1 {
                leaf(cards[0])
            } else {
                MenuItem::Branch {
                    label,
                    children: cards.into_iter().map(leaf).collect(),
                }
            }
        })
        .collect()
}
