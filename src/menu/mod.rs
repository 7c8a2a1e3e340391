//! Hierarchical radial choice menu.
//!
//! The menu is a small reducer: discrete hover/click/back/confirm events go
//! in, renderable sector primitives come out. All spatial randomness derives
//! from the per-trial seed, so the same trial always shows the same menu.

pub mod hierarchy;
pub mod layout;

use crate::catalog::Card;
use crate::rng::{shuffle, SeededRng};
use layout::{child_order_seed, layout_children, layout_root, ring_for_level, Wedge};
use serde::{Deserialize, Serialize};

/// One selectable item of a menu ring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuItem {
    /// Choosing it records a final answer.
    Leaf { card_id: u32, label: String },
    /// Expands into a disambiguating sub-ring instead of answering.
    Branch {
        label: String,
        children: Vec<MenuItem>,
    },
}

impl MenuItem {
    pub fn label(&self) -> &str {
        match self {
            MenuItem::Leaf { label, .. } => label,
            MenuItem::Branch { label, .. } => label,
        }
    }

    pub fn is_branch(&self) -> bool {
        matches!(self, MenuItem::Branch { .. })
    }
}

/// The 5×10 gojūon initial grid, row-major. `None` cells are placeholders.
pub const GOJUON_GRID: [Option<char>; 50] = [
    Some('わ'), Some('ら'), Some('や'), Some('ま'), Some('は'),
    Some('な'), Some('た'), Some('さ'), Some('か'), Some('あ'),
    Some('を'), Some('り'), None,       Some('み'), Some('ひ'),
    Some('に'), Some('ち'), Some('し'), Some('き'), Some('い'),
    Some('ん'), Some('る'), Some('ゆ'), Some('む'), Some('ふ'),
    Some('ぬ'), Some('つ'), Some('す'), Some('く'), Some('う'),
    None,       Some('れ'), None,       Some('め'), Some('へ'),
    Some('ね'), Some('て'), Some('せ'), Some('け'), Some('え'),
    None,       Some('ろ'), Some('よ'), Some('も'), Some('ほ'),
    Some('の'), Some('と'), Some('そ'), Some('こ'), Some('お'),
];

/// Initials that lead anywhere: the distinct first characters of the catalog,
/// sorted for a stable view.
pub fn valid_initials(cards: &[Card]) -> Vec<char> {
    let mut initials: Vec<char> = cards.iter().filter_map(|c| c.kimariji.chars().next()).collect();
    initials.sort_unstable();
    initials.dedup();
    initials
}

/// Renderer/hit-test event fed back into the menu reducer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MenuEvent {
    /// A gojūon grid cell was chosen; opens the radial menu for that initial.
    SelectInitial { initial: char },
    /// Hover over the root-ring sector at this on-screen position.
    HoverBranch { index: usize },
    /// Click on the sector at `(level, index)`.
    ClickLeaf { level: u32, index: usize },
    /// Return to the initial grid, clearing any selection.
    Back,
    Confirm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuOutcome {
    None,
    Confirmed { card_id: u32 },
}

/// Renderable primitive: one donut sector (or full ring) plus state the
/// renderer needs for labels and highlighting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorView {
    pub level: u32,
    /// Position within its ring; hover/click events refer back to this.
    pub index: usize,
    pub inner_radius: f64,
    pub outer_radius: f64,
    pub start_angle: f64,
    pub end_angle: f64,
    pub label: String,
    pub is_branch: bool,
    pub is_selected: bool,
    pub card_id: Option<u32>,
}

/// Per-trial menu state: seed, grouped items, expansion path, selection lock.
///
/// Exactly one expansion path is live at a time; hovering a sibling branch
/// retracts any open descendant of a different branch. Once a leaf is chosen
/// the selection is locked: hover expansion is suppressed until confirm or
/// back, though clicking a different visible leaf may still re-select.
#[derive(Debug, Clone)]
pub struct MenuController {
    seed: u32,
    selected_initial: Option<char>,
    root_items: Vec<MenuItem>,
    /// On-screen root position of the expanded branch, if any.
    expanded_root: Option<usize>,
    selected: Option<u32>,
    locked: bool,
}

impl MenuController {
    pub fn new(seed: u32) -> Self {
        Self {
            seed,
            selected_initial: None,
            root_items: Vec::new(),
            expanded_root: None,
            selected: None,
            locked: false,
        }
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn selected(&self) -> Option<u32> {
        self.selected
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn selected_initial(&self) -> Option<char> {
        self.selected_initial
    }

    pub fn apply(&mut self, event: MenuEvent, cards: &[Card]) -> MenuOutcome {
        match event {
            MenuEvent::SelectInitial { initial } => {
                let mut candidates: Vec<Card> = cards
                    .iter()
                    .filter(|c| c.kimariji.starts_with(initial))
                    .cloned()
                    .collect();
                if candidates.is_empty() {
                    // Disabled grid cell; dropped without state change.
                    return MenuOutcome::None;
                }
                candidates.sort_by(|a, b| a.kimariji.cmp(&b.kimariji));

                let mut items = hierarchy::group_candidates(&candidates);
                let mut rng = SeededRng::new(self.seed ^ layout::INITIAL_SHUFFLE_SALT);
                shuffle(&mut items, &mut rng);

                self.selected_initial = Some(initial);
                self.root_items = items;
                self.expanded_root = None;
                self.selected = None;
                self.locked = false;
                MenuOutcome::None
            }

            MenuEvent::HoverBranch { index } => {
                if self.locked || self.root_items.is_empty() {
                    return MenuOutcome::None;
                }
                let placed = layout_root(self.root_items.len(), 1, self.seed);
                if let Some((orig, _)) = placed.get(index) {
                    if self.root_items[*orig].is_branch() {
                        self.expanded_root = Some(index);
                    }
                }
                MenuOutcome::None
            }

            MenuEvent::ClickLeaf { level, index } => {
                if let Some(card_id) = self.resolve_leaf(level, index) {
                    self.selected = Some(card_id);
                    self.locked = true;
                }
                MenuOutcome::None
            }

            MenuEvent::Back => {
                self.selected = None;
                self.locked = false;
                self.expanded_root = None;
                self.root_items.clear();
                self.selected_initial = None;
                MenuOutcome::None
            }

            MenuEvent::Confirm => match self.selected {
                Some(card_id) => MenuOutcome::Confirmed { card_id },
                None => MenuOutcome::None,
            },
        }
    }

    fn resolve_leaf(&self, level: u32, index: usize) -> Option<u32> {
        let placed = layout_root(self.root_items.len(), 1, self.seed);
        match level {
            1 => {
                let (orig, _) = placed.get(index)?;
                match &self.root_items[*orig] {
                    MenuItem::Leaf { card_id, .. } => Some(*card_id),
                    MenuItem::Branch { .. } => None,
                }
            }
            2 => {
                let pos = self.expanded_root?;
                let (orig, wedge) = placed.get(pos)?;
                let MenuItem::Branch { children, .. } = &self.root_items[*orig] else {
                    return None;
                };
                let initial = self.selected_initial?;
                let order_seed = child_order_seed(self.seed, initial, 2, wedge);
                let placed_children = layout_children(children.len(), *wedge, order_seed);
                let (child_orig, _) = placed_children.get(index)?;
                match &children[*child_orig] {
                    MenuItem::Leaf { card_id, .. } => Some(*card_id),
                    MenuItem::Branch { .. } => None,
                }
            }
            _ => None,
        }
    }

    /// Current renderable sectors: the root ring plus, when a branch is
    /// expanded, its child ring confined to the branch wedge.
    pub fn sectors(&self) -> Vec<SectorView> {
        let mut out = Vec::new();
        if self.root_items.is_empty() {
            return out;
        }

        let root_ring = ring_for_level(1);
        let placed = layout_root(self.root_items.len(), 1, self.seed);
        for (index, (orig, wedge)) in placed.iter().enumerate() {
            out.push(self.sector_view(&self.root_items[*orig], 1, index, root_ring, *wedge));
        }

        if let Some(pos) = self.expanded_root {
            if let Some((orig, wedge)) = placed.get(pos) {
                if let MenuItem::Branch { children, .. } = &self.root_items[*orig] {
                    if let Some(initial) = self.selected_initial {
                        let child_ring = ring_for_level(2);
                        let order_seed = child_order_seed(self.seed, initial, 2, wedge);
                        for (index, (child_orig, child_wedge)) in
                            layout_children(children.len(), *wedge, order_seed)
                                .iter()
                                .enumerate()
                        {
                            out.push(self.sector_view(
                                &children[*child_orig],
                                2,
                                index,
                                child_ring,
                                *child_wedge,
                            ));
                        }
                    }
                }
            }
        }

        out
    }

    fn sector_view(
        &self,
        item: &MenuItem,
        level: u32,
        index: usize,
        ring: layout::Ring,
        wedge: Wedge,
    ) -> SectorView {
        let card_id = match item {
            MenuItem::Leaf { card_id, .. } => Some(*card_id),
            MenuItem::Branch { .. } => None,
        };
        SectorView {
            level,
            index,
            inner_radius: ring.inner_radius,
            outer_radius: ring.outer_radius,
            start_angle: wedge.start_angle,
            end_angle: wedge.end_angle,
            label: item.label().to_string(),
            is_branch: item.is_branch(),
            is_selected: card_id.is_some() && card_id == self.selected,
            card_id,
        }
    }
}
