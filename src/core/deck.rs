//! Trial deck: eligible cards × repetitions, shuffled once per session.
//!
//! Deck order is deliberately session-random (not replayable): fairness of
//! stimulus order does not require reproducibility, only the per-trial menu
//! layout does.

use crate::catalog::Card;
use crate::config::ExperimentConfig;
use crate::rng::{shuffle, SeededRng};
use serde::{Deserialize, Serialize};

/// One entry of the trial deck. Immutable once the deck is built; result
/// fields live on [`crate::session::TrialResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trial {
    /// 1-based, dense, unique within the deck.
    pub trial_index: u32,
    pub stimulus_card_id: u32,
    pub stimulus_path: String,
    /// Zero-based repetition tag for this card.
    pub repetition: u32,
}

/// Cards allowed into the deck: the test-mode allow-list when present,
/// otherwise everything up to the category cut-off.
pub fn eligible_cards<'a>(cards: &'a [Card], config: &ExperimentConfig) -> Vec<&'a Card> {
    match &config.test_category_ids {
        Some(ids) => cards.iter().filter(|c| ids.contains(&c.id)).collect(),
        None => cards
            .iter()
            .filter(|c| c.id <= config.total_categories)
            .collect(),
    }
}

/// Expand, shuffle, then assign dense 1-based trial indices.
pub fn build_deck(cards: &[Card], config: &ExperimentConfig, rng: &mut SeededRng) -> Vec<Trial> {
    let mut deck: Vec<Trial> = Vec::new();
    for card in eligible_cards(cards, config) {
        for rep in 0..config.main_repetitions {
            deck.push(Trial {
                trial_index: 0,
                stimulus_card_id: card.id,
                stimulus_path: card.audio_path.clone(),
                repetition: rep,
            });
        }
    }

    shuffle(&mut deck, rng);
    for (i, trial) in deck.iter_mut().enumerate() {
        trial.trial_index = i as u32 + 1;
    }
    deck
}
