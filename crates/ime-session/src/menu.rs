//! Composition-mode radio items in the host's input-method menu.

use ime_core::key_event::CompositionMode;

use crate::host::MenuItem;

const ITEMS: [(&str, CompositionMode); 6] = [
    ("MENU_COMPOSITION_HIRAGANA", CompositionMode::Hiragana),
    ("MENU_COMPOSITION_FULL_KATAKANA", CompositionMode::FullKatakana),
    ("MENU_COMPOSITION_FULL_ASCII", CompositionMode::FullAscii),
    ("MENU_COMPOSITION_HALF_KATAKANA", CompositionMode::HalfKatakana),
    ("MENU_COMPOSITION_HALF_ASCII", CompositionMode::HalfAscii),
    ("MENU_COMPOSITION_DIRECT", CompositionMode::Direct),
];

/// The full radio group with `selected` checked.
pub fn menu_items(selected: CompositionMode) -> Vec<MenuItem> {
    ITEMS
        .iter()
        .map(|&(id, mode)| MenuItem {
            id: id.to_string(),
            checked: mode == selected,
        })
        .collect()
}

pub fn mode_for_item(id: &str) -> Option<CompositionMode> {
    ITEMS
        .iter()
        .find(|(item, _)| *item == id)
        .map(|&(_, mode)| mode)
}
