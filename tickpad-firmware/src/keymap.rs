use heapless::Vec;

use crate::{
    config::{MAX_HELD_LAYERS, MAX_KEYS},
    key_scanner::{KeyEvent, KeyEventKind},
    matrix::Decoder,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Action {
    /// The key does nothing.
    NoOp,
    /// Use the action of the next lower active layer.
    Transparent,
    Key(u8),
    /// A keycode reported together with a modifier mask.
    Modified {
        key: u8,
        modifiers: u8,
    },
    Macro(u8),
    /// Activate a layer while the key is held.
    LayerShift(u8),
}

/// Actions indexed by logical key index.
pub type Layer = &'static [Action];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Resolved {
    pub index: usize,
    pub action: Action,
    pub kind: KeyEventKind,
}

pub struct Resolver {
    keymap: &'static [Layer],
    decoder: Decoder,
    /// Layers held by layer-shift keys, most recent last.
    held_layers: Vec<u8, MAX_HELD_LAYERS>,
    /// The action each held key resolved to when it went down.
    active: [Option<Action>; MAX_KEYS],
}

impl Resolver {
    pub fn new(keymap: &'static [Layer], decoder: Decoder) -> Self {
        Self {
            keymap,
            decoder,
            held_layers: Vec::new(),
            active: [None; MAX_KEYS],
        }
    }

    pub fn active_layer(&self) -> u8 {
        self.held_layers.last().copied().unwrap_or(0)
    }

    /// Resolve `event` to an action. Positions outside the keymap, and releases of keys that never
    /// resolved a press, yield `None`.
    pub fn resolve(&mut self, event: &KeyEvent) -> Option<Resolved> {
        let index = self.decoder.logical_index(event.position)?;
        if index >= MAX_KEYS {
            return None;
        }

        let action = match event.kind {
            KeyEventKind::Pressed => {
                let action = self.lookup(index)?;
                self.active[index] = Some(action);
                if let Action::LayerShift(layer) = action {
                    self.push_layer(layer);
                }
                action
            }
            KeyEventKind::Released => {
                let Some(action) = self.active[index].take() else {
                    crate::debug!("release without press at {}", index);
                    return None;
                };
                if let Action::LayerShift(layer) = action {
                    self.pop_layer(layer);
                }
                action
            }
        };

        Some(Resolved {
            index,
            action,
            kind: event.kind,
        })
    }

    fn lookup(&self, index: usize) -> Option<Action> {
        let mut found = false;
        for layer in self
            .held_layers
            .iter()
            .rev()
            .copied()
            .chain(core::iter::once(0))
        {
            if let Some(&action) = self
                .keymap
                .get(layer as usize)
                .and_then(|actions| actions.get(index))
            {
                found = true;
                if action != Action::Transparent {
                    return Some(action);
                }
            }
        }
        found.then_some(Action::NoOp)
    }

    fn push_layer(&mut self, layer: u8) {
        if self.held_layers.push(layer).is_err() {
            crate::warn!("too many held layers; ignoring {}", layer);
        }
    }

    fn pop_layer(&mut self, layer: u8) {
        if let Some(i) = self.held_layers.iter().rposition(|l| *l == layer) {
            self.held_layers.remove(i);
        }
    }
}

#[cfg(test)]
#[path = "keymap_test.rs"]
mod test;
