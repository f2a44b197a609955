use std::collections::HashSet;

use glam::Vec2;

use crate::camera::CameraDirection;

/// Keys the renderer reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    W,
    A,
    S,
    D,
    Q,
    E,
    P,
    Escape,
}

impl Key {
    /// Camera movement bound to this key while it is held.
    pub fn movement(self) -> Option<CameraDirection> {
        Some(match self {
            Key::W => CameraDirection::Forward,
            Key::S => CameraDirection::Back,
            Key::A => CameraDirection::Left,
            Key::D => CameraDirection::Right,
            Key::E => CameraDirection::Up,
            Key::Q => CameraDirection::Down,
            Key::P | Key::Escape => return None,
        })
    }
}

/// Input gathered between two frames.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameInput {
    /// Keys held when the frame started, in a stable order.
    pub held: Vec<Key>,
    /// Keys that went down since the previous frame.
    pub pressed: Vec<Key>,
    pub mouse_delta: Vec2,
    pub scroll: f32,
}

impl FrameInput {
    pub fn was_pressed(&self, key: Key) -> bool {
        self.pressed.contains(&key)
    }
}

/// Pending window input, filled by event callbacks and drained once per
/// frame.
#[derive(Debug, Default)]
pub struct InputQueue {
    held: HashSet<Key>,
    pressed: Vec<Key>,
    mouse_delta: Vec2,
    scroll: f32,
}

impl InputQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key_pressed(&mut self, key: Key) {
        // OS key repeat arrives as repeated presses
        if self.held.insert(key) {
            self.pressed.push(key);
        }
    }

    pub fn key_released(&mut self, key: Key) {
        self.held.remove(&key);
    }

    pub fn mouse_motion(&mut self, dx: f32, dy: f32) {
        self.mouse_delta += Vec2::new(dx, dy);
    }

    pub fn scrolled(&mut self, amount: f32) {
        self.scroll += amount;
    }

    /// Hands out everything accumulated since the last call and resets the
    /// per-frame deltas. Held keys persist.
    pub fn take_frame(&mut self) -> FrameInput {
        let mut held: Vec<Key> = self.held.iter().copied().collect();
        held.sort_by_key(|key| *key as u8);
        FrameInput {
            held,
            pressed: std::mem::take(&mut self.pressed),
            mouse_delta: std::mem::take(&mut self.mouse_delta),
            scroll: std::mem::take(&mut self.scroll),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movement_keys_map_to_directions() {
        assert_eq!(Key::W.movement(), Some(CameraDirection::Forward));
        assert_eq!(Key::Q.movement(), Some(CameraDirection::Down));
        assert_eq!(Key::P.movement(), None);
    }

    #[test]
    fn deltas_are_consumed_once() {
        let mut queue = InputQueue::new();
        queue.mouse_motion(3.0, -2.0);
        queue.mouse_motion(1.0, 1.0);
        queue.scrolled(1.0);
        queue.key_pressed(Key::W);

        let frame = queue.take_frame();
        assert_eq!(frame.mouse_delta, Vec2::new(4.0, -1.0));
        assert_eq!(frame.scroll, 1.0);
        assert!(frame.was_pressed(Key::W));
        assert_eq!(frame.held, vec![Key::W]);

        let next = queue.take_frame();
        assert_eq!(next.mouse_delta, Vec2::ZERO);
        assert_eq!(next.scroll, 0.0);
        assert!(next.pressed.is_empty());
        assert_eq!(next.held, vec![Key::W]);
    }

    #[test]
    fn repeat_presses_are_not_new_edges() {
        let mut queue = InputQueue::new();
        queue.key_pressed(Key::P);
        queue.key_pressed(Key::P);
        assert_eq!(queue.take_frame().pressed, vec![Key::P]);
        queue.key_released(Key::P);
        assert!(queue.take_frame().held.is_empty());
        queue.key_pressed(Key::P);
        assert_eq!(queue.take_frame().pressed, vec![Key::P]);
    }
}
