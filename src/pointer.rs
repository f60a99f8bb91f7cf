use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type PointerId = i64;

/// Id the hosts use for the mouse. Touch contacts use their own identifiers,
/// which are never negative.
pub const MOUSE_POINTER_ID: PointerId = -1;

/// When a contact picks up the next palette color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ColorCycle {
    /// Every move event advances the shared palette index.
    #[default]
    PerMove,
    /// The palette advances once every `period_frames` frames, whether or
    /// not anything moves.
    Timed { period_frames: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pointer {
    pub id: PointerId,
    /// Normalized surface coordinate, y up.
    pub position: Vec2,
    /// Position change since the previous event.
    pub delta: Vec2,
    pub color: [f32; 3],
    pub pressed: bool,
    /// Set by every event, cleared once the splat for it has been injected.
    pub moved: bool,
}

#[derive(Debug, Clone)]
pub struct PointerTracker {
    pointers: HashMap<PointerId, Pointer>,
    palette: Vec<[f32; 3]>,
    cycle: ColorCycle,
    next_color: usize,
    frame: u64,
}

impl PointerTracker {
    pub fn new(palette: Vec<[f32; 3]>, cycle: ColorCycle) -> Self {
        assert!(!palette.is_empty(), "palette needs at least one color");
        Self {
            pointers: HashMap::new(),
            palette,
            cycle,
            next_color: 0,
            frame: 0,
        }
    }

    fn next_color(&mut self) -> [f32; 3] {
        match self.cycle {
            ColorCycle::PerMove => {
                let color = self.palette[self.next_color % self.palette.len()];
                self.next_color = self.next_color.wrapping_add(1);
                color
            }
            ColorCycle::Timed { period_frames } => {
                let step = self.frame / period_frames.max(1) as u64;
                self.palette[(step % self.palette.len() as u64) as usize]
            }
        }
    }

    /// Records a contact event at a normalized position.
    ///
    /// A new id starts with zero delta and `moved` already set, so its first
    /// event still produces a splat.
    pub fn update(&mut self, id: PointerId, position: Vec2, pressed: bool) {
        let color = self.next_color();

        match self.pointers.get_mut(&id) {
            Some(pointer) => {
                pointer.delta = position - pointer.position;
                pointer.position = position;
                pointer.pressed = pressed;
                pointer.moved = true;
                pointer.color = color;
            }
            None => {
                log::debug!("new pointer {} at ({:.3}, {:.3})", id, position.x, position.y);
                self.pointers.insert(
                    id,
                    Pointer {
                        id,
                        position,
                        delta: Vec2::ZERO,
                        color,
                        pressed,
                        moved: true,
                    },
                );
            }
        }
    }

    /// Forgets a contact; the same id later starts cold again.
    pub fn end(&mut self, id: PointerId) -> Option<Pointer> {
        self.pointers.remove(&id)
    }

    /// Advances the frame clock used by timed color cycling.
    pub fn tick(&mut self) {
        self.frame += 1;
    }

    pub fn get(&self, id: PointerId) -> Option<&Pointer> {
        self.pointers.get(&id)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Pointer> {
        self.pointers.values_mut()
    }

    pub fn len(&self) -> usize {
        self.pointers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pointers.is_empty()
    }
}
