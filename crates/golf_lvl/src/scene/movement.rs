use super::Transform;
use glam::Vec3;

/// Optional scripted motion of a model entity, applied on top of its base transform.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Movement {
    #[default]
    None,
    Linear(LinearMovement),
}

/// Linear, non-eased motion from `p0` to `p1`, that takes `length` time units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearMovement {
    pub p0: Vec3,
    pub p1: Vec3,
    pub length: f32,
    /// Current progress, in `0..=length`. Driven by gameplay code.
    pub t: f32,
}

impl Movement {
    #[inline]
    pub fn none() -> Self {
        Self::None
    }

    /// Creates a linear movement with its progress at the start.
    ///
    /// `length` must be positive.
    pub fn linear(p0: Vec3, p1: Vec3, length: f32) -> Self {
        debug_assert!(length > 0.0, "movement length must be positive");
        Self::Linear(LinearMovement {
            p0,
            p1,
            length,
            t: 0.0,
        })
    }

    /// Returns the transform with its position replaced by the current point of the movement.
    pub fn apply(&self, transform: Transform) -> Transform {
        match self {
            Movement::None => transform,
            Movement::Linear(linear) => Transform {
                position: linear.position(),
                ..transform
            },
        }
    }

    /// Moves the progress forward by `dt`, clamped to the movement's length. A NaN `dt` is
    /// ignored.
    pub fn advance(&mut self, dt: f32) {
        if dt.is_nan() {
            return;
        }
        if let Movement::Linear(linear) = self {
            linear.t = (linear.t + dt).clamp(0.0, linear.length.max(0.0));
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Movement::None)
    }
}

impl LinearMovement {
    /// Current point of the movement.
    pub fn position(&self) -> Vec3 {
        let fraction = if self.length > 0.0 {
            (self.t / self.length).clamp(0.0, 1.0)
        } else {
            1.0
        };
        self.p0.lerp(self.p1, fraction)
    }

    /// Whether the progress has reached the end.
    pub fn is_finished(&self) -> bool {
        self.t >= self.length
    }
}
