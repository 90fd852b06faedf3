use bitflags::bitflags;

bitflags! {
    /// Which fixed-function toggles a draw call actually wants to change.
    ///
    /// Anything not activated is left as the previous draw call set it.
    #[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
    pub struct ActivatedParameters: u8 {
        const DEPTH_TEST   = 1;
        const POLYGON_MODE = 1 << 1;
        const LINE_WIDTH   = 1 << 2;
        const POINT_SIZE   = 1 << 3;
        const VIEWPORT     = 1 << 4;
    }
}

bitflags! {
    #[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
    pub struct ClearFlags: u8 {
        const COLOR   = 1;
        const DEPTH   = 1 << 1;
        const STENCIL = 1 << 2;
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum PolygonMode {
    Point,
    Line,
    #[default]
    Fill,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Viewport {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// One fixed-function toggle as it is applied to the device.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum StateChange {
    DepthTest(bool),
    PolygonMode(PolygonMode),
    LineWidth(f32),
    PointSize(f32),
    Viewport(Viewport),
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RenderState {
    pub activated: ActivatedParameters,
    pub depth_test: bool,
    pub polygon_mode: PolygonMode,
    pub line_width: f32,
    pub point_size: f32,
    pub viewport: Viewport,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            activated: ActivatedParameters::empty(),
            depth_test: false,
            polygon_mode: PolygonMode::Fill,
            line_width: 1.0,
            point_size: 1.0,
            viewport: Viewport::default(),
        }
    }
}

impl RenderState {
    pub fn with_depth_test(mut self, enabled: bool) -> Self {
        self.depth_test = enabled;
        self.activated |= ActivatedParameters::DEPTH_TEST;
        self
    }

    pub fn with_polygon_mode(mut self, mode: PolygonMode) -> Self {
        self.polygon_mode = mode;
        self.activated |= ActivatedParameters::POLYGON_MODE;
        self
    }

    pub fn with_line_width(mut self, width: f32) -> Self {
        self.line_width = width;
        self.activated |= ActivatedParameters::LINE_WIDTH;
        self
    }

    pub fn with_point_size(mut self, size: f32) -> Self {
        self.point_size = size;
        self.activated |= ActivatedParameters::POINT_SIZE;
        self
    }

    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self.activated |= ActivatedParameters::VIEWPORT;
        self
    }

    pub fn is_activated(&self, parameter: ActivatedParameters) -> bool {
        self.activated.contains(parameter)
    }

    /// The activated toggles, in the order a draw applies them.
    pub fn changes(&self) -> impl Iterator<Item = StateChange> {
        [
            (ActivatedParameters::DEPTH_TEST, StateChange::DepthTest(self.depth_test)),
            (ActivatedParameters::POLYGON_MODE, StateChange::PolygonMode(self.polygon_mode)),
            (ActivatedParameters::LINE_WIDTH, StateChange::LineWidth(self.line_width)),
            (ActivatedParameters::POINT_SIZE, StateChange::PointSize(self.point_size)),
            (ActivatedParameters::VIEWPORT, StateChange::Viewport(self.viewport)),
        ]
        .into_iter()
        .filter(|(parameter, _)| self.is_activated(*parameter))
        .map(|(_, change)| change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setters_activate_their_parameter() {
        let state = RenderState::default()
            .with_depth_test(false)
            .with_viewport(Viewport::new(0, 0, 800, 600));

        assert!(state.is_activated(ActivatedParameters::DEPTH_TEST));
        assert!(state.is_activated(ActivatedParameters::VIEWPORT));
        assert!(!state.is_activated(ActivatedParameters::LINE_WIDTH));
        assert!(!state.depth_test);
        assert_eq!(state.viewport.width, 800);
    }

    #[test]
    fn default_state_changes_nothing() {
        assert!(RenderState::default().activated.is_empty());
        assert_eq!(RenderState::default().changes().count(), 0);
    }

    #[test]
    fn changes_skip_inactive_toggles() {
        let mut state = RenderState::default()
            .with_viewport(Viewport::new(0, 0, 64, 64))
            .with_depth_test(true);
        state.line_width = 3.0;

        let changes: Vec<_> = state.changes().collect();
        assert_eq!(
            changes,
            [
                StateChange::DepthTest(true),
                StateChange::Viewport(Viewport::new(0, 0, 64, 64)),
            ]
        );
    }
}
