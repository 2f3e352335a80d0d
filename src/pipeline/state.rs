//! Fixed-function state of a pass.

use crate::backend::{BlendState, CompareFunction, CullFace, FrontFace, GraphicsDevice, Rect};

/// Complete fixed-function state for one pass.
///
/// [`apply`](Self::apply) sets every field on the device, so a pass never
/// depends on what the previous pass left behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassState {
    /// Depth test function, `None` disables the test.
    pub depth_test: Option<CompareFunction>,
    pub depth_write: bool,
    /// Culled faces, `None` disables culling.
    pub cull: Option<CullFace>,
    pub front_face: FrontFace,
    pub blend: Option<BlendState>,
    pub viewport: Rect,
    /// Scissor rectangle, `None` disables the test.
    pub scissor: Option<Rect>,
}

impl PassState {
    /// Everything off, counter-clockwise front faces.
    pub const fn new(viewport: Rect) -> Self {
        Self {
            depth_test: None,
            depth_write: false,
            cull: None,
            front_face: FrontFace::Ccw,
            blend: None,
            viewport,
            scissor: None,
        }
    }

    pub fn with_depth(mut self, func: CompareFunction, write: bool) -> Self {
        self.depth_test = Some(func);
        self.depth_write = write;
        self
    }

    pub fn with_cull(mut self, face: CullFace, front_face: FrontFace) -> Self {
        self.cull = Some(face);
        self.front_face = front_face;
        self
    }

    pub fn with_blend(mut self, blend: BlendState) -> Self {
        self.blend = Some(blend);
        self
    }

    /// Scissor to the viewport.
    pub fn with_scissor(mut self) -> Self {
        self.scissor = Some(self.viewport);
        self
    }

    pub fn apply(&self, device: &mut dyn GraphicsDevice) {
        device.set_depth_test(self.depth_test);
        device.set_depth_write(self.depth_write);
        device.set_cull_mode(self.cull);
        device.set_front_face(self.front_face);
        device.set_blend(self.blend);
        device.set_viewport(self.viewport);
        device.set_scissor(self.scissor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{DeviceCommand, DummyDevice};

    #[test]
    fn test_apply_sets_everything() {
        let mut device = DummyDevice::new();
        let viewport = Rect::from_size(64, 32);
        PassState::new(viewport)
            .with_depth(CompareFunction::LessEqual, true)
            .with_cull(CullFace::Back, FrontFace::Cw)
            .with_blend(BlendState::ADDITIVE)
            .with_scissor()
            .apply(&mut device);

        assert_eq!(
            device.take_commands(),
            vec![
                DeviceCommand::SetDepthTest(Some(CompareFunction::LessEqual)),
                DeviceCommand::SetDepthWrite(true),
                DeviceCommand::SetCullMode(Some(CullFace::Back)),
                DeviceCommand::SetFrontFace(FrontFace::Cw),
                DeviceCommand::SetBlend(Some(BlendState::ADDITIVE)),
                DeviceCommand::SetViewport(viewport),
                DeviceCommand::SetScissor(Some(viewport)),
            ]
        );
    }

    #[test]
    fn test_new_disables_tests() {
        let state = PassState::new(Rect::from_size(1, 1));
        assert_eq!(state.depth_test, None);
        assert!(!state.depth_write);
        assert_eq!(state.blend, None);
        assert_eq!(state.scissor, None);
    }
}
