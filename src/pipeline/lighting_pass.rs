//! Deferred lighting pass
//!
//! Accumulates image based lighting from the G-buffer into the lightness
//! target with additive blending.

use crate::backend::{BlendState, ClearFlags, FramebufferId, GraphicsDevice, Rect};
use crate::uniforms::UniformBlockSlot;

use super::{FrameContext, GBuffer, PassState, RenderPass, ScreenDraw};

/// Lighting pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LightingPass {
    framebuffer: FramebufferId,
    area: Rect,
    environment: ScreenDraw,
}

impl LightingPass {
    /// `environment` draws the environment lighting program with its
    /// resolved samplers.
    pub fn new(gbuffer: &GBuffer, environment: ScreenDraw) -> Self {
        Self {
            framebuffer: gbuffer.lighting_framebuffer,
            area: gbuffer.rect(),
            environment,
        }
    }
}

impl RenderPass for LightingPass {
    fn name(&self) -> &str {
        "lighting"
    }

    fn state(&self, _ctx: &FrameContext<'_>) -> PassState {
        PassState::new(self.area)
            .with_blend(BlendState::ADDITIVE)
            .with_scissor()
    }

    fn execute(&self, device: &mut dyn GraphicsDevice, ctx: &FrameContext<'_>) {
        device.bind_framebuffer(self.framebuffer);
        device.clear(ClearFlags::COLOR, [0.0; 4], 1.0);
        device.bind_uniform_buffer(UniformBlockSlot::Common.index(), ctx.common_uniforms);
        self.environment.draw(device);
    }
}
