//! Compose pass: albedo, lighting and emission into the final target.

use crate::backend::{ClearFlags, FramebufferId, GraphicsDevice, Rect};
use crate::uniforms::UniformBlockSlot;

use super::{FrameContext, GBuffer, PassState, RenderPass, ScreenDraw};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposePass {
    framebuffer: FramebufferId,
    area: Rect,
    compose: ScreenDraw,
}

impl ComposePass {
    pub fn new(gbuffer: &GBuffer, compose: ScreenDraw) -> Self {
        Self {
            framebuffer: gbuffer.compose_framebuffer,
            area: gbuffer.rect(),
            compose,
        }
    }
}

impl RenderPass for ComposePass {
    fn name(&self) -> &str {
        "compose"
    }

    fn state(&self, _ctx: &FrameContext<'_>) -> PassState {
        PassState::new(self.area)
    }

    fn execute(&self, device: &mut dyn GraphicsDevice, ctx: &FrameContext<'_>) {
        device.bind_framebuffer(self.framebuffer);
        device.clear(ClearFlags::COLOR, [0.0; 4], 1.0);
        device.bind_uniform_buffer(UniformBlockSlot::Common.index(), ctx.common_uniforms);
        self.compose.draw(device);
    }
}
