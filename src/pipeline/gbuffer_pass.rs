//! G-Buffer pass
//!
//! Renders the draw list into the G-buffer's color outputs and depth.

use crate::backend::{
    BlendState, ClearFlags, CompareFunction, CullFace, FramebufferId, FrontFace, GraphicsDevice,
    Rect,
};
use crate::uniforms::UniformBlockSlot;

use super::{FrameContext, GBuffer, PassState, RenderPass};

/// Geometry pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GBufferPass {
    framebuffer: FramebufferId,
    area: Rect,
}

impl GBufferPass {
    pub fn new(gbuffer: &GBuffer) -> Self {
        Self {
            framebuffer: gbuffer.geometry_framebuffer,
            area: gbuffer.rect(),
        }
    }
}

impl RenderPass for GBufferPass {
    fn name(&self) -> &str {
        "geometry"
    }

    fn state(&self, _ctx: &FrameContext<'_>) -> PassState {
        PassState::new(self.area)
            .with_depth(CompareFunction::LessEqual, true)
            .with_cull(CullFace::Back, FrontFace::Ccw)
            .with_blend(BlendState::ALPHA)
            .with_scissor()
    }

    fn execute(&self, device: &mut dyn GraphicsDevice, ctx: &FrameContext<'_>) {
        device.bind_framebuffer(self.framebuffer);
        device.clear(ClearFlags::ALL, [0.0; 4], 1.0);
        device.bind_uniform_buffer(UniformBlockSlot::Common.index(), ctx.common_uniforms);
        ctx.draw_list.submit(device);
    }
}
