//! Skybox pass
//!
//! Draws the environment cube from the inside into the final target,
//! depth tested against the G-buffer depth so it only fills the background.

use crate::backend::{
    CompareFunction, CullFace, FramebufferId, FrontFace, GraphicsDevice, PrimitiveTopology, ProgramId,
    Rect, VertexArrayId,
};
use crate::materials::SamplerArray;
use crate::uniforms::UniformBlockSlot;

use super::{FrameContext, GBuffer, PassState, RenderPass};

const CUBE_VERTEX_COUNT: u32 = 36;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkyboxPass {
    framebuffer: FramebufferId,
    area: Rect,
    program: ProgramId,
    vertex_array: VertexArrayId,
    samplers: SamplerArray,
}

impl SkyboxPass {
    /// `vertex_array` must hold the 36-vertex cube built for `program`.
    pub fn new(
        gbuffer: &GBuffer,
        program: ProgramId,
        vertex_array: VertexArrayId,
        samplers: SamplerArray,
    ) -> Self {
        Self {
            framebuffer: gbuffer.skybox_framebuffer,
            area: gbuffer.rect(),
            program,
            vertex_array,
            samplers,
        }
    }
}

impl RenderPass for SkyboxPass {
    fn name(&self) -> &str {
        "skybox"
    }

    fn state(&self, _ctx: &FrameContext<'_>) -> PassState {
        // inside faces of a counter-clockwise cube wind clockwise
        PassState::new(self.area)
            .with_depth(CompareFunction::LessEqual, true)
            .with_cull(CullFace::Back, FrontFace::Cw)
    }

    fn execute(&self, device: &mut dyn GraphicsDevice, ctx: &FrameContext<'_>) {
        device.bind_framebuffer(self.framebuffer);
        device.bind_uniform_buffer(UniformBlockSlot::Common.index(), ctx.common_uniforms);
        device.bind_vertex_array(self.vertex_array);
        self.samplers.bind(device);
        device.use_program(self.program);
        device.draw_arrays(PrimitiveTopology::Triangles, 0, CUBE_VERTEX_COUNT, None);
    }
}
