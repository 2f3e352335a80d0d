//! Present pass
//!
//! Copies the final target to the window, or lays out every G-buffer
//! channel in a 3x3 grid when the debug view is on.

use crate::backend::{
    ClearFlags, FramebufferId, GraphicsDevice, PrimitiveTopology, ProgramId, Rect, TextureId,
    TextureTarget, VertexArrayId,
};
use crate::uniforms::UniformBlockSlot;

use super::{FrameContext, GBuffer, PassState, RenderPass};

/// Texture shown in one debug grid tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DebugChannel {
    Final,
    Albedo,
    Normal,
    WorldPos,
    Roughness,
    Metallic,
    Emission,
    Lightness,
    Depth,
}

impl DebugChannel {
    /// Grid order: left to right, bottom row first.
    pub const ALL: [DebugChannel; 9] = [
        DebugChannel::Final,
        DebugChannel::Albedo,
        DebugChannel::Normal,
        DebugChannel::WorldPos,
        DebugChannel::Roughness,
        DebugChannel::Metallic,
        DebugChannel::Emission,
        DebugChannel::Lightness,
        DebugChannel::Depth,
    ];

    pub fn texture(self, gbuffer: &GBuffer) -> TextureId {
        match self {
            DebugChannel::Final => gbuffer.final_color,
            DebugChannel::Albedo => gbuffer.albedo,
            DebugChannel::Normal => gbuffer.normal,
            DebugChannel::WorldPos => gbuffer.world_pos,
            DebugChannel::Roughness => gbuffer.roughness,
            DebugChannel::Metallic => gbuffer.metallic,
            DebugChannel::Emission => gbuffer.emission,
            DebugChannel::Lightness => gbuffer.lightness,
            DebugChannel::Depth => gbuffer.depth,
        }
    }
}

/// Viewport of grid tile `index` (0..9) inside `window`. Tiles run left to
/// right, bottom row first, each a third of the window in both directions.
pub fn debug_tile_rect(window: Rect, index: usize) -> Rect {
    let width = window.width / 3;
    let height = window.height / 3;
    let column = (index % 3) as u32;
    let row = (index / 3) as u32;
    Rect::new(
        window.x + (column * width) as i32,
        window.y + (row * height) as i32,
        width,
        height,
    )
}

/// Window output pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentPass {
    program: ProgramId,
    depth_program: ProgramId,
    vertex_array: VertexArrayId,
    depth_vertex_array: VertexArrayId,
    /// Texture per [`DebugChannel::ALL`] entry
    channels: [TextureId; 9],
}

impl PresentPass {
    /// `program` shows a color texture bound at unit 0, `depth_program`
    /// shows the depth target bound at unit 0. Each vertex array holds the
    /// screen triangle for its program.
    pub fn new(
        gbuffer: &GBuffer,
        program: ProgramId,
        vertex_array: VertexArrayId,
        depth_program: ProgramId,
        depth_vertex_array: VertexArrayId,
    ) -> Self {
        Self {
            program,
            depth_program,
            vertex_array,
            depth_vertex_array,
            channels: DebugChannel::ALL.map(|channel| channel.texture(gbuffer)),
        }
    }

    fn draw_texture(&self, device: &mut dyn GraphicsDevice, channel: DebugChannel, texture: TextureId) {
        let (program, vertex_array) = if channel == DebugChannel::Depth {
            (self.depth_program, self.depth_vertex_array)
        } else {
            (self.program, self.vertex_array)
        };
        device.bind_vertex_array(vertex_array);
        device.bind_texture(0, TextureTarget::Texture2D, texture);
        device.use_program(program);
        device.draw_arrays(PrimitiveTopology::Triangles, 0, 3, None);
    }
}

impl RenderPass for PresentPass {
    fn name(&self) -> &str {
        "present"
    }

    fn state(&self, ctx: &FrameContext<'_>) -> PassState {
        PassState::new(ctx.window)
    }

    fn execute(&self, device: &mut dyn GraphicsDevice, ctx: &FrameContext<'_>) {
        device.bind_framebuffer(FramebufferId::NONE);
        device.clear(ClearFlags::COLOR | ClearFlags::DEPTH, ctx.clear_color, 1.0);

        if !ctx.debug_view {
            self.draw_texture(device, DebugChannel::Final, self.channels[0]);
            return;
        }

        device.bind_uniform_buffer(UniformBlockSlot::Common.index(), ctx.common_uniforms);
        for (index, (channel, texture)) in DebugChannel::ALL.into_iter().zip(self.channels).enumerate() {
            let tile = debug_tile_rect(ctx.window, index);
            device.set_viewport(tile);
            device.set_scissor(Some(tile));
            self.draw_texture(device, channel, texture);
        }
        device.set_scissor(None);
    }
}
