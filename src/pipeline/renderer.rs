//! Frame orchestration
//!
//! [`DeferredRenderer`] owns the device, the frame targets, the programs of
//! every pass and the draw list, and runs the passes in order each frame.

use glam::{Mat4, Vec2, Vec3};

use crate::backend::{BufferId, BufferKind, GraphicsDevice, PrimitiveTopology, Rect, VertexArrayId};
use crate::draw::{DrawCmd, DrawHandle, DrawList};
use crate::error::{GraphicsError, GraphicsResult};
use crate::framebuffer::FramebufferDesc;
use crate::fs::FileSource;
use crate::materials::{SamplerArray, SamplerSet};
use crate::mesh::{build_program_vertex_array, cube, screen_triangle, Mesh, MeshLayout};
use crate::scene::{OrbitCamera, Projection};
use crate::shader::{ShaderLoader, ShaderProgram};
use crate::uniforms::{CommonUniforms, ModelUniforms};

use super::{
    run_pass, ComposePass, FrameContext, GBuffer, GBufferPass, IblMaps, LightingPass, PresentPass,
    RenderPass, RendererConfig, ScreenDraw, SkyboxPass,
};

/// Programs of the per-frame passes
#[derive(Debug)]
struct Programs {
    geometry: ShaderProgram,
    environment: ShaderProgram,
    compose: ShaderProgram,
    skybox: ShaderProgram,
    present: ShaderProgram,
    present_depth: ShaderProgram,
}

impl Programs {
    /// Load every pass program. Programs built before a failure are
    /// deleted again, so nothing is left behind on error.
    fn load(
        device: &mut dyn GraphicsDevice,
        loader: &mut ShaderLoader,
        config: &RendererConfig,
        gbuffer: &GBuffer,
    ) -> GraphicsResult<Self> {
        let mut staged = Vec::new();
        let loaded = Self::assemble(gbuffer, |name, outputs| {
            let program = loader.load(&mut *device, config.shader_path(name), outputs)?;
            staged.push(program.handle());
            Ok(program)
        });
        if loaded.is_err() {
            for handle in staged {
                device.delete_program(handle);
            }
        }
        loaded
    }

    fn assemble<'g>(
        gbuffer: &'g GBuffer,
        mut load: impl FnMut(&str, Option<&'g FramebufferDesc>) -> GraphicsResult<ShaderProgram>,
    ) -> GraphicsResult<Self> {
        Ok(Self {
            geometry: load("geometry.glsl", Some(&gbuffer.geometry_outputs))?,
            environment: load("environment.glsl", Some(&gbuffer.lighting_outputs))?,
            compose: load("compose.glsl", Some(&gbuffer.compose_outputs))?,
            skybox: load("skybox.glsl", Some(&gbuffer.compose_outputs))?,
            present: load("present.glsl", None)?,
            present_depth: load("present_depth.glsl", None)?,
        })
    }

    fn destroy(self, device: &mut dyn GraphicsDevice) {
        for program in [
            self.geometry,
            self.environment,
            self.compose,
            self.skybox,
            self.present,
            self.present_depth,
        ] {
            program.destroy(device);
        }
    }
}

/// The five passes plus the vertex arrays built for their programs
#[derive(Debug)]
struct Passes {
    geometry: GBufferPass,
    lighting: LightingPass,
    compose: ComposePass,
    skybox: SkyboxPass,
    present: PresentPass,
    vertex_arrays: Vec<VertexArrayId>,
}

impl Passes {
    /// Build the passes over `programs`. Vertex arrays created before a
    /// failure are deleted again.
    fn build(
        device: &mut dyn GraphicsDevice,
        programs: &Programs,
        gbuffer: &GBuffer,
        frame_samplers: &SamplerSet,
        cube: &Mesh,
        screen: &Mesh,
    ) -> GraphicsResult<Self> {
        let mut vertex_arrays = Vec::new();
        let built = Self::assemble(
            &mut *device,
            programs,
            gbuffer,
            frame_samplers,
            cube,
            screen,
            &mut vertex_arrays,
        );
        match built {
            Ok(passes) => Ok(Self {
                vertex_arrays,
                ..passes
            }),
            Err(err) => {
                for vertex_array in vertex_arrays {
                    device.delete_vertex_array(vertex_array);
                }
                Err(err)
            }
        }
    }

    fn assemble(
        device: &mut dyn GraphicsDevice,
        programs: &Programs,
        gbuffer: &GBuffer,
        frame_samplers: &SamplerSet,
        cube: &Mesh,
        screen: &Mesh,
        vertex_arrays: &mut Vec<VertexArrayId>,
    ) -> GraphicsResult<Self> {
        let mut vao = |program: &ShaderProgram, layout: &MeshLayout| -> GraphicsResult<VertexArrayId> {
            let vertex_array = build_program_vertex_array(&mut *device, program.handle(), layout)?;
            vertex_arrays.push(vertex_array);
            Ok(vertex_array)
        };
        let environment_vao = vao(&programs.environment, &screen.layout)?;
        let compose_vao = vao(&programs.compose, &screen.layout)?;
        let skybox_vao = vao(&programs.skybox, &cube.layout)?;
        let present_vao = vao(&programs.present, &screen.layout)?;
        let present_depth_vao = vao(&programs.present_depth, &screen.layout)?;

        let resolve = |program: &ShaderProgram| SamplerArray::resolve(program, None, Some(frame_samplers));
        let geometry = GBufferPass::new(gbuffer);
        let lighting = LightingPass::new(
            gbuffer,
            ScreenDraw::new(
                programs.environment.handle(),
                environment_vao,
                resolve(&programs.environment),
            ),
        );
        let compose = ComposePass::new(
            gbuffer,
            ScreenDraw::new(programs.compose.handle(), compose_vao, resolve(&programs.compose)),
        );
        let skybox = SkyboxPass::new(
            gbuffer,
            programs.skybox.handle(),
            skybox_vao,
            resolve(&programs.skybox),
        );
        let present = PresentPass::new(
            gbuffer,
            programs.present.handle(),
            present_vao,
            programs.present_depth.handle(),
            present_depth_vao,
        );

        Ok(Self {
            geometry,
            lighting,
            compose,
            skybox,
            present,
            vertex_arrays: Vec::new(),
        })
    }

    fn in_order(&self) -> [&dyn RenderPass; 5] {
        [
            &self.geometry,
            &self.lighting,
            &self.compose,
            &self.skybox,
            &self.present,
        ]
    }

    fn destroy(self, device: &mut dyn GraphicsDevice) {
        for vertex_array in self.vertex_arrays {
            device.delete_vertex_array(vertex_array);
        }
    }
}

/// Per-draw data kept to rebuild a draw after a shader reload
#[derive(Debug, Clone)]
struct SceneMesh {
    layout: MeshLayout,
    material: Option<SamplerSet>,
    model_buffer: BufferId,
}

/// Deferred PBR renderer
///
/// # Example
///
/// ```ignore
/// let mut renderer = DeferredRenderer::new(device, DiskFileSource, RendererConfig::default())?;
/// let knot = torus_knot(200, 16, 0.15).upload(renderer.device_mut())?;
/// renderer.add_mesh(&knot, PrimitiveTopology::TriangleStrip, Some(material), Mat4::IDENTITY)?;
/// loop {
///     renderer.render_frame();
/// }
/// ```
pub struct DeferredRenderer<D: GraphicsDevice> {
    device: D,
    config: RendererConfig,
    loader: ShaderLoader,
    gbuffer: GBuffer,
    ibl: IblMaps,
    programs: Programs,
    passes: Passes,
    frame_samplers: SamplerSet,
    cube: Mesh,
    screen: Mesh,
    common_buffer: BufferId,
    draw_list: DrawList,
    scene: Vec<SceneMesh>,
    camera: OrbitCamera,
    window: Rect,
    time: f32,
}

impl<D: GraphicsDevice> DeferredRenderer<D> {
    /// Create every frame resource, render the lighting maps and load the
    /// programs of all passes from `files`.
    pub fn new(
        mut device: D,
        files: impl FileSource + 'static,
        config: RendererConfig,
    ) -> GraphicsResult<Self> {
        if config.width == 0 || config.height == 0 {
            return Err(GraphicsError::InvalidParameter(format!(
                "render target size {}x{} is empty",
                config.width, config.height
            )));
        }

        let limits = device.limits();
        log::info!(
            target: "gl",
            "device limits: {} draw buffers, {} texture units, {} vertex attributes, {} uniform buffer bindings",
            limits.max_draw_buffers,
            limits.max_texture_units,
            limits.max_vertex_attributes,
            limits.max_uniform_buffer_bindings
        );
        device.set_vsync(config.vsync);

        let gbuffer = GBuffer::new(&mut device, config.width, config.height)?;
        let mut loader = ShaderLoader::new(files);
        let cube = cube().upload(&mut device)?;
        let screen = screen_triangle().upload(&mut device)?;
        let ibl = IblMaps::precompute(&mut device, &mut loader, &config, &cube, &screen)?;

        let mut frame_samplers = SamplerSet::new();
        gbuffer.add_to_sampler_set(&mut frame_samplers);
        ibl.add_to_sampler_set(&mut frame_samplers);

        let programs = Programs::load(&mut device, &mut loader, &config, &gbuffer)?;
        let passes = Passes::build(&mut device, &programs, &gbuffer, &frame_samplers, &cube, &screen)?;
        let common_buffer = device.create_buffer(
            BufferKind::Uniform,
            bytemuck::bytes_of(&CommonUniforms::default()),
        )?;

        let projection = Projection::perspective(
            config.fov_y,
            config.width as f32 / config.height as f32,
            config.z_near,
            config.z_far,
        );
        let camera = OrbitCamera::new(Vec3::ZERO, 5.0, projection);
        let window = Rect::from_size(config.width, config.height);

        log::info!(target: "renderer", "deferred renderer ready");

        Ok(Self {
            device,
            config,
            loader,
            gbuffer,
            ibl,
            programs,
            passes,
            frame_samplers,
            cube,
            screen,
            common_buffer,
            draw_list: DrawList::new(),
            scene: Vec::new(),
            camera,
            window,
            time: 0.0,
        })
    }

    /// Add a mesh to the geometry pass. `material` is the material catalog
    /// for its samplers.
    pub fn add_mesh(
        &mut self,
        mesh: &Mesh,
        topology: PrimitiveTopology,
        material: Option<SamplerSet>,
        transform: Mat4,
    ) -> GraphicsResult<DrawHandle> {
        let program = &self.programs.geometry;
        let vertex_array = build_program_vertex_array(&mut self.device, program.handle(), &mesh.layout)?;
        let model_buffer = match self.device.create_buffer(
            BufferKind::Uniform,
            bytemuck::bytes_of(&ModelUniforms::new(transform)),
        ) {
            Ok(buffer) => buffer,
            Err(err) => {
                self.device.delete_vertex_array(vertex_array);
                return Err(err);
            }
        };

        let cmd = match mesh.index_count {
            Some(count) => DrawCmd::indexed(
                topology,
                vertex_array,
                program.handle(),
                mesh.index_format(),
                0,
                count,
            ),
            None => DrawCmd::arrays(topology, vertex_array, program.handle(), 0, mesh.vertex_count),
        }
        .with_uniform_buffer(model_buffer);
        let samplers = SamplerArray::resolve(program, material.as_ref(), Some(&self.frame_samplers));

        self.scene.push(SceneMesh {
            layout: mesh.layout.clone(),
            material,
            model_buffer,
        });
        let handle = self.draw_list.push(cmd, samplers);
        log::debug!(target: "renderer", "added draw {}", handle.index());
        Ok(handle)
    }

    /// Replace the model matrix of a draw.
    pub fn set_transform(&mut self, handle: DrawHandle, transform: Mat4) {
        match self.scene.get(handle.index()) {
            Some(mesh) => self.device.write_buffer(
                mesh.model_buffer,
                0,
                bytemuck::bytes_of(&ModelUniforms::new(transform)),
            ),
            None => log::warn!(target: "renderer", "no draw {}", handle.index()),
        }
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut OrbitCamera {
        &mut self.camera
    }

    pub fn set_debug_view(&mut self, enabled: bool) {
        self.config.debug_view = enabled;
    }

    pub fn debug_view(&self) -> bool {
        self.config.debug_view
    }

    /// Follow a window resize. The frame targets keep their size; only the
    /// present viewport and the camera aspect change.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.window = Rect::from_size(width, height);
        self.camera.projection.set_aspect(width as f32, height as f32);
        log::debug!(target: "renderer", "window resized to {width}x{height}");
    }

    /// Render and present one frame, then advance the shader clock.
    pub fn render_frame(&mut self) {
        let viewport = Vec2::new(self.window.width as f32, self.window.height as f32);
        let uniforms = self.camera.common_uniforms(self.time, viewport);
        self.device
            .write_buffer(self.common_buffer, 0, bytemuck::bytes_of(&uniforms));

        let ctx = FrameContext {
            draw_list: &self.draw_list,
            common_uniforms: self.common_buffer,
            window: self.window,
            debug_view: self.config.debug_view,
            clear_color: self.config.clear_color,
        };
        for pass in self.passes.in_order() {
            run_pass(&mut self.device, pass, &ctx);
        }
        self.device.present();

        self.time += self.config.time_step;
    }

    /// Rebuild every pass program from source, then every vertex array and
    /// sampler array that refers to them. Must be called between frames.
    ///
    /// The new programs, passes and draw vertex arrays are all built before
    /// any of them replaces the running set. If one step fails, whatever was
    /// built is deleted and the renderer keeps drawing with its previous
    /// programs.
    pub fn reload_shaders(&mut self) -> GraphicsResult<()> {
        self.loader.clear_cache();
        let programs = Programs::load(&mut self.device, &mut self.loader, &self.config, &self.gbuffer)?;

        let passes = match Passes::build(
            &mut self.device,
            &programs,
            &self.gbuffer,
            &self.frame_samplers,
            &self.cube,
            &self.screen,
        ) {
            Ok(passes) => passes,
            Err(err) => {
                programs.destroy(&mut self.device);
                return Err(err);
            }
        };

        let mut vertex_arrays = Vec::with_capacity(self.scene.len());
        for mesh in &self.scene {
            match build_program_vertex_array(&mut self.device, programs.geometry.handle(), &mesh.layout) {
                Ok(vertex_array) => vertex_arrays.push(vertex_array),
                Err(err) => {
                    for vertex_array in vertex_arrays {
                        self.device.delete_vertex_array(vertex_array);
                    }
                    passes.destroy(&mut self.device);
                    programs.destroy(&mut self.device);
                    return Err(err);
                }
            }
        }

        let old_programs = std::mem::replace(&mut self.programs, programs);
        let old_passes = std::mem::replace(&mut self.passes, passes);
        let program = &self.programs.geometry;
        for ((item, mesh), vertex_array) in self.draw_list.iter_mut().zip(&self.scene).zip(vertex_arrays) {
            self.device.delete_vertex_array(item.cmd.vertex_array);
            item.cmd.vertex_array = vertex_array;
            item.cmd.program = program.handle();
            item.samplers = SamplerArray::resolve(program, mesh.material.as_ref(), Some(&self.frame_samplers));
        }
        old_passes.destroy(&mut self.device);
        old_programs.destroy(&mut self.device);

        log::info!(target: "renderer", "shaders reloaded");
        Ok(())
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn gbuffer(&self) -> &GBuffer {
        &self.gbuffer
    }

    pub fn ibl(&self) -> &IblMaps {
        &self.ibl
    }

    pub fn draw_list(&self) -> &DrawList {
        &self.draw_list
    }

    /// Frame catalog: G-buffer targets and lighting maps.
    pub fn frame_samplers(&self) -> &SamplerSet {
        &self.frame_samplers
    }

    /// Shader clock, advanced once per frame.
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Release every resource and hand the device back.
    pub fn destroy(mut self) -> D {
        let device = &mut self.device;
        for item in self.draw_list.iter() {
            device.delete_vertex_array(item.cmd.vertex_array);
        }
        for mesh in &self.scene {
            device.delete_buffer(mesh.model_buffer);
        }
        device.delete_buffer(self.common_buffer);
        self.passes.destroy(device);
        self.programs.destroy(device);
        self.ibl.destroy(device);
        self.cube.destroy(device);
        self.screen.destroy(device);
        self.gbuffer.destroy(device);
        self.device
    }
}
