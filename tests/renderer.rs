//! Integration tests for the deferred frame.
//!
//! A [`DeferredRenderer`] is built on the [`DummyDevice`] from the shipped
//! shaders, a frame is rendered, and the recorded command stream is checked
//! for pass order, per-pass state and the debug grid layout.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test --test renderer
//! ```

mod common;

use glam::Mat4;
use rstest::rstest;

use common::{renderer, shipped_shaders, small_config};
use redlilium_deferred::backend::{
    BlendState, ClearFlags, CompareFunction, CullFace, DeviceCommand, FramebufferId, FrontFace,
    PrimitiveTopology, ProgramId, Rect, TextureTarget,
};
use redlilium_deferred::materials::TextureBinding;
use redlilium_deferred::mesh::{cube, torus_knot};
use redlilium_deferred::pipeline::{debug_tile_rect, DebugChannel};
use redlilium_deferred::{
    DeferredRenderer, DummyDevice, GraphicsError, MemoryFileSource, RendererConfig, SamplerSet,
};

/// Index of every framebuffer bind in `commands`.
fn framebuffer_binds(commands: &[DeviceCommand]) -> Vec<(usize, FramebufferId)> {
    commands
        .iter()
        .enumerate()
        .filter_map(|(i, command)| match command {
            DeviceCommand::BindFramebuffer(fb) => Some((i, *fb)),
            _ => None,
        })
        .collect()
}

/// Last command before `end` matching `pick`. Passes apply their full state
/// right before binding their target, so this finds the state of the pass
/// that binds at `end`.
fn last_before<T>(
    commands: &[DeviceCommand],
    end: usize,
    pick: impl Fn(&DeviceCommand) -> Option<T>,
) -> Option<T> {
    commands[..end].iter().rev().find_map(pick)
}

/// Programs selected by `UseProgram`, in order of first use.
fn used_programs(commands: &[DeviceCommand]) -> Vec<ProgramId> {
    let mut programs = Vec::new();
    for command in commands {
        if let DeviceCommand::UseProgram(program) = command {
            if !programs.contains(program) {
                programs.push(*program);
            }
        }
    }
    programs
}

fn with_scene(config: RendererConfig) -> DeferredRenderer<DummyDevice> {
    let files = shipped_shaders();
    let mut renderer = renderer(&files, config);
    let knot = torus_knot(64, 8, 0.15).upload(renderer.device_mut()).unwrap();
    renderer
        .add_mesh(&knot, PrimitiveTopology::TriangleStrip, None, Mat4::IDENTITY)
        .unwrap();
    renderer.device_mut().take_commands();
    renderer
}

// ============================================================================
// Setup
// ============================================================================

#[test]
fn test_setup_builds_frame_catalog() {
    let files = shipped_shaders();
    let renderer = renderer(&files, small_config().with_vsync(false));

    let frame = renderer.frame_samplers();
    assert_eq!(frame.len(), 14);
    assert_eq!(
        frame.get("Specular"),
        Some(TextureBinding::new(TextureTarget::Cube, renderer.ibl().specular))
    );
    assert_eq!(
        frame.get("Final"),
        Some(TextureBinding::new(TextureTarget::Texture2D, renderer.gbuffer().final_color))
    );
    assert!(!renderer.device().vsync());

    let specular = renderer.device().texture(renderer.ibl().specular).unwrap();
    assert_eq!(specular.mip_levels, 3);
    assert_eq!(specular.target, TextureTarget::Cube);
}

#[test]
fn test_empty_target_rejected() {
    let files = shipped_shaders();
    let result = DeferredRenderer::new(DummyDevice::new(), files, small_config().with_size(0, 100));
    assert!(matches!(result, Err(GraphicsError::InvalidParameter(_))));
}

#[test]
fn test_missing_program_fails_setup() {
    common::init_logging();
    let files = shipped_shaders();
    files.remove(format!("{}/compose.glsl", common::SHADER_ROOT));
    let result = DeferredRenderer::new(DummyDevice::new(), files, small_config());
    assert!(matches!(result, Err(GraphicsError::SourceNotFound { .. })));
}

// ============================================================================
// Frame
// ============================================================================

#[test]
fn test_pass_order() {
    let mut renderer = with_scene(small_config());
    renderer.render_frame();

    let gbuffer = renderer.gbuffer().clone();
    let commands = renderer.device_mut().take_commands();
    let binds: Vec<FramebufferId> = framebuffer_binds(&commands).into_iter().map(|(_, fb)| fb).collect();
    assert_eq!(
        binds,
        [
            gbuffer.geometry_framebuffer,
            gbuffer.lighting_framebuffer,
            gbuffer.compose_framebuffer,
            gbuffer.skybox_framebuffer,
            FramebufferId::NONE,
        ]
    );
    assert_eq!(commands.last(), Some(&DeviceCommand::Present));

    // knot, environment, compose, skybox cube, final
    let draws: Vec<&DeviceCommand> = commands.iter().filter(|c| c.is_draw()).collect();
    assert_eq!(draws.len(), 5);
    assert!(matches!(
        draws[3],
        DeviceCommand::DrawArrays { count: 36, .. }
    ));
}

#[test]
fn test_pass_state() {
    let mut renderer = with_scene(small_config());
    renderer.render_frame();
    let commands = renderer.device_mut().take_commands();
    let binds = framebuffer_binds(&commands);

    let depth = |end| last_before(&commands, end, |c| match c {
        DeviceCommand::SetDepthTest(test) => Some(*test),
        _ => None,
    });
    let blend = |end| last_before(&commands, end, |c| match c {
        DeviceCommand::SetBlend(blend) => Some(*blend),
        _ => None,
    });
    let front_face = |end| last_before(&commands, end, |c| match c {
        DeviceCommand::SetFrontFace(face) => Some(*face),
        _ => None,
    });
    let cull = |end| last_before(&commands, end, |c| match c {
        DeviceCommand::SetCullMode(cull) => Some(*cull),
        _ => None,
    });

    let [geometry, lighting, compose, skybox, present] = [0, 1, 2, 3, 4].map(|i| binds[i].0);

    assert_eq!(depth(geometry), Some(Some(CompareFunction::LessEqual)));
    assert_eq!(blend(geometry), Some(Some(BlendState::ALPHA)));
    assert_eq!(cull(geometry), Some(Some(CullFace::Back)));
    assert_eq!(front_face(geometry), Some(FrontFace::Ccw));

    assert_eq!(depth(lighting), Some(None));
    assert_eq!(blend(lighting), Some(Some(BlendState::ADDITIVE)));

    assert_eq!(depth(compose), Some(None));
    assert_eq!(blend(compose), Some(None));

    assert_eq!(depth(skybox), Some(Some(CompareFunction::LessEqual)));
    assert_eq!(front_face(skybox), Some(FrontFace::Cw));

    assert_eq!(depth(present), Some(None));
    assert_eq!(cull(present), Some(None));
}

#[test]
fn test_geometry_pass_clears_and_binds_blocks() {
    let mut renderer = with_scene(small_config());
    renderer.render_frame();
    let commands = renderer.device_mut().take_commands();
    let binds = framebuffer_binds(&commands);
    let geometry = &commands[binds[0].0..binds[1].0];

    assert!(matches!(
        geometry[1],
        DeviceCommand::Clear { flags: ClearFlags::ALL, .. }
    ));
    let slots: Vec<u32> = geometry
        .iter()
        .filter_map(|c| match c {
            DeviceCommand::BindUniformBuffer { slot, .. } => Some(*slot),
            _ => None,
        })
        .collect();
    assert_eq!(slots, [0, 1]);
    assert!(geometry.iter().any(|c| matches!(
        c,
        DeviceCommand::DrawArrays { topology: PrimitiveTopology::TriangleStrip, .. }
            | DeviceCommand::DrawElements { topology: PrimitiveTopology::TriangleStrip, .. }
    )));
}

#[test]
fn test_frame_uniforms_written() {
    let mut renderer = with_scene(small_config());
    renderer.render_frame();
    renderer.render_frame();
    assert!((renderer.time() - 0.02).abs() < 1e-6);
}

// ============================================================================
// Debug View
// ============================================================================

#[test]
fn test_debug_grid() {
    let config = small_config().with_size(300, 150).with_debug_view(true);
    let mut renderer = with_scene(config);
    renderer.render_frame();

    let gbuffer = renderer.gbuffer().clone();
    let commands = renderer.device_mut().take_commands();
    let present = framebuffer_binds(&commands)[4].0;
    let tail = &commands[present..];

    let viewports: Vec<Rect> = tail
        .iter()
        .filter_map(|c| match c {
            DeviceCommand::SetViewport(rect) => Some(*rect),
            _ => None,
        })
        .collect();
    let window = Rect::from_size(300, 150);
    let expected: Vec<Rect> = (0..9).map(|i| debug_tile_rect(window, i)).collect();
    assert_eq!(viewports, expected);

    let scissors: Vec<Option<Rect>> = tail
        .iter()
        .filter_map(|c| match c {
            DeviceCommand::SetScissor(rect) => Some(*rect),
            _ => None,
        })
        .collect();
    let mut expected_scissors: Vec<Option<Rect>> = expected.iter().copied().map(Some).collect();
    expected_scissors.push(None);
    assert_eq!(scissors, expected_scissors);

    let shown: Vec<_> = tail
        .iter()
        .filter_map(|c| match c {
            DeviceCommand::BindTexture { unit: 0, texture, .. } => Some(*texture),
            _ => None,
        })
        .collect();
    let channels: Vec<_> = DebugChannel::ALL.iter().map(|c| c.texture(&gbuffer)).collect();
    assert_eq!(shown, channels);
    assert_eq!(tail.iter().filter(|c| c.is_draw()).count(), 9);
}

#[rstest]
#[case::final_image(false)]
#[case::debug_grid(true)]
fn test_textures_bound_before_program(#[case] debug: bool) {
    let mut renderer = with_scene(small_config().with_debug_view(debug));
    renderer.render_frame();
    let commands = renderer.device_mut().take_commands();

    let mut program_selected = false;
    for command in &commands {
        match command {
            DeviceCommand::UseProgram(_) => program_selected = true,
            DeviceCommand::BindTexture { .. } => {
                assert!(!program_selected, "texture bound after the program of its draw")
            }
            command if command.is_draw() => program_selected = false,
            _ => {}
        }
    }
    assert!(commands.iter().any(|c| matches!(c, DeviceCommand::BindTexture { .. })));
}

#[rstest]
#[case::off(false, 1)]
#[case::on(true, 9)]
fn test_debug_toggle(#[case] debug: bool, #[case] tiles: usize) {
    let mut renderer = with_scene(small_config());
    renderer.set_debug_view(debug);
    renderer.render_frame();

    let commands = renderer.device_mut().take_commands();
    let present = framebuffer_binds(&commands)[4].0;
    assert_eq!(commands[present..].iter().filter(|c| c.is_draw()).count(), tiles);
    assert!(matches!(
        commands[present + 1],
        DeviceCommand::Clear { flags, .. } if flags.contains(ClearFlags::COLOR | ClearFlags::DEPTH)
    ));
}

#[test]
fn test_resize_moves_present_viewport() {
    let mut renderer = with_scene(small_config());
    renderer.resize(800, 600);
    renderer.render_frame();

    let commands = renderer.device_mut().take_commands();
    let present = framebuffer_binds(&commands)[4].0;
    let viewport = last_before(&commands, present, |c| match c {
        DeviceCommand::SetViewport(rect) => Some(*rect),
        _ => None,
    });
    assert_eq!(viewport, Some(Rect::from_size(800, 600)));
    assert_eq!(renderer.gbuffer().rect(), Rect::from_size(300, 150));
}

// ============================================================================
// Scene And Reload
// ============================================================================

#[test]
fn test_material_samplers_on_draw() {
    let files = shipped_shaders();
    let mut renderer = renderer(&files, small_config());
    let mesh = cube().upload(renderer.device_mut()).unwrap();
    let albedo = renderer.gbuffer().final_color;
    let material = SamplerSet::new().with("Albedo", TextureTarget::Texture2D, albedo);

    let handle = renderer
        .add_mesh(&mesh, PrimitiveTopology::Triangles, Some(material), Mat4::IDENTITY)
        .unwrap();

    let item = renderer.draw_list().get(handle).unwrap();
    assert_eq!(item.samplers.len(), 6);
    assert_eq!(
        item.samplers.get(0),
        Some(TextureBinding::new(TextureTarget::Texture2D, albedo))
    );
    assert_eq!(item.samplers.get(1), Some(TextureBinding::NEUTRAL));
    assert_eq!(item.cmd.count, 36);
}

#[test]
fn test_reload_rebuilds_draws() {
    let files = shipped_shaders();
    let mut renderer = renderer(&files, small_config());
    let mesh = cube().upload(renderer.device_mut()).unwrap();
    let handle = renderer
        .add_mesh(&mesh, PrimitiveTopology::Triangles, None, Mat4::IDENTITY)
        .unwrap();
    let before = renderer.draw_list().get(handle).unwrap().clone();

    renderer.reload_shaders().unwrap();

    let after = renderer.draw_list().get(handle).unwrap();
    assert_ne!(after.cmd.program, before.cmd.program);
    assert_ne!(after.cmd.vertex_array, before.cmd.vertex_array);
    assert_eq!(after.samplers.len(), before.samplers.len());
    assert!(!renderer.device().is_program_alive(before.cmd.program));
    assert!(renderer.device().vertex_array(before.cmd.vertex_array).is_none());
}

#[test]
fn test_failed_reload_keeps_running() {
    let files = shipped_shaders();
    let mut renderer = renderer(&files, small_config());
    let program_path = format!("{}/compose.glsl", common::SHADER_ROOT);
    let source = files.remove(&program_path).unwrap();
    files.insert(&program_path, source.replace("void main() {", "void main() {\n#error broken"));

    let result = renderer.reload_shaders();
    assert!(matches!(result, Err(GraphicsError::ShaderCompilationFailed { .. })));

    renderer.device_mut().take_commands();
    renderer.render_frame();
    let draws = renderer.device().commands().iter().filter(|c| c.is_draw()).count();
    assert_eq!(draws, 4);
}

/// Rename every vertex input of `program` so none of them resolves to a
/// mesh stream. The program still compiles and links.
fn break_vertex_inputs(files: &MemoryFileSource, program: &str, inputs: &[&str]) {
    let path = format!("{}/{program}", common::SHADER_ROOT);
    let mut source = files.remove(&path).unwrap();
    for input in inputs {
        source = source.replace(input, &input.replacen("in", "vertex", 1));
    }
    files.insert(&path, source);
}

#[rstest]
#[case::present_vertex_array("present.glsl", &["inPosition", "inUV"])]
#[case::draw_vertex_array(
    "geometry.glsl",
    &["inPosition", "inNormal", "inTangent", "inBitangent", "inUV"]
)]
fn test_partial_reload_keeps_previous_programs(#[case] program: &str, #[case] inputs: &[&str]) {
    let files = shipped_shaders();
    let mut renderer = renderer(&files, small_config());
    let knot = torus_knot(64, 8, 0.15).upload(renderer.device_mut()).unwrap();
    let handle = renderer
        .add_mesh(&knot, PrimitiveTopology::TriangleStrip, None, Mat4::IDENTITY)
        .unwrap();
    let before = renderer.draw_list().get(handle).unwrap().clone();
    renderer.render_frame();
    let programs_before = used_programs(&renderer.device_mut().take_commands());

    break_vertex_inputs(&files, program, inputs);
    let result = renderer.reload_shaders();
    assert_eq!(result, Err(GraphicsError::EmptyVertexArray));

    let after = renderer.draw_list().get(handle).unwrap();
    assert_eq!(after.cmd.program, before.cmd.program);
    assert_eq!(after.cmd.vertex_array, before.cmd.vertex_array);
    assert!(renderer.device().vertex_array(after.cmd.vertex_array).is_some());

    renderer.device_mut().take_commands();
    renderer.render_frame();
    let programs_after = used_programs(renderer.device().commands());
    assert_eq!(programs_after, programs_before);
    for program in programs_after {
        assert!(renderer.device().is_program_alive(program), "{program:?} was deleted");
    }
}

#[test]
fn test_failed_reload_releases_new_programs() {
    let files = shipped_shaders();
    let mut renderer = renderer(&files, small_config());
    let live_before = renderer.device().live_program_count();

    break_vertex_inputs(&files, "present.glsl", &["inPosition", "inUV"]);
    assert!(renderer.reload_shaders().is_err());

    assert_eq!(renderer.device().live_program_count(), live_before);
}

#[test]
fn test_destroy_releases_programs() {
    let mut renderer = with_scene(small_config());
    renderer.render_frame();
    let program = renderer.draw_list().iter().next().unwrap().cmd.program;

    let device = renderer.destroy();
    assert!(!device.is_program_alive(program));
}
