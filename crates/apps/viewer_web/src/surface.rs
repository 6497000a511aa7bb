use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use gpu::{RenderCommand, RenderFrame, Subscription, SurfacePlatform, SurfaceSignal, UploadPlan};
use scene::SceneGraph;
use scene::components::{AlphaMode, Appearance, MagFilter, Material, MinFilter, Side, Texture, Wrap};
use scene::graph::{MaterialId, MeshId, TextureId};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    Event, HtmlCanvasElement, WebGl2RenderingContext as Gl, WebGlBuffer, WebGlProgram,
    WebGlShader, WebGlTexture, WebGlUniformLocation,
};

use crate::{defer, dispatch_now, log};

const VERTEX_SHADER: &str = r#"#version 300 es
in vec3 a_pos;
in vec3 a_normal;
in vec2 a_uv;
uniform mat4 u_view_proj;
uniform mat4 u_world;
out vec3 v_world;
out vec3 v_normal;
out vec2 v_uv;
void main() {
    vec4 world = u_world * vec4(a_pos, 1.0);
    v_world = world.xyz;
    v_normal = mat3(u_world) * a_normal;
    v_uv = a_uv;
    gl_Position = u_view_proj * world;
}
"#;

const FRAGMENT_SHADER: &str = r#"#version 300 es
precision mediump float;
in vec3 v_world;
in vec3 v_normal;
in vec2 v_uv;
uniform vec4 u_base_color;
uniform vec3 u_emissive;
uniform float u_roughness;
uniform float u_metalness;
uniform float u_alpha_cutoff;
uniform vec3 u_eye;
uniform sampler2D u_texture;
out vec4 color;
const vec3 LIGHT = vec3(0.3714, 0.7428, 0.5571);
void main() {
    vec4 base = u_base_color * texture(u_texture, v_uv);
    if (base.a < u_alpha_cutoff) {
        discard;
    }
    vec3 n = normalize(gl_FrontFacing ? v_normal : -v_normal);
    vec3 h = normalize(LIGHT + normalize(u_eye - v_world));
    float diffuse = max(dot(n, LIGHT), 0.0);
    float shininess = mix(64.0, 4.0, u_roughness);
    float specular = pow(max(dot(n, h), 0.0), shininess) * (1.0 - u_roughness) * 0.5;
    vec3 albedo = base.rgb * (1.0 - 0.5 * u_metalness);
    vec3 lit = albedo * (0.35 + 0.65 * diffuse) + vec3(specular) + u_emissive;
    color = vec4(lit, base.a);
}
"#;

const STRIDE: i32 = 8 * 4;

struct Program {
    program: WebGlProgram,
    a_pos: u32,
    a_normal: Option<u32>,
    a_uv: Option<u32>,
    u_view_proj: Option<WebGlUniformLocation>,
    u_world: Option<WebGlUniformLocation>,
    u_base_color: Option<WebGlUniformLocation>,
    u_emissive: Option<WebGlUniformLocation>,
    u_roughness: Option<WebGlUniformLocation>,
    u_metalness: Option<WebGlUniformLocation>,
    u_alpha_cutoff: Option<WebGlUniformLocation>,
    u_eye: Option<WebGlUniformLocation>,
    u_texture: Option<WebGlUniformLocation>,
}

struct GpuPrimitive {
    vertices: WebGlBuffer,
    indices: WebGlBuffer,
    index_count: i32,
}

type Listener = Closure<dyn FnMut(Event)>;

/// WebGL2 canvas behind `RenderSurfaceManager`.
///
/// Geometry is uploaded once per scene. Materials and textures are
/// re-uploaded whenever their version moves, so normalization shows up on
/// the next frame.
pub struct WebGlSurface {
    epoch: u64,
    canvas: HtmlCanvasElement,
    gl: Gl,
    program: Option<Program>,
    meshes: HashMap<MeshId, Vec<GpuPrimitive>>,
    materials: HashMap<MaterialId, Appearance>,
    textures: HashMap<TextureId, WebGlTexture>,
    // Bound for untextured materials.
    white: Option<WebGlTexture>,
    listeners: HashMap<Subscription, (&'static str, Listener)>,
    next_subscription: u64,
    // Context event currently being dispatched, for `prevent_default_teardown`.
    current_event: Rc<RefCell<Option<Event>>>,
}

impl WebGlSurface {
    pub fn new(canvas_id: &str, epoch: u64) -> Result<Self, JsValue> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| JsValue::from_str("no document"))?;
        let canvas: HtmlCanvasElement = document
            .get_element_by_id(canvas_id)
            .ok_or_else(|| JsValue::from_str(&format!("canvas #{canvas_id} not found")))?
            .dyn_into()?;
        let gl: Gl = canvas
            .get_context("webgl2")?
            .ok_or_else(|| JsValue::from_str("webgl2 unavailable"))?
            .dyn_into()?;
        Ok(Self {
            epoch,
            canvas,
            gl,
            program: None,
            meshes: HashMap::new(),
            materials: HashMap::new(),
            textures: HashMap::new(),
            white: None,
            listeners: HashMap::new(),
            next_subscription: 1,
            current_event: Rc::new(RefCell::new(None)),
        })
    }

    fn rebuild_program(&mut self) {
        if let Some(old) = self.program.take() {
            self.gl.delete_program(Some(&old.program));
        }
        match link_program(&self.gl) {
            Ok(program) => self.program = Some(program),
            Err(e) => log(&format!("shader setup failed: {e}")),
        }
        if self.white.is_none() {
            self.white = self.gl.create_texture();
            if let Some(white) = &self.white {
                self.gl.bind_texture(Gl::TEXTURE_2D, Some(white));
                let _ = self
                    .gl
                    .tex_image_2d_with_i32_and_i32_and_i32_and_format_and_type_and_opt_u8_array(
                        Gl::TEXTURE_2D,
                        0,
                        Gl::RGBA as i32,
                        1,
                        1,
                        0,
                        Gl::RGBA,
                        Gl::UNSIGNED_BYTE,
                        Some(&[255, 255, 255, 255]),
                    );
                self.gl
                    .tex_parameteri(Gl::TEXTURE_2D, Gl::TEXTURE_MIN_FILTER, Gl::NEAREST as i32);
            }
        }
    }

    fn upload_geometry(&mut self, scene: &SceneGraph) {
        for (i, mesh) in scene.meshes().iter().enumerate() {
            let mut uploaded = Vec::with_capacity(mesh.primitives.len());
            for primitive in &mesh.primitives {
                let geometry = &primitive.geometry;
                let (Some(vertices), Some(indices)) =
                    (self.gl.create_buffer(), self.gl.create_buffer())
                else {
                    log("create_buffer failed");
                    return;
                };
                let data = js_sys::Float32Array::from(geometry.interleaved().as_slice());
                self.gl.bind_buffer(Gl::ARRAY_BUFFER, Some(&vertices));
                self.gl
                    .buffer_data_with_array_buffer_view(Gl::ARRAY_BUFFER, &data, Gl::STATIC_DRAW);
                let data = js_sys::Uint32Array::from(geometry.indices.as_slice());
                self.gl.bind_buffer(Gl::ELEMENT_ARRAY_BUFFER, Some(&indices));
                self.gl.buffer_data_with_array_buffer_view(
                    Gl::ELEMENT_ARRAY_BUFFER,
                    &data,
                    Gl::STATIC_DRAW,
                );
                uploaded.push(GpuPrimitive {
                    vertices,
                    indices,
                    index_count: geometry.indices.len() as i32,
                });
            }
            self.meshes.insert(MeshId(i as u32), uploaded);
        }
    }

    fn upload_texture(&mut self, id: TextureId, texture: &Texture) {
        if let Some(old) = self.textures.remove(&id) {
            self.gl.delete_texture(Some(&old));
        }
        let Some(handle) = self.gl.create_texture() else {
            log("create_texture failed");
            return;
        };
        let gl = &self.gl;
        gl.bind_texture(Gl::TEXTURE_2D, Some(&handle));
        let (width, height, texels): (i32, i32, &[u8]) = match &texture.image {
            Some(image) => (image.width as i32, image.height as i32, &image.rgba),
            None => (1, 1, &[255, 255, 255, 255]),
        };
        if let Err(e) = gl.tex_image_2d_with_i32_and_i32_and_i32_and_format_and_type_and_opt_u8_array(
            Gl::TEXTURE_2D,
            0,
            Gl::RGBA as i32,
            width,
            height,
            0,
            Gl::RGBA,
            Gl::UNSIGNED_BYTE,
            Some(texels),
        ) {
            log(&format!("texture upload failed: {e:?}"));
        }

        let sampler = texture.sampler;
        let mipmapped = texture.generate_mipmaps && uses_mipmaps(sampler.min_filter);
        if mipmapped {
            gl.generate_mipmap(Gl::TEXTURE_2D);
        }
        let min_filter = if mipmapped {
            gl_min_filter(sampler.min_filter)
        } else {
            gl_base_filter(sampler.min_filter)
        };
        gl.tex_parameteri(Gl::TEXTURE_2D, Gl::TEXTURE_MIN_FILTER, min_filter as i32);
        gl.tex_parameteri(Gl::TEXTURE_2D, Gl::TEXTURE_MAG_FILTER, gl_mag_filter(sampler.mag_filter) as i32);
        gl.tex_parameteri(Gl::TEXTURE_2D, Gl::TEXTURE_WRAP_S, gl_wrap(sampler.wrap_s) as i32);
        gl.tex_parameteri(Gl::TEXTURE_2D, Gl::TEXTURE_WRAP_T, gl_wrap(sampler.wrap_t) as i32);
        self.textures.insert(id, handle);
    }

    fn release_resources(&mut self) {
        for (_, primitives) in self.meshes.drain() {
            for p in primitives {
                self.gl.delete_buffer(Some(&p.vertices));
                self.gl.delete_buffer(Some(&p.indices));
            }
        }
        for (_, texture) in self.textures.drain() {
            self.gl.delete_texture(Some(&texture));
        }
        self.materials.clear();
    }

    fn draw_primitive(&self, program: &Program, appearance: &Appearance, primitive: &GpuPrimitive) {
        let gl = &self.gl;
        let [r, g, b, a] = appearance.base_color;
        gl.uniform4f(program.u_base_color.as_ref(), r, g, b, a * appearance.opacity);
        let [er, eg, eb] = appearance.emissive.map(|c| c * appearance.emissive_intensity);
        gl.uniform3f(program.u_emissive.as_ref(), er, eg, eb);
        gl.uniform1f(program.u_roughness.as_ref(), appearance.roughness.clamp(0.0, 1.0));
        gl.uniform1f(program.u_metalness.as_ref(), appearance.metalness.clamp(0.0, 1.0));
        let cutoff = if appearance.alpha_mode == AlphaMode::Mask { 0.5 } else { 0.0 };
        gl.uniform1f(program.u_alpha_cutoff.as_ref(), cutoff);

        match appearance.side {
            Side::Front => gl.enable(Gl::CULL_FACE),
            Side::Double => gl.disable(Gl::CULL_FACE),
        }
        let texture = appearance
            .base_color_texture
            .and_then(|id| self.textures.get(&id))
            .or(self.white.as_ref());
        gl.active_texture(Gl::TEXTURE0);
        gl.bind_texture(Gl::TEXTURE_2D, texture);

        gl.bind_buffer(Gl::ARRAY_BUFFER, Some(&primitive.vertices));
        gl.enable_vertex_attrib_array(program.a_pos);
        gl.vertex_attrib_pointer_with_i32(program.a_pos, 3, Gl::FLOAT, false, STRIDE, 0);
        if let Some(a_normal) = program.a_normal {
            gl.enable_vertex_attrib_array(a_normal);
            gl.vertex_attrib_pointer_with_i32(a_normal, 3, Gl::FLOAT, false, STRIDE, 12);
        }
        if let Some(a_uv) = program.a_uv {
            gl.enable_vertex_attrib_array(a_uv);
            gl.vertex_attrib_pointer_with_i32(a_uv, 2, Gl::FLOAT, false, STRIDE, 24);
        }
        gl.bind_buffer(Gl::ELEMENT_ARRAY_BUFFER, Some(&primitive.indices));
        gl.draw_elements_with_i32(Gl::TRIANGLES, primitive.index_count, Gl::UNSIGNED_INT, 0);
    }
}

impl SurfacePlatform for WebGlSurface {
    fn subscribe(&mut self, signal: SurfaceSignal) -> Subscription {
        let sub = Subscription(self.next_subscription);
        self.next_subscription += 1;

        let event_name = match signal {
            SurfaceSignal::ContextLost => "webglcontextlost",
            SurfaceSignal::ContextRestored => "webglcontextrestored",
        };
        let epoch = self.epoch;
        let current = self.current_event.clone();
        let listener = Closure::<dyn FnMut(Event)>::new(move |ev: Event| {
            let apply = move |host: &mut crate::Host, now| match signal {
                SurfaceSignal::ContextLost => host.session.on_context_lost(now),
                SurfaceSignal::ContextRestored => host.session.on_context_restored(now),
            };
            *current.borrow_mut() = Some(ev.clone());
            let handled = dispatch_now(epoch, apply);
            current.borrow_mut().take();
            if !handled {
                if signal == SurfaceSignal::ContextLost {
                    ev.prevent_default();
                }
                defer(epoch, apply);
            }
        });
        if let Err(e) = self
            .canvas
            .add_event_listener_with_callback(event_name, listener.as_ref().unchecked_ref())
        {
            log(&format!("failed to listen for {event_name}: {e:?}"));
        }
        self.listeners.insert(sub, (event_name, listener));
        sub
    }

    fn unsubscribe(&mut self, subscription: Subscription) {
        if let Some((event_name, listener)) = self.listeners.remove(&subscription) {
            let _ = self
                .canvas
                .remove_event_listener_with_callback(event_name, listener.as_ref().unchecked_ref());
        }
    }

    fn prevent_default_teardown(&mut self) {
        if let Some(ev) = self.current_event.borrow().as_ref() {
            ev.prevent_default();
        }
    }

    fn pixel_size(&self) -> (u32, u32) {
        (self.canvas.width(), self.canvas.height())
    }

    fn set_pixel_size(&mut self, width: u32, height: u32) {
        self.canvas.set_width(width);
        self.canvas.set_height(height);
    }

    fn upload(&mut self, scene: &SceneGraph, plan: &UploadPlan) {
        if self.gl.is_context_lost() {
            return;
        }
        if plan.geometry {
            self.release_resources();
            self.rebuild_program();
            self.upload_geometry(scene);
        }
        for &id in &plan.textures {
            if let Some(texture) = scene.texture(id) {
                self.upload_texture(id, texture);
            }
        }
        for &id in &plan.materials {
            if let Some(material) = scene.material(id) {
                self.materials.insert(id, material.appearance.clone());
            }
        }
    }

    fn release_all(&mut self) {
        self.release_resources();
    }

    fn submit(&mut self, frame: &RenderFrame) {
        let gl = &self.gl;
        if gl.is_context_lost() {
            return;
        }
        let (w, h) = (self.canvas.width() as i32, self.canvas.height() as i32);
        gl.viewport(0, 0, w, h);
        gl.clear_color(0.96, 0.96, 0.95, 1.0);
        gl.enable(Gl::DEPTH_TEST);
        gl.depth_mask(true);
        gl.clear(Gl::COLOR_BUFFER_BIT | Gl::DEPTH_BUFFER_BIT);

        let Some(program) = &self.program else {
            return;
        };
        gl.use_program(Some(&program.program));
        let aspect = if h > 0 { w as f64 / h as f64 } else { 1.0 };
        let view_proj = flatten(frame.camera.view_proj(aspect));
        gl.uniform_matrix4fv_with_f32_array(program.u_view_proj.as_ref(), false, &view_proj);
        let eye = frame.camera.position;
        gl.uniform3f(program.u_eye.as_ref(), eye.x as f32, eye.y as f32, eye.z as f32);
        gl.uniform1i(program.u_texture.as_ref(), 0);

        let fallback = Material::new(None).appearance;
        // Opaque and masked first, then blended without depth writes.
        for blended in [false, true] {
            if blended {
                gl.enable(Gl::BLEND);
                gl.blend_func(Gl::SRC_ALPHA, Gl::ONE_MINUS_SRC_ALPHA);
                gl.depth_mask(false);
            }
            for command in &frame.commands {
                let RenderCommand::DrawMesh {
                    mesh,
                    world,
                    materials,
                    ..
                } = command;
                let Some(primitives) = self.meshes.get(mesh) else {
                    continue;
                };
                gl.uniform_matrix4fv_with_f32_array(program.u_world.as_ref(), false, &flatten(*world));
                for (i, primitive) in primitives.iter().enumerate() {
                    let appearance = materials
                        .get(i)
                        .copied()
                        .flatten()
                        .and_then(|id| self.materials.get(&id))
                        .unwrap_or(&fallback);
                    if (appearance.alpha_mode == AlphaMode::Blend) == blended {
                        self.draw_primitive(program, appearance, primitive);
                    }
                }
            }
        }
        gl.disable(Gl::BLEND);
        gl.depth_mask(true);
    }
}

impl Drop for WebGlSurface {
    fn drop(&mut self) {
        let subs: Vec<Subscription> = self.listeners.keys().copied().collect();
        for sub in subs {
            self.unsubscribe(sub);
        }
        self.release_resources();
        if let Some(white) = self.white.take() {
            self.gl.delete_texture(Some(&white));
        }
        if let Some(program) = self.program.take() {
            self.gl.delete_program(Some(&program.program));
        }
    }
}

fn flatten(m: [[f32; 4]; 4]) -> [f32; 16] {
    let mut out = [0.0; 16];
    for (i, v) in m.iter().flatten().enumerate() {
        out[i] = *v;
    }
    out
}

fn uses_mipmaps(filter: MinFilter) -> bool {
    !matches!(filter, MinFilter::Nearest | MinFilter::Linear)
}

fn gl_min_filter(filter: MinFilter) -> u32 {
    match filter {
        MinFilter::Nearest => Gl::NEAREST,
        MinFilter::Linear => Gl::LINEAR,
        MinFilter::NearestMipmapNearest => Gl::NEAREST_MIPMAP_NEAREST,
        MinFilter::LinearMipmapNearest => Gl::LINEAR_MIPMAP_NEAREST,
        MinFilter::NearestMipmapLinear => Gl::NEAREST_MIPMAP_LINEAR,
        MinFilter::LinearMipmapLinear => Gl::LINEAR_MIPMAP_LINEAR,
    }
}

// Without a mip chain the texture is incomplete under a mipmap filter.
fn gl_base_filter(filter: MinFilter) -> u32 {
    match filter {
        MinFilter::Nearest | MinFilter::NearestMipmapNearest | MinFilter::NearestMipmapLinear => {
            Gl::NEAREST
        }
        MinFilter::Linear | MinFilter::LinearMipmapNearest | MinFilter::LinearMipmapLinear => {
            Gl::LINEAR
        }
    }
}

fn gl_mag_filter(filter: MagFilter) -> u32 {
    match filter {
        MagFilter::Nearest => Gl::NEAREST,
        MagFilter::Linear => Gl::LINEAR,
    }
}

fn gl_wrap(wrap: Wrap) -> u32 {
    match wrap {
        Wrap::ClampToEdge => Gl::CLAMP_TO_EDGE,
        Wrap::MirroredRepeat => Gl::MIRRORED_REPEAT,
        Wrap::Repeat => Gl::REPEAT,
    }
}

fn compile(gl: &Gl, kind: u32, source: &str) -> Result<WebGlShader, String> {
    let shader = gl.create_shader(kind).ok_or("create_shader failed")?;
    gl.shader_source(&shader, source);
    gl.compile_shader(&shader);
    if gl
        .get_shader_parameter(&shader, Gl::COMPILE_STATUS)
        .as_bool()
        .unwrap_or(false)
    {
        Ok(shader)
    } else {
        let info = gl.get_shader_info_log(&shader).unwrap_or_default();
        gl.delete_shader(Some(&shader));
        Err(info)
    }
}

fn link_program(gl: &Gl) -> Result<Program, String> {
    let vs = compile(gl, Gl::VERTEX_SHADER, VERTEX_SHADER)?;
    let fs = compile(gl, Gl::FRAGMENT_SHADER, FRAGMENT_SHADER)?;
    let program = gl.create_program().ok_or("create_program failed")?;
    gl.attach_shader(&program, &vs);
    gl.attach_shader(&program, &fs);
    gl.link_program(&program);
    gl.delete_shader(Some(&vs));
    gl.delete_shader(Some(&fs));
    if !gl
        .get_program_parameter(&program, Gl::LINK_STATUS)
        .as_bool()
        .unwrap_or(false)
    {
        let info = gl.get_program_info_log(&program).unwrap_or_default();
        gl.delete_program(Some(&program));
        return Err(info);
    }
    let attrib = |name: &str| u32::try_from(gl.get_attrib_location(&program, name)).ok();
    let a_pos = attrib("a_pos").ok_or("a_pos attribute missing")?;
    let uniform = |name: &str| gl.get_uniform_location(&program, name);
    Ok(Program {
        a_pos,
        a_normal: attrib("a_normal"),
        a_uv: attrib("a_uv"),
        u_view_proj: uniform("u_view_proj"),
        u_world: uniform("u_world"),
        u_base_color: uniform("u_base_color"),
        u_emissive: uniform("u_emissive"),
        u_roughness: uniform("u_roughness"),
        u_metalness: uniform("u_metalness"),
        u_alpha_cutoff: uniform("u_alpha_cutoff"),
        u_eye: uniform("u_eye"),
        u_texture: uniform("u_texture"),
        program,
    })
}
