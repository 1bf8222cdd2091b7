//! OpenGL implementation of [`DrawBackend`].

use super::{DrawBackend, DrawElements, GlVersion, GlslVersion, Matrix4, RawCallback, ScissorRect};
use crate::error::InitError;
use crate::gui::validate_font_atlas;

use gl::types::{GLchar, GLenum, GLint, GLsizei, GLsizeiptr, GLuint};
use imgui::{DrawData, DrawIdx, DrawVert, TextureId};
use std::ffi::c_void;
use std::mem::{size_of, size_of_val};

/// GPU objects needed to draw GUI frames: one shader program, the vertex
/// and index buffers, and the font atlas texture.
///
/// Creating, using and dropping a renderer requires the context it was
/// created with to be current.
pub struct GlRenderer {
    version: GlVersion,
    program: GLuint,
    loc_texture: GLint,
    loc_projection: GLint,
    attrib_pos: GLuint,
    attrib_uv: GLuint,
    attrib_color: GLuint,
    vao: Option<GLuint>,
    vbo: GLuint,
    ebo: GLuint,
    font_texture: GLuint,
}

impl GlRenderer {
    /// Compiles the shaders, creates the buffers and uploads the font atlas
    /// of `imgui`, storing the texture name back into the atlas.
    pub fn new(imgui: &mut imgui::Context) -> Result<Self, InitError> {
        let version = unsafe { GlVersion::read() };
        let glsl = GlslVersion::for_gl_version(version);
        log::info!(
            "Initializing renderer for OpenGL{} {}.{} ({})",
            if version.is_es { " ES" } else { "" },
            version.major,
            version.minor,
            glsl.as_str()
        );

        let program = unsafe { link_program(glsl)? };
        let (loc_texture, loc_projection) = unsafe {
            (
                gl::GetUniformLocation(program, c"Texture".as_ptr()),
                gl::GetUniformLocation(program, c"ProjMtx".as_ptr()),
            )
        };
        let [attrib_pos, attrib_uv, attrib_color] = match unsafe { attrib_locations(program) } {
            Ok(locations) => locations,
            Err(e) => {
                unsafe { gl::DeleteProgram(program) };
                return Err(e);
            }
        };

        let mut renderer = GlRenderer {
            version,
            program,
            loc_texture,
            loc_projection,
            attrib_pos,
            attrib_uv,
            attrib_color,
            vao: None,
            vbo: 0,
            ebo: 0,
            font_texture: 0,
        };

        unsafe {
            if version.vertex_array_support() && gl::GenVertexArrays::is_loaded() {
                let mut vao = 0;
                gl::GenVertexArrays(1, &mut vao);
                renderer.vao = Some(vao);
            }
            gl::GenBuffers(1, &mut renderer.vbo);
            gl::GenBuffers(1, &mut renderer.ebo);
        }
        if renderer.vbo == 0 || renderer.ebo == 0 {
            return Err(InitError::CreateObject("buffer object"));
        }

        renderer.upload_font_atlas(imgui)?;
        Ok(renderer)
    }

    fn upload_font_atlas(&mut self, imgui: &mut imgui::Context) -> Result<(), InitError> {
        let fonts = imgui.fonts();
        {
            let atlas = fonts.build_rgba32_texture();
            validate_font_atlas(atlas.width, atlas.height, atlas.data.len())?;

            unsafe {
                gl::GenTextures(1, &mut self.font_texture);
                if self.font_texture == 0 {
                    return Err(InitError::CreateObject("font texture"));
                }
                gl::BindTexture(gl::TEXTURE_2D, self.font_texture);
                gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_MIN_FILTER, gl::NEAREST as GLint);
                gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_MAG_FILTER, gl::NEAREST as GLint);
                gl::PixelStorei(gl::UNPACK_ALIGNMENT, 1);
                gl::TexImage2D(
                    gl::TEXTURE_2D,
                    0,
                    gl::RGBA as GLint,
                    atlas.width as GLsizei,
                    atlas.height as GLsizei,
                    0,
                    gl::RGBA,
                    gl::UNSIGNED_BYTE,
                    atlas.data.as_ptr().cast(),
                );
                gl::BindTexture(gl::TEXTURE_2D, 0);
            }
            log::debug!("Uploaded {}x{} font atlas", atlas.width, atlas.height);
        }
        fonts.tex_id = TextureId::new(self.font_texture as usize);
        Ok(())
    }

    /// Sets the viewport to the framebuffer and clears it to `color`.
    pub fn clear(&self, framebuffer_size: [i32; 2], color: [f32; 4]) {
        let [r, g, b, a] = color;
        unsafe {
            gl::Viewport(0, 0, framebuffer_size[0], framebuffer_size[1]);
            gl::ClearColor(r, g, b, a);
            gl::Clear(gl::COLOR_BUFFER_BIT);
        }
    }

    /// Draws a frame of GUI draw data.
    pub fn render(&mut self, draw_data: &DrawData) {
        super::render_draw_data(self, draw_data);
    }

    fn bind_vertex_layout(&self) {
        let stride = size_of::<DrawVert>() as GLsizei;
        let pos_offset = memoffset::offset_of!(DrawVert, pos);
        let uv_offset = memoffset::offset_of!(DrawVert, uv);
        let col_offset = memoffset::offset_of!(DrawVert, col);

        unsafe {
            gl::EnableVertexAttribArray(self.attrib_pos);
            gl::EnableVertexAttribArray(self.attrib_uv);
            gl::EnableVertexAttribArray(self.attrib_color);
            gl::VertexAttribPointer(
                self.attrib_pos,
                2,
                gl::FLOAT,
                gl::FALSE,
                stride,
                pos_offset as *const c_void,
            );
            gl::VertexAttribPointer(
                self.attrib_uv,
                2,
                gl::FLOAT,
                gl::FALSE,
                stride,
                uv_offset as *const c_void,
            );
            gl::VertexAttribPointer(
                self.attrib_color,
                4,
                gl::UNSIGNED_BYTE,
                gl::TRUE,
                stride,
                col_offset as *const c_void,
            );
        }
    }
}

impl DrawBackend for GlRenderer {
    fn set_up_render_state(&mut self, projection: &Matrix4, framebuffer_size: [i32; 2]) {
        unsafe {
            gl::Enable(gl::BLEND);
            gl::BlendEquation(gl::FUNC_ADD);
            gl::BlendFunc(gl::SRC_ALPHA, gl::ONE_MINUS_SRC_ALPHA);
            gl::Disable(gl::CULL_FACE);
            gl::Disable(gl::DEPTH_TEST);
            gl::Enable(gl::SCISSOR_TEST);
            gl::Viewport(0, 0, framebuffer_size[0], framebuffer_size[1]);

            gl::UseProgram(self.program);
            gl::Uniform1i(self.loc_texture, 0);
            gl::UniformMatrix4fv(self.loc_projection, 1, gl::FALSE, projection.as_ptr().cast());
            gl::ActiveTexture(gl::TEXTURE0);
            gl::BindTexture(gl::TEXTURE_2D, self.font_texture);

            if let Some(vao) = self.vao {
                gl::BindVertexArray(vao);
            }
            gl::BindBuffer(gl::ARRAY_BUFFER, self.vbo);
            gl::BindBuffer(gl::ELEMENT_ARRAY_BUFFER, self.ebo);
        }
        self.bind_vertex_layout();
    }

    fn upload(&mut self, vertices: &[DrawVert], indices: &[DrawIdx]) {
        // glBufferData rather than glBufferSubData, the latter corrupts on some Intel drivers.
        unsafe {
            gl::BindBuffer(gl::ARRAY_BUFFER, self.vbo);
            gl::BufferData(
                gl::ARRAY_BUFFER,
                size_of_val(vertices) as GLsizeiptr,
                vertices.as_ptr().cast(),
                gl::STREAM_DRAW,
            );
            gl::BindBuffer(gl::ELEMENT_ARRAY_BUFFER, self.ebo);
            gl::BufferData(
                gl::ELEMENT_ARRAY_BUFFER,
                size_of_val(indices) as GLsizeiptr,
                indices.as_ptr().cast(),
                gl::STREAM_DRAW,
            );
        }
    }

    fn set_scissor(&mut self, rect: ScissorRect) {
        unsafe { gl::Scissor(rect.x, rect.y, rect.width, rect.height) };
    }

    fn draw_elements(&mut self, elements: &DrawElements) {
        let index_type: GLenum = if size_of::<DrawIdx>() == 2 {
            gl::UNSIGNED_SHORT
        } else {
            gl::UNSIGNED_INT
        };
        let offset = (elements.idx_offset * size_of::<DrawIdx>()) as *const c_void;

        unsafe {
            gl::BindTexture(gl::TEXTURE_2D, elements.texture_id.id() as GLuint);
            if elements.vtx_offset > 0 && self.version.vertex_offset_support() {
                gl::DrawElementsBaseVertex(
                    gl::TRIANGLES,
                    elements.count as GLsizei,
                    index_type,
                    offset,
                    elements.vtx_offset as GLint,
                );
            } else {
                gl::DrawElements(gl::TRIANGLES, elements.count as GLsizei, index_type, offset);
            }
        }
    }

    fn run_callback(&mut self, callback: &RawCallback) {
        // Draw data outlives the whole render pass.
        unsafe { callback.invoke() };
    }

    fn tear_down(&mut self) {
        unsafe {
            gl::Disable(gl::SCISSOR_TEST);
            gl::DisableVertexAttribArray(self.attrib_color);
            gl::DisableVertexAttribArray(self.attrib_uv);
            gl::DisableVertexAttribArray(self.attrib_pos);
            if self.vao.is_some() {
                gl::BindVertexArray(0);
            }
            gl::BindBuffer(gl::ELEMENT_ARRAY_BUFFER, 0);
            gl::BindBuffer(gl::ARRAY_BUFFER, 0);
            gl::BindTexture(gl::TEXTURE_2D, 0);
            gl::UseProgram(0);
        }
    }
}

impl Drop for GlRenderer {
    fn drop(&mut self) {
        unsafe {
            if self.font_texture != 0 {
                gl::DeleteTextures(1, &self.font_texture);
            }
            gl::DeleteBuffers(1, &self.ebo);
            gl::DeleteBuffers(1, &self.vbo);
            if let Some(vao) = self.vao {
                gl::DeleteVertexArrays(1, &vao);
            }
            gl::DeleteProgram(self.program);
        }
        log::debug!("Released renderer GPU objects");
    }
}

unsafe fn attrib_locations(program: GLuint) -> Result<[GLuint; 3], InitError> {
    let mut locations = [0; 3];
    for (location, name) in locations.iter_mut().zip([c"Position", c"UV", c"Color"]) {
        let found = gl::GetAttribLocation(program, name.as_ptr());
        *location = GLuint::try_from(found)
            .map_err(|_| InitError::MissingAttribute(name.to_str().unwrap_or("vertex")))?;
    }
    Ok(locations)
}

unsafe fn link_program(glsl: GlslVersion) -> Result<GLuint, InitError> {
    let vertex = compile_shader(gl::VERTEX_SHADER, &vertex_shader_source(glsl))?;
    let fragment = match compile_shader(gl::FRAGMENT_SHADER, &fragment_shader_source(glsl)) {
        Ok(fragment) => fragment,
        Err(e) => {
            gl::DeleteShader(vertex);
            return Err(e);
        }
    };

    let program = gl::CreateProgram();
    if program == 0 {
        gl::DeleteShader(vertex);
        gl::DeleteShader(fragment);
        return Err(InitError::CreateObject("shader program"));
    }
    gl::AttachShader(program, vertex);
    gl::AttachShader(program, fragment);
    gl::LinkProgram(program);

    let mut status = GLint::from(gl::FALSE);
    gl::GetProgramiv(program, gl::LINK_STATUS, &mut status);

    gl::DetachShader(program, vertex);
    gl::DetachShader(program, fragment);
    gl::DeleteShader(vertex);
    gl::DeleteShader(fragment);

    if status != GLint::from(gl::TRUE) {
        let log = info_log(program, gl::GetProgramiv, gl::GetProgramInfoLog);
        gl::DeleteProgram(program);
        return Err(InitError::LinkProgram(log));
    }
    Ok(program)
}

unsafe fn compile_shader(kind: GLenum, source: &str) -> Result<GLuint, InitError> {
    let shader = gl::CreateShader(kind);
    if shader == 0 {
        return Err(InitError::CreateObject("shader"));
    }
    let len = source.len() as GLint;
    let src = source.as_ptr().cast::<GLchar>();
    gl::ShaderSource(shader, 1, &src, &len);
    gl::CompileShader(shader);

    let mut status = GLint::from(gl::FALSE);
    gl::GetShaderiv(shader, gl::COMPILE_STATUS, &mut status);
    if status != GLint::from(gl::TRUE) {
        let log = info_log(shader, gl::GetShaderiv, gl::GetShaderInfoLog);
        gl::DeleteShader(shader);
        let stage = if kind == gl::VERTEX_SHADER { "vertex" } else { "fragment" };
        return Err(InitError::CompileShader(format!("{stage} shader: {log}")));
    }
    Ok(shader)
}

unsafe fn info_log(
    object: GLuint,
    get_iv: unsafe fn(GLuint, GLenum, *mut GLint),
    get_log: unsafe fn(GLuint, GLsizei, *mut GLsizei, *mut GLchar),
) -> String {
    let mut len = 0;
    get_iv(object, gl::INFO_LOG_LENGTH, &mut len);
    let mut buf = vec![0u8; len.max(1) as usize];
    let mut written = 0;
    get_log(object, buf.len() as GLsizei, &mut written, buf.as_mut_ptr().cast());
    buf.truncate(written.max(0) as usize);
    String::from_utf8_lossy(&buf).into_owned()
}

fn vertex_shader_source(glsl: GlslVersion) -> String {
    let precision = if glsl.is_es() { "precision mediump float;" } else { "" };
    let (input, output) = if glsl.is_legacy() {
        ("attribute", "varying")
    } else {
        ("in", "out")
    };
    format!(
        r#"{version}
{precision}
uniform mat4 ProjMtx;
{input} vec2 Position;
{input} vec2 UV;
{input} vec4 Color;
{output} vec2 Frag_UV;
{output} vec4 Frag_Color;

void main()
{{
    Frag_UV = UV;
    Frag_Color = Color;
    gl_Position = ProjMtx * vec4(Position.xy, 0, 1);
}}
"#,
        version = glsl.as_str(),
    )
}

fn fragment_shader_source(glsl: GlslVersion) -> String {
    let precision = if glsl.is_es() { "precision mediump float;" } else { "" };
    if glsl.is_legacy() {
        format!(
            r#"{version}
{precision}
uniform sampler2D Texture;
varying vec2 Frag_UV;
varying vec4 Frag_Color;

void main()
{{
    gl_FragColor = Frag_Color * texture2D(Texture, Frag_UV.st);
}}
"#,
            version = glsl.as_str(),
        )
    } else {
        format!(
            r#"{version}
{precision}
uniform sampler2D Texture;
in vec2 Frag_UV;
in vec4 Frag_Color;
out vec4 Out_Color;

void main()
{{
    Out_Color = Frag_Color * texture(Texture, Frag_UV.st);
}}
"#,
            version = glsl.as_str(),
        )
    }
}
