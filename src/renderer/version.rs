//! OpenGL version detection and shader dialect selection.

use std::ffi::CStr;

/// Version of the current OpenGL context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct GlVersion {
    pub major: u32,
    pub minor: u32,
    pub is_es: bool,
}

impl GlVersion {
    /// Reads the version of the current context.
    ///
    /// # Safety
    ///
    /// A context must be current and the `gl` function pointers loaded.
    pub unsafe fn read() -> Self {
        let ptr = gl::GetString(gl::VERSION);
        if ptr.is_null() {
            log::warn!("GL_VERSION unavailable, assuming OpenGL 2.1");
            return Self::parse("");
        }
        let version = CStr::from_ptr(ptr.cast()).to_string_lossy();
        log::debug!("GL_VERSION: {version}");
        Self::parse(&version)
    }

    /// Parses a `GL_VERSION` string such as `"4.6.0 NVIDIA 535.54"` or
    /// `"OpenGL ES 3.2 Mesa 23.1"`.
    pub fn parse(version: &str) -> Self {
        let is_es = version.contains("OpenGL ES");
        let (major, minor) = version
            .split_whitespace()
            .find_map(parse_major_minor)
            .unwrap_or(if is_es { (2, 0) } else { (2, 1) });

        GlVersion { major, minor, is_es }
    }

    /// Whether vertex array objects are available.
    pub fn vertex_array_support(self) -> bool {
        self.major >= 3
    }

    /// Whether `glDrawElementsBaseVertex` is available.
    pub fn vertex_offset_support(self) -> bool {
        !self.is_es && (self.major, self.minor) >= (3, 2)
    }
}

fn parse_major_minor(word: &str) -> Option<(u32, u32)> {
    let mut parts = word.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    Some((major, minor))
}

/// The `#version` line shaders are compiled with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlslVersion(&'static str);

impl GlslVersion {
    /// Picks the shader dialect matching `version`.
    pub fn for_gl_version(version: GlVersion) -> Self {
        let directive = match (version.is_es, version.major, version.minor) {
            (true, major, _) if major >= 3 => "#version 300 es",
            (true, _, _) => "#version 100",
            (false, major, minor) if (major, minor) >= (3, 3) => "#version 330 core",
            (false, 3, 2) => "#version 150",
            (false, 3, _) => "#version 130",
            _ => "#version 120",
        };
        GlslVersion(directive)
    }

    /// The `#version` directive.
    pub fn as_str(self) -> &'static str {
        self.0
    }

    /// Whether the dialect predates `in`/`out` qualifiers.
    pub fn is_legacy(self) -> bool {
        matches!(self.0, "#version 100" | "#version 120")
    }

    /// Whether the dialect targets OpenGL ES.
    pub fn is_es(self) -> bool {
        self.0.ends_with("es") || self.0 == "#version 100"
    }
}
