//! Names of the GL constants that `GLENUM` properties are written with.
//!
//! Text codecs write a known constant by name and anything else as hex.
//! Several names may share a value, the first entry wins when writing.

/// The built-in GL lookup table.
pub static GL_TABLE: &[(&str, u32)] = &[
    // Modes
    ("GL_BLEND", 0x0BE2),
    ("GL_CULL_FACE", 0x0B44),
    ("GL_DEPTH_TEST", 0x0B71),
    ("GL_FOG", 0x0B60),
    ("GL_LIGHTING", 0x0B50),
    ("GL_NORMALIZE", 0x0BA1),
    ("GL_ALPHA_TEST", 0x0BC0),
    ("GL_SCISSOR_TEST", 0x0C11),
    ("GL_STENCIL_TEST", 0x0B90),
    ("GL_COLOR_MATERIAL", 0x0B57),
    ("GL_POINT_SMOOTH", 0x0B10),
    ("GL_LINE_STIPPLE", 0x0B24),
    ("GL_POLYGON_OFFSET_FILL", 0x8037),
    ("GL_CLIP_PLANE0", 0x3000),
    ("GL_LIGHT0", 0x4000),
    ("GL_TEXTURE_1D", 0x0DE0),
    ("GL_TEXTURE_2D", 0x0DE1),
    ("GL_TEXTURE_3D", 0x806F),
    ("GL_TEXTURE_CUBE_MAP", 0x8513),
    // Comparison functions
    ("NEVER", 0x0200),
    ("LESS", 0x0201),
    ("EQUAL", 0x0202),
    ("LEQUAL", 0x0203),
    ("GREATER", 0x0204),
    ("NOTEQUAL", 0x0205),
    ("GEQUAL", 0x0206),
    ("ALWAYS", 0x0207),
    // Texture environment
    ("REPLACE", 0x1E01),
    ("MODULATE", 0x2100),
    ("ADD", 0x0104),
    // Wrap modes
    ("CLAMP", 0x2900),
    ("CLAMP_TO_EDGE", 0x812F),
    ("CLAMP_TO_BORDER", 0x812D),
    ("REPEAT", 0x2901),
    ("MIRROR", 0x8370),
    // Filters
    ("NEAREST", 0x2600),
    ("LINEAR", 0x2601),
    ("NEAREST_MIPMAP_NEAREST", 0x2700),
    ("LINEAR_MIPMAP_NEAREST", 0x2701),
    ("NEAREST_MIPMAP_LINEAR", 0x2702),
    ("LINEAR_MIPMAP_LINEAR", 0x2703),
    // Pixel formats
    ("GL_ALPHA", 0x1906),
    ("GL_RGB", 0x1907),
    ("GL_RGBA", 0x1908),
    ("GL_LUMINANCE", 0x1909),
    ("GL_LUMINANCE_ALPHA", 0x190A),
];

/// Returns the name of a GL constant.
pub fn name_of(value: u32) -> Option<&'static str> {
    GL_TABLE
        .iter()
        .find(|(_, v)| *v == value)
        .map(|(name, _)| *name)
}

/// Returns the value of a named GL constant.
pub fn value_of(name: &str) -> Option<u32> {
    GL_TABLE
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, value)| *value)
}
