use base64::{engine::general_purpose, Engine as _};

/// Wrap PNG bytes in an SVG document of the same intrinsic size
pub fn render_svg(png_bytes: &[u8], width: u32, height: u32) -> String {
    let payload = general_purpose::STANDARD.encode(png_bytes);
    format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\">\n  \
         <image href=\"data:image/png;base64,{payload}\" width=\"{w}\" height=\"{h}\" />\n\
         </svg>\n",
        w = width,
        h = height,
        payload = payload
    )
}
