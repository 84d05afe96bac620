//! iTerm2 inline image encoder for headless playback.
//!
//! Each frame is PNG-encoded with `Compression::Fast`, base64'd and wrapped
//! in an `OSC 1337 File=` sequence. All intermediate buffers are kept
//! between frames.
use std::io::Write;

use base64::Engine;

pub struct Iterm2Encoder {
    png_buf: Vec<u8>,
    b64_buf: String,
    seq_buf: Vec<u8>,
}

impl Iterm2Encoder {
    pub fn new() -> Self {
        Self {
            png_buf: Vec::new(),
            b64_buf: String::new(),
            seq_buf: Vec::new(),
        }
    }

    fn encode_png(&mut self, rgba: &[u8], width: usize, height: usize) -> Result<(), png::EncodingError> {
        self.png_buf.clear();
        let mut encoder = png::Encoder::new(&mut self.png_buf, width as u32, height as u32);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.set_compression(png::Compression::Fast);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(rgba)?;
        writer.finish()
    }

    /// Encode an RGBA frame as an inline image escape sequence.
    ///
    /// `width`/`height` are the PNG dimensions; `disp_w`/`disp_h` are the
    /// pixel size the terminal stretches it to.
    pub fn encode(
        &mut self,
        rgba: &[u8],
        width: usize,
        height: usize,
        disp_w: usize,
        disp_h: usize,
    ) -> Result<&[u8], png::EncodingError> {
        self.encode_png(rgba, width, height)?;

        self.b64_buf.clear();
        base64::engine::general_purpose::STANDARD.encode_string(&self.png_buf, &mut self.b64_buf);

        self.seq_buf.clear();
        write!(
            self.seq_buf,
            "\x1b]1337;File=inline=1;size={};width={}px;height={}px;preserveAspectRatio=0:{}\x07",
            self.png_buf.len(),
            disp_w,
            disp_h,
            self.b64_buf,
        )?;

        Ok(&self.seq_buf)
    }
}
