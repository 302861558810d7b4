use std::io::Write;

// ---------------------------------------------------------------------------
// Minimal PDF writer: one page holding one JPEG image
// ---------------------------------------------------------------------------

/// Objects are numbered from 1 in the order they are written.
struct PdfWriter {
    out: Vec<u8>,
    offsets: Vec<usize>,
}

impl PdfWriter {
    fn new() -> Self {
        let mut out = Vec::new();
        // Binary marker comment so transfer tools treat the file as binary.
        out.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");
        PdfWriter {
            out,
            offsets: Vec::new(),
        }
    }

    fn begin(&mut self) {
        self.offsets.push(self.out.len());
        let id = self.offsets.len();
        let _ = writeln!(self.out, "{id} 0 obj");
    }

    fn object(&mut self, dict: &str) {
        self.begin();
        let _ = writeln!(self.out, "{dict}\nendobj");
    }

    fn stream(&mut self, dict: &str, data: &[u8]) {
        self.begin();
        let _ = write!(self.out, "<< {dict} /Length {} >>\nstream\n", data.len());
        self.out.extend_from_slice(data);
        self.out.extend_from_slice(b"\nendstream\nendobj\n");
    }

    fn finish(mut self) -> Vec<u8> {
        let xref = self.out.len();
        let size = self.offsets.len() + 1;
        let _ = write!(self.out, "xref\n0 {size}\n0000000000 65535 f \n");
        for offset in &self.offsets {
            let _ = writeln!(self.out, "{offset:010} 00000 n ");
        }
        let _ = write!(
            self.out,
            "trailer\n<< /Size {size} /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n"
        );
        self.out
    }
}

/// Wrap JPEG data in a single-page PDF whose page is exactly the image size
/// (one image pixel per PDF point).
pub fn jpeg_page(jpeg: &[u8], width: u32, height: u32) -> Vec<u8> {
    let content = format!("q\n{width} 0 0 {height} 0 0 cm\n/Im0 Do\nQ\n");

    let mut pdf = PdfWriter::new();
    pdf.object("<< /Type /Catalog /Pages 2 0 R >>");
    pdf.object("<< /Type /Pages /Kids [3 0 R] /Count 1 >>");
    pdf.object(&format!(
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {width} {height}] \
         /Resources << /XObject << /Im0 4 0 R >> >> /Contents 5 0 R >>"
    ));
    pdf.stream(
        &format!(
            "/Type /XObject /Subtype /Image /Width {width} /Height {height} \
             /ColorSpace /DeviceRGB /BitsPerComponent 8 /Filter /DCTDecode"
        ),
        jpeg,
    );
    pdf.stream("", content.as_bytes());
    pdf.finish()
}
