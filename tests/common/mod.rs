//! A tiny PDF writer for test documents.

/// The rectangle every page fills with blue, in PDF user space.
pub const BLUE_RECT: (u32, u32, u32, u32) = (10, 10, 50, 30);

/// Build a PDF with one page per `(width, height)` entry. Each page fills
/// [`BLUE_RECT`] with pure blue.
pub fn build_pdf(page_sizes: &[(u32, u32)]) -> Vec<u8> {
    let (x, y, w, h) = BLUE_RECT;
    let content = format!("0 0 1 rg {} {} {} {} re f", x, y, w, h);

    let kids = (0..page_sizes.len())
        .map(|i| format!("{} 0 R", 3 + 2 * i))
        .collect::<Vec<_>>()
        .join(" ");

    let mut objects = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids,
            page_sizes.len()
        ),
    ];

    for (i, (width, height)) in page_sizes.iter().enumerate() {
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] /Resources << >> /Contents {} 0 R >>",
            width,
            height,
            4 + 2 * i
        ));
        objects.push(format!(
            "<< /Length {} >>\nstream\n{}\nendstream",
            content.len(),
            content
        ));
    }

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = vec![];

    for (i, object) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, object).as_bytes());
    }

    let xref_offset = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    out.extend_from_slice(b"0000000000 65535 f \n");
    for offset in offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_offset
        )
        .as_bytes(),
    );

    out
}
