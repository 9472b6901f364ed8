//! Write a sample PDF
//!
//! Writes a two-page document exercising shapes, gradients, hatches,
//! transparency, text, links, form fields, an outline and an attachment.
//!
//! Usage:
//!   cargo run --bin emit_sample -- sample.pdf
//!   cargo run --bin emit_sample -- sample.pdf --font DejaVuSans.ttf --config writer.json
//!   RUST_LOG=debug cargo run --bin emit_sample -- --password secret

use pdf_scribe::config::EncryptionConfig;
use pdf_scribe::geometry::{Point, PolyPolygon, Polygon, Rect};
use pdf_scribe::writer::{
    Bitmap, Color, DestFit, EmbeddedFile, Font, FontFace, Gradient, GradientStyle, Hatch, HatchStyle, LineInfo,
    PositionedGlyph, StructElementType, TextDecoration, TextRun, TrueTypeFace, WidgetDescription, WidgetKind,
};
use pdf_scribe::{PdfWriter, PdfWriterConfig};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

struct SampleConfig {
    output: PathBuf,
    font: Option<PathBuf>,
    config: Option<PathBuf>,
    password: Option<String>,
}

impl SampleConfig {
    fn from_args() -> Self {
        let args: Vec<String> = std::env::args().collect();
        let mut sample = Self {
            output: PathBuf::from("sample.pdf"),
            font: None,
            config: None,
            password: None,
        };

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--font" => {
                    i += 1;
                    sample.font = args.get(i).map(PathBuf::from);
                },
                "--config" => {
                    i += 1;
                    sample.config = args.get(i).map(PathBuf::from);
                },
                "--password" => {
                    i += 1;
                    sample.password = args.get(i).cloned();
                },
                other => sample.output = PathBuf::from(other),
            }
            i += 1;
        }
        sample
    }
}

fn writer_config(sample: &SampleConfig) -> pdf_scribe::Result<PdfWriterConfig> {
    let mut config = match &sample.config {
        Some(path) => PdfWriterConfig::from_json(&std::fs::read_to_string(path)?)?,
        None => PdfWriterConfig::default()
            .with_title("pdf_scribe sample")
            .with_language("en-US")
            .with_tagged(true),
    };
    if let Some(password) = &sample.password {
        config = config.with_encryption(EncryptionConfig::new(password.clone(), password.clone()));
    }
    Ok(config)
}

fn draw_shapes(writer: &mut PdfWriter) -> pdf_scribe::Result<()> {
    writer.set_line_color(Some(Color::black()));
    writer.set_fill_color(Some(Color::from_rgb8(0x4a, 0x90, 0xd9)));
    writer.draw_rect(&Rect::new(50.0, 50.0, 200.0, 120.0))?;
    writer.draw_rounded_rect(&Rect::new(300.0, 50.0, 200.0, 120.0), 20.0, 20.0)?;
    writer.draw_ellipse(&Rect::new(50.0, 200.0, 120.0, 80.0))?;

    let dashed = LineInfo::dashed(2.0, 2, 6.0, 3.0).with_dots(1, 1.0);
    writer.draw_line_with(&Point::new(50.0, 310.0), &Point::new(500.0, 310.0), &dashed)?;

    let triangle = Polygon::new(vec![
        Point::new(350.0, 200.0),
        Point::new(450.0, 280.0),
        Point::new(250.0, 280.0),
    ]);
    let gradient = Gradient::new(GradientStyle::Linear, Color::white(), Color::new(0.8, 0.1, 0.1)).with_angle(45.0);
    writer.draw_gradient(&PolyPolygon::new(vec![triangle]), &gradient)?;

    let hatch_area = PolyPolygon::from_rect(&Rect::new(50.0, 340.0, 200.0, 100.0));
    writer.draw_hatch(&hatch_area, &Hatch::new(HatchStyle::Double, Color::new(0.2, 0.6, 0.2), 8.0, 30.0))?;

    writer.set_fill_color(Some(Color::new(1.0, 0.8, 0.0)));
    writer.draw_transparent(&PolyPolygon::from_rect(&Rect::new(150.0, 380.0, 200.0, 100.0)), 50)?;

    let checker = Bitmap::rgb(2, 2, vec![0, 0, 0, 255, 255, 255, 255, 255, 255, 0, 0, 0])?;
    writer.draw_wallpaper(&Rect::new(300.0, 340.0, 200.0, 100.0), &checker, 20.0, 20.0)?;
    Ok(())
}

fn draw_text(writer: &mut PdfWriter, font_path: &Path) -> pdf_scribe::Result<()> {
    let face = TrueTypeFace::from_file(font_path)?;
    let glyphs: Vec<(u16, i32, char)> = "Hello, PDF"
        .chars()
        .filter_map(|ch| face.char_to_glyph(ch).map(|glyph| (glyph, face.advance_1000(glyph), ch)))
        .collect();
    let face = writer.register_face(Box::new(face));
    let size = 24.0;
    writer.set_font(Font::new(face, size))?;
    writer.set_text_color(Color::black());

    let mut x = 50.0;
    let mut run = Vec::new();
    for (glyph, advance, ch) in glyphs {
        run.push(PositionedGlyph::new(glyph, x, 520.0, ch.to_string()));
        x += f64::from(advance) * size / 1000.0;
    }
    if let Some(heading) = writer.create_structure_element(StructElementType::H1, None) {
        writer.begin_structure_element(heading);
        writer.draw_glyphs(&TextRun::new(run))?;
        writer.end_structure_element();
    }
    writer.draw_text_line(&Point::new(50.0, 520.0), x - 50.0, TextDecoration::Underline)?;
    Ok(())
}

fn add_interactive(writer: &mut PdfWriter) -> pdf_scribe::Result<()> {
    let top = writer.create_dest(&Rect::new(0.0, 0.0, 595.0, 842.0), Some(0), DestFit::Fit)?;
    writer.new_page(595.0, 842.0)?;
    let back = writer.create_link(&Rect::new(50.0, 50.0, 150.0, 20.0), None, Some("Back to page 1"))?;
    writer.set_link_dest(back, top);
    let web = writer.create_link(&Rect::new(50.0, 80.0, 150.0, 20.0), None, Some("Project page"))?;
    writer.set_link_url(web, "https://example.com/pdf_scribe");

    let edit = WidgetDescription::new(
        WidgetKind::Edit {
            multiline: false,
            password: false,
            max_len: Some(40),
            file_select: false,
        },
        "name",
        Rect::new(50.0, 120.0, 200.0, 22.0),
    )
    .with_text("Your name")
    .with_tab_order(1);
    writer.create_control(edit, None)?;
    let agree = WidgetDescription::new(
        WidgetKind::CheckBox {
            checked: true,
            on_value: "Yes".into(),
        },
        "agree",
        Rect::new(50.0, 160.0, 14.0, 14.0),
    )
    .with_tab_order(2);
    writer.create_control(agree, None)?;

    let chapter = writer.add_outline_item(0, "Drawing", Some(top));
    let forms = writer.create_dest(&Rect::new(0.0, 0.0, 595.0, 842.0), None, DestFit::Xyz)?;
    writer.add_outline_item(chapter, "Forms", Some(forms));

    writer.attach_file(
        &Rect::new(520.0, 50.0, 16.0, 16.0),
        None,
        EmbeddedFile::new("readme.txt", b"Written by pdf_scribe".to_vec()),
        Some("readme"),
    )?;
    Ok(())
}

fn run(sample: &SampleConfig) -> pdf_scribe::Result<()> {
    let mut writer = PdfWriter::to_file(&sample.output, writer_config(sample)?)?;
    writer.new_page(595.0, 842.0)?;
    draw_shapes(&mut writer)?;
    if let Some(font) = &sample.font {
        draw_text(&mut writer, font)?;
    }
    add_interactive(&mut writer)?;
    writer.emit()?;

    for warning in writer.warnings().iter() {
        log::warn!("{:?}", warning);
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let sample = SampleConfig::from_args();
    match run(&sample) {
        Ok(()) => {
            println!("wrote {}", sample.output.display());
            ExitCode::SUCCESS
        },
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        },
    }
}
